//! The flow engine: sequencing, dispatch, guards, and error policy

use crate::collaborators::Collaborators;
use crate::guard::{evaluate_guard, GuardContext, GuardValue};
use crate::nav::{MotionSegment, NavConfig, NavTarget, Navigator};
use flow_types::{
    Action, ActionKind, ActionOutcome, ExecutionReport, Flow, FlowError, FlowResult, FlowStatus,
    Pose,
};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Engine tunables
#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    /// Settle time for actions with no explicit duration, in seconds
    pub default_action_secs: f64,
    /// Navigation tunables for rotate and move-to
    pub nav: NavConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_action_secs: 1.0,
            nav: NavConfig::default(),
        }
    }
}

/// Per-execution options supplied by the caller
#[derive(Clone, Debug, Default)]
pub struct ExecutionOptions {
    /// Pose estimate at the start of the flow
    pub initial_pose: Pose,
    /// Record leaf failures and keep going instead of stopping the flow
    pub continue_on_error: bool,
    /// Extra variables visible to guard expressions
    pub variables: HashMap<String, GuardValue>,
}

impl ExecutionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_pose(mut self, pose: Pose) -> Self {
        self.initial_pose = pose;
        self
    }

    pub fn with_continue_on_error(mut self, enabled: bool) -> Self {
        self.continue_on_error = enabled;
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<GuardValue>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

type ActionHook = Arc<dyn Fn(&str) + Send + Sync>;
type CompletionHook = Arc<dyn Fn(&ExecutionReport) + Send + Sync>;

/// Lifecycle hooks fired during execution.
///
/// Hooks run inline on the driver task; keep them cheap. A skipped
/// action fires no hooks at all.
#[derive(Clone, Default)]
pub struct FlowCallbacks {
    pub on_action_start: Option<ActionHook>,
    pub on_action_end: Option<ActionHook>,
    pub on_flow_complete: Option<CompletionHook>,
}

impl FlowCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_action_start(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_action_start = Some(Arc::new(hook));
        self
    }

    pub fn on_action_end(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_action_end = Some(Arc::new(hook));
        self
    }

    pub fn on_flow_complete(
        mut self,
        hook: impl Fn(&ExecutionReport) + Send + Sync + 'static,
    ) -> Self {
        self.on_flow_complete = Some(Arc::new(hook));
        self
    }
}

/// Engine lifecycle, encoded in one atomic so `stop()` and `execute`
/// race cleanly: a stop is only ever a Running -> Aborting transition,
/// and starting a flow is only ever Idle -> Running.
mod state {
    pub const IDLE: u8 = 0;
    pub const RUNNING: u8 = 1;
    pub const ABORTING: u8 = 2;
}

/// State shared between the driver task, parallel branch tasks, and
/// external handles that call `stop()`.
struct EngineShared {
    /// Single serialization point for the pose estimate and the
    /// actuator. Held across a whole motion leaf.
    pose: Mutex<Pose>,
    state: AtomicU8,
    /// Set when a leaf fails and the error policy stops the flow;
    /// observed by sibling parallel branches at their checkpoints
    fatal: AtomicBool,
    current_action: StdMutex<Option<String>>,
}

impl EngineShared {
    fn new() -> Self {
        Self {
            pose: Mutex::new(Pose::default()),
            state: AtomicU8::new(state::IDLE),
            fatal: AtomicBool::new(false),
            current_action: StdMutex::new(None),
        }
    }

    fn set_current(&self, name: Option<&str>) {
        let mut current = self
            .current_action
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        *current = name.map(String::from);
    }

    fn is_running(&self) -> bool {
        self.state.load(Ordering::SeqCst) != state::IDLE
    }

    fn abort_requested(&self) -> bool {
        self.state.load(Ordering::SeqCst) == state::ABORTING
    }

    fn halted(&self) -> bool {
        self.abort_requested() || self.fatal.load(Ordering::SeqCst)
    }
}

/// Executes flows against a set of collaborators.
///
/// The engine is single-flight: one flow at a time. Clones share the
/// same execution state, so `stop()` on any clone aborts the flow a
/// different clone is driving.
#[derive(Clone)]
pub struct FlowEngine {
    shared: Arc<EngineShared>,
    collaborators: Collaborators,
    config: EngineConfig,
    callbacks: FlowCallbacks,
}

impl FlowEngine {
    pub fn new(collaborators: Collaborators) -> Self {
        Self::with_config(collaborators, EngineConfig::default())
    }

    pub fn with_config(collaborators: Collaborators, config: EngineConfig) -> Self {
        Self {
            shared: Arc::new(EngineShared::new()),
            collaborators,
            config,
            callbacks: FlowCallbacks::default(),
        }
    }

    pub fn with_callbacks(mut self, callbacks: FlowCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Whether a flow is currently executing
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Name of the action currently executing, if any
    pub fn current_action(&self) -> Option<String> {
        self.shared
            .current_action
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Request that the running flow stop.
    ///
    /// Cancellation is cooperative: the request is observed at the next
    /// sequence, loop, or join checkpoint. An in-flight actuator command
    /// is never interrupted. No-op when nothing is running.
    pub fn stop(&self) {
        if self
            .shared
            .state
            .compare_exchange(
                state::RUNNING,
                state::ABORTING,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
        {
            info!("Flow stop requested");
        }
    }

    /// Execute a flow to a terminal state.
    ///
    /// Always returns a report once started; per-action failures land in
    /// the report, not in the `Err` channel. The only error is calling
    /// this while another flow is in progress.
    pub async fn execute(
        &self,
        flow: &Flow,
        options: ExecutionOptions,
    ) -> FlowResult<ExecutionReport> {
        if self
            .shared
            .state
            .compare_exchange(
                state::IDLE,
                state::RUNNING,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            return Err(FlowError::AlreadyRunning);
        }

        // The previous flow's tasks were all joined before it finished,
        // so nothing else writes this flag here
        self.shared.fatal.store(false, Ordering::SeqCst);
        *self.shared.pose.lock().await = options.initial_pose;

        info!(
            actions = flow.len(),
            continue_on_error = options.continue_on_error,
            "Executing flow"
        );

        let ctx = ExecCtx {
            shared: Arc::clone(&self.shared),
            collaborators: self.collaborators.clone(),
            callbacks: self.callbacks.clone(),
            navigator: Navigator::new(self.config.nav),
            config: self.config,
            continue_on_error: options.continue_on_error,
            variables: Arc::new(options.variables),
            outcomes: Arc::new(StdMutex::new(Vec::new())),
        };

        ctx.run_sequence(&flow.actions).await;

        let aborted = self.shared.abort_requested();
        if aborted {
            // Leave the robot stationary after an abort
            if let Some(actuator) = &self.collaborators.actuator {
                if let Err(err) = actuator.stop().await {
                    warn!(error = %err, "Post-abort stop command failed");
                }
            }
        }

        let status = if aborted {
            FlowStatus::Aborted
        } else if self.shared.fatal.load(Ordering::SeqCst) {
            FlowStatus::Failed
        } else {
            FlowStatus::Completed
        };

        let final_pose = *self.shared.pose.lock().await;
        let outcomes = std::mem::take(
            &mut *ctx.outcomes.lock().unwrap_or_else(|e| e.into_inner()),
        );

        self.shared.set_current(None);
        self.shared.state.store(state::IDLE, Ordering::SeqCst);

        let report = ExecutionReport {
            status,
            outcomes,
            final_pose,
        };
        info!(status = %report.status, pose = %report.final_pose, "Flow finished");
        if let Some(hook) = &self.callbacks.on_flow_complete {
            hook(&report);
        }

        Ok(report)
    }
}

/// What dispatching one action produced
enum Verdict {
    Ran,
    /// A conditional whose guard was false
    Skipped,
    /// A container whose nested sequence failed fatally
    NestedFailed,
}

/// Everything one executing flow carries. Cloned into each parallel
/// branch task; all fields are shared handles.
#[derive(Clone)]
struct ExecCtx {
    shared: Arc<EngineShared>,
    collaborators: Collaborators,
    callbacks: FlowCallbacks,
    navigator: Navigator,
    config: EngineConfig,
    continue_on_error: bool,
    variables: Arc<HashMap<String, GuardValue>>,
    outcomes: Arc<StdMutex<Vec<ActionOutcome>>>,
}

impl ExecCtx {
    /// Run actions in order. Returns false only when this sequence
    /// itself hit a fatal failure; stopping early because a sibling
    /// branch failed or an abort was requested still returns true.
    fn run_sequence<'a>(&'a self, actions: &'a [Action]) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            for action in actions {
                if self.shared.halted() {
                    return true;
                }
                if !self.run_action(action).await {
                    if self.continue_on_error {
                        continue;
                    }
                    self.shared.fatal.store(true, Ordering::SeqCst);
                    return false;
                }
            }
            true
        })
    }

    /// Run one action: guard, hooks, dispatch, outcome record.
    /// Returns false when the action failed.
    async fn run_action(&self, action: &Action) -> bool {
        let name = action.display_name();

        // Guard first; a skipped action fires no hooks
        if let Some(expr) = &action.guard {
            if !self.check_guard(expr).await {
                debug!(action = name, guard = %expr, "Guard false, skipping");
                self.record(ActionOutcome::skipped(name));
                return true;
            }
        }

        self.shared.set_current(Some(name));
        if let Some(hook) = &self.callbacks.on_action_start {
            hook(name);
        }
        debug!(action = name, kind = action.kind.label(), "Executing action");

        let ok = match self.dispatch(action).await {
            Ok(Verdict::Ran) => {
                self.record(ActionOutcome::ok(name));
                true
            }
            Ok(Verdict::Skipped) => {
                self.record(ActionOutcome::skipped(name));
                true
            }
            Ok(Verdict::NestedFailed) => {
                self.record(ActionOutcome::failed(name, "nested action failed"));
                false
            }
            Err(err) => {
                warn!(action = name, error = %err, "Action failed");
                self.record(ActionOutcome::failed(name, err.to_string()));
                false
            }
        };

        if let Some(hook) = &self.callbacks.on_action_end {
            hook(name);
        }
        ok
    }

    async fn dispatch(&self, action: &Action) -> Result<Verdict, FlowError> {
        match &action.kind {
            ActionKind::Stand => {
                if let Some(actuator) = &self.collaborators.actuator {
                    actuator.stand().await.map_err(actuator_err)?;
                } else {
                    self.no_actuator("stand");
                }
                self.settle(action).await;
                Ok(Verdict::Ran)
            }
            ActionKind::Sit => {
                if let Some(actuator) = &self.collaborators.actuator {
                    actuator.sit().await.map_err(actuator_err)?;
                } else {
                    self.no_actuator("sit");
                }
                self.settle(action).await;
                Ok(Verdict::Ran)
            }
            ActionKind::Crouch { height } => {
                // The actuator has no partial-height posture; sit is the
                // closest available approximation
                debug!(height, "Crouch approximated as sit");
                if let Some(actuator) = &self.collaborators.actuator {
                    actuator.sit().await.map_err(actuator_err)?;
                } else {
                    self.no_actuator("crouch");
                }
                self.settle(action).await;
                Ok(Verdict::Ran)
            }
            ActionKind::Stop => {
                if let Some(actuator) = &self.collaborators.actuator {
                    actuator.stop().await.map_err(actuator_err)?;
                } else {
                    self.no_actuator("stop");
                }
                self.settle(action).await;
                Ok(Verdict::Ran)
            }
            ActionKind::Trick { command } => {
                if let Some(actuator) = &self.collaborators.actuator {
                    actuator.trick(command).await.map_err(actuator_err)?;
                } else {
                    self.no_actuator(command);
                }
                self.settle(action).await;
                Ok(Verdict::Ran)
            }
            ActionKind::Move { vx, vy, vyaw } => {
                let duration = self.resolved_duration(action);
                let mut pose = self.shared.pose.lock().await;
                self.execute_segment(
                    &mut pose,
                    MotionSegment {
                        vx: *vx,
                        vy: *vy,
                        vyaw: *vyaw,
                        duration,
                    },
                )
                .await?;
                Ok(Verdict::Ran)
            }
            ActionKind::Rotate { angle, speed } => {
                let mut pose = self.shared.pose.lock().await;
                if let Some(segment) = self.navigator.plan_rotation(*angle, *speed) {
                    self.execute_segment(&mut pose, segment).await?;
                }
                Ok(Verdict::Ran)
            }
            ActionKind::MoveTo {
                x,
                y,
                heading,
                speed,
            } => {
                let target = NavTarget {
                    x: *x,
                    y: *y,
                    heading: *heading,
                    speed: *speed,
                };
                // Hold the pose lock across the whole plan so the
                // trajectory is not interleaved with another motion
                let mut pose = self.shared.pose.lock().await;
                let plan = self.navigator.plan_route(&pose, &target);
                debug!(segments = plan.len(), x, y, "Navigating to target");
                for segment in plan {
                    self.execute_segment(&mut pose, segment).await?;
                }
                Ok(Verdict::Ran)
            }
            ActionKind::Wait => {
                self.settle(action).await;
                Ok(Verdict::Ran)
            }
            ActionKind::Speak { text } => {
                if let Some(voice) = &self.collaborators.voice {
                    voice.speak(text).await.map_err(|e| collaborator_err("voice", e))?;
                } else {
                    warn!("No voice connected, skipping speech");
                }
                self.settle(action).await;
                Ok(Verdict::Ran)
            }
            ActionKind::Show {
                title,
                content,
                display,
            } => {
                if let Some(screen) = &self.collaborators.display {
                    screen
                        .show(title, content, *display)
                        .await
                        .map_err(|e| collaborator_err("display", e))?;
                } else {
                    warn!("No display connected, skipping show");
                }
                self.settle(action).await;
                Ok(Verdict::Ran)
            }
            ActionKind::Search { query, max_results } => {
                self.run_search(query, *max_results).await?;
                self.settle(action).await;
                Ok(Verdict::Ran)
            }
            ActionKind::Conditional { guard, actions } => {
                if !self.check_guard(guard).await {
                    debug!(guard = %guard, "Condition false, skipping branch");
                    return Ok(Verdict::Skipped);
                }
                if self.run_sequence(actions).await {
                    Ok(Verdict::Ran)
                } else {
                    Ok(Verdict::NestedFailed)
                }
            }
            ActionKind::Loop { count, actions } => {
                for iteration in 0..*count {
                    if self.shared.halted() {
                        break;
                    }
                    debug!(iteration, count, "Loop iteration");
                    if !self.run_sequence(actions).await {
                        return Ok(Verdict::NestedFailed);
                    }
                }
                Ok(Verdict::Ran)
            }
            ActionKind::Parallel { branches } => {
                let mut handles = Vec::with_capacity(branches.len());
                for branch in branches.iter().cloned() {
                    let ctx = self.clone();
                    handles.push(tokio::spawn(async move {
                        ctx.run_sequence(&branch).await
                    }));
                }

                let mut all_ok = true;
                for handle in handles {
                    match handle.await {
                        Ok(branch_ok) => all_ok &= branch_ok,
                        Err(err) => {
                            warn!(error = %err, "Parallel branch task failed");
                            self.shared.fatal.store(true, Ordering::SeqCst);
                            all_ok = false;
                        }
                    }
                }

                if all_ok {
                    Ok(Verdict::Ran)
                } else {
                    Ok(Verdict::NestedFailed)
                }
            }
        }
    }

    /// Drive one constant-velocity segment: command, hold, stop, then
    /// advance the estimate. The caller holds the pose lock.
    async fn execute_segment(
        &self,
        pose: &mut Pose,
        segment: MotionSegment,
    ) -> Result<(), FlowError> {
        if let Some(actuator) = &self.collaborators.actuator {
            actuator
                .drive(segment.vx, segment.vy, segment.vyaw)
                .await
                .map_err(actuator_err)?;
        } else {
            warn!("No actuator connected, simulating motion");
        }

        if segment.duration.is_finite() && segment.duration > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(segment.duration)).await;
        }

        if let Some(actuator) = &self.collaborators.actuator {
            actuator.stop().await.map_err(actuator_err)?;
        }

        pose.integrate(segment.vx, segment.vy, segment.vyaw, segment.duration);
        Ok(())
    }

    /// Run a search and forward the results to the display when one is
    /// attached.
    async fn run_search(&self, query: &str, max_results: usize) -> Result<(), FlowError> {
        let Some(search) = &self.collaborators.search else {
            warn!("No search provider connected, skipping search");
            return Ok(());
        };

        let hits = search
            .query(query, max_results)
            .await
            .map_err(|e| collaborator_err("search", e))?;
        info!(query, hits = hits.len(), "Search completed");

        if let Some(screen) = &self.collaborators.display {
            let mut content = String::new();
            for (i, hit) in hits.iter().enumerate() {
                content.push_str(&format!(
                    "{}. {}\n   {}\n   {}\n",
                    i + 1,
                    hit.title,
                    hit.snippet,
                    hit.url
                ));
            }
            screen
                .show(
                    &format!("Search: {}", query),
                    &content,
                    flow_types::DisplayKind::SearchResults,
                )
                .await
                .map_err(|e| collaborator_err("display", e))?;
        }

        Ok(())
    }

    /// Evaluate a guard against the pose, engine state, and caller
    /// variables. Evaluation failure is guard-false with a warning.
    async fn check_guard(&self, expr: &str) -> bool {
        let pose = *self.shared.pose.lock().await;
        let mut ctx = GuardContext::new()
            .with_variable("pose.x", pose.x)
            .with_variable("pose.y", pose.y)
            .with_variable("pose.heading", pose.heading)
            .with_variable("running", self.shared.is_running());
        for (name, value) in self.variables.iter() {
            ctx = ctx.with_variable(name.clone(), *value);
        }

        match evaluate_guard(expr, &ctx) {
            Ok(result) => result,
            Err(err) => {
                let err = FlowError::GuardEvaluation(err.to_string());
                warn!(guard = %expr, error = %err, "Guard evaluation failed, skipping action");
                false
            }
        }
    }

    // Non-finite durations never sleep; the validator rejects them in
    // compiled documents, but hand-built flows can carry anything
    async fn settle(&self, action: &Action) {
        let secs = self.resolved_duration(action);
        if secs.is_finite() && secs > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(secs)).await;
        }
    }

    fn resolved_duration(&self, action: &Action) -> f64 {
        action.duration.unwrap_or(self.config.default_action_secs)
    }

    fn record(&self, outcome: ActionOutcome) {
        self.outcomes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(outcome);
    }

    fn no_actuator(&self, command: &str) {
        warn!(command, "No actuator connected, skipping command");
    }
}

fn actuator_err(err: crate::collaborators::CommandError) -> FlowError {
    FlowError::ActuatorCommand(err.to_string())
}

fn collaborator_err(
    collaborator: &'static str,
    err: crate::collaborators::CommandError,
) -> FlowError {
    FlowError::CollaboratorUnavailable {
        collaborator,
        message: err.to_string(),
    }
}
