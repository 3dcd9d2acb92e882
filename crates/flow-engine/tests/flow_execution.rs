//! End-to-end: compile a flow document, execute it, inspect the report

use async_trait::async_trait;
use flow_dsl::{compile, welcome_flow};
use flow_engine::{
    Actuator, Collaborators, CommandResult, ExecutionOptions, FlowEngine, Voice,
};
use flow_types::{ActionStatus, FlowStatus, Pose};
use serde_json::json;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingActuator {
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl Actuator for RecordingActuator {
    async fn stand(&self) -> CommandResult {
        self.calls.lock().unwrap().push("stand".into());
        Ok(())
    }
    async fn sit(&self) -> CommandResult {
        self.calls.lock().unwrap().push("sit".into());
        Ok(())
    }
    async fn stop(&self) -> CommandResult {
        self.calls.lock().unwrap().push("stop".into());
        Ok(())
    }
    async fn drive(&self, vx: f64, _vy: f64, _vyaw: f64) -> CommandResult {
        self.calls.lock().unwrap().push(format!("drive {:.1}", vx));
        Ok(())
    }
    async fn trick(&self, command: &str) -> CommandResult {
        self.calls.lock().unwrap().push(format!("trick {}", command));
        Ok(())
    }
}

#[derive(Default)]
struct RecordingVoice {
    spoken: Mutex<Vec<String>>,
}

#[async_trait]
impl Voice for RecordingVoice {
    async fn speak(&self, text: &str) -> CommandResult {
        self.spoken.lock().unwrap().push(text.into());
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_document_compiles_and_executes() {
    let doc = json!([
        { "kind": "stand", "duration": 1.0 },
        { "kind": "move", "params": { "vx": 0.3 }, "duration": 2.0 },
        { "kind": "rotate", "params": { "angle": 90.0 } },
        { "kind": "loop", "params": { "count": 2 }, "actions": [
            { "kind": "speak", "params": { "text": "hello" } }
        ]},
        { "kind": "condition", "guard": "pose.x > 0.5", "actions": [
            { "kind": "trick", "params": { "command": "wave" } }
        ]},
    ]);

    let flow = compile(&doc).expect("document should compile");

    let actuator = Arc::new(RecordingActuator::default());
    let voice = Arc::new(RecordingVoice::default());
    let engine = FlowEngine::new(
        Collaborators::new()
            .with_actuator(actuator.clone())
            .with_voice(voice.clone()),
    );

    let report = engine
        .execute(&flow, ExecutionOptions::new())
        .await
        .unwrap();

    assert_eq!(report.status, FlowStatus::Completed);
    assert!(report.outcomes.iter().all(|o| o.status == ActionStatus::Ok));

    // Drove 0.3 m/s for 2 s, then turned 90 degrees in place
    assert!((report.final_pose.x - 0.6).abs() < 1e-9);
    assert!((report.final_pose.heading - std::f64::consts::FRAC_PI_2).abs() < 1e-9);

    assert_eq!(voice.spoken.lock().unwrap().len(), 2);
    // The condition saw pose.x == 0.6 and ran its branch
    assert!(actuator
        .calls
        .lock()
        .unwrap()
        .iter()
        .any(|c| c == "trick wave"));
}

#[tokio::test(start_paused = true)]
async fn test_welcome_flow_runs_to_completion() {
    let actuator = Arc::new(RecordingActuator::default());
    let voice = Arc::new(RecordingVoice::default());
    let engine = FlowEngine::new(
        Collaborators::new()
            .with_actuator(actuator.clone())
            .with_voice(voice.clone()),
    );

    let flow = welcome_flow(1.5);
    let report = engine
        .execute(&flow, ExecutionOptions::new())
        .await
        .unwrap();

    assert_eq!(report.status, FlowStatus::Completed);
    assert_eq!(report.outcomes.len(), flow.len());
    assert!((report.final_pose.x - 1.5).abs() < 1e-9);
    assert_eq!(voice.spoken.lock().unwrap().len(), 1);

    let calls = actuator.calls.lock().unwrap();
    // Stand, walk, stop, crouch (as sit), stand again
    assert_eq!(calls.iter().filter(|c| *c == "stand").count(), 2);
    assert_eq!(calls.iter().filter(|c| *c == "sit").count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_execution_from_offset_start_pose() {
    let doc = json!([
        { "kind": "move_to", "params": { "x": 0.0, "y": 0.0, "speed": 0.5 } },
    ]);
    let flow = compile(&doc).unwrap();

    let engine = FlowEngine::new(Collaborators::new());
    let report = engine
        .execute(
            &flow,
            ExecutionOptions::new().with_initial_pose(Pose::new(3.0, -1.0, 1.0)),
        )
        .await
        .unwrap();

    assert_eq!(report.status, FlowStatus::Completed);
    assert!(report.final_pose.distance_to(0.0, 0.0) < 1e-6);
}
