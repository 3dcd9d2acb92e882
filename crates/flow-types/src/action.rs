//! Actions and flows: the declarative program a robot executes
//!
//! An `Action` is one step. Its `kind` fully determines which parameters
//! are meaningful; optional `name`, `duration`, and `guard` apply to any
//! kind. Control-flow kinds carry nested action lists.

use serde::{Deserialize, Serialize};

/// What a flow may show on an attached display
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayKind {
    /// Free-form text panel
    Text,
    /// Formatted web-search results
    SearchResults,
}

/// The closed set of action kinds
///
/// Dispatch over this enum is exhaustive: a new kind will not compile
/// until every match arm handles it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionKind {
    /// Stand up and hold
    Stand,
    /// Sit down
    Sit,
    /// Crouch at a height factor (0.0 = fully seated, 1.0 = standing)
    Crouch { height: f64 },
    /// Halt all motion
    Stop,
    /// Named gait or trick command, passed through to the actuator opaquely
    Trick { command: String },
    /// Drive at a body-frame velocity for the action's resolved duration
    Move { vx: f64, vy: f64, vyaw: f64 },
    /// Navigate open-loop to a target pose
    MoveTo {
        x: f64,
        y: f64,
        heading: Option<f64>,
        speed: f64,
    },
    /// Rotate in place by `angle` radians at `speed` rad/s
    Rotate { angle: f64, speed: f64 },
    /// Suspend with no side effect
    Wait,
    /// Say something through the voice collaborator
    Speak { text: String },
    /// Run a web search through the search collaborator
    Search { query: String, max_results: usize },
    /// Show content on the display collaborator
    Show {
        title: String,
        content: String,
        display: DisplayKind,
    },
    /// Execute the nested actions once if the guard evaluates true
    Conditional { guard: String, actions: Vec<Action> },
    /// Execute the nested actions `count` times in order
    Loop { count: u32, actions: Vec<Action> },
    /// Execute each branch concurrently; join before continuing
    Parallel { branches: Vec<Vec<Action>> },
}

impl ActionKind {
    /// Short label used in logs and outcome records when an action has no name
    pub fn label(&self) -> &'static str {
        match self {
            Self::Stand => "stand",
            Self::Sit => "sit",
            Self::Crouch { .. } => "crouch",
            Self::Stop => "stop",
            Self::Trick { .. } => "trick",
            Self::Move { .. } => "move",
            Self::MoveTo { .. } => "move_to",
            Self::Rotate { .. } => "rotate",
            Self::Wait => "wait",
            Self::Speak { .. } => "speak",
            Self::Search { .. } => "search",
            Self::Show { .. } => "show",
            Self::Conditional { .. } => "condition",
            Self::Loop { .. } => "loop",
            Self::Parallel { .. } => "parallel",
        }
    }

    /// Whether executing this kind mutates the pose estimate
    pub fn is_motion(&self) -> bool {
        matches!(
            self,
            Self::Move { .. } | Self::MoveTo { .. } | Self::Rotate { .. }
        )
    }
}

/// One step of a flow
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// What the step does
    #[serde(flatten)]
    pub kind: ActionKind,
    /// Optional human label for callbacks and logs; not unique
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Optional override for the kind's default timing, in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Optional boolean expression; false means the action is skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guard: Option<String>,
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            name: None,
            duration: None,
            guard: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration = Some(secs);
        self
    }

    pub fn with_guard(mut self, expr: impl Into<String>) -> Self {
        self.guard = Some(expr.into());
        self
    }

    /// Name for callbacks and outcome records: the label when unnamed
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.kind.label())
    }
}

/// An ordered sequence of actions
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub actions: Vec<Action>,
}

impl Flow {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }
}

impl From<Vec<Action>> for Flow {
    fn from(actions: Vec<Action>) -> Self {
        Self { actions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_prefers_label_when_unnamed() {
        let action = Action::new(ActionKind::Stand);
        assert_eq!(action.display_name(), "stand");

        let named = Action::new(ActionKind::Stand).with_name("Get up");
        assert_eq!(named.display_name(), "Get up");
    }

    #[test]
    fn test_motion_kinds() {
        assert!(ActionKind::Move {
            vx: 0.1,
            vy: 0.0,
            vyaw: 0.0
        }
        .is_motion());
        assert!(ActionKind::Rotate {
            angle: 1.0,
            speed: 0.5
        }
        .is_motion());
        assert!(!ActionKind::Wait.is_motion());
        assert!(!ActionKind::Speak {
            text: "hi".into()
        }
        .is_motion());
    }

    #[test]
    fn test_builders() {
        let action = Action::new(ActionKind::Wait)
            .with_name("pause")
            .with_duration(2.5)
            .with_guard("running");

        assert_eq!(action.name.as_deref(), Some("pause"));
        assert_eq!(action.duration, Some(2.5));
        assert_eq!(action.guard.as_deref(), Some("running"));
    }

    #[test]
    fn test_action_serde_round_trip() {
        let action = Action::new(ActionKind::Move {
            vx: 0.3,
            vy: 0.0,
            vyaw: 0.1,
        })
        .with_duration(2.0);

        let json = serde_json::to_string(&action).unwrap();
        let back: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(action, back);
    }

    #[test]
    fn test_nested_kinds_hold_actions() {
        let inner = Action::new(ActionKind::Wait);
        let looped = ActionKind::Loop {
            count: 3,
            actions: vec![inner.clone()],
        };
        match &looped {
            ActionKind::Loop { count, actions } => {
                assert_eq!(*count, 3);
                assert_eq!(actions[0], inner);
            }
            other => panic!("Expected loop, got {:?}", other),
        }
    }
}
