//! Execution outcomes: the terminal record of one flow run
//!
//! Every attempted action is enumerated by name with its outcome, so a
//! caller can assert on exact per-step results instead of only the
//! aggregate status.

use crate::Pose;
use serde::{Deserialize, Serialize};

/// Terminal status of one flow execution
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStatus {
    /// All non-skipped actions ran without a fatal failure
    Completed,
    /// A leaf action failed and the error policy stopped the flow
    Failed,
    /// An external owner requested a stop; never set by an error
    Aborted,
}

impl std::fmt::Display for FlowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Outcome of one attempted action
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Executed without error
    Ok,
    /// Guard evaluated false (or failed to evaluate); not executed
    Skipped,
    /// Collaborator call or nested action failed
    Failed { reason: String },
}

/// One entry in the per-action outcome list
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// The action's name, or its kind label when unnamed
    pub action: String,
    pub status: ActionStatus,
}

impl ActionOutcome {
    pub fn ok(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            status: ActionStatus::Ok,
        }
    }

    pub fn skipped(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            status: ActionStatus::Skipped,
        }
    }

    pub fn failed(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            status: ActionStatus::Failed {
                reason: reason.into(),
            },
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, ActionStatus::Failed { .. })
    }
}

/// The result a caller receives once a flow reaches a terminal state
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub status: FlowStatus,
    /// Every attempted action, in completion order
    pub outcomes: Vec<ActionOutcome>,
    /// Dead-reckoned pose at the end of the flow
    pub final_pose: Pose,
}

impl ExecutionReport {
    /// Outcomes that recorded a failure
    pub fn failures(&self) -> impl Iterator<Item = &ActionOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }
}

/// One result row from the search collaborator
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_constructors() {
        assert_eq!(ActionOutcome::ok("stand").status, ActionStatus::Ok);
        assert_eq!(ActionOutcome::skipped("wait").status, ActionStatus::Skipped);

        let failed = ActionOutcome::failed("move", "actuator offline");
        assert!(failed.is_failed());
        match failed.status {
            ActionStatus::Failed { reason } => assert_eq!(reason, "actuator offline"),
            other => panic!("Expected failed, got {:?}", other),
        }
    }

    #[test]
    fn test_report_failures_filter() {
        let report = ExecutionReport {
            status: FlowStatus::Failed,
            outcomes: vec![
                ActionOutcome::ok("stand"),
                ActionOutcome::failed("move", "timeout"),
                ActionOutcome::skipped("speak"),
            ],
            final_pose: Pose::default(),
        };
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(FlowStatus::Completed.to_string(), "completed");
        assert_eq!(FlowStatus::Aborted.to_string(), "aborted");
    }
}
