//! Error types for the flow layer

/// Errors raised while loading or executing a flow
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// The document names an action kind that does not exist.
    /// Raised at load time, never during execution.
    #[error("Unknown action kind: '{0}'")]
    UnknownActionKind(String),

    /// The document's shape is wrong for the named action.
    /// Raised at load time, never during execution.
    #[error("Malformed action '{action}': {message}")]
    MalformedAction { action: String, message: String },

    /// A guard expression could not be evaluated. Treated as
    /// guard-false (skip) with a warning, never a flow failure.
    #[error("Guard evaluation failed: {0}")]
    GuardEvaluation(String),

    /// The actuator rejected or failed a command
    #[error("Actuator command failed: {0}")]
    ActuatorCommand(String),

    /// A present collaborator reported itself unusable
    #[error("Collaborator '{collaborator}' unavailable: {message}")]
    CollaboratorUnavailable {
        collaborator: &'static str,
        message: String,
    },

    /// The engine is single-flight; a flow is already in progress
    #[error("A flow is already executing")]
    AlreadyRunning,
}

/// Result type alias for flow operations
pub type FlowResult<T> = Result<T, FlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = FlowError::UnknownActionKind("moonwalk".into());
        assert_eq!(err.to_string(), "Unknown action kind: 'moonwalk'");

        let err = FlowError::MalformedAction {
            action: "loop".into(),
            message: "count must be an integer".into(),
        };
        assert!(err.to_string().contains("loop"));
        assert!(err.to_string().contains("count"));

        let err = FlowError::GuardEvaluation("unknown variable 'doom'".into());
        assert!(err.to_string().contains("Guard evaluation failed"));
    }
}
