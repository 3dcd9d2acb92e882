//! Validator: structural checks over a compiled Flow
//!
//! Catches authoring mistakes that are well-formed JSON but cannot be
//! executed sensibly (negative durations, zero speeds, empty parallel
//! branches). Guard expressions are NOT checked here: a malformed guard
//! is a runtime skip-with-warning, never a load failure.

use flow_types::{Action, ActionKind, Flow, FlowError, FlowResult};

/// Validate a compiled flow. Called by `compile`, and usable standalone
/// for flows constructed directly from typed actions.
pub fn validate(flow: &Flow) -> FlowResult<()> {
    for action in flow.iter() {
        validate_action(action)?;
    }
    Ok(())
}

fn validate_action(action: &Action) -> FlowResult<()> {
    let label = action.display_name();

    if let Some(duration) = action.duration {
        if !duration.is_finite() || duration < 0.0 {
            return Err(malformed(label, "duration must be finite and non-negative"));
        }
    }

    match &action.kind {
        ActionKind::Crouch { height } => {
            if !height.is_finite() || *height < 0.0 {
                return Err(malformed(label, "height must be finite and non-negative"));
            }
        }
        ActionKind::Move { vx, vy, vyaw } => {
            if ![vx, vy, vyaw].iter().all(|v| v.is_finite()) {
                return Err(malformed(label, "velocities must be finite"));
            }
        }
        ActionKind::MoveTo { x, y, speed, .. } => {
            if !x.is_finite() || !y.is_finite() {
                return Err(malformed(label, "target position must be finite"));
            }
            if !speed.is_finite() || *speed <= 0.0 {
                return Err(malformed(label, "speed must be positive"));
            }
        }
        ActionKind::Rotate { angle, speed } => {
            if !angle.is_finite() {
                return Err(malformed(label, "angle must be finite"));
            }
            if !speed.is_finite() || *speed <= 0.0 {
                return Err(malformed(label, "speed must be positive"));
            }
        }
        ActionKind::Trick { command } => {
            if command.is_empty() {
                return Err(malformed(label, "trick requires a 'command' param"));
            }
        }
        ActionKind::Search { max_results, .. } => {
            if *max_results == 0 {
                return Err(malformed(label, "max_results must be at least 1"));
            }
        }
        ActionKind::Conditional { actions, .. } | ActionKind::Loop { actions, .. } => {
            for nested in actions {
                validate_action(nested)?;
            }
        }
        ActionKind::Parallel { branches } => {
            if branches.is_empty() {
                return Err(malformed(label, "parallel requires at least one branch"));
            }
            for branch in branches {
                if branch.is_empty() {
                    return Err(malformed(label, "parallel branches must not be empty"));
                }
                for nested in branch {
                    validate_action(nested)?;
                }
            }
        }
        ActionKind::Stand
        | ActionKind::Sit
        | ActionKind::Stop
        | ActionKind::Wait
        | ActionKind::Speak { .. }
        | ActionKind::Show { .. } => {}
    }

    Ok(())
}

fn malformed(label: &str, message: &str) -> FlowError {
    FlowError::MalformedAction {
        action: label.into(),
        message: message.into(),
    }
}
