//! Canned flows built from typed actions

use flow_types::{Action, ActionKind, Flow};

/// A greeting sequence: stand, walk toward the person, crouch, welcome
/// them, and stand back up. `distance` is how far to walk, in meters.
pub fn welcome_flow(distance: f64) -> Flow {
    const WALK_SPEED: f64 = 0.3;

    Flow::new(vec![
        Action::new(ActionKind::Stand)
            .with_name("Stand up")
            .with_duration(2.0),
        Action::new(ActionKind::Move {
            vx: WALK_SPEED,
            vy: 0.0,
            vyaw: 0.0,
        })
        .with_name("Walk to person")
        .with_duration(distance / WALK_SPEED),
        Action::new(ActionKind::Stop)
            .with_name("Stop")
            .with_duration(0.5),
        Action::new(ActionKind::Crouch { height: 0.4 })
            .with_name("Crouch")
            .with_duration(2.0),
        Action::new(ActionKind::Speak {
            text: "Welcome! Good to see you!".into(),
        })
        .with_name("Greet"),
        Action::new(ActionKind::Wait)
            .with_name("Hold")
            .with_duration(2.0),
        Action::new(ActionKind::Stand)
            .with_name("Stand back up")
            .with_duration(2.0),
    ])
}
