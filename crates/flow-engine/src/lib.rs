//! Flow execution engine for Strider
//!
//! Drives an actuated robot through a declarative `Flow`: primitive
//! motions, timed waits, speech/display/search side effects, conditional
//! branches, bounded loops, and concurrently-running sub-sequences,
//! while maintaining a dead-reckoned pose estimate.
//!
//! # Key Concepts
//!
//! - **FlowEngine**: the sequencer. Walks an action list in order,
//!   dispatches each kind, applies guards, advances the pose estimate,
//!   fires lifecycle callbacks, and enforces the error policy.
//! - **Collaborators**: external interfaces (actuator, voice, display,
//!   search) the engine calls but does not own. Every handle is
//!   optional; absence degrades to a warned no-op, never a fault.
//! - **Guard evaluator**: a restricted boolean/arithmetic/comparison
//!   grammar over whitelisted variables. Never host-language code.
//! - **Navigator**: open-loop dead-reckoning plans for rotate and
//!   move-to. No sensor feedback, drift is accepted.
//!
//! # Design Principles
//!
//! 1. One flow execution has one driver task. Parallel blocks fan out
//!    into spawned tasks that are joined before the driver continues;
//!    nothing outlives the parallel action.
//! 2. The pose estimate and the actuator share a single serialization
//!    point, held for the whole of one motion leaf.
//! 3. Cancellation is cooperative: `stop()` is observed at sequence,
//!    loop, and join checkpoints, never by interrupting an in-flight
//!    actuator command.

#![deny(unsafe_code)]

mod collaborators;
mod engine;
mod guard;
mod nav;

pub use collaborators::*;
pub use engine::*;
pub use guard::{evaluate_guard, GuardContext, GuardError, GuardValue};
pub use nav::*;
