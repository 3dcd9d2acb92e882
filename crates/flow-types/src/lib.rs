//! Flow domain types for Strider
//!
//! A **Flow** is a declarative program for an actuated robot: an ordered
//! list of actions covering primitive motions, timed waits, speech and
//! display side effects, and control-flow blocks (conditionals, bounded
//! loops, parallel branches).
//!
//! # Key Concepts
//!
//! - **Action**: one typed step of a flow. Its `kind` is a closed enum,
//!   so adding or removing a kind is a compile-checked change.
//! - **Flow**: an ordered sequence of actions. Insertion order is
//!   execution order, except inside a parallel block where it only fixes
//!   spawn order.
//! - **Pose**: the dead-reckoned position estimate. Integrated from
//!   commanded velocities, never read back from sensors, and explicitly
//!   allowed to drift.
//! - **ExecutionReport**: the terminal record of one flow execution,
//!   enumerating every attempted action with its outcome.
//!
//! # Design Principles
//!
//! 1. Types here are pure data. Dispatch, timing, and collaborator IO
//!    live in `flow-engine`; document loading lives in `flow-dsl`.
//! 2. Guards are opaque strings at this layer. The engine evaluates them
//!    against a whitelisted grammar, never host-language code.

#![deny(unsafe_code)]

mod action;
mod errors;
mod outcome;
mod pose;

pub use action::*;
pub use errors::*;
pub use outcome::*;
pub use pose::*;
