//! Declarative flow documents for Strider
//!
//! A flow document is a list of key-value action records, expressible in
//! any format that deserializes to `serde_json::Value` (JSON, YAML via a
//! transcode, a hand-built value tree). This crate compiles such a
//! document into the typed `Flow` from `flow-types`.
//!
//! Validation is eager: an unknown `kind` or a malformed record fails
//! `compile` before any actuator call can happen.
//!
//! # Document shape
//!
//! ```text
//! [
//!   { "kind": "stand", "name": "Get up", "duration": 2.0 },
//!   { "kind": "move", "params": { "vx": 0.3 }, "duration": 2.0 },
//!   { "kind": "wait", "duration": 1.0 },
//!   { "kind": "speak", "params": { "text": "hello" } },
//!   { "kind": "loop", "params": { "count": 3 }, "actions": [ ... ] },
//!   { "kind": "parallel", "branches": [ [ ... ], [ ... ] ] },
//!   { "kind": "condition", "guard": "pose.x < 1.0", "actions": [ ... ] }
//! ]
//! ```
//!
//! # Usage
//!
//! ```rust
//! use serde_json::json;
//!
//! let doc = json!([
//!     { "kind": "stand" },
//!     { "kind": "move", "params": { "vx": 0.3 }, "duration": 2.0 },
//! ]);
//!
//! let flow = flow_dsl::compile(&doc).unwrap();
//! assert_eq!(flow.len(), 2);
//! ```

#![deny(unsafe_code)]

mod compiler;
mod library;
mod validator;

pub use compiler::compile;
pub use library::welcome_flow;
pub use validator::validate;
