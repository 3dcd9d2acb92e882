//! Collaborator interfaces: devices and services the engine borrows
//!
//! Each collaborator is an object-safe async trait. The engine holds
//! optional `Arc` handles; a missing handle degrades the corresponding
//! actions to warned no-ops so a flow can run on a bench without the
//! robot, the speaker, or the network.

use async_trait::async_trait;
use flow_types::{DisplayKind, SearchHit};
use std::sync::Arc;

/// Error returned by a collaborator call.
///
/// The engine maps these onto the flow error taxonomy; collaborators
/// themselves only report what went wrong.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{0}")]
pub struct CommandError(pub String);

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Result type for collaborator commands
pub type CommandResult = Result<(), CommandError>;

/// The robot's motion interface
#[async_trait]
pub trait Actuator: Send + Sync {
    async fn stand(&self) -> CommandResult;
    async fn sit(&self) -> CommandResult;
    /// Halt all motion immediately
    async fn stop(&self) -> CommandResult;
    /// Body-frame velocity command: forward, lateral, yaw rate
    async fn drive(&self, vx: f64, vy: f64, vyaw: f64) -> CommandResult;
    /// Named gait or trick command, passed through opaquely
    async fn trick(&self, command: &str) -> CommandResult;
}

/// Speech synthesis
#[async_trait]
pub trait Voice: Send + Sync {
    async fn speak(&self, text: &str) -> CommandResult;
}

/// An attached display panel
#[async_trait]
pub trait Screen: Send + Sync {
    async fn show(&self, title: &str, content: &str, kind: DisplayKind) -> CommandResult;
}

/// Web search provider
#[async_trait]
pub trait Search: Send + Sync {
    async fn query(&self, text: &str, max_results: usize)
        -> Result<Vec<SearchHit>, CommandError>;
}

/// The collaborator handles one engine borrows for a flow's duration.
///
/// All handles are optional. The engine never owns a collaborator's
/// lifecycle; connection management stays with the embedder.
#[derive(Clone, Default)]
pub struct Collaborators {
    pub actuator: Option<Arc<dyn Actuator>>,
    pub voice: Option<Arc<dyn Voice>>,
    pub display: Option<Arc<dyn Screen>>,
    pub search: Option<Arc<dyn Search>>,
}

impl Collaborators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_actuator(mut self, actuator: Arc<dyn Actuator>) -> Self {
        self.actuator = Some(actuator);
        self
    }

    pub fn with_voice(mut self, voice: Arc<dyn Voice>) -> Self {
        self.voice = Some(voice);
        self
    }

    pub fn with_display(mut self, display: Arc<dyn Screen>) -> Self {
        self.display = Some(display);
        self
    }

    pub fn with_search(mut self, search: Arc<dyn Search>) -> Self {
        self.search = Some(search);
        self
    }
}
