//! The agent-store seam used by edit sessions.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Agent, AgentForm};

/// Errors returned by an agent store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized: API key required or invalid")]
    Unauthorized,

    #[error("{0}")]
    Server(String),

    /// The response could not be parsed into the expected shape.
    #[error("{0}")]
    Malformed(String),
}

/// Where committed agents live.
///
/// Every call either returns the store's canonical agent or fails without
/// side effects on the caller.
#[async_trait]
pub trait AgentStore: Send + Sync {
    /// Fetch the full snapshot of an agent.
    async fn fetch(&self, name: &str) -> Result<Agent, StoreError>;

    /// Create a new agent from `form`.
    async fn create(&self, form: &AgentForm) -> Result<Agent, StoreError>;

    /// Replace the editable fields of `name` and apply the attachment diff.
    async fn update(&self, name: &str, form: &AgentForm) -> Result<Agent, StoreError>;
}
