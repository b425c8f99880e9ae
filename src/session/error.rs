use thiserror::Error;

use super::navigator::FieldKey;
use crate::store::StoreError;

/// Errors surfaced by an edit session. None of them are fatal: the draft
/// survives every failure and the caller can retry or reset.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Client-side check failed; the field stays open.
    #[error("{0}")]
    Validation(String),

    /// The store could not be reached or did not answer in time.
    #[error("{0}")]
    Network(String),

    /// The store answered with an error or an unusable payload.
    #[error("{0}")]
    ServerRejection(String),

    #[error("a save is already in progress")]
    CommitInFlight,

    #[error("no field is open for editing")]
    NotEditing,

    #[error("no save is in progress")]
    NotSaving,

    /// The store is still processing the agent's attachments.
    #[error("{0} is locked while attachments are being processed")]
    Locked(FieldKey),

    #[error("{0} cannot be edited")]
    NotEditable(FieldKey),

    #[error("not authorized to edit agents")]
    Unauthorized,
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Http(e) => Self::Network(e.to_string()),
            StoreError::Unauthorized => Self::ServerRejection("Access denied".to_string()),
            StoreError::NotFound(msg)
            | StoreError::BadRequest(msg)
            | StoreError::Server(msg)
            | StoreError::Malformed(msg) => Self::ServerRejection(msg),
        }
    }
}
