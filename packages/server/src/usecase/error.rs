//! UseCase layer error definitions

use thiserror::Error;

use crate::domain::{RepositoryError, ValueError};

/// Generic text for authorization failures; never reveals the reason.
pub const PERMISSION_DENIED_MESSAGE: &str = "You do not have permission to do that";

/// Generic text for store failures; details are only logged.
pub const INTERNAL_ERROR_MESSAGE: &str = "Something went wrong, please try again";

/// Errors reported privately to the originating connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// Malformed or empty input, unrecognized reaction kind
    #[error("validation failed: {0}")]
    Validation(String),

    /// Message or room missing, deleted or not visible
    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied")]
    PermissionDenied,

    /// Duplicate reaction
    #[error("conflict: {0}")]
    Conflict(String),

    /// A store read or write failed
    #[error("store failure: {0}")]
    Store(#[from] RepositoryError),
}

impl From<ValueError> for ChatError {
    fn from(err: ValueError) -> Self {
        ChatError::Validation(err.to_string())
    }
}

impl ChatError {
    /// Text placed in the private `error{message}` reply
    pub fn client_message(&self) -> String {
        match self {
            ChatError::Validation(message)
            | ChatError::NotFound(message)
            | ChatError::Conflict(message) => message.clone(),
            ChatError::PermissionDenied => PERMISSION_DENIED_MESSAGE.to_string(),
            ChatError::Store(_) => INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }
}

/// Errors that reject a connection before it joins a room.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("missing or invalid token")]
    Unauthenticated,

    #[error("invalid room: {0}")]
    InvalidRoom(String),

    #[error("access to room denied")]
    AccessDenied,

    #[error("store failure: {0}")]
    Store(#[from] RepositoryError),
}
