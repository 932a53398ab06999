//! Domain error types.

use thiserror::Error;

/// Errors raised while constructing value objects from untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("message content must not be empty")]
    EmptyContent,

    #[error("message content exceeds {max} characters (got {actual})")]
    ContentTooLong { max: usize, actual: usize },

    #[error("invalid room name: '{0}'")]
    InvalidRoomName(String),

    #[error("unknown reaction kind: '{0}'")]
    UnknownReaction(String),

    #[error("unknown role: '{0}'")]
    UnknownRole(String),
}

/// Errors surfaced by the persistence gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// The store rejected or failed the operation
    #[error("database error: {0}")]
    Database(String),

    /// A uniqueness constraint rejected the write
    #[error("conflicting record: {0}")]
    Conflict(String),

    /// A stored row could not be mapped back to the domain model
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl From<ValueError> for RepositoryError {
    fn from(err: ValueError) -> Self {
        RepositoryError::Corrupt(err.to_string())
    }
}

/// Errors raised when pushing events to live connections.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("connection '{0}' not found")]
    ConnectionNotFound(String),

    #[error("failed to push message: {0}")]
    PushFailed(String),

    #[error("failed to encode event: {0}")]
    Encode(String),
}

/// Errors raised by the notification-center sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    #[error("notification sink unavailable: {0}")]
    Unavailable(String),
}
