/// Core error types for Riff Player
use crate::types::{TrackId, UserId};
use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors surfaced by store implementations
#[derive(Error, Debug)]
pub enum CoreError {
    /// Track snapshot missing from the store
    #[error("Track not found: {0}")]
    TrackNotFound(TrackId),

    /// User snapshot missing from the store
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// A write (view count, like set) was rejected
    #[error("Write failed: {0}")]
    Write(String),

    /// Store unreachable or returned garbage
    #[error("Store error: {0}")]
    Store(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a write error
    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }

    /// Create a generic store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Whether the error means "the record does not exist"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::TrackNotFound(_) | Self::UserNotFound(_))
    }
}
