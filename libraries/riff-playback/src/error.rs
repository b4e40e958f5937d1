//! Error types for playback control

use crate::events::ErrorKind;
use riff_audio::AudioError;
use riff_core::{CoreError, TrackId};
use std::fmt;
use thiserror::Error;

/// Which end of the queue was hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// `prev()` at the first entry (or with no cursor)
    Start,
    /// `next()` at the last entry (or on an empty queue)
    End,
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::End => write!(f, "end"),
        }
    }
}

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Navigation past either end of the queue
    #[error("Queue boundary reached at {0}")]
    QueueBoundary(Boundary),

    /// Operation not valid in the current transport state
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Track missing from the store
    #[error("Track not found: {0}")]
    NotFound(TrackId),

    /// The platform decoder could not produce audio
    #[error("Decode failed: {0}")]
    Decode(String),

    /// An external resource (impulse response) could not be acquired
    #[error("Resource load failed: {0}")]
    ResourceLoad(String),

    /// A store or settings write was rejected
    #[error("Write failed: {0}")]
    Write(String),

    /// Store error
    #[error(transparent)]
    Store(#[from] CoreError),

    /// Audio graph error
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// Settings could not be read
    #[error("Settings error: {0}")]
    Settings(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl PlaybackError {
    /// Create a precondition error
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Classification reported on error events
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Store(e) if e.is_not_found() => ErrorKind::NotFound,
            Self::Decode(_) => ErrorKind::DecodeFailure,
            Self::ResourceLoad(_) => ErrorKind::ResourceLoadFailure,
            Self::QueueBoundary(_)
            | Self::Precondition(_)
            | Self::Audio(AudioError::InvalidBand { .. }) => ErrorKind::PreconditionFailure,
            Self::Audio(_) => ErrorKind::GraphFailure,
            Self::Write(_)
            | Self::Store(_)
            | Self::Settings(_)
            | Self::Io(_)
            | Self::Serialization(_) => ErrorKind::WriteFailure,
        }
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
