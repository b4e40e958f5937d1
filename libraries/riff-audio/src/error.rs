/// Audio-specific errors
use crate::graph::NodeId;
use thiserror::Error;

/// Result type alias using `AudioError`
pub type Result<T> = std::result::Result<T, AudioError>;

/// Audio error types
#[derive(Error, Debug)]
pub enum AudioError {
    /// Node id does not belong to this context (or was removed)
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// Connection rejected by the graph
    #[error("Invalid connection {from} -> {to}: {reason}")]
    InvalidConnection {
        from: NodeId,
        to: NodeId,
        reason: &'static str,
    },

    /// EQ band index outside the configured bank
    #[error("EQ band {index} out of range (bank has {len} bands)")]
    InvalidBand { index: usize, len: usize },

    /// Reverb requested without an impulse response
    #[error("Reverb enabled without an impulse response")]
    MissingImpulseResponse,

    /// The impulse response is empty
    #[error("Impulse response is empty")]
    EmptyImpulseResponse,

    /// Invalid channel count (must be 1 or 2)
    #[error("Invalid channel count: {0} (must be 1 or 2)")]
    InvalidChannelCount(usize),

    /// Invalid audio buffer
    #[error("Invalid audio buffer: {0}")]
    InvalidBuffer(String),

    /// Platform decoder failed
    #[error("Decode error: {0}")]
    Decode(String),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Impulse response could not be fetched
    #[error("Impulse response unavailable: {0}")]
    ImpulseResponse(String),

    /// WAV read error
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AudioError {
    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create an impulse-response acquisition error
    pub fn impulse_response(msg: impl Into<String>) -> Self {
        Self::ImpulseResponse(msg.into())
    }
}
