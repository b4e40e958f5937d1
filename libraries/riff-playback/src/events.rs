//! Playback Events
//!
//! Event-based communication for UI synchronization. The session publishes on
//! a broadcast channel; every subscriber sees every event emitted after it
//! subscribed.

use riff_audio::EffectSettings;
use riff_core::TrackId;
use serde::{Deserialize, Serialize};

/// Transport state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TransportState {
    /// Nothing loaded
    #[default]
    Idle,
    /// Resolving queue and decoding
    Loading,
    /// Decoded and attached, not playing
    Ready,
    /// Rendering audio
    Playing,
    /// Paused mid-track
    Paused,
    /// Current track failed (session still usable)
    Error,
}

impl TransportState {
    /// Whether transport and effect controls apply in this state
    pub fn is_loaded(self) -> bool {
        matches!(self, Self::Ready | Self::Playing | Self::Paused)
    }
}

/// Error classification carried on [`PlaybackEvent::Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A requested track is missing
    NotFound,
    /// The decoder failed; the session entered `Error`
    DecodeFailure,
    /// An external resource failed; the effect fell back
    ResourceLoadFailure,
    /// The effects graph could not be rebuilt; the session entered `Error`
    GraphFailure,
    /// Operation not valid in the current state
    PreconditionFailure,
    /// A store or settings write was rejected; local state is kept
    WriteFailure,
}

/// Events emitted by the playback session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    /// Track decoded and attached to the effects graph
    Ready { track_id: TrackId },

    /// Playback started or resumed
    Playing { track_id: TrackId },

    /// Playback paused
    Paused { track_id: TrackId },

    /// Track played to its end
    Finished { track_id: TrackId },

    /// Something went wrong
    Error { kind: ErrorKind, message: String },

    /// Transport state changed
    StateChanged { state: TransportState },

    /// Current track changed (at load start)
    TrackChanged {
        track_id: TrackId,
        previous_track_id: Option<TrackId>,
    },

    /// Queue replaced or cursor moved
    QueueChanged {
        length: usize,
        position: Option<usize>,
    },

    /// Effect settings changed
    EffectsChanged { settings: EffectSettings },
}
