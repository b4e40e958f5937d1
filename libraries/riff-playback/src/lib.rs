//! Riff Player - Playback Control
//!
//! Queue, boost selection and the playback session for Riff Player.
//!
//! This crate provides:
//! - [`TrackQueue`]: ordered, navigable queue that never wraps
//! - [`BoostSelector`]: weighted-random pick of a promoted track
//! - [`PlaybackController`]: load → decode → graph attach → play, with a
//!   transport state machine that tolerates overlapping loads
//! - Effect settings persistence behind [`SettingsStore`]
//!
//! # Architecture
//!
//! The controller does no I/O of its own. Track documents come from a
//! [`riff_core::TrackStore`], PCM from a [`MediaDecoder`], and the reverb
//! impulse response from a [`riff_audio::ImpulseResponseSource`]. State
//! changes are published as [`PlaybackEvent`]s on a broadcast channel.
//!
//! # Example
//!
//! ```rust
//! use riff_audio::DecodedAudio;
//! use riff_core::{MemoryStore, Track};
//! use riff_playback::{PlaybackController, StaticDecoder, TransportState};
//! use std::sync::Arc;
//!
//! # async fn example() -> riff_playback::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! store.insert_track(Track::new("t1", "blob:t1", "artist-1"));
//!
//! let decoder = Arc::new(StaticDecoder::new());
//! decoder.insert("blob:t1", DecodedAudio::silence(44100, 44100));
//!
//! let controller = PlaybackController::new(store.clone(), decoder);
//! let track = store.track(&"t1".into()).unwrap();
//! controller.load(track, None).await?;
//! assert_eq!(controller.state(), TransportState::Playing);
//!
//! let mut block = vec![0.0; 1024];
//! controller.process_audio(&mut block);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod boost;
pub mod config;
pub mod controller;
pub mod decoder;
pub mod error;
pub mod events;
pub mod queue;
pub mod settings;

pub use boost::BoostSelector;
pub use config::PlaybackConfig;
pub use controller::{EffectKind, LoadOutcome, PlaybackController, PlaybackControllerBuilder};
pub use decoder::{MediaDecoder, StaticDecoder};
pub use error::{Boundary, PlaybackError, Result};
pub use events::{ErrorKind, PlaybackEvent, TransportState};
pub use queue::TrackQueue;
pub use settings::{JsonSettingsStore, MemorySettingsStore, SettingsStore};
