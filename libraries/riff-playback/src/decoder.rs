//! Platform decoder contract
//!
//! Container parsing and codecs live outside the engine. The session hands a
//! track snapshot to a [`MediaDecoder`] and awaits fully decoded PCM; the
//! returned future resolving is the "decode ready" signal.

use async_trait::async_trait;
use riff_audio::{AudioError, DecodedAudio};
use riff_core::{MediaLocator, Track};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Decodes a track's media into interleaved stereo PCM
#[async_trait]
pub trait MediaDecoder: Send + Sync {
    async fn decode(&self, track: &Track) -> riff_audio::Result<DecodedAudio>;
}

/// Decoder serving pre-decoded audio keyed by media locator
#[derive(Debug, Default)]
pub struct StaticDecoder {
    media: RwLock<HashMap<MediaLocator, DecodedAudio>>,
}

impl StaticDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register audio for a locator
    pub fn insert(&self, locator: impl Into<String>, audio: DecodedAudio) {
        self.media
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(MediaLocator::new(locator), audio);
    }
}

#[async_trait]
impl MediaDecoder for StaticDecoder {
    async fn decode(&self, track: &Track) -> riff_audio::Result<DecodedAudio> {
        self.media
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&track.url)
            .cloned()
            .ok_or_else(|| AudioError::decode(format!("no media at {}", track.url)))
    }
}
