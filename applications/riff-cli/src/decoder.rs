//! WAV file decoder standing in for the platform decoder

use async_trait::async_trait;
use riff_audio::{AudioError, DecodedAudio};
use riff_core::{MediaLocator, Track};
use riff_playback::MediaDecoder;
use std::path::{Path, PathBuf};

/// Decodes local WAV files named by a track's media locator
///
/// Relative locators resolve against `root` (usually the catalog directory);
/// `file://` prefixes are stripped. Remote locators are rejected.
#[derive(Debug, Clone)]
pub struct WavDecoder {
    root: PathBuf,
}

impl WavDecoder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// File a locator points at
    pub fn resolve(&self, locator: &MediaLocator) -> riff_audio::Result<PathBuf> {
        if locator.is_remote() {
            return Err(AudioError::decode(format!(
                "remote media is not supported offline: {locator}"
            )));
        }

        let raw = locator.as_str();
        let path = Path::new(raw.strip_prefix("file://").unwrap_or(raw));
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            Ok(self.root.join(path))
        }
    }
}

/// Read a whole WAV file into stereo PCM
pub fn read_wav(path: &Path) -> riff_audio::Result<DecodedAudio> {
    if !path.exists() {
        return Err(AudioError::FileNotFound(path.display().to_string()));
    }

    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    DecodedAudio::from_interleaved(samples, spec.sample_rate, usize::from(spec.channels))
}

#[async_trait]
impl MediaDecoder for WavDecoder {
    async fn decode(&self, track: &Track) -> riff_audio::Result<DecodedAudio> {
        let path = self.resolve(&track.url)?;
        tracing::debug!(track = %track.id, path = %path.display(), "Decoding");

        tokio::task::spawn_blocking(move || read_wav(&path))
            .await
            .map_err(|e| AudioError::decode(e.to_string()))?
    }
}
