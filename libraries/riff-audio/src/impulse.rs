//! Impulse responses for the reverb stage
//!
//! The response itself is an external resource: the session asks an
//! [`ImpulseResponseSource`] for it once, on the first reverb enable, and
//! caches the decoded result until the session ends.

use crate::error::{AudioError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Decoded impulse response (interleaved, mono or stereo)
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponse {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: usize,
}

impl ImpulseResponse {
    /// Wrap raw samples
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: usize) -> Result<Self> {
        if channels != 1 && channels != 2 {
            return Err(AudioError::InvalidChannelCount(channels));
        }
        if samples.is_empty() {
            return Err(AudioError::EmptyImpulseResponse);
        }
        if samples.len() % channels != 0 {
            return Err(AudioError::InvalidBuffer(format!(
                "{} samples is not a whole number of {}-channel frames",
                samples.len(),
                channels
            )));
        }

        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// Read an impulse response from a WAV file
    pub fn from_wav<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
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
                let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max_val))
                    .collect::<std::result::Result<_, _>>()?
            }
        };

        Self::new(samples, spec.sample_rate, spec.channels as usize)
    }

    /// Interleaved samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate of the recording
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count (1 or 2)
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Length in frames
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Linearly interpolated copy at `sample_rate`
    ///
    /// Returns an unchanged copy when the rates already match.
    #[must_use]
    pub fn resampled(&self, sample_rate: u32) -> Self {
        if sample_rate == self.sample_rate || sample_rate == 0 || self.sample_rate == 0 {
            return self.clone();
        }

        let step = f64::from(self.sample_rate) / f64::from(sample_rate);
        let frames = self.frames();
        let out_frames = ((frames as f64 / step).ceil() as usize).max(1);
        let channels = self.channels;

        let mut samples = Vec::with_capacity(out_frames * channels);
        for i in 0..out_frames {
            let pos = i as f64 * step;
            let index = (pos.floor() as usize).min(frames - 1);
            let next = (index + 1).min(frames - 1);
            let frac = (pos - index as f64).clamp(0.0, 1.0) as f32;
            for c in 0..channels {
                let a = self.samples[index * channels + c];
                let b = self.samples[next * channels + c];
                samples.push(a + (b - a) * frac);
            }
        }

        tracing::debug!(from = self.sample_rate, to = sample_rate, frames, out_frames, "Impulse response resampled");

        Self {
            samples,
            sample_rate,
            channels,
        }
    }
}

/// Where the reverb impulse response comes from
#[async_trait]
pub trait ImpulseResponseSource: Send + Sync {
    /// Fetch and decode the impulse response
    async fn fetch(&self) -> Result<ImpulseResponse>;
}

/// Impulse response read from a WAV file on disk
#[derive(Debug, Clone)]
pub struct WavImpulseResponse {
    path: PathBuf,
}

impl WavImpulseResponse {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ImpulseResponseSource for WavImpulseResponse {
    async fn fetch(&self) -> Result<ImpulseResponse> {
        let path = self.path.clone();
        tracing::debug!(path = %path.display(), "Loading impulse response");

        tokio::task::spawn_blocking(move || ImpulseResponse::from_wav(path))
            .await
            .map_err(|e| AudioError::impulse_response(e.to_string()))?
    }
}

/// Impulse response held in memory (or absent)
///
/// `StaticImpulseResponse::unavailable()` always fails, which is how a session
/// without any reverb resource is wired.
#[derive(Debug, Clone, Default)]
pub struct StaticImpulseResponse {
    ir: Option<Arc<ImpulseResponse>>,
}

impl StaticImpulseResponse {
    pub fn new(ir: ImpulseResponse) -> Self {
        Self {
            ir: Some(Arc::new(ir)),
        }
    }

    /// Source that reports the resource as missing
    pub fn unavailable() -> Self {
        Self { ir: None }
    }
}

#[async_trait]
impl ImpulseResponseSource for StaticImpulseResponse {
    async fn fetch(&self) -> Result<ImpulseResponse> {
        self.ir
            .as_deref()
            .cloned()
            .ok_or_else(|| AudioError::impulse_response("no impulse response configured"))
    }
}
