/// Decoded PCM handed over by the platform decoder
use crate::error::{AudioError, Result};
use std::sync::Arc;

/// Fully decoded track as interleaved stereo f32 samples
///
/// Mono input is duplicated to both channels on construction, so every node
/// downstream of a source only ever sees stereo frames. Samples are shared
/// behind an `Arc`; rewinding or re-attaching a track never copies them.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl DecodedAudio {
    /// Wrap interleaved samples with the given channel count (1 or 2)
    pub fn from_interleaved(samples: Vec<f32>, sample_rate: u32, channels: usize) -> Result<Self> {
        if sample_rate == 0 {
            return Err(AudioError::InvalidBuffer("sample rate is zero".into()));
        }

        let samples: Arc<[f32]> = match channels {
            1 => samples.iter().flat_map(|&s| [s, s]).collect(),
            2 => {
                if samples.len() % 2 != 0 {
                    return Err(AudioError::InvalidBuffer(format!(
                        "odd sample count {} for stereo data",
                        samples.len()
                    )));
                }
                samples.into()
            }
            n => return Err(AudioError::InvalidChannelCount(n)),
        };

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Silent stereo buffer of the given length
    pub fn silence(frames: usize, sample_rate: u32) -> Self {
        Self {
            samples: vec![0.0; frames * 2].into(),
            sample_rate: sample_rate.max(1),
        }
    }

    /// Interleaved stereo samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of stereo frames
    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }

    /// Whether the buffer has no frames
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds at the native sample rate
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }
}
