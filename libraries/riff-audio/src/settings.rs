//! User-adjustable effect settings
//!
//! Settings are plain data. Every mutation goes through a setter that applies
//! the clamping and quantization rules, so a persisted value is always one the
//! graph can apply as-is.

use crate::error::{AudioError, Result};
use serde::{Deserialize, Serialize};

/// Bounds applied by the setters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectLimits {
    /// Per-band gain bound in dB (symmetric)
    pub max_band_gain_db: f32,
    /// Slowest tempo rate
    pub min_rate: f32,
    /// Fastest tempo rate
    pub max_rate: f32,
    /// Rate quantization step
    pub rate_step: f32,
    /// Rate changes smaller than this are ignored
    pub rate_hysteresis: f32,
    /// Pitch offset bound in semitones (symmetric)
    pub max_pitch_semitones: f32,
}

impl Default for EffectLimits {
    fn default() -> Self {
        Self {
            max_band_gain_db: 12.0,
            min_rate: 0.4,
            max_rate: 2.0,
            rate_step: 0.1,
            rate_hysteresis: 0.05,
            max_pitch_semitones: 12.0,
        }
    }
}

impl EffectLimits {
    /// Clamp to the rate bounds and snap to the step grid
    pub fn quantize_rate(&self, rate: f32) -> f32 {
        let clamped = if rate.is_finite() {
            rate.clamp(self.min_rate, self.max_rate)
        } else {
            1.0_f32.clamp(self.min_rate, self.max_rate)
        };
        let steps = (1.0 / self.rate_step).round().max(1.0);
        ((clamped * steps).round() / steps).clamp(self.min_rate, self.max_rate)
    }
}

/// Effect settings applied on every graph rebuild
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectSettings {
    /// Gain per EQ band in dB, in band order
    pub band_gains: Vec<f32>,
    /// Whether the convolution reverb path is connected
    pub reverb_enabled: bool,
    /// Wet path gain while reverb is enabled
    pub wet_mix: f32,
    /// Dry path gain while reverb is enabled (1.0 otherwise)
    pub dry_mix: f32,
    /// Tempo rate; pitch follows unless `preserve_pitch` is set
    pub rate: f32,
    /// Pitch offset in semitones, independent of rate
    pub pitch_semitones: f32,
    /// Counteract the pitch change caused by `rate`
    pub preserve_pitch: bool,
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self {
            band_gains: vec![0.0; 7],
            reverb_enabled: false,
            wet_mix: 0.3,
            dry_mix: 0.7,
            rate: 1.0,
            pitch_semitones: 0.0,
            preserve_pitch: false,
        }
    }
}

impl EffectSettings {
    /// Flat settings for a bank of `bands` filters
    pub fn with_band_count(bands: usize) -> Self {
        Self {
            band_gains: vec![0.0; bands],
            ..Self::default()
        }
    }

    /// Bring externally loaded settings back inside the limits
    ///
    /// The band array is truncated or zero-padded to `bands` entries.
    #[must_use]
    pub fn normalized(mut self, bands: usize, limits: &EffectLimits) -> Self {
        self.band_gains.resize(bands, 0.0);
        for gain in &mut self.band_gains {
            *gain = clamp_finite(*gain, limits.max_band_gain_db);
        }
        self.rate = limits.quantize_rate(self.rate);
        self.pitch_semitones = clamp_finite(self.pitch_semitones, limits.max_pitch_semitones);
        self.wet_mix = self.wet_mix.clamp(0.0, 1.0);
        self.dry_mix = self.dry_mix.clamp(0.0, 1.0);
        self
    }

    /// Set one band's gain; returns the clamped value stored
    pub fn set_band_gain(&mut self, index: usize, gain_db: f32, limits: &EffectLimits) -> Result<f32> {
        let len = self.band_gains.len();
        let slot = self
            .band_gains
            .get_mut(index)
            .ok_or(AudioError::InvalidBand { index, len })?;
        *slot = clamp_finite(gain_db, limits.max_band_gain_db);
        Ok(*slot)
    }

    /// All bands back to 0 dB
    pub fn reset_eq(&mut self) {
        self.band_gains.fill(0.0);
    }

    /// Set the tempo rate
    ///
    /// The target is clamped and rounded to the step grid. Returns the new
    /// rate, or `None` when it lands within the hysteresis band of the current
    /// rate and nothing changed.
    pub fn set_rate(&mut self, target: f32, limits: &EffectLimits) -> Option<f32> {
        let rate = limits.quantize_rate(target);
        if (rate - self.rate).abs() < limits.rate_hysteresis {
            return None;
        }
        self.rate = rate;
        Some(rate)
    }

    /// Switch between normal speed and `slowed_rate`; returns the new rate
    pub fn toggle_slowed(&mut self, slowed_rate: f32, limits: &EffectLimits) -> f32 {
        let slowed = limits.quantize_rate(slowed_rate);
        let target = if (self.rate - slowed).abs() < limits.rate_hysteresis {
            1.0
        } else {
            slowed
        };
        self.set_rate(target, limits);
        self.rate
    }

    /// Whether the current rate is the slowed preset
    pub fn is_slowed(&self, slowed_rate: f32, limits: &EffectLimits) -> bool {
        (self.rate - limits.quantize_rate(slowed_rate)).abs() < limits.rate_hysteresis
    }

    /// Set the pitch offset; returns the clamped value stored
    pub fn set_pitch_offset(&mut self, semitones: f32, limits: &EffectLimits) -> f32 {
        self.pitch_semitones = clamp_finite(semitones, limits.max_pitch_semitones);
        self.pitch_semitones
    }

    /// Flip reverb; returns the new state
    pub fn toggle_reverb(&mut self) -> bool {
        self.reverb_enabled = !self.reverb_enabled;
        self.reverb_enabled
    }

    /// Flip pitch preservation; returns the new state
    pub fn toggle_preserve_pitch(&mut self) -> bool {
        self.preserve_pitch = !self.preserve_pitch;
        self.preserve_pitch
    }

    /// Whether the pitch shifter stage belongs in the chain
    pub fn needs_pitch_stage(&self) -> bool {
        self.preserve_pitch || self.pitch_semitones != 0.0
    }

    /// Ratio applied by the pitch shifter stage
    pub fn pitch_ratio(&self) -> f32 {
        let offset = 2.0_f32.powf(self.pitch_semitones / 12.0);
        if self.preserve_pitch && self.rate > 0.0 {
            offset / self.rate
        } else {
            offset
        }
    }

    /// Dry path gain for the current reverb state
    pub fn dry_gain(&self) -> f32 {
        if self.reverb_enabled {
            self.dry_mix
        } else {
            1.0
        }
    }
}

fn clamp_finite(value: f32, bound: f32) -> f32 {
    if value.is_finite() {
        value.clamp(-bound, bound)
    } else {
        0.0
    }
}
