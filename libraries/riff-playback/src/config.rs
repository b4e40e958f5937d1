//! Configuration for the playback session

use riff_audio::{EffectLimits, EffectSettings, GraphConfig};
use serde::{Deserialize, Serialize};

/// Configuration for the playback controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Output sample rate (default: 44100)
    pub sample_rate: u32,

    /// EQ band frequencies in Hz (default: 32..2000, seven bands)
    pub eq_bands: Vec<f32>,

    /// Q shared by all EQ bands (default: 1.0)
    pub eq_q: f32,

    /// Clamping rules for effect setters
    pub limits: EffectLimits,

    /// Rate used by the slowed preset (default: 0.8)
    pub slowed_rate: f32,

    /// Wet gain while reverb is enabled (default: 0.3)
    pub reverb_wet_mix: f32,

    /// Dry gain while reverb is enabled (default: 0.7)
    pub reverb_dry_mix: f32,

    /// Prepend a boosted track when building a queue (default: true)
    pub boost_enabled: bool,

    /// Broadcast channel capacity for events (default: 64)
    pub event_capacity: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        let graph = GraphConfig::default();
        Self {
            sample_rate: graph.sample_rate,
            eq_bands: graph.eq_bands,
            eq_q: graph.eq_q,
            limits: EffectLimits::default(),
            slowed_rate: 0.8,
            reverb_wet_mix: 0.3,
            reverb_dry_mix: 0.7,
            boost_enabled: true,
            event_capacity: 64,
        }
    }
}

impl PlaybackConfig {
    /// Shape of the effects chain
    pub fn graph_config(&self) -> GraphConfig {
        GraphConfig {
            sample_rate: self.sample_rate,
            eq_bands: self.eq_bands.clone(),
            eq_q: self.eq_q,
        }
    }

    /// Settings used when nothing has been persisted yet
    pub fn default_settings(&self) -> EffectSettings {
        EffectSettings {
            wet_mix: self.reverb_wet_mix,
            dry_mix: self.reverb_dry_mix,
            ..EffectSettings::with_band_count(self.eq_bands.len())
        }
    }
}
