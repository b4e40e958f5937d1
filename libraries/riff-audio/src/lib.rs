//! Riff Player Audio
//!
//! Audio graph, DSP effects and the live effects chain for Riff Player.
//!
//! This crate provides:
//! - An explicit [`AudioContext`]: nodes, connections and an offline renderer
//! - Effects: RBJ biquads, ramped gain, convolution reverb, pitch shifter
//! - [`EffectsGraph`]: the session's chain, rebuilt from [`EffectSettings`]
//! - Impulse-response loading (WAV via hound) behind [`ImpulseResponseSource`]
//!
//! Decoding is not done here; a platform decoder hands over [`DecodedAudio`].
//!
//! # Example
//!
//! ```rust
//! use riff_audio::{DecodedAudio, EffectLimits, EffectSettings, EffectsGraph, GraphConfig};
//!
//! let mut graph = EffectsGraph::new(GraphConfig::default());
//! graph.attach_source(DecodedAudio::silence(1024, 44100));
//!
//! let limits = EffectLimits::default();
//! let mut settings = EffectSettings::default();
//! settings.set_band_gain(0, 6.0, &limits).unwrap();
//! settings.set_rate(0.85, &limits);
//! graph.rebuild(&settings, None).unwrap();
//!
//! let mut out = vec![0.0; 512];
//! graph.render(&mut out);
//! ```

#![forbid(unsafe_code)]

mod buffer;
pub mod effects;
mod effects_graph;
mod error;
pub mod graph;
mod impulse;
mod settings;

pub use buffer::DecodedAudio;
pub use effects_graph::{EffectsGraph, GraphConfig, RebuildOutcome};
pub use error::{AudioError, Result};
pub use graph::{AudioContext, Connection, NodeId, NodeKind};
pub use impulse::{ImpulseResponse, ImpulseResponseSource, StaticImpulseResponse, WavImpulseResponse};
pub use settings::{EffectLimits, EffectSettings};
