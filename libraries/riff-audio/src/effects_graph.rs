//! Live effects chain
//!
//! Signal order: source → EQ bank → optional pitch shifter → dry gain →
//! destination, plus a wet branch (convolver → wet gain → destination) taken
//! from the same split point while reverb is enabled.
//!
//! Every settings change goes through [`EffectsGraph::rebuild`]: the desired
//! connection set is derived from the settings alone and compared with the
//! live one. Wiring is only touched when they differ, and then the old set is
//! fully disconnected before the new one is connected.

use crate::buffer::DecodedAudio;
use crate::effects::{Convolver, FilterType};
use crate::error::{AudioError, Result};
use crate::graph::{AudioContext, Connection, NodeId};
use crate::impulse::ImpulseResponse;
use crate::settings::EffectSettings;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Static shape of the chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Output sample rate
    pub sample_rate: u32,
    /// EQ band frequencies in Hz, ascending
    pub eq_bands: Vec<f32>,
    /// Q shared by every band
    pub eq_q: f32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            eq_bands: vec![32.0, 64.0, 128.0, 256.0, 512.0, 1000.0, 2000.0],
            eq_q: 1.0,
        }
    }
}

impl GraphConfig {
    /// Filter shape for a band: shelves at the edges, peaking in between
    pub fn filter_type_for(&self, frequency: f32) -> FilterType {
        let lowest = self.eq_bands.iter().copied().fold(f32::INFINITY, f32::min);
        let highest = self.eq_bands.iter().copied().fold(f32::NEG_INFINITY, f32::max);

        if frequency <= lowest {
            FilterType::LowShelf
        } else if frequency >= highest {
            FilterType::HighShelf
        } else {
            FilterType::Peaking
        }
    }
}

/// What a rebuild did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildOutcome {
    /// Whether the connection set changed
    pub rewired: bool,
    /// Whether this rebuild created the convolver
    pub convolver_created: bool,
}

/// The session's processing chain and the context that owns its nodes
#[derive(Debug)]
pub struct EffectsGraph {
    ctx: AudioContext,
    config: GraphConfig,
    source: Option<NodeId>,
    filters: Vec<NodeId>,
    pitch: NodeId,
    dry_gain: NodeId,
    wet_gain: NodeId,
    convolver: Option<NodeId>,
}

impl EffectsGraph {
    /// Create every fixed stage; nothing is connected until the first rebuild
    pub fn new(config: GraphConfig) -> Self {
        let mut ctx = AudioContext::new(config.sample_rate);

        let filters = config
            .eq_bands
            .iter()
            .map(|&freq| ctx.create_filter(config.filter_type_for(freq), freq, config.eq_q))
            .collect();
        let pitch = ctx.create_pitch_shifter(1.0);
        let dry_gain = ctx.create_gain(1.0);
        let wet_gain = ctx.create_gain(0.0);

        tracing::debug!(bands = config.eq_bands.len(), sample_rate = config.sample_rate, "Effects graph created");

        Self {
            ctx,
            config,
            source: None,
            filters,
            pitch,
            dry_gain,
            wet_gain,
            convolver: None,
        }
    }

    /// Replace the playing source with freshly decoded audio
    ///
    /// The old source node and its edges are dropped and effect tails are
    /// cleared. The new source stays silent until the next [`rebuild`].
    ///
    /// [`rebuild`]: EffectsGraph::rebuild
    pub fn attach_source(&mut self, audio: DecodedAudio) {
        if let Some(old) = self.source.take() {
            // Owned by us, always present
            let _ = self.ctx.remove_node(old);
        }
        self.ctx.reset_effects();
        self.source = Some(self.ctx.create_source(audio));
    }

    /// Whether a source is attached
    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Edges the chain should have for `settings`
    pub fn desired_connections(&self, settings: &EffectSettings) -> BTreeSet<Connection> {
        let mut edges = BTreeSet::new();
        let mut chain: Vec<NodeId> = Vec::with_capacity(self.filters.len() + 2);
        chain.extend(self.source);
        chain.extend(self.filters.iter().copied());
        if settings.needs_pitch_stage() {
            chain.push(self.pitch);
        }

        let split = chain.last().copied();
        for pair in chain.windows(2) {
            edges.insert((pair[0], pair[1]));
        }

        let destination = self.ctx.destination();
        if let Some(split) = split {
            edges.insert((split, self.dry_gain));
            if settings.reverb_enabled {
                if let Some(convolver) = self.convolver {
                    edges.insert((split, convolver));
                    edges.insert((convolver, self.wet_gain));
                    edges.insert((self.wet_gain, destination));
                }
            }
        }
        edges.insert((self.dry_gain, destination));
        edges
    }

    /// Apply `settings` to the chain
    ///
    /// `impulse_response` is only consulted when reverb is enabled and the
    /// convolver does not exist yet; enabling reverb without one fails with
    /// [`AudioError::MissingImpulseResponse`] and leaves the graph untouched.
    pub fn rebuild(
        &mut self,
        settings: &EffectSettings,
        impulse_response: Option<&ImpulseResponse>,
    ) -> Result<RebuildOutcome> {
        let mut convolver_created = false;
        if settings.reverb_enabled && self.convolver.is_none() {
            let ir = impulse_response.ok_or(AudioError::MissingImpulseResponse)?;
            let convolver = Convolver::new(ir, self.config.sample_rate)?;
            self.convolver = Some(self.ctx.create_convolver(convolver));
            convolver_created = true;
        }

        let had_wet = self.has_wet_path();
        let had_pitch = self.has_pitch_stage();

        let desired = self.desired_connections(settings);
        let rewired = &desired != self.ctx.connections();
        if rewired {
            self.ctx.disconnect_all();
            for &(from, to) in &desired {
                self.ctx.connect(from, to)?;
            }
        }

        // Stages re-entering the chain start without stale tails
        if self.has_wet_path() && !had_wet {
            if let Some(convolver) = self.convolver {
                self.ctx.reset_node(convolver)?;
            }
        }
        if self.has_pitch_stage() && !had_pitch {
            self.ctx.reset_node(self.pitch)?;
        }

        self.apply_parameters(settings);

        tracing::debug!(
            rewired,
            reverb = settings.reverb_enabled,
            rate = settings.rate,
            pitch = settings.pitch_semitones,
            "Effects graph rebuilt"
        );

        Ok(RebuildOutcome {
            rewired,
            convolver_created,
        })
    }

    fn apply_parameters(&mut self, settings: &EffectSettings) {
        for (i, &id) in self.filters.iter().enumerate() {
            let gain = settings.band_gains.get(i).copied().unwrap_or(0.0);
            if let Some(filter) = self.ctx.filter_mut(id) {
                filter.set_gain_db(gain);
            }
        }

        if let Some(dry) = self.ctx.gain_mut(self.dry_gain) {
            dry.set_gain(settings.dry_gain());
        }
        if let Some(wet) = self.ctx.gain_mut(self.wet_gain) {
            wet.set_gain(settings.wet_mix);
        }
        if let Some(pitch) = self.ctx.pitch_shifter_mut(self.pitch) {
            pitch.set_ratio(settings.pitch_ratio());
        }
        if let Some(source) = self.source.and_then(|id| self.ctx.source_mut(id)) {
            source.set_playback_rate(settings.rate);
        }
    }

    /// Render interleaved stereo frames; returns `true` once the source ended
    pub fn render(&mut self, out: &mut [f32]) -> bool {
        self.ctx.render(out);
        self.is_finished()
    }

    /// Whether the attached source played to the end
    pub fn is_finished(&self) -> bool {
        self.source
            .and_then(|id| self.ctx.source(id))
            .is_some_and(|s| s.is_finished())
    }

    /// Back to the start of the attached source, clearing effect tails
    pub fn rewind(&mut self) {
        if let Some(source) = self.source.and_then(|id| self.ctx.source_mut(id)) {
            source.rewind();
        }
        self.ctx.reset_effects();
    }

    /// Playback position in seconds of source material
    pub fn position_secs(&self) -> f64 {
        self.source
            .and_then(|id| self.ctx.source(id))
            .map_or(0.0, |s| s.position_secs())
    }

    /// Live connection set
    pub fn connections(&self) -> &BTreeSet<Connection> {
        self.ctx.connections()
    }

    /// Underlying context (read-only)
    pub fn context(&self) -> &AudioContext {
        &self.ctx
    }

    /// Chain configuration
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// EQ filter node ids, in band order
    pub fn filter_nodes(&self) -> &[NodeId] {
        &self.filters
    }

    /// Current gain of one EQ band
    pub fn band_gain(&self, index: usize) -> Option<f32> {
        let id = *self.filters.get(index)?;
        self.ctx.filter(id).map(|f| f.gain_db())
    }

    /// Shape of one EQ band
    pub fn band_type(&self, index: usize) -> Option<FilterType> {
        let id = *self.filters.get(index)?;
        self.ctx.filter(id).map(|f| f.filter_type())
    }

    /// Dry path gain
    pub fn dry_gain(&self) -> f32 {
        self.ctx.gain(self.dry_gain).map_or(1.0, |g| g.gain())
    }

    /// Wet path gain
    pub fn wet_gain(&self) -> f32 {
        self.ctx.gain(self.wet_gain).map_or(0.0, |g| g.gain())
    }

    /// Whether the convolver was ever created this session
    pub fn has_convolver(&self) -> bool {
        self.convolver.is_some()
    }

    /// Whether the wet branch reaches the destination
    pub fn has_wet_path(&self) -> bool {
        self.convolver
            .is_some_and(|c| self.ctx.is_connected(c, self.wet_gain))
            && self.ctx.is_connected(self.wet_gain, self.ctx.destination())
    }

    /// Whether the pitch shifter is in the chain
    pub fn has_pitch_stage(&self) -> bool {
        self.ctx.is_connected(self.pitch, self.dry_gain)
    }

    /// Ratio the pitch shifter is set to
    pub fn pitch_ratio(&self) -> f32 {
        self.ctx.pitch_shifter(self.pitch).map_or(1.0, |p| p.ratio())
    }

    /// Playback rate of the attached source
    pub fn playback_rate(&self) -> Option<f32> {
        self.source
            .and_then(|id| self.ctx.source(id))
            .map(|s| s.playback_rate())
    }

    /// Number of edges arriving at the destination
    pub fn destination_inputs(&self) -> usize {
        self.ctx.inputs_of(self.ctx.destination()).count()
    }
}
