//! Playback controller - session orchestration
//!
//! Coordinates the queue, boost selection, decoding, the effects graph and the
//! transport state machine:
//!
//! ```text
//! Idle → Loading → Ready → Playing ⇄ Paused
//!          │                  │
//!          └──── Error ◄──────┘ (decode / rebuild failure)
//! ```
//!
//! Every `load` takes a fresh generation number. Each step after an await
//! re-checks it under the session lock, so a superseded load never touches
//! the session again. The lock is a plain mutex and is never held across an
//! await.

use crate::boost::BoostSelector;
use crate::config::PlaybackConfig;
use crate::decoder::MediaDecoder;
use crate::error::{PlaybackError, Result};
use crate::events::{ErrorKind, PlaybackEvent, TransportState};
use crate::queue::TrackQueue;
use crate::settings::{MemorySettingsStore, SettingsStore};
use futures::future::join_all;
use riff_audio::{AudioError, DecodedAudio, EffectSettings, EffectsGraph, ImpulseResponse, ImpulseResponseSource};
use riff_core::{LikeAction, Track, TrackId, TrackStore, UserId, UserProfile};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

/// Effects that can be flipped on and off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    /// Convolution reverb (wet path)
    Reverb,
    /// Slowed preset rate
    Slowed,
    /// Counteract the pitch change caused by the rate
    PreservePitch,
}

/// How a `load` call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The track is attached and playing
    Playing,
    /// A newer load or a reset took over; nothing was applied
    Superseded,
}

/// Where the queue of a load comes from
enum QueuePlan {
    /// Fetch these ids and replace the queue
    Replace(Vec<TrackId>),
    /// Queue of just the loaded track
    Single,
    /// Queue navigation: the cursor already moved
    Keep,
}

/// Result of one rebuild pass
enum RebuildPass {
    /// Settings applied and nothing pending
    Done,
    /// Settings changed mid-rebuild; run another pass
    Again,
    /// The impulse response was unusable; retry without reverb
    ReverbFailed(PlaybackError),
}

/// Mutable session state, guarded by one mutex
struct Session {
    state: TransportState,
    /// Bumped by every load and by reset
    generation: u64,
    /// Bumped by reset only; guards session-scoped caches
    epoch: u64,
    queue: TrackQueue,
    current: Option<Track>,
    artist: Option<UserProfile>,
    graph: Option<EffectsGraph>,
    impulse: Option<Arc<ImpulseResponse>>,
    rebuilding: bool,
    rebuild_pending: bool,
    boost: BoostSelector,
}

impl Session {
    fn new(boost: BoostSelector) -> Self {
        Self {
            state: TransportState::Idle,
            generation: 0,
            epoch: 0,
            queue: TrackQueue::new(),
            current: None,
            artist: None,
            graph: None,
            impulse: None,
            rebuilding: false,
            rebuild_pending: false,
            boost,
        }
    }

    fn current_id(&self) -> Option<TrackId> {
        self.current.as_ref().map(|t| t.id.clone())
    }
}

struct Inner {
    config: PlaybackConfig,
    store: Arc<dyn TrackStore>,
    decoder: Arc<dyn MediaDecoder>,
    impulse: Option<Arc<dyn ImpulseResponseSource>>,
    settings: Arc<dyn SettingsStore>,
    session: Mutex<Session>,
    events: broadcast::Sender<PlaybackEvent>,
}

/// Builder for [`PlaybackController`]
pub struct PlaybackControllerBuilder {
    store: Arc<dyn TrackStore>,
    decoder: Arc<dyn MediaDecoder>,
    config: PlaybackConfig,
    impulse: Option<Arc<dyn ImpulseResponseSource>>,
    settings: Option<Arc<dyn SettingsStore>>,
    boost: Option<BoostSelector>,
}

impl PlaybackControllerBuilder {
    /// Use a custom configuration
    pub fn config(mut self, config: PlaybackConfig) -> Self {
        self.config = config;
        self
    }

    /// Source of the reverb impulse response
    ///
    /// Without one, enabling reverb always falls back to the dry path.
    pub fn impulse_source(mut self, source: Arc<dyn ImpulseResponseSource>) -> Self {
        self.impulse = Some(source);
        self
    }

    /// Persistence for effect settings (default: in memory)
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings = Some(store);
        self
    }

    /// Seed the boost selector for reproducible picks
    pub fn boost_seed(mut self, seed: u64) -> Self {
        self.boost = Some(BoostSelector::seeded(seed));
        self
    }

    pub fn build(self) -> PlaybackController {
        let (events, _) = broadcast::channel(self.config.event_capacity.max(1));
        let boost = self.boost.unwrap_or_default();

        PlaybackController {
            inner: Arc::new(Inner {
                config: self.config,
                store: self.store,
                decoder: self.decoder,
                impulse: self.impulse,
                settings: self
                    .settings
                    .unwrap_or_else(|| Arc::new(MemorySettingsStore::new())),
                session: Mutex::new(Session::new(boost)),
                events,
            }),
        }
    }
}

/// Playback session handle
///
/// Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct PlaybackController {
    inner: Arc<Inner>,
}

impl PlaybackController {
    /// Start building a controller over a store and a decoder
    pub fn builder(store: Arc<dyn TrackStore>, decoder: Arc<dyn MediaDecoder>) -> PlaybackControllerBuilder {
        PlaybackControllerBuilder {
            store,
            decoder,
            config: PlaybackConfig::default(),
            impulse: None,
            settings: None,
            boost: None,
        }
    }

    /// Controller with default configuration and in-memory settings
    pub fn new(store: Arc<dyn TrackStore>, decoder: Arc<dyn MediaDecoder>) -> Self {
        Self::builder(store, decoder).build()
    }

    // ===== Events =====

    /// Receive every event emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.inner.events.subscribe()
    }

    fn emit(&self, event: PlaybackEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    fn report(&self, kind: ErrorKind, message: impl Into<String>) {
        self.emit(PlaybackEvent::Error {
            kind,
            message: message.into(),
        });
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, session: &mut Session, state: TransportState) {
        if session.state != state {
            tracing::debug!(from = ?session.state, to = ?state, "Transport state changed");
            session.state = state;
            self.emit(PlaybackEvent::StateChanged { state });
        }
    }

    // ===== Loading =====

    /// Load `track` and start playing it
    ///
    /// With `queue_ids` the queue is rebuilt from the store (missing ids are
    /// dropped); without, the queue is just `track`. A boosted track may be
    /// prepended either way. Allowed from any state; a newer `load` or a
    /// `reset` supersedes this one.
    pub async fn load(&self, track: Track, queue_ids: Option<Vec<TrackId>>) -> Result<LoadOutcome> {
        let plan = match queue_ids {
            Some(ids) => QueuePlan::Replace(ids),
            None => QueuePlan::Single,
        };
        self.load_track(track, plan).await
    }

    async fn load_track(&self, track: Track, plan: QueuePlan) -> Result<LoadOutcome> {
        let generation = self.begin_load(&track);

        let queue = match plan {
            QueuePlan::Replace(ids) => {
                let tracks = self.fetch_queue(&ids).await;
                Some(self.with_boost_pick(tracks).await)
            }
            QueuePlan::Single => Some(self.with_boost_pick(vec![track.clone()]).await),
            QueuePlan::Keep => None,
        };

        let artist = match self.inner.store.fetch_user(&track.artist).await {
            Ok(artist) => Some(artist),
            Err(e) => {
                tracing::warn!(artist = %track.artist, error = %e, "Artist snapshot unavailable");
                None
            }
        };

        if !self.commit_load(generation, &track, queue, artist) {
            return Ok(LoadOutcome::Superseded);
        }

        let audio = match self.inner.decoder.decode(&track).await {
            Ok(audio) => audio,
            Err(e) => return self.fail_decode(generation, &track, &e),
        };

        if !self.attach_audio(generation, audio) {
            return Ok(LoadOutcome::Superseded);
        }

        self.rebuild_graph().await?;

        if !self.start_playing(generation, &track.id) {
            return Ok(LoadOutcome::Superseded);
        }

        if let Err(e) = self.inner.store.increment_view(&track.id).await {
            tracing::warn!(track = %track.id, error = %e, "View count not updated");
            self.report(ErrorKind::WriteFailure, e.to_string());
        }

        Ok(LoadOutcome::Playing)
    }

    fn begin_load(&self, track: &Track) -> u64 {
        let mut session = self.lock();
        session.generation += 1;
        let generation = session.generation;
        tracing::info!(track = %track.id, generation, "Loading track");
        self.transition(&mut session, TransportState::Loading);
        generation
    }

    /// Fetch every id concurrently, keeping request order and dropping misses
    async fn fetch_queue(&self, ids: &[TrackId]) -> Vec<Track> {
        let store = &self.inner.store;
        let results = join_all(ids.iter().map(|id| store.fetch_track(id))).await;

        ids.iter()
            .zip(results)
            .filter_map(|(id, result)| match result {
                Ok(track) => Some(track),
                Err(e) if e.is_not_found() => {
                    tracing::warn!(track = %id, "Queue entry not found, dropped");
                    self.report(ErrorKind::NotFound, e.to_string());
                    None
                }
                Err(e) => {
                    tracing::warn!(track = %id, error = %e, "Queue entry fetch failed, dropped");
                    None
                }
            })
            .collect()
    }

    /// Prepend one boosted track unless boosting is off or it is already queued
    async fn with_boost_pick(&self, mut tracks: Vec<Track>) -> Vec<Track> {
        if !self.inner.config.boost_enabled {
            return tracks;
        }

        let levels = match self.inner.store.fetch_boost_levels().await {
            Ok(levels) => levels,
            Err(e) => {
                tracing::warn!(error = %e, "Boost levels unavailable");
                return tracks;
            }
        };

        let pick = self.lock().boost.pick(&levels);
        let Some(pick) = pick else {
            return tracks;
        };
        if tracks.iter().any(|t| t.id == pick) {
            tracing::debug!(track = %pick, "Boost pick already queued");
            return tracks;
        }

        match self.inner.store.fetch_track(&pick).await {
            Ok(boosted) => {
                tracing::debug!(track = %pick, "Boosted track prepended");
                tracks.insert(0, boosted);
            }
            Err(e) => tracing::warn!(track = %pick, error = %e, "Boosted track unavailable"),
        }
        tracks
    }

    fn commit_load(
        &self,
        generation: u64,
        track: &Track,
        queue: Option<Vec<Track>>,
        artist: Option<UserProfile>,
    ) -> bool {
        let mut session = self.lock();
        if session.generation != generation {
            return false;
        }

        if let Some(tracks) = queue {
            session.queue.set_queue(tracks, &track.id);
        }
        let previous_track_id = session.current_id();
        session.current = Some(track.clone());
        session.artist = artist;

        self.emit(PlaybackEvent::QueueChanged {
            length: session.queue.len(),
            position: session.queue.position(),
        });
        self.emit(PlaybackEvent::TrackChanged {
            track_id: track.id.clone(),
            previous_track_id,
        });
        true
    }

    fn fail_decode(&self, generation: u64, track: &Track, error: &AudioError) -> Result<LoadOutcome> {
        let mut session = self.lock();
        if session.generation != generation {
            return Ok(LoadOutcome::Superseded);
        }

        tracing::error!(track = %track.id, error = %error, "Decode failed");
        let message = error.to_string();
        self.transition(&mut session, TransportState::Error);
        self.report(ErrorKind::DecodeFailure, message.as_str());
        Err(PlaybackError::Decode(message))
    }

    fn attach_audio(&self, generation: u64, audio: DecodedAudio) -> bool {
        let mut guard = self.lock();
        let session = &mut *guard;
        if session.generation != generation {
            return false;
        }

        let config = &self.inner.config;
        let graph = session
            .graph
            .get_or_insert_with(|| EffectsGraph::new(config.graph_config()));
        tracing::debug!(
            frames = audio.frames(),
            duration_secs = audio.duration_secs(),
            "Decoded audio attached"
        );
        graph.attach_source(audio);
        true
    }

    fn start_playing(&self, generation: u64, track_id: &TrackId) -> bool {
        let mut session = self.lock();
        if session.generation != generation || session.graph.is_none() {
            return false;
        }

        self.transition(&mut session, TransportState::Ready);
        self.emit(PlaybackEvent::Ready {
            track_id: track_id.clone(),
        });
        self.transition(&mut session, TransportState::Playing);
        self.emit(PlaybackEvent::Playing {
            track_id: track_id.clone(),
        });
        true
    }

    // ===== Transport =====

    fn require_loaded(&self, session: &Session, operation: &str) -> Result<()> {
        if session.state.is_loaded() {
            return Ok(());
        }

        let message = format!(
            "{operation} requires a loaded track (state: {:?})",
            session.state
        );
        self.report(ErrorKind::PreconditionFailure, message.as_str());
        Err(PlaybackError::precondition(message))
    }

    /// Start or resume playback
    pub fn play(&self) -> Result<()> {
        let mut session = self.lock();
        self.require_loaded(&session, "play")?;
        if session.state == TransportState::Playing {
            return Ok(());
        }

        self.transition(&mut session, TransportState::Playing);
        if let Some(track_id) = session.current_id() {
            self.emit(PlaybackEvent::Playing { track_id });
        }
        Ok(())
    }

    /// Pause playback (no-op unless playing)
    pub fn pause(&self) -> Result<()> {
        let mut session = self.lock();
        self.require_loaded(&session, "pause")?;
        if session.state != TransportState::Playing {
            return Ok(());
        }

        self.transition(&mut session, TransportState::Paused);
        if let Some(track_id) = session.current_id() {
            self.emit(PlaybackEvent::Paused { track_id });
        }
        Ok(())
    }

    /// Toggle between playing and paused; returns the new state
    pub fn play_or_pause(&self) -> Result<TransportState> {
        if self.state() == TransportState::Playing {
            self.pause()?;
        } else {
            self.play()?;
        }
        Ok(self.state())
    }

    // ===== Queue navigation =====

    /// Load the next queue entry
    ///
    /// At the end of the queue this fails with
    /// [`PlaybackError::QueueBoundary`] and nothing changes.
    pub async fn next(&self) -> Result<LoadOutcome> {
        let track = self.step_queue(true)?;
        self.load_track(track, QueuePlan::Keep).await
    }

    /// Load the previous queue entry
    pub async fn prev(&self) -> Result<LoadOutcome> {
        let track = self.step_queue(false)?;
        self.load_track(track, QueuePlan::Keep).await
    }

    fn step_queue(&self, forward: bool) -> Result<Track> {
        let mut session = self.lock();
        let track = if forward {
            session.queue.next()?.clone()
        } else {
            session.queue.prev()?.clone()
        };
        tracing::debug!(track = %track.id, position = ?session.queue.position(), "Queue cursor moved");
        Ok(track)
    }

    /// End the session: drop the graph, queue and impulse-response cache
    pub fn reset(&self) {
        let mut session = self.lock();
        session.generation += 1;
        session.epoch += 1;
        session.graph = None;
        session.impulse = None;
        session.rebuilding = false;
        session.rebuild_pending = false;
        session.queue.clear();
        session.current = None;
        session.artist = None;

        tracing::info!(generation = session.generation, "Session reset");
        self.transition(&mut session, TransportState::Idle);
        self.emit(PlaybackEvent::QueueChanged {
            length: 0,
            position: None,
        });
    }

    // ===== Effects =====

    /// Current effect settings (persisted value, normalized)
    pub fn settings(&self) -> EffectSettings {
        let config = &self.inner.config;
        match self.inner.settings.load() {
            Ok(Some(settings)) => settings.normalized(config.eq_bands.len(), &config.limits),
            Ok(None) => config.default_settings(),
            Err(e) => {
                tracing::warn!(error = %e, "Effect settings unreadable, using defaults");
                config.default_settings()
            }
        }
    }

    fn persist(&self, settings: &EffectSettings) {
        if let Err(e) = self.inner.settings.save(settings) {
            tracing::warn!(error = %e, "Effect settings not persisted");
            self.report(ErrorKind::WriteFailure, e.to_string());
        }
        self.emit(PlaybackEvent::EffectsChanged {
            settings: settings.clone(),
        });
    }

    /// Flip an effect and rebuild the graph; transport state is untouched
    ///
    /// Only valid while a track is loaded. Returns the settings in effect
    /// after the rebuild (reverb may have fallen back to off).
    pub async fn toggle_effect(&self, kind: EffectKind) -> Result<EffectSettings> {
        {
            let session = self.lock();
            self.require_loaded(&session, "toggle_effect")?;
        }

        let config = &self.inner.config;
        let mut settings = self.settings();
        match kind {
            EffectKind::Reverb => {
                let enabled = settings.toggle_reverb();
                tracing::info!(enabled, "Reverb toggled");
            }
            EffectKind::Slowed => {
                let rate = settings.toggle_slowed(config.slowed_rate, &config.limits);
                tracing::info!(rate, "Slowed preset toggled");
            }
            EffectKind::PreservePitch => {
                let enabled = settings.toggle_preserve_pitch();
                tracing::info!(enabled, "Pitch preservation toggled");
            }
        }
        self.persist(&settings);

        self.rebuild_graph().await?;
        Ok(self.settings())
    }

    /// Flip reverb; returns whether reverb is on after the rebuild
    pub async fn toggle_reverb(&self) -> Result<bool> {
        Ok(self.toggle_effect(EffectKind::Reverb).await?.reverb_enabled)
    }

    /// Flip the slowed preset; returns the new rate
    pub async fn toggle_slowed(&self) -> Result<f32> {
        Ok(self.toggle_effect(EffectKind::Slowed).await?.rate)
    }

    /// Flip pitch preservation; returns the new state
    pub async fn toggle_preserve_pitch(&self) -> Result<bool> {
        Ok(self.toggle_effect(EffectKind::PreservePitch).await?.preserve_pitch)
    }

    /// Set the tempo rate
    ///
    /// Returns the applied rate, or `None` when the target is within the
    /// hysteresis band and nothing changed.
    pub async fn set_rate(&self, target: f32) -> Result<Option<f32>> {
        let mut settings = self.settings();
        let Some(rate) = settings.set_rate(target, &self.inner.config.limits) else {
            return Ok(None);
        };
        self.persist(&settings);
        self.rebuild_graph().await?;
        Ok(Some(rate))
    }

    /// Set one EQ band's gain; returns the clamped value
    pub async fn set_band_gain(&self, index: usize, gain_db: f32) -> Result<f32> {
        let mut settings = self.settings();
        let gain = settings.set_band_gain(index, gain_db, &self.inner.config.limits)?;
        self.persist(&settings);
        self.rebuild_graph().await?;
        Ok(gain)
    }

    /// Set the pitch offset in semitones; returns the clamped value
    pub async fn set_pitch_offset(&self, semitones: f32) -> Result<f32> {
        let mut settings = self.settings();
        let offset = settings.set_pitch_offset(semitones, &self.inner.config.limits);
        self.persist(&settings);
        self.rebuild_graph().await?;
        Ok(offset)
    }

    /// All EQ bands back to 0 dB
    pub async fn reset_eq(&self) -> Result<()> {
        let mut settings = self.settings();
        settings.reset_eq();
        self.persist(&settings);
        self.rebuild_graph().await
    }

    // ===== Graph rebuild =====

    /// Apply the persisted settings to the graph
    ///
    /// Not reentrant: while a rebuild runs, further requests only mark the
    /// session dirty and the running rebuild loops once more.
    async fn rebuild_graph(&self) -> Result<()> {
        let epoch = {
            let mut session = self.lock();
            if session.graph.is_none() {
                return Ok(());
            }
            if session.rebuilding {
                session.rebuild_pending = true;
                return Ok(());
            }
            session.rebuilding = true;
            session.epoch
        };

        let mut reverb_failed = false;
        loop {
            let mut settings = self.settings();
            if reverb_failed {
                settings.reverb_enabled = false;
            }

            let needs_impulse = {
                let mut session = self.lock();
                if session.epoch != epoch {
                    return Ok(());
                }
                session.rebuild_pending = false;
                settings.reverb_enabled
                    && session.impulse.is_none()
                    && !session.graph.as_ref().is_some_and(EffectsGraph::has_convolver)
            };

            if needs_impulse {
                match self.fetch_impulse().await {
                    Ok(ir) => {
                        let mut session = self.lock();
                        if session.epoch != epoch {
                            return Ok(());
                        }
                        tracing::debug!(frames = ir.frames(), "Impulse response cached");
                        session.impulse = Some(Arc::new(ir));
                    }
                    Err(e) => {
                        if !self.revert_reverb(epoch, &e) {
                            return Ok(());
                        }
                        reverb_failed = true;
                        continue;
                    }
                }
            }

            match self.apply_settings(epoch, &settings)? {
                RebuildPass::Done => return Ok(()),
                RebuildPass::Again => {}
                RebuildPass::ReverbFailed(e) => {
                    if !self.revert_reverb(epoch, &e) {
                        return Ok(());
                    }
                    reverb_failed = true;
                }
            }
        }
    }

    /// One rebuild pass under the session lock
    fn apply_settings(&self, epoch: u64, settings: &EffectSettings) -> Result<RebuildPass> {
        let mut guard = self.lock();
        let session = &mut *guard;
        if session.epoch != epoch {
            return Ok(RebuildPass::Done);
        }
        let Some(graph) = session.graph.as_mut() else {
            session.rebuilding = false;
            return Ok(RebuildPass::Done);
        };

        match graph.rebuild(settings, session.impulse.as_deref()) {
            Ok(outcome) => {
                if outcome.convolver_created {
                    tracing::debug!("Convolver created");
                }
            }
            Err(
                e @ (AudioError::MissingImpulseResponse
                | AudioError::EmptyImpulseResponse
                | AudioError::ImpulseResponse(_)
                | AudioError::InvalidChannelCount(_)),
            ) => {
                // Unusable impulse response: forget it, next pass goes dry
                session.impulse = None;
                return Ok(RebuildPass::ReverbFailed(PlaybackError::ResourceLoad(e.to_string())));
            }
            Err(e) => {
                tracing::error!(error = %e, "Effects graph rebuild failed");
                session.rebuilding = false;
                session.rebuild_pending = false;
                let message = e.to_string();
                self.transition(session, TransportState::Error);
                self.report(ErrorKind::GraphFailure, message);
                return Err(e.into());
            }
        }

        if session.rebuild_pending {
            return Ok(RebuildPass::Again);
        }
        session.rebuilding = false;
        Ok(RebuildPass::Done)
    }

    async fn fetch_impulse(&self) -> Result<ImpulseResponse> {
        let Some(source) = self.inner.impulse.as_ref() else {
            return Err(PlaybackError::ResourceLoad(
                "no impulse response source configured".to_string(),
            ));
        };
        source
            .fetch()
            .await
            .map_err(|e| PlaybackError::ResourceLoad(e.to_string()))
    }

    /// Turn reverb off after a failed acquisition and report it
    ///
    /// Returns `false` without touching anything when the session that asked
    /// for the rebuild has been reset in the meantime.
    fn revert_reverb(&self, epoch: u64, error: &PlaybackError) -> bool {
        let session = self.lock();
        if session.epoch != epoch {
            tracing::debug!(error = %error, "Impulse response failure for an ended session ignored");
            return false;
        }

        tracing::warn!(error = %error, "Reverb unavailable, falling back to dry path");
        let mut settings = self.settings();
        settings.reverb_enabled = false;
        self.report(ErrorKind::ResourceLoadFailure, error.to_string());
        self.persist(&settings);
        drop(session);
        true
    }

    // ===== Library actions =====

    /// Like or unlike the current track for `user`; returns whether it is
    /// now liked
    ///
    /// Local state flips immediately. The store write is best effort and a
    /// failure is logged and reported as `WriteFailure`.
    pub async fn toggle_like(&self, user: &UserId) -> Result<bool> {
        let (track_id, liked) = {
            let mut guard = self.lock();
            let session = &mut *guard;
            let Some(current) = session.current.as_mut() else {
                let message = "toggle_like requires a current track";
                self.report(ErrorKind::PreconditionFailure, message);
                return Err(PlaybackError::precondition(message));
            };

            let liked = !current.liked.remove(user);
            if liked {
                current.liked.insert(user.clone());
            }
            let track_id = current.id.clone();

            if let Some(entry) = session.queue.get_mut(&track_id) {
                if liked {
                    entry.liked.insert(user.clone());
                } else {
                    entry.liked.remove(user);
                }
            }
            (track_id, liked)
        };

        let action = if liked { LikeAction::Add } else { LikeAction::Remove };
        if let Err(e) = self.inner.store.update_liked_set(user, &track_id, action).await {
            tracing::warn!(track = %track_id, user = %user, error = %e, "Like not persisted");
            self.report(ErrorKind::WriteFailure, e.to_string());
        }
        Ok(liked)
    }

    // ===== Audio =====

    /// Render interleaved stereo frames into `out`
    ///
    /// Writes silence unless playing. When the track ends, the source is
    /// rewound, the session goes back to `Ready` and `Finished` is emitted.
    /// Returns whether audio was rendered.
    pub fn process_audio(&self, out: &mut [f32]) -> bool {
        let mut guard = self.lock();
        let session = &mut *guard;

        if session.state != TransportState::Playing {
            out.fill(0.0);
            return false;
        }
        let Some(graph) = session.graph.as_mut() else {
            out.fill(0.0);
            return false;
        };

        if graph.render(out) {
            graph.rewind();
            let track_id = session.current_id();
            tracing::debug!(track = ?track_id, "Track finished");
            self.transition(session, TransportState::Ready);
            if let Some(track_id) = track_id {
                self.emit(PlaybackEvent::Finished { track_id });
            }
        }
        true
    }

    // ===== Getters =====

    pub fn config(&self) -> &PlaybackConfig {
        &self.inner.config
    }

    pub fn state(&self) -> TransportState {
        self.lock().state
    }

    pub fn current_track(&self) -> Option<Track> {
        self.lock().current.clone()
    }

    /// Artist snapshot fetched by the last load
    pub fn artist(&self) -> Option<UserProfile> {
        self.lock().artist.clone()
    }

    /// Queue entries in play order
    pub fn queue(&self) -> Vec<Track> {
        self.lock().queue.tracks().to_vec()
    }

    pub fn queue_position(&self) -> Option<usize> {
        self.lock().queue.position()
    }

    pub fn has_next(&self) -> bool {
        self.lock().queue.has_next()
    }

    pub fn has_prev(&self) -> bool {
        self.lock().queue.has_prev()
    }

    /// Playback position of the current track in seconds
    pub fn position_secs(&self) -> f64 {
        self.lock().graph.as_ref().map_or(0.0, EffectsGraph::position_secs)
    }

    /// Inspect the live effects graph, if one exists
    pub fn with_graph<R>(&self, f: impl FnOnce(&EffectsGraph) -> R) -> Option<R> {
        self.lock().graph.as_ref().map(f)
    }

    /// Whether the session holds a cached impulse response
    pub fn has_cached_impulse(&self) -> bool {
        self.lock().impulse.is_some()
    }
}
