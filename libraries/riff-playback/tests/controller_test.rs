//! Integration tests for PlaybackController
//!
//! Covers:
//! - Load pipeline (queue resolution, boost pick, artist, views)
//! - Overlapping loads and reset cancellation
//! - Transport preconditions and end-of-track handling
//! - Effect toggles and the impulse-response fallback
//! - Best-effort store writes

use async_trait::async_trait;
use riff_audio::{
    AudioError, DecodedAudio, ImpulseResponse, ImpulseResponseSource, StaticImpulseResponse,
};
use riff_core::{MemoryStore, Track, TrackId, UserId, UserProfile};
use riff_playback::{
    Boundary, EffectKind, ErrorKind, JsonSettingsStore, LoadOutcome, MediaDecoder,
    MemorySettingsStore, PlaybackConfig, PlaybackController, PlaybackError, PlaybackEvent,
    StaticDecoder, TransportState,
};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};

// ============================================================================
// Test Infrastructure
// ============================================================================

const SAMPLE_RATE: u32 = 44100;

fn tone(frames: usize) -> DecodedAudio {
    let samples = (0..frames * 2)
        .map(|i| ((i / 2) as f32 * 0.05).sin() * 0.5)
        .collect();
    DecodedAudio::from_interleaved(samples, SAMPLE_RATE, 2).unwrap()
}

/// Store + decoder with one artist and the given tracks
fn library(ids: &[&str]) -> (Arc<MemoryStore>, Arc<StaticDecoder>) {
    let store = Arc::new(MemoryStore::new());
    let decoder = Arc::new(StaticDecoder::new());
    store.insert_user(UserProfile::new("artist", "The Artist"));
    for id in ids {
        store.insert_track(Track::new(*id, format!("blob:{id}"), "artist").with_title(*id));
        decoder.insert(format!("blob:{id}"), tone(SAMPLE_RATE as usize));
    }
    (store, decoder)
}

fn ids(ids: &[&str]) -> Vec<TrackId> {
    ids.iter().map(|id| TrackId::new(*id)).collect()
}

fn track(store: &MemoryStore, id: &str) -> Track {
    store.track(&TrackId::new(id)).unwrap()
}

fn drain(rx: &mut broadcast::Receiver<PlaybackEvent>) -> Vec<PlaybackEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn dirac_ir() -> ImpulseResponse {
    ImpulseResponse::new(vec![1.0, 1.0, 0.25, 0.25], SAMPLE_RATE, 2).unwrap()
}

/// Decoder that parks every request until the test releases it
struct GatedDecoder {
    requests: mpsc::UnboundedSender<(TrackId, oneshot::Sender<DecodedAudio>)>,
}

#[async_trait]
impl MediaDecoder for GatedDecoder {
    async fn decode(&self, track: &Track) -> riff_audio::Result<DecodedAudio> {
        let (tx, rx) = oneshot::channel();
        self.requests
            .send((track.id.clone(), tx))
            .map_err(|_| AudioError::decode("gate closed"))?;
        rx.await.map_err(|_| AudioError::decode("gate dropped"))
    }
}

/// Impulse-response source that parks every fetch until the test answers it
struct GatedImpulse {
    fetches: mpsc::UnboundedSender<oneshot::Sender<riff_audio::Result<ImpulseResponse>>>,
}

#[async_trait]
impl ImpulseResponseSource for GatedImpulse {
    async fn fetch(&self) -> riff_audio::Result<ImpulseResponse> {
        let (tx, rx) = oneshot::channel();
        self.fetches
            .send(tx)
            .map_err(|_| AudioError::impulse_response("gate closed"))?;
        rx.await
            .map_err(|_| AudioError::impulse_response("gate dropped"))?
    }
}

type ImpulseGate = mpsc::UnboundedReceiver<oneshot::Sender<riff_audio::Result<ImpulseResponse>>>;

/// Controller over `library` whose reverb fetches wait on the returned gate
fn with_gated_impulse(store: Arc<MemoryStore>, decoder: Arc<StaticDecoder>) -> (PlaybackController, ImpulseGate) {
    let (tx, rx) = mpsc::unbounded_channel();
    let controller = PlaybackController::builder(store, decoder)
        .impulse_source(Arc::new(GatedImpulse { fetches: tx }))
        .build();
    (controller, rx)
}

fn error_kinds(events: &[PlaybackEvent]) -> Vec<ErrorKind> {
    events
        .iter()
        .filter_map(|e| match e {
            PlaybackEvent::Error { kind, .. } => Some(*kind),
            _ => None,
        })
        .collect()
}

fn gated(
    store: Arc<MemoryStore>,
) -> (
    PlaybackController,
    mpsc::UnboundedReceiver<(TrackId, oneshot::Sender<DecodedAudio>)>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let controller = PlaybackController::new(store, Arc::new(GatedDecoder { requests: tx }));
    (controller, rx)
}

// ============================================================================
// Load Pipeline
// ============================================================================

#[tokio::test]
async fn test_load_reaches_playing_with_event_order() {
    let (store, decoder) = library(&["t1"]);
    let controller = PlaybackController::new(store.clone(), decoder);
    let mut events = controller.subscribe();

    let outcome = controller.load(track(&store, "t1"), None).await.unwrap();

    assert_eq!(outcome, LoadOutcome::Playing);
    assert_eq!(controller.state(), TransportState::Playing);
    assert_eq!(controller.current_track().unwrap().id.as_str(), "t1");
    assert_eq!(controller.artist().unwrap().name, "The Artist");
    assert!(controller.with_graph(|g| g.has_source()).unwrap());

    let events = drain(&mut events);
    let position = |wanted: &PlaybackEvent| events.iter().position(|e| e == wanted);
    let t1 = TrackId::new("t1");

    let loading = position(&PlaybackEvent::StateChanged {
        state: TransportState::Loading,
    })
    .unwrap();
    let ready = position(&PlaybackEvent::Ready { track_id: t1.clone() }).unwrap();
    let playing = position(&PlaybackEvent::Playing { track_id: t1.clone() }).unwrap();
    assert!(loading < ready && ready < playing);
    assert!(events.contains(&PlaybackEvent::TrackChanged {
        track_id: t1,
        previous_track_id: None,
    }));
}

#[tokio::test]
async fn test_load_without_queue_uses_single_entry() {
    let (store, decoder) = library(&["t1", "t2"]);
    let controller = PlaybackController::new(store.clone(), decoder);

    controller.load(track(&store, "t2"), None).await.unwrap();

    assert_eq!(controller.queue().len(), 1);
    assert_eq!(controller.queue_position(), Some(0));
    assert!(!controller.has_next());
    assert!(!controller.has_prev());
}

#[tokio::test]
async fn test_missing_queue_entries_are_dropped() {
    let (store, decoder) = library(&["t1", "t2"]);
    let controller = PlaybackController::new(store.clone(), decoder);
    let mut events = controller.subscribe();

    controller
        .load(track(&store, "t1"), Some(ids(&["t1", "ghost", "t2"])))
        .await
        .unwrap();

    let queued: Vec<String> = controller
        .queue()
        .iter()
        .map(|t| t.id.as_str().to_string())
        .collect();
    assert_eq!(queued, vec!["t1", "t2"]);
    assert_eq!(controller.queue_position(), Some(0));
    assert_eq!(controller.state(), TransportState::Playing);
    assert_eq!(error_kinds(&drain(&mut events)), vec![ErrorKind::NotFound]);
}

#[tokio::test]
async fn test_view_count_incremented_once_per_load() {
    let (store, decoder) = library(&["t1", "t2"]);
    let controller = PlaybackController::new(store.clone(), decoder);

    controller
        .load(track(&store, "t1"), Some(ids(&["t1", "t2"])))
        .await
        .unwrap();
    assert_eq!(track(&store, "t1").views, 1);
    assert_eq!(track(&store, "t2").views, 0);

    controller.next().await.unwrap();
    assert_eq!(track(&store, "t2").views, 1);
}

#[tokio::test]
async fn test_missing_artist_does_not_block_playback() {
    let store = Arc::new(MemoryStore::new());
    let decoder = Arc::new(StaticDecoder::new());
    store.insert_track(Track::new("t1", "blob:t1", "nobody"));
    decoder.insert("blob:t1", tone(1024));
    let controller = PlaybackController::new(store.clone(), decoder);

    controller.load(track(&store, "t1"), None).await.unwrap();

    assert!(controller.artist().is_none());
    assert_eq!(controller.state(), TransportState::Playing);
}

// ============================================================================
// Boost Pick
// ============================================================================

#[tokio::test]
async fn test_boost_pick_is_prepended() {
    let (store, decoder) = library(&["t1", "t2"]);
    store.insert_track(Track::new("promo", "blob:promo", "artist").with_boost(5));
    let controller = PlaybackController::builder(store.clone(), decoder)
        .boost_seed(11)
        .build();

    controller
        .load(track(&store, "t1"), Some(ids(&["t1", "t2"])))
        .await
        .unwrap();

    let queued: Vec<String> = controller
        .queue()
        .iter()
        .map(|t| t.id.as_str().to_string())
        .collect();
    assert_eq!(queued, vec!["promo", "t1", "t2"]);
    // The requested track stays current
    assert_eq!(controller.queue_position(), Some(1));
    assert_eq!(controller.current_track().unwrap().id.as_str(), "t1");
    assert!(controller.has_prev());
}

#[tokio::test]
async fn test_boost_pick_not_duplicated() {
    let (store, decoder) = library(&["t1"]);
    store.insert_track(Track::new("promo", "blob:promo", "artist").with_boost(5));
    let controller = PlaybackController::new(store.clone(), decoder);

    controller
        .load(track(&store, "t1"), Some(ids(&["t1", "promo"])))
        .await
        .unwrap();

    assert_eq!(controller.queue().len(), 2);
    assert_eq!(controller.queue()[0].id.as_str(), "t1");
}

#[tokio::test]
async fn test_boost_disabled_by_config() {
    let (store, decoder) = library(&["t1"]);
    store.insert_track(Track::new("promo", "blob:promo", "artist").with_boost(5));
    let config = PlaybackConfig {
        boost_enabled: false,
        ..PlaybackConfig::default()
    };
    let controller = PlaybackController::builder(store.clone(), decoder)
        .config(config)
        .build();

    controller
        .load(track(&store, "t1"), Some(ids(&["t1"])))
        .await
        .unwrap();

    assert_eq!(controller.queue().len(), 1);
}

#[tokio::test]
async fn test_navigation_does_not_pick_again() {
    let (store, decoder) = library(&["t1", "t2"]);
    store.insert_track(Track::new("promo", "blob:promo", "artist").with_boost(5));
    let controller = PlaybackController::new(store.clone(), decoder);

    controller
        .load(track(&store, "t1"), Some(ids(&["t1", "t2"])))
        .await
        .unwrap();
    controller.next().await.unwrap();

    assert_eq!(controller.queue().len(), 3);
    assert_eq!(controller.current_track().unwrap().id.as_str(), "t2");
}

// ============================================================================
// Queue Navigation
// ============================================================================

#[tokio::test]
async fn test_next_prev_walk_and_boundaries() {
    let (store, decoder) = library(&["t1", "t2", "t3"]);
    let controller = PlaybackController::new(store.clone(), decoder);
    controller
        .load(track(&store, "t1"), Some(ids(&["t1", "t2", "t3"])))
        .await
        .unwrap();

    assert_eq!(controller.next().await.unwrap(), LoadOutcome::Playing);
    assert_eq!(controller.current_track().unwrap().id.as_str(), "t2");
    controller.next().await.unwrap();
    assert_eq!(controller.current_track().unwrap().id.as_str(), "t3");

    let err = controller.next().await.unwrap_err();
    assert!(matches!(err, PlaybackError::QueueBoundary(Boundary::End)));
    assert_eq!(controller.queue_position(), Some(2));
    assert_eq!(controller.state(), TransportState::Playing);
    assert_eq!(controller.current_track().unwrap().id.as_str(), "t3");

    controller.prev().await.unwrap();
    controller.prev().await.unwrap();
    assert_eq!(controller.current_track().unwrap().id.as_str(), "t1");

    let err = controller.prev().await.unwrap_err();
    assert!(matches!(err, PlaybackError::QueueBoundary(Boundary::Start)));
    assert_eq!(err.kind(), ErrorKind::PreconditionFailure);
    assert_eq!(controller.queue_position(), Some(0));
}

#[tokio::test]
async fn test_track_changed_reports_previous() {
    let (store, decoder) = library(&["t1", "t2"]);
    let controller = PlaybackController::new(store.clone(), decoder);
    controller
        .load(track(&store, "t1"), Some(ids(&["t1", "t2"])))
        .await
        .unwrap();
    let mut events = controller.subscribe();

    controller.next().await.unwrap();

    assert!(drain(&mut events).contains(&PlaybackEvent::TrackChanged {
        track_id: TrackId::new("t2"),
        previous_track_id: Some(TrackId::new("t1")),
    }));
}

// ============================================================================
// Overlapping Loads
// ============================================================================

#[tokio::test]
async fn test_second_load_wins_when_first_completes_first() {
    let (store, _) = library(&["t1", "t2"]);
    let (controller, mut gates) = gated(store.clone());
    let mut events = controller.subscribe();

    let first = tokio::spawn({
        let controller = controller.clone();
        let t1 = track(&store, "t1");
        async move { controller.load(t1, None).await }
    });
    let (id, gate_one) = gates.recv().await.unwrap();
    assert_eq!(id.as_str(), "t1");

    let second = tokio::spawn({
        let controller = controller.clone();
        let t2 = track(&store, "t2");
        async move { controller.load(t2, None).await }
    });
    let (id, gate_two) = gates.recv().await.unwrap();
    assert_eq!(id.as_str(), "t2");

    gate_one.send(tone(1024)).unwrap();
    assert_eq!(first.await.unwrap().unwrap(), LoadOutcome::Superseded);
    assert_eq!(controller.state(), TransportState::Loading);

    gate_two.send(tone(1024)).unwrap();
    assert_eq!(second.await.unwrap().unwrap(), LoadOutcome::Playing);

    assert_eq!(controller.state(), TransportState::Playing);
    assert_eq!(controller.current_track().unwrap().id.as_str(), "t2");
    for event in drain(&mut events) {
        if let PlaybackEvent::Ready { track_id } | PlaybackEvent::Playing { track_id } = event {
            assert_eq!(track_id.as_str(), "t2");
        }
    }
    // Superseded loads never count a view
    assert_eq!(track(&store, "t1").views, 0);
}

#[tokio::test]
async fn test_second_load_wins_when_it_completes_first() {
    let (store, _) = library(&["t1", "t2"]);
    let (controller, mut gates) = gated(store.clone());

    let first = tokio::spawn({
        let controller = controller.clone();
        let t1 = track(&store, "t1");
        async move { controller.load(t1, None).await }
    });
    let (_, gate_one) = gates.recv().await.unwrap();

    let second = tokio::spawn({
        let controller = controller.clone();
        let t2 = track(&store, "t2");
        async move { controller.load(t2, None).await }
    });
    let (_, gate_two) = gates.recv().await.unwrap();

    gate_two.send(tone(1024)).unwrap();
    assert_eq!(second.await.unwrap().unwrap(), LoadOutcome::Playing);

    gate_one.send(tone(1024)).unwrap();
    assert_eq!(first.await.unwrap().unwrap(), LoadOutcome::Superseded);

    assert_eq!(controller.state(), TransportState::Playing);
    assert_eq!(controller.current_track().unwrap().id.as_str(), "t2");
}

#[tokio::test]
async fn test_reset_cancels_pending_load() {
    let (store, _) = library(&["t1"]);
    let (controller, mut gates) = gated(store.clone());

    let load = tokio::spawn({
        let controller = controller.clone();
        let t1 = track(&store, "t1");
        async move { controller.load(t1, None).await }
    });
    let (_, gate) = gates.recv().await.unwrap();

    controller.reset();
    gate.send(tone(1024)).unwrap();

    assert_eq!(load.await.unwrap().unwrap(), LoadOutcome::Superseded);
    assert_eq!(controller.state(), TransportState::Idle);
    assert!(controller.current_track().is_none());
    assert!(controller.with_graph(|_| ()).is_none());
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_decode_failure_enters_error_state() {
    let (store, decoder) = library(&["t1"]);
    store.insert_track(Track::new("broken", "blob:broken", "artist"));
    let controller = PlaybackController::new(store.clone(), decoder);
    let mut events = controller.subscribe();

    let err = controller
        .load(track(&store, "broken"), None)
        .await
        .unwrap_err();

    assert!(matches!(err, PlaybackError::Decode(_)));
    assert_eq!(err.kind(), ErrorKind::DecodeFailure);
    assert_eq!(controller.state(), TransportState::Error);
    assert!(drain(&mut events)
        .iter()
        .any(|e| matches!(e, PlaybackEvent::Error { kind: ErrorKind::DecodeFailure, .. })));

    // Terminal for the track, not the session
    assert!(matches!(controller.play(), Err(PlaybackError::Precondition(_))));
    controller.load(track(&store, "t1"), None).await.unwrap();
    assert_eq!(controller.state(), TransportState::Playing);
}

#[tokio::test]
async fn test_store_write_failures_do_not_affect_playback() {
    let (store, decoder) = library(&["t1"]);
    store.insert_user(UserProfile::new("fan", "Fan"));
    store.set_fail_writes(true);
    let controller = PlaybackController::new(store.clone(), decoder);
    let mut events = controller.subscribe();

    controller.load(track(&store, "t1"), None).await.unwrap();
    assert_eq!(controller.state(), TransportState::Playing);
    assert_eq!(track(&store, "t1").views, 0);

    // Optimistic local flip survives the rejected write
    let fan = UserId::new("fan");
    assert!(controller.toggle_like(&fan).await.unwrap());
    assert!(controller.current_track().unwrap().is_liked_by(&fan));
    assert!(!track(&store, "t1").is_liked_by(&fan));

    // View count and like are both reported, neither stops playback
    assert_eq!(
        error_kinds(&drain(&mut events)),
        vec![ErrorKind::WriteFailure, ErrorKind::WriteFailure]
    );
    assert_eq!(controller.state(), TransportState::Playing);
}

// ============================================================================
// Transport
// ============================================================================

#[tokio::test]
async fn test_transport_preconditions() {
    let (store, decoder) = library(&["t1"]);
    let controller = PlaybackController::new(store.clone(), decoder);
    let mut events = controller.subscribe();

    for result in [controller.play(), controller.pause()] {
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionFailure);
    }
    assert!(controller.play_or_pause().is_err());
    assert!(matches!(
        controller.toggle_effect(EffectKind::Slowed).await,
        Err(PlaybackError::Precondition(_))
    ));
    assert_eq!(controller.state(), TransportState::Idle);

    let events = drain(&mut events);
    assert_eq!(
        error_kinds(&events),
        vec![ErrorKind::PreconditionFailure; 4]
    );
    assert!(!events
        .iter()
        .any(|e| matches!(e, PlaybackEvent::StateChanged { .. })));
}

#[tokio::test]
async fn test_pause_and_resume_emit_events() {
    let (store, decoder) = library(&["t1"]);
    let controller = PlaybackController::new(store.clone(), decoder);
    controller.load(track(&store, "t1"), None).await.unwrap();
    let mut events = controller.subscribe();

    controller.pause().unwrap();
    assert_eq!(controller.state(), TransportState::Paused);
    // Pausing twice is harmless
    controller.pause().unwrap();
    controller.play().unwrap();
    assert_eq!(controller.state(), TransportState::Playing);

    let t1 = TrackId::new("t1");
    let events = drain(&mut events);
    assert_eq!(
        events
            .iter()
            .filter(|e| **e == PlaybackEvent::Paused { track_id: t1.clone() })
            .count(),
        1
    );
    assert!(events.contains(&PlaybackEvent::Playing { track_id: t1 }));
}

#[tokio::test]
async fn test_process_audio_silent_unless_playing() {
    let (store, decoder) = library(&["t1"]);
    let controller = PlaybackController::new(store.clone(), decoder);

    let mut block = vec![1.0; 512];
    assert!(!controller.process_audio(&mut block));
    assert!(block.iter().all(|&s| s == 0.0));

    controller.load(track(&store, "t1"), None).await.unwrap();
    assert!(controller.process_audio(&mut block));
    assert!(block.iter().any(|&s| s != 0.0));
    assert!(controller.position_secs() > 0.0);

    controller.pause().unwrap();
    block.fill(1.0);
    assert!(!controller.process_audio(&mut block));
    assert!(block.iter().all(|&s| s == 0.0));
}

#[tokio::test]
async fn test_end_of_track_returns_to_ready() {
    let store = Arc::new(MemoryStore::new());
    let decoder = Arc::new(StaticDecoder::new());
    store.insert_track(Track::new("short", "blob:short", "artist"));
    decoder.insert("blob:short", tone(100));
    let controller = PlaybackController::new(store.clone(), decoder);
    controller.load(track(&store, "short"), None).await.unwrap();
    let mut events = controller.subscribe();

    let mut block = vec![0.0; 512];
    assert!(controller.process_audio(&mut block));

    assert_eq!(controller.state(), TransportState::Ready);
    assert!(drain(&mut events).contains(&PlaybackEvent::Finished {
        track_id: TrackId::new("short"),
    }));
    assert_eq!(controller.position_secs(), 0.0);

    // Playing again starts from the top
    controller.play().unwrap();
    assert!(controller.process_audio(&mut block));
    assert!(block.iter().any(|&s| s != 0.0));
}

// ============================================================================
// Effects
// ============================================================================

#[tokio::test]
async fn test_reverb_toggle_rewires_in_place() {
    let (store, decoder) = library(&["t1"]);
    let controller = PlaybackController::builder(store.clone(), decoder)
        .impulse_source(Arc::new(StaticImpulseResponse::new(dirac_ir())))
        .build();
    controller.load(track(&store, "t1"), None).await.unwrap();

    assert!(controller.toggle_reverb().await.unwrap());
    assert_eq!(controller.state(), TransportState::Playing);
    assert!(controller.has_cached_impulse());
    let (wet, inputs, dry) = controller
        .with_graph(|g| (g.has_wet_path(), g.destination_inputs(), g.dry_gain()))
        .unwrap();
    assert!(wet);
    assert_eq!(inputs, 2);
    assert!((dry - 0.7).abs() < 1e-6);

    assert!(!controller.toggle_reverb().await.unwrap());
    let (wet, inputs, dry) = controller
        .with_graph(|g| (g.has_wet_path(), g.destination_inputs(), g.dry_gain()))
        .unwrap();
    assert!(!wet);
    assert_eq!(inputs, 1);
    assert_eq!(dry, 1.0);

    // Session end releases the cached impulse response
    controller.reset();
    assert!(!controller.has_cached_impulse());
}

#[tokio::test]
async fn test_missing_impulse_response_falls_back_to_dry() {
    let (store, decoder) = library(&["t1"]);
    let controller = PlaybackController::builder(store.clone(), decoder)
        .impulse_source(Arc::new(StaticImpulseResponse::unavailable()))
        .build();
    controller.load(track(&store, "t1"), None).await.unwrap();
    let mut events = controller.subscribe();

    assert!(!controller.toggle_reverb().await.unwrap());

    assert!(!controller.settings().reverb_enabled);
    assert_eq!(controller.state(), TransportState::Playing);
    assert!(!controller.with_graph(|g| g.has_wet_path()).unwrap());
    assert!(drain(&mut events).iter().any(|e| matches!(
        e,
        PlaybackEvent::Error {
            kind: ErrorKind::ResourceLoadFailure,
            ..
        }
    )));
}

#[tokio::test]
async fn test_reset_discards_failed_impulse_fetch() {
    let (store, decoder) = library(&["t1"]);
    let (controller, mut fetches) = with_gated_impulse(store.clone(), decoder);
    controller.load(track(&store, "t1"), None).await.unwrap();

    let toggle = tokio::spawn({
        let controller = controller.clone();
        async move { controller.toggle_reverb().await }
    });
    let fetch = fetches.recv().await.unwrap();

    controller.reset();
    let mut events = controller.subscribe();
    fetch
        .send(Err(AudioError::impulse_response("offline")))
        .unwrap();
    toggle.await.unwrap().unwrap();

    // The ended session leaves settings and the new session alone
    assert_eq!(controller.state(), TransportState::Idle);
    assert!(controller.settings().reverb_enabled);
    assert!(error_kinds(&drain(&mut events)).is_empty());
    assert!(!controller.has_cached_impulse());
}

#[tokio::test]
async fn test_rebuilds_during_impulse_fetch_are_coalesced() {
    let (store, decoder) = library(&["t1"]);
    let (controller, mut fetches) = with_gated_impulse(store.clone(), decoder);
    controller.load(track(&store, "t1"), None).await.unwrap();

    let toggle = tokio::spawn({
        let controller = controller.clone();
        async move { controller.toggle_reverb().await }
    });
    let fetch = fetches.recv().await.unwrap();

    // Rebuild in flight: these persist and mark the session dirty only
    assert_eq!(controller.set_band_gain(0, 6.0).await.unwrap(), 6.0);
    assert_eq!(controller.set_band_gain(2, -3.0).await.unwrap(), -3.0);
    assert_eq!(controller.with_graph(|g| g.band_gain(0)).flatten(), Some(0.0));
    assert!(!controller.with_graph(|g| g.has_wet_path()).unwrap());

    fetch.send(Ok(dirac_ir())).unwrap();
    assert!(toggle.await.unwrap().unwrap());

    let (g0, g2, wet) = controller
        .with_graph(|g| (g.band_gain(0), g.band_gain(2), g.has_wet_path()))
        .unwrap();
    assert_eq!(g0, Some(6.0));
    assert_eq!(g2, Some(-3.0));
    assert!(wet);
    // One acquisition for the whole burst
    assert!(fetches.try_recv().is_err());
    assert_eq!(controller.state(), TransportState::Playing);
}

#[tokio::test]
async fn test_reverb_persisted_on_but_unavailable_at_load() {
    let (store, decoder) = library(&["t1"]);
    let settings = MemorySettingsStore::with_settings(riff_audio::EffectSettings {
        reverb_enabled: true,
        ..riff_audio::EffectSettings::default()
    });
    let controller = PlaybackController::builder(store.clone(), decoder)
        .settings_store(Arc::new(settings))
        .build();

    assert_eq!(
        controller.load(track(&store, "t1"), None).await.unwrap(),
        LoadOutcome::Playing
    );
    assert!(!controller.settings().reverb_enabled);
}

#[tokio::test]
async fn test_slowed_and_reverb_are_independent() {
    let (store, decoder) = library(&["t1"]);
    let controller = PlaybackController::builder(store.clone(), decoder)
        .impulse_source(Arc::new(StaticImpulseResponse::new(dirac_ir())))
        .build();
    controller.load(track(&store, "t1"), None).await.unwrap();

    let rate = controller.toggle_slowed().await.unwrap();
    assert!((rate - 0.8).abs() < 1e-6);
    assert!(!controller.settings().reverb_enabled);
    let graph_rate = controller.with_graph(|g| g.playback_rate()).flatten().unwrap();
    assert!((graph_rate - 0.8).abs() < 1e-6);

    controller.toggle_reverb().await.unwrap();
    assert!((controller.settings().rate - 0.8).abs() < 1e-6);

    let rate = controller.toggle_slowed().await.unwrap();
    assert!((rate - 1.0).abs() < 1e-6);
    assert!(controller.settings().reverb_enabled);
}

#[tokio::test]
async fn test_preserve_pitch_adds_pitch_stage() {
    let (store, decoder) = library(&["t1"]);
    let controller = PlaybackController::new(store.clone(), decoder);
    controller.load(track(&store, "t1"), None).await.unwrap();

    controller.set_rate(0.5).await.unwrap();
    assert!(controller.toggle_preserve_pitch().await.unwrap());

    let (stage, ratio) = controller
        .with_graph(|g| (g.has_pitch_stage(), g.pitch_ratio()))
        .unwrap();
    assert!(stage);
    assert!((ratio - 2.0).abs() < 1e-5);

    assert!(!controller.toggle_preserve_pitch().await.unwrap());
    assert!(!controller.with_graph(|g| g.has_pitch_stage()).unwrap());
}

#[tokio::test]
async fn test_setters_apply_to_live_graph() {
    let (store, decoder) = library(&["t1"]);
    let controller = PlaybackController::new(store.clone(), decoder);
    controller.load(track(&store, "t1"), None).await.unwrap();
    let mut events = controller.subscribe();

    assert_eq!(controller.set_band_gain(2, 6.0).await.unwrap(), 6.0);
    assert_eq!(controller.set_pitch_offset(-3.0).await.unwrap(), -3.0);
    assert_eq!(controller.set_rate(1.5).await.unwrap(), Some(1.5));

    let (gain, pitch, rate) = controller
        .with_graph(|g| (g.band_gain(2), g.has_pitch_stage(), g.playback_rate()))
        .unwrap();
    assert_eq!(gain, Some(6.0));
    assert!(pitch);
    assert!((rate.unwrap() - 1.5).abs() < 1e-6);

    controller.reset_eq().await.unwrap();
    assert_eq!(controller.with_graph(|g| g.band_gain(2)).flatten(), Some(0.0));

    assert!(drain(&mut events)
        .iter()
        .any(|e| matches!(e, PlaybackEvent::EffectsChanged { .. })));
    assert_eq!(controller.state(), TransportState::Playing);
}

#[tokio::test]
async fn test_invalid_band_is_rejected() {
    let (store, decoder) = library(&["t1"]);
    let controller = PlaybackController::new(store, decoder);

    let err = controller.set_band_gain(7, 3.0).await.unwrap_err();
    assert!(matches!(err, PlaybackError::Audio(AudioError::InvalidBand { index: 7, len: 7 })));
}

#[tokio::test]
async fn test_settings_survive_sessions_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("effects.json");
    let (store, decoder) = library(&["t1"]);

    let first = PlaybackController::builder(store.clone(), decoder.clone())
        .settings_store(Arc::new(JsonSettingsStore::new(&path)))
        .build();
    first.set_band_gain(0, -4.0).await.unwrap();
    first.set_rate(0.7).await.unwrap();

    let second = PlaybackController::builder(store.clone(), decoder)
        .settings_store(Arc::new(JsonSettingsStore::new(&path)))
        .build();
    second.load(track(&store, "t1"), None).await.unwrap();

    let (gain, rate) = second
        .with_graph(|g| (g.band_gain(0), g.playback_rate()))
        .unwrap();
    assert_eq!(gain, Some(-4.0));
    assert!((rate.unwrap() - 0.7).abs() < 1e-6);
}

// ============================================================================
// Likes and Reset
// ============================================================================

#[tokio::test]
async fn test_toggle_like_updates_both_documents() {
    let (store, decoder) = library(&["t1", "t2"]);
    store.insert_user(UserProfile::new("fan", "Fan"));
    let controller = PlaybackController::new(store.clone(), decoder);
    controller
        .load(track(&store, "t1"), Some(ids(&["t1", "t2"])))
        .await
        .unwrap();
    let fan = UserId::new("fan");

    assert!(controller.toggle_like(&fan).await.unwrap());
    assert!(track(&store, "t1").is_liked_by(&fan));
    assert!(store.user(&fan).unwrap().liked.contains(&TrackId::new("t1")));
    assert!(controller.current_track().unwrap().is_liked_by(&fan));
    assert!(controller.queue()[0].is_liked_by(&fan));

    assert!(!controller.toggle_like(&fan).await.unwrap());
    assert!(!track(&store, "t1").is_liked_by(&fan));
    assert!(store.user(&fan).unwrap().liked.is_empty());
}

#[tokio::test]
async fn test_toggle_like_requires_current_track() {
    let (store, decoder) = library(&["t1"]);
    let controller = PlaybackController::new(store, decoder);

    assert!(matches!(
        controller.toggle_like(&UserId::new("fan")).await,
        Err(PlaybackError::Precondition(_))
    ));
}

#[tokio::test]
async fn test_reset_returns_to_idle() {
    let (store, decoder) = library(&["t1", "t2"]);
    let controller = PlaybackController::new(store.clone(), decoder);
    controller
        .load(track(&store, "t1"), Some(ids(&["t1", "t2"])))
        .await
        .unwrap();
    let mut events = controller.subscribe();

    controller.reset();

    assert_eq!(controller.state(), TransportState::Idle);
    assert!(controller.queue().is_empty());
    assert_eq!(controller.queue_position(), None);
    assert!(controller.current_track().is_none());
    assert!(controller.with_graph(|_| ()).is_none());
    assert!(drain(&mut events).contains(&PlaybackEvent::StateChanged {
        state: TransportState::Idle,
    }));

    // A fresh load builds a new graph
    controller.load(track(&store, "t2"), None).await.unwrap();
    assert_eq!(controller.state(), TransportState::Playing);
    assert!(controller.with_graph(|g| g.has_source()).unwrap());
}
