//! Playback engine state machine through the public API.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;
use vodflow_core::config::PlaybackConfig;
use vodflow_core::playback::{
    AttachOptions, ClassifiedFault, FaultCategory, FaultKind, PlaybackState, PlayerEvent,
    RawPlaybackFault, StaticProbe, StreamingPlaybackEngine,
};
use vodflow_core::test_support::{MockPlayerFactory, MockSink};

const SOURCE: &str = "/videos/upload-42/master.m3u8";

fn engine_with(probe: StaticProbe) -> (StreamingPlaybackEngine, EngineTaps) {
    let (sink, sink_log) = MockSink::new();
    let factory = MockPlayerFactory::new();
    let player_log = factory.log();

    let mut engine = StreamingPlaybackEngine::new(
        Box::new(sink),
        Box::new(factory),
        Box::new(probe),
        PlaybackConfig::default(),
    );

    let ready_count = Arc::new(AtomicU32::new(0));
    let ready_tap = Arc::clone(&ready_count);
    engine.on_ready(move || {
        ready_tap.fetch_add(1, Ordering::SeqCst);
    });

    let errors = Arc::new(Mutex::new(Vec::new()));
    let error_tap = Arc::clone(&errors);
    engine.on_error(move |fault| error_tap.lock().push(fault));

    (
        engine,
        EngineTaps {
            player_log,
            sink_log,
            ready_count,
            errors,
        },
    )
}

struct EngineTaps {
    player_log: Arc<Mutex<vodflow_core::test_support::PlayerLog>>,
    sink_log: Arc<Mutex<vodflow_core::test_support::SinkLog>>,
    ready_count: Arc<AtomicU32>,
    errors: Arc<Mutex<Vec<ClassifiedFault>>>,
}

fn software_only() -> StaticProbe {
    StaticProbe {
        software_engine: true,
        native_playback: false,
    }
}

fn fatal_network() -> PlayerEvent {
    PlayerEvent::Fault(RawPlaybackFault::new(
        true,
        FaultKind::NetworkLayer,
        "level load error",
    ))
}

/// Given source S: attach(S) -> fatal network -> retry of S -> fatal
/// network again reaches Failed, fires on_error exactly once, and loads S
/// no more than twice total.
#[tokio::test(start_paused = true)]
async fn engine_single_bounded_retry() {
    let (mut engine, taps) = engine_with(software_only());

    engine.attach(SOURCE, AttachOptions::default()).unwrap();
    engine.handle_event(fatal_network()).await;
    assert_eq!(engine.state(), PlaybackState::Loading);

    engine.handle_event(fatal_network()).await;
    assert_eq!(engine.state(), PlaybackState::Failed);

    let loads = &taps.player_log.lock().loads;
    assert_eq!(loads.len(), 2);
    assert!(loads.iter().all(|s| s == SOURCE));

    let errors = taps.errors.lock();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].category, FaultCategory::Network);
    assert!(errors[0].fatal);
}

/// Happy path: manifest parse fires on_ready once; accepted autoplay moves
/// the session to Playing.
#[tokio::test(start_paused = true)]
async fn engine_happy_path_autoplay_accepted() {
    let (mut engine, taps) = engine_with(software_only());

    engine
        .attach(SOURCE, AttachOptions { autoplay: true })
        .unwrap();
    engine.handle_event(PlayerEvent::ManifestParsed).await;

    assert_eq!(engine.state(), PlaybackState::Playing);
    assert_eq!(taps.ready_count.load(Ordering::SeqCst), 1);
    assert_eq!(taps.sink_log.lock().play_calls, 1);
    assert!(taps.errors.lock().is_empty());
}

/// Rejected autoplay is not an error: the session parks in Ready awaiting
/// an explicit play.
#[tokio::test(start_paused = true)]
async fn engine_autoplay_rejection_is_silent() {
    let (sink, sink_log) = MockSink::new_rejecting_autoplay();
    let factory = MockPlayerFactory::new();
    let mut engine = StreamingPlaybackEngine::new(
        Box::new(sink),
        Box::new(factory),
        Box::new(software_only()),
        PlaybackConfig::default(),
    );

    let errors = Arc::new(Mutex::new(Vec::new()));
    let error_tap = Arc::clone(&errors);
    engine.on_error(move |fault: ClassifiedFault| error_tap.lock().push(fault));

    engine
        .attach(SOURCE, AttachOptions { autoplay: true })
        .unwrap();
    engine.handle_event(PlayerEvent::ManifestParsed).await;

    assert_eq!(engine.state(), PlaybackState::Ready);
    assert_eq!(sink_log.lock().play_calls, 1);
    assert!(errors.lock().is_empty());
}

/// detach() is idempotent and safe from every reachable state; no listener
/// observable effect fires afterwards.
#[tokio::test(start_paused = true)]
async fn engine_teardown_from_every_state() {
    // Idle.
    let (mut engine, _) = engine_with(software_only());
    engine.detach();
    engine.detach();
    assert_eq!(engine.state(), PlaybackState::Idle);

    // Loading.
    let (mut engine, taps) = engine_with(software_only());
    engine.attach(SOURCE, AttachOptions::default()).unwrap();
    engine.detach();
    assert_eq!(engine.state(), PlaybackState::Idle);
    assert_eq!(taps.player_log.lock().destroys, 1);

    // Ready, Playing, Paused.
    for events in [
        vec![PlayerEvent::ManifestParsed],
        vec![PlayerEvent::ManifestParsed, PlayerEvent::Started],
        vec![
            PlayerEvent::ManifestParsed,
            PlayerEvent::Started,
            PlayerEvent::Paused,
        ],
    ] {
        let (mut engine, taps) = engine_with(software_only());
        engine.attach(SOURCE, AttachOptions::default()).unwrap();
        for event in events {
            engine.handle_event(event).await;
        }
        engine.detach();
        engine.detach();
        assert_eq!(engine.state(), PlaybackState::Idle);
        assert_eq!(taps.player_log.lock().destroys, 1);

        // Stale events after teardown stay without effect.
        engine.handle_event(fatal_network()).await;
        assert_eq!(engine.state(), PlaybackState::Idle);
        assert!(taps.errors.lock().is_empty());
    }

    // After a completed recovery cycle (the engine holds the session
    // exclusively while Recovering, so teardown lands right after it).
    let (mut engine, taps) = engine_with(software_only());
    engine.attach(SOURCE, AttachOptions::default()).unwrap();
    engine.handle_event(fatal_network()).await;
    engine.detach();
    assert_eq!(engine.state(), PlaybackState::Idle);
    assert_eq!(taps.player_log.lock().destroys, 1);

    // Failed.
    let (mut engine, taps) = engine_with(software_only());
    engine.attach(SOURCE, AttachOptions::default()).unwrap();
    engine.handle_event(fatal_network()).await;
    engine.handle_event(fatal_network()).await;
    assert_eq!(engine.state(), PlaybackState::Failed);
    engine.detach();
    engine.detach();
    assert_eq!(engine.state(), PlaybackState::Idle);
    // Destroyed once on failure; detach finds no player left.
    assert_eq!(taps.player_log.lock().destroys, 1);
}

/// Capability fallback: software unavailable but native available selects
/// native playback; neither available fails without attempting a load.
#[tokio::test(start_paused = true)]
async fn engine_capability_fallback() {
    let (mut engine, taps) = engine_with(StaticProbe {
        software_engine: false,
        native_playback: true,
    });
    engine.attach(SOURCE, AttachOptions::default()).unwrap();
    assert_eq!(engine.state(), PlaybackState::Loading);
    assert_eq!(taps.sink_log.lock().sources, vec![SOURCE]);
    assert_eq!(taps.player_log.lock().created, 0);

    let (mut engine, taps) = engine_with(StaticProbe {
        software_engine: false,
        native_playback: false,
    });
    engine.attach(SOURCE, AttachOptions::default()).unwrap();
    assert_eq!(engine.state(), PlaybackState::Failed);
    assert_eq!(taps.player_log.lock().created, 0);
    assert!(taps.sink_log.lock().sources.is_empty());
    assert_eq!(taps.errors.lock().len(), 1);
}

/// play()/pause() pass through to the sink without driving the state
/// machine; state still follows the sink's own events.
#[tokio::test(start_paused = true)]
async fn engine_play_pause_pass_through() {
    let (mut engine, taps) = engine_with(software_only());
    engine.attach(SOURCE, AttachOptions::default()).unwrap();
    engine.handle_event(PlayerEvent::ManifestParsed).await;

    engine.play().await.unwrap();
    assert_eq!(taps.sink_log.lock().play_calls, 1);
    assert_eq!(engine.state(), PlaybackState::Ready);

    engine.handle_event(PlayerEvent::Started).await;
    assert_eq!(engine.state(), PlaybackState::Playing);

    engine.pause();
    assert_eq!(taps.sink_log.lock().pause_calls, 1);
    engine.handle_event(PlayerEvent::Paused).await;
    assert_eq!(engine.state(), PlaybackState::Paused);
}
