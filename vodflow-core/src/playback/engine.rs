//! Adaptive streaming playback engine.
//!
//! One [`StreamingPlaybackEngine`] owns one playback session: it attaches a
//! source to its media sink, drives the software player when capability
//! resolution selects it, applies the recovery policy to reported faults,
//! and exposes the ready/error lifecycle callbacks. Transient streaming
//! hiccups are absorbed by one bounded retry per fault category; the caller
//! hears about a failure only when automatic recovery is exhausted.

use thiserror::Error;

use super::capability::{self, CapabilityProbe, PlaybackPath};
use super::player::{AdaptivePlayer, AutoplayRejected, MediaSink, PlayerEvent, PlayerFactory};
use super::recovery::{ClassifiedFault, FaultCategory, RecoveryAction, classify, recovery_action};
use crate::config::PlaybackConfig;

/// Playback session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No source attached. Terminal for a torn-down session.
    Idle,
    /// Manifest loading is in flight.
    Loading,
    /// Manifest parsed; playable, not playing.
    Ready,
    /// The sink is rendering.
    Playing,
    /// Paused by the user or the platform.
    Paused,
    /// A bounded recovery action is in flight.
    Recovering,
    /// Playback is impossible for this session. Terminal.
    Failed,
}

/// Per-attach options supplied by the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttachOptions {
    /// Attempt to start playback as soon as the manifest is parsed. A
    /// platform rejection is not an error; the session parks in `Ready`.
    pub autoplay: bool,
}

/// Caller-side misuse of the engine API.
///
/// These are the only errors `attach` returns directly; session faults are
/// delivered through the `on_error` callback instead.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// `attach` was called with an empty source.
    #[error("cannot attach an empty source")]
    EmptySource,

    /// `attach` was called while a session is active. The previous session
    /// must be torn down with `detach` before a new one may attach.
    #[error("a playback session is already attached (state {state:?})")]
    SessionActive { state: PlaybackState },
}

type ReadyCallback = Box<dyn FnOnce() + Send>;
type ErrorCallback = Box<dyn FnOnce(ClassifiedFault) + Send>;

/// Owns one playback session over an exclusively held media sink.
pub struct StreamingPlaybackEngine {
    sink: Box<dyn MediaSink>,
    player_factory: Box<dyn PlayerFactory>,
    probe: Box<dyn CapabilityProbe>,
    config: PlaybackConfig,
    state: PlaybackState,
    path: Option<PlaybackPath>,
    source: Option<String>,
    player: Option<Box<dyn AdaptivePlayer>>,
    autoplay: bool,
    network_retry_used: bool,
    media_retry_used: bool,
    on_ready: Option<ReadyCallback>,
    on_error: Option<ErrorCallback>,
}

impl StreamingPlaybackEngine {
    /// Creates an engine over a sink it will exclusively own.
    ///
    /// The factory is only consulted when capability resolution selects the
    /// software path, and then exactly once per session.
    pub fn new(
        sink: Box<dyn MediaSink>,
        player_factory: Box<dyn PlayerFactory>,
        probe: Box<dyn CapabilityProbe>,
        config: PlaybackConfig,
    ) -> Self {
        Self {
            sink,
            player_factory,
            probe,
            config,
            state: PlaybackState::Idle,
            path: None,
            source: None,
            player: None,
            autoplay: false,
            network_retry_used: false,
            media_retry_used: false,
            on_ready: None,
            on_error: None,
        }
    }

    /// Registers the callback fired once the manifest is parsed.
    ///
    /// Fires at most once per session, on the Loading → Ready transition.
    pub fn on_ready(&mut self, callback: impl FnOnce() + Send + 'static) {
        self.on_ready = Some(Box::new(callback));
    }

    /// Registers the callback fired when playback becomes impossible.
    ///
    /// Fires at most once per session, on entry to `Failed` only.
    /// Recoverable faults never reach it.
    pub fn on_error(&mut self, callback: impl FnOnce(ClassifiedFault) + Send + 'static) {
        self.on_error = Some(Box::new(callback));
    }

    /// Attaches a playlist source and begins loading.
    ///
    /// If the runtime cannot play adaptive streams at all, the session
    /// enters `Failed` and `on_error` fires without any load being
    /// attempted; `attach` itself still returns `Ok`.
    ///
    /// # Errors
    ///
    /// - `PlaybackError::EmptySource` - `source` is empty or whitespace
    /// - `PlaybackError::SessionActive` - previous session not detached
    pub fn attach(&mut self, source: &str, options: AttachOptions) -> Result<(), PlaybackError> {
        if self.state != PlaybackState::Idle {
            return Err(PlaybackError::SessionActive { state: self.state });
        }
        if source.trim().is_empty() {
            return Err(PlaybackError::EmptySource);
        }

        self.autoplay = options.autoplay;
        self.source = Some(source.to_string());

        match capability::resolve(self.probe.as_ref()) {
            PlaybackPath::Unsupported => {
                self.fail(ClassifiedFault {
                    fatal: true,
                    category: FaultCategory::Other,
                    detail: "adaptive streaming is not supported on this runtime".to_string(),
                });
            }
            PlaybackPath::Software => {
                let mut player = self.player_factory.create();
                player.start_load(source);
                self.player = Some(player);
                self.path = Some(PlaybackPath::Software);
                self.state = PlaybackState::Loading;
                tracing::debug!(source, "attached via software player");
            }
            PlaybackPath::Native => {
                self.sink.set_source(source);
                self.path = Some(PlaybackPath::Native);
                self.state = PlaybackState::Loading;
                tracing::debug!(source, "attached via native playback");
            }
        }

        Ok(())
    }

    /// Tears the session down, returning to `Idle`.
    ///
    /// Destroys the owned player (which deregisters its listeners
    /// synchronously), clears the sink source, and drops the lifecycle
    /// callbacks. Idempotent and safe from any state, including
    /// `Recovering`. Events delivered after detach are ignored.
    pub fn detach(&mut self) {
        if let Some(mut player) = self.player.take() {
            player.stop_load();
            player.destroy();
        }
        self.sink.clear_source();

        if self.state != PlaybackState::Idle {
            tracing::debug!(state = ?self.state, "playback session detached");
        }

        self.state = PlaybackState::Idle;
        self.path = None;
        self.source = None;
        self.autoplay = false;
        self.network_retry_used = false;
        self.media_retry_used = false;
        self.on_ready = None;
        self.on_error = None;
    }

    /// Starts playback on the sink. Thin pass-through: the state machine
    /// observes the result through the `Started` event, not through this
    /// return value.
    ///
    /// # Errors
    ///
    /// - `AutoplayRejected` - Platform policy requires a user gesture
    pub async fn play(&mut self) -> Result<(), AutoplayRejected> {
        self.sink.play().await
    }

    /// Pauses playback on the sink. Thin pass-through.
    pub fn pause(&mut self) {
        self.sink.pause();
    }

    /// Current session state.
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Playback path resolved for the current session, if attached.
    pub fn playback_path(&self) -> Option<PlaybackPath> {
        self.path
    }

    /// Feeds one player/sink event into the state machine.
    ///
    /// The embedding layer adapts library and native events to
    /// [`PlayerEvent`] and calls this for each. Events arriving in `Idle`
    /// or `Failed` are ignored.
    pub async fn handle_event(&mut self, event: PlayerEvent) {
        if matches!(self.state, PlaybackState::Idle | PlaybackState::Failed) {
            tracing::trace!(state = ?self.state, ?event, "event ignored in terminal state");
            return;
        }

        match event {
            PlayerEvent::ManifestParsed => self.handle_manifest_parsed().await,
            PlayerEvent::Started => {
                if matches!(
                    self.state,
                    PlaybackState::Loading | PlaybackState::Ready | PlaybackState::Paused
                ) {
                    self.state = PlaybackState::Playing;
                }
            }
            PlayerEvent::Paused => {
                if matches!(self.state, PlaybackState::Playing | PlaybackState::Ready) {
                    self.state = PlaybackState::Paused;
                }
            }
            PlayerEvent::Fault(raw) => self.handle_fault(raw).await,
        }
    }

    async fn handle_manifest_parsed(&mut self) {
        if self.state != PlaybackState::Loading {
            tracing::trace!(state = ?self.state, "manifest event outside Loading ignored");
            return;
        }

        self.state = PlaybackState::Ready;
        if let Some(callback) = self.on_ready.take() {
            callback();
        }

        if self.autoplay {
            match self.sink.play().await {
                Ok(()) => self.state = PlaybackState::Playing,
                Err(rejected) => {
                    // Platform policy, not a fault: park and wait for the
                    // user to press play.
                    tracing::info!(%rejected, "autoplay rejected, session parked in ready state");
                }
            }
        }
    }

    async fn handle_fault(&mut self, raw: super::recovery::RawPlaybackFault) {
        if self.state == PlaybackState::Recovering {
            tracing::debug!(?raw, "fault ignored while a recovery is in flight");
            return;
        }

        let fault = classify(raw);
        match recovery_action(&fault) {
            RecoveryAction::Noop => {
                tracing::debug!(%fault, "player self-healed, no transition");
            }
            RecoveryAction::RetryLoad => {
                if self.network_retry_used {
                    self.fail(fault);
                } else {
                    self.network_retry_used = true;
                    tracing::warn!(%fault, "network fault, retrying load once");
                    self.state = PlaybackState::Recovering;
                    tokio::time::sleep(self.config.recovery_backoff).await;
                    self.reissue_load();
                    self.state = PlaybackState::Loading;
                }
            }
            RecoveryAction::ResetDecoder => {
                if self.media_retry_used {
                    self.fail(fault);
                } else {
                    self.media_retry_used = true;
                    tracing::warn!(%fault, "media fault, resetting decoder once");
                    self.state = PlaybackState::Recovering;
                    tokio::time::sleep(self.config.recovery_backoff).await;
                    if let Some(player) = self.player.as_mut() {
                        player.reset_decoder();
                    }
                    // Manifest is still parsed; no reload needed.
                    self.state = PlaybackState::Ready;
                }
            }
            RecoveryAction::GiveUp => self.fail(fault),
        }
    }

    /// Reissues the load of the current source on the resolved path.
    fn reissue_load(&mut self) {
        let Some(source) = self.source.clone() else {
            return;
        };
        match self.path {
            Some(PlaybackPath::Software) => {
                if let Some(player) = self.player.as_mut() {
                    player.start_load(&source);
                }
            }
            Some(PlaybackPath::Native) => self.sink.set_source(&source),
            Some(PlaybackPath::Unsupported) | None => {}
        }
    }

    /// Enters `Failed`, releasing the player and firing `on_error` once.
    fn fail(&mut self, fault: ClassifiedFault) {
        tracing::error!(%fault, "playback failed, recovery exhausted");
        self.state = PlaybackState::Failed;
        if let Some(mut player) = self.player.take() {
            player.destroy();
        }
        if let Some(callback) = self.on_error.take() {
            callback(fault);
        }
    }
}

impl Drop for StreamingPlaybackEngine {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use parking_lot::Mutex;

    use super::*;
    use crate::playback::capability::StaticProbe;
    use crate::playback::recovery::{FaultKind, RawPlaybackFault};
    use crate::test_support::{MockPlayerFactory, MockSink, PlayerLog, SinkLog};

    struct Harness {
        engine: StreamingPlaybackEngine,
        player_log: Arc<Mutex<PlayerLog>>,
        sink_log: Arc<Mutex<SinkLog>>,
        ready_fired: Arc<AtomicU32>,
        errors: Arc<Mutex<Vec<ClassifiedFault>>>,
    }

    fn harness(probe: StaticProbe, reject_autoplay: bool) -> Harness {
        let (sink, sink_log) = if reject_autoplay {
            MockSink::new_rejecting_autoplay()
        } else {
            MockSink::new()
        };
        let factory = MockPlayerFactory::new();
        let player_log = factory.log();

        let mut engine = StreamingPlaybackEngine::new(
            Box::new(sink),
            Box::new(factory),
            Box::new(probe),
            PlaybackConfig::default(),
        );

        let ready_fired = Arc::new(AtomicU32::new(0));
        let ready_counter = Arc::clone(&ready_fired);
        engine.on_ready(move || {
            ready_counter.fetch_add(1, Ordering::SeqCst);
        });

        let errors = Arc::new(Mutex::new(Vec::new()));
        let error_sink = Arc::clone(&errors);
        engine.on_error(move |fault| error_sink.lock().push(fault));

        Harness {
            engine,
            player_log,
            sink_log,
            ready_fired,
            errors,
        }
    }

    fn software_probe() -> StaticProbe {
        StaticProbe {
            software_engine: true,
            native_playback: false,
        }
    }

    fn network_fault() -> PlayerEvent {
        PlayerEvent::Fault(RawPlaybackFault::new(
            true,
            FaultKind::NetworkLayer,
            "manifest request timed out",
        ))
    }

    #[tokio::test]
    async fn test_happy_path_with_autoplay() {
        let mut h = harness(software_probe(), false);

        h.engine
            .attach("/videos/v1/master.m3u8", AttachOptions { autoplay: true })
            .unwrap();
        assert_eq!(h.engine.state(), PlaybackState::Loading);
        assert_eq!(h.player_log.lock().loads, vec!["/videos/v1/master.m3u8"]);

        h.engine.handle_event(PlayerEvent::ManifestParsed).await;
        assert_eq!(h.engine.state(), PlaybackState::Playing);
        assert_eq!(h.ready_fired.load(Ordering::SeqCst), 1);
        assert_eq!(h.sink_log.lock().play_calls, 1);
        assert!(h.errors.lock().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_autoplay_parks_in_ready() {
        let mut h = harness(software_probe(), true);

        h.engine
            .attach("/videos/v1/master.m3u8", AttachOptions { autoplay: true })
            .unwrap();
        h.engine.handle_event(PlayerEvent::ManifestParsed).await;

        assert_eq!(h.engine.state(), PlaybackState::Ready);
        assert_eq!(h.ready_fired.load(Ordering::SeqCst), 1);
        assert!(h.errors.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_fires_once_even_after_retry_reparse() {
        let mut h = harness(software_probe(), false);

        h.engine
            .attach("/videos/v1/master.m3u8", AttachOptions::default())
            .unwrap();
        h.engine.handle_event(PlayerEvent::ManifestParsed).await;
        h.engine.handle_event(network_fault()).await;
        h.engine.handle_event(PlayerEvent::ManifestParsed).await;

        assert_eq!(h.ready_fired.load(Ordering::SeqCst), 1);
        assert_eq!(h.engine.state(), PlaybackState::Ready);
    }

    #[tokio::test]
    async fn test_play_pause_events_are_passive() {
        let mut h = harness(software_probe(), false);

        h.engine
            .attach("/videos/v1/master.m3u8", AttachOptions::default())
            .unwrap();
        h.engine.handle_event(PlayerEvent::ManifestParsed).await;
        assert_eq!(h.engine.state(), PlaybackState::Ready);

        h.engine.handle_event(PlayerEvent::Started).await;
        assert_eq!(h.engine.state(), PlaybackState::Playing);
        h.engine.handle_event(PlayerEvent::Paused).await;
        assert_eq!(h.engine.state(), PlaybackState::Paused);
        h.engine.handle_event(PlayerEvent::Started).await;
        assert_eq!(h.engine.state(), PlaybackState::Playing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_bounded_network_retry() {
        let mut h = harness(software_probe(), false);

        h.engine
            .attach("/videos/v1/master.m3u8", AttachOptions::default())
            .unwrap();
        h.engine.handle_event(network_fault()).await;

        // First fatal network fault: one backoff, one reissued load.
        assert_eq!(h.engine.state(), PlaybackState::Loading);
        assert_eq!(h.player_log.lock().loads.len(), 2);

        h.engine.handle_event(network_fault()).await;

        // Second fatal network fault: no third load, surfaced once.
        assert_eq!(h.engine.state(), PlaybackState::Failed);
        assert_eq!(h.player_log.lock().loads.len(), 2);
        let errors = h.errors.lock();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].category, FaultCategory::Network);
        assert_eq!(h.player_log.lock().destroys, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_media_fault_resets_decoder_in_place() {
        let mut h = harness(software_probe(), false);

        h.engine
            .attach("/videos/v1/master.m3u8", AttachOptions::default())
            .unwrap();
        h.engine.handle_event(PlayerEvent::ManifestParsed).await;

        h.engine
            .handle_event(PlayerEvent::Fault(RawPlaybackFault::new(
                true,
                FaultKind::MediaLayer,
                "buffer append error",
            )))
            .await;

        // Decoder reset keeps the manifest: back to Ready, no reload.
        assert_eq!(h.engine.state(), PlaybackState::Ready);
        assert_eq!(h.player_log.lock().decoder_resets, 1);
        assert_eq!(h.player_log.lock().loads.len(), 1);
        assert!(h.errors.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_media_fault_is_terminal() {
        let mut h = harness(software_probe(), false);

        h.engine
            .attach("/videos/v1/master.m3u8", AttachOptions::default())
            .unwrap();
        let media_fault = || {
            PlayerEvent::Fault(RawPlaybackFault::new(
                true,
                FaultKind::MediaLayer,
                "decode stall",
            ))
        };

        h.engine.handle_event(PlayerEvent::ManifestParsed).await;
        h.engine.handle_event(media_fault()).await;
        assert_eq!(h.engine.state(), PlaybackState::Ready);

        h.engine.handle_event(media_fault()).await;
        assert_eq!(h.engine.state(), PlaybackState::Failed);
        assert_eq!(h.errors.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_non_fatal_fault_is_a_noop() {
        let mut h = harness(software_probe(), false);

        h.engine
            .attach("/videos/v1/master.m3u8", AttachOptions::default())
            .unwrap();
        h.engine.handle_event(PlayerEvent::ManifestParsed).await;
        h.engine
            .handle_event(PlayerEvent::Fault(RawPlaybackFault::new(
                false,
                FaultKind::NetworkLayer,
                "segment retry handled internally",
            )))
            .await;

        assert_eq!(h.engine.state(), PlaybackState::Ready);
        assert!(h.errors.lock().is_empty());
    }

    #[tokio::test]
    async fn test_other_fatal_fault_fails_immediately() {
        let mut h = harness(software_probe(), false);

        h.engine
            .attach("/videos/v1/master.m3u8", AttachOptions::default())
            .unwrap();
        h.engine
            .handle_event(PlayerEvent::Fault(RawPlaybackFault::new(
                true,
                FaultKind::OtherLayer,
                "key system failure",
            )))
            .await;

        assert_eq!(h.engine.state(), PlaybackState::Failed);
        assert_eq!(h.player_log.lock().loads.len(), 1);
        assert_eq!(h.errors.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_runtime_fails_without_loading() {
        let mut h = harness(
            StaticProbe {
                software_engine: false,
                native_playback: false,
            },
            false,
        );

        h.engine
            .attach("/videos/v1/master.m3u8", AttachOptions::default())
            .unwrap();

        assert_eq!(h.engine.state(), PlaybackState::Failed);
        assert!(h.player_log.lock().loads.is_empty());
        assert!(h.sink_log.lock().sources.is_empty());
        let errors = h.errors.lock();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].category, FaultCategory::Other);
    }

    #[tokio::test]
    async fn test_native_path_and_coarse_native_faults() {
        let mut h = harness(
            StaticProbe {
                software_engine: false,
                native_playback: true,
            },
            false,
        );

        h.engine
            .attach("https://cdn.example.com/v1/master.m3u8", AttachOptions::default())
            .unwrap();
        assert_eq!(h.engine.playback_path(), Some(PlaybackPath::Native));
        assert_eq!(
            h.sink_log.lock().sources,
            vec!["https://cdn.example.com/v1/master.m3u8"]
        );
        assert!(h.player_log.lock().loads.is_empty());

        h.engine.handle_event(PlayerEvent::ManifestParsed).await;
        h.engine
            .handle_event(PlayerEvent::Fault(RawPlaybackFault::native(
                "MEDIA_ERR_SRC_NOT_SUPPORTED",
            )))
            .await;

        // Native faults are coarse: no retry, straight to Failed.
        assert_eq!(h.engine.state(), PlaybackState::Failed);
        assert_eq!(h.sink_log.lock().sources.len(), 1);
        assert_eq!(h.errors.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_attach_validates_source_and_session() {
        let mut h = harness(software_probe(), false);

        assert!(matches!(
            h.engine.attach("   ", AttachOptions::default()),
            Err(PlaybackError::EmptySource)
        ));

        h.engine
            .attach("/videos/v1/master.m3u8", AttachOptions::default())
            .unwrap();
        assert!(matches!(
            h.engine.attach("/videos/v2/master.m3u8", AttachOptions::default()),
            Err(PlaybackError::SessionActive { .. })
        ));
    }

    #[tokio::test]
    async fn test_detach_is_idempotent_and_silences_events() {
        let mut h = harness(software_probe(), false);

        h.engine
            .attach("/videos/v1/master.m3u8", AttachOptions::default())
            .unwrap();
        h.engine.handle_event(PlayerEvent::ManifestParsed).await;

        h.engine.detach();
        h.engine.detach();

        assert_eq!(h.engine.state(), PlaybackState::Idle);
        assert_eq!(h.player_log.lock().destroys, 1);
        assert_eq!(h.sink_log.lock().clears, 2);

        // Late events from a destroyed player must not resurrect the session.
        h.engine.handle_event(network_fault()).await;
        h.engine.handle_event(PlayerEvent::Started).await;
        assert_eq!(h.engine.state(), PlaybackState::Idle);
        assert!(h.errors.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_detach_then_reattach_starts_fresh_session() {
        let mut h = harness(software_probe(), false);

        h.engine
            .attach("/videos/v1/master.m3u8", AttachOptions::default())
            .unwrap();
        h.engine.handle_event(network_fault()).await;
        h.engine.detach();

        // New session gets a fresh retry budget and a fresh player.
        h.engine
            .attach("/videos/v2/master.m3u8", AttachOptions::default())
            .unwrap();
        h.engine.handle_event(network_fault()).await;

        assert_eq!(h.engine.state(), PlaybackState::Loading);
        assert_eq!(h.player_log.lock().created, 2);
    }
}
