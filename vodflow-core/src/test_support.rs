//! Mock implementations for testing the poller and playback engine.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::asset::{ProcessingStatus, VideoId};
use crate::playback::{AdaptivePlayer, AutoplayRejected, MediaSink, PlayerFactory};
use crate::poller::{StatusError, StatusProvider};

/// Recorded interactions with a [`MockPlayer`] and its factory.
#[derive(Debug, Default)]
pub struct PlayerLog {
    /// Sources passed to `start_load`, in order.
    pub loads: Vec<String>,
    pub stops: u32,
    pub decoder_resets: u32,
    pub destroys: u32,
    /// Instances created by the factory.
    pub created: u32,
}

/// Software player double that records every call into a shared log.
pub struct MockPlayer {
    log: Arc<Mutex<PlayerLog>>,
}

impl AdaptivePlayer for MockPlayer {
    fn start_load(&mut self, source: &str) {
        self.log.lock().loads.push(source.to_string());
    }

    fn stop_load(&mut self) {
        self.log.lock().stops += 1;
    }

    fn reset_decoder(&mut self) {
        self.log.lock().decoder_resets += 1;
    }

    fn destroy(&mut self) {
        self.log.lock().destroys += 1;
    }
}

/// Factory handing out [`MockPlayer`]s that share one log.
pub struct MockPlayerFactory {
    log: Arc<Mutex<PlayerLog>>,
}

impl MockPlayerFactory {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(PlayerLog::default())),
        }
    }

    /// Shared call log, for assertions.
    pub fn log(&self) -> Arc<Mutex<PlayerLog>> {
        Arc::clone(&self.log)
    }
}

impl Default for MockPlayerFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerFactory for MockPlayerFactory {
    fn create(&self) -> Box<dyn AdaptivePlayer> {
        self.log.lock().created += 1;
        Box::new(MockPlayer {
            log: Arc::clone(&self.log),
        })
    }
}

/// Recorded interactions with a [`MockSink`].
#[derive(Debug, Default)]
pub struct SinkLog {
    /// Sources assigned for native decoding, in order.
    pub sources: Vec<String>,
    pub clears: u32,
    pub play_calls: u32,
    pub pause_calls: u32,
}

/// Media sink double. Optionally rejects every play attempt, mimicking a
/// platform autoplay policy.
pub struct MockSink {
    log: Arc<Mutex<SinkLog>>,
    reject_play: bool,
}

impl MockSink {
    /// Creates a sink that accepts play attempts.
    pub fn new() -> (Self, Arc<Mutex<SinkLog>>) {
        let log = Arc::new(Mutex::new(SinkLog::default()));
        (
            Self {
                log: Arc::clone(&log),
                reject_play: false,
            },
            log,
        )
    }

    /// Creates a sink whose platform policy rejects every play attempt.
    pub fn new_rejecting_autoplay() -> (Self, Arc<Mutex<SinkLog>>) {
        let log = Arc::new(Mutex::new(SinkLog::default()));
        (
            Self {
                log: Arc::clone(&log),
                reject_play: true,
            },
            log,
        )
    }
}

#[async_trait]
impl MediaSink for MockSink {
    fn set_source(&mut self, source: &str) {
        self.log.lock().sources.push(source.to_string());
    }

    fn clear_source(&mut self) {
        self.log.lock().clears += 1;
    }

    async fn play(&mut self) -> Result<(), AutoplayRejected> {
        self.log.lock().play_calls += 1;
        if self.reject_play {
            return Err(AutoplayRejected {
                reason: "user gesture required".to_string(),
            });
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.log.lock().pause_calls += 1;
    }
}

/// Status provider replaying a fixed script, then repeating its last entry.
///
/// `Err(())` entries become transient HTTP 503 failures, which the polling
/// loop is expected to swallow.
pub struct ScriptedStatusProvider {
    script: Mutex<Vec<Result<ProcessingStatus, ()>>>,
    queries: AtomicU32,
}

impl ScriptedStatusProvider {
    pub fn new(script: Vec<Result<ProcessingStatus, ()>>) -> Self {
        assert!(!script.is_empty(), "script needs at least one entry");
        Self {
            script: Mutex::new(script),
            queries: AtomicU32::new(0),
        }
    }

    /// Total queries issued so far.
    pub fn queries_issued(&self) -> u32 {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusProvider for ScriptedStatusProvider {
    async fn video_status(&self, video_id: &VideoId) -> Result<ProcessingStatus, StatusError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock();
        let next = if script.len() > 1 {
            script.remove(0)
        } else {
            script[0]
        };
        next.map_err(|()| StatusError::UnexpectedHttpStatus {
            video_id: video_id.clone(),
            code: 503,
        })
    }
}
