//! Asynchronous readiness polling for freshly uploaded videos.
//!
//! The transcoder is an out-of-process service with no push channel, so the
//! only way to learn that an upload finished processing is to poll its
//! status endpoint. A [`ReadinessPoller`] owns at most one polling session
//! at a time: an immediate first query, then a fixed interval, until the
//! status turns terminal, a hard wall-clock deadline passes, or the caller
//! cancels. Settlement is delivered exactly once through a callback; the
//! poller never raises an error to its caller.

pub mod status;

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::Instant;

pub use status::{HttpStatusProvider, StatusError, StatusProvider};

use crate::asset::{CourseId, ProcessingStatus, VideoId};
use crate::config::PollingConfig;

/// How one polling session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadinessOutcome {
    /// Transcoding finished; the asset's playlist URL is now available.
    Ready,
    /// The transcoder reported a permanent failure for this asset.
    Failed,
    /// The deadline passed without a terminal status. Not an error: the
    /// caller re-syncs by refetching the asset list and moves on.
    TimedOut {
        /// Status seen on the last query that completed, if any did.
        last_observed: Option<ProcessingStatus>,
    },
}

/// Settlement notification delivered once per polling session.
#[derive(Debug, Clone, PartialEq)]
pub struct SettledPoll {
    pub video_id: VideoId,
    pub course_id: CourseId,
    pub outcome: ReadinessOutcome,
    /// Number of status queries issued before settling.
    pub attempts_made: u32,
}

/// One live polling session: the spawned timer task and its identity.
struct PollingSession {
    video_id: VideoId,
    task: JoinHandle<()>,
}

/// Polls the transcoding status endpoint until an asset settles.
///
/// Owns at most one [`PollingSession`]; starting a new session cancels the
/// previous one, so no two timers ever poll from the same poller
/// concurrently. Queries within a session are strictly sequential: the next
/// query is not issued until the previous one's result has been processed.
pub struct ReadinessPoller {
    provider: Arc<dyn StatusProvider>,
    config: PollingConfig,
    session: Option<PollingSession>,
}

impl ReadinessPoller {
    /// Creates a poller over the given status provider.
    pub fn new(provider: Arc<dyn StatusProvider>, config: PollingConfig) -> Self {
        Self {
            provider,
            config,
            session: None,
        }
    }

    /// Begins polling readiness for `video_id`.
    ///
    /// Any session already running on this poller is cancelled first. The
    /// `on_settled` callback fires exactly once, on the polling task, with
    /// the terminal outcome; transient query failures are swallowed and
    /// never reach the callback.
    pub fn start(
        &mut self,
        video_id: VideoId,
        course_id: CourseId,
        on_settled: impl FnOnce(SettledPoll) + Send + 'static,
    ) {
        self.cancel();

        let provider = Arc::clone(&self.provider);
        let interval = self.config.interval;
        let deadline = self.config.deadline;
        let task_video_id = video_id.clone();

        let task = tokio::spawn(async move {
            let started = Instant::now();
            let mut attempts = 0u32;
            let mut last_observed = None;

            let outcome = loop {
                attempts += 1;
                match provider.video_status(&task_video_id).await {
                    Ok(ProcessingStatus::Ready) => break ReadinessOutcome::Ready,
                    Ok(ProcessingStatus::Failed) => break ReadinessOutcome::Failed,
                    Ok(status) => {
                        tracing::trace!(video_id = %task_video_id, %status, attempts, "video not ready yet");
                        last_observed = Some(status);
                    }
                    Err(error) => {
                        // Best-effort status channel: isolated query failures
                        // must not end the session before its deadline.
                        tracing::debug!(video_id = %task_video_id, %error, "transient status query failure, polling continues");
                    }
                }

                if started.elapsed() >= deadline {
                    break ReadinessOutcome::TimedOut { last_observed };
                }

                tokio::time::sleep(interval).await;

                if started.elapsed() >= deadline {
                    break ReadinessOutcome::TimedOut { last_observed };
                }
            };

            match &outcome {
                ReadinessOutcome::Ready => {
                    tracing::info!(video_id = %task_video_id, attempts, "video ready");
                }
                ReadinessOutcome::Failed => {
                    tracing::warn!(video_id = %task_video_id, attempts, "transcoding failed");
                }
                ReadinessOutcome::TimedOut { .. } => {
                    tracing::warn!(video_id = %task_video_id, attempts, "readiness polling gave up, caller should re-sync");
                }
            }

            on_settled(SettledPoll {
                video_id: task_video_id,
                course_id,
                outcome,
                attempts_made: attempts,
            });
        });

        self.session = Some(PollingSession { video_id, task });
    }

    /// Stops the active session and releases its timer.
    ///
    /// Idempotent: calling this with no active session is a no-op. After
    /// cancellation the settle callback of the cancelled session never
    /// fires.
    pub fn cancel(&mut self) {
        if let Some(session) = self.session.take() {
            session.task.abort();
            tracing::debug!(video_id = %session.video_id, "polling session cancelled");
        }
    }

    /// Returns whether a polling session is currently running.
    pub fn is_active(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| !session.task.is_finished())
    }
}

impl Drop for ReadinessPoller {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::test_support::ScriptedStatusProvider;

    fn test_config() -> PollingConfig {
        PollingConfig {
            interval: std::time::Duration::from_millis(5000),
            deadline: std::time::Duration::from_millis(300_000),
        }
    }

    fn settle_recorder() -> (Arc<Mutex<Vec<SettledPoll>>>, impl FnOnce(SettledPoll) + Send) {
        let settled = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&settled);
        (settled, move |poll| sink.lock().push(poll))
    }

    #[tokio::test(start_paused = true)]
    async fn test_settles_on_ready_without_extra_query() {
        let provider = Arc::new(ScriptedStatusProvider::new(vec![
            Ok(ProcessingStatus::Processing),
            Ok(ProcessingStatus::Processing),
            Ok(ProcessingStatus::Processing),
            Ok(ProcessingStatus::Ready),
        ]));
        let mut poller = ReadinessPoller::new(provider.clone(), test_config());
        let (settled, on_settled) = settle_recorder();

        poller.start(VideoId::new("v1"), CourseId::new("c1"), on_settled);

        // Three processing ticks plus the ready tick, then nothing more.
        tokio::time::sleep(std::time::Duration::from_millis(16_000)).await;
        assert_eq!(provider.queries_issued(), 4);

        tokio::time::sleep(std::time::Duration::from_millis(30_000)).await;
        assert_eq!(provider.queries_issued(), 4);

        let settled = settled.lock();
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].outcome, ReadinessOutcome::Ready);
        assert_eq!(settled[0].attempts_made, 4);
        assert_eq!(settled[0].course_id, CourseId::new("c1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_do_not_stop_polling() {
        let provider = Arc::new(ScriptedStatusProvider::new(vec![
            Err(()),
            Ok(ProcessingStatus::Processing),
            Err(()),
            Ok(ProcessingStatus::Ready),
        ]));
        let mut poller = ReadinessPoller::new(provider.clone(), test_config());
        let (settled, on_settled) = settle_recorder();

        poller.start(VideoId::new("v1"), CourseId::new("c1"), on_settled);
        tokio::time::sleep(std::time::Duration::from_millis(20_000)).await;

        let settled = settled.lock();
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].outcome, ReadinessOutcome::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_at_deadline() {
        let provider = Arc::new(ScriptedStatusProvider::new(vec![Ok(
            ProcessingStatus::Processing,
        )]));
        let mut poller = ReadinessPoller::new(provider.clone(), test_config());
        let (settled, on_settled) = settle_recorder();

        poller.start(VideoId::new("v1"), CourseId::new("c1"), on_settled);

        // Run past deadline + interval; the session must have settled and
        // stopped issuing queries by then.
        tokio::time::sleep(std::time::Duration::from_millis(305_001)).await;
        let queries_at_settle = provider.queries_issued();

        let outcomes: Vec<_> = settled.lock().iter().cloned().collect();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(
            outcomes[0].outcome,
            ReadinessOutcome::TimedOut {
                last_observed: Some(ProcessingStatus::Processing),
            }
        );

        tokio::time::sleep(std::time::Duration::from_millis(60_000)).await;
        assert_eq!(provider.queries_issued(), queries_at_settle);
        assert!(!poller.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_status_is_terminal() {
        let provider = Arc::new(ScriptedStatusProvider::new(vec![
            Ok(ProcessingStatus::Processing),
            Ok(ProcessingStatus::Failed),
        ]));
        let mut poller = ReadinessPoller::new(provider.clone(), test_config());
        let (settled, on_settled) = settle_recorder();

        poller.start(VideoId::new("v1"), CourseId::new("c1"), on_settled);
        tokio::time::sleep(std::time::Duration::from_millis(10_000)).await;

        let settled = settled.lock();
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].outcome, ReadinessOutcome::Failed);
        assert_eq!(provider.queries_issued(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_queries_and_settlement() {
        let provider = Arc::new(ScriptedStatusProvider::new(vec![Ok(
            ProcessingStatus::Processing,
        )]));
        let mut poller = ReadinessPoller::new(provider.clone(), test_config());
        let (settled, on_settled) = settle_recorder();

        poller.start(VideoId::new("v1"), CourseId::new("c1"), on_settled);
        tokio::time::sleep(std::time::Duration::from_millis(12_000)).await;
        assert_eq!(provider.queries_issued(), 3);

        poller.cancel();
        // Idempotent from the stopped state.
        poller.cancel();

        tokio::time::sleep(std::time::Duration::from_millis(400_000)).await;
        assert_eq!(provider.queries_issued(), 3);
        assert!(settled.lock().is_empty());
        assert!(!poller.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_previous_session() {
        let provider = Arc::new(ScriptedStatusProvider::new(vec![Ok(
            ProcessingStatus::Processing,
        )]));
        let mut poller = ReadinessPoller::new(provider.clone(), test_config());
        let (settled_first, on_settled_first) = settle_recorder();
        let (settled_second, on_settled_second) = settle_recorder();

        poller.start(VideoId::new("v1"), CourseId::new("c1"), on_settled_first);
        tokio::time::sleep(std::time::Duration::from_millis(7_000)).await;

        poller.start(VideoId::new("v2"), CourseId::new("c1"), on_settled_second);
        tokio::time::sleep(std::time::Duration::from_millis(301_000)).await;

        // Only the replacement session ever settles.
        assert!(settled_first.lock().is_empty());
        let second = settled_second.lock();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].video_id, VideoId::new("v2"));
    }
}
