//! Readiness polling lifecycle under a virtual clock.
//!
//! Exercises the poller's termination guarantees with the reference
//! timing: a 5000 ms interval and a 300 000 ms deadline.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use vodflow_core::asset::{CourseId, ProcessingStatus, VideoId};
use vodflow_core::config::PollingConfig;
use vodflow_core::poller::{ReadinessOutcome, ReadinessPoller, SettledPoll};
use vodflow_core::test_support::ScriptedStatusProvider;

fn reference_config() -> PollingConfig {
    PollingConfig {
        interval: Duration::from_millis(5000),
        deadline: Duration::from_millis(300_000),
    }
}

fn recorder() -> (Arc<Mutex<Vec<SettledPoll>>>, impl FnOnce(SettledPoll) + Send) {
    let settled = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&settled);
    (settled, move |poll| sink.lock().push(poll))
}

/// The reference scenario: `processing, processing, processing, ready`
/// arriving at ticks 1-4 settles at tick 4 and never issues a fifth query.
#[tokio::test(start_paused = true)]
async fn poller_reference_tick_scenario() {
    let provider = Arc::new(ScriptedStatusProvider::new(vec![
        Ok(ProcessingStatus::Processing),
        Ok(ProcessingStatus::Processing),
        Ok(ProcessingStatus::Processing),
        Ok(ProcessingStatus::Ready),
    ]));
    let mut poller = ReadinessPoller::new(provider.clone(), reference_config());
    let (settled, on_settled) = recorder();

    poller.start(VideoId::new("upload-42"), CourseId::new("course-7"), on_settled);

    // Tick 4 lands 15 s after the immediate first query.
    tokio::time::sleep(Duration::from_millis(15_100)).await;
    {
        let settled = settled.lock();
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].outcome, ReadinessOutcome::Ready);
        assert_eq!(settled[0].attempts_made, 4);
        assert_eq!(settled[0].video_id, VideoId::new("upload-42"));
        assert_eq!(settled[0].course_id, CourseId::new("course-7"));
    }

    // No fifth query, ever.
    tokio::time::sleep(Duration::from_millis(300_000)).await;
    assert_eq!(provider.queries_issued(), 4);
    assert!(!poller.is_active());
}

/// For a status sequence that never reaches ready, settlement fires exactly
/// once, at or before `deadline + interval`, and the timer is released.
#[tokio::test(start_paused = true)]
async fn poller_terminates_at_deadline() {
    let provider = Arc::new(ScriptedStatusProvider::new(vec![Ok(
        ProcessingStatus::Uploading,
    )]));
    let mut poller = ReadinessPoller::new(provider.clone(), reference_config());
    let (settled, on_settled) = recorder();

    poller.start(VideoId::new("upload-42"), CourseId::new("course-7"), on_settled);

    tokio::time::sleep(Duration::from_millis(305_000)).await;
    {
        let settled = settled.lock();
        assert_eq!(settled.len(), 1);
        assert_eq!(
            settled[0].outcome,
            ReadinessOutcome::TimedOut {
                last_observed: Some(ProcessingStatus::Uploading),
            }
        );
    }

    // Timer released: no queries after settlement.
    let queries_at_settle = provider.queries_issued();
    tokio::time::sleep(Duration::from_millis(120_000)).await;
    assert_eq!(provider.queries_issued(), queries_at_settle);
    assert!(!poller.is_active());
}

/// A run of transient query failures spanning most of the session still
/// settles on the eventual ready status.
#[tokio::test(start_paused = true)]
async fn poller_outlasts_transient_failures() {
    let mut script: Vec<Result<ProcessingStatus, ()>> = vec![Err(()); 20];
    script.push(Ok(ProcessingStatus::Ready));

    let provider = Arc::new(ScriptedStatusProvider::new(script));
    let mut poller = ReadinessPoller::new(provider.clone(), reference_config());
    let (settled, on_settled) = recorder();

    poller.start(VideoId::new("upload-42"), CourseId::new("course-7"), on_settled);
    tokio::time::sleep(Duration::from_millis(105_000)).await;

    let settled = settled.lock();
    assert_eq!(settled.len(), 1);
    assert_eq!(settled[0].outcome, ReadinessOutcome::Ready);
    assert_eq!(settled[0].attempts_made, 21);
}

/// Cancellation mid-session releases the timer without settling, and is
/// idempotent after the session already ended on its own.
#[tokio::test(start_paused = true)]
async fn poller_cancel_lifecycle() {
    let provider = Arc::new(ScriptedStatusProvider::new(vec![Ok(
        ProcessingStatus::Processing,
    )]));
    let mut poller = ReadinessPoller::new(provider.clone(), reference_config());
    let (settled, on_settled) = recorder();

    poller.start(VideoId::new("upload-42"), CourseId::new("course-7"), on_settled);
    tokio::time::sleep(Duration::from_millis(8_000)).await;
    assert!(poller.is_active());

    poller.cancel();
    let queries_at_cancel = provider.queries_issued();

    tokio::time::sleep(Duration::from_millis(400_000)).await;
    assert_eq!(provider.queries_issued(), queries_at_cancel);
    assert!(settled.lock().is_empty());

    poller.cancel();
    assert!(!poller.is_active());
}
