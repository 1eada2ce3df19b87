//! End-to-end composition: poll an upload to readiness, then hand its
//! playlist URL to a fresh playback session. The two subsystems meet only
//! through the `VideoAsset` record.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use url::Url;
use vodflow_core::asset::{CourseId, ProcessingStatus, VideoAsset, VideoId};
use vodflow_core::config::{PlaybackConfig, PollingConfig};
use vodflow_core::playback::{
    AttachOptions, PlaybackState, PlayerEvent, StaticProbe, StreamingPlaybackEngine,
};
use vodflow_core::poller::{ReadinessOutcome, ReadinessPoller};
use vodflow_core::test_support::{MockPlayerFactory, MockSink, ScriptedStatusProvider};

#[tokio::test(start_paused = true)]
async fn upload_becomes_watchable() {
    // Transcoder reports processing twice, then ready.
    let provider = Arc::new(ScriptedStatusProvider::new(vec![
        Ok(ProcessingStatus::Processing),
        Ok(ProcessingStatus::Processing),
        Ok(ProcessingStatus::Ready),
    ]));
    let mut poller = ReadinessPoller::new(
        provider,
        PollingConfig {
            interval: Duration::from_millis(5000),
            deadline: Duration::from_millis(300_000),
        },
    );

    let (settled_tx, settled_rx) = oneshot::channel();
    poller.start(
        VideoId::new("upload-42"),
        CourseId::new("course-7"),
        move |poll| {
            let _ = settled_tx.send(poll);
        },
    );

    let settled = settled_rx.await.unwrap();
    assert_eq!(settled.outcome, ReadinessOutcome::Ready);

    // The caller re-syncs its asset list; the refreshed record now carries
    // the playlist URL.
    let asset = VideoAsset::new(
        settled.video_id,
        ProcessingStatus::Ready,
        Some(Url::parse("https://cdn.example.com/upload-42/master.m3u8").unwrap()),
        Some(613.0),
    );
    let playlist = asset.hls_url().unwrap().to_string();

    // One viewing session over the fresh asset.
    let (sink, sink_log) = MockSink::new();
    let factory = MockPlayerFactory::new();
    let player_log = factory.log();
    let mut engine = StreamingPlaybackEngine::new(
        Box::new(sink),
        Box::new(factory),
        Box::new(StaticProbe {
            software_engine: true,
            native_playback: true,
        }),
        PlaybackConfig::default(),
    );

    engine
        .attach(&playlist, AttachOptions { autoplay: true })
        .unwrap();
    engine.handle_event(PlayerEvent::ManifestParsed).await;

    assert_eq!(engine.state(), PlaybackState::Playing);
    assert_eq!(player_log.lock().loads, vec![playlist]);
    assert_eq!(sink_log.lock().play_calls, 1);

    // Viewer navigates away: full teardown before anything else may attach.
    engine.detach();
    assert_eq!(engine.state(), PlaybackState::Idle);
    assert_eq!(player_log.lock().destroys, 1);
}

#[tokio::test(start_paused = true)]
async fn asset_invariant_blocks_premature_playback() {
    let asset = VideoAsset::new(
        VideoId::new("upload-42"),
        ProcessingStatus::Processing,
        None,
        None,
    );

    // The playlist is unreachable until the poller has seen ready.
    assert!(asset.hls_url().is_err());
}
