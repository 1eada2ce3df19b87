//! Trait seams between the playback engine and the platform layer.
//!
//! The engine never touches a concrete player library or media element.
//! It drives a [`MediaSink`] (the decode/display surface it exclusively
//! owns) and, on the software path, one [`AdaptivePlayer`] created through
//! a [`PlayerFactory`]. Everything the platform layer reports back arrives
//! as a [`PlayerEvent`] fed into the engine by the embedding application.

use async_trait::async_trait;
use thiserror::Error;

use super::recovery::RawPlaybackFault;

/// The platform refused to start playback without a user gesture.
///
/// Not a playback fault: the session parks in ready state and waits for an
/// explicit user-initiated play.
#[derive(Debug, Error)]
#[error("autoplay rejected by platform policy: {reason}")]
pub struct AutoplayRejected {
    pub reason: String,
}

/// Media sink exclusively owned by one playback session.
///
/// On the native path the sink decodes the playlist itself; on the software
/// path the adaptive player feeds it. Either way, play/pause and source
/// assignment go through here.
#[async_trait]
pub trait MediaSink: Send {
    /// Assigns a playlist source for native decoding.
    ///
    /// The source is an absolute or origin-relative playlist URL; the sink
    /// resolves it against its own document origin.
    fn set_source(&mut self, source: &str);

    /// Removes any assigned source and drops buffered media.
    fn clear_source(&mut self);

    /// Attempts to start playback.
    ///
    /// # Errors
    ///
    /// - `AutoplayRejected` - Platform policy requires a user gesture
    async fn play(&mut self) -> Result<(), AutoplayRejected>;

    /// Pauses playback. Always permitted.
    fn pause(&mut self);
}

/// Software adaptive-streaming client driving the sink.
///
/// Load and recovery calls only initiate work; completion and failure are
/// reported asynchronously as [`PlayerEvent`]s. `destroy` must deregister
/// every listener synchronously: no event may be delivered for this
/// instance after it returns.
pub trait AdaptivePlayer: Send {
    /// Begins loading the manifest at `source` and attaches to the sink.
    fn start_load(&mut self, source: &str);

    /// Aborts any in-flight manifest/segment loading.
    fn stop_load(&mut self);

    /// Reinitializes the decode pipeline in place, keeping the parsed
    /// manifest and current position.
    fn reset_decoder(&mut self);

    /// Tears the instance down, synchronously deregistering all listeners.
    fn destroy(&mut self);
}

/// Creates the software player instance for a session.
///
/// One instance per session; the engine destroys it on teardown before any
/// replacement is created.
pub trait PlayerFactory: Send + Sync {
    fn create(&self) -> Box<dyn AdaptivePlayer>;
}

/// Event reported by the player library or the native sink, adapted to a
/// common shape by the embedding layer.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum PlayerEvent {
    /// Manifest/metadata parsed; the stream is playable.
    ManifestParsed,
    /// The sink started rendering (user gesture, autoplay, or resume).
    Started,
    /// The sink paused (user gesture or platform interruption).
    Paused,
    /// The player layer reported a fault.
    Fault(RawPlaybackFault),
}
