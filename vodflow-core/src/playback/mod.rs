//! Adaptive streaming playback.
//!
//! This module implements one playback session over an exclusively owned
//! media sink. The core abstractions are the capability-resolved
//! [`PlaybackPath`], the pure fault classification/recovery tables, and the
//! [`StreamingPlaybackEngine`] state machine that ties them to the
//! [`MediaSink`]/[`AdaptivePlayer`] trait seams.

pub mod capability;
pub mod engine;
pub mod player;
pub mod recovery;

// Capability resolution
pub use capability::{CapabilityProbe, PlaybackPath, StaticProbe, resolve};
// Session state machine
pub use engine::{AttachOptions, PlaybackError, PlaybackState, StreamingPlaybackEngine};
// Platform trait seams
pub use player::{AdaptivePlayer, AutoplayRejected, MediaSink, PlayerEvent, PlayerFactory};
// Fault taxonomy and recovery policy
pub use recovery::{
    ClassifiedFault, FaultCategory, FaultKind, RawPlaybackFault, RecoveryAction, classify,
    recovery_action,
};
