//! Vodflow Core - Video readiness polling and adaptive playback
//!
//! This crate provides the client-side core of a video delivery pipeline:
//! polling an out-of-process transcoder for asset readiness, and driving an
//! adaptive-streaming playback session with capability resolution, fault
//! classification, and bounded automatic recovery.

pub mod asset;
pub mod config;
pub mod playback;
pub mod poller;
pub mod tracing_setup;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

// Re-export main types for convenient access
pub use asset::{AssetError, CourseId, ProcessingStatus, VideoAsset, VideoId};
pub use config::VodflowConfig;
pub use playback::{PlaybackError, StreamingPlaybackEngine};
pub use poller::{ReadinessPoller, StatusError};

/// Core errors that can bubble up from any Vodflow subsystem.
///
/// High-level error types representing failures in core functionality.
#[derive(Debug, thiserror::Error)]
pub enum VodflowError {
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("Status error: {0}")]
    Status(#[from] StatusError),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },
}

impl VodflowError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            VodflowError::Asset(e) => match e {
                AssetError::NotReady { .. } => "Video is still processing".to_string(),
                AssetError::MissingPlaylist { .. } => "Video is not playable yet".to_string(),
            },
            VodflowError::Status(_) => "Could not check video status".to_string(),
            VodflowError::Playback(_) => "Playback unavailable".to_string(),
            VodflowError::Configuration { .. } => "Configuration error occurred".to_string(),
        }
    }

    /// Checks if this error is due to caller misuse rather than runtime
    /// conditions.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            VodflowError::Configuration { .. } | VodflowError::Playback(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, VodflowError>;
