//! Video asset data model shared by the readiness poller and playback engine.
//!
//! A `VideoAsset` is observed, never owned: it is created by the upload flow
//! and mutated only by the external transcoder. This module enforces the one
//! invariant the rest of the pipeline depends on: the playlist URL is never
//! read before the asset is ready.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Opaque identifier for a video asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Creates a video identifier from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier for the course an asset belongs to.
///
/// Carried through polling settlement so the caller knows which asset
/// collection to refresh; never interpreted by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId(String);

impl CourseId {
    /// Creates a course identifier from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CourseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transcoding lifecycle state reported by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    /// The original file is still being uploaded.
    Uploading,
    /// The external transcoder is working on the asset.
    Processing,
    /// Transcoding finished; the playlist URL is available.
    Ready,
    /// Transcoding failed permanently.
    Failed,
}

impl ProcessingStatus {
    /// Returns whether this status ends a polling session.
    ///
    /// `Ready` and `Failed` are terminal; `Uploading` and `Processing` mean
    /// the transcoder is still working and polling should continue.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingStatus::Ready | ProcessingStatus::Failed)
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProcessingStatus::Uploading => "uploading",
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Ready => "ready",
            ProcessingStatus::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Errors from asset invariant violations.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The playlist URL was requested before transcoding finished.
    #[error("playlist for video {video_id} requested while status is {status}")]
    NotReady {
        video_id: VideoId,
        status: ProcessingStatus,
    },

    /// The asset is marked ready but carries no playlist URL.
    ///
    /// Indicates a backend inconsistency; treated as not-ready by callers.
    #[error("video {video_id} is ready but has no playlist URL")]
    MissingPlaylist { video_id: VideoId },
}

/// One uploaded video as observed through the backend API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoAsset {
    /// Stable asset identity.
    pub video_id: VideoId,
    /// Last observed transcoding status.
    pub processing_status: ProcessingStatus,
    /// Adaptive streaming playlist URL, present only once transcoding
    /// finished. Access through [`VideoAsset::hls_url`].
    #[serde(default)]
    hls_url: Option<Url>,
    /// Media duration in seconds, known after transcoding.
    #[serde(default)]
    pub duration_seconds: Option<f64>,
}

impl VideoAsset {
    /// Creates an asset record as observed from the backend.
    pub fn new(
        video_id: VideoId,
        processing_status: ProcessingStatus,
        hls_url: Option<Url>,
        duration_seconds: Option<f64>,
    ) -> Self {
        Self {
            video_id,
            processing_status,
            hls_url,
            duration_seconds,
        }
    }

    /// Returns the playlist URL, enforcing the readiness invariant.
    ///
    /// # Errors
    ///
    /// - `AssetError::NotReady` - Status is not `Ready`
    /// - `AssetError::MissingPlaylist` - Ready asset without a URL
    pub fn hls_url(&self) -> Result<&Url, AssetError> {
        if self.processing_status != ProcessingStatus::Ready {
            return Err(AssetError::NotReady {
                video_id: self.video_id.clone(),
                status: self.processing_status,
            });
        }

        self.hls_url.as_ref().ok_or_else(|| AssetError::MissingPlaylist {
            video_id: self.video_id.clone(),
        })
    }
}
