//! Transcoding status queries.
//!
//! The polling loop talks to the backend through the [`StatusProvider`]
//! trait so tests can script status sequences without a network. The
//! production implementation is a thin reqwest client over
//! `GET /videos/{video_id}/status`.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::asset::{ProcessingStatus, VideoId};
use crate::config::NetworkConfig;

/// Errors that can occur while querying the status endpoint.
///
/// All of these are transient from the polling loop's perspective: the
/// loop logs them and keeps going until its deadline. The variants exist
/// so the log line says what actually went wrong.
#[derive(Debug, Error)]
pub enum StatusError {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("status request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a non-success HTTP status.
    #[error("status endpoint returned HTTP {code} for video {video_id}")]
    UnexpectedHttpStatus { video_id: VideoId, code: u16 },

    /// The response body was not the expected JSON shape.
    #[error("malformed status payload for video {video_id}: {reason}")]
    MalformedPayload { video_id: VideoId, reason: String },
}

/// Queries the processing status of one video.
#[async_trait]
pub trait StatusProvider: Send + Sync {
    /// Returns the current transcoding status for `video_id`.
    ///
    /// # Errors
    ///
    /// - `StatusError::Transport` - Request could not be completed
    /// - `StatusError::UnexpectedHttpStatus` - Endpoint answered non-2xx
    /// - `StatusError::MalformedPayload` - Body did not decode
    async fn video_status(&self, video_id: &VideoId) -> Result<ProcessingStatus, StatusError>;
}

/// Wire shape of the status endpoint response.
#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: ProcessingStatus,
}

/// Production status provider backed by the backend REST API.
pub struct HttpStatusProvider {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpStatusProvider {
    /// Creates a provider rooted at the backend API base URL.
    ///
    /// # Errors
    ///
    /// Returns `StatusError::Transport` if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(base_url: Url, network: &NetworkConfig) -> Result<Self, StatusError> {
        let client = reqwest::Client::builder()
            .timeout(network.request_timeout)
            .user_agent(network.user_agent)
            .build()?;

        Ok(Self { client, base_url })
    }

    fn status_url(&self, video_id: &VideoId) -> Result<Url, StatusError> {
        self.base_url
            .join(&format!("videos/{}/status", video_id.as_str()))
            .map_err(|e| StatusError::MalformedPayload {
                video_id: video_id.clone(),
                reason: format!("could not build status URL: {e}"),
            })
    }
}

#[async_trait]
impl StatusProvider for HttpStatusProvider {
    async fn video_status(&self, video_id: &VideoId) -> Result<ProcessingStatus, StatusError> {
        let url = self.status_url(video_id)?;
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(StatusError::UnexpectedHttpStatus {
                video_id: video_id.clone(),
                code: response.status().as_u16(),
            });
        }

        let payload: StatusResponse =
            response
                .json()
                .await
                .map_err(|e| StatusError::MalformedPayload {
                    video_id: video_id.clone(),
                    reason: e.to_string(),
                })?;

        Ok(payload.status)
    }
}
