//! Centralized configuration for Vodflow.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::time::Duration;

/// Central configuration for all Vodflow components.
///
/// Groups related configuration settings into logical sections. Callers
/// construct the default and override individual fields as needed.
#[derive(Debug, Clone, Default)]
pub struct VodflowConfig {
    pub polling: PollingConfig,
    pub playback: PlaybackConfig,
    pub network: NetworkConfig,
}

/// Readiness polling behavior.
///
/// Controls how often the transcoding status endpoint is queried and how
/// long a session keeps trying before giving up.
#[derive(Debug, Clone)]
pub struct PollingConfig {
    /// Delay between consecutive status queries
    pub interval: Duration,
    /// Hard wall-clock ceiling for one polling session
    pub deadline: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(5000),
            deadline: Duration::from_millis(300_000), // 5 minutes
        }
    }
}

/// Playback engine recovery behavior.
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Delay before reissuing a load or resetting the decoder after a
    /// fatal recoverable fault
    pub recovery_backoff: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            recovery_backoff: Duration::from_millis(1000),
        }
    }
}

/// HTTP client configuration for the status endpoint.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Per-request timeout for status queries
    pub request_timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: &'static str,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            user_agent: "vodflow/0.1.0",
        }
    }
}
