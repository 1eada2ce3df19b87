//! Logging initialization for applications embedding Vodflow.
//!
//! Playback faults are bursty and often only make sense in hindsight, so
//! hosts get two outputs: a console layer at whatever level they choose,
//! and an always-on trace-level file that captures the full poller and
//! engine activity of the last run for after-the-fact diagnosis.

use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Name of the rolling single-run debug log inside the logs directory.
const DEBUG_LOG_NAME: &str = "vodflow-last-run.log";

/// Installs the global subscriber: console at `console_level` (or the
/// `RUST_LOG` environment filter when set), plus a trace-level file in
/// `logs_dir` (default `./logs`). Each run overwrites the previous file.
///
/// Returns the path of the debug log so hosts can surface it to users.
/// Call once per process; a second call fails when the global subscriber
/// is already set.
///
/// # Errors
///
/// - `Box<dyn std::error::Error>` - Logs directory or file could not be
///   created, or a global subscriber was already installed
pub fn init_tracing(
    console_level: Level,
    logs_dir: Option<&Path>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let logs_dir = logs_dir.unwrap_or_else(|| Path::new("logs"));
    create_dir_all(logs_dir)?;
    let debug_log_path = logs_dir.join(DEBUG_LOG_NAME);

    // Everything lands in the file, regardless of console verbosity.
    let file_layer = fmt::layer()
        .with_writer(File::create(&debug_log_path)?)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_filter(EnvFilter::new("trace"));

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(console_level.to_string()));
    let console_layer = fmt::layer()
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    tracing::info!(
        console = %console_level,
        debug_log = %debug_log_path.display(),
        "tracing initialized"
    );

    Ok(debug_log_path)
}
