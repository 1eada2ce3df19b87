//! Integration tests for Vodflow
//!
//! These tests exercise the public API of the core crate end to end: the
//! readiness polling lifecycle against scripted status sequences, and the
//! playback engine state machine against mock sinks and players, all under
//! tokio's paused clock so timing assertions are exact.

#[path = "integration/polling.rs"]
mod polling;

#[path = "integration/playback.rs"]
mod playback;

#[path = "integration/pipeline.rs"]
mod pipeline;
