//! Source capability resolution.
//!
//! Decides once, per runtime, how an adaptive stream gets played: through
//! the software demuxer/player library, through the sink's own native
//! decoder, or not at all. The engine consumes the resolved
//! [`PlaybackPath`] uniformly instead of feature-sniffing inline.

/// Playback mechanism resolved for the current runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPath {
    /// A software adaptive-streaming client drives the sink. Preferred:
    /// consistent cross-platform behavior and a granular fault taxonomy
    /// the recovery policy can act on.
    Software,
    /// The sink decodes the playlist format natively. Fault reports are
    /// coarse on this path: adapters surface every native error as
    /// other/fatal, so the engine never auto-retries them.
    Native,
    /// The runtime cannot play adaptive streams at all.
    Unsupported,
}

/// Reports what the current runtime can do with adaptive streams.
pub trait CapabilityProbe: Send + Sync {
    /// Whether a capable software adaptive-streaming client is available.
    fn software_engine_supported(&self) -> bool;

    /// Whether the media sink can natively decode the playlist format.
    fn native_playback_supported(&self) -> bool;
}

/// Resolves the playback path for a probe, in preference order:
/// software client, then native decoding, then unsupported.
pub fn resolve(probe: &dyn CapabilityProbe) -> PlaybackPath {
    if probe.software_engine_supported() {
        PlaybackPath::Software
    } else if probe.native_playback_supported() {
        PlaybackPath::Native
    } else {
        PlaybackPath::Unsupported
    }
}

/// Fixed capability answers, for composition roots that probe once at
/// startup and for tests.
#[derive(Debug, Clone, Copy)]
pub struct StaticProbe {
    pub software_engine: bool,
    pub native_playback: bool,
}

impl CapabilityProbe for StaticProbe {
    fn software_engine_supported(&self) -> bool {
        self.software_engine
    }

    fn native_playback_supported(&self) -> bool {
        self.native_playback
    }
}
