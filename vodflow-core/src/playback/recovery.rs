//! Playback fault classification and recovery policy.
//!
//! Two pure decision tables: [`classify`] maps a raw fault report from the
//! player layer to a category, and [`recovery_action`] maps the classified
//! fault to the action the engine takes. This is the one piece of behavior
//! that must be reproduced exactly; everything here is side-effect free and
//! exhaustively tested.

/// Where the player layer says a fault originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Manifest or segment request failed at the network layer.
    NetworkLayer,
    /// Decode or buffer fault in the media pipeline.
    MediaLayer,
    /// Anything else the player reports (mux, key system, internal).
    OtherLayer,
}

/// Raw fault report as delivered by the player layer, before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPlaybackFault {
    /// Whether the player says playback cannot continue without
    /// intervention. Taken as reported, never inferred.
    pub fatal: bool,
    pub kind: FaultKind,
    /// Free-form detail string for logs and the terminal error callback.
    pub detail: String,
}

impl RawPlaybackFault {
    /// Creates a fault report from the software player layer.
    pub fn new(fatal: bool, kind: FaultKind, detail: impl Into<String>) -> Self {
        Self {
            fatal,
            kind,
            detail: detail.into(),
        }
    }

    /// Creates a fault report for a native decoder error.
    ///
    /// Native decoders expose no granular error taxonomy, so every native
    /// fault is other/fatal and is never auto-retried.
    pub fn native(detail: impl Into<String>) -> Self {
        Self {
            fatal: true,
            kind: FaultKind::OtherLayer,
            detail: detail.into(),
        }
    }
}

/// Classified fault category consumed by the recovery policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultCategory {
    Network,
    Media,
    Other,
}

impl std::fmt::Display for FaultCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FaultCategory::Network => "network",
            FaultCategory::Media => "media",
            FaultCategory::Other => "other",
        };
        write!(f, "{name}")
    }
}

/// A raw fault after classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedFault {
    pub fatal: bool,
    pub category: FaultCategory,
    pub detail: String,
}

impl std::fmt::Display for ClassifiedFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = if self.fatal { "fatal" } else { "non-fatal" };
        write!(f, "{severity} {} fault: {}", self.category, self.detail)
    }
}

/// What the engine does about a classified fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Lower layer already compensated; no transition.
    Noop,
    /// Reissue the load of the current source after a backoff.
    RetryLoad,
    /// Reinitialize the decode pipeline in place, keeping the manifest.
    ResetDecoder,
    /// Surface the fault; no automatic recovery is possible.
    GiveUp,
}

/// Maps a raw player fault to its category.
///
/// Network-layer faults classify as `Network`, decode/buffer faults as
/// `Media`, everything else as `Other`. Fatality passes through unchanged.
pub fn classify(raw: RawPlaybackFault) -> ClassifiedFault {
    let category = match raw.kind {
        FaultKind::NetworkLayer => FaultCategory::Network,
        FaultKind::MediaLayer => FaultCategory::Media,
        FaultKind::OtherLayer => FaultCategory::Other,
    };

    ClassifiedFault {
        fatal: raw.fatal,
        category,
        detail: raw.detail,
    }
}

/// The fixed recovery table.
///
/// | fatal | category | action       |
/// |-------|----------|--------------|
/// | no    | any      | Noop         |
/// | yes   | Network  | RetryLoad    |
/// | yes   | Media    | ResetDecoder |
/// | yes   | Other    | GiveUp       |
pub fn recovery_action(fault: &ClassifiedFault) -> RecoveryAction {
    if !fault.fatal {
        return RecoveryAction::Noop;
    }

    match fault.category {
        FaultCategory::Network => RecoveryAction::RetryLoad,
        FaultCategory::Media => RecoveryAction::ResetDecoder,
        FaultCategory::Other => RecoveryAction::GiveUp,
    }
}
