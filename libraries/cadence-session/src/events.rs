//! Session events
//!
//! Two directions of traffic cross the session boundary:
//! - Device signals flow in, tagged with the epoch of the source that produced them
//! - Intents flow out, asking the caller to change state it owns

use crate::types::Track;
use serde::{Deserialize, Serialize};

/// Load generation counter
///
/// Incremented on every track load. A signal carrying any other epoch than
/// the current one belongs to a replaced source and is dropped.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Epoch(u64);

impl Epoch {
    /// Epoch before anything was loaded
    pub const INITIAL: Epoch = Epoch(0);

    #[must_use]
    pub fn next(self) -> Self {
        Epoch(self.0 + 1)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Epoch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Signals emitted by the audio device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeviceSignal {
    /// Playback position advanced
    Progress {
        /// Current position in seconds
        position_secs: f64,
    },

    /// Track finished playing on its own
    Ended,

    /// Device cannot play the loaded resource
    Error {
        /// Device-specific description
        reason: String,
    },
}

/// Device signal bound to the load that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedSignal {
    pub epoch: Epoch,
    pub signal: DeviceSignal,
}

impl TaggedSignal {
    pub fn new(epoch: Epoch, signal: DeviceSignal) -> Self {
        Self { epoch, signal }
    }

    pub fn progress(epoch: Epoch, position_secs: f64) -> Self {
        Self::new(epoch, DeviceSignal::Progress { position_secs })
    }

    pub fn ended(epoch: Epoch) -> Self {
        Self::new(epoch, DeviceSignal::Ended)
    }

    pub fn error(epoch: Epoch, reason: impl Into<String>) -> Self {
        Self::new(
            epoch,
            DeviceSignal::Error {
                reason: reason.into(),
            },
        )
    }
}

/// Requests emitted to the owner of canonical playback state
///
/// The session never changes these values itself. The owner applies them
/// and feeds the result back through the next set of inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionIntent {
    /// Playback should be running (or not)
    Playing(bool),

    /// Expanded player should be shown (or not)
    FullScreen(bool),

    /// Advance to the next play mode
    ChangeMode,

    /// Make this track current
    SelectTrack { track: Track, index: usize },

    /// Remove this track from the playlist
    DeleteTrack { track: Track, index: usize },

    /// Empty the playlist
    ClearPlaylist,

    /// Persist a new playback rate
    Speed(f32),

    /// Show a non-fatal error notification
    Error { message: String },
}
