//! End-of-track policies
//!
//! What happens when a track finishes on its own is looked up by play mode.
//! Only repeat-one is special by default; every other mode advances like a
//! skip. Callers can register their own behaviour for any mode.

use crate::types::PlayMode;
use std::collections::HashMap;

/// Decision taken when a track ends naturally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndAction {
    /// Reload and play the same track
    Replay,

    /// Behave like skip-to-next
    Advance,

    /// Ask the caller to stop playback
    Stop,
}

/// Where the finished track sits in the playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuePosition {
    pub index: usize,
    pub len: usize,
}

impl QueuePosition {
    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.len
    }
}

/// Behaviour for one play mode
pub trait EndOfTrackPolicy: Send + Sync {
    fn on_track_end(&self, position: QueuePosition) -> EndAction;
}

impl<F> EndOfTrackPolicy for F
where
    F: Fn(QueuePosition) -> EndAction + Send + Sync,
{
    fn on_track_end(&self, position: QueuePosition) -> EndAction {
        self(position)
    }
}

/// Replays the finished track
#[derive(Debug, Clone, Copy, Default)]
pub struct RepeatCurrent;

impl EndOfTrackPolicy for RepeatCurrent {
    fn on_track_end(&self, _position: QueuePosition) -> EndAction {
        EndAction::Replay
    }
}

/// Moves on to the next track
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvanceToNext;

impl EndOfTrackPolicy for AdvanceToNext {
    fn on_track_end(&self, _position: QueuePosition) -> EndAction {
        EndAction::Advance
    }
}

/// Policy registry keyed by play mode
pub struct ModePolicies {
    policies: HashMap<PlayMode, Box<dyn EndOfTrackPolicy>>,
    fallback: Box<dyn EndOfTrackPolicy>,
}

impl ModePolicies {
    /// Registry where every mode advances
    pub fn advancing() -> Self {
        Self {
            policies: HashMap::new(),
            fallback: Box::new(AdvanceToNext),
        }
    }

    /// Install (or replace) the policy for `mode`
    pub fn register(&mut self, mode: PlayMode, policy: impl EndOfTrackPolicy + 'static) {
        self.policies.insert(mode, Box::new(policy));
    }

    /// Builder form of [`register`](Self::register)
    #[must_use]
    pub fn with(mut self, mode: PlayMode, policy: impl EndOfTrackPolicy + 'static) -> Self {
        self.register(mode, policy);
        self
    }

    pub fn decide(&self, mode: PlayMode, position: QueuePosition) -> EndAction {
        self.policies
            .get(&mode)
            .unwrap_or(&self.fallback)
            .on_track_end(position)
    }
}

impl Default for ModePolicies {
    fn default() -> Self {
        Self::advancing().with(PlayMode::Loop, RepeatCurrent)
    }
}

impl std::fmt::Debug for ModePolicies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModePolicies")
            .field("modes", &self.policies.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
