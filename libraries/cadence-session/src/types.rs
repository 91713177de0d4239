//! Core types for playback sessions

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Track information supplied by the catalogue
///
/// Carries everything the session needs to load and time a track.
/// Display fields are passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique track identifier, handed to the resource resolver
    pub id: String,

    /// Track title
    pub name: String,

    /// Performing artists
    #[serde(default)]
    pub artists: Vec<String>,

    /// Album name (optional)
    #[serde(default)]
    pub album: Option<String>,

    /// Track length in milliseconds (0 when unknown)
    #[serde(default)]
    pub length_ms: u64,
}

impl Track {
    /// Create a track with no artist or album
    pub fn new(id: impl Into<String>, name: impl Into<String>, length_ms: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            artists: Vec::new(),
            album: None,
            length_ms,
        }
    }

    /// Length in whole seconds, rounded down
    pub fn whole_seconds(&self) -> u64 {
        self.length_ms / 1000
    }

    /// Artists joined for display ("A/B")
    pub fn artist_line(&self) -> String {
        self.artists.join("/")
    }
}

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

fn next_revision() -> u64 {
    NEXT_REVISION.fetch_add(1, Ordering::Relaxed)
}

/// Ordered list of tracks with an identity
///
/// The revision stands in for reference identity: every freshly built
/// playlist gets a new one, clones share it, and in-place edits keep it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    #[serde(skip, default = "next_revision")]
    revision: u64,
    tracks: Vec<Track>,
}

impl Playlist {
    /// Create a playlist with a fresh identity
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            revision: next_revision(),
            tracks,
        }
    }

    /// Identity of this playlist value
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Edit tracks in place without changing identity
    pub fn tracks_mut(&mut self) -> &mut Vec<Track> {
        &mut self.tracks
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Position of the track with the given id
    pub fn position(&self, track_id: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == track_id)
    }

    /// Remove a track in place
    ///
    /// Returns the removed track if the index was valid
    pub fn remove(&mut self, index: usize) -> Option<Track> {
        if index < self.tracks.len() {
            Some(self.tracks.remove(index))
        } else {
            None
        }
    }
}

impl Default for Playlist {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Play mode
///
/// Only `Loop` changes end-of-track behaviour inside the session; the
/// other modes are interpreted by whoever owns the playlist order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayMode {
    /// Play the list in order, wrapping at the end
    #[default]
    Sequence,

    /// Repeat the current track
    Loop,

    /// Play a shuffled order of the list
    Random,
}

impl PlayMode {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequence => "sequence",
            Self::Loop => "loop",
            Self::Random => "random",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sequence" => Some(Self::Sequence),
            "loop" => Some(Self::Loop),
            "random" => Some(Self::Random),
            _ => None,
        }
    }

    /// Mode that follows this one when the user cycles modes
    #[must_use]
    pub fn cycle(self) -> Self {
        match self {
            Self::Sequence => Self::Loop,
            Self::Loop => Self::Random,
            Self::Random => Self::Sequence,
        }
    }

    pub fn is_repeat_one(self) -> bool {
        self == Self::Loop
    }
}

impl std::fmt::Display for PlayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for a playback session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Message attached to the error intent when a track fails to play
    pub error_message: String,

    /// Smallest duration ever reported, in seconds (default: 1.0)
    pub min_duration_secs: f64,

    /// Failures in a row skipped past before the next one stops playback
    /// (default: unlimited)
    pub max_consecutive_errors: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            error_message: "This track cannot be played, skipping to the next one".to_string(),
            min_duration_secs: 1.0,
            max_consecutive_errors: None,
        }
    }
}

/// Caller-owned state handed to the session on every call
///
/// The session keeps no authoritative copy of any of these values.
#[derive(Debug, Clone, Copy)]
pub struct SessionInputs<'a> {
    pub playlist: &'a Playlist,
    pub current_track: Option<&'a Track>,
    pub current_index: usize,
    pub playing: bool,
    pub mode: PlayMode,
    pub speed: f32,
}

impl<'a> SessionInputs<'a> {
    /// Inputs pointing at `index` of `playlist`, paused, sequence mode, normal speed
    pub fn at(playlist: &'a Playlist, index: usize) -> Self {
        Self {
            playlist,
            current_track: playlist.get(index),
            current_index: index,
            playing: false,
            mode: PlayMode::Sequence,
            speed: 1.0,
        }
    }

    #[must_use]
    pub fn playing(mut self, playing: bool) -> Self {
        self.playing = playing;
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: PlayMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }
}
