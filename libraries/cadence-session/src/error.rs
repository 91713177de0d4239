//! Error types for playback sessions

use thiserror::Error;

/// Session errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// Playlist has no tracks
    #[error("Playlist is empty")]
    EmptyPlaylist,

    /// Caller supplied an index outside the playlist
    #[error("Index {index} out of bounds for playlist of {len} tracks")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Track id could not be turned into a playable resource
    #[error("Failed to resolve track {track_id}: {reason}")]
    Resolution { track_id: String, reason: String },

    /// Audio device rejected a command
    #[error("Device error: {0}")]
    Device(String),

    /// Playback rate must be finite and positive
    #[error("Invalid playback speed: {0}")]
    InvalidSpeed(f32),

    /// Seek ratio was not a number
    #[error("Invalid seek ratio: {0}")]
    InvalidSeekRatio(f64),

    /// The session driver is no longer running
    #[error("Session closed")]
    Closed,
}

impl SessionError {
    /// Create a device error
    pub fn device(msg: impl Into<String>) -> Self {
        Self::Device(msg.into())
    }

    /// Create a resolution error
    pub fn resolution(track_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Resolution {
            track_id: track_id.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
