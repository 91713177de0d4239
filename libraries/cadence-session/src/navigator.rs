//! Playlist navigation
//!
//! Pure index arithmetic over a playlist of `len` tracks. Callers must not
//! pass an empty playlist; doing so is reported as `EmptyPlaylist`.

use crate::error::{Result, SessionError};

/// Outcome of stepping through the playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Only one track: restart it instead of selecting itself
    Replay,

    /// Select the track at this index
    Select(usize),
}

fn check(len: usize, current: usize) -> Result<()> {
    if len == 0 {
        return Err(SessionError::EmptyPlaylist);
    }
    if current >= len {
        return Err(SessionError::IndexOutOfBounds {
            index: current,
            len,
        });
    }
    Ok(())
}

/// Index after `current`, wrapping to the start
pub fn next_index(len: usize, current: usize) -> Result<usize> {
    check(len, current)?;
    Ok((current + 1) % len)
}

/// Index before `current`, wrapping to the end
pub fn previous_index(len: usize, current: usize) -> Result<usize> {
    check(len, current)?;
    Ok((current + len - 1) % len)
}

/// Step forward, treating a single-track playlist as a replay
pub fn step_forward(len: usize, current: usize) -> Result<Step> {
    if len == 1 {
        check(len, current)?;
        return Ok(Step::Replay);
    }
    next_index(len, current).map(Step::Select)
}

/// Step backward, treating a single-track playlist as a replay
pub fn step_backward(len: usize, current: usize) -> Result<Step> {
    if len == 1 {
        check(len, current)?;
        return Ok(Step::Replay);
    }
    previous_index(len, current).map(Step::Select)
}
