//! Reference owner of canonical playback state
//!
//! `PlayerStore` is the "caller" side of a session: it holds the playlist,
//! current index, playing flag, mode and speed, applies the intents a
//! session emits, and hands out [`SessionInputs`] borrowed from itself.

use crate::events::SessionIntent;
use crate::types::{PlayMode, Playlist, SessionInputs, Track};
use rand::seq::SliceRandom;
use rand::thread_rng;
use tracing::{debug, warn};

/// Canonical playback state owned outside the session
#[derive(Debug, Clone)]
pub struct PlayerStore {
    playlist: Playlist,
    /// Playlist in its original order (restored when leaving random mode)
    sequence: Vec<Track>,
    current_index: Option<usize>,
    playing: bool,
    full_screen: bool,
    mode: PlayMode,
    speed: f32,
    last_error: Option<String>,
}

impl PlayerStore {
    pub fn new(mode: PlayMode, speed: f32) -> Self {
        Self {
            playlist: Playlist::default(),
            sequence: Vec::new(),
            current_index: None,
            playing: false,
            full_screen: false,
            mode,
            speed,
            last_error: None,
        }
    }

    /// Replace the playlist and start playing at `start_index`
    ///
    /// In random mode the new list is shuffled with the starting track kept
    /// current.
    pub fn load_playlist(&mut self, tracks: Vec<Track>, start_index: usize) {
        if tracks.is_empty() {
            self.clear();
            return;
        }
        let start_index = start_index.min(tracks.len() - 1);
        let start_id = tracks[start_index].id.clone();

        self.sequence.clone_from(&tracks);
        self.playlist = Playlist::new(tracks);
        self.current_index = Some(start_index);
        if self.mode == PlayMode::Random {
            self.shuffle_keeping(&start_id);
        }
        self.playing = true;
        debug!(
            "Loaded playlist of {} tracks, starting at {}",
            self.playlist.len(),
            start_index
        );
    }

    /// Inputs for the session, borrowed from this store
    pub fn inputs(&self) -> SessionInputs<'_> {
        let current_index = self.current_index.unwrap_or(0);
        SessionInputs {
            playlist: &self.playlist,
            current_track: self.current_track(),
            current_index,
            playing: self.playing,
            mode: self.mode,
            speed: self.speed,
        }
    }

    /// Apply one intent emitted by the session
    pub fn apply(&mut self, intent: SessionIntent) {
        match intent {
            SessionIntent::Playing(playing) => self.playing = playing,
            SessionIntent::FullScreen(full_screen) => self.full_screen = full_screen,
            SessionIntent::ChangeMode => self.change_mode(),
            SessionIntent::SelectTrack { track, index } => self.select(&track, index),
            SessionIntent::DeleteTrack { track, index } => self.delete(&track, index),
            SessionIntent::ClearPlaylist => self.clear(),
            SessionIntent::Speed(speed) => self.speed = speed,
            SessionIntent::Error { message } => self.last_error = Some(message),
        }
    }

    fn select(&mut self, track: &Track, index: usize) {
        let index = match self.playlist.get(index) {
            Some(t) if t.id == track.id => Some(index),
            _ => self.playlist.position(&track.id),
        };
        match index {
            Some(index) => self.current_index = Some(index),
            None => warn!("Selected track {} is not in the playlist", track.id),
        }
    }

    fn delete(&mut self, track: &Track, index: usize) {
        let index = match self.playlist.get(index) {
            Some(t) if t.id == track.id => index,
            _ => match self.playlist.position(&track.id) {
                Some(index) => index,
                None => return,
            },
        };

        self.playlist.remove(index);
        if let Some(pos) = self.sequence.iter().position(|t| t.id == track.id) {
            self.sequence.remove(pos);
        }

        if self.playlist.is_empty() {
            self.clear();
            return;
        }

        // Keep pointing at the same track, or at its successor when the
        // current track itself was removed
        if let Some(current) = self.current_index {
            let len = self.playlist.len();
            self.current_index = Some(if index < current {
                current - 1
            } else if current >= len {
                0
            } else {
                current
            });
        }
    }

    fn clear(&mut self) {
        self.playlist = Playlist::default();
        self.sequence.clear();
        self.current_index = None;
        self.playing = false;
    }

    /// Cycle sequence -> loop -> random -> sequence
    ///
    /// Entering random shuffles the list in place; leaving it restores the
    /// original order. The current track stays current either way.
    fn change_mode(&mut self) {
        let next = self.mode.cycle();
        let current_id = self.current_track().map(|t| t.id.clone());

        match (self.mode, next) {
            (_, PlayMode::Random) => {
                if let Some(id) = &current_id {
                    self.shuffle_keeping(id);
                }
            }
            (PlayMode::Random, _) => {
                self.playlist.tracks_mut().clone_from(&self.sequence);
                if let Some(id) = &current_id {
                    self.current_index = self.playlist.position(id);
                }
            }
            _ => {}
        }

        debug!("Play mode {} -> {}", self.mode, next);
        self.mode = next;
    }

    fn shuffle_keeping(&mut self, current_id: &str) {
        let mut rng = thread_rng();
        self.playlist.tracks_mut().shuffle(&mut rng);
        self.current_index = self.playlist.position(current_id);
    }

    // ===== Accessors =====

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current_index.and_then(|i| self.playlist.get(i))
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_full_screen(&self) -> bool {
        self.full_screen
    }

    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

impl Default for PlayerStore {
    fn default() -> Self {
        Self::new(PlayMode::default(), 1.0)
    }
}
