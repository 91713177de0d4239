//! Session driver
//!
//! Runs a [`PlaybackSession`] and its [`PlayerStore`] on one task. User
//! commands and device signals arrive on separate channels and are applied
//! one at a time; after each step intents are handed to the store and the
//! session is re-synced until both agree.

use crate::{
    error::{Result, SessionError},
    events::{SessionIntent, TaggedSignal},
    projection::PresentationState,
    session::PlaybackSession,
    store::PlayerStore,
    types::{PlayMode, Track},
};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Upper bound on session/store round trips per step
const MAX_RECONCILE_ROUNDS: usize = 8;

/// Capacity of the observer broadcast channel
const EVENT_CAPACITY: usize = 256;

/// Capacity of the command channel
const COMMAND_CAPACITY: usize = 32;

/// Sender half handed to audio devices
pub type SignalSender = mpsc::UnboundedSender<TaggedSignal>;

/// Receiver half consumed by the driver
pub type SignalReceiver = mpsc::UnboundedReceiver<TaggedSignal>;

/// Channel carrying device signals into the driver
pub fn signal_channel() -> (SignalSender, SignalReceiver) {
    mpsc::unbounded_channel()
}

/// Commands accepted by the driver
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Start or resume playback
    Play,

    /// Pause playback
    Pause,

    /// Toggle between playing and paused
    TogglePlay,

    /// Skip to next track
    Next,

    /// Go to previous track
    Previous,

    /// Seek to a fraction of the track (0.0 - 1.0)
    Seek(f64),

    /// Set playback rate
    SetSpeed(f32),

    /// Cycle play mode
    ChangeMode,

    /// Play the track at this playlist index
    Select(usize),

    /// Remove the track at this playlist index
    Delete(usize),

    /// Empty the playlist
    Clear,

    /// Show the playlist overlay
    ShowList,

    /// Hide the playlist overlay
    HideList,

    /// Enter or leave the expanded player
    FullScreen(bool),

    /// Replace the playlist and start at an index
    LoadPlaylist { tracks: Vec<Track>, start: usize },

    /// Stop the driver and release the device
    Shutdown,
}

/// Events broadcast to observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// The session emitted an intent (already applied to the store)
    Intent(SessionIntent),

    /// Presentation state after a step
    Snapshot {
        state: PresentationState,
        playing: bool,
        mode: PlayMode,
        speed: f32,
        current_index: Option<usize>,
    },

    /// Playlist in play order, sent when the list overlay opens
    Playlist {
        tracks: Vec<Track>,
        current_index: Option<usize>,
    },

    /// Driver stopped; no further events follow
    Stopped,
}

/// Cloneable handle for talking to a running driver
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    /// Send a command, waiting for queue space
    pub async fn send(&self, command: SessionCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }

    /// Subscribe to events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

/// Single event-processing context for one session
pub struct SessionDriver {
    session: PlaybackSession,
    store: PlayerStore,
    commands: mpsc::Receiver<SessionCommand>,
    signals: SignalReceiver,
    signal_tx: SignalSender,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionDriver {
    /// Create a driver and the handle used to control it
    ///
    /// `signal_tx` must be the sender paired with `signals`; it is used to
    /// re-inject failures the session raises against itself.
    pub fn new(
        session: PlaybackSession,
        store: PlayerStore,
        signals: SignalReceiver,
        signal_tx: SignalSender,
    ) -> (Self, SessionHandle) {
        let (command_tx, commands) = mpsc::channel(COMMAND_CAPACITY);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let handle = SessionHandle {
            commands: command_tx,
            events: events.clone(),
        };
        let driver = Self {
            session,
            store,
            commands,
            signals,
            signal_tx,
            events,
        };
        (driver, handle)
    }

    /// Process commands and signals until shutdown
    ///
    /// Returns the store so callers can inspect final state.
    pub async fn run(mut self) -> PlayerStore {
        info!("Session driver started");
        self.reconcile();

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(signal) = self.signals.recv() => self.handle_signal(signal),
            }
            self.reconcile();
        }

        self.session.close();
        let _ = self.events.send(SessionEvent::Stopped);
        info!("Session driver stopped");
        self.store
    }

    fn handle_command(&mut self, command: SessionCommand) {
        debug!("Command: {:?}", command);
        let inputs = self.store.inputs();

        let outcome = match command {
            SessionCommand::Play => {
                if !inputs.playing {
                    self.session.toggle_playing(&inputs);
                }
                Ok(())
            }
            SessionCommand::Pause => {
                if inputs.playing {
                    self.session.toggle_playing(&inputs);
                }
                Ok(())
            }
            SessionCommand::TogglePlay => {
                self.session.toggle_playing(&inputs);
                Ok(())
            }
            SessionCommand::Next => self.session.next(&inputs),
            SessionCommand::Previous => self.session.previous(&inputs),
            SessionCommand::Seek(ratio) => self.session.seek(&inputs, ratio),
            SessionCommand::SetSpeed(rate) => self.session.set_speed(rate),
            SessionCommand::ChangeMode => {
                self.session.change_mode();
                Ok(())
            }
            SessionCommand::Select(index) => match inputs.playlist.get(index) {
                Some(track) => {
                    self.session.select_track(track, index);
                    Ok(())
                }
                None => Err(SessionError::IndexOutOfBounds {
                    index,
                    len: inputs.playlist.len(),
                }),
            },
            SessionCommand::Delete(index) => match inputs.playlist.get(index) {
                Some(track) => {
                    self.session.delete_track(track, index);
                    Ok(())
                }
                None => Err(SessionError::IndexOutOfBounds {
                    index,
                    len: inputs.playlist.len(),
                }),
            },
            SessionCommand::Clear => {
                self.session.clear_playlist();
                Ok(())
            }
            SessionCommand::ShowList => {
                self.session.show_list();
                let _ = self.events.send(SessionEvent::Playlist {
                    tracks: self.store.playlist().tracks().to_vec(),
                    current_index: self.store.current_index(),
                });
                Ok(())
            }
            SessionCommand::HideList => {
                self.session.hide_list();
                Ok(())
            }
            SessionCommand::FullScreen(full_screen) => {
                self.session.set_full_screen(full_screen);
                Ok(())
            }
            SessionCommand::LoadPlaylist { tracks, start } => {
                self.store.load_playlist(tracks, start);
                Ok(())
            }
            SessionCommand::Shutdown => Ok(()),
        };

        if let Err(e) = outcome {
            warn!("Command rejected: {}", e);
        }
    }

    fn handle_signal(&mut self, signal: TaggedSignal) {
        let inputs = self.store.inputs();
        if let Err(e) = self.session.handle_signal(signal, &inputs) {
            warn!("Signal handling failed: {}", e);
        }
    }

    /// Feed intents to the store and re-sync until nothing changes
    fn reconcile(&mut self) {
        for _ in 0..MAX_RECONCILE_ROUNDS {
            self.session.sync(&self.store.inputs());

            let intents = self.session.drain_intents();
            if intents.is_empty() {
                break;
            }
            for intent in intents {
                let _ = self.events.send(SessionEvent::Intent(intent.clone()));
                self.store.apply(intent);
            }
        }

        for signal in self.session.take_deferred_signals() {
            if self.signal_tx.send(signal).is_err() {
                warn!("Signal channel closed, dropping deferred signal");
            }
        }

        let _ = self.events.send(SessionEvent::Snapshot {
            state: self.session.snapshot(),
            playing: self.store.is_playing(),
            mode: self.store.mode(),
            speed: self.store.speed(),
            current_index: self.store.current_index(),
        });
    }
}
