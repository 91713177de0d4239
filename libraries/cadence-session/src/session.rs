//! Playback session - core state machine
//!
//! Owns the audio device and the derived timing state (elapsed, duration).
//! Everything else (playlist, current index, playing flag, mode, speed) is
//! owned by the caller, handed in through [`SessionInputs`] on every call and
//! changed only by emitting [`SessionIntent`]s.

use crate::{
    device::{AudioDevice, DeviceBinding},
    error::{Result, SessionError},
    events::{DeviceSignal, Epoch, SessionIntent, TaggedSignal},
    navigator::{self, Step},
    policy::{EndAction, ModePolicies, QueuePosition},
    projection::{progress_ratio, PresentationState},
    resolver::ResourceResolver,
    types::{SessionConfig, SessionInputs, Track},
};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

/// Duration used when the configured floor is unusable
const DEFAULT_MIN_DURATION_SECS: f64 = 1.0;

/// Identity of the source currently in the device
#[derive(Debug, Clone, PartialEq, Eq)]
struct LoadedSource {
    track_id: String,
    playlist_revision: u64,
}

/// Playback session controller
///
/// One instance per mounted player. All methods run on a single logical
/// thread; asynchronous device signals must be funnelled through
/// [`handle_signal`](Self::handle_signal) in arrival order.
pub struct PlaybackSession {
    config: SessionConfig,
    device: DeviceBinding,
    resolver: Arc<dyn ResourceResolver>,
    policies: ModePolicies,

    // Derived state
    loaded: Option<LoadedSource>,
    elapsed: f64,
    duration: f64,
    list_visible: bool,
    consecutive_errors: u32,

    // Last values seen from the caller
    last_speed: f32,
    last_playing: Option<bool>,

    // Outgoing traffic
    pending_intents: Vec<SessionIntent>,
    deferred_signals: VecDeque<TaggedSignal>,
}

fn is_valid_speed(rate: f32) -> bool {
    rate.is_finite() && rate > 0.0
}

impl PlaybackSession {
    /// Create a session bound to `device`
    pub fn new(
        device: Box<dyn AudioDevice>,
        resolver: Arc<dyn ResourceResolver>,
        config: SessionConfig,
    ) -> Self {
        let mut session = Self {
            config,
            device: DeviceBinding::new(device),
            resolver,
            policies: ModePolicies::default(),
            loaded: None,
            elapsed: 0.0,
            duration: DEFAULT_MIN_DURATION_SECS,
            list_visible: false,
            consecutive_errors: 0,
            last_speed: 1.0,
            last_playing: None,
            pending_intents: Vec::new(),
            deferred_signals: VecDeque::new(),
        };
        session.duration = session.duration_floor();
        session
    }

    /// Replace the end-of-track policies
    #[must_use]
    pub fn with_policies(mut self, policies: ModePolicies) -> Self {
        self.policies = policies;
        self
    }

    // ===== Caller State =====

    /// Reconcile with the caller's current state
    ///
    /// Loads the current track when its identity (track id, playlist
    /// revision) changed since the last load, then mirrors the playing flag
    /// onto the device. Calling it again with the same inputs does nothing.
    pub fn sync(&mut self, inputs: &SessionInputs<'_>) {
        if is_valid_speed(inputs.speed) {
            self.last_speed = inputs.speed;
        }
        self.sync_track(inputs);
        self.sync_playing(inputs);
    }

    fn sync_track(&mut self, inputs: &SessionInputs<'_>) {
        if inputs.playlist.is_empty() {
            return;
        }
        let Some(track) = inputs.current_track else {
            return;
        };

        let revision = inputs.playlist.revision();
        let unchanged = self
            .loaded
            .as_ref()
            .is_some_and(|l| l.track_id == track.id && l.playlist_revision == revision);
        if unchanged {
            return;
        }

        self.load_track(track, revision);
    }

    fn sync_playing(&mut self, inputs: &SessionInputs<'_>) {
        if self.last_playing == Some(inputs.playing) {
            return;
        }
        self.last_playing = Some(inputs.playing);

        if inputs.playing {
            if self.loaded.is_some() && !inputs.playlist.is_empty() {
                self.device.play();
            }
        } else if self.device.has_source() {
            self.device.pause();
        }
    }

    /// Load `track` under a fresh epoch
    ///
    /// Resolution or load failures are queued as an error signal for the new
    /// epoch rather than handled inline, so a failing track never recurses.
    fn load_track(&mut self, track: &Track, playlist_revision: u64) {
        let epoch = self.device.advance_epoch();
        self.elapsed = 0.0;
        self.duration = self.duration_for(track);
        self.loaded = Some(LoadedSource {
            track_id: track.id.clone(),
            playlist_revision,
        });

        debug!(
            "Loading track {} ({:.0}s) at epoch {}",
            track.id, self.duration, epoch
        );

        let outcome = self
            .resolver
            .resolve(&track.id)
            .and_then(|locator| self.device.load(&locator, self.last_speed));

        if let Err(e) = outcome {
            warn!("Failed to load track {}: {}", track.id, e);
            self.deferred_signals
                .push_back(TaggedSignal::error(epoch, e.to_string()));
        }

        self.emit(SessionIntent::Playing(true));
    }

    fn replay(&mut self, inputs: &SessionInputs<'_>) {
        if inputs.playlist.is_empty() {
            return;
        }
        if let Some(track) = inputs.current_track {
            self.load_track(track, inputs.playlist.revision());
        }
    }

    fn duration_floor(&self) -> f64 {
        let floor = self.config.min_duration_secs;
        if floor.is_finite() && floor > 0.0 {
            floor
        } else {
            DEFAULT_MIN_DURATION_SECS
        }
    }

    fn duration_for(&self, track: &Track) -> f64 {
        (track.whole_seconds() as f64).max(self.duration_floor())
    }

    // ===== Device Signals =====

    /// Apply a signal from the audio device
    ///
    /// Signals from any epoch but the current one are dropped unseen.
    pub fn handle_signal(&mut self, signal: TaggedSignal, inputs: &SessionInputs<'_>) -> Result<()> {
        if signal.epoch == Epoch::INITIAL || !self.device.is_current(signal.epoch) {
            trace!(
                "Dropping stale {:?} from epoch {} (current {})",
                signal.signal,
                signal.epoch,
                self.device.epoch()
            );
            return Ok(());
        }

        match signal.signal {
            DeviceSignal::Progress { position_secs } => {
                self.on_progress(position_secs);
                Ok(())
            }
            DeviceSignal::Ended => self.on_ended(inputs),
            DeviceSignal::Error { reason } => self.on_error(&reason, inputs),
        }
    }

    fn on_progress(&mut self, position_secs: f64) {
        self.elapsed = if position_secs.is_finite() {
            position_secs.max(0.0)
        } else {
            0.0
        };
        if self.elapsed > 0.0 {
            self.consecutive_errors = 0;
        }
    }

    fn on_ended(&mut self, inputs: &SessionInputs<'_>) -> Result<()> {
        if inputs.playlist.is_empty() {
            return Ok(());
        }
        let position = QueuePosition {
            index: inputs.current_index,
            len: inputs.playlist.len(),
        };

        match self.policies.decide(inputs.mode, position) {
            EndAction::Replay => {
                self.replay(inputs);
                Ok(())
            }
            EndAction::Advance => self.advance(inputs),
            EndAction::Stop => {
                debug!("Stopping at end of track {}", inputs.current_index);
                self.emit(SessionIntent::Playing(false));
                Ok(())
            }
        }
    }

    fn on_error(&mut self, reason: &str, inputs: &SessionInputs<'_>) -> Result<()> {
        warn!("Playback error: {}", reason);
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);

        if let Some(limit) = self.config.max_consecutive_errors {
            if self.consecutive_errors > limit {
                error!(
                    "{} consecutive playback errors, no longer skipping",
                    self.consecutive_errors
                );
                self.consecutive_errors = 0;
                self.emit(SessionIntent::Playing(false));
                self.emit_error();
                return Ok(());
            }
        }

        let outcome = self.advance(inputs);
        self.emit_error();
        outcome
    }

    // ===== Navigation =====

    /// Skip to the next track
    ///
    /// A single-track playlist restarts its track. Skipping always resumes.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self, inputs: &SessionInputs<'_>) -> Result<()> {
        self.consecutive_errors = 0;
        self.advance(inputs)
    }

    /// Go to the previous track
    ///
    /// Unlike [`next`](Self::next) this leaves a paused session paused.
    pub fn previous(&mut self, inputs: &SessionInputs<'_>) -> Result<()> {
        self.consecutive_errors = 0;
        if inputs.playlist.is_empty() {
            return Ok(());
        }
        match navigator::step_backward(inputs.playlist.len(), inputs.current_index)? {
            Step::Replay => self.replay(inputs),
            Step::Select(index) => self.request_select(inputs, index),
        }
        Ok(())
    }

    fn advance(&mut self, inputs: &SessionInputs<'_>) -> Result<()> {
        if inputs.playlist.is_empty() {
            debug!("Skip ignored, playlist is empty");
            return Ok(());
        }
        match navigator::step_forward(inputs.playlist.len(), inputs.current_index)? {
            Step::Replay => self.replay(inputs),
            Step::Select(index) => {
                if !inputs.playing {
                    self.emit(SessionIntent::Playing(true));
                }
                self.request_select(inputs, index);
            }
        }
        Ok(())
    }

    fn request_select(&mut self, inputs: &SessionInputs<'_>, index: usize) {
        if let Some(track) = inputs.playlist.get(index) {
            self.emit(SessionIntent::SelectTrack {
                track: track.clone(),
                index,
            });
        }
    }

    // ===== Seek & Speed =====

    /// Seek to a fraction of the track
    ///
    /// `ratio` is clamped to `[0, 1]`. Seeking a paused session resumes it.
    pub fn seek(&mut self, inputs: &SessionInputs<'_>, ratio: f64) -> Result<()> {
        if ratio.is_nan() {
            return Err(SessionError::InvalidSeekRatio(ratio));
        }
        if self.loaded.is_none() || inputs.playlist.is_empty() {
            return Ok(());
        }

        let target = ratio.clamp(0.0, 1.0) * self.duration;
        self.device.set_position(target);
        if !inputs.playing {
            self.emit(SessionIntent::Playing(true));
        }
        Ok(())
    }

    /// Change playback rate
    pub fn set_speed(&mut self, rate: f32) -> Result<()> {
        if !is_valid_speed(rate) {
            return Err(SessionError::InvalidSpeed(rate));
        }
        self.emit(SessionIntent::Speed(rate));
        self.last_speed = rate;
        if self.loaded.is_some() {
            self.device.set_rate(rate);
        }
        Ok(())
    }

    // ===== Pass-through Intents =====

    pub fn toggle_playing(&mut self, inputs: &SessionInputs<'_>) {
        self.emit(SessionIntent::Playing(!inputs.playing));
    }

    pub fn set_full_screen(&mut self, full_screen: bool) {
        self.emit(SessionIntent::FullScreen(full_screen));
    }

    pub fn change_mode(&mut self) {
        self.emit(SessionIntent::ChangeMode);
    }

    /// Ask the caller to make `track` current
    pub fn select_track(&mut self, track: &Track, index: usize) {
        self.consecutive_errors = 0;
        self.emit(SessionIntent::SelectTrack {
            track: track.clone(),
            index,
        });
    }

    pub fn delete_track(&mut self, track: &Track, index: usize) {
        self.emit(SessionIntent::DeleteTrack {
            track: track.clone(),
            index,
        });
    }

    /// Stop, leave full screen, empty the playlist and close the list
    ///
    /// The device keeps its last source until the next track change.
    pub fn clear_playlist(&mut self) {
        self.emit(SessionIntent::Playing(false));
        self.emit(SessionIntent::FullScreen(false));
        self.emit(SessionIntent::ClearPlaylist);
        self.list_visible = false;
    }

    pub fn show_list(&mut self) {
        self.list_visible = true;
    }

    pub fn hide_list(&mut self) {
        self.list_visible = false;
    }

    // ===== State =====

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Played fraction of the current track
    pub fn progress(&self) -> f64 {
        progress_ratio(self.elapsed, self.duration)
    }

    pub fn epoch(&self) -> Epoch {
        self.device.epoch()
    }

    /// Id of the track loaded into the device
    pub fn loaded_track_id(&self) -> Option<&str> {
        self.loaded.as_ref().map(|l| l.track_id.as_str())
    }

    pub fn is_list_visible(&self) -> bool {
        self.list_visible
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn snapshot(&self) -> PresentationState {
        PresentationState {
            track_id: self.loaded_track_id().map(str::to_string),
            epoch: self.epoch(),
            elapsed_secs: self.elapsed,
            duration_secs: self.duration,
            progress: self.progress(),
            list_visible: self.list_visible,
        }
    }

    // ===== Outgoing Traffic =====

    /// Drain all pending intents, oldest first
    pub fn drain_intents(&mut self) -> Vec<SessionIntent> {
        std::mem::take(&mut self.pending_intents)
    }

    pub fn has_pending_intents(&self) -> bool {
        !self.pending_intents.is_empty()
    }

    /// Take signals the session raised against itself (failed loads)
    ///
    /// They must be fed back through [`handle_signal`](Self::handle_signal)
    /// on a later turn.
    pub fn take_deferred_signals(&mut self) -> Vec<TaggedSignal> {
        self.deferred_signals.drain(..).collect()
    }

    /// Release the audio device; the session issues no further commands
    pub fn close(&mut self) {
        self.device.release();
    }

    pub fn is_closed(&self) -> bool {
        self.device.is_released()
    }

    fn emit(&mut self, intent: SessionIntent) {
        self.pending_intents.push(intent);
    }

    fn emit_error(&mut self) {
        let message = self.config.error_message.clone();
        self.emit(SessionIntent::Error { message });
    }
}
