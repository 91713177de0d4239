//! Cadence - Playback Session Control
//!
//! Platform-agnostic controller for a single audio output device.
//!
//! This crate provides:
//! - Track-change transitions with epoch-tagged device loads
//! - Play/pause mirroring of caller-owned state
//! - Skip next/previous with single-track replay
//! - End-of-track policies keyed by play mode (repeat-one replays)
//! - Automatic skip past tracks the device cannot play
//! - Seek, speed and presentation projection (elapsed, duration, progress)
//!
//! # Architecture
//!
//! The session owns only the device and derived timing. Playlist, current
//! index, playing flag, mode and speed belong to the caller: they are passed
//! in as [`SessionInputs`] on every call and changed only through
//! [`SessionIntent`]s the caller drains and applies.
//!
//! Platform code supplies an [`AudioDevice`] and a [`ResourceResolver`].
//! [`SessionDriver`] runs a session together with a [`PlayerStore`] on a
//! tokio task for callers that do not own state themselves.
//!
//! # Example: Direct Use
//!
//! ```rust
//! use cadence_session::{
//!     AudioDevice, Epoch, PlaybackSession, Playlist, ResourceLocator, Result,
//!     SessionConfig, SessionInputs, SessionIntent, Track,
//! };
//! use std::sync::Arc;
//!
//! struct NullDevice;
//!
//! impl AudioDevice for NullDevice {
//!     fn load(&mut self, _: &ResourceLocator, _: Epoch) -> Result<()> { Ok(()) }
//!     fn play(&mut self) -> Result<()> { Ok(()) }
//!     fn pause(&mut self) -> Result<()> { Ok(()) }
//!     fn set_rate(&mut self, _: f32) -> Result<()> { Ok(()) }
//!     fn set_autoplay(&mut self, _: bool) -> Result<()> { Ok(()) }
//!     fn set_position(&mut self, _: f64) -> Result<()> { Ok(()) }
//! }
//!
//! let resolver = |id: &str| -> Result<ResourceLocator> {
//!     Ok(ResourceLocator::new(format!("https://cdn.example.com/{id}.mp3")))
//! };
//! let mut session =
//!     PlaybackSession::new(Box::new(NullDevice), Arc::new(resolver), SessionConfig::default());
//!
//! let playlist = Playlist::new(vec![
//!     Track::new("1", "Intro", 95_000),
//!     Track::new("2", "Theme", 210_000),
//! ]);
//! let inputs = SessionInputs::at(&playlist, 0);
//!
//! session.sync(&inputs);
//! assert_eq!(session.duration(), 95.0);
//! assert_eq!(session.drain_intents(), vec![SessionIntent::Playing(true)]);
//!
//! session.next(&inputs.playing(true)).unwrap();
//! assert!(matches!(
//!     session.drain_intents().as_slice(),
//!     [SessionIntent::SelectTrack { index: 1, .. }]
//! ));
//! ```

mod device;
mod error;
mod events;
pub mod navigator;
mod policy;
mod projection;
mod resolver;
mod runtime;
mod session;
mod store;
pub mod types;

// Public exports
pub use device::{AudioDevice, DeviceBinding};
pub use error::{Result, SessionError};
pub use events::{DeviceSignal, Epoch, SessionIntent, TaggedSignal};
pub use policy::{
    AdvanceToNext, EndAction, EndOfTrackPolicy, ModePolicies, QueuePosition, RepeatCurrent,
};
pub use projection::{format_timestamp, progress_ratio, PresentationState};
pub use resolver::{ResourceLocator, ResourceResolver, UrlTemplateResolver, ID_PLACEHOLDER};
pub use runtime::{
    signal_channel, SessionCommand, SessionDriver, SessionEvent, SessionHandle, SignalReceiver,
    SignalSender,
};
pub use session::PlaybackSession;
pub use store::PlayerStore;
pub use types::{PlayMode, Playlist, SessionConfig, SessionInputs, Track};
