//! Audio output device binding
//!
//! The session drives exactly one output handle. `AudioDevice` is the
//! platform contract; `DeviceBinding` owns the handle, stamps every load with
//! a fresh epoch and guarantees the handle is released exactly once.

use crate::error::Result;
use crate::events::Epoch;
use crate::resolver::ResourceLocator;
use tracing::{debug, warn};

/// Platform audio output
///
/// Every command is a fire-and-forget request. Results are observed later as
/// signals (`Progress`, `Ended`, `Error`) which the implementation must tag
/// with the epoch passed to the most recent `load`.
pub trait AudioDevice: Send {
    /// Replace the current source; all signals from here on carry `epoch`
    fn load(&mut self, resource: &ResourceLocator, epoch: Epoch) -> Result<()>;

    /// Start or resume output
    fn play(&mut self) -> Result<()>;

    /// Pause output, keeping the source and position
    fn pause(&mut self) -> Result<()>;

    /// Set playback rate multiplier
    fn set_rate(&mut self, rate: f32) -> Result<()>;

    /// Start playing as soon as the next load is ready
    fn set_autoplay(&mut self, autoplay: bool) -> Result<()>;

    /// Move the playback position (seconds from start)
    fn set_position(&mut self, seconds: f64) -> Result<()>;

    /// Free platform resources; no command follows
    fn release(&mut self) {}
}

/// Exclusive owner of the session's audio device
pub struct DeviceBinding {
    device: Option<Box<dyn AudioDevice>>,
    epoch: Epoch,
    has_source: bool,
}

impl DeviceBinding {
    pub fn new(device: Box<dyn AudioDevice>) -> Self {
        Self {
            device: Some(device),
            epoch: Epoch::INITIAL,
            has_source: false,
        }
    }

    /// Epoch of the most recent load
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Whether a signal tagged with `epoch` belongs to the current source
    pub fn is_current(&self, epoch: Epoch) -> bool {
        epoch == self.epoch
    }

    /// Whether a source was ever handed to the device
    pub fn has_source(&self) -> bool {
        self.has_source
    }

    pub fn is_released(&self) -> bool {
        self.device.is_none()
    }

    /// Start a new generation, invalidating every outstanding signal
    pub fn advance_epoch(&mut self) -> Epoch {
        self.epoch = self.epoch.next();
        self.epoch
    }

    /// Load a source under the current epoch
    ///
    /// Rate and autoplay go out before the load so the first frame already
    /// honours them.
    pub fn load(&mut self, resource: &ResourceLocator, rate: f32) -> Result<()> {
        let epoch = self.epoch;
        let Some(device) = self.device.as_mut() else {
            return Ok(());
        };
        device.set_rate(rate)?;
        device.set_autoplay(true)?;
        device.load(resource, epoch)?;
        self.has_source = true;
        debug!("Loaded {} at rate {} (epoch {})", resource, rate, epoch);
        Ok(())
    }

    pub fn play(&mut self) {
        self.forward("play", |d| d.play());
    }

    pub fn pause(&mut self) {
        self.forward("pause", |d| d.pause());
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.forward("set_rate", |d| d.set_rate(rate));
    }

    pub fn set_position(&mut self, seconds: f64) {
        self.forward("set_position", |d| d.set_position(seconds));
    }

    /// Release the device handle (idempotent)
    pub fn release(&mut self) {
        if let Some(mut device) = self.device.take() {
            device.release();
            debug!("Audio device released");
        }
    }

    fn forward<F>(&mut self, command: &str, f: F)
    where
        F: FnOnce(&mut dyn AudioDevice) -> Result<()>,
    {
        if let Some(device) = self.device.as_mut() {
            if let Err(e) = f(device.as_mut()) {
                warn!("Device rejected {}: {}", command, e);
            }
        }
    }
}

impl Drop for DeviceBinding {
    fn drop(&mut self) {
        self.release();
    }
}
