//! Shared test doubles for session integration tests

#![allow(dead_code)]

use cadence_session::{
    AudioDevice, Epoch, PlaybackSession, Playlist, ResourceLocator, ResourceResolver, Result,
    SessionConfig, SessionError, SignalSender, TaggedSignal, Track,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Every command the session sent to the device
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    Load { resource: String, epoch: Epoch },
    Play,
    Pause,
    SetRate(f32),
    SetAutoplay(bool),
    SetPosition(f64),
    Release,
}

/// Device that records commands and can echo signals into a channel
#[derive(Clone, Default)]
pub struct RecordingDevice {
    calls: Arc<Mutex<Vec<DeviceCall>>>,
    signals: Option<SignalSender>,
    /// Resources whose load reports an error signal
    failing: Arc<HashSet<String>>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Device that answers loads on `signals`
    pub fn with_signals(signals: SignalSender) -> Self {
        Self {
            signals: Some(signals),
            ..Self::default()
        }
    }

    /// Loads of these resources report an error signal
    pub fn failing(mut self, resources: &[&str]) -> Self {
        self.failing = Arc::new(resources.iter().map(|r| r.to_string()).collect());
        self
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn loads(&self) -> Vec<(String, Epoch)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                DeviceCall::Load { resource, epoch } => Some((resource, epoch)),
                _ => None,
            })
            .collect()
    }

    pub fn last_rate(&self) -> Option<f32> {
        self.calls().into_iter().rev().find_map(|c| match c {
            DeviceCall::SetRate(rate) => Some(rate),
            _ => None,
        })
    }

    fn record(&self, call: DeviceCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl AudioDevice for RecordingDevice {
    fn load(&mut self, resource: &ResourceLocator, epoch: Epoch) -> Result<()> {
        self.record(DeviceCall::Load {
            resource: resource.to_string(),
            epoch,
        });
        if self.failing.contains(resource.as_str()) {
            if let Some(signals) = &self.signals {
                let _ = signals.send(TaggedSignal::error(epoch, "MEDIA_ERR_SRC_NOT_SUPPORTED"));
            }
        }
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        self.record(DeviceCall::Play);
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.record(DeviceCall::Pause);
        Ok(())
    }

    fn set_rate(&mut self, rate: f32) -> Result<()> {
        self.record(DeviceCall::SetRate(rate));
        Ok(())
    }

    fn set_autoplay(&mut self, autoplay: bool) -> Result<()> {
        self.record(DeviceCall::SetAutoplay(autoplay));
        Ok(())
    }

    fn set_position(&mut self, seconds: f64) -> Result<()> {
        self.record(DeviceCall::SetPosition(seconds));
        Ok(())
    }

    fn release(&mut self) {
        self.record(DeviceCall::Release);
    }
}

/// Resolver mapping `id` to `mem://id`, refusing ids that start with `missing`
pub fn memory_resolver() -> Arc<dyn ResourceResolver> {
    Arc::new(|id: &str| -> Result<ResourceLocator> {
        if id.starts_with("missing") {
            Err(SessionError::resolution(id, "not in catalogue"))
        } else {
            Ok(ResourceLocator::new(format!("mem://{id}")))
        }
    })
}

pub fn track(id: &str, length_ms: u64) -> Track {
    Track::new(id, format!("Track {id}"), length_ms)
}

/// Playlist of three-minute tracks
pub fn playlist(ids: &[&str]) -> Playlist {
    Playlist::new(ids.iter().map(|id| track(id, 180_000)).collect())
}

pub fn create_session() -> (PlaybackSession, RecordingDevice) {
    create_session_with(SessionConfig::default())
}

pub fn create_session_with(config: SessionConfig) -> (PlaybackSession, RecordingDevice) {
    let device = RecordingDevice::new();
    let session = PlaybackSession::new(Box::new(device.clone()), memory_resolver(), config);
    (session, device)
}
