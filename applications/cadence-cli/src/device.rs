//! Simulated audio output
//!
//! Stands in for a real output device: it plays sources it finds in a
//! [`Catalogue`], advances a virtual playhead on a tokio interval and reports
//! progress, end of track and load errors on the session's signal channel.

use cadence_session::{
    AudioDevice, Epoch, ResourceLocator, Result, SessionError, SignalSender, TaggedSignal,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

/// Sources the simulated device can play, with their lengths in seconds
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    lengths: HashMap<String, f64>,
}

impl Catalogue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, locator: ResourceLocator, length_secs: f64) {
        self.lengths.insert(locator.to_string(), length_secs.max(0.0));
    }

    pub fn length_of(&self, locator: &str) -> Option<f64> {
        self.lengths.get(locator).copied()
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }
}

#[derive(Debug)]
struct Playhead {
    epoch: Epoch,
    /// Length of the loaded source; `None` when nothing playable is loaded
    length: Option<f64>,
    position: f64,
    rate: f32,
    playing: bool,
    autoplay: bool,
}

impl Playhead {
    /// Move forward by `secs` of wall time
    fn advance(&mut self, secs: f64) -> Option<TaggedSignal> {
        let length = self.length?;
        if !self.playing {
            return None;
        }

        self.position = (self.position + secs * f64::from(self.rate)).min(length);
        if self.position >= length {
            self.playing = false;
            Some(TaggedSignal::ended(self.epoch))
        } else {
            Some(TaggedSignal::progress(self.epoch, self.position))
        }
    }
}

pub struct SimulatedDevice {
    playhead: Arc<Mutex<Playhead>>,
    catalogue: Catalogue,
    signals: SignalSender,
    ticker: Option<JoinHandle<()>>,
}

impl SimulatedDevice {
    /// Create a device reporting every `tick`
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(signals: SignalSender, catalogue: Catalogue, tick: Duration) -> Self {
        let playhead = Arc::new(Mutex::new(Playhead {
            epoch: Epoch::INITIAL,
            length: None,
            position: 0.0,
            rate: 1.0,
            playing: false,
            autoplay: false,
        }));

        let ticker = tokio::spawn(run_ticker(
            Arc::clone(&playhead),
            signals.clone(),
            tick,
        ));

        Self {
            playhead,
            catalogue,
            signals,
            ticker: Some(ticker),
        }
    }

    fn playhead(&self) -> Result<MutexGuard<'_, Playhead>> {
        self.playhead
            .lock()
            .map_err(|_| SessionError::device("playhead lock poisoned"))
    }

    fn report(&self, signal: TaggedSignal) -> Result<()> {
        self.signals
            .send(signal)
            .map_err(|_| SessionError::device("signal channel closed"))
    }
}

async fn run_ticker(playhead: Arc<Mutex<Playhead>>, signals: SignalSender, tick: Duration) {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let step = tick.as_secs_f64();

    loop {
        interval.tick().await;

        let signal = {
            let Ok(mut playhead) = playhead.lock() else {
                break;
            };
            playhead.advance(step)
        };

        if let Some(signal) = signal {
            trace!("Device signal {:?}", signal);
            if signals.send(signal).is_err() {
                break;
            }
        }
    }
}

impl AudioDevice for SimulatedDevice {
    fn load(&mut self, resource: &ResourceLocator, epoch: Epoch) -> Result<()> {
        let length = self.catalogue.length_of(resource.as_str());
        {
            let mut playhead = self.playhead()?;
            playhead.epoch = epoch;
            playhead.position = 0.0;
            playhead.length = length;
            playhead.playing = length.is_some() && playhead.autoplay;
        }

        match length {
            Some(length) => {
                debug!("Simulating {} ({:.1}s) at epoch {}", resource, length, epoch);
                Ok(())
            }
            None => self.report(TaggedSignal::error(
                epoch,
                format!("MEDIA_ERR_SRC_NOT_SUPPORTED: {resource}"),
            )),
        }
    }

    fn play(&mut self) -> Result<()> {
        let mut playhead = self.playhead()?;
        if playhead.length.is_some() {
            playhead.playing = true;
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.playhead()?.playing = false;
        Ok(())
    }

    fn set_rate(&mut self, rate: f32) -> Result<()> {
        self.playhead()?.rate = rate;
        Ok(())
    }

    fn set_autoplay(&mut self, autoplay: bool) -> Result<()> {
        self.playhead()?.autoplay = autoplay;
        Ok(())
    }

    fn set_position(&mut self, seconds: f64) -> Result<()> {
        let signal = {
            let mut playhead = self.playhead()?;
            let Some(length) = playhead.length else {
                return Ok(());
            };
            playhead.position = seconds.clamp(0.0, length);
            TaggedSignal::progress(playhead.epoch, playhead.position)
        };
        self.report(signal)
    }

    fn release(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        if let Ok(mut playhead) = self.playhead.lock() {
            playhead.playing = false;
            playhead.length = None;
        }
        debug!("Simulated device released");
    }
}

impl Drop for SimulatedDevice {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_session::{signal_channel, DeviceSignal, SignalReceiver};

    const TICK: Duration = Duration::from_millis(100);

    fn create_device(entries: &[(&str, f64)]) -> (SimulatedDevice, SignalReceiver) {
        let (tx, rx) = signal_channel();
        let mut catalogue = Catalogue::new();
        for (locator, length) in entries {
            catalogue.insert(ResourceLocator::new(*locator), *length);
        }
        (SimulatedDevice::new(tx, catalogue, TICK), rx)
    }

    fn epoch(n: u64) -> Epoch {
        (0..n).fold(Epoch::INITIAL, |e, _| e.next())
    }

    #[tokio::test(start_paused = true)]
    async fn plays_through_to_the_end() {
        let (mut device, mut rx) = create_device(&[("mem://a", 0.3)]);
        device.set_autoplay(true).unwrap();
        device.load(&ResourceLocator::new("mem://a"), epoch(1)).unwrap();

        assert_eq!(rx.recv().await, Some(TaggedSignal::progress(epoch(1), 0.1)));
        assert_eq!(rx.recv().await, Some(TaggedSignal::progress(epoch(1), 0.2)));
        assert_eq!(rx.recv().await, Some(TaggedSignal::ended(epoch(1))));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_scales_progress() {
        let (mut device, mut rx) = create_device(&[("mem://a", 10.0)]);
        device.set_rate(2.0).unwrap();
        device.set_autoplay(true).unwrap();
        device.load(&ResourceLocator::new("mem://a"), epoch(1)).unwrap();

        assert_eq!(rx.recv().await, Some(TaggedSignal::progress(epoch(1), 0.2)));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_source_reports_error() {
        let (mut device, mut rx) = create_device(&[]);
        device.set_autoplay(true).unwrap();
        device.load(&ResourceLocator::new("mem://nope"), epoch(3)).unwrap();

        let signal = rx.recv().await.unwrap();
        assert_eq!(signal.epoch, epoch(3));
        assert!(matches!(signal.signal, DeviceSignal::Error { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn paused_device_stays_silent() {
        let (mut device, mut rx) = create_device(&[("mem://a", 10.0)]);
        device.load(&ResourceLocator::new("mem://a"), epoch(1)).unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());

        device.play().unwrap();
        assert_eq!(rx.recv().await, Some(TaggedSignal::progress(epoch(1), 0.1)));
        device.pause().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn seek_reports_clamped_position() {
        let (mut device, mut rx) = create_device(&[("mem://a", 10.0)]);
        device.load(&ResourceLocator::new("mem://a"), epoch(1)).unwrap();

        device.set_position(25.0).unwrap();
        assert_eq!(rx.recv().await, Some(TaggedSignal::progress(epoch(1), 10.0)));
    }

    #[tokio::test(start_paused = true)]
    async fn release_stops_reporting() {
        let (mut device, mut rx) = create_device(&[("mem://a", 10.0)]);
        device.set_autoplay(true).unwrap();
        device.load(&ResourceLocator::new("mem://a"), epoch(1)).unwrap();
        device.release();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());
    }
}
