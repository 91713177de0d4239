//! Presentation projection
//!
//! Read-only views of session state for whoever renders the player.

use crate::events::Epoch;
use serde::{Deserialize, Serialize};

/// Fraction of the track already played, always within `[0, 1]`
pub fn progress_ratio(elapsed_secs: f64, duration_secs: f64) -> f64 {
    if duration_secs.is_nan() || duration_secs <= 0.0 || !elapsed_secs.is_finite() {
        return 0.0;
    }
    (elapsed_secs / duration_secs).clamp(0.0, 1.0)
}

/// Format seconds as `m:ss`
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// Snapshot of what the player should display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentationState {
    /// Track currently loaded into the device
    pub track_id: Option<String>,
    pub epoch: Epoch,
    pub elapsed_secs: f64,
    pub duration_secs: f64,
    pub progress: f64,
    pub list_visible: bool,
}

impl PresentationState {
    pub fn elapsed_label(&self) -> String {
        format_timestamp(self.elapsed_secs)
    }

    pub fn duration_label(&self) -> String {
        format_timestamp(self.duration_secs)
    }
}
