//! Playlist files
//!
//! A playlist file is a JSON array of tracks:
//!
//! ```json
//! [
//!   { "id": "1901371647", "name": "Intro", "artists": ["Mono"], "length_ms": 95000 },
//!   { "id": "1901371648", "name": "Theme", "length_ms": 210000 }
//! ]
//! ```

use crate::device::Catalogue;
use crate::error::{CliError, Result};
use cadence_session::{ResourceResolver, Track};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

/// Read and parse a playlist file
pub fn load(path: &Path) -> Result<Vec<Track>> {
    let contents = std::fs::read_to_string(path).map_err(|e| CliError::Playlist {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse(&contents).map_err(|reason| CliError::Playlist {
        path: path.to_path_buf(),
        reason,
    })
}

fn parse(contents: &str) -> std::result::Result<Vec<Track>, String> {
    let tracks: Vec<Track> = serde_json::from_str(contents).map_err(|e| e.to_string())?;
    if tracks.is_empty() {
        return Err("playlist contains no tracks".to_string());
    }

    let mut seen = HashSet::new();
    for track in &tracks {
        if !seen.insert(track.id.as_str()) {
            return Err(format!("duplicate track id {}", track.id));
        }
    }
    Ok(tracks)
}

/// Build the simulated device's catalogue for `tracks`
///
/// Tracks listed in `failing` are left out so the device reports an error
/// when asked to load them. Tracks the resolver rejects are skipped as well;
/// the session sees the resolution failure itself.
pub fn catalogue(
    tracks: &[Track],
    resolver: &dyn ResourceResolver,
    failing: &[String],
) -> Catalogue {
    let mut catalogue = Catalogue::new();
    for track in tracks {
        if failing.iter().any(|id| *id == track.id) {
            debug!("Track {} marked as failing", track.id);
            continue;
        }
        match resolver.resolve(&track.id) {
            Ok(locator) => catalogue.insert(locator, track.length_ms as f64 / 1000.0),
            Err(e) => warn!("Track {} will not resolve: {}", track.id, e),
        }
    }
    catalogue
}
