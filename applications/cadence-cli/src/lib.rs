//! Cadence CLI Library
//!
//! Headless harness for the playback session: configuration, playlist files,
//! a simulated audio device and the stdin command language.
//!
//! This library exposes the harness components for testing purposes.

pub mod commands;
pub mod config;
pub mod device;
pub mod error;
pub mod playlist;

// Re-export commonly used types for convenience
pub use commands::{parse_line, Line, HELP};
pub use config::AppConfig;
pub use device::{Catalogue, SimulatedDevice};
pub use error::{CliError, Result};
