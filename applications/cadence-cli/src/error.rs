/// CLI error types
use cadence_session::SessionError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot read playlist {path:?}: {reason}")]
    Playlist { path: PathBuf, reason: String },

    #[error("Unknown command: {0} (try `help`)")]
    UnknownCommand(String),

    #[error("Invalid argument for `{command}`: {reason}")]
    InvalidArgument { command: String, reason: String },

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for CliError {
    fn from(err: config::ConfigError) -> Self {
        CliError::Config(err.to_string())
    }
}
