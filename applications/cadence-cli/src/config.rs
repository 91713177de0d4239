/// Harness configuration
use crate::error::{CliError, Result};
use cadence_session::{PlayMode, SessionConfig, ID_PLACEHOLDER};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File read when no `--config` is given and it exists
pub const DEFAULT_CONFIG_FILE: &str = "cadence.toml";

/// Prefix for environment overrides (`CADENCE__PLAYER__SPEED=1.5`)
pub const ENV_PREFIX: &str = "CADENCE";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default = "default_resolver")]
    pub resolver: ResolverSettings,

    #[serde(default = "default_device")]
    pub device: DeviceSettings,

    #[serde(default = "default_player")]
    pub player: PlayerSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverSettings {
    #[serde(default = "default_url_template")]
    pub url_template: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceSettings {
    /// Interval between simulated progress reports
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Track ids the simulated device refuses to play
    #[serde(default)]
    pub failing_tracks: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerSettings {
    #[serde(default)]
    pub mode: PlayMode,

    #[serde(default = "default_speed")]
    pub speed: f32,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist; otherwise `cadence.toml` in the working
    /// directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::Config(format!(
                        "config file {path:?} does not exist"
                    )));
                }
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Override with environment variables (CADENCE__SECTION__KEY)
        settings = settings.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config = settings.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.resolver.url_template.contains(ID_PLACEHOLDER) {
            return Err(CliError::Config(format!(
                "resolver.url_template must contain {ID_PLACEHOLDER}"
            )));
        }

        if self.device.tick_ms == 0 {
            return Err(CliError::Config(
                "device.tick_ms must be greater than zero".to_string(),
            ));
        }

        if !(self.player.speed.is_finite() && self.player.speed > 0.0) {
            return Err(CliError::Config(format!(
                "player.speed must be positive, got {}",
                self.player.speed
            )));
        }

        if !(self.session.min_duration_secs.is_finite() && self.session.min_duration_secs > 0.0) {
            return Err(CliError::Config(
                "session.min_duration_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

// Default values
fn default_resolver() -> ResolverSettings {
    ResolverSettings {
        url_template: default_url_template(),
    }
}

fn default_url_template() -> String {
    "https://media.example.com/tracks/{id}.mp3".to_string()
}

fn default_device() -> DeviceSettings {
    DeviceSettings {
        tick_ms: default_tick_ms(),
        failing_tracks: Vec::new(),
    }
}

fn default_tick_ms() -> u64 {
    250
}

fn default_player() -> PlayerSettings {
    PlayerSettings {
        mode: PlayMode::default(),
        speed: default_speed(),
    }
}

fn default_speed() -> f32 {
    1.0
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            resolver: default_resolver(),
            device: default_device(),
            player: default_player(),
        }
    }
}
