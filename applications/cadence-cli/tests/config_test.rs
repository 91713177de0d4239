//! Configuration loading tests

use cadence_cli::{AppConfig, CliError};
use cadence_session::PlayMode;
use std::io::Write;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn loads_every_section_from_file() {
    let file = write_config(
        r#"
[session]
error_message = "Skipped an unplayable track"
max_consecutive_errors = 3

[resolver]
url_template = "file:///srv/music/{id}.flac"

[device]
tick_ms = 50
failing_tracks = ["2", "7"]

[player]
mode = "random"
speed = 1.5
"#,
    );

    let config = AppConfig::load(Some(file.path())).unwrap();
    config.validate().unwrap();

    assert_eq!(config.session.error_message, "Skipped an unplayable track");
    assert_eq!(config.session.max_consecutive_errors, Some(3));
    assert_eq!(config.session.min_duration_secs, 1.0);
    assert_eq!(config.resolver.url_template, "file:///srv/music/{id}.flac");
    assert_eq!(config.device.tick_ms, 50);
    assert_eq!(config.device.failing_tracks, vec!["2", "7"]);
    assert_eq!(config.player.mode, PlayMode::Random);
    assert_eq!(config.player.speed, 1.5);
}

#[test]
fn partial_file_keeps_defaults() {
    let file = write_config(
        r#"
[player]
mode = "loop"
"#,
    );

    let config = AppConfig::load(Some(file.path())).unwrap();

    assert_eq!(config.player.mode, PlayMode::Loop);
    assert_eq!(config.player.speed, 1.0);
    assert_eq!(config.device.tick_ms, 250);
    assert!(config.resolver.url_template.contains("{id}"));
    assert!(config.validate().is_ok());
}

#[test]
fn invalid_values_fail_validation() {
    let file = write_config(
        r#"
[resolver]
url_template = "https://media.example.com/static.mp3"
"#,
    );

    let config = AppConfig::load(Some(file.path())).unwrap();
    assert!(matches!(config.validate(), Err(CliError::Config(_))));
}

#[test]
fn malformed_file_is_a_config_error() {
    let file = write_config("[player\nmode = ");
    assert!(matches!(
        AppConfig::load(Some(file.path())),
        Err(CliError::Config(_))
    ));
}

#[test]
fn example_config_limits_error_skipping() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/cadence.example.toml");
    let config = AppConfig::load(Some(std::path::Path::new(path))).unwrap();

    assert_eq!(config.session.max_consecutive_errors, Some(5));
    assert_eq!(config.device.failing_tracks, vec!["1901371649".to_string()]);
    assert!(config.validate().is_ok());
}
