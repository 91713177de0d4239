/// Cadence - headless playback session harness
use cadence_cli::{
    commands::{parse_line, Line, HELP},
    config::AppConfig,
    device::SimulatedDevice,
    playlist,
};
use cadence_session::{
    signal_channel, PlayMode, PlaybackSession, PlayerStore, SessionCommand, SessionDriver,
    SessionEvent, SessionIntent, Track, UrlTemplateResolver,
};
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(
    about = "Drive a playback session from the terminal",
    long_about = "Drive a playback session from the terminal.\n\n\
        Failed tracks are skipped. Set session.max_consecutive_errors \
        (or CADENCE__SESSION__MAX_CONSECUTIVE_ERRORS) to stop playback after \
        that many failures in a row; without it a playlist where every track \
        fails keeps skipping forever."
)]
struct Cli {
    /// Playlist file (JSON array of tracks)
    #[arg(short, long)]
    playlist: PathBuf,

    /// Configuration file path
    #[arg(short, long, env = "CADENCE_CONFIG")]
    config: Option<PathBuf>,

    /// Play mode: sequence, loop or random
    #[arg(short, long, value_parser = parse_mode)]
    mode: Option<PlayMode>,

    /// Playback rate
    #[arg(short, long)]
    speed: Option<f32>,

    /// Index of the first track to play
    #[arg(long, default_value_t = 0)]
    start: usize,
}

fn parse_mode(s: &str) -> Result<PlayMode, String> {
    PlayMode::from_str(s).ok_or_else(|| format!("unknown mode {s:?}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadence_cli=info,cadence_session=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(mode) = cli.mode {
        config.player.mode = mode;
    }
    if let Some(speed) = cli.speed {
        config.player.speed = speed;
    }
    config.validate()?;

    let tracks = playlist::load(&cli.playlist)?;
    tracing::info!(
        "Loaded {} tracks from {}",
        tracks.len(),
        cli.playlist.display()
    );

    run(config, tracks, cli.start).await
}

async fn run(config: AppConfig, tracks: Vec<Track>, start: usize) -> anyhow::Result<()> {
    let resolver = UrlTemplateResolver::new(config.resolver.url_template.clone())?;
    let catalogue = playlist::catalogue(&tracks, &resolver, &config.device.failing_tracks);

    let (signal_tx, signal_rx) = signal_channel();
    let device = SimulatedDevice::new(
        signal_tx.clone(),
        catalogue,
        Duration::from_millis(config.device.tick_ms),
    );
    let session = PlaybackSession::new(Box::new(device), Arc::new(resolver), config.session);
    let store = PlayerStore::new(config.player.mode, config.player.speed);

    let (driver, handle) = SessionDriver::new(session, store, signal_rx, signal_tx);
    let observer = tokio::spawn(observe(handle.subscribe(), names(&tracks)));
    let driver = tokio::spawn(driver.run());

    tracing::info!(
        "Mode {}, speed {}x. Type `help` for commands.",
        config.player.mode,
        config.player.speed
    );
    handle
        .send(SessionCommand::LoadPlaylist { tracks, start })
        .await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        match parse_line(&line) {
            Ok(Line::Empty) => {}
            Ok(Line::Help) => println!("{HELP}"),
            Ok(Line::Command(SessionCommand::Shutdown)) => break,
            Ok(Line::Command(command)) => handle.send(command).await?,
            Err(e) => eprintln!("{e}"),
        }
    }

    handle.send(SessionCommand::Shutdown).await?;
    let store = driver.await?;
    observer.await?;

    match store.current_track() {
        Some(track) => tracing::info!("Stopped at {} ({})", track.name, track.id),
        None => tracing::info!("Stopped with an empty playlist"),
    }
    Ok(())
}

fn names(tracks: &[Track]) -> HashMap<String, String> {
    tracks
        .iter()
        .map(|t| {
            let label = if t.artists.is_empty() {
                t.name.clone()
            } else {
                format!("{} - {}", t.name, t.artist_line())
            };
            (t.id.clone(), label)
        })
        .collect()
}

/// Print what a listener would see until the driver stops
async fn observe(mut events: broadcast::Receiver<SessionEvent>, names: HashMap<String, String>) {
    let mut now_playing: Option<String> = None;

    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!("Observer skipped {} events", skipped);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        match event {
            SessionEvent::Intent(SessionIntent::Error { message }) => {
                tracing::warn!("{}", message);
            }
            SessionEvent::Intent(SessionIntent::ChangeMode) => {
                tracing::info!("Play mode changed");
            }
            SessionEvent::Intent(intent) => tracing::debug!("Intent: {:?}", intent),
            SessionEvent::Snapshot {
                state,
                playing,
                mode,
                speed,
                ..
            } => {
                if state.track_id != now_playing {
                    if let Some(id) = &state.track_id {
                        let label = names.get(id).map_or(id.as_str(), String::as_str);
                        println!("> {label} [{}]", state.duration_label());
                    }
                    now_playing.clone_from(&state.track_id);
                }
                tracing::debug!(
                    "{} / {} ({:.0}%) playing={} mode={} speed={}",
                    state.elapsed_label(),
                    state.duration_label(),
                    state.progress * 100.0,
                    playing,
                    mode,
                    speed
                );
            }
            SessionEvent::Playlist {
                tracks,
                current_index,
            } => {
                if tracks.is_empty() {
                    println!("(playlist is empty)");
                }
                for (i, track) in tracks.iter().enumerate() {
                    let marker = if current_index == Some(i) { '*' } else { ' ' };
                    let label = names.get(&track.id).unwrap_or(&track.name);
                    println!("{marker} {:>3}. {label}", i + 1);
                }
            }
            SessionEvent::Stopped => break,
        }
    }
}
