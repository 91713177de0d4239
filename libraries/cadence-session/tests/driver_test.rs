//! End-to-end tests for the session driver
//!
//! A driver runs on a tokio task with a recording device that answers on the
//! signal channel. Tests talk to it only through its handle and events.

mod common;

use cadence_session::{
    signal_channel, PlayMode, PlaybackSession, PlayerStore, SessionCommand, SessionConfig,
    SessionDriver, SessionError, SessionEvent, SessionHandle, SessionIntent, TaggedSignal, Track,
};
use common::{memory_resolver, track, DeviceCall, RecordingDevice};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

// ===== Test Helpers =====

struct Harness {
    handle: SessionHandle,
    events: broadcast::Receiver<SessionEvent>,
    device: RecordingDevice,
    signals: cadence_session::SignalSender,
    task: JoinHandle<PlayerStore>,
}

fn spawn_driver(mode: PlayMode, failing: &[&str]) -> Harness {
    let (signal_tx, signal_rx) = signal_channel();
    let device = RecordingDevice::with_signals(signal_tx.clone()).failing(failing);
    let session = PlaybackSession::new(
        Box::new(device.clone()),
        memory_resolver(),
        SessionConfig::default(),
    );
    let store = PlayerStore::new(mode, 1.0);
    let (driver, handle) = SessionDriver::new(session, store, signal_rx, signal_tx.clone());
    let events = handle.subscribe();
    let task = tokio::spawn(driver.run());

    Harness {
        handle,
        events,
        device,
        signals: signal_tx,
        task,
    }
}

fn tracks(ids: &[&str]) -> Vec<Track> {
    ids.iter().map(|id| track(id, 120_000)).collect()
}

/// Wait for the first event matching `pred`
async fn wait_for<F>(events: &mut broadcast::Receiver<SessionEvent>, mut pred: F) -> SessionEvent
where
    F: FnMut(&SessionEvent) -> bool,
{
    let search = async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event stream closed"),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), search)
        .await
        .expect("timed out waiting for event")
}

async fn shutdown(harness: Harness) -> (PlayerStore, RecordingDevice) {
    harness.handle.send(SessionCommand::Shutdown).await.unwrap();
    let store = harness.task.await.unwrap();
    (store, harness.device)
}

// ===== Tests =====

#[tokio::test]
async fn loading_a_playlist_starts_playback() {
    let mut harness = spawn_driver(PlayMode::Sequence, &[]);

    harness
        .handle
        .send(SessionCommand::LoadPlaylist {
            tracks: tracks(&["a", "b"]),
            start: 1,
        })
        .await
        .unwrap();

    let event = wait_for(&mut harness.events, |e| {
        matches!(e, SessionEvent::Snapshot { state, .. } if state.track_id.is_some())
    })
    .await;
    match event {
        SessionEvent::Snapshot {
            state,
            playing,
            current_index,
            ..
        } => {
            assert_eq!(state.track_id.as_deref(), Some("b"));
            assert_eq!(state.duration_secs, 120.0);
            assert!(playing);
            assert_eq!(current_index, Some(1));
        }
        other => panic!("unexpected event {other:?}"),
    }

    let (_, device) = shutdown(harness).await;
    assert_eq!(device.loads().len(), 1);
    assert!(device.calls().contains(&DeviceCall::Play));
}

#[tokio::test]
async fn skip_commands_move_through_playlist() {
    let harness = spawn_driver(PlayMode::Sequence, &[]);
    let handle = harness.handle.clone();

    handle
        .send(SessionCommand::LoadPlaylist {
            tracks: tracks(&["a", "b", "c"]),
            start: 0,
        })
        .await
        .unwrap();
    handle.send(SessionCommand::Next).await.unwrap();
    handle.send(SessionCommand::Next).await.unwrap();
    handle.send(SessionCommand::Next).await.unwrap();
    handle.send(SessionCommand::Previous).await.unwrap();

    let (store, device) = shutdown(harness).await;
    assert_eq!(store.current_index(), Some(2));
    assert!(store.is_playing());

    let loaded: Vec<String> = device.loads().into_iter().map(|(r, _)| r).collect();
    assert_eq!(
        loaded,
        vec!["mem://a", "mem://b", "mem://c", "mem://a", "mem://c"]
    );
}

#[tokio::test]
async fn failing_track_is_skipped_with_notification() {
    let mut harness = spawn_driver(PlayMode::Sequence, &["mem://bad"]);

    harness
        .handle
        .send(SessionCommand::LoadPlaylist {
            tracks: tracks(&["bad", "good"]),
            start: 0,
        })
        .await
        .unwrap();

    let event = wait_for(&mut harness.events, |e| {
        matches!(e, SessionEvent::Intent(SessionIntent::Error { .. }))
    })
    .await;
    assert_eq!(
        event,
        SessionEvent::Intent(SessionIntent::Error {
            message: SessionConfig::default().error_message,
        })
    );
    wait_for(&mut harness.events, |e| {
        matches!(e, SessionEvent::Snapshot { state, .. } if state.track_id.as_deref() == Some("good"))
    })
    .await;

    let (store, device) = shutdown(harness).await;
    assert_eq!(store.current_track().unwrap().id, "good");
    assert!(store.last_error().is_some());
    let loaded: Vec<String> = device.loads().into_iter().map(|(r, _)| r).collect();
    assert_eq!(loaded, vec!["mem://bad", "mem://good"]);
}

#[tokio::test]
async fn unresolvable_track_is_skipped() {
    let mut harness = spawn_driver(PlayMode::Sequence, &[]);

    harness
        .handle
        .send(SessionCommand::LoadPlaylist {
            tracks: tracks(&["missing-x", "ok"]),
            start: 0,
        })
        .await
        .unwrap();

    wait_for(&mut harness.events, |e| {
        matches!(e, SessionEvent::Snapshot { state, .. } if state.track_id.as_deref() == Some("ok"))
    })
    .await;

    let (store, device) = shutdown(harness).await;
    assert_eq!(store.current_index(), Some(1));
    assert_eq!(device.loads().len(), 1);
}

#[tokio::test]
async fn loop_mode_replays_on_end() {
    let mut harness = spawn_driver(PlayMode::Loop, &[]);

    harness
        .handle
        .send(SessionCommand::LoadPlaylist {
            tracks: tracks(&["a", "b"]),
            start: 0,
        })
        .await
        .unwrap();
    let first_epoch = match wait_for(&mut harness.events, |e| {
        matches!(e, SessionEvent::Snapshot { state, .. } if state.track_id.is_some())
    })
    .await
    {
        SessionEvent::Snapshot { state, .. } => state.epoch,
        other => panic!("unexpected event {other:?}"),
    };

    harness
        .signals
        .send(TaggedSignal::progress(first_epoch, 119.0))
        .unwrap();
    harness.signals.send(TaggedSignal::ended(first_epoch)).unwrap();

    wait_for(&mut harness.events, |e| {
        matches!(e, SessionEvent::Snapshot { state, .. } if state.epoch > first_epoch)
    })
    .await;

    let (store, device) = shutdown(harness).await;
    assert_eq!(store.current_index(), Some(0));
    let loaded: Vec<String> = device.loads().into_iter().map(|(r, _)| r).collect();
    assert_eq!(loaded, vec!["mem://a", "mem://a"]);
}

#[tokio::test]
async fn clear_stops_and_empties() {
    let harness = spawn_driver(PlayMode::Sequence, &[]);
    let handle = harness.handle.clone();

    handle
        .send(SessionCommand::LoadPlaylist {
            tracks: tracks(&["a", "b"]),
            start: 0,
        })
        .await
        .unwrap();
    handle.send(SessionCommand::FullScreen(true)).await.unwrap();
    handle.send(SessionCommand::Clear).await.unwrap();

    let (store, device) = shutdown(harness).await;
    assert!(store.playlist().is_empty());
    assert!(!store.is_playing());
    assert!(!store.is_full_screen());

    let calls = device.calls();
    assert!(calls.contains(&DeviceCall::Pause));
    assert_eq!(calls.last(), Some(&DeviceCall::Release));
}

#[tokio::test]
async fn speed_and_seek_reach_device() {
    let harness = spawn_driver(PlayMode::Sequence, &[]);
    let handle = harness.handle.clone();

    handle
        .send(SessionCommand::LoadPlaylist {
            tracks: tracks(&["a"]),
            start: 0,
        })
        .await
        .unwrap();
    handle.send(SessionCommand::SetSpeed(1.5)).await.unwrap();
    handle.send(SessionCommand::SetSpeed(-1.0)).await.unwrap();
    handle.send(SessionCommand::Seek(0.25)).await.unwrap();

    let (store, device) = shutdown(harness).await;
    assert_eq!(store.speed(), 1.5);
    assert_eq!(device.last_rate(), Some(1.5));
    assert!(device.calls().contains(&DeviceCall::SetPosition(30.0)));
}

#[tokio::test]
async fn driver_reports_stop_and_rejects_late_commands() {
    let mut harness = spawn_driver(PlayMode::Sequence, &[]);
    let handle = harness.handle.clone();

    handle.send(SessionCommand::Shutdown).await.unwrap();
    wait_for(&mut harness.events, |e| matches!(e, SessionEvent::Stopped)).await;
    harness.task.await.unwrap();

    assert!(matches!(
        handle.send(SessionCommand::Next).await,
        Err(SessionError::Closed)
    ));
}

#[tokio::test]
async fn show_list_publishes_play_order() {
    let mut harness = spawn_driver(PlayMode::Sequence, &[]);

    harness
        .handle
        .send(SessionCommand::LoadPlaylist {
            tracks: tracks(&["a", "b", "c"]),
            start: 1,
        })
        .await
        .unwrap();
    harness
        .handle
        .send(SessionCommand::Delete(0))
        .await
        .unwrap();
    harness.handle.send(SessionCommand::ShowList).await.unwrap();

    let event = wait_for(&mut harness.events, |e| {
        matches!(e, SessionEvent::Playlist { .. })
    })
    .await;
    match event {
        SessionEvent::Playlist {
            tracks,
            current_index,
        } => {
            let ids: Vec<&str> = tracks.iter().map(|t| t.id.as_str()).collect();
            assert_eq!(ids, vec!["b", "c"]);
            assert_eq!(current_index, Some(0));
        }
        other => panic!("unexpected event {other:?}"),
    }

    let event = wait_for(&mut harness.events, |e| {
        matches!(e, SessionEvent::Snapshot { .. })
    })
    .await;
    assert!(matches!(
        event,
        SessionEvent::Snapshot { state, .. } if state.list_visible
    ));

    let (_, device) = shutdown(harness).await;
    // Deleting a track before the current one must not reload it
    assert_eq!(device.loads().len(), 1);
}
