//! Session event loop tests
//!
//! Run on paused tokio time so the ten second progress interval and the
//! one second countdown tick deterministically.

mod common;

use std::time::Duration;

use common::{Harness, movie};
use playsync_model::ItemId;
use playsync_player::domains::player::autoplay::AutoplayState;
use playsync_player::domains::player::{
    PlaybackSnapshot, PlaybackState, SessionCommand, spawn_session,
};
use playsync_player::infra::engine::PropertyValue;
use playsync_player::infra::testing::EngineCall;
use tokio::sync::watch;

async fn wait_for(
    snapshots: &mut watch::Receiver<PlaybackSnapshot>,
    predicate: impl FnMut(&PlaybackSnapshot) -> bool,
) {
    tokio::time::timeout(Duration::from_secs(60), snapshots.wait_for(predicate))
        .await
        .expect("snapshot condition reached")
        .expect("session still running");
}

#[tokio::test(start_paused = true)]
async fn progress_is_reported_on_the_interval_while_playing() {
    let harness = Harness::new();
    let (handle, session) = spawn_session(harness.ready().await);
    let mut snapshots = handle.watch();

    handle.play_track(movie("a", 3_600, 0), None).await.unwrap();
    wait_for(&mut snapshots, |s| s.session.has_track()).await;

    harness.engine.emit("duration", PropertyValue::Double(3_600.0));
    harness.engine.emit("time-pos", PropertyValue::Double(5.0));
    harness.engine.emit("pause", PropertyValue::Flag(false));
    wait_for(&mut snapshots, |s| s.state == PlaybackState::Playing).await;

    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_eq!(harness.catalog.progress_reports().len(), 2);

    handle.toggle_play_pause().await.unwrap();
    wait_for(&mut snapshots, |s| s.state == PlaybackState::Paused).await;
    tokio::time::sleep(Duration::from_millis(1)).await;
    let after_pause = harness.catalog.progress_reports().len();

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(harness.catalog.progress_reports().len(), after_pause);

    handle.shutdown().await.unwrap();
    session.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn shutdown_flushes_the_final_stop() {
    let harness = Harness::new();
    let (handle, session) = spawn_session(harness.ready().await);
    let mut snapshots = handle.watch();

    handle.play_track(movie("a", 3_600, 0), None).await.unwrap();
    wait_for(&mut snapshots, |s| s.session.has_track()).await;
    harness.engine.emit("time-pos", PropertyValue::Double(90.0));
    wait_for(&mut snapshots, |s| s.session.time_position == 90.0).await;

    handle.shutdown().await.unwrap();
    session.await.unwrap();

    let stops = harness.catalog.stop_reports();
    assert_eq!(stops.len(), 1);
    assert_eq!(stops[0].item_id, ItemId::from("a"));
    assert_eq!(harness.catalog.starts(), vec![ItemId::from("a")]);
    assert!(harness.engine.calls().contains(&EngineCall::Shutdown));
    assert!(!harness.engine.is_observed());
}

#[tokio::test(start_paused = true)]
async fn dropping_every_handle_ends_the_session() {
    let harness = Harness::new();
    let (handle, session) = spawn_session(harness.ready().await);

    drop(handle);
    session.await.unwrap();

    assert!(harness.engine.calls().contains(&EngineCall::Shutdown));
}

#[tokio::test(start_paused = true)]
async fn countdown_advances_each_second_and_plays_next() {
    let harness = Harness::new();
    let (handle, session) = spawn_session(harness.ready().await);
    let mut snapshots = handle.watch();

    handle.play_track(movie("a", 100, 0), None).await.unwrap();
    wait_for(&mut snapshots, |s| s.session.has_track()).await;
    harness.engine.emit("duration", PropertyValue::Double(100.0));
    harness.engine.emit("time-pos", PropertyValue::Double(90.0));
    harness.engine.emit("pause", PropertyValue::Flag(false));
    wait_for(&mut snapshots, |s| s.session.time_position == 90.0).await;

    handle
        .send(SessionCommand::SetNextItem(Some(movie("b", 100, 0))))
        .await
        .unwrap();
    wait_for(&mut snapshots, |s| {
        matches!(s.autoplay, AutoplayState::CountingDown(_))
    })
    .await;

    wait_for(&mut snapshots, |s| {
        s.session.current_item_id() == Some(&ItemId::from("b"))
    })
    .await;

    handle.shutdown().await.unwrap();
    session.await.unwrap();
    assert_eq!(harness.catalog.stop_reports()[0].item_id, ItemId::from("a"));
}

#[tokio::test(start_paused = true)]
async fn failed_commands_keep_the_session_alive() {
    let harness = Harness::new();
    let (handle, session) = spawn_session(harness.ready().await);
    let mut snapshots = handle.watch();

    handle.send(SessionCommand::Seek(-5.0)).await.unwrap();
    handle.send(SessionCommand::SetSpeed(0.0)).await.unwrap();
    handle.send(SessionCommand::SetVolume(30.0)).await.unwrap();
    harness.engine.emit("volume", PropertyValue::Double(30.0));
    wait_for(&mut snapshots, |s| s.session.volume == 30.0).await;

    handle.shutdown().await.unwrap();
    session.await.unwrap();
    assert!(
        harness
            .engine
            .property_writes("volume")
            .contains(&PropertyValue::Double(30.0))
    );
}

#[tokio::test(start_paused = true)]
async fn switching_items_drops_a_running_countdown() {
    let harness = Harness::new();
    let (handle, session) = spawn_session(harness.ready().await);
    let mut snapshots = handle.watch();

    handle.play_track(movie("a", 100, 0), None).await.unwrap();
    wait_for(&mut snapshots, |s| s.session.has_track()).await;
    harness.engine.emit("duration", PropertyValue::Double(100.0));
    harness.engine.emit("time-pos", PropertyValue::Double(90.0));
    harness.engine.emit("pause", PropertyValue::Flag(false));
    wait_for(&mut snapshots, |s| s.session.time_position == 90.0).await;

    handle
        .send(SessionCommand::SetNextItem(Some(movie("b", 100, 0))))
        .await
        .unwrap();
    wait_for(&mut snapshots, |s| {
        matches!(s.autoplay, AutoplayState::CountingDown(_))
    })
    .await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    handle.play_track(movie("c", 3_600, 0), None).await.unwrap();
    wait_for(&mut snapshots, |s| {
        s.session.current_item_id() == Some(&ItemId::from("c"))
            && s.autoplay == AutoplayState::Hidden
    })
    .await;

    tokio::time::sleep(Duration::from_secs(30)).await;
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.session.current_item_id(), Some(&ItemId::from("c")));
    assert_eq!(snapshot.autoplay, AutoplayState::Hidden);
    assert!(snapshot.next_item.is_none());

    handle.shutdown().await.unwrap();
    session.await.unwrap();
    assert!(!harness.catalog.starts().contains(&ItemId::from("b")));
}

#[tokio::test(start_paused = true)]
async fn progress_timer_stops_once_the_track_is_cleared() {
    let harness = Harness::new();
    let (handle, session) = spawn_session(harness.ready().await);
    let mut snapshots = handle.watch();

    handle.play_track(movie("a", 3_600, 0), None).await.unwrap();
    wait_for(&mut snapshots, |s| s.session.has_track()).await;
    harness.engine.emit("duration", PropertyValue::Double(3_600.0));
    harness.engine.emit("time-pos", PropertyValue::Double(5.0));
    harness.engine.emit("pause", PropertyValue::Flag(false));
    wait_for(&mut snapshots, |s| s.state == PlaybackState::Playing).await;

    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(harness.catalog.progress_reports().len(), 1);

    handle.clear_current_track().await.unwrap();
    wait_for(&mut snapshots, |s| !s.session.has_track()).await;
    harness.engine.emit("pause", PropertyValue::Flag(false));
    tokio::time::sleep(Duration::from_millis(1)).await;
    let after_clear = harness.catalog.progress_reports().len();

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(harness.catalog.progress_reports().len(), after_clear);
    assert_eq!(harness.catalog.stop_reports().len(), 1);

    handle.shutdown().await.unwrap();
    session.await.unwrap();
}
