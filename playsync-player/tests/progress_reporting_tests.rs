//! Progress reporter tests
//!
//! Stop de-duplication and retry, progress supersession, cache refresh after
//! a stop, and cancellation of in-flight reports by track changes.

mod common;

use std::sync::Arc;

use common::{Harness, movie, start_playing, ticks};
use playsync_model::{ItemId, MediaSourceId, UserData};
use playsync_player::domains::player::progress::{
    ProgressReporter, ReportOutcome,
};
use playsync_player::infra::services::{
    CachedView, MemoryItemCache, ProgressReport, StopReport,
};
use playsync_player::infra::testing::StubCatalog;
use tokio_util::sync::CancellationToken;

fn reporter() -> (ProgressReporter, Arc<StubCatalog>, Arc<MemoryItemCache>) {
    let catalog = Arc::new(StubCatalog::new());
    let cache = Arc::new(MemoryItemCache::new());
    (
        ProgressReporter::new(catalog.clone(), cache.clone()),
        catalog,
        cache,
    )
}

fn progress(id: &str, position: f64) -> ProgressReport {
    ProgressReport {
        item_id: ItemId::from(id),
        media_source_id: MediaSourceId::from(id),
        position_seconds: position,
        is_paused: false,
    }
}

fn stop(id: &str, position: i64, total: i64) -> StopReport {
    StopReport {
        item_id: ItemId::from(id),
        media_source_id: MediaSourceId::from(id),
        series_id: Some(ItemId::from("series")),
        position_seconds: position as f64,
        total_ticks: Some(ticks(total)),
    }
}

#[tokio::test]
async fn stop_is_reported_once_per_track() {
    let (reporter, catalog, _) = reporter();

    let first = reporter.report_stopped(stop("a", 60, 3_600), None);
    let second = reporter.report_stopped(stop("a", 61, 3_600), None);

    assert_eq!(first.outcome().await, ReportOutcome::Delivered);
    assert_eq!(second.outcome().await, ReportOutcome::Skipped);
    assert_eq!(catalog.stop_reports().len(), 1);
    assert!(reporter.stop_reported(&ItemId::from("a")));
}

#[tokio::test]
async fn a_new_start_rearms_the_stop_guard() {
    let (reporter, catalog, _) = reporter();

    let _ = reporter.report_stopped(stop("a", 60, 3_600), None).outcome().await;
    let _ = reporter
        .report_start(
            &ItemId::from("a"),
            &MediaSourceId::from("a"),
            CancellationToken::new(),
        )
        .outcome()
        .await;
    let again = reporter.report_stopped(stop("a", 90, 3_600), None);

    assert_eq!(again.outcome().await, ReportOutcome::Delivered);
    assert_eq!(catalog.stop_reports().len(), 2);
}

#[tokio::test]
async fn failed_stop_can_be_retried() {
    let (reporter, catalog, cache) = reporter();
    catalog.fail_stops(true);

    let failed = reporter.report_stopped(stop("a", 60, 3_600), None);
    assert!(matches!(failed.outcome().await, ReportOutcome::Failed(_)));
    assert!(!reporter.stop_reported(&ItemId::from("a")));
    assert!(cache.take_invalidated().is_empty());

    catalog.fail_stops(false);
    let retried = reporter.report_stopped(stop("a", 60, 3_600), None);
    assert_eq!(retried.outcome().await, ReportOutcome::Delivered);
    assert_eq!(catalog.stop_reports().len(), 2);
}

#[tokio::test]
async fn stop_in_flight_blocks_a_duplicate() {
    let (reporter, catalog, _) = reporter();
    catalog.hold_stops();

    let first = reporter.report_stopped(stop("a", 60, 3_600), None);
    let duplicate = reporter.report_stopped(stop("a", 60, 3_600), None);
    assert_eq!(duplicate.outcome().await, ReportOutcome::Skipped);

    catalog.release_stops();
    assert_eq!(first.outcome().await, ReportOutcome::Delivered);
}

#[tokio::test]
async fn cancelled_stop_does_not_count_as_delivered() {
    let (reporter, catalog, _) = reporter();
    catalog.hold_stops();
    let scope = CancellationToken::new();

    let handle = reporter.report_stopped(stop("a", 60, 3_600), Some(scope.clone()));
    scope.cancel();

    assert_eq!(handle.outcome().await, ReportOutcome::Cancelled);
    assert!(!reporter.stop_reported(&ItemId::from("a")));
}

#[tokio::test]
async fn superseded_progress_is_never_recorded() {
    let (reporter, catalog, _) = reporter();
    catalog.hold_progress();

    let older = reporter.report_progress(progress("a", 10.0));
    tokio::task::yield_now().await;
    let newer = reporter.report_progress(progress("a", 20.0));
    catalog.release_progress();

    assert_eq!(older.outcome().await, ReportOutcome::Cancelled);
    assert_eq!(newer.outcome().await, ReportOutcome::Delivered);
    assert_eq!(
        reporter.last_delivered_progress().map(|r| r.position_seconds),
        Some(20.0)
    );
}

#[tokio::test]
async fn stop_cancels_pending_progress() {
    let (reporter, catalog, _) = reporter();
    catalog.hold_progress();

    let pending = reporter.report_progress(progress("a", 10.0));
    let stopped = reporter.report_stopped(stop("a", 12, 3_600), None);

    assert_eq!(pending.outcome().await, ReportOutcome::Cancelled);
    assert_eq!(stopped.outcome().await, ReportOutcome::Delivered);
    assert!(reporter.last_delivered_progress().is_none());
}

#[tokio::test]
async fn delivered_stop_refreshes_cached_views() {
    let (reporter, _, cache) = reporter();
    cache.insert(ItemId::from("a"), UserData::default());

    let handle = reporter.report_stopped(stop("a", 3_500, 3_600), None);
    assert_eq!(handle.outcome().await, ReportOutcome::Delivered);

    let user_data = cache.user_data(&ItemId::from("a")).unwrap();
    assert!(user_data.played);
    assert_eq!(user_data.playback_position_ticks, 0);

    let invalidated = cache.take_invalidated();
    for view in [
        CachedView::Item(ItemId::from("a")),
        CachedView::Series(ItemId::from("series")),
        CachedView::RecentlyPlayed,
        CachedView::NextUp,
        CachedView::NextEpisode,
    ] {
        assert!(invalidated.contains(&view), "missing {view:?}");
    }
}

#[tokio::test]
async fn midway_stop_keeps_the_resume_point() {
    let (reporter, _, cache) = reporter();

    let _ = reporter.report_stopped(stop("a", 1_800, 3_600), None).outcome().await;

    let user_data = cache.user_data(&ItemId::from("a")).unwrap();
    assert!(!user_data.played);
    assert_eq!(user_data.playback_position_ticks, ticks(1_800));
    assert_eq!(user_data.played_percentage, Some(50.0));
}

#[tokio::test]
async fn switching_away_cancels_the_start_report() {
    let harness = Harness::new();
    let mut controller = harness.ready().await;

    // Neither start gets a chance to run before the switch.
    controller.play_track(movie("a", 3_600, 0), None).await.unwrap();
    controller.play_track(movie("b", 3_600, 0), None).await.unwrap();
    controller.reporter().settle().await;

    assert_eq!(harness.catalog.starts(), vec![ItemId::from("b")]);
}

#[tokio::test]
async fn a_second_switch_cancels_the_first_outgoing_stop() {
    let harness = Harness::new();
    let mut controller = harness.ready().await;
    harness.catalog.hold_stops();

    controller.play_track(movie("a", 3_600, 0), None).await.unwrap();
    start_playing(&mut controller, 3_600.0, 300.0).await;
    controller.play_track(movie("b", 3_600, 0), None).await.unwrap();
    start_playing(&mut controller, 3_600.0, 400.0).await;
    assert!(controller.reporter().stop_reported(&ItemId::from("a")));

    controller.play_track(movie("c", 3_600, 0), None).await.unwrap();
    harness.catalog.release_stops();
    controller.reporter().settle().await;

    assert!(!controller.reporter().stop_reported(&ItemId::from("a")));
    assert!(controller.reporter().stop_reported(&ItemId::from("b")));
    assert!(controller.session().is_current(&ItemId::from("c")));
}

#[tokio::test]
async fn progress_tick_only_runs_while_playing() {
    let harness = Harness::new();
    let mut controller = harness.ready().await;
    assert!(controller.progress_tick().is_none());

    controller.play_track(movie("a", 3_600, 0), None).await.unwrap();
    assert!(controller.progress_tick().is_none(), "still loading");

    start_playing(&mut controller, 3_600.0, 30.0).await;
    let handle = controller.progress_tick().unwrap();
    assert_eq!(handle.outcome().await, ReportOutcome::Delivered);

    let reports = harness.catalog.progress_reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].position_ticks(), ticks(30));
    assert!(!reports[0].is_paused);
}
