//! Start/progress/stop reporting to the catalog.
//!
//! Reports run as background tasks so playback never waits on the network.
//! At most one progress report is in flight; a newer one cancels the older,
//! and a superseded report never records its completion. Stop reports are
//! delivered at most once per track id until another track starts.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use playsync_model::{ItemId, MediaSourceId, ServerConfiguration};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::infra::services::{
    CachedView, CatalogService, ItemCache, PlayedState, ProgressReport,
    StopReport,
};

/// How a report request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    Delivered,
    /// Cancelled or superseded before it could take effect.
    Cancelled,
    /// Not sent, e.g. a repeated stop for the same track.
    Skipped,
    Failed(String),
}

/// Awaitable result of a report request.
#[derive(Debug)]
pub struct ReportHandle {
    outcome: Option<oneshot::Receiver<ReportOutcome>>,
}

impl ReportHandle {
    pub fn skipped() -> Self {
        Self { outcome: None }
    }

    pub async fn outcome(self) -> ReportOutcome {
        match self.outcome {
            None => ReportOutcome::Skipped,
            Some(rx) => rx.await.unwrap_or(ReportOutcome::Cancelled),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum StopGuard {
    Idle,
    InFlight(ItemId),
    Delivered(ItemId),
}

impl StopGuard {
    fn covers(&self, item_id: &ItemId) -> bool {
        match self {
            StopGuard::Idle => false,
            StopGuard::InFlight(id) | StopGuard::Delivered(id) => id == item_id,
        }
    }
}

#[derive(Debug)]
struct ReporterState {
    bounds: ServerConfiguration,
    progress_generation: u64,
    progress_token: Option<CancellationToken>,
    stop_guard: StopGuard,
    last_delivered_progress: Option<ProgressReport>,
    tasks: Vec<JoinHandle<()>>,
}

#[derive(Debug, Clone)]
pub struct ProgressReporter {
    catalog: Arc<dyn CatalogService>,
    cache: Arc<dyn ItemCache>,
    state: Arc<Mutex<ReporterState>>,
}

impl ProgressReporter {
    pub fn new(catalog: Arc<dyn CatalogService>, cache: Arc<dyn ItemCache>) -> Self {
        Self {
            catalog,
            cache,
            state: Arc::new(Mutex::new(ReporterState {
                bounds: ServerConfiguration::default(),
                progress_generation: 0,
                progress_token: None,
                stop_guard: StopGuard::Idle,
                last_delivered_progress: None,
                tasks: Vec::new(),
            })),
        }
    }

    pub fn set_resume_bounds(&self, bounds: ServerConfiguration) {
        self.state.lock().bounds = bounds;
    }

    pub fn resume_bounds(&self) -> ServerConfiguration {
        self.state.lock().bounds
    }

    /// Last progress report whose completion was recorded.
    pub fn last_delivered_progress(&self) -> Option<ProgressReport> {
        self.state.lock().last_delivered_progress.clone()
    }

    /// Whether a stop for `item_id` is in flight or already delivered.
    pub fn stop_reported(&self, item_id: &ItemId) -> bool {
        self.state.lock().stop_guard.covers(item_id)
    }

    /// Announce a new track and re-arm the stop guard.
    ///
    /// A stop still in flight for a different track keeps its guard.
    pub fn report_start(
        &self,
        item_id: &ItemId,
        media_source_id: &MediaSourceId,
        scope: CancellationToken,
    ) -> ReportHandle {
        let mut state = self.state.lock();
        state.stop_guard = match &state.stop_guard {
            StopGuard::InFlight(other) if other != item_id => {
                StopGuard::InFlight(other.clone())
            }
            _ => StopGuard::Idle,
        };

        let catalog = Arc::clone(&self.catalog);
        let item_id = item_id.clone();
        let media_source_id = media_source_id.clone();
        Self::spawn_tracked(&mut state, async move {
            let outcome = tokio::select! {
                biased;
                _ = scope.cancelled() => ReportOutcome::Cancelled,
                result = catalog.report_playback_start(&item_id, &media_source_id) => {
                    match result {
                        Ok(()) => ReportOutcome::Delivered,
                        Err(err) => ReportOutcome::Failed(err.to_string()),
                    }
                }
            };
            match &outcome {
                ReportOutcome::Delivered => {
                    log::debug!("[Progress] Reported start for {item_id}")
                }
                ReportOutcome::Failed(err) => {
                    log::warn!("[Progress] Start report for {item_id} failed: {err}")
                }
                _ => {}
            }
            outcome
        })
    }

    /// Send a progress report, superseding any pending one.
    pub fn report_progress(&self, report: ProgressReport) -> ReportHandle {
        let mut state = self.state.lock();
        if let Some(previous) = state.progress_token.take() {
            previous.cancel();
        }
        state.progress_generation += 1;
        let generation = state.progress_generation;
        let token = CancellationToken::new();
        state.progress_token = Some(token.clone());

        let catalog = Arc::clone(&self.catalog);
        let shared = Arc::clone(&self.state);
        Self::spawn_tracked(&mut state, async move {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => ReportOutcome::Cancelled,
                result = catalog.report_playback_progress(&report) => {
                    match result {
                        Ok(()) => ReportOutcome::Delivered,
                        Err(err) => ReportOutcome::Failed(err.to_string()),
                    }
                }
            };

            let mut state = shared.lock();
            let current = state.progress_generation == generation;
            if current {
                state.progress_token = None;
            }
            match outcome {
                ReportOutcome::Delivered if current => {
                    log::trace!(
                        "[Progress] {} at {:.1}s (paused: {})",
                        report.item_id,
                        report.position_seconds,
                        report.is_paused
                    );
                    state.last_delivered_progress = Some(report);
                    ReportOutcome::Delivered
                }
                ReportOutcome::Delivered => {
                    log::trace!("[Progress] Discarding superseded report");
                    ReportOutcome::Cancelled
                }
                ReportOutcome::Failed(err) if current => {
                    log::warn!("[Progress] Progress report failed: {err}");
                    ReportOutcome::Failed(err)
                }
                ReportOutcome::Failed(_) => ReportOutcome::Cancelled,
                other => other,
            }
        })
    }

    /// Cancel the pending progress report, if any.
    pub fn cancel_pending_progress(&self) {
        let mut state = self.state.lock();
        if let Some(token) = state.progress_token.take() {
            token.cancel();
        }
        state.progress_generation += 1;
    }

    /// Report that a track stopped playing.
    ///
    /// A repeat for the id whose stop is in flight or delivered is skipped.
    /// A failed or cancelled stop does not count as delivered, so a later
    /// stop for the same id is sent again.
    pub fn report_stopped(
        &self,
        report: StopReport,
        scope: Option<CancellationToken>,
    ) -> ReportHandle {
        let mut state = self.state.lock();
        if state.stop_guard.covers(&report.item_id) {
            log::debug!(
                "[Progress] Stop for {} already reported, skipping",
                report.item_id
            );
            return ReportHandle::skipped();
        }

        if let Some(token) = state.progress_token.take() {
            token.cancel();
        }
        state.progress_generation += 1;
        state.stop_guard = StopGuard::InFlight(report.item_id.clone());

        let scope = scope.unwrap_or_default();
        let catalog = Arc::clone(&self.catalog);
        let cache = Arc::clone(&self.cache);
        let shared = Arc::clone(&self.state);
        Self::spawn_tracked(&mut state, async move {
            let outcome = tokio::select! {
                biased;
                _ = scope.cancelled() => ReportOutcome::Cancelled,
                result = catalog.report_playback_stopped(&report) => {
                    match result {
                        Ok(()) => ReportOutcome::Delivered,
                        Err(err) => ReportOutcome::Failed(err.to_string()),
                    }
                }
            };

            let delivered = outcome == ReportOutcome::Delivered;
            let bounds = {
                let mut state = shared.lock();
                if state.stop_guard == StopGuard::InFlight(report.item_id.clone()) {
                    state.stop_guard = if delivered {
                        StopGuard::Delivered(report.item_id.clone())
                    } else {
                        StopGuard::Idle
                    };
                }
                state.bounds
            };

            match &outcome {
                ReportOutcome::Delivered => {
                    log::info!(
                        "[Progress] Reported stop for {} at {:.1}s",
                        report.item_id,
                        report.position_seconds
                    );
                    refresh_cached_views(cache.as_ref(), &report, &bounds);
                }
                ReportOutcome::Failed(err) => {
                    log::warn!(
                        "[Progress] Stop report for {} failed: {err}",
                        report.item_id
                    );
                }
                ReportOutcome::Cancelled => {
                    log::debug!(
                        "[Progress] Stop report for {} cancelled",
                        report.item_id
                    );
                }
                ReportOutcome::Skipped => {}
            }
            outcome
        })
    }

    /// Wait for every report spawned so far to finish.
    pub async fn settle(&self) {
        loop {
            let tasks = std::mem::take(&mut self.state.lock().tasks);
            if tasks.is_empty() {
                break;
            }
            for task in tasks {
                if let Err(err) = task.await {
                    log::warn!("[Progress] Report task failed: {err}");
                }
            }
        }
    }

    fn spawn_tracked<F>(state: &mut ReporterState, report: F) -> ReportHandle
    where
        F: Future<Output = ReportOutcome> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let _ = tx.send(report.await);
        });
        state.tasks.retain(|task| !task.is_finished());
        state.tasks.push(task);
        ReportHandle { outcome: Some(rx) }
    }
}

/// Played state implied by stopping at `position_ticks`.
///
/// Past the maximum resume percentage the item is complete; below the
/// minimum it restarts from zero next time. Unknown totals yield `None`.
pub fn played_state(
    position_ticks: i64,
    total_ticks: Option<i64>,
    bounds: &ServerConfiguration,
) -> Option<PlayedState> {
    let total = total_ticks.filter(|t| *t > 0)?;
    let percentage =
        (position_ticks.max(0) as f64 * 100.0 / total as f64).min(100.0);

    let state = if percentage > bounds.max_resume_pct {
        PlayedState {
            position_ticks: 0,
            played: true,
            played_percentage: 100.0,
        }
    } else if percentage < bounds.min_resume_pct {
        PlayedState {
            position_ticks: 0,
            played: false,
            played_percentage: 0.0,
        }
    } else {
        PlayedState {
            position_ticks: position_ticks.max(0),
            played: false,
            played_percentage: percentage,
        }
    };
    Some(state)
}

fn refresh_cached_views(
    cache: &dyn ItemCache,
    report: &StopReport,
    bounds: &ServerConfiguration,
) {
    if let Some(state) =
        played_state(report.position_ticks(), report.total_ticks, bounds)
    {
        cache.apply_played_state(&report.item_id, &state);
    }

    cache.invalidate(CachedView::Item(report.item_id.clone()));
    if let Some(series_id) = &report.series_id {
        cache.invalidate(CachedView::Series(series_id.clone()));
    }
    cache.invalidate(CachedView::RecentlyPlayed);
    cache.invalidate(CachedView::NextUp);
    cache.invalidate(CachedView::NextEpisode);
}

#[cfg(test)]
mod tests {
    use super::*;
    use playsync_model::TICKS_PER_SECOND;

    const HOUR: i64 = 3_600 * TICKS_PER_SECOND;

    #[test]
    fn finishing_marks_played() {
        let state = played_state(HOUR * 97 / 100, Some(HOUR), &Default::default())
            .unwrap();
        assert!(state.played);
        assert_eq!(state.position_ticks, 0);
    }

    #[test]
    fn barely_started_resets_position() {
        let state = played_state(HOUR / 100, Some(HOUR), &Default::default())
            .unwrap();
        assert!(!state.played);
        assert_eq!(state.position_ticks, 0);
    }

    #[test]
    fn midway_keeps_position() {
        let state = played_state(HOUR / 2, Some(HOUR), &Default::default())
            .unwrap();
        assert!(!state.played);
        assert_eq!(state.position_ticks, HOUR / 2);
        assert_eq!(state.played_percentage, 50.0);
    }

    #[test]
    fn unknown_total_has_no_played_state() {
        assert!(played_state(HOUR, None, &Default::default()).is_none());
    }
}
