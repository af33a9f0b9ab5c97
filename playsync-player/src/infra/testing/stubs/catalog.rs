use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use playsync_model::{ItemId, MediaSourceId, ServerConfiguration};
use tokio::sync::Notify;
use url::Url;

use crate::error::{PlayerError, Result};
use crate::infra::services::{CatalogService, ProgressReport, StopReport};

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogCall {
    Start {
        item_id: ItemId,
        media_source_id: MediaSourceId,
    },
    Progress(ProgressReport),
    Stopped(StopReport),
    ServerConfiguration,
}

/// Holds requests until opened.
#[derive(Debug, Default)]
struct Gate {
    closed: AtomicBool,
    notify: Notify,
}

impl Gate {
    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn open(&self) {
        self.closed.store(false, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    async fn pass(&self) {
        loop {
            let notified = self.notify.notified();
            if !self.closed.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }
}

/// In-memory catalog recording every report.
///
/// Progress and stop requests can be held open to exercise cancellation,
/// and stop reports can be made to fail.
#[derive(Debug)]
pub struct StubCatalog {
    calls: Mutex<Vec<CatalogCall>>,
    configuration: Mutex<Option<ServerConfiguration>>,
    progress_gate: Gate,
    stop_gate: Gate,
    fail_stops: AtomicBool,
}

impl Default for StubCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl StubCatalog {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            configuration: Mutex::new(Some(ServerConfiguration::default())),
            progress_gate: Gate::default(),
            stop_gate: Gate::default(),
            fail_stops: AtomicBool::new(false),
        }
    }

    /// Server configuration to hand out; `None` makes the request fail.
    pub fn set_configuration(&self, configuration: Option<ServerConfiguration>) {
        *self.configuration.lock() = configuration;
    }

    pub fn hold_progress(&self) {
        self.progress_gate.close();
    }

    pub fn release_progress(&self) {
        self.progress_gate.open();
    }

    pub fn hold_stops(&self) {
        self.stop_gate.close();
    }

    pub fn release_stops(&self) {
        self.stop_gate.open();
    }

    pub fn fail_stops(&self, fail: bool) {
        self.fail_stops.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<CatalogCall> {
        self.calls.lock().clone()
    }

    pub fn starts(&self) -> Vec<ItemId> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                CatalogCall::Start { item_id, .. } => Some(item_id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn progress_reports(&self) -> Vec<ProgressReport> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                CatalogCall::Progress(report) => Some(report.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn stop_reports(&self) -> Vec<StopReport> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                CatalogCall::Stopped(report) => Some(report.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: CatalogCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl CatalogService for StubCatalog {
    async fn report_playback_start(
        &self,
        item_id: &ItemId,
        media_source_id: &MediaSourceId,
    ) -> Result<()> {
        self.record(CatalogCall::Start {
            item_id: item_id.clone(),
            media_source_id: media_source_id.clone(),
        });
        Ok(())
    }

    async fn report_playback_progress(
        &self,
        report: &ProgressReport,
    ) -> Result<()> {
        self.record(CatalogCall::Progress(report.clone()));
        self.progress_gate.pass().await;
        Ok(())
    }

    async fn report_playback_stopped(&self, report: &StopReport) -> Result<()> {
        self.record(CatalogCall::Stopped(report.clone()));
        self.stop_gate.pass().await;
        if self.fail_stops.load(Ordering::SeqCst) {
            return Err(PlayerError::Catalog("injected stop failure".to_string()));
        }
        Ok(())
    }

    async fn server_configuration(&self) -> Result<ServerConfiguration> {
        self.record(CatalogCall::ServerConfiguration);
        let configuration = *self.configuration.lock();
        configuration.ok_or_else(|| {
            PlayerError::Catalog("configuration unavailable".to_string())
        })
    }

    fn stream_url(
        &self,
        item_id: &ItemId,
        max_bitrate: u64,
        media_source_id: &MediaSourceId,
    ) -> Result<Url> {
        let mut url =
            Url::parse(&format!("http://catalog.test/Videos/{item_id}/stream"))?;
        url.query_pairs_mut()
            .append_pair("MediaSourceId", media_source_id.as_str())
            .append_pair("MaxStreamingBitrate", &max_bitrate.to_string());
        Ok(url)
    }
}
