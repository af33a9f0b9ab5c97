//! Catalog service trait
//!
//! Server-side playback reporting and stream addressing. The Jellyfin HTTP
//! client in [`crate::infra::api_client`] is the production implementation.

use std::fmt::Debug;

use async_trait::async_trait;
use playsync_model::{
    ContentItem, ItemId, MediaSourceId, ServerConfiguration, seconds_to_ticks,
};
use url::Url;

use crate::error::Result;

/// Periodic "still watching" report.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    pub item_id: ItemId,
    pub media_source_id: MediaSourceId,
    pub position_seconds: f64,
    pub is_paused: bool,
}

impl ProgressReport {
    pub fn position_ticks(&self) -> i64 {
        seconds_to_ticks(self.position_seconds)
    }
}

/// Final report for a track that is no longer playing.
#[derive(Debug, Clone, PartialEq)]
pub struct StopReport {
    pub item_id: ItemId,
    pub media_source_id: MediaSourceId,
    pub series_id: Option<ItemId>,
    pub position_seconds: f64,
    /// Item length when known, used to recompute played state locally.
    pub total_ticks: Option<i64>,
}

impl StopReport {
    pub fn position_ticks(&self) -> i64 {
        seconds_to_ticks(self.position_seconds)
    }
}

#[async_trait]
pub trait CatalogService: Send + Sync + Debug {
    async fn report_playback_start(
        &self,
        item_id: &ItemId,
        media_source_id: &MediaSourceId,
    ) -> Result<()>;

    async fn report_playback_progress(
        &self,
        report: &ProgressReport,
    ) -> Result<()>;

    async fn report_playback_stopped(&self, report: &StopReport) -> Result<()>;

    /// Resume thresholds configured on the server.
    async fn server_configuration(&self) -> Result<ServerConfiguration>;

    /// Direct stream address for an item.
    fn stream_url(
        &self,
        item_id: &ItemId,
        max_bitrate: u64,
        media_source_id: &MediaSourceId,
    ) -> Result<Url>;

    /// Artwork shown by the OS media controls.
    fn image_url(&self, _item: &ContentItem) -> Option<Url> {
        None
    }
}
