use crate::ids::{ItemId, MediaSourceId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Per-user playback state the server keeps for an item.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "PascalCase", default))]
pub struct UserData {
    pub playback_position_ticks: i64,
    pub played: bool,
    pub played_percentage: Option<f64>,
}

/// One alternate file/encoding of an item
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "PascalCase"))]
pub struct MediaSourceInfo {
    pub id: MediaSourceId,
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub run_time_ticks: Option<i64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub bitrate: Option<u64>,
}

/// Catalog item as far as playback is concerned.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "PascalCase"))]
pub struct ContentItem {
    pub id: ItemId,
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub series_id: Option<ItemId>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub series_name: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub album: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub album_artist: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub artists: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub index_number: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub parent_index_number: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub run_time_ticks: Option<i64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub user_data: UserData,
    #[cfg_attr(feature = "serde", serde(default))]
    pub media_sources: Vec<MediaSourceInfo>,
}

impl ContentItem {
    pub fn new(id: impl Into<ItemId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            series_id: None,
            series_name: None,
            album: None,
            album_artist: None,
            artists: Vec::new(),
            index_number: None,
            parent_index_number: None,
            run_time_ticks: None,
            user_data: UserData::default(),
            media_sources: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_run_time_ticks(mut self, ticks: i64) -> Self {
        self.run_time_ticks = Some(ticks);
        self
    }

    pub fn with_position_ticks(mut self, ticks: i64) -> Self {
        self.user_data.playback_position_ticks = ticks;
        self
    }

    /// Total length for the given source, falling back to the item.
    pub fn run_time_ticks_for(&self, source: &MediaSourceId) -> Option<i64> {
        self.media_sources
            .iter()
            .find(|s| &s.id == source)
            .and_then(|s| s.run_time_ticks)
            .or(self.run_time_ticks)
            .filter(|ticks| *ticks > 0)
    }

    /// Short episode marker like `S1E4`, `Episode 4` or `Season 1`.
    pub fn episode_label(&self) -> Option<String> {
        match (self.parent_index_number, self.index_number) {
            (Some(season), Some(episode)) => Some(format!("S{season}E{episode}")),
            (None, Some(episode)) => Some(format!("Episode {episode}")),
            (Some(season), None) => Some(format!("Season {season}")),
            (None, None) => None,
        }
    }
}
