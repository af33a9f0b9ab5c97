#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Kind of a selectable stream as reported by the engine's track list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TrackKind {
    Video,
    Audio,
    Sub,
    #[cfg_attr(feature = "serde", serde(other))]
    Unknown,
}

/// Entry of the engine track list. `id` is engine-local and only stable
/// for the same file.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Track {
    pub id: i64,
    #[cfg_attr(feature = "serde", serde(rename = "ff-index", default))]
    pub ff_index: Option<i64>,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: TrackKind,
    #[cfg_attr(feature = "serde", serde(default))]
    pub title: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub lang: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub selected: Option<bool>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub codec: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "demux-channel-count", default)
    )]
    pub channels: Option<i64>,
}

impl Track {
    pub fn new(id: i64, kind: TrackKind) -> Self {
        Self {
            id,
            ff_index: None,
            kind,
            title: None,
            lang: None,
            selected: None,
            codec: None,
            channels: None,
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn selected(mut self) -> Self {
        self.selected = Some(true);
        self
    }

    pub fn is_selected(&self) -> bool {
        self.selected.unwrap_or(false)
    }
}
