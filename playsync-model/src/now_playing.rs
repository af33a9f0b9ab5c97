use crate::item::ContentItem;
use url::Url;

/// Metadata announced to the platform's now-playing surface.
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlayingMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub artwork: Option<Url>,
}

impl NowPlayingMetadata {
    pub fn from_item(item: &ContentItem, artwork: Option<Url>) -> Self {
        let artist = if !item.artists.is_empty() {
            item.artists.join(", ")
        } else {
            item.album_artist
                .clone()
                .or_else(|| item.series_name.clone())
                .unwrap_or_else(|| "Unknown Artist".to_string())
        };

        Self {
            title: item
                .name
                .clone()
                .unwrap_or_else(|| "Unknown Track".to_string()),
            artist,
            album: item
                .album
                .clone()
                .unwrap_or_else(|| "Unknown Album".to_string()),
            artwork,
        }
    }
}
