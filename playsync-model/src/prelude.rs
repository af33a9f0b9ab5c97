//! Convenience re-exports for consumers of the playback model.

pub use crate::error::{ModelError, Result as ModelResult};
pub use crate::ids::{ItemId, MediaSourceId};
pub use crate::item::{ContentItem, MediaSourceInfo, UserData};
pub use crate::now_playing::NowPlayingMetadata;
pub use crate::server::ServerConfiguration;
pub use crate::ticks::{TICKS_PER_SECOND, seconds_to_ticks, ticks_to_seconds};
pub use crate::track::{Track, TrackKind};
