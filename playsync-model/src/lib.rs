//! Core data model definitions shared across playsync crates.
#![allow(missing_docs)]

pub mod error;
pub mod ids;
pub mod item;
pub mod now_playing;
pub mod prelude;
pub mod server;
pub mod ticks;
pub mod track;

// Intentionally curated re-exports for downstream consumers.
pub use error::{ModelError, Result as ModelResult};
pub use ids::{ItemId, MediaSourceId};
pub use item::{ContentItem, MediaSourceInfo, UserData};
pub use now_playing::NowPlayingMetadata;
pub use server::ServerConfiguration;
pub use ticks::{TICKS_PER_SECOND, seconds_to_ticks, ticks_to_seconds};
pub use track::{Track, TrackKind};
