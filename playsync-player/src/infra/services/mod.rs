// Service seams the playback session depends on

pub mod cache;
pub mod catalog;
pub mod media_session;
pub mod offline;

pub use cache::{CachedView, ItemCache, MemoryItemCache, PlayedState};
pub use catalog::{CatalogService, ProgressReport, StopReport};
pub use media_session::{MediaSessionSurface, NoopMediaSession};
pub use offline::{DirectoryOfflineStore, OfflineStore, StaticOfflineStore};
