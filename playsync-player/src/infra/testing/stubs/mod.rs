pub mod catalog;
pub mod engine;
pub mod media_session;

pub use catalog::{CatalogCall, StubCatalog};
pub use engine::{EngineCall, RecordingEngine};
pub use media_session::RecordingMediaSession;
