//! Test doubles for the session's collaborators.
//!
//! Shared by unit tests and the integration tests under `tests/`.

pub mod stubs;

pub use stubs::{
    CatalogCall, EngineCall, RecordingEngine, RecordingMediaSession,
    StubCatalog,
};
