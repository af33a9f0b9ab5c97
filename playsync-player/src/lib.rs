//! Playback session synchronization between an mpv engine and a
//! Jellyfin-compatible media server.

pub mod domains;
pub mod error;
pub mod infra;

pub use error::{PlayerError, Result};
