use std::fmt::Debug;

use playsync_model::NowPlayingMetadata;

/// OS-level "now playing" surface (lock screen, media keys).
///
/// Actions coming back from the platform (play, pause, seek) enter the
/// session as [`crate::domains::player::messages::SessionCommand`]s.
pub trait MediaSessionSurface: Send + Sync + Debug {
    /// Publish metadata for the current track, or clear it with `None`.
    fn set_metadata(&self, metadata: Option<NowPlayingMetadata>);

    fn set_playing(&self, _playing: bool) {}
}

/// Surface for platforms without media controls.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMediaSession;

impl MediaSessionSurface for NoopMediaSession {
    fn set_metadata(&self, metadata: Option<NowPlayingMetadata>) {
        if let Some(metadata) = metadata {
            log::trace!("[MediaSession] now playing: {}", metadata.title);
        }
    }
}
