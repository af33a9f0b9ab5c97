use parking_lot::Mutex;
use playsync_model::NowPlayingMetadata;

use crate::infra::services::MediaSessionSurface;

/// Media session surface that keeps what it was last told.
#[derive(Debug, Default)]
pub struct RecordingMediaSession {
    metadata: Mutex<Option<NowPlayingMetadata>>,
    playing: Mutex<Option<bool>>,
}

impl RecordingMediaSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metadata(&self) -> Option<NowPlayingMetadata> {
        self.metadata.lock().clone()
    }

    pub fn playing(&self) -> Option<bool> {
        *self.playing.lock()
    }
}

impl MediaSessionSurface for RecordingMediaSession {
    fn set_metadata(&self, metadata: Option<NowPlayingMetadata>) {
        *self.metadata.lock() = metadata;
    }

    fn set_playing(&self, playing: bool) {
        *self.playing.lock() = Some(playing);
    }
}
