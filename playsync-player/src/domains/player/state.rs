use std::time::{Duration, Instant};

use playsync_model::{ContentItem, MediaSourceId, Track};

use super::autoplay::AutoplayState;
use crate::infra::constants::player::{DEFAULT_VOLUME, TRACK_NOTIFICATION_DURATION};

/// Live playback state mirrored from the engine plus session bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    // Current media
    pub current_track: Option<ContentItem>,
    pub current_media_source_id: Option<MediaSourceId>,

    // Lifecycle
    pub is_initialized: bool,
    pub is_pending: bool,
    pub video_loaded: bool,

    // Engine-reported playback state
    pub is_paused: bool,
    pub time_position: f64,
    pub duration: f64,
    pub volume: f64,
    pub speed: f64,
    pub is_fullscreen: bool,
    pub is_buffering: bool,
    pub cache_duration: f64,
    pub eof_reached: bool,

    // Track selection
    pub subtitle_tracks: Vec<Track>,
    pub audio_tracks: Vec<Track>,
    pub current_subtitle_id: Option<i64>,
    pub current_audio_track_id: Option<i64>,
    // Saved choices are restored once per loaded track
    pub subtitle_restore_attempted: bool,
    pub audio_restore_attempted: bool,

    pub statistics: PlaybackStatistics,
    pub track_notification: Option<TrackNotification>,
    pub last_error: Option<PlaybackNotice>,
}

/// Stream details surfaced in the stats overlay.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackStatistics {
    pub video_codec: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub video_bitrate: Option<f64>,
    pub fps: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackNotification {
    pub message: String,
    pub show_time: Instant,
}

impl TrackNotification {
    pub fn new(message: impl Into<String>, show_time: Instant) -> Self {
        Self {
            message: message.into(),
            show_time,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.show_time) >= TRACK_NOTIFICATION_DURATION
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// Engine could not start; stays until the session is rebuilt.
    InitFailed,
    /// A track failed to load; the user may dismiss it.
    LoadFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackNotice {
    pub kind: NoticeKind,
    pub message: String,
}

impl PlaybackNotice {
    pub fn init_failed(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::InitFailed,
            message: message.into(),
        }
    }

    pub fn load_failed(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::LoadFailed,
            message: message.into(),
        }
    }

    pub fn is_dismissible(&self) -> bool {
        self.kind == NoticeKind::LoadFailed
    }
}

/// Coarse state for UI consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Loading,
    Playing,
    Paused,
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self {
            current_track: None,
            current_media_source_id: None,
            is_initialized: false,
            is_pending: false,
            video_loaded: false,
            is_paused: true,
            time_position: 0.0,
            duration: 0.0,
            volume: DEFAULT_VOLUME,
            speed: 1.0,
            is_fullscreen: false,
            is_buffering: false,
            cache_duration: 0.0,
            eof_reached: false,
            subtitle_tracks: Vec::new(),
            audio_tracks: Vec::new(),
            current_subtitle_id: None,
            current_audio_track_id: None,
            subtitle_restore_attempted: false,
            audio_restore_attempted: false,
            statistics: PlaybackStatistics::default(),
            track_notification: None,
            last_error: None,
        }
    }
}

impl PlaybackSession {
    /// Make `item` the current track and reset per-track state.
    ///
    /// The media source defaults to the item id, so a current track always
    /// has a source.
    pub fn begin_track(
        &mut self,
        item: ContentItem,
        media_source_id: Option<MediaSourceId>,
    ) {
        self.reset_track_state();
        let source =
            media_source_id.unwrap_or_else(|| MediaSourceId::from(&item.id));
        self.current_track = Some(item);
        self.current_media_source_id = Some(source);
        self.is_pending = true;
        self.last_error = None;
    }

    /// Drop the current track. Volume, speed and fullscreen carry over.
    pub fn clear_track(&mut self) {
        self.reset_track_state();
        self.current_track = None;
        self.current_media_source_id = None;
        self.is_pending = false;
        self.is_paused = true;
    }

    pub fn reset_track_state(&mut self) {
        self.video_loaded = false;
        self.time_position = 0.0;
        self.duration = 0.0;
        self.is_buffering = false;
        self.cache_duration = 0.0;
        self.eof_reached = false;
        self.subtitle_tracks.clear();
        self.audio_tracks.clear();
        self.current_subtitle_id = None;
        self.current_audio_track_id = None;
        self.subtitle_restore_attempted = false;
        self.audio_restore_attempted = false;
        self.statistics = PlaybackStatistics::default();
        self.track_notification = None;
    }

    pub fn has_track(&self) -> bool {
        self.current_track.is_some()
    }

    pub fn current_item_id(&self) -> Option<&playsync_model::ItemId> {
        self.current_track.as_ref().map(|item| &item.id)
    }

    pub fn is_current(&self, item_id: &playsync_model::ItemId) -> bool {
        self.current_item_id() == Some(item_id)
    }

    pub fn playback_state(&self) -> PlaybackState {
        match (&self.current_track, self.is_pending, self.is_paused) {
            (None, _, _) => PlaybackState::Idle,
            (Some(_), true, _) => PlaybackState::Loading,
            (Some(_), false, true) => PlaybackState::Paused,
            (Some(_), false, false) => PlaybackState::Playing,
        }
    }

    pub fn is_muted(&self) -> bool {
        self.volume <= 0.0
    }

    /// Seconds left before the end, when the duration is known.
    pub fn remaining(&self) -> Option<Duration> {
        (self.duration > 0.0).then(|| {
            Duration::from_secs_f64((self.duration - self.time_position).max(0.0))
        })
    }

    pub fn dismiss_error(&mut self) {
        if self
            .last_error
            .as_ref()
            .is_some_and(PlaybackNotice::is_dismissible)
        {
            self.last_error = None;
        }
    }

    pub fn expire_notification(&mut self, now: Instant) {
        if self
            .track_notification
            .as_ref()
            .is_some_and(|n| n.is_expired(now))
        {
            self.track_notification = None;
        }
    }
}

/// Read-only view published to observers after every state change.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub session: PlaybackSession,
    pub state: PlaybackState,
    pub autoplay: AutoplayState,
    pub next_item: Option<ContentItem>,
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self {
            session: PlaybackSession::default(),
            state: PlaybackState::Idle,
            autoplay: AutoplayState::Hidden,
            next_item: None,
        }
    }
}

/// Clock-style position label: `H:MM:SS` past an hour, otherwise `M:SS`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }
    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}
