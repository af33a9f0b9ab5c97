use std::time::Duration;

pub mod seeking {
    /// Default seek forward increment in seconds
    pub const SEEK_FORWARD_INCREMENT: f64 = 15.0;

    /// Default seek backward increment in seconds
    pub const SEEK_BACKWARD_INCREMENT: f64 = -15.0;
}

/// Cadence of periodic progress reports while playing.
pub const PROGRESS_REPORT_INTERVAL: Duration = Duration::from_secs(10);

/// Auto-play countdown length in seconds.
pub const AUTOPLAY_COUNTDOWN_SECONDS: u32 = 20;

/// System "play" requests inside this window after a user pause are ignored.
pub const USER_PAUSE_GUARD: Duration = Duration::from_millis(2000);

/// How long a track change notification stays visible.
pub const TRACK_NOTIFICATION_DURATION: Duration = Duration::from_secs(2);

pub const DEFAULT_VOLUME: f64 = 100.0;

/// Volume restored by unmute when no previous level was remembered.
pub const DEFAULT_UNMUTE_VOLUME: f64 = 100.0;

pub const MAX_VOLUME: f64 = 100.0;

/// Default maximum streaming bitrate (120 Mbps).
pub const DEFAULT_BITRATE: u64 = 120_000_000;
