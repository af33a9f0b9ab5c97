use std::path::PathBuf;

use playsync_model::{ContentItem, MediaSourceId};

use super::controller::SubtitleChoice;

#[derive(Debug, Clone)]
pub enum SessionCommand {
    // Track transitions
    PlayTrack {
        item: ContentItem,
        media_source_id: Option<MediaSourceId>,
    },
    ClearCurrentTrack,
    OpenFile(PathBuf),

    // Playback control
    TogglePlayPause,

    // Seeking
    Seek(f64),
    Skip(f64),
    SkipForward,  // +15s
    SkipBackward, // -15s

    // Volume and speed
    SetVolume(f64),
    ToggleMute,
    SetSpeed(f64),

    // Tracks
    SelectSubtitle(SubtitleChoice),
    SelectAudioTrack(i64),

    ToggleFullscreen,

    // OS media controls
    SystemPlay,
    SystemPause,
    SystemSeek(f64),

    // Up next
    SetNextItem(Option<ContentItem>),
    CancelAutoplay,
    PlayNextNow,

    // Preferences
    SetBitrate(u64),
    ResetSessionCount,
    DismissError,

    Shutdown,
}

impl SessionCommand {
    pub fn name(&self) -> &'static str {
        match self {
            SessionCommand::PlayTrack { .. } => "Session::PlayTrack",
            SessionCommand::ClearCurrentTrack => "Session::ClearCurrentTrack",
            SessionCommand::OpenFile(_) => "Session::OpenFile",
            SessionCommand::TogglePlayPause => "Session::TogglePlayPause",
            SessionCommand::Seek(_) => "Session::Seek",
            SessionCommand::Skip(_) => "Session::Skip",
            SessionCommand::SkipForward => "Session::SkipForward",
            SessionCommand::SkipBackward => "Session::SkipBackward",
            SessionCommand::SetVolume(_) => "Session::SetVolume",
            SessionCommand::ToggleMute => "Session::ToggleMute",
            SessionCommand::SetSpeed(_) => "Session::SetSpeed",
            SessionCommand::SelectSubtitle(_) => "Session::SelectSubtitle",
            SessionCommand::SelectAudioTrack(_) => "Session::SelectAudioTrack",
            SessionCommand::ToggleFullscreen => "Session::ToggleFullscreen",
            SessionCommand::SystemPlay => "Session::SystemPlay",
            SessionCommand::SystemPause => "Session::SystemPause",
            SessionCommand::SystemSeek(_) => "Session::SystemSeek",
            SessionCommand::SetNextItem(_) => "Session::SetNextItem",
            SessionCommand::CancelAutoplay => "Session::CancelAutoplay",
            SessionCommand::PlayNextNow => "Session::PlayNextNow",
            SessionCommand::SetBitrate(_) => "Session::SetBitrate",
            SessionCommand::ResetSessionCount => "Session::ResetSessionCount",
            SessionCommand::DismissError => "Session::DismissError",
            SessionCommand::Shutdown => "Session::Shutdown",
        }
    }
}
