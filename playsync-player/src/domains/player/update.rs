use log::{debug, warn};

use super::controller::SessionController;
use super::messages::SessionCommand;
use crate::error::Result;
use crate::infra::constants::player::seeking::{
    SEEK_BACKWARD_INCREMENT, SEEK_FORWARD_INCREMENT,
};

/// Apply one command to the session.
///
/// Failures are logged and returned; the session keeps running either way.
pub async fn update_session(
    controller: &mut SessionController,
    command: SessionCommand,
) -> Result<()> {
    let name = command.name();
    debug!("[Session] {name}");

    let result = match command {
        SessionCommand::PlayTrack {
            item,
            media_source_id,
        } => controller.play_track(item, media_source_id).await,
        SessionCommand::ClearCurrentTrack => {
            let _ = controller.clear_current_track().await;
            Ok(())
        }
        SessionCommand::OpenFile(path) => controller.open_file(&path).await,
        SessionCommand::TogglePlayPause => controller.toggle_play_pause().await,
        SessionCommand::Seek(position) => controller.seek(position).await,
        SessionCommand::Skip(seconds) => controller.skip(seconds).await,
        SessionCommand::SkipForward => {
            controller.skip(SEEK_FORWARD_INCREMENT).await
        }
        SessionCommand::SkipBackward => {
            controller.skip(SEEK_BACKWARD_INCREMENT).await
        }
        SessionCommand::SetVolume(volume) => controller.set_volume(volume).await,
        SessionCommand::ToggleMute => controller.toggle_mute().await,
        SessionCommand::SetSpeed(speed) => controller.set_speed(speed).await,
        SessionCommand::SelectSubtitle(choice) => {
            controller.select_subtitle(choice).await
        }
        SessionCommand::SelectAudioTrack(id) => {
            controller.select_audio_track(id).await
        }
        SessionCommand::ToggleFullscreen => controller.toggle_fullscreen().await,
        SessionCommand::SystemPlay => controller.system_play().await.map(drop),
        SessionCommand::SystemPause => controller.system_pause().await.map(drop),
        SessionCommand::SystemSeek(position) => controller.seek(position).await,
        SessionCommand::SetNextItem(item) => {
            controller.set_next_item(item);
            Ok(())
        }
        SessionCommand::CancelAutoplay => {
            controller.cancel_autoplay();
            Ok(())
        }
        SessionCommand::PlayNextNow => controller.play_next_now().await,
        SessionCommand::SetBitrate(bitrate) => controller.set_bitrate(bitrate),
        SessionCommand::ResetSessionCount => controller.reset_session_count(),
        SessionCommand::DismissError => {
            controller.dismiss_error();
            Ok(())
        }
        SessionCommand::Shutdown => {
            controller.shutdown().await;
            Ok(())
        }
    };

    if let Err(err) = &result {
        warn!("[Session] {name} failed: {err}");
    }
    result
}
