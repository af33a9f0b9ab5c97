//! The playback session state machine.
//!
//! [`SessionController`] owns the current track, mediates engine commands and
//! merges engine property changes back into [`PlaybackSession`]. Every
//! network call tied to a track runs under that track's cancellation scope,
//! so switching or clearing never lets a late response touch newer state.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use playsync_model::{
    ContentItem, MediaSourceId, NowPlayingMetadata, Track, seconds_to_ticks,
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::autoplay::{self, AutoplayCountdown, CountdownTick};
use super::progress::{ProgressReporter, ReportHandle};
use super::properties::{self, OBSERVED_PROPERTIES, PropertyEffect};
use super::resume::{self, ResumeDecision};
use super::state::{
    PlaybackNotice, PlaybackSession, PlaybackSnapshot, TrackNotification,
};
use super::track_selection::{
    TrackSelectionMemory, TrackSlot, track_notification_message,
};
use super::volume::VolumeMemory;
use crate::error::{PlayerError, Result};
use crate::infra::constants::player::{
    AUTOPLAY_COUNTDOWN_SECONDS, PROGRESS_REPORT_INTERVAL, USER_PAUSE_GUARD,
};
use crate::infra::engine::{
    EngineOptions, MediaEngine, PropertyEvent, PropertySubscription,
    PropertyValue,
};
use crate::infra::services::{
    CatalogService, ItemCache, MediaSessionSurface, MemoryItemCache,
    NoopMediaSession, OfflineStore, ProgressReport, StaticOfflineStore,
    StopReport,
};
use crate::infra::settings::PlayerSettings;
use crate::infra::time::{Clock, SystemClock};

/// Collaborators the session talks to.
#[derive(Debug, Clone)]
pub struct SessionServices {
    pub engine: Arc<dyn MediaEngine>,
    pub catalog: Arc<dyn CatalogService>,
    pub offline: Arc<dyn OfflineStore>,
    pub media_session: Arc<dyn MediaSessionSurface>,
    pub cache: Arc<dyn ItemCache>,
    pub settings: PlayerSettings,
    pub clock: Arc<dyn Clock>,
}

impl SessionServices {
    /// Engine and catalog with in-memory defaults for everything else.
    pub fn new(
        engine: Arc<dyn MediaEngine>,
        catalog: Arc<dyn CatalogService>,
    ) -> Self {
        Self {
            engine,
            catalog,
            offline: Arc::new(StaticOfflineStore::new()),
            media_session: Arc::new(NoopMediaSession),
            cache: Arc::new(MemoryItemCache::new()),
            settings: PlayerSettings::in_memory(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_offline(mut self, offline: Arc<dyn OfflineStore>) -> Self {
        self.offline = offline;
        self
    }

    pub fn with_media_session(
        mut self,
        media_session: Arc<dyn MediaSessionSurface>,
    ) -> Self {
        self.media_session = media_session;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn ItemCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_settings(mut self, settings: PlayerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub progress_interval: Duration,
    pub autoplay_countdown_seconds: u32,
    pub engine: EngineOptions,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            progress_interval: PROGRESS_REPORT_INTERVAL,
            autoplay_countdown_seconds: AUTOPLAY_COUNTDOWN_SECONDS,
            engine: EngineOptions::default(),
        }
    }
}

/// Subtitle choice from the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleChoice {
    Off,
    Track(i64),
}

#[derive(Debug, Clone)]
struct PendingPlay {
    item: ContentItem,
    media_source_id: Option<MediaSourceId>,
}

#[derive(Debug)]
pub struct SessionController {
    engine: Arc<dyn MediaEngine>,
    catalog: Arc<dyn CatalogService>,
    offline: Arc<dyn OfflineStore>,
    media_session: Arc<dyn MediaSessionSurface>,
    settings: PlayerSettings,
    clock: Arc<dyn Clock>,
    options: SessionOptions,

    reporter: ProgressReporter,
    tracks: TrackSelectionMemory,
    volume: VolumeMemory,

    session: PlaybackSession,
    autoplay: AutoplayCountdown,
    next_item: Option<ContentItem>,
    subscription: Option<PropertySubscription>,
    deferred: Option<PendingPlay>,

    // Cancellation scopes
    track_scope: CancellationToken,
    switch_scope: Option<CancellationToken>,

    last_user_pause: Option<Instant>,
    entered_fullscreen: bool,
    snapshots: watch::Sender<PlaybackSnapshot>,
}

impl SessionController {
    pub fn new(services: SessionServices, options: SessionOptions) -> Self {
        let reporter = ProgressReporter::new(
            Arc::clone(&services.catalog),
            Arc::clone(&services.cache),
        );
        let (snapshots, _) = watch::channel(PlaybackSnapshot::default());

        Self {
            engine: services.engine,
            catalog: services.catalog,
            offline: services.offline,
            media_session: services.media_session,
            tracks: TrackSelectionMemory::new(services.settings.clone()),
            volume: VolumeMemory::new(services.settings.clone()),
            settings: services.settings,
            clock: services.clock,
            autoplay: AutoplayCountdown::new(options.autoplay_countdown_seconds),
            options,
            reporter,
            session: PlaybackSession::default(),
            next_item: None,
            subscription: None,
            deferred: None,
            track_scope: CancellationToken::new(),
            switch_scope: None,
            last_user_pause: None,
            entered_fullscreen: false,
            snapshots,
        }
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn reporter(&self) -> &ProgressReporter {
        &self.reporter
    }

    pub fn settings(&self) -> &PlayerSettings {
        &self.settings
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn autoplay(&self) -> &AutoplayCountdown {
        &self.autoplay
    }

    pub fn next_item(&self) -> Option<&ContentItem> {
        self.next_item.as_ref()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            session: self.session.clone(),
            state: self.session.playback_state(),
            autoplay: self.autoplay.state(),
            next_item: self.next_item.clone(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshots.subscribe()
    }

    pub(crate) fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }

    pub(crate) fn subscription_mut(
        &mut self,
    ) -> &mut Option<PropertySubscription> {
        &mut self.subscription
    }

    /// Whether the periodic progress report should be running.
    pub fn progress_timer_active(&self) -> bool {
        self.session.is_initialized
            && self.session.has_track()
            && !self.session.is_pending
            && !self.session.is_paused
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.session.is_initialized {
            Ok(())
        } else {
            Err(PlayerError::EngineNotInitialized)
        }
    }

    // === Lifecycle ===

    /// Start the engine, subscribe to its properties and apply the saved
    /// volume. A play request made before this point runs once ready.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.session.is_initialized {
            return Ok(());
        }

        log::info!("[Session] Initializing playback engine");
        let subscription = match self.start_engine().await {
            Ok(subscription) => subscription,
            Err(err) => {
                log::error!("[Session] Engine initialization failed: {err}");
                self.session.last_error =
                    Some(PlaybackNotice::init_failed(err.to_string()));
                self.session.is_pending = false;
                self.publish();
                return Err(err);
            }
        };
        self.subscription = Some(subscription);
        self.session.is_initialized = true;

        let volume = self.volume.initial_volume();
        if let Err(err) = self
            .engine
            .set_property("volume", PropertyValue::Double(volume))
            .await
        {
            log::warn!("[Session] Could not apply saved volume: {err}");
        }

        match self.catalog.server_configuration().await {
            Ok(config) => self.reporter.set_resume_bounds(config),
            Err(err) => {
                log::warn!("[Session] Using default resume bounds: {err}")
            }
        }
        self.publish();

        if let Some(pending) = self.deferred.take() {
            log::debug!(
                "[Session] Engine ready, playing deferred {}",
                pending.item.id
            );
            self.play_track(pending.item, pending.media_source_id).await?;
        }
        Ok(())
    }

    async fn start_engine(&mut self) -> Result<PropertySubscription> {
        let mut options = self.options.engine.clone();
        if let Some(size) = self.settings.subtitle_font_size() {
            options = options.with_option("sub-font-size", size.to_string());
        }
        if let Some(color) = self.settings.subtitle_color() {
            options = options.with_option("sub-color", color);
        }
        self.engine.initialize(&options).await?;
        self.engine.observe(OBSERVED_PROPERTIES).await
    }

    /// Tear the session down. Safe to call more than once.
    pub async fn shutdown(&mut self) {
        self.autoplay.cancel();
        self.track_scope.cancel();
        if let Some(scope) = self.switch_scope.take() {
            scope.cancel();
        }
        self.reporter.cancel_pending_progress();

        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }

        if self.session.is_initialized {
            self.session.is_initialized = false;
            if let Err(err) = self.engine.shutdown().await {
                log::warn!("[Session] Engine shutdown failed: {err}");
            }
            log::info!("[Session] Shut down");
        }
        self.publish();
    }

    // === Track transitions ===

    pub async fn play_track(
        &mut self,
        item: ContentItem,
        media_source_id: Option<MediaSourceId>,
    ) -> Result<()> {
        if !self.session.is_initialized {
            log::debug!("[Session] Engine not ready, deferring {}", item.id);
            self.deferred = Some(PendingPlay {
                item,
                media_source_id,
            });
            return Ok(());
        }

        if self.session.is_pending && self.session.is_current(&item.id) {
            log::debug!("[Session] {} is already loading, ignoring", item.id);
            return Ok(());
        }

        self.leave_current_track();

        log::info!("[Session] Playing {}", item.id);
        self.session.begin_track(item, media_source_id);
        self.publish();

        self.load_current().await
    }

    /// Report the outgoing track as stopped and drop everything scoped to it.
    ///
    /// The stop runs under a switch scope that the next switch cancels.
    fn leave_current_track(&mut self) {
        if let Some(outgoing) = self.stop_report_for_current() {
            if let Some(previous) = self.switch_scope.take() {
                previous.cancel();
            }
            let scope = CancellationToken::new();
            self.switch_scope = Some(scope.clone());
            let _ = self.reporter.report_stopped(outgoing, Some(scope));
        }

        self.renew_track_scope();
        self.reporter.cancel_pending_progress();
        self.autoplay.reset_for_new_track();
        self.next_item = None;
    }

    async fn load_current(&mut self) -> Result<()> {
        let Some(item) = self.session.current_track.clone() else {
            return Ok(());
        };
        let source = self
            .session
            .current_media_source_id
            .clone()
            .unwrap_or_else(|| MediaSourceId::from(&item.id));

        if let Err(err) = self.start_playback(&item, &source).await {
            log::error!("[Session] Failed to load {}: {err}", item.id);
            self.session.is_pending = false;
            self.session.last_error =
                Some(PlaybackNotice::load_failed(err.to_string()));
            self.publish();
            return Err(PlayerError::Load {
                item: item.id.clone(),
                message: err.to_string(),
            });
        }

        if let Err(err) = self.settings.increment_session_play_count() {
            log::warn!("[Session] Could not update play count: {err}");
        }
        let artwork = self.catalog.image_url(&item);
        self.media_session
            .set_metadata(Some(NowPlayingMetadata::from_item(&item, artwork)));
        self.media_session.set_playing(true);

        let _ = self.reporter.report_start(
            &item.id,
            &source,
            self.track_scope.child_token(),
        );
        self.publish();
        Ok(())
    }

    async fn start_playback(
        &mut self,
        item: &ContentItem,
        source: &MediaSourceId,
    ) -> Result<()> {
        let target = match self.offline.local_file_path(&item.id).await {
            Some(path) => {
                log::info!("[Session] Playing {} from local file", item.id);
                path.to_string_lossy().into_owned()
            }
            None => self
                .catalog
                .stream_url(&item.id, self.settings.bitrate(), source)?
                .to_string(),
        };

        let decision = if self.settings.resume_enabled() {
            resume::decide(
                item.user_data.playback_position_ticks,
                item.run_time_ticks_for(source),
                &self.reporter.resume_bounds(),
            )
        } else {
            ResumeDecision::START_OVER
        };
        if decision.should_seek {
            log::info!(
                "[Session] Resuming {} at {:.1}s",
                item.id,
                decision.seek_to_seconds
            );
        }

        self.engine
            .set_property("start", PropertyValue::Str(decision.start_option()))
            .await?;
        self.engine.command("loadfile", &[target]).await?;
        self.engine
            .set_property("pause", PropertyValue::Flag(false))
            .await?;
        Ok(())
    }

    /// Stop playback and reset the session.
    ///
    /// Returns the handle of the final stop report.
    pub async fn clear_current_track(&mut self) -> ReportHandle {
        self.autoplay.cancel();
        self.next_item = None;
        self.deferred = None;

        if !self.session.has_track()
            && !self.session.video_loaded
            && !self.entered_fullscreen
        {
            return ReportHandle::skipped();
        }

        if self.entered_fullscreen {
            self.entered_fullscreen = false;
            if let Err(err) = self
                .engine
                .set_property("fullscreen", PropertyValue::Flag(false))
                .await
            {
                log::warn!("[Session] Could not leave fullscreen: {err}");
            }
        }

        self.reporter.cancel_pending_progress();
        let stop = match self.stop_report_for_current() {
            Some(final_report) => self.reporter.report_stopped(final_report, None),
            None => ReportHandle::skipped(),
        };

        if self.session.is_initialized
            && let Err(err) = self.engine.command("stop", &[]).await
        {
            log::warn!("[Session] Engine stop failed: {err}");
        }

        self.renew_track_scope();
        self.session.clear_track();
        self.media_session.set_metadata(None);
        self.media_session.set_playing(false);
        log::info!("[Session] Cleared current track");
        self.publish();
        stop
    }

    fn renew_track_scope(&mut self) {
        self.track_scope.cancel();
        self.track_scope = CancellationToken::new();
    }

    fn stop_report_for_current(&self) -> Option<StopReport> {
        let item = self.session.current_track.as_ref()?;
        let source = self
            .session
            .current_media_source_id
            .clone()
            .unwrap_or_else(|| MediaSourceId::from(&item.id));
        let total_ticks = item.run_time_ticks_for(&source).or_else(|| {
            (self.session.duration > 0.0)
                .then(|| seconds_to_ticks(self.session.duration))
        });

        Some(StopReport {
            item_id: item.id.clone(),
            media_source_id: source,
            series_id: item.series_id.clone(),
            position_seconds: self.session.time_position,
            total_ticks,
        })
    }

    fn progress_report(&self, is_paused: bool) -> Option<ProgressReport> {
        let item = self.session.current_track.as_ref()?;
        Some(ProgressReport {
            item_id: item.id.clone(),
            media_source_id: self
                .session
                .current_media_source_id
                .clone()
                .unwrap_or_else(|| MediaSourceId::from(&item.id)),
            position_seconds: self.session.time_position,
            is_paused,
        })
    }

    // === Transport ===

    pub async fn toggle_play_pause(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        if !self.session.has_track() {
            return Ok(());
        }

        let was_paused = self.session.is_paused;
        self.engine.command("cycle", &["pause".to_string()]).await?;
        self.session.is_paused = !was_paused;

        if was_paused {
            if let Some(item) = &self.session.current_track {
                let artwork = self.catalog.image_url(item);
                self.media_session
                    .set_metadata(Some(NowPlayingMetadata::from_item(item, artwork)));
            }
            self.media_session.set_playing(true);
        } else {
            self.last_user_pause = Some(self.clock.now());
            self.media_session.set_playing(false);
        }

        if let Some(report) = self.progress_report(!was_paused) {
            let _ = self.reporter.report_progress(report);
        }
        self.publish();
        Ok(())
    }

    /// Play request from the OS media controls.
    ///
    /// Ignored within the user-pause guard window so the platform cannot
    /// immediately undo a pause the user just made. Returns whether playback
    /// was resumed.
    pub async fn system_play(&mut self) -> Result<bool> {
        if let Some(paused_at) = self.last_user_pause
            && self.clock.now().saturating_duration_since(paused_at)
                < USER_PAUSE_GUARD
        {
            log::info!(
                "[Session] Ignoring system play within {}ms of a user pause",
                USER_PAUSE_GUARD.as_millis()
            );
            return Ok(false);
        }
        if !self.session.has_track() || !self.session.is_paused {
            return Ok(false);
        }
        self.toggle_play_pause().await?;
        Ok(true)
    }

    /// Pause request from the OS media controls.
    pub async fn system_pause(&mut self) -> Result<bool> {
        if !self.session.has_track() || self.session.is_paused {
            return Ok(false);
        }
        self.toggle_play_pause().await?;
        Ok(true)
    }

    pub async fn seek(&mut self, position: f64) -> Result<()> {
        self.ensure_initialized()?;
        if !position.is_finite() || position < 0.0 {
            return Err(PlayerError::InvalidArgument(format!(
                "seek position must be a non-negative number, got {position}"
            )));
        }
        let target = if self.session.duration > 0.0 {
            position.min(self.session.duration)
        } else {
            position
        };

        self.engine
            .set_property("time-pos", PropertyValue::Double(target))
            .await
    }

    /// Seek relative to the current position.
    pub async fn skip(&mut self, seconds: f64) -> Result<()> {
        self.ensure_initialized()?;
        if !seconds.is_finite() {
            return Err(PlayerError::InvalidArgument(format!(
                "skip offset must be finite, got {seconds}"
            )));
        }
        self.engine
            .command("seek", &[seconds.to_string(), "relative".to_string()])
            .await
    }

    pub async fn set_volume(&mut self, volume: f64) -> Result<()> {
        self.ensure_initialized()?;
        let volume = self.volume.remember(volume)?;
        self.engine
            .set_property("volume", PropertyValue::Double(volume))
            .await
    }

    /// Mute or unmute relative to the last level this session asked for.
    pub async fn toggle_mute(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        let target = self.volume.toggle()?;
        self.engine
            .set_property("volume", PropertyValue::Double(target))
            .await
    }

    pub async fn set_speed(&mut self, speed: f64) -> Result<()> {
        self.ensure_initialized()?;
        if !speed.is_finite() || speed <= 0.0 {
            return Err(PlayerError::InvalidArgument(format!(
                "speed must be positive, got {speed}"
            )));
        }
        self.engine
            .set_property("speed", PropertyValue::Double(speed))
            .await
    }

    pub async fn select_subtitle(&mut self, choice: SubtitleChoice) -> Result<()> {
        self.ensure_initialized()?;
        match choice {
            SubtitleChoice::Off => {
                self.engine
                    .command("set", &["sid".to_string(), "no".to_string()])
                    .await?;
                self.notify_track(TrackSlot::Subtitle, None);
            }
            SubtitleChoice::Track(id) => {
                self.select_track(TrackSlot::Subtitle, id).await?;
            }
        }
        self.publish();
        Ok(())
    }

    pub async fn select_audio_track(&mut self, id: i64) -> Result<()> {
        self.ensure_initialized()?;
        self.select_track(TrackSlot::Audio, id).await?;
        self.publish();
        Ok(())
    }

    async fn select_track(&mut self, slot: TrackSlot, id: i64) -> Result<()> {
        let candidates = match slot {
            TrackSlot::Subtitle => &self.session.subtitle_tracks,
            TrackSlot::Audio => &self.session.audio_tracks,
        };
        let Some(track) = candidates.iter().find(|t| t.id == id).cloned() else {
            return Err(PlayerError::InvalidArgument(format!(
                "no {:?} track with id {id}",
                slot.kind()
            )));
        };

        self.engine
            .set_property(slot.property(), PropertyValue::Int(id))
            .await?;

        if let Some(item_id) = self.session.current_item_id().cloned()
            && let Err(err) = self.tracks.remember(slot, &item_id, &track)
        {
            log::warn!("[Session] Could not remember {slot:?} track: {err}");
        }
        self.notify_track(slot, Some(&track));
        Ok(())
    }

    fn notify_track(&mut self, slot: TrackSlot, track: Option<&Track>) {
        self.session.track_notification = Some(TrackNotification::new(
            track_notification_message(slot, track),
            self.clock.now(),
        ));
    }

    pub async fn toggle_fullscreen(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        let enter = !self.session.is_fullscreen;
        self.engine
            .set_property("fullscreen", PropertyValue::Flag(enter))
            .await?;
        self.session.is_fullscreen = enter;
        self.entered_fullscreen = enter;
        self.publish();
        Ok(())
    }

    /// Play a local file outside the catalog.
    ///
    /// The catalog item being played, if any, is reported stopped first.
    /// Nothing about the local file is reported.
    pub async fn open_file(&mut self, path: &Path) -> Result<()> {
        self.ensure_initialized()?;
        if !path.exists() {
            return Err(PlayerError::InvalidArgument(format!(
                "{} does not exist",
                path.display()
            )));
        }
        self.leave_current_track();
        self.deferred = None;
        if self.session.has_track() {
            self.session.clear_track();
            self.media_session.set_metadata(None);
            self.media_session.set_playing(false);
        }

        log::info!("[Session] Opening local file {}", path.display());
        self.engine
            .command("loadfile", &[path.to_string_lossy().into_owned()])
            .await?;
        self.engine
            .set_property("pause", PropertyValue::Flag(false))
            .await?;
        self.session.video_loaded = true;
        self.publish();
        Ok(())
    }

    pub fn set_bitrate(&mut self, bitrate: u64) -> Result<()> {
        self.settings.set_bitrate(bitrate)
    }

    pub fn reset_session_count(&mut self) -> Result<()> {
        self.settings.reset_session_play_count()
    }

    pub fn dismiss_error(&mut self) {
        self.session.dismiss_error();
        self.publish();
    }

    // === Auto-play ===

    pub fn set_next_item(&mut self, item: Option<ContentItem>) {
        if item.is_none() {
            self.autoplay.cancel();
        }
        self.next_item = item;
        self.maybe_offer_next();
        self.publish();
    }

    /// User closed the "up next" overlay for this item.
    pub fn cancel_autoplay(&mut self) {
        self.autoplay.dismiss();
        self.publish();
    }

    pub async fn play_next_now(&mut self) -> Result<()> {
        self.autoplay.cancel();
        match self.next_item.take() {
            Some(next) => self.play_track(next, None).await,
            None => Ok(()),
        }
    }

    /// Advance the countdown by one second.
    pub async fn countdown_tick(&mut self) -> Result<()> {
        match self.autoplay.tick() {
            CountdownTick::Elapsed => {
                log::info!("[Session] Countdown finished, playing next item");
                self.play_next_now().await
            }
            CountdownTick::Remaining(_) => {
                self.publish();
                Ok(())
            }
            CountdownTick::Idle => Ok(()),
        }
    }

    fn maybe_offer_next(&mut self) {
        if self.next_item.is_some()
            && self.settings.autoplay_next_item()
            && !self.autoplay.is_visible()
            && autoplay::should_offer(
                self.session.time_position,
                self.session.duration,
                self.autoplay.start_from(),
            )
            && self.autoplay.start()
        {
            log::debug!("[Session] Offering next item");
        }
    }

    // === Engine events and timers ===

    pub async fn handle_property_event(&mut self, event: PropertyEvent) {
        match properties::apply_property(&mut self.session, &event) {
            PropertyEffect::Ignored => return,
            PropertyEffect::VideoLoaded => {
                log::info!(
                    "[Session] Video loaded ({:.1}s)",
                    self.session.duration
                );
            }
            PropertyEffect::TracksChanged => self.restore_tracks().await,
            PropertyEffect::EndReached => {
                log::debug!("[Session] End of file reached");
            }
            PropertyEffect::Updated => {}
        }

        self.maybe_offer_next();
        self.session.expire_notification(self.clock.now());
        self.publish();
    }

    async fn restore_tracks(&mut self) {
        let Some(item_id) = self.session.current_item_id().cloned() else {
            return;
        };

        for slot in [TrackSlot::Subtitle, TrackSlot::Audio] {
            let (candidates, selected) = match slot {
                TrackSlot::Subtitle => (
                    &self.session.subtitle_tracks,
                    self.session.current_subtitle_id,
                ),
                TrackSlot::Audio => (
                    &self.session.audio_tracks,
                    self.session.current_audio_track_id,
                ),
            };
            if candidates.is_empty() {
                continue;
            }
            let restored = self
                .tracks
                .restore(slot, candidates, &item_id)
                .map(|track| track.id);
            if !self.claim_restore(slot) {
                continue;
            }
            let Some(id) = restored else {
                continue;
            };
            if selected == Some(id) {
                continue;
            }

            log::debug!("[Session] Restoring {slot:?} track {id}");
            if let Err(err) = self
                .engine
                .set_property(slot.property(), PropertyValue::Int(id))
                .await
            {
                log::warn!("[Session] Could not restore {slot:?} track: {err}");
            }
        }
    }

    /// Take the single restore attempt `slot` gets per loaded track.
    ///
    /// mpv republishes the track list on every selection change, so later
    /// lists must not override what the user picked (including "off").
    fn claim_restore(&mut self, slot: TrackSlot) -> bool {
        let attempted = match slot {
            TrackSlot::Subtitle => &mut self.session.subtitle_restore_attempted,
            TrackSlot::Audio => &mut self.session.audio_restore_attempted,
        };
        !std::mem::replace(attempted, true)
    }

    /// Periodic progress report; no-op unless a track is actively playing.
    pub fn progress_tick(&mut self) -> Option<ReportHandle> {
        if !self.progress_timer_active() {
            return None;
        }
        let report = self.progress_report(false)?;
        Some(self.reporter.report_progress(report))
    }
}
