//! Shared fixtures for session integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use playsync_model::{ContentItem, TICKS_PER_SECOND, Track, TrackKind};
use playsync_player::domains::player::{
    SessionController, SessionOptions, SessionServices,
};
use playsync_player::infra::engine::PropertyValue;
use playsync_player::infra::services::{MemoryItemCache, StaticOfflineStore};
use playsync_player::infra::settings::PlayerSettings;
use playsync_player::infra::testing::{
    RecordingEngine, RecordingMediaSession, StubCatalog,
};
use playsync_player::infra::time::ManualClock;
use serde_json::json;

/// Every collaborator of a session, kept so tests can inspect them.
pub struct Harness {
    pub engine: Arc<RecordingEngine>,
    pub catalog: Arc<StubCatalog>,
    pub cache: Arc<MemoryItemCache>,
    pub media_session: Arc<RecordingMediaSession>,
    pub offline: Arc<StaticOfflineStore>,
    pub settings: PlayerSettings,
    pub clock: ManualClock,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(PlayerSettings::in_memory())
    }

    pub fn with_settings(settings: PlayerSettings) -> Self {
        Self {
            engine: Arc::new(RecordingEngine::new()),
            catalog: Arc::new(StubCatalog::new()),
            cache: Arc::new(MemoryItemCache::new()),
            media_session: Arc::new(RecordingMediaSession::new()),
            offline: Arc::new(StaticOfflineStore::new()),
            settings,
            clock: ManualClock::new(),
        }
    }

    pub fn services(&self) -> SessionServices {
        SessionServices::new(self.engine.clone(), self.catalog.clone())
            .with_cache(self.cache.clone())
            .with_media_session(self.media_session.clone())
            .with_offline(self.offline.clone())
            .with_settings(self.settings.clone())
            .with_clock(Arc::new(self.clock.clone()))
    }

    pub fn controller(&self) -> SessionController {
        SessionController::new(self.services(), SessionOptions::default())
    }

    /// Controller with the engine already started.
    pub async fn ready(&self) -> SessionController {
        let mut controller = self.controller();
        controller
            .initialize()
            .await
            .expect("engine initializes");
        controller
    }
}

pub fn ticks(seconds: i64) -> i64 {
    seconds * TICKS_PER_SECOND
}

/// Item of `runtime` seconds with a saved position of `position` seconds.
pub fn movie(id: &str, runtime: i64, position: i64) -> ContentItem {
    ContentItem::new(id)
        .with_name(format!("Movie {id}"))
        .with_run_time_ticks(ticks(runtime))
        .with_position_ticks(ticks(position))
}

/// Mark the current track as loaded and playing at `position`.
pub async fn start_playing(
    controller: &mut SessionController,
    duration: f64,
    position: f64,
) {
    controller
        .handle_property_event(event("duration", PropertyValue::Double(duration)))
        .await;
    controller
        .handle_property_event(event("time-pos", PropertyValue::Double(position)))
        .await;
    controller
        .handle_property_event(event("pause", PropertyValue::Flag(false)))
        .await;
}

pub fn event(
    name: &str,
    value: PropertyValue,
) -> playsync_player::infra::engine::PropertyEvent {
    playsync_player::infra::engine::PropertyEvent::new(name, value)
}

pub fn track_list(tracks: &[Track]) -> PropertyValue {
    let entries: Vec<_> = tracks
        .iter()
        .map(|track| {
            let kind = match track.kind {
                TrackKind::Audio => "audio",
                TrackKind::Sub => "sub",
                TrackKind::Video => "video",
                TrackKind::Unknown => "unknown",
            };
            json!({
                "id": track.id,
                "type": kind,
                "lang": track.lang,
                "title": track.title,
                "selected": track.is_selected(),
            })
        })
        .collect();
    PropertyValue::Node(json!(entries))
}
