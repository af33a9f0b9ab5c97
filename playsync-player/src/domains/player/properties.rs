//! Mapping of engine property changes onto [`PlaybackSession`].
//!
//! Applying the same event twice leaves the session unchanged, and events
//! whose payload does not match the declared type are dropped.

use playsync_model::{Track, TrackKind};

use super::state::PlaybackSession;
use crate::infra::engine::{
    ObservedProperty, PropertyEvent, PropertyFormat, PropertyValue,
};

pub const OBSERVED_PROPERTIES: &[ObservedProperty] = &[
    ObservedProperty::new("pause", PropertyFormat::Flag),
    ObservedProperty::new("time-pos", PropertyFormat::Double),
    ObservedProperty::new("duration", PropertyFormat::Double),
    ObservedProperty::new("track-list", PropertyFormat::Node),
    ObservedProperty::nullable("sid", PropertyFormat::Int64),
    ObservedProperty::nullable("aid", PropertyFormat::Int64),
    ObservedProperty::new("volume", PropertyFormat::Double),
    ObservedProperty::new("speed", PropertyFormat::Double),
    ObservedProperty::new("fullscreen", PropertyFormat::Flag),
    ObservedProperty::new("paused-for-cache", PropertyFormat::Flag),
    ObservedProperty::nullable("demuxer-cache-duration", PropertyFormat::Double),
    ObservedProperty::nullable("eof-reached", PropertyFormat::Flag),
    ObservedProperty::nullable("video-codec", PropertyFormat::String),
    ObservedProperty::nullable("width", PropertyFormat::Int64),
    ObservedProperty::nullable("height", PropertyFormat::Int64),
    ObservedProperty::nullable("video-bitrate", PropertyFormat::Double),
    ObservedProperty::nullable("estimated-vf-fps", PropertyFormat::Double),
];

pub fn declared(name: &str) -> Option<&'static ObservedProperty> {
    OBSERVED_PROPERTIES.iter().find(|p| p.name == name)
}

/// What an applied event means for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyEffect {
    /// Unknown property or mismatched payload.
    Ignored,
    Updated,
    /// First positive duration for the current track.
    VideoLoaded,
    /// Track list replaced; saved selections may need restoring.
    TracksChanged,
    EndReached,
}

pub fn apply_property(
    session: &mut PlaybackSession,
    event: &PropertyEvent,
) -> PropertyEffect {
    let Some(property) = declared(&event.name) else {
        log::trace!("[Session] Ignoring unobserved property {}", event.name);
        return PropertyEffect::Ignored;
    };

    if !event.value.matches(property) {
        log::trace!(
            "[Session] Dropping {} with unexpected payload {:?}",
            event.name,
            event.value
        );
        return PropertyEffect::Ignored;
    }

    let value = &event.value;
    match property.name {
        "pause" => {
            if let Some(paused) = value.as_bool() {
                session.is_paused = paused;
            }
        }
        "time-pos" => {
            if let Some(position) = value.as_f64() {
                session.time_position = position;
            }
        }
        "duration" => {
            if let Some(duration) = value.as_f64() {
                session.duration = duration;
                if duration > 0.0 && !session.video_loaded {
                    session.video_loaded = true;
                    session.is_pending = false;
                    return PropertyEffect::VideoLoaded;
                }
            }
        }
        "track-list" => {
            return apply_track_list(session, value);
        }
        "sid" => session.current_subtitle_id = value.as_i64(),
        "aid" => session.current_audio_track_id = value.as_i64(),
        "volume" => {
            if let Some(volume) = value.as_f64() {
                session.volume = volume;
            }
        }
        "speed" => {
            if let Some(speed) = value.as_f64() {
                session.speed = speed;
            }
        }
        "fullscreen" => {
            if let Some(fullscreen) = value.as_bool() {
                session.is_fullscreen = fullscreen;
            }
        }
        "paused-for-cache" => {
            if let Some(buffering) = value.as_bool() {
                session.is_buffering = buffering;
            }
        }
        "demuxer-cache-duration" => {
            session.cache_duration = value.as_f64().unwrap_or(0.0);
        }
        "eof-reached" => {
            let reached = value.as_bool().unwrap_or(false);
            let newly_reached = reached && !session.eof_reached;
            session.eof_reached = reached;
            if newly_reached {
                return PropertyEffect::EndReached;
            }
        }
        "video-codec" => {
            session.statistics.video_codec = value.as_str().map(str::to_owned);
        }
        "width" => session.statistics.width = value.as_i64(),
        "height" => session.statistics.height = value.as_i64(),
        "video-bitrate" => session.statistics.video_bitrate = value.as_f64(),
        "estimated-vf-fps" => session.statistics.fps = value.as_f64(),
        _ => return PropertyEffect::Ignored,
    }

    PropertyEffect::Updated
}

fn apply_track_list(
    session: &mut PlaybackSession,
    value: &PropertyValue,
) -> PropertyEffect {
    let PropertyValue::Node(serde_json::Value::Array(entries)) = value else {
        log::trace!("[Session] track-list payload is not an array");
        return PropertyEffect::Ignored;
    };

    let tracks: Vec<Track> = entries
        .iter()
        .filter_map(|entry| {
            serde_json::from_value::<Track>(entry.clone())
                .map_err(|err| {
                    log::trace!("[Session] Skipping malformed track: {err}");
                })
                .ok()
        })
        .collect();

    let (subtitles, audio) = partition_tracks(tracks);

    session.current_subtitle_id =
        subtitles.iter().find(|t| t.is_selected()).map(|t| t.id);
    session.current_audio_track_id =
        audio.iter().find(|t| t.is_selected()).map(|t| t.id);
    session.subtitle_tracks = subtitles;
    session.audio_tracks = audio;

    PropertyEffect::TracksChanged
}

/// Split an engine track list into (subtitle, audio) tracks.
pub fn partition_tracks(tracks: Vec<Track>) -> (Vec<Track>, Vec<Track>) {
    let mut subtitles = Vec::new();
    let mut audio = Vec::new();
    for track in tracks {
        match track.kind {
            TrackKind::Sub => subtitles.push(track),
            TrackKind::Audio => audio.push(track),
            TrackKind::Video | TrackKind::Unknown => {}
        }
    }
    (subtitles, audio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use playsync_model::ContentItem;
    use serde_json::json;

    fn event(name: &str, value: PropertyValue) -> PropertyEvent {
        PropertyEvent::new(name, value)
    }

    fn track_list() -> PropertyEvent {
        event(
            "track-list",
            PropertyValue::Node(json!([
                { "id": 1, "type": "video", "selected": true },
                { "id": 1, "type": "audio", "lang": "jpn", "selected": true },
                { "id": 2, "type": "audio", "lang": "eng" },
                { "id": 1, "type": "sub", "lang": "eng", "title": "Full" },
                { "id": 2, "type": "sub", "lang": "eng", "title": "Signs", "selected": true },
                { "type": "sub" }
            ])),
        )
    }

    #[test]
    fn every_event_is_idempotent() {
        let events = vec![
            event("pause", PropertyValue::Flag(false)),
            event("time-pos", PropertyValue::Double(12.5)),
            event("duration", PropertyValue::Double(3600.0)),
            track_list(),
            event("sid", PropertyValue::Int(2)),
            event("sid", PropertyValue::None),
            event("aid", PropertyValue::Int(1)),
            event("volume", PropertyValue::Int(55)),
            event("speed", PropertyValue::Double(1.25)),
            event("fullscreen", PropertyValue::Flag(true)),
            event("paused-for-cache", PropertyValue::Flag(true)),
            event("demuxer-cache-duration", PropertyValue::Double(8.0)),
            event("eof-reached", PropertyValue::Flag(true)),
            event("video-codec", PropertyValue::Str("hevc".into())),
            event("width", PropertyValue::Int(1920)),
            event("estimated-vf-fps", PropertyValue::Double(23.976)),
        ];

        for ev in events {
            let mut once = PlaybackSession::default();
            once.begin_track(ContentItem::new("x"), None);
            apply_property(&mut once, &ev);

            let mut twice = once.clone();
            apply_property(&mut twice, &ev);

            assert_eq!(once, twice, "event {} not idempotent", ev.name);
        }
    }

    #[test]
    fn mismatched_payloads_are_dropped() {
        let mut session = PlaybackSession::default();
        let before = session.clone();

        for ev in [
            event("pause", PropertyValue::Str("yes".into())),
            event("time-pos", PropertyValue::None),
            event("duration", PropertyValue::Flag(true)),
            event("track-list", PropertyValue::Node(json!({ "id": 1 }))),
            event("sid", PropertyValue::Double(1.0)),
            event("volume", PropertyValue::Str("50".into())),
            event("not-observed", PropertyValue::Int(1)),
        ] {
            assert_eq!(
                apply_property(&mut session, &ev),
                PropertyEffect::Ignored
            );
        }
        assert_eq!(session, before);
    }

    #[test]
    fn first_positive_duration_marks_loaded() {
        let mut session = PlaybackSession::default();
        session.begin_track(ContentItem::new("x"), None);

        assert_eq!(
            apply_property(&mut session, &event("duration", PropertyValue::Double(0.0))),
            PropertyEffect::Updated
        );
        assert!(session.is_pending);

        assert_eq!(
            apply_property(&mut session, &event("duration", PropertyValue::Int(90))),
            PropertyEffect::VideoLoaded
        );
        assert!(!session.is_pending);
        assert!(session.video_loaded);
        assert_eq!(session.duration, 90.0);

        assert_eq!(
            apply_property(&mut session, &event("duration", PropertyValue::Double(91.0))),
            PropertyEffect::Updated
        );
    }

    #[test]
    fn track_list_partitions_and_extracts_selection() {
        let mut session = PlaybackSession::default();
        assert_eq!(
            apply_property(&mut session, &track_list()),
            PropertyEffect::TracksChanged
        );

        assert_eq!(session.subtitle_tracks.len(), 2);
        assert_eq!(session.audio_tracks.len(), 2);
        assert_eq!(session.current_subtitle_id, Some(2));
        assert_eq!(session.current_audio_track_id, Some(1));
    }

    #[test]
    fn subtitle_off_clears_selection() {
        let mut session = PlaybackSession::default();
        apply_property(&mut session, &event("sid", PropertyValue::Int(3)));
        assert_eq!(session.current_subtitle_id, Some(3));
        apply_property(&mut session, &event("sid", PropertyValue::None));
        assert_eq!(session.current_subtitle_id, None);
    }

    #[test]
    fn end_reached_fires_once() {
        let mut session = PlaybackSession::default();
        let ev = event("eof-reached", PropertyValue::Flag(true));
        assert_eq!(apply_property(&mut session, &ev), PropertyEffect::EndReached);
        assert_eq!(apply_property(&mut session, &ev), PropertyEffect::Updated);
    }
}
