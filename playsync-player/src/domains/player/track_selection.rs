//! Per-user memory of subtitle and audio choices.
//!
//! The last explicit selection is stored together with the item it was made
//! on. Replaying that item restores the exact engine track id. Any other item
//! gets a fuzzy match on language, then on title.

use playsync_model::{ItemId, Track, TrackKind};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::infra::settings::{PlayerSettings, keys};

/// Which selection a memory record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSlot {
    Subtitle,
    Audio,
}

impl TrackSlot {
    pub fn kind(self) -> TrackKind {
        match self {
            TrackSlot::Subtitle => TrackKind::Sub,
            TrackSlot::Audio => TrackKind::Audio,
        }
    }

    /// Engine property holding the selected id.
    pub fn property(self) -> &'static str {
        match self {
            TrackSlot::Subtitle => "sid",
            TrackSlot::Audio => "aid",
        }
    }

    fn memory_key(self) -> &'static str {
        match self {
            TrackSlot::Subtitle => keys::SUBTITLE_MEMORY,
            TrackSlot::Audio => keys::AUDIO_MEMORY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackMemory {
    /// Item the selection was made on.
    pub track_id: ItemId,
    pub selected_track_id: i64,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl TrackMemory {
    pub fn new(item_id: &ItemId, track: &Track) -> Self {
        Self {
            track_id: item_id.clone(),
            selected_track_id: track.id,
            lang: track.lang.clone(),
            title: track.title.clone(),
        }
    }
}

/// Pick the track a memory record points at among `candidates`.
///
/// Same item: the exact engine id wins. Otherwise (or when the id is gone)
/// the first candidate with the same language, then the first with the same
/// title. Missing fields never match.
pub fn select_restored<'a>(
    memory: &TrackMemory,
    candidates: &'a [Track],
    current_item: &ItemId,
) -> Option<&'a Track> {
    if &memory.track_id == current_item
        && let Some(exact) =
            candidates.iter().find(|t| t.id == memory.selected_track_id)
    {
        return Some(exact);
    }

    let by_lang = memory.lang.as_deref().and_then(|lang| {
        candidates.iter().find(|t| t.lang.as_deref() == Some(lang))
    });

    by_lang.or_else(|| {
        memory.title.as_deref().and_then(|title| {
            candidates.iter().find(|t| t.title.as_deref() == Some(title))
        })
    })
}

/// Persistent track memory backed by [`PlayerSettings`].
#[derive(Debug, Clone)]
pub struct TrackSelectionMemory {
    settings: PlayerSettings,
}

impl TrackSelectionMemory {
    pub fn new(settings: PlayerSettings) -> Self {
        Self { settings }
    }

    pub fn is_enabled(&self, slot: TrackSlot) -> bool {
        match slot {
            TrackSlot::Subtitle => self.settings.remember_subtitle_track(),
            TrackSlot::Audio => self.settings.remember_audio_track(),
        }
    }

    pub fn recall(&self, slot: TrackSlot) -> Option<TrackMemory> {
        self.settings.get(slot.memory_key())
    }

    /// Store an explicit user selection.
    pub fn remember(
        &self,
        slot: TrackSlot,
        item_id: &ItemId,
        track: &Track,
    ) -> Result<()> {
        if !self.is_enabled(slot) {
            return Ok(());
        }
        self.settings
            .set(slot.memory_key(), &TrackMemory::new(item_id, track))
    }

    pub fn forget(&self, slot: TrackSlot) -> Result<()> {
        self.settings.remove(slot.memory_key())
    }

    /// Track to select for `slot` after a track list arrives, if any.
    pub fn restore<'a>(
        &self,
        slot: TrackSlot,
        candidates: &'a [Track],
        current_item: &ItemId,
    ) -> Option<&'a Track> {
        if !self.is_enabled(slot) || candidates.is_empty() {
            return None;
        }
        let memory = self.recall(slot)?;
        select_restored(&memory, candidates, current_item)
    }
}

/// Short label shown when the user switches tracks.
pub fn format_track(track: &Track) -> String {
    let mut parts = Vec::new();

    if let Some(lang) = &track.lang {
        parts.push(format_language_code(lang));
    } else if let Some(title) = &track.title {
        parts.push(title.clone());
    } else {
        parts.push(format!("Track {}", track.id));
    }

    let mut details = Vec::new();
    if let Some(codec) = &track.codec {
        details.push(match track.kind {
            TrackKind::Sub => format_subtitle_codec(codec),
            _ => format_audio_codec(codec),
        });
    }
    if track.kind == TrackKind::Audio
        && let Some(channels) = track.channels
    {
        details.push(format_channels(channels));
    }

    if !details.is_empty() {
        parts.push(format!("({})", details.join(" ")));
    }

    parts.join(" ")
}

pub fn track_notification_message(slot: TrackSlot, track: Option<&Track>) -> String {
    match (slot, track) {
        (TrackSlot::Subtitle, Some(track)) => {
            format!("Subtitles: {}", format_track(track))
        }
        (TrackSlot::Subtitle, None) => "Subtitles: Off".to_string(),
        (TrackSlot::Audio, Some(track)) => format!("Audio: {}", format_track(track)),
        (TrackSlot::Audio, None) => "Audio: Off".to_string(),
    }
}

/// Convert language code to human-readable name
fn format_language_code(code: &str) -> String {
    match code.to_lowercase().as_str() {
        "en" | "eng" => "English",
        "es" | "spa" => "Spanish",
        "fr" | "fra" | "fre" => "French",
        "de" | "deu" | "ger" => "German",
        "it" | "ita" => "Italian",
        "pt" | "por" => "Portuguese",
        "ru" | "rus" => "Russian",
        "ja" | "jpn" => "Japanese",
        "zh" | "chi" | "zho" => "Chinese",
        "ko" | "kor" => "Korean",
        "ar" | "ara" => "Arabic",
        "hi" | "hin" => "Hindi",
        "nl" | "nld" | "dut" => "Dutch",
        "sv" | "swe" => "Swedish",
        "no" | "nor" => "Norwegian",
        "da" | "dan" => "Danish",
        "fi" | "fin" => "Finnish",
        "pl" | "pol" => "Polish",
        "tr" | "tur" => "Turkish",
        "el" | "ell" | "gre" => "Greek",
        "he" | "heb" => "Hebrew",
        _ => code,
    }
    .to_string()
}

fn format_audio_codec(codec: &str) -> String {
    match codec.to_lowercase().as_str() {
        codec if codec.contains("aac") => "AAC",
        codec if codec.contains("eac3") || codec.contains("eac-3") => "E-AC3",
        codec if codec.contains("ac3") || codec.contains("ac-3") => "AC3",
        codec if codec.contains("dts") => "DTS",
        codec if codec.contains("truehd") => "TrueHD",
        codec if codec.contains("mp3") => "MP3",
        codec if codec.contains("opus") => "Opus",
        codec if codec.contains("vorbis") => "Vorbis",
        codec if codec.contains("flac") => "FLAC",
        codec if codec.contains("pcm") => "PCM",
        _ => codec,
    }
    .to_string()
}

fn format_subtitle_codec(codec: &str) -> String {
    match codec.to_lowercase().as_str() {
        codec if codec.contains("srt") || codec.contains("subrip") => "SRT",
        codec if codec.contains("webvtt") || codec.contains("vtt") => "WebVTT",
        codec if codec.contains("ass") || codec.contains("ssa") => "ASS/SSA",
        codec if codec.contains("pgs") => "PGS",
        codec if codec.contains("dvb") => "DVB",
        codec if codec.contains("dvd") => "DVD",
        _ => codec,
    }
    .to_string()
}

fn format_channels(channels: i64) -> String {
    match channels {
        1 => "Mono".to_string(),
        2 => "Stereo".to_string(),
        6 => "5.1".to_string(),
        8 => "7.1".to_string(),
        _ => format!("{} ch", channels),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::settings::keys;

    fn subs() -> Vec<Track> {
        vec![
            Track::new(1, TrackKind::Sub).with_lang("jpn").with_title("Full"),
            Track::new(2, TrackKind::Sub).with_title("Signs & Songs"),
            Track::new(3, TrackKind::Sub).with_lang("eng").with_title("Full"),
            Track::new(4, TrackKind::Sub).with_lang("eng").with_title("SDH"),
        ]
    }

    fn memory(item: &str, id: i64, lang: Option<&str>, title: Option<&str>) -> TrackMemory {
        TrackMemory {
            track_id: ItemId::from(item),
            selected_track_id: id,
            lang: lang.map(str::to_owned),
            title: title.map(str::to_owned),
        }
    }

    #[test]
    fn same_item_restores_exact_id() {
        let tracks = subs();
        let memory = memory("ep1", 4, Some("jpn"), None);
        let chosen = select_restored(&memory, &tracks, &ItemId::from("ep1"));
        assert_eq!(chosen.map(|t| t.id), Some(4));
    }

    #[test]
    fn other_item_matches_language_first() {
        let tracks = subs();
        let memory = memory("ep1", 99, Some("eng"), Some("Full"));
        let chosen = select_restored(&memory, &tracks, &ItemId::from("ep2"));
        assert_eq!(chosen.map(|t| t.id), Some(3));
    }

    #[test]
    fn language_beats_earlier_title_match() {
        let tracks = subs();
        let memory = memory("ep1", 99, Some("eng"), Some("Signs & Songs"));
        let chosen = select_restored(&memory, &tracks, &ItemId::from("ep2"));
        assert_eq!(chosen.map(|t| t.id), Some(3));
    }

    #[test]
    fn falls_back_to_title() {
        let tracks = subs();
        let memory = memory("ep1", 99, Some("ger"), Some("Signs & Songs"));
        let chosen = select_restored(&memory, &tracks, &ItemId::from("ep2"));
        assert_eq!(chosen.map(|t| t.id), Some(2));
    }

    #[test]
    fn other_item_ignores_matching_id() {
        let tracks = subs();
        let memory = memory("ep1", 4, Some("jpn"), None);
        let chosen = select_restored(&memory, &tracks, &ItemId::from("ep2"));
        assert_eq!(chosen.map(|t| t.id), Some(1));
    }

    #[test]
    fn missing_fields_do_not_match_missing_fields() {
        let tracks = vec![Track::new(7, TrackKind::Sub)];
        let memory = memory("ep1", 1, None, None);
        assert!(select_restored(&memory, &tracks, &ItemId::from("ep2")).is_none());
    }

    #[test]
    fn remember_and_restore_through_settings() {
        let settings = PlayerSettings::in_memory();
        let memory = TrackSelectionMemory::new(settings.clone());
        let tracks = subs();

        memory
            .remember(TrackSlot::Subtitle, &ItemId::from("ep1"), &tracks[3])
            .unwrap();

        let restored = memory
            .restore(TrackSlot::Subtitle, &tracks, &ItemId::from("ep1"))
            .map(|t| t.id);
        assert_eq!(restored, Some(4));
        assert!(
            memory
                .restore(TrackSlot::Audio, &tracks, &ItemId::from("ep1"))
                .is_none()
        );
    }

    #[test]
    fn disabled_memory_neither_stores_nor_restores() {
        let settings = PlayerSettings::in_memory();
        let memory = TrackSelectionMemory::new(settings.clone());
        let tracks = subs();

        memory
            .remember(TrackSlot::Audio, &ItemId::from("ep1"), &tracks[0])
            .unwrap();
        settings.set(keys::REMEMBER_AUDIO_TRACK, &false).unwrap();

        assert!(
            memory
                .restore(TrackSlot::Audio, &tracks, &ItemId::from("ep1"))
                .is_none()
        );

        memory
            .remember(TrackSlot::Audio, &ItemId::from("ep2"), &tracks[1])
            .unwrap();
        settings.set(keys::REMEMBER_AUDIO_TRACK, &true).unwrap();
        assert_eq!(
            memory.recall(TrackSlot::Audio).map(|m| m.track_id),
            Some(ItemId::from("ep1"))
        );
    }

    #[test]
    fn memory_record_uses_camel_case_keys() {
        let record = memory("ep1", 2, Some("eng"), None);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["trackId"], "ep1");
        assert_eq!(json["selectedTrackId"], 2);
    }

    #[test]
    fn formats_tracks_for_notifications() {
        let mut audio = Track::new(1, TrackKind::Audio).with_lang("jpn");
        audio.codec = Some("eac3".into());
        audio.channels = Some(6);
        assert_eq!(format_track(&audio), "Japanese (E-AC3 5.1)");

        let sub = Track::new(2, TrackKind::Sub).with_title("Signs");
        assert_eq!(
            track_notification_message(TrackSlot::Subtitle, Some(&sub)),
            "Subtitles: Signs"
        );
        assert_eq!(
            track_notification_message(TrackSlot::Subtitle, None),
            "Subtitles: Off"
        );
    }
}
