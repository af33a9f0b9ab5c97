//! Persistent key/value preferences.
//!
//! Values are stored as JSON so the same store holds scalars (volume,
//! bitrate) and records (track memory). [`PlayerSettings`] is the typed view
//! the session works with.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{PlayerError, Result};
use crate::infra::constants::player::{DEFAULT_BITRATE, DEFAULT_VOLUME};

/// Keys used by the session.
pub mod keys {
    pub const VOLUME: &str = "volume";
    pub const PREVIOUS_VOLUME: &str = "previous_volume";
    pub const RESUME_ENABLED: &str = "resume_enabled";
    pub const REMEMBER_SUBTITLE_TRACK: &str = "remember_subtitle_track";
    pub const REMEMBER_AUDIO_TRACK: &str = "remember_audio_track";
    pub const SUBTITLE_MEMORY: &str = "subtitle_memory";
    pub const AUDIO_MEMORY: &str = "audio_memory";
    pub const BITRATE: &str = "bitrate";
    pub const SESSION_PLAY_COUNT: &str = "session_play_count";
    pub const SUBTITLE_FONT_SIZE: &str = "subtitle_font_size";
    pub const SUBTITLE_COLOR: &str = "subtitle_color";
    pub const AUTOPLAY_NEXT_ITEM: &str = "autoplay_next_item";
}

/// Raw preference storage.
pub trait SettingsStore: Send + Sync + fmt::Debug {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local store, used in tests and when no settings file is wanted.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: RwLock<BTreeMap<String, Value>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values.write().remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object on disk.
///
/// Every write replaces the file through a temporary sibling and a rename, so
/// a crash never leaves a half-written document behind.
#[derive(Debug)]
pub struct JsonFileSettingsStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, Value>>,
}

impl JsonFileSettingsStore {
    /// Open the store, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, Value>) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let content = serde_json::to_vec_pretty(values)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&content)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|err| PlayerError::Io(err.error))?;
        Ok(())
    }
}

impl SettingsStore for JsonFileSettingsStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut values = self.values.write();
        values.insert(key.to_string(), value);
        self.persist(&values)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.write();
        if values.remove(key).is_some() {
            self.persist(&values)?;
        }
        Ok(())
    }
}

/// Typed preferences read by the playback session.
#[derive(Debug, Clone)]
pub struct PlayerSettings {
    store: Arc<dyn SettingsStore>,
}

impl PlayerSettings {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySettingsStore::new()))
    }

    pub fn store(&self) -> &Arc<dyn SettingsStore> {
        &self.store
    }

    /// Typed read; malformed values are treated as absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.store.get(key)?;
        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                log::warn!("[Settings] Ignoring malformed value for {key}: {err}");
                None
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.store.set(key, serde_json::to_value(value)?)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.store.remove(key)
    }

    pub fn volume(&self) -> f64 {
        self.get(keys::VOLUME).unwrap_or(DEFAULT_VOLUME)
    }

    pub fn previous_volume(&self) -> Option<f64> {
        self.get(keys::PREVIOUS_VOLUME)
    }

    pub fn resume_enabled(&self) -> bool {
        self.get(keys::RESUME_ENABLED).unwrap_or(true)
    }

    pub fn remember_subtitle_track(&self) -> bool {
        self.get(keys::REMEMBER_SUBTITLE_TRACK).unwrap_or(true)
    }

    pub fn remember_audio_track(&self) -> bool {
        self.get(keys::REMEMBER_AUDIO_TRACK).unwrap_or(true)
    }

    /// Whether the "up next" countdown is offered at all.
    pub fn autoplay_next_item(&self) -> bool {
        self.get(keys::AUTOPLAY_NEXT_ITEM).unwrap_or(true)
    }

    /// Maximum streaming bitrate in bits per second.
    pub fn bitrate(&self) -> u64 {
        self.get(keys::BITRATE).unwrap_or(DEFAULT_BITRATE)
    }

    pub fn set_bitrate(&self, bitrate: u64) -> Result<()> {
        if bitrate == 0 {
            return Err(PlayerError::InvalidArgument(
                "bitrate must be positive".into(),
            ));
        }
        self.set(keys::BITRATE, &bitrate)
    }

    pub fn session_play_count(&self) -> u64 {
        self.get(keys::SESSION_PLAY_COUNT).unwrap_or(0)
    }

    pub fn increment_session_play_count(&self) -> Result<u64> {
        let next = self.session_play_count().saturating_add(1);
        self.set(keys::SESSION_PLAY_COUNT, &next)?;
        Ok(next)
    }

    pub fn reset_session_play_count(&self) -> Result<()> {
        self.set(keys::SESSION_PLAY_COUNT, &0u64)
    }

    pub fn subtitle_font_size(&self) -> Option<u32> {
        self.get(keys::SUBTITLE_FONT_SIZE)
    }

    pub fn subtitle_color(&self) -> Option<String> {
        self.get(keys::SUBTITLE_COLOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let settings = PlayerSettings::in_memory();
        assert_eq!(settings.volume(), DEFAULT_VOLUME);
        assert!(settings.resume_enabled());
        assert!(settings.remember_subtitle_track());
        assert!(settings.remember_audio_track());
        assert!(settings.autoplay_next_item());
        assert_eq!(settings.bitrate(), DEFAULT_BITRATE);
        assert_eq!(settings.previous_volume(), None);
    }

    #[test]
    fn malformed_values_read_as_absent() {
        let settings = PlayerSettings::in_memory();
        settings
            .store()
            .set(keys::VOLUME, Value::String("loud".into()))
            .unwrap();
        assert_eq!(settings.volume(), DEFAULT_VOLUME);
    }

    #[test]
    fn session_play_count_increments_and_resets() {
        let settings = PlayerSettings::in_memory();
        assert_eq!(settings.increment_session_play_count().unwrap(), 1);
        assert_eq!(settings.increment_session_play_count().unwrap(), 2);
        settings.reset_session_play_count().unwrap();
        assert_eq!(settings.session_play_count(), 0);
    }

    #[test]
    fn zero_bitrate_is_rejected() {
        let settings = PlayerSettings::in_memory();
        assert!(settings.set_bitrate(0).is_err());
        settings.set_bitrate(8_000_000).unwrap();
        assert_eq!(settings.bitrate(), 8_000_000);
    }

    #[test]
    fn json_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        {
            let store = JsonFileSettingsStore::open(&path).unwrap();
            store.set(keys::VOLUME, Value::from(35.0)).unwrap();
            store.set(keys::PREVIOUS_VOLUME, Value::from(60.0)).unwrap();
            store.remove(keys::PREVIOUS_VOLUME).unwrap();
        }

        let reopened = JsonFileSettingsStore::open(&path).unwrap();
        assert_eq!(reopened.get(keys::VOLUME), Some(Value::from(35.0)));
        assert_eq!(reopened.get(keys::PREVIOUS_VOLUME), None);
    }

    #[test]
    fn json_store_starts_empty_for_blank_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "  ").unwrap();
        let store = JsonFileSettingsStore::open(&path).unwrap();
        assert_eq!(store.get(keys::VOLUME), None);
    }
}
