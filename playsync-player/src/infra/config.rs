use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::infra::constants::player::{
    AUTOPLAY_COUNTDOWN_SECONDS, PROGRESS_REPORT_INTERVAL,
};

const APP_DIR: &str = "playsync";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub server_url: String,
    pub access_token: String,
    pub user_id: Option<String>,
    pub device_id: String,
    pub device_name: String,
    pub client_name: String,
    pub mpv_binary: PathBuf,
    pub mpv_socket_path: Option<PathBuf>,
    pub progress_interval_secs: u64,
    pub autoplay_countdown_secs: u32,
    pub settings_path: Option<PathBuf>,
    pub offline_dir: Option<PathBuf>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8096".to_string(),
            access_token: String::new(),
            user_id: None,
            device_id: uuid::Uuid::new_v4().to_string(),
            device_name: "playsync".to_string(),
            client_name: "playsync".to_string(),
            mpv_binary: PathBuf::from("mpv"),
            mpv_socket_path: None,
            progress_interval_secs: PROGRESS_REPORT_INTERVAL.as_secs(),
            autoplay_countdown_secs: AUTOPLAY_COUNTDOWN_SECONDS,
            settings_path: None,
            offline_dir: None,
        }
    }
}

impl PlayerConfig {
    pub fn app_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR))
    }

    pub fn default_path() -> Option<PathBuf> {
        Self::app_dir().map(|dir| dir.join("config.json"))
    }

    /// Load from the user config directory, then apply environment overrides.
    pub fn load() -> Self {
        let mut config = Self::default_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default();
        config.apply_env();
        config
    }

    /// Read a config file. Missing or unreadable files yield defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(path)
            .map_err(|err| err.to_string())
            .and_then(|content| {
                serde_json::from_str::<PlayerConfig>(&content)
                    .map_err(|err| err.to_string())
            }) {
            Ok(config) => config,
            Err(err) => {
                log::warn!(
                    "[Config] Ignoring {}: {err}",
                    path.display()
                );
                Self::default()
            }
        }
    }

    fn apply_env(&mut self) {
        if let Ok(server_url) = std::env::var("PLAYSYNC_SERVER_URL") {
            self.server_url = server_url;
        }
        if let Ok(token) = std::env::var("PLAYSYNC_ACCESS_TOKEN") {
            self.access_token = token;
        }
        if let Ok(user_id) = std::env::var("PLAYSYNC_USER_ID") {
            self.user_id = Some(user_id);
        }
        if let Ok(mpv) = std::env::var("PLAYSYNC_MPV") {
            self.mpv_binary = PathBuf::from(mpv);
        }
    }

    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(path) = Self::default_path() {
            self.save_to(&path)?;
        }
        Ok(())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_secs(self.progress_interval_secs.max(1))
    }

    pub fn settings_path(&self) -> Option<PathBuf> {
        self.settings_path
            .clone()
            .or_else(|| Self::app_dir().map(|dir| dir.join("settings.json")))
    }
}
