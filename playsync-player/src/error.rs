use playsync_model::ItemId;
use thiserror::Error;

/// Errors surfaced by the playback session and its collaborators.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Playback engine is not initialized")]
    EngineNotInitialized,

    #[error("Engine initialization failed: {0}")]
    EngineInit(String),

    #[error("Engine command `{command}` failed: {message}")]
    EngineCommand { command: String, message: String },

    #[error("Failed to load {item}: {message}")]
    Load { item: ItemId, message: String },

    #[error("Catalog request failed: {0}")]
    Catalog(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PlayerError {
    pub fn engine_command(
        command: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        PlayerError::EngineCommand {
            command: command.into(),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for PlayerError {
    fn from(err: reqwest::Error) -> Self {
        PlayerError::Catalog(err.to_string())
    }
}

impl From<url::ParseError> for PlayerError {
    fn from(err: url::ParseError) -> Self {
        PlayerError::Config(format!("invalid url: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, PlayerError>;
