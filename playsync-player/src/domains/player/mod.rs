pub mod autoplay;
pub mod controller;
pub mod messages;
pub mod progress;
pub mod properties;
pub mod resume;
pub mod runtime;
pub mod state;
pub mod track_selection;
pub mod update;
pub mod volume;

pub use controller::{
    SessionController, SessionOptions, SessionServices, SubtitleChoice,
};
pub use messages::SessionCommand;
pub use runtime::{SessionHandle, run_session, spawn_session};
pub use state::{PlaybackSession, PlaybackSnapshot, PlaybackState};
