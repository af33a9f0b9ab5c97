#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Server-side settings that shape playback decisions.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ServerConfiguration {
    /// Below this watched percentage an item counts as not started.
    #[cfg_attr(feature = "serde", serde(rename = "MinResumePct", default = "default_min"))]
    pub min_resume_pct: f64,
    /// Above this watched percentage an item counts as finished.
    #[cfg_attr(feature = "serde", serde(rename = "MaxResumePct", default = "default_max"))]
    pub max_resume_pct: f64,
}

pub const DEFAULT_MIN_RESUME_PCT: f64 = 5.0;
pub const DEFAULT_MAX_RESUME_PCT: f64 = 95.0;

#[cfg(feature = "serde")]
fn default_min() -> f64 {
    DEFAULT_MIN_RESUME_PCT
}

#[cfg(feature = "serde")]
fn default_max() -> f64 {
    DEFAULT_MAX_RESUME_PCT
}

impl Default for ServerConfiguration {
    fn default() -> Self {
        Self {
            min_resume_pct: DEFAULT_MIN_RESUME_PCT,
            max_resume_pct: DEFAULT_MAX_RESUME_PCT,
        }
    }
}
