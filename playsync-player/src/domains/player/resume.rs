//! Resume-or-restart decision for a newly loaded item.

use playsync_model::{ServerConfiguration, TICKS_PER_SECOND, ticks_to_seconds};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResumeDecision {
    pub should_seek: bool,
    pub seek_to_seconds: f64,
}

impl ResumeDecision {
    pub const START_OVER: ResumeDecision = ResumeDecision {
        should_seek: false,
        seek_to_seconds: 0.0,
    };

    /// Value for the engine's `start` option.
    pub fn start_option(&self) -> String {
        if self.should_seek {
            format!("{:.3}", self.seek_to_seconds)
        } else {
            "0".to_string()
        }
    }
}

/// Decide whether to resume from the saved position.
///
/// Resumes only when the watched percentage sits inside the server's
/// `[min, max]` window and the position is more than a second away from
/// both ends. Unknown totals never resume.
pub fn decide(
    position_ticks: i64,
    total_ticks: Option<i64>,
    bounds: &ServerConfiguration,
) -> ResumeDecision {
    let Some(total_ticks) = total_ticks.filter(|t| *t > 0) else {
        return ResumeDecision::START_OVER;
    };
    if position_ticks <= 0 {
        return ResumeDecision::START_OVER;
    }

    let percentage = position_ticks as f64 * 100.0 / total_ticks as f64;
    let within_window = percentage >= bounds.min_resume_pct
        && percentage <= bounds.max_resume_pct;
    let away_from_edges = position_ticks > TICKS_PER_SECOND
        && position_ticks < total_ticks - TICKS_PER_SECOND;

    if within_window && away_from_edges {
        ResumeDecision {
            should_seek: true,
            seek_to_seconds: ticks_to_seconds(position_ticks),
        }
    } else {
        ResumeDecision::START_OVER
    }
}
