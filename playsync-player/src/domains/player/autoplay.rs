//! "Up next" countdown shown near the end of an item.

use crate::infra::constants::player::AUTOPLAY_COUNTDOWN_SECONDS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoplayState {
    Hidden,
    CountingDown(u32),
}

/// Result of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTick {
    Idle,
    Remaining(u32),
    /// Countdown reached zero; the next item should start.
    Elapsed,
}

#[derive(Debug, Clone)]
pub struct AutoplayCountdown {
    start_from: u32,
    state: AutoplayState,
    /// Set when the user dismissed the overlay for the current item.
    suppressed: bool,
}

impl Default for AutoplayCountdown {
    fn default() -> Self {
        Self::new(AUTOPLAY_COUNTDOWN_SECONDS)
    }
}

impl AutoplayCountdown {
    pub fn new(start_from: u32) -> Self {
        Self {
            start_from: start_from.max(1),
            state: AutoplayState::Hidden,
            suppressed: false,
        }
    }

    pub fn state(&self) -> AutoplayState {
        self.state
    }

    pub fn start_from(&self) -> u32 {
        self.start_from
    }

    pub fn is_visible(&self) -> bool {
        matches!(self.state, AutoplayState::CountingDown(_))
    }

    /// Show the overlay. Returns `false` when already visible or dismissed.
    pub fn start(&mut self) -> bool {
        if self.is_visible() || self.suppressed {
            return false;
        }
        self.state = AutoplayState::CountingDown(self.start_from);
        true
    }

    pub fn tick(&mut self) -> CountdownTick {
        match self.state {
            AutoplayState::Hidden => CountdownTick::Idle,
            AutoplayState::CountingDown(n) if n <= 1 => {
                self.state = AutoplayState::Hidden;
                CountdownTick::Elapsed
            }
            AutoplayState::CountingDown(n) => {
                self.state = AutoplayState::CountingDown(n - 1);
                CountdownTick::Remaining(n - 1)
            }
        }
    }

    /// Hide without suppressing; the overlay may come back for this item.
    pub fn cancel(&mut self) {
        self.state = AutoplayState::Hidden;
    }

    /// User dismissed the overlay; stay hidden until the track changes.
    pub fn dismiss(&mut self) {
        self.state = AutoplayState::Hidden;
        self.suppressed = true;
    }

    pub fn reset_for_new_track(&mut self) {
        self.state = AutoplayState::Hidden;
        self.suppressed = false;
    }
}

/// Whether playback is close enough to the end to offer the next item.
pub fn should_offer(position: f64, duration: f64, countdown_seconds: u32) -> bool {
    duration > 0.0
        && position > 0.0
        && duration - position <= f64::from(countdown_seconds)
}
