//! Conversions between engine seconds and the remote service's ticks.
//!
//! One tick is 100ns. The ratio is a wire contract with the server.

pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Convert engine seconds to server ticks, flooring partial ticks.
pub fn seconds_to_ticks(seconds: f64) -> i64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * TICKS_PER_SECOND as f64).floor() as i64
}

pub fn ticks_to_seconds(ticks: i64) -> f64 {
    ticks as f64 / TICKS_PER_SECOND as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_both_ways() {
        assert_eq!(seconds_to_ticks(180.0), 1_800_000_000);
        assert_eq!(ticks_to_seconds(1_800_000_000), 180.0);
        assert_eq!(seconds_to_ticks(0.00000015), 1);
    }

    #[test]
    fn non_finite_and_negative_become_zero() {
        assert_eq!(seconds_to_ticks(f64::NAN), 0);
        assert_eq!(seconds_to_ticks(-3.0), 0);
        assert_eq!(seconds_to_ticks(f64::INFINITY), 0);
    }
}
