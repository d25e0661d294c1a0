use serde::{Deserialize, Serialize};

/// The five schedule time fields carried by every scheduling request.
///
/// Interpretation depends on the command: an offset from now (Relative,
/// Periodic) or an absolute local timestamp (Absolute, where `years` is the
/// calendar year and `days` counts from January 1).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSpec {
    #[serde(default)]
    pub years: i64,
    #[serde(default)]
    pub days: i64,
    #[serde(default)]
    pub hours: i64,
    #[serde(default)]
    pub minutes: i64,
    #[serde(default)]
    pub seconds: i64,
}

impl TimeSpec {
    pub fn new(years: i64, days: i64, hours: i64, minutes: i64, seconds: i64) -> Self {
        Self {
            years,
            days,
            hours,
            minutes,
            seconds,
        }
    }

    /// Total seconds using fixed unit sizes: a year is 365 days exactly.
    /// Used for the periodic repeat interval; leap years are intentionally
    /// not accounted for.
    pub fn fixed_seconds(&self) -> i64 {
        self.years * 31_536_000
            + self.days * 86_400
            + self.hours * 3_600
            + self.minutes * 60
            + self.seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_seconds_uses_365_day_year() {
        let spec = TimeSpec::new(1, 0, 0, 0, 0);
        assert_eq!(spec.fixed_seconds(), 31_536_000);
    }

    #[test]
    fn fixed_seconds_sums_components() {
        let spec = TimeSpec::new(0, 2, 3, 4, 5);
        assert_eq!(spec.fixed_seconds(), 2 * 86_400 + 3 * 3_600 + 4 * 60 + 5);
    }
}
