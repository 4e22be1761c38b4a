//! Calendar and ramp rules: when outbound actions may happen and how many.

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use healer_core::{ProgressiveConfig, WeekendConfig};

/// Returns true if `local` falls inside the weekend blackout.
///
/// The window runs from Friday at `friday_start_hour` until Monday at
/// `monday_end_hour`, local time.
pub fn is_weekend_blackout(local: NaiveDateTime, window: &WeekendConfig) -> bool {
    match local.weekday() {
        Weekday::Sat | Weekday::Sun => true,
        Weekday::Fri => local.hour() >= window.friday_start_hour,
        Weekday::Mon => local.hour() < window.monday_end_hour,
        _ => false,
    }
}

/// Daily ceiling for ramp week `week` (weeks count from 1).
pub fn progressive_limit_for(week: u32, ramp: &ProgressiveConfig) -> u32 {
    let weeks_in = week.max(1) - 1;
    ramp.starting_limit
        .saturating_add(weeks_in.saturating_mul(ramp.weekly_increase))
        .min(ramp.max_limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        // March 2026: the 2nd is a Monday
        NaiveDate::from_ymd_opt(2026, 3, day)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .expect("valid datetime")
    }

    #[test]
    fn test_weekend_window_edges() {
        let window = WeekendConfig::default();

        assert_eq!(at(2, 8).weekday(), Weekday::Mon);
        assert!(is_weekend_blackout(at(2, 8), &window));
        assert!(!is_weekend_blackout(at(2, 9), &window));
        assert!(!is_weekend_blackout(at(4, 12), &window));
        assert!(!is_weekend_blackout(at(6, 17), &window));
        assert!(is_weekend_blackout(at(6, 18), &window));
        assert!(is_weekend_blackout(at(7, 12), &window));
        assert!(is_weekend_blackout(at(8, 23), &window));
    }

    #[test]
    fn test_progressive_ramp() {
        let ramp = ProgressiveConfig::default();
        assert_eq!(progressive_limit_for(1, &ramp), 5);
        assert_eq!(progressive_limit_for(4, &ramp), 14);
        assert_eq!(progressive_limit_for(7, &ramp), 23);
        assert_eq!(progressive_limit_for(8, &ramp), 25);
        assert_eq!(progressive_limit_for(20, &ramp), 25);
        assert_eq!(progressive_limit_for(0, &ramp), 5);
    }
}
