//! Plan-level configuration.

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Configuration of one training plan.
///
/// `athlete_name` and `name_prefix` are descriptive only; the scheduler
/// uses `race_day` and `preferred_days`. Changing `race_day` after workouts
/// have been placed does not reschedule them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanConfig {
    pub athlete_name: String,
    /// Prefix stripped from workout names on import
    pub name_prefix: String,
    /// Scheduling origin; week 0 is the week containing this date
    pub race_day: Option<NaiveDate>,
    /// Weekdays the scheduler prefers when placing workouts
    pub preferred_days: Vec<Weekday>,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            athlete_name: String::new(),
            name_prefix: String::new(),
            race_day: None,
            preferred_days: vec![Weekday::Tue, Weekday::Thu, Weekday::Sat],
        }
    }
}

/// Map a document weekday index (0 = Monday .. 6 = Sunday) to a weekday.
pub fn weekday_from_index(index: u32) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}

/// Inverse of [`weekday_from_index`].
pub fn weekday_index(day: Weekday) -> u32 {
    day.num_days_from_monday()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekday_index_round_trip() {
        for index in 0..7 {
            let day = weekday_from_index(index).unwrap();
            assert_eq!(weekday_index(day), index);
        }
        assert!(weekday_from_index(7).is_none());
    }
}
