//! Race-relative placement of plan workouts.
//!
//! Week 0 is the week containing the race day; a parsed week `n` lies `n`
//! weeks earlier. Within a week, a workout's day number selects one of the
//! preferred weekdays; occupied dates advance day by day, past the week
//! boundary if necessary, so placement always succeeds for parsed names.

use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use thiserror::Error;

use crate::planning::config::PlanConfig;
use crate::workouts::naming::parse_name;
use crate::workouts::types::Workout;

/// Errors preventing a scheduler from being constructed.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The plan configuration has no race day
    #[error("no race day configured")]
    MissingRaceDay,
}

/// Outcome of a scheduling pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleReport {
    /// Workouts placed on a date, in placement order
    pub placed: Vec<(String, NaiveDate)>,
    /// Workouts whose names did not parse; they need manual placement
    pub needs_manual: Vec<String>,
}

/// Stateful scheduler for one plan.
///
/// The set of already-placed dates is explicit state on this value, so
/// repeated runs from a fresh scheduler are deterministic.
pub struct Scheduler {
    race_day: NaiveDate,
    preferred_days: Vec<Weekday>,
    occupied: BTreeSet<NaiveDate>,
}

impl Scheduler {
    /// Build a scheduler from a plan configuration.
    ///
    /// An empty preferred-day list falls back to the full week.
    pub fn new(config: &PlanConfig) -> Result<Self, ScheduleError> {
        let race_day = config.race_day.ok_or(ScheduleError::MissingRaceDay)?;

        let mut preferred_days = if config.preferred_days.is_empty() {
            vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
                Weekday::Sun,
            ]
        } else {
            config.preferred_days.clone()
        };
        preferred_days.sort_by_key(|d| d.num_days_from_monday());
        preferred_days.dedup();

        Ok(Self {
            race_day,
            preferred_days,
            occupied: BTreeSet::new(),
        })
    }

    /// Monday of the week `week` weeks before the race week.
    fn week_start(&self, week: u32) -> NaiveDate {
        let race_monday = self.race_day
            - Duration::days(self.race_day.weekday().num_days_from_monday() as i64);
        race_monday - Duration::days(7 * week as i64)
    }

    /// Place every workout whose parsed week equals `week`.
    ///
    /// Existing placements of those workouts are overwritten, not merged.
    pub fn schedule_week(
        &mut self,
        workouts: &mut [Workout],
        week: u32,
    ) -> Vec<(String, NaiveDate)> {
        let mut selected: Vec<(u32, usize)> = Vec::new();
        for (index, workout) in workouts.iter().enumerate() {
            if let Some(parsed) = parse_name(&workout.name) {
                if parsed.week == week {
                    selected.push((parsed.day, index));
                }
            }
        }
        selected.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then_with(|| workouts[a.1].name.cmp(&workouts[b.1].name))
        });

        for &(_, index) in &selected {
            if let Some(date) = workouts[index].scheduled_date.take() {
                self.occupied.remove(&date);
            }
        }

        let week_start = self.week_start(week);
        let mut placed = Vec::new();

        for &(day, index) in &selected {
            let slot = (day.max(1) - 1) as usize % self.preferred_days.len();
            let weekday = self.preferred_days[slot];
            let mut date = week_start + Duration::days(weekday.num_days_from_monday() as i64);

            while self.occupied.contains(&date) {
                date += Duration::days(1);
            }

            self.occupied.insert(date);
            workouts[index].scheduled_date = Some(date);
            placed.push((workouts[index].name.clone(), date));
        }

        tracing::info!("Scheduled {} workouts for week {}", placed.len(), week);
        placed
    }

    /// Place every parseable workout, ascending week order, so collision
    /// checks in later weeks see earlier placements.
    pub fn schedule_all(&mut self, workouts: &mut [Workout]) -> ScheduleReport {
        let mut weeks = BTreeSet::new();
        let mut needs_manual = Vec::new();

        for workout in workouts.iter() {
            match parse_name(&workout.name) {
                Some(parsed) => {
                    weeks.insert(parsed.week);
                }
                None => needs_manual.push(workout.name.clone()),
            }
        }

        let mut placed = Vec::new();
        for week in weeks {
            placed.extend(self.schedule_week(workouts, week));
        }

        if !needs_manual.is_empty() {
            tracing::warn!(
                "{} workouts need manual scheduling: {}",
                needs_manual.len(),
                needs_manual.join(", ")
            );
        }

        ScheduleReport {
            placed,
            needs_manual,
        }
    }
}
