//! Workout model types.
//!
//! A workout is an ordered tree of steps: simple executable segments and
//! repeat groups that own their children by value, so the structure is
//! acyclic by construction.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::zones::ZoneKind;

/// Sport a workout or zone table belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sport {
    Running,
    Cycling,
    Swimming,
}

impl Sport {
    /// Key used in documents and wire payloads.
    pub fn key(&self) -> &'static str {
        match self {
            Sport::Running => "running",
            Sport::Cycling => "cycling",
            Sport::Swimming => "swimming",
        }
    }

    /// Parse a document key.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "running" => Some(Sport::Running),
            "cycling" => Some(Sport::Cycling),
            "swimming" => Some(Sport::Swimming),
            _ => None,
        }
    }
}

impl std::fmt::Display for Sport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Role of a simple step within the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Warmup,
    Cooldown,
    Interval,
    Recovery,
    Rest,
    Other,
}

impl StepType {
    pub fn key(&self) -> &'static str {
        match self {
            StepType::Warmup => "warmup",
            StepType::Cooldown => "cooldown",
            StepType::Interval => "interval",
            StepType::Recovery => "recovery",
            StepType::Rest => "rest",
            StepType::Other => "other",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "warmup" => Some(StepType::Warmup),
            "cooldown" => Some(StepType::Cooldown),
            "interval" => Some(StepType::Interval),
            "recovery" => Some(StepType::Recovery),
            "rest" => Some(StepType::Rest),
            "other" => Some(StepType::Other),
            _ => None,
        }
    }
}

/// How a simple step terminates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndCondition {
    /// Athlete presses the lap button
    LapButton,
    /// Fixed duration
    Time { seconds: u32 },
    /// Fixed distance
    Distance { meters: u32 },
}

/// Intensity target of a simple step.
///
/// A named zone is resolved through the registry at export and sync time;
/// an explicit range bypasses resolution entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// No intensity target
    #[default]
    Open,
    /// Reference to a registered zone by name
    Zone { name: String },
    /// Explicit bounds, with infinity sentinels for open ends
    Range { kind: ZoneKind, min: f64, max: f64 },
}

/// A single executable workout segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleStep {
    pub step_type: StepType,
    pub end: EndCondition,
    pub target: Target,
    pub description: Option<String>,
}

impl SimpleStep {
    pub fn new(step_type: StepType, end: EndCondition) -> Self {
        Self {
            step_type,
            end,
            target: Target::Open,
            description: None,
        }
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }
}

/// A workout step: either a simple segment or a repeat group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Simple(SimpleStep),
    Repeat { count: u32, steps: Vec<Step> },
}

impl Step {
    /// Build a repeat group. The count must be at least 1.
    pub fn repeat(count: u32, steps: Vec<Step>) -> Result<Self, WorkoutError> {
        if count == 0 {
            return Err(WorkoutError::InvalidRepeatCount);
        }
        Ok(Step::Repeat { count, steps })
    }
}

/// Errors from structural workout operations.
#[derive(Debug, Error)]
pub enum WorkoutError {
    /// Repeat count below 1
    #[error("repeat count must be at least 1")]
    InvalidRepeatCount,

    /// Step index outside the container
    #[error("step position {position} out of range (have {len} steps)")]
    PositionOutOfRange { position: usize, len: usize },
}

/// A structured training workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    /// Name, conventionally carrying the `W<week>D<day>` prefix
    pub name: String,
    pub sport: Sport,
    pub description: Option<String>,
    /// Calendar placement, absent until scheduled
    pub scheduled_date: Option<NaiveDate>,
    /// Ordered steps; order is significant and preserved by every codec
    pub steps: Vec<Step>,
}

impl Workout {
    pub fn new(name: impl Into<String>, sport: Sport) -> Self {
        Self {
            name: name.into(),
            sport,
            description: None,
            scheduled_date: None,
            steps: Vec::new(),
        }
    }

    /// Append a step.
    pub fn add_step(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// Insert a step at a position.
    pub fn insert_step(&mut self, position: usize, step: Step) -> Result<(), WorkoutError> {
        if position > self.steps.len() {
            return Err(WorkoutError::PositionOutOfRange {
                position,
                len: self.steps.len(),
            });
        }
        self.steps.insert(position, step);
        Ok(())
    }

    /// Append a repeat group with the given children.
    pub fn add_repeat(&mut self, count: u32, steps: Vec<Step>) -> Result<(), WorkoutError> {
        self.steps.push(Step::repeat(count, steps)?);
        Ok(())
    }

    /// Move a top-level step to a new position. Children of a repeat group
    /// move within their own group only, via [`Workout::reorder_child`].
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), WorkoutError> {
        reorder_in(&mut self.steps, from, to)
    }

    /// Move a child step within the repeat group at `group`.
    pub fn reorder_child(
        &mut self,
        group: usize,
        from: usize,
        to: usize,
    ) -> Result<(), WorkoutError> {
        let len = self.steps.len();
        match self.steps.get_mut(group) {
            Some(Step::Repeat { steps, .. }) => reorder_in(steps, from, to),
            _ => Err(WorkoutError::PositionOutOfRange {
                position: group,
                len,
            }),
        }
    }

    /// Lazy iterator over simple steps in execution order, expanding every
    /// repeat group `count` times. Restart by calling again.
    pub fn flatten(&self) -> Flatten<'_> {
        Flatten {
            stack: vec![Frame {
                steps: &self.steps,
                index: 0,
                remaining: 1,
            }],
        }
    }

    /// Total duration of timed steps over the flattened sequence.
    pub fn duration_seconds(&self) -> u32 {
        self.flatten()
            .filter_map(|s| match s.end {
                EndCondition::Time { seconds } => Some(seconds),
                _ => None,
            })
            .sum()
    }

    /// Total distance of distance-terminated steps over the flattened
    /// sequence.
    pub fn distance_meters(&self) -> u32 {
        self.flatten()
            .filter_map(|s| match s.end {
                EndCondition::Distance { meters } => Some(meters),
                _ => None,
            })
            .sum()
    }
}

fn reorder_in(steps: &mut Vec<Step>, from: usize, to: usize) -> Result<(), WorkoutError> {
    let len = steps.len();
    if from >= len {
        return Err(WorkoutError::PositionOutOfRange {
            position: from,
            len,
        });
    }
    if to >= len {
        return Err(WorkoutError::PositionOutOfRange { position: to, len });
    }
    let step = steps.remove(from);
    steps.insert(to, step);
    Ok(())
}

/// Merge imported workouts into an existing collection, replacing any
/// workout with a matching name.
pub fn upsert_workouts(existing: &mut Vec<Workout>, imported: Vec<Workout>) {
    for workout in imported {
        match existing.iter_mut().find(|w| w.name == workout.name) {
            Some(slot) => *slot = workout,
            None => existing.push(workout),
        }
    }
}

struct Frame<'a> {
    steps: &'a [Step],
    index: usize,
    remaining: u32,
}

/// Iterator produced by [`Workout::flatten`].
pub struct Flatten<'a> {
    stack: Vec<Frame<'a>>,
}

impl<'a> Iterator for Flatten<'a> {
    type Item = &'a SimpleStep;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;

            if frame.index == frame.steps.len() {
                if frame.remaining > 1 {
                    frame.remaining -= 1;
                    frame.index = 0;
                } else {
                    self.stack.pop();
                }
                continue;
            }

            let step = &frame.steps[frame.index];
            frame.index += 1;

            match step {
                Step::Simple(simple) => return Some(simple),
                Step::Repeat { count, steps } => {
                    if *count > 0 && !steps.is_empty() {
                        self.stack.push(Frame {
                            steps,
                            index: 0,
                            remaining: *count,
                        });
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distance_step(step_type: StepType, meters: u32) -> Step {
        Step::Simple(SimpleStep::new(
            step_type,
            EndCondition::Distance { meters },
        ))
    }

    fn timed_step(step_type: StepType, seconds: u32) -> Step {
        Step::Simple(SimpleStep::new(step_type, EndCondition::Time { seconds }))
    }

    #[test]
    fn test_repeat_count_must_be_positive() {
        let mut workout = Workout::new("W01D01 Test", Sport::Running);
        let err = workout.add_repeat(0, vec![]).unwrap_err();
        assert!(matches!(err, WorkoutError::InvalidRepeatCount));
    }

    #[test]
    fn test_flatten_expands_repeats_in_order() {
        let mut workout = Workout::new("W01D02 Intervals", Sport::Running);
        workout.add_step(timed_step(StepType::Warmup, 600));
        workout
            .add_repeat(
                5,
                vec![
                    distance_step(StepType::Interval, 400),
                    distance_step(StepType::Recovery, 200),
                ],
            )
            .unwrap();
        workout.add_step(timed_step(StepType::Cooldown, 300));

        let flat: Vec<_> = workout.flatten().collect();
        // 1 warmup + 5 * 2 + 1 cooldown
        assert_eq!(flat.len(), 12);
        assert_eq!(flat[0].step_type, StepType::Warmup);
        for pair in flat[1..11].chunks(2) {
            assert_eq!(pair[0].step_type, StepType::Interval);
            assert_eq!(pair[1].step_type, StepType::Recovery);
        }
        assert_eq!(flat[11].step_type, StepType::Cooldown);

        // Restartable: a second pass sees the same sequence.
        assert_eq!(workout.flatten().count(), 12);
    }

    #[test]
    fn test_flatten_nested_repeats() {
        let inner = Step::repeat(2, vec![distance_step(StepType::Interval, 100)]).unwrap();
        let mut workout = Workout::new("W02D01 Pyramid", Sport::Running);
        workout
            .add_repeat(3, vec![inner, distance_step(StepType::Recovery, 200)])
            .unwrap();

        // 3 * (2 * 1 + 1) = 9
        assert_eq!(workout.flatten().count(), 9);
        assert_eq!(workout.distance_meters(), 3 * (2 * 100 + 200));
    }

    #[test]
    fn test_reorder_top_level() {
        let mut workout = Workout::new("W01D01 Test", Sport::Running);
        workout.add_step(timed_step(StepType::Warmup, 600));
        workout.add_step(timed_step(StepType::Interval, 120));
        workout.add_step(timed_step(StepType::Cooldown, 300));

        workout.reorder(2, 1).unwrap();
        match &workout.steps[1] {
            Step::Simple(s) => assert_eq!(s.step_type, StepType::Cooldown),
            _ => panic!("expected simple step"),
        }

        assert!(workout.reorder(5, 0).is_err());
    }

    #[test]
    fn test_insert_step_bounds() {
        let mut workout = Workout::new("W01D01 Test", Sport::Running);
        workout.add_step(timed_step(StepType::Interval, 120));

        workout
            .insert_step(0, timed_step(StepType::Warmup, 600))
            .unwrap();
        match &workout.steps[0] {
            Step::Simple(s) => assert_eq!(s.step_type, StepType::Warmup),
            _ => panic!("expected simple step"),
        }

        assert!(workout.insert_step(5, timed_step(StepType::Rest, 30)).is_err());
    }

    #[test]
    fn test_reorder_child_stays_in_group() {
        let mut workout = Workout::new("W01D01 Test", Sport::Running);
        workout
            .add_repeat(
                2,
                vec![
                    distance_step(StepType::Interval, 400),
                    distance_step(StepType::Recovery, 200),
                ],
            )
            .unwrap();

        workout.reorder_child(0, 1, 0).unwrap();
        match &workout.steps[0] {
            Step::Repeat { steps, .. } => match &steps[0] {
                Step::Simple(s) => assert_eq!(s.step_type, StepType::Recovery),
                _ => panic!("expected simple step"),
            },
            _ => panic!("expected repeat group"),
        }

        // Cannot address a simple step as a group.
        workout.add_step(distance_step(StepType::Cooldown, 100));
        assert!(workout.reorder_child(1, 0, 0).is_err());
    }

    #[test]
    fn test_upsert_replaces_by_name() {
        let mut existing = vec![Workout::new("W01D01 Easy", Sport::Running)];
        let mut replacement = Workout::new("W01D01 Easy", Sport::Running);
        replacement.add_step(timed_step(StepType::Other, 60));

        upsert_workouts(&mut existing, vec![replacement]);
        assert_eq!(existing.len(), 1);
        assert_eq!(existing[0].steps.len(), 1);
    }
}
