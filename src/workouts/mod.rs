//! Workout model and naming convention.

pub mod naming;
pub mod types;

pub use naming::{format_name, parse_name, ParsedName};
pub use types::{
    upsert_workouts, EndCondition, Flatten, SimpleStep, Sport, Step, StepType, Target, Workout,
    WorkoutError,
};
