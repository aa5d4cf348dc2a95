//! Trainplan - structured endurance training plan management.
//!
//! The core of a training plan editor: the workout model (steps and repeat
//! groups), named intensity zones with literal-expression resolution, a
//! race-relative plan scheduler, and two lossless document codecs (a
//! hierarchical YAML format and a tabular sheet workbook). Remote calendar
//! sync is a blocking boundary behind the [`sync::RemoteService`] trait.

pub mod codecs;
pub mod planning;
pub mod storage;
pub mod sync;
pub mod workouts;
pub mod zones;

// Re-export commonly used types
pub use codecs::{Decoded, DecodeIssue, DocumentError, PlanDocument};
pub use planning::{PlanConfig, ScheduleReport, Scheduler};
pub use sync::{ConnectClient, RemoteService, SyncError, SyncReport};
pub use workouts::{EndCondition, SimpleStep, Sport, Step, StepType, Target, Workout};
pub use zones::{ZoneError, ZoneKind, ZoneRegistry};
