//! Bidirectional document codecs.
//!
//! Both file formats project the same canonical schema: plan configuration,
//! zone tables, and the ordered workout list. The hierarchical codec targets
//! a YAML document, the tabular codec a sheet workbook; each must round-trip
//! a document to an equal in-memory plan.

pub mod sheet;
pub mod step_literal;
pub mod yaml;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::planning::config::PlanConfig;
use crate::workouts::types::{EndCondition, SimpleStep, Sport, Step, StepType, Target, Workout};
use crate::zones::registry::ZoneRegistry;

/// The canonical in-memory plan carried by both formats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanDocument {
    pub config: PlanConfig,
    pub zones: ZoneRegistry,
    pub workouts: Vec<Workout>,
}

/// A non-fatal problem found while decoding.
///
/// Decoding keeps going: the offending zone or step is skipped (or left
/// target-less) and the issue recorded here with enough context to point a
/// user at the exact row.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeIssue {
    /// Where the problem is, e.g. `workout 'W1D3 - Intervals', step 4`
    pub location: String,
    pub message: String,
}

impl DecodeIssue {
    pub fn new(location: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self {
            location: location.into(),
            message: message.to_string(),
        }
    }
}

/// A decoded plan plus any local issues encountered on the way.
#[derive(Debug)]
pub struct Decoded {
    pub document: PlanDocument,
    pub issues: Vec<DecodeIssue>,
}

/// Fatal document-level failures.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// A required section is absent; no partial plan is returned
    #[error("missing required section: {0}")]
    MissingSection(&'static str),

    /// The document structure itself is broken
    #[error("malformed document: {0}")]
    Malformed(String),

    /// Encoding failed
    #[error("failed to serialize document: {0}")]
    Serialize(String),
}

/// A starter plan: stock zones, default configuration, and one sample week
/// holding a structured sample workout. Encode it with either codec to seed
/// a new plan file.
pub fn template_document() -> PlanDocument {
    let mut workout = Workout::new("W01D01 - Sample intervals", Sport::Running);
    workout.description = Some("Interval session to copy from".to_string());

    workout.add_step(Step::Simple(
        SimpleStep::new(StepType::Warmup, EndCondition::Time { seconds: 600 }).with_target(
            Target::Zone {
                name: "Z1".to_string(),
            },
        ),
    ));
    workout
        .add_repeat(
            4,
            vec![
                Step::Simple(
                    SimpleStep::new(StepType::Interval, EndCondition::Distance { meters: 400 })
                        .with_target(Target::Zone {
                            name: "Z4".to_string(),
                        }),
                ),
                Step::Simple(
                    SimpleStep::new(StepType::Recovery, EndCondition::Time { seconds: 120 })
                        .with_target(Target::Zone {
                            name: "Z1_HR".to_string(),
                        }),
                ),
            ],
        )
        .expect("template repeat count");
    workout.add_step(Step::Simple(SimpleStep::new(
        StepType::Cooldown,
        EndCondition::Time { seconds: 300 },
    )));

    PlanDocument {
        config: PlanConfig::default(),
        zones: ZoneRegistry::standard(),
        workouts: vec![workout],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_has_sample_week() {
        let document = template_document();
        assert_eq!(document.workouts.len(), 1);
        assert!(crate::workouts::naming::parse_name(&document.workouts[0].name).is_some());
        assert!(!document.zones.running_paces.is_empty());
        assert!(!document.zones.heart_rates.is_empty());
        // warmup + 4 * 2 + cooldown
        assert_eq!(document.workouts[0].flatten().count(), 10);
    }
}
