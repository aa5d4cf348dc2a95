//! Shared fixtures for integration tests.
#![allow(dead_code)]

use chrono::NaiveDate;
use trainplan::codecs::PlanDocument;
use trainplan::planning::PlanConfig;
use trainplan::workouts::types::{
    EndCondition, SimpleStep, Sport, Step, StepType, Target, Workout,
};
use trainplan::zones::{ZoneKind, ZoneRegistry};

pub fn date(text: &str) -> NaiveDate {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").unwrap()
}

fn simple(step_type: StepType, end: EndCondition, target: Target) -> Step {
    Step::Simple(SimpleStep::new(step_type, end).with_target(target))
}

fn zone(name: &str) -> Target {
    Target::Zone {
        name: name.to_string(),
    }
}

/// A plan exercising every codec feature: all three sports, nested repeats,
/// named and literal targets, open ranges, scheduled dates, descriptions.
pub fn sample_document() -> PlanDocument {
    let mut long_run = Workout::new("W01D01 - Lungo", Sport::Running);
    long_run.description = Some("Progressive long run".to_string());
    long_run.add_step(simple(
        StepType::Warmup,
        EndCondition::Time { seconds: 600 },
        zone("Z1_HR"),
    ));
    long_run.add_step(simple(
        StepType::Interval,
        EndCondition::Distance { meters: 12_000 },
        zone("marathon"),
    ));
    long_run.add_step(simple(
        StepType::Cooldown,
        EndCondition::LapButton,
        Target::Open,
    ));

    let mut intervals = Workout::new("W01D02 - Intervalli", Sport::Running);
    intervals
        .add_repeat(
            5,
            vec![
                simple(
                    StepType::Interval,
                    EndCondition::Distance { meters: 400 },
                    zone("Z4"),
                ),
                simple(
                    StepType::Recovery,
                    EndCondition::Time { seconds: 120 },
                    zone("Z1_HR"),
                ),
            ],
        )
        .unwrap();

    let mut bike = Workout::new("W02D01 - Sweet spot", Sport::Cycling);
    bike.add_step(simple(
        StepType::Warmup,
        EndCondition::Time { seconds: 900 },
        Target::Range {
            kind: ZoneKind::Power,
            min: f64::NEG_INFINITY,
            max: 150.0,
        },
    ));
    bike.add_repeat(
        3,
        vec![
            simple(
                StepType::Interval,
                EndCondition::Time { seconds: 600 },
                zone("sweet_spot"),
            ),
            simple(
                StepType::Recovery,
                EndCondition::Time { seconds: 300 },
                zone("recovery"),
            ),
        ],
    )
    .unwrap();
    bike.add_step(simple(
        StepType::Cooldown,
        EndCondition::Time { seconds: 600 },
        Target::Range {
            kind: ZoneKind::HeartRate,
            min: 120.0,
            max: 130.0,
        },
    ));

    let mut swim = Workout::new("W02D02 - Tecnica", Sport::Swimming);
    swim.scheduled_date = Some(date("2026-04-16"));
    swim.add_step(Step::Repeat {
        count: 2,
        steps: vec![
            Step::Repeat {
                count: 2,
                steps: vec![simple(
                    StepType::Interval,
                    EndCondition::Distance { meters: 100 },
                    zone("Z2"),
                )],
            },
            simple(StepType::Rest, EndCondition::Time { seconds: 30 }, Target::Open),
        ],
    });

    let unscheduled = Workout::new("Extra shakeout", Sport::Running);

    PlanDocument {
        config: PlanConfig {
            athlete_name: "Mario Rossi".to_string(),
            name_prefix: String::new(),
            race_day: Some(date("2026-05-03")),
            preferred_days: PlanConfig::default().preferred_days,
        },
        zones: ZoneRegistry::standard(),
        workouts: vec![long_run, intervals, bike, swim, unscheduled],
    }
}
