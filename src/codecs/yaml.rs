//! Hierarchical YAML plan codec.
//!
//! The document carries `config`, `paces` and `heart_rates` sections
//! (required), optional `swim_paces` and `power_values` tables, and then one
//! entry per workout: an ordered list mixing `sport_type`/`date` metadata
//! items, simple-step literals, and nested `repeat` blocks.

use chrono::NaiveDate;
use serde_yaml::{Mapping, Value};

use crate::codecs::step_literal::{format_step_value, parse_step_value};
use crate::codecs::{DecodeIssue, Decoded, DocumentError, PlanDocument};
use crate::planning::config::{weekday_from_index, weekday_index, PlanConfig};
use crate::workouts::types::{Sport, Step, StepType, Workout};
use crate::zones::registry::{Zone, ZoneKind, ZoneRegistry, ZoneValue};

const SECTION_KEYS: [&str; 5] = [
    "config",
    "paces",
    "swim_paces",
    "power_values",
    "heart_rates",
];

/// Decode a YAML plan document.
pub fn decode(text: &str) -> Result<Decoded, DocumentError> {
    let root: Value =
        serde_yaml::from_str(text).map_err(|e| DocumentError::Malformed(e.to_string()))?;
    let root = root
        .as_mapping()
        .ok_or_else(|| DocumentError::Malformed("document root must be a mapping".to_string()))?;

    let mut issues = Vec::new();

    let config_map = lookup(root, "config")
        .and_then(Value::as_mapping)
        .ok_or(DocumentError::MissingSection("config"))?;
    let config = parse_config(config_map, &mut issues);

    let mut zones = ZoneRegistry::new();
    zones.running_paces = parse_zone_section(root, "paces", ZoneKind::Pace, true, &mut issues)?;
    zones.swimming_paces =
        parse_zone_section(root, "swim_paces", ZoneKind::Pace, false, &mut issues)?;
    zones.cycling_power =
        parse_zone_section(root, "power_values", ZoneKind::Power, false, &mut issues)?;
    zones.heart_rates =
        parse_zone_section(root, "heart_rates", ZoneKind::HeartRate, true, &mut issues)?;

    let mut workouts = Vec::new();
    for (key, value) in root {
        let Some(name) = key.as_str() else { continue };
        if SECTION_KEYS.contains(&name) {
            continue;
        }
        if let Some(workout) = parse_workout(name, value, &config, &mut issues) {
            workouts.push(workout);
        }
    }

    tracing::debug!(
        "Decoded YAML plan: {} workouts, {} issues",
        workouts.len(),
        issues.len()
    );

    Ok(Decoded {
        document: PlanDocument {
            config,
            zones,
            workouts,
        },
        issues,
    })
}

/// Encode a plan into a YAML document that decodes back to an equal plan.
pub fn encode(document: &PlanDocument) -> Result<String, DocumentError> {
    let mut root = Mapping::new();

    root.insert(Value::from("config"), config_value(&document.config));
    root.insert(
        Value::from("paces"),
        zone_section_value(&document.zones.running_paces, ZoneKind::Pace),
    );
    if !document.zones.swimming_paces.is_empty() {
        root.insert(
            Value::from("swim_paces"),
            zone_section_value(&document.zones.swimming_paces, ZoneKind::Pace),
        );
    }
    if !document.zones.cycling_power.is_empty() {
        root.insert(
            Value::from("power_values"),
            zone_section_value(&document.zones.cycling_power, ZoneKind::Power),
        );
    }
    root.insert(
        Value::from("heart_rates"),
        zone_section_value(&document.zones.heart_rates, ZoneKind::HeartRate),
    );

    for workout in &document.workouts {
        root.insert(Value::from(workout.name.as_str()), workout_value(workout));
    }

    serde_yaml::to_string(&Value::Mapping(root)).map_err(|e| DocumentError::Serialize(e.to_string()))
}

/// Encode the starter plan artifact.
pub fn encode_template() -> Result<String, DocumentError> {
    encode(&crate::codecs::template_document())
}

fn lookup<'a>(map: &'a Mapping, key: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| k.as_str() == Some(key))
        .map(|(_, v)| v)
}

fn parse_config(map: &Mapping, issues: &mut Vec<DecodeIssue>) -> PlanConfig {
    let mut config = PlanConfig {
        athlete_name: lookup(map, "athlete_name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        name_prefix: lookup(map, "name_prefix")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        race_day: None,
        preferred_days: Vec::new(),
    };

    if let Some(text) = lookup(map, "race_day").and_then(Value::as_str) {
        if !text.is_empty() {
            match NaiveDate::parse_from_str(text, "%Y-%m-%d") {
                Ok(date) => config.race_day = Some(date),
                Err(_) => issues.push(DecodeIssue::new(
                    "config: race_day",
                    format!("invalid date '{}'", text),
                )),
            }
        }
    }

    match lookup(map, "preferred_days") {
        Some(Value::Sequence(items)) => {
            for item in items {
                push_preferred_day(&mut config, item.as_u64(), issues);
            }
        }
        // Legacy exports carried the list as its string repr, "[1, 3, 5]".
        Some(Value::String(text)) => {
            for part in text.trim_matches(['[', ']']).split(',') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                push_preferred_day(&mut config, part.parse().ok(), issues);
            }
        }
        _ => {}
    }

    config
}

fn push_preferred_day(config: &mut PlanConfig, index: Option<u64>, issues: &mut Vec<DecodeIssue>) {
    match index.and_then(|i| weekday_from_index(i as u32)) {
        Some(day) => config.preferred_days.push(day),
        None => issues.push(DecodeIssue::new(
            "config: preferred_days",
            "weekday index must be 0-6",
        )),
    }
}

fn parse_zone_section(
    root: &Mapping,
    section: &'static str,
    kind: ZoneKind,
    required: bool,
    issues: &mut Vec<DecodeIssue>,
) -> Result<Vec<Zone>, DocumentError> {
    let value = match lookup(root, section) {
        Some(value) => value,
        None if required => return Err(DocumentError::MissingSection(section)),
        None => return Ok(Vec::new()),
    };
    let map = value
        .as_mapping()
        .ok_or_else(|| DocumentError::Malformed(format!("section '{}' must be a mapping", section)))?;

    let mut zones = Vec::new();
    for (key, value) in map {
        let Some(name) = key.as_str() else {
            issues.push(DecodeIssue::new(section, "zone names must be strings"));
            continue;
        };
        let Some(literal) = value_literal(value) else {
            issues.push(DecodeIssue::new(
                format!("{}: {}", section, name),
                "zone value must be a scalar",
            ));
            continue;
        };
        match ZoneValue::parse(kind, &literal) {
            Ok(zone_value) => zones.push(Zone::new(name, zone_value)),
            Err(err) => issues.push(DecodeIssue::new(format!("{}: {}", section, name), err)),
        }
    }
    Ok(zones)
}

fn parse_workout(
    name: &str,
    value: &Value,
    config: &PlanConfig,
    issues: &mut Vec<DecodeIssue>,
) -> Option<Workout> {
    let location = format!("workout '{}'", name);

    let Some(items) = value.as_sequence() else {
        issues.push(DecodeIssue::new(
            location,
            "workout entry must be a list of steps",
        ));
        return None;
    };

    // The sport marker may appear anywhere; it is needed before step
    // literals can be interpreted.
    let sport = items
        .iter()
        .filter_map(Value::as_mapping)
        .filter_map(|m| lookup(m, "sport_type"))
        .filter_map(Value::as_str)
        .find_map(Sport::from_key)
        .unwrap_or(Sport::Running);

    let display_name = if !config.name_prefix.is_empty() {
        name.strip_prefix(&config.name_prefix)
            .map(str::trim_start)
            .unwrap_or(name)
    } else {
        name
    };

    let mut workout = Workout::new(display_name, sport);

    for (index, item) in items.iter().enumerate() {
        let item_location = format!("workout '{}', item {}", name, index + 1);

        let Some(map) = item.as_mapping() else {
            issues.push(DecodeIssue::new(item_location, "expected a mapping item"));
            continue;
        };

        if lookup(map, "sport_type").is_some() {
            continue;
        }

        if let Some(text) = lookup(map, "description").and_then(Value::as_str) {
            workout.description = Some(text.to_string());
            continue;
        }

        if let Some(date_value) = lookup(map, "date") {
            match date_value
                .as_str()
                .and_then(|t| NaiveDate::parse_from_str(t, "%Y-%m-%d").ok())
            {
                Some(date) => workout.scheduled_date = Some(date),
                None => issues.push(DecodeIssue::new(item_location, "invalid date")),
            }
            continue;
        }

        if let Some(step) = parse_step_item(map, sport, &item_location, issues) {
            workout.add_step(step);
        }
    }

    Some(workout)
}

fn parse_step_item(
    map: &Mapping,
    sport: Sport,
    location: &str,
    issues: &mut Vec<DecodeIssue>,
) -> Option<Step> {
    if let Some(count_value) = lookup(map, "repeat") {
        let Some(count) = count_value.as_u64().filter(|c| *c >= 1) else {
            issues.push(DecodeIssue::new(
                location.to_string(),
                "repeat count must be a positive integer",
            ));
            return None;
        };

        let mut children = Vec::new();
        if let Some(items) = lookup(map, "steps").and_then(Value::as_sequence) {
            for (index, item) in items.iter().enumerate() {
                let child_location = format!("{}, repeat step {}", location, index + 1);
                let Some(child_map) = item.as_mapping() else {
                    issues.push(DecodeIssue::new(child_location, "expected a mapping item"));
                    continue;
                };
                if let Some(step) = parse_step_item(child_map, sport, &child_location, issues) {
                    children.push(step);
                }
            }
        } else {
            issues.push(DecodeIssue::new(
                location.to_string(),
                "repeat block is missing its steps list",
            ));
        }

        return Step::repeat(count as u32, children).ok();
    }

    let (key, value) = map.iter().next()?;
    let Some(key) = key.as_str() else {
        issues.push(DecodeIssue::new(location.to_string(), "step key must be a string"));
        return None;
    };
    let Some(step_type) = StepType::from_key(key) else {
        issues.push(DecodeIssue::new(
            location.to_string(),
            format!("unknown step type '{}'", key),
        ));
        return None;
    };
    let Some(literal) = value_literal(value) else {
        issues.push(DecodeIssue::new(
            location.to_string(),
            "step value must be a scalar",
        ));
        return None;
    };

    match parse_step_value(step_type, sport, &literal) {
        Ok(parsed) => {
            if let Some(issue) = parsed.target_issue {
                issues.push(DecodeIssue::new(location.to_string(), issue));
            }
            Some(Step::Simple(parsed.step))
        }
        Err(err) => {
            issues.push(DecodeIssue::new(location.to_string(), err));
            None
        }
    }
}

fn value_literal(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => {
            if let Some(n) = number.as_i64() {
                Some(n.to_string())
            } else {
                number.as_f64().map(|f| f.to_string())
            }
        }
        _ => None,
    }
}

fn config_value(config: &PlanConfig) -> Value {
    let mut map = Mapping::new();
    map.insert(
        Value::from("athlete_name"),
        Value::from(config.athlete_name.as_str()),
    );
    map.insert(
        Value::from("name_prefix"),
        Value::from(config.name_prefix.as_str()),
    );
    map.insert(
        Value::from("race_day"),
        Value::from(
            config
                .race_day
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        ),
    );
    map.insert(
        Value::from("preferred_days"),
        Value::Sequence(
            config
                .preferred_days
                .iter()
                .map(|d| Value::from(weekday_index(*d) as u64))
                .collect(),
        ),
    );
    Value::Mapping(map)
}

fn zone_section_value(zones: &[Zone], kind: ZoneKind) -> Value {
    let mut map = Mapping::new();
    for zone in zones {
        let value = match zone.value {
            // Reference scalars stay numeric, the way users write them.
            ZoneValue::Scalar(v) if kind != ZoneKind::Pace && v.fract() == 0.0 => {
                Value::from(v as i64)
            }
            _ => Value::from(zone.value.format(kind)),
        };
        map.insert(Value::from(zone.name.as_str()), value);
    }
    Value::Mapping(map)
}

fn workout_value(workout: &Workout) -> Value {
    let mut items = Vec::new();

    let mut sport = Mapping::new();
    sport.insert(
        Value::from("sport_type"),
        Value::from(workout.sport.key()),
    );
    items.push(Value::Mapping(sport));

    if let Some(description) = &workout.description {
        let mut map = Mapping::new();
        map.insert(
            Value::from("description"),
            Value::from(description.as_str()),
        );
        items.push(Value::Mapping(map));
    }

    if let Some(date) = workout.scheduled_date {
        let mut map = Mapping::new();
        map.insert(
            Value::from("date"),
            Value::from(date.format("%Y-%m-%d").to_string()),
        );
        items.push(Value::Mapping(map));
    }

    for step in &workout.steps {
        items.push(step_value(step));
    }

    Value::Sequence(items)
}

fn step_value(step: &Step) -> Value {
    match step {
        Step::Simple(simple) => {
            let mut map = Mapping::new();
            map.insert(
                Value::from(simple.step_type.key()),
                Value::from(format_step_value(simple)),
            );
            Value::Mapping(map)
        }
        Step::Repeat { count, steps } => {
            let mut map = Mapping::new();
            map.insert(Value::from("repeat"), Value::from(*count as u64));
            map.insert(
                Value::from("steps"),
                Value::Sequence(steps.iter().map(step_value).collect()),
            );
            Value::Mapping(map)
        }
    }
}
