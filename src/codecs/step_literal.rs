//! The step literal shared by both document formats.
//!
//! A simple step serializes as `<end_spec> @ <zone_or_range> -- <description>`
//! keyed by its step type. End specs: `lap-button` (or empty), `Ns`, `Nmin`,
//! `M:SSmin`, `Nm`, `Nkm`/`N.Nkm`, or a bare meter count. Targets are zone
//! names or range literals, with `bpm`/`W` unit suffixes selecting the kind
//! for plain numeric ranges.

use crate::workouts::types::{EndCondition, SimpleStep, Sport, StepType, Target};
use crate::zones::pace::{format_pace, parse_pace};
use crate::zones::registry::{ZoneError, ZoneKind, ZoneValue};

/// Result of parsing one step literal.
///
/// An unparsable target does not sink the whole step: the step comes back
/// target-less with the issue attached, per the local-skip decode policy.
#[derive(Debug)]
pub struct ParsedStep {
    pub step: SimpleStep,
    pub target_issue: Option<ZoneError>,
}

/// Parse the value part of a step literal.
pub fn parse_step_value(
    step_type: StepType,
    sport: Sport,
    value: &str,
) -> Result<ParsedStep, ZoneError> {
    let value = value.trim();

    let (value, description) = match value.split_once(" -- ") {
        Some((v, d)) => (v.trim_end(), Some(d.trim().to_string())),
        None => (value, None),
    };

    let (end_text, target_text) = match value.split_once(" @ ") {
        Some((e, t)) => (e.trim(), Some(t.trim())),
        None => (value, None),
    };

    let end = parse_end_condition(end_text)?;

    let (target, target_issue) = match target_text {
        Some(text) => match parse_target(sport, text) {
            Ok(target) => (target, None),
            Err(err) => (Target::Open, Some(err)),
        },
        None => (Target::Open, None),
    };

    Ok(ParsedStep {
        step: SimpleStep {
            step_type,
            end,
            target,
            description,
        },
        target_issue,
    })
}

/// Render a simple step back to its literal value.
pub fn format_step_value(step: &SimpleStep) -> String {
    let mut out = format_end_condition(&step.end);

    match &step.target {
        Target::Open => {}
        Target::Zone { name } => {
            out.push_str(" @ ");
            out.push_str(name);
        }
        Target::Range { kind, min, max } => {
            out.push_str(" @ ");
            out.push_str(&format_range(*kind, *min, *max));
        }
    }

    if let Some(description) = &step.description {
        out.push_str(" -- ");
        out.push_str(description);
    }

    out
}

fn parse_end_condition(text: &str) -> Result<EndCondition, ZoneError> {
    if text.is_empty() || text == "lap-button" {
        return Ok(EndCondition::LapButton);
    }

    if let Some(rest) = text.strip_suffix("min") {
        let seconds = if let Some((minutes, secs)) = rest.split_once(':') {
            let minutes: u32 = parse_digits(minutes, text)?;
            let secs: u32 = parse_digits(secs, text)?;
            if secs >= 60 {
                return Err(ZoneError::MalformedExpression(text.to_string()));
            }
            minutes * 60 + secs
        } else {
            parse_digits(rest, text)? * 60
        };
        return Ok(EndCondition::Time { seconds });
    }

    if let Some(rest) = text.strip_suffix("km") {
        return Ok(EndCondition::Distance {
            meters: parse_km(rest, text)?,
        });
    }

    if let Some(rest) = text.strip_suffix('m') {
        return Ok(EndCondition::Distance {
            meters: parse_digits(rest, text)?,
        });
    }

    if let Some(rest) = text.strip_suffix('s') {
        return Ok(EndCondition::Time {
            seconds: parse_digits(rest, text)?,
        });
    }

    // Bare number: meters.
    Ok(EndCondition::Distance {
        meters: parse_digits(text, text)?,
    })
}

fn format_end_condition(end: &EndCondition) -> String {
    match end {
        EndCondition::LapButton => "lap-button".to_string(),
        EndCondition::Time { seconds } => {
            if *seconds < 60 {
                format!("{}s", seconds)
            } else if seconds % 60 == 0 {
                format!("{}min", seconds / 60)
            } else {
                format!("{}:{:02}min", seconds / 60, seconds % 60)
            }
        }
        EndCondition::Distance { meters } => {
            if meters % 1000 == 0 {
                format!("{}km", meters / 1000)
            } else if *meters >= 1000 && meters % 100 == 0 {
                format!("{}.{}km", meters / 1000, (meters % 1000) / 100)
            } else {
                format!("{}m", meters)
            }
        }
    }
}

fn parse_target(sport: Sport, text: &str) -> Result<Target, ZoneError> {
    if is_zone_name(text) {
        return Ok(Target::Zone {
            name: text.to_string(),
        });
    }

    let (body, kind) = if let Some(rest) = strip_suffix_word(text, "bpm") {
        (rest, ZoneKind::HeartRate)
    } else if let Some(rest) = strip_suffix_word(text, "W") {
        (rest, ZoneKind::Power)
    } else if text.contains(':') {
        (text, ZoneKind::Pace)
    } else {
        // Plain numbers: watts for cycling, bpm otherwise.
        let kind = match sport {
            Sport::Cycling => ZoneKind::Power,
            _ => ZoneKind::HeartRate,
        };
        (text, kind)
    };

    let (min, max) = match ZoneValue::parse(kind, body)? {
        ZoneValue::Scalar(v) => (v, v),
        ZoneValue::Range { min, max } => (min, max),
        ZoneValue::OpenLow { max } => (f64::NEG_INFINITY, max),
        ZoneValue::OpenHigh { min } => (min, f64::INFINITY),
        // Percent windows only make sense against the registry's tables.
        ZoneValue::PercentOfRef { .. } => {
            return Err(ZoneError::MalformedExpression(text.to_string()))
        }
    };

    Ok(Target::Range { kind, min, max })
}

fn format_range(kind: ZoneKind, min: f64, max: f64) -> String {
    let core = if min == f64::NEG_INFINITY {
        format!("<{}", format_bound(kind, max))
    } else if max == f64::INFINITY {
        format!("{}+", format_bound(kind, min))
    } else if min == max {
        format_bound(kind, min)
    } else if kind == ZoneKind::Pace {
        // Slow-to-fast, the convention zone tables use.
        format!("{}-{}", format_bound(kind, max), format_bound(kind, min))
    } else {
        format!("{}-{}", format_bound(kind, min), format_bound(kind, max))
    };

    match kind {
        ZoneKind::Pace => core,
        ZoneKind::HeartRate => format!("{} bpm", core),
        ZoneKind::Power => format!("{}W", core),
    }
}

fn format_bound(kind: ZoneKind, value: f64) -> String {
    match kind {
        ZoneKind::Pace => format_pace(value as u32),
        _ => {
            if value.fract() == 0.0 {
                format!("{}", value as i64)
            } else {
                format!("{}", value)
            }
        }
    }
}

fn parse_digits(text: &str, whole: &str) -> Result<u32, ZoneError> {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ZoneError::MalformedExpression(whole.to_string()));
    }
    text.parse()
        .map_err(|_| ZoneError::MalformedExpression(whole.to_string()))
}

/// Parse a kilometre literal (`2`, `2.5`, `2.55`) into exact meters.
fn parse_km(text: &str, whole: &str) -> Result<u32, ZoneError> {
    let text = text.trim();
    match text.split_once('.') {
        None => Ok(parse_digits(text, whole)? * 1000),
        Some((km, frac)) => {
            if frac.is_empty() || frac.len() > 3 {
                return Err(ZoneError::MalformedExpression(whole.to_string()));
            }
            let km = parse_digits(km, whole)?;
            let frac_digits = frac.len() as u32;
            let frac = parse_digits(frac, whole)?;
            Ok(km * 1000 + frac * 10u32.pow(3 - frac_digits))
        }
    }
}

fn strip_suffix_word<'a>(text: &'a str, suffix: &str) -> Option<&'a str> {
    let rest = text.strip_suffix(suffix)?;
    let rest = rest.trim_end();
    // Reject identifiers that merely end with the unit letters.
    if rest.is_empty() || rest.chars().next().map(|c| c.is_ascii_alphabetic()) == Some(true) {
        return None;
    }
    Some(rest)
}

fn is_zone_name(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_and_zone_name() {
        let parsed = parse_step_value(StepType::Warmup, Sport::Running, "10min @ Z2").unwrap();
        assert_eq!(parsed.step.end, EndCondition::Time { seconds: 600 });
        assert_eq!(
            parsed.step.target,
            Target::Zone {
                name: "Z2".to_string()
            }
        );
        assert!(parsed.target_issue.is_none());
    }

    #[test]
    fn test_parse_distance_with_pace_range() {
        let parsed =
            parse_step_value(StepType::Interval, Sport::Running, "400m @ 4:30-4:15").unwrap();
        assert_eq!(parsed.step.end, EndCondition::Distance { meters: 400 });
        assert_eq!(
            parsed.step.target,
            Target::Range {
                kind: ZoneKind::Pace,
                min: 255.0,
                max: 270.0
            }
        );
    }

    #[test]
    fn test_parse_end_spec_forms() {
        for (text, end) in [
            ("lap-button", EndCondition::LapButton),
            ("", EndCondition::LapButton),
            ("30s", EndCondition::Time { seconds: 30 }),
            ("3min", EndCondition::Time { seconds: 180 }),
            ("1:30min", EndCondition::Time { seconds: 90 }),
            ("400m", EndCondition::Distance { meters: 400 }),
            ("400", EndCondition::Distance { meters: 400 }),
            ("2km", EndCondition::Distance { meters: 2000 }),
            ("2.5km", EndCondition::Distance { meters: 2500 }),
        ] {
            let parsed = parse_step_value(StepType::Other, Sport::Running, text).unwrap();
            assert_eq!(parsed.step.end, end, "end spec {:?}", text);
        }
    }

    #[test]
    fn test_parse_unit_suffixed_targets() {
        let parsed =
            parse_step_value(StepType::Interval, Sport::Running, "5min @ 150-160 bpm").unwrap();
        assert_eq!(
            parsed.step.target,
            Target::Range {
                kind: ZoneKind::HeartRate,
                min: 150.0,
                max: 160.0
            }
        );

        let parsed =
            parse_step_value(StepType::Interval, Sport::Cycling, "5min @ 375+W").unwrap();
        assert_eq!(
            parsed.step.target,
            Target::Range {
                kind: ZoneKind::Power,
                min: 375.0,
                max: f64::INFINITY
            }
        );
    }

    #[test]
    fn test_bad_target_keeps_step_and_flags_issue() {
        let parsed =
            parse_step_value(StepType::Interval, Sport::Running, "400m @ 4:xx-9").unwrap();
        assert_eq!(parsed.step.end, EndCondition::Distance { meters: 400 });
        assert_eq!(parsed.step.target, Target::Open);
        assert!(parsed.target_issue.is_some());
    }

    #[test]
    fn test_bad_end_spec_is_an_error() {
        assert!(parse_step_value(StepType::Interval, Sport::Running, "soonish @ Z2").is_err());
    }

    #[test]
    fn test_format_parse_round_trip() {
        for literal in [
            "10min @ Z2",
            "30s",
            "lap-button @ Z1_HR",
            "400m @ 4:30-4:15",
            "2.5km @ threshold -- steady effort",
            "5min @ 150-160 bpm",
            "20min @ 220-235W",
            "1km @ <125W",
            "12:30min",
            "2550m",
        ] {
            let parsed = parse_step_value(StepType::Other, Sport::Running, literal).unwrap();
            assert!(parsed.target_issue.is_none(), "issue for {:?}", literal);
            assert_eq!(format_step_value(&parsed.step), literal);
        }
    }
}
