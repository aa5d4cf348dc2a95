//! Named intensity zones and expression resolution.
//!
//! A registry holds the per-sport zone tables (running/swimming paces,
//! cycling power, sport-agnostic heart rates) and resolves zone names or
//! literal range expressions into concrete numeric bounds. Open bounds use
//! the infinity sentinels so callers can clamp or omit them as needed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::workouts::types::Sport;
use crate::zones::pace::{format_pace, parse_pace};

/// Kind of intensity measurement a zone describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    /// Seconds per kilometre
    Pace,
    /// Beats per minute
    HeartRate,
    /// Watts
    Power,
}

impl std::fmt::Display for ZoneKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZoneKind::Pace => write!(f, "pace"),
            ZoneKind::HeartRate => write!(f, "heart rate"),
            ZoneKind::Power => write!(f, "power"),
        }
    }
}

/// Errors from zone registration and expression resolution.
#[derive(Debug, Clone, Error)]
pub enum ZoneError {
    /// Name has no registration in the requested scope
    #[error("unknown zone '{name}' in {scope} scope")]
    UnknownZone { name: String, scope: String },

    /// Literal expression could not be parsed
    #[error("malformed expression: {0}")]
    MalformedExpression(String),

    /// The sport has no table for the requested zone kind
    #[error("no {kind} zone table for {sport}")]
    UnsupportedScope { sport: Sport, kind: ZoneKind },
}

/// The value carried by a named zone.
///
/// Variants mirror the literal syntaxes accepted in documents so that
/// encoding a registry reproduces the text a user wrote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneValue {
    /// Single reference value (`max_hr: 180`, `ftp: 250`)
    Scalar(f64),
    /// Closed range, normalized so `min <= max`
    Range { min: f64, max: f64 },
    /// Unconstrained below (`<125`)
    OpenLow { max: f64 },
    /// Unconstrained above (`375+`)
    OpenHigh { min: f64 },
    /// Percentage window of a registered scalar (`62-76% max_hr`)
    PercentOfRef {
        low: f64,
        high: f64,
        reference: String,
    },
}

impl ZoneValue {
    /// Parse a zone value literal for the given kind.
    pub fn parse(kind: ZoneKind, text: &str) -> Result<Self, ZoneError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ZoneError::MalformedExpression(text.to_string()));
        }

        if kind == ZoneKind::HeartRate && text.contains('%') {
            return Self::parse_percent(text);
        }

        if let Some(rest) = text.strip_prefix('<') {
            return Ok(ZoneValue::OpenLow {
                max: parse_bound(kind, rest.trim())?,
            });
        }

        if let Some(rest) = text.strip_suffix('+') {
            return Ok(ZoneValue::OpenHigh {
                min: parse_bound(kind, rest.trim())?,
            });
        }

        if let Some((left, right)) = text.split_once('-') {
            let a = parse_bound(kind, left.trim())?;
            let b = parse_bound(kind, right.trim())?;
            return Ok(ZoneValue::Range {
                min: a.min(b),
                max: a.max(b),
            });
        }

        Ok(ZoneValue::Scalar(parse_bound(kind, text)?))
    }

    fn parse_percent(text: &str) -> Result<Self, ZoneError> {
        let (window, rest) = text
            .split_once('%')
            .ok_or_else(|| ZoneError::MalformedExpression(text.to_string()))?;
        let reference = rest.trim();
        if reference.is_empty() {
            return Err(ZoneError::MalformedExpression(text.to_string()));
        }

        let (low, high) = match window.split_once('-') {
            Some((lo, hi)) => (parse_number(lo.trim())?, parse_number(hi.trim())?),
            None => {
                let v = parse_number(window.trim())?;
                (v, v)
            }
        };

        Ok(ZoneValue::PercentOfRef {
            low: low.min(high),
            high: low.max(high),
            reference: reference.to_string(),
        })
    }

    /// Render the value back to its literal form for the given kind.
    ///
    /// Pace ranges print slow-to-fast, the convention zone tables use.
    pub fn format(&self, kind: ZoneKind) -> String {
        match self {
            ZoneValue::Scalar(v) => format_bound(kind, *v),
            ZoneValue::Range { min, max } if min == max => format_bound(kind, *min),
            ZoneValue::Range { min, max } => {
                if kind == ZoneKind::Pace {
                    format!("{}-{}", format_bound(kind, *max), format_bound(kind, *min))
                } else {
                    format!("{}-{}", format_bound(kind, *min), format_bound(kind, *max))
                }
            }
            ZoneValue::OpenLow { max } => format!("<{}", format_bound(kind, *max)),
            ZoneValue::OpenHigh { min } => format!("{}+", format_bound(kind, *min)),
            ZoneValue::PercentOfRef {
                low,
                high,
                reference,
            } => {
                if low == high {
                    format!("{}% {}", format_number(*low), reference)
                } else {
                    format!(
                        "{}-{}% {}",
                        format_number(*low),
                        format_number(*high),
                        reference
                    )
                }
            }
        }
    }
}

/// A named zone within one (sport, kind) scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// Unique name within its scope
    pub name: String,
    /// Value literal, retained structurally
    pub value: ZoneValue,
}

impl Zone {
    pub fn new(name: impl Into<String>, value: ZoneValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Convenience constructor parsing the value literal.
    pub fn parse(name: impl Into<String>, kind: ZoneKind, literal: &str) -> Result<Self, ZoneError> {
        Ok(Self {
            name: name.into(),
            value: ZoneValue::parse(kind, literal)?,
        })
    }
}

/// Zone tables for one training plan.
///
/// Table order is preserved so an encoded document lists zones the way the
/// user wrote them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneRegistry {
    /// Running pace zones (seconds per km)
    pub running_paces: Vec<Zone>,
    /// Swimming pace zones (seconds per 100m, same literal form)
    pub swimming_paces: Vec<Zone>,
    /// Cycling power zones (watts)
    pub cycling_power: Vec<Zone>,
    /// Heart rate zones, shared across sports
    pub heart_rates: Vec<Zone>,
}

impl ZoneRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-filled with the stock zone tables.
    pub fn standard() -> Self {
        fn table(kind: ZoneKind, entries: &[(&str, &str)]) -> Vec<Zone> {
            entries
                .iter()
                .map(|&(name, literal)| {
                    Zone::parse(name, kind, literal).expect("stock zone literal")
                })
                .collect()
        }

        Self {
            running_paces: table(
                ZoneKind::Pace,
                &[
                    ("Z1", "6:30-6:00"),
                    ("Z2", "6:00-5:30"),
                    ("Z3", "5:30-5:00"),
                    ("Z4", "5:00-4:30"),
                    ("Z5", "4:30-4:00"),
                    ("recovery", "7:00-6:30"),
                    ("threshold", "5:10-4:50"),
                    ("marathon", "5:20-5:10"),
                    ("race_pace", "5:10-4:50"),
                ],
            ),
            swimming_paces: table(
                ZoneKind::Pace,
                &[
                    ("Z1", "2:30-2:15"),
                    ("Z2", "2:15-2:00"),
                    ("Z3", "2:00-1:45"),
                    ("Z4", "1:45-1:30"),
                    ("Z5", "1:30-1:15"),
                    ("recovery", "2:45-2:30"),
                    ("threshold", "1:55-1:40"),
                    ("sprint", "1:25-1:15"),
                ],
            ),
            cycling_power: table(
                ZoneKind::Power,
                &[
                    ("ftp", "250"),
                    ("Z1", "125-175"),
                    ("Z2", "175-215"),
                    ("Z3", "215-250"),
                    ("Z4", "250-300"),
                    ("Z5", "300-375"),
                    ("Z6", "375+"),
                    ("recovery", "<125"),
                    ("threshold", "235-265"),
                    ("sweet_spot", "220-235"),
                ],
            ),
            heart_rates: table(
                ZoneKind::HeartRate,
                &[
                    ("max_hr", "180"),
                    ("rest_hr", "60"),
                    ("Z1_HR", "62-76% max_hr"),
                    ("Z2_HR", "76-85% max_hr"),
                    ("Z3_HR", "85-91% max_hr"),
                    ("Z4_HR", "91-95% max_hr"),
                    ("Z5_HR", "95-100% max_hr"),
                ],
            ),
        }
    }

    fn table(&self, sport: Sport, kind: ZoneKind) -> Option<&Vec<Zone>> {
        match (kind, sport) {
            (ZoneKind::Pace, Sport::Running) => Some(&self.running_paces),
            (ZoneKind::Pace, Sport::Swimming) => Some(&self.swimming_paces),
            (ZoneKind::Power, Sport::Cycling) => Some(&self.cycling_power),
            (ZoneKind::HeartRate, _) => Some(&self.heart_rates),
            _ => None,
        }
    }

    fn table_mut(&mut self, sport: Sport, kind: ZoneKind) -> Option<&mut Vec<Zone>> {
        match (kind, sport) {
            (ZoneKind::Pace, Sport::Running) => Some(&mut self.running_paces),
            (ZoneKind::Pace, Sport::Swimming) => Some(&mut self.swimming_paces),
            (ZoneKind::Power, Sport::Cycling) => Some(&mut self.cycling_power),
            (ZoneKind::HeartRate, _) => Some(&mut self.heart_rates),
            _ => None,
        }
    }

    /// Look up a zone by name within a scope.
    pub fn get(&self, sport: Sport, kind: ZoneKind, name: &str) -> Option<&Zone> {
        self.table(sport, kind)?.iter().find(|z| z.name == name)
    }

    /// Insert a zone, replacing any existing zone of the same name in the
    /// scope. Names are unique within (sport, kind).
    pub fn upsert(&mut self, sport: Sport, kind: ZoneKind, zone: Zone) -> Result<(), ZoneError> {
        let table = self
            .table_mut(sport, kind)
            .ok_or(ZoneError::UnsupportedScope { sport, kind })?;

        match table.iter_mut().find(|z| z.name == zone.name) {
            Some(existing) => *existing = zone,
            None => table.push(zone),
        }
        Ok(())
    }

    /// Remove a zone by name. Steps referencing the name are untouched and
    /// will fail to resolve afterwards.
    pub fn remove(&mut self, sport: Sport, kind: ZoneKind, name: &str) -> bool {
        match self.table_mut(sport, kind) {
            Some(table) => {
                let before = table.len();
                table.retain(|z| z.name != name);
                table.len() < before
            }
            None => false,
        }
    }

    /// Resolve a zone name or literal expression into `(min, max)` bounds.
    ///
    /// Open bounds come back as `f64::NEG_INFINITY` / `f64::INFINITY`.
    pub fn resolve(&self, sport: Sport, kind: ZoneKind, expr: &str) -> Result<(f64, f64), ZoneError> {
        let expr = expr.trim();

        if let Some(zone) = self.get(sport, kind, expr) {
            let value = zone.value.clone();
            return self.resolve_value(&value);
        }

        match ZoneValue::parse(kind, strip_unit_suffix(expr)) {
            Ok(value) => self.resolve_value(&value),
            Err(err) => {
                // A bare identifier is a name that was never registered,
                // not a broken literal.
                if looks_like_name(expr) {
                    Err(ZoneError::UnknownZone {
                        name: expr.to_string(),
                        scope: format!("{} {}", sport, kind),
                    })
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Resolve an already-parsed zone value into `(min, max)` bounds.
    pub fn resolve_value(&self, value: &ZoneValue) -> Result<(f64, f64), ZoneError> {
        match value {
            ZoneValue::Scalar(v) => Ok((*v, *v)),
            ZoneValue::Range { min, max } => Ok((*min, *max)),
            ZoneValue::OpenLow { max } => Ok((f64::NEG_INFINITY, *max)),
            ZoneValue::OpenHigh { min } => Ok((*min, f64::INFINITY)),
            ZoneValue::PercentOfRef {
                low,
                high,
                reference,
            } => {
                let scalar = self
                    .heart_rates
                    .iter()
                    .find(|z| z.name == *reference)
                    .and_then(|z| match z.value {
                        ZoneValue::Scalar(v) => Some(v),
                        _ => None,
                    })
                    .ok_or_else(|| ZoneError::UnknownZone {
                        name: reference.clone(),
                        scope: "heart rate".to_string(),
                    })?;
                Ok((low / 100.0 * scalar, high / 100.0 * scalar))
            }
        }
    }
}

fn parse_bound(kind: ZoneKind, text: &str) -> Result<f64, ZoneError> {
    match kind {
        ZoneKind::Pace => Ok(parse_pace(text)? as f64),
        _ => parse_number(text),
    }
}

fn parse_number(text: &str) -> Result<f64, ZoneError> {
    text.parse::<f64>()
        .map_err(|_| ZoneError::MalformedExpression(text.to_string()))
}

fn format_bound(kind: ZoneKind, value: f64) -> String {
    match kind {
        ZoneKind::Pace => format_pace(value as u32),
        _ => format_number(value),
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Step targets sometimes carry a unit suffix (`120-140 bpm`, `250W`).
fn strip_unit_suffix(expr: &str) -> &str {
    let trimmed = expr.trim_end();
    for suffix in ["bpm", "W"] {
        if let Some(rest) = trimmed.strip_suffix(suffix) {
            return rest.trim_end();
        }
    }
    trimmed
}

fn looks_like_name(expr: &str) -> bool {
    let mut chars = expr.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_closed_range() {
        let zones = ZoneRegistry::new();
        let (min, max) = zones
            .resolve(Sport::Cycling, ZoneKind::Power, "125-175")
            .unwrap();
        assert_eq!((min, max), (125.0, 175.0));
    }

    #[test]
    fn test_resolve_open_ranges() {
        let zones = ZoneRegistry::new();

        let (min, max) = zones
            .resolve(Sport::Cycling, ZoneKind::Power, "<125")
            .unwrap();
        assert_eq!(min, f64::NEG_INFINITY);
        assert_eq!(max, 125.0);

        let (min, max) = zones
            .resolve(Sport::Cycling, ZoneKind::Power, "375+")
            .unwrap();
        assert_eq!(min, 375.0);
        assert_eq!(max, f64::INFINITY);
    }

    #[test]
    fn test_resolve_named_pace_zone() {
        // 5:00-4:30 min/km: the faster pace is the smaller scalar and
        // becomes the lower bound.
        let zones = ZoneRegistry::standard();
        let (min, max) = zones.resolve(Sport::Running, ZoneKind::Pace, "Z4").unwrap();
        assert_eq!((min, max), (270.0, 300.0));
    }

    #[test]
    fn test_resolve_percent_of_reference() {
        let zones = ZoneRegistry::standard();
        let (min, max) = zones
            .resolve(Sport::Running, ZoneKind::HeartRate, "Z1_HR")
            .unwrap();
        // 62-76% of max_hr 180
        assert!((min - 111.6).abs() < 1e-9);
        assert!((max - 136.8).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_name_vs_malformed_literal() {
        let zones = ZoneRegistry::new();

        let err = zones
            .resolve(Sport::Running, ZoneKind::Pace, "tempo_x")
            .unwrap_err();
        assert!(matches!(err, ZoneError::UnknownZone { .. }));

        let err = zones
            .resolve(Sport::Running, ZoneKind::Pace, "5:0x-4:30")
            .unwrap_err();
        assert!(matches!(err, ZoneError::MalformedExpression(_)));
    }

    #[test]
    fn test_upsert_replaces_by_name() {
        let mut zones = ZoneRegistry::new();
        zones
            .upsert(
                Sport::Cycling,
                ZoneKind::Power,
                Zone::parse("Z1", ZoneKind::Power, "100-150").unwrap(),
            )
            .unwrap();
        zones
            .upsert(
                Sport::Cycling,
                ZoneKind::Power,
                Zone::parse("Z1", ZoneKind::Power, "110-160").unwrap(),
            )
            .unwrap();

        assert_eq!(zones.cycling_power.len(), 1);
        let (min, max) = zones
            .resolve(Sport::Cycling, ZoneKind::Power, "Z1")
            .unwrap();
        assert_eq!((min, max), (110.0, 160.0));
    }

    #[test]
    fn test_remove_does_not_cascade() {
        let mut zones = ZoneRegistry::standard();
        assert!(zones.remove(Sport::Running, ZoneKind::Pace, "Z4"));
        let err = zones
            .resolve(Sport::Running, ZoneKind::Pace, "Z4")
            .unwrap_err();
        assert!(matches!(err, ZoneError::UnknownZone { .. }));
    }

    #[test]
    fn test_value_format_round_trip() {
        for (kind, literal) in [
            (ZoneKind::Pace, "6:30-6:00"),
            (ZoneKind::Pace, "5:10"),
            (ZoneKind::Power, "215-250"),
            (ZoneKind::Power, "<125"),
            (ZoneKind::Power, "375+"),
            (ZoneKind::HeartRate, "62-76% max_hr"),
            (ZoneKind::HeartRate, "180"),
        ] {
            let value = ZoneValue::parse(kind, literal).unwrap();
            assert_eq!(value.format(kind), literal);
        }
    }
}
