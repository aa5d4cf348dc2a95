//! Workout naming convention.
//!
//! Plan workouts encode their week/day coordinates in the name, e.g.
//! `W01D03 - Intervals` or the compact `W1D3 Intervals`. Names that do not
//! match are perfectly valid workouts; they are just invisible to the
//! automatic scheduler.

/// Week/day coordinates extracted from a workout name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub week: u32,
    pub day: u32,
    pub label: String,
}

/// Parse `W<week>D<day>` (or the legacy `W<week>S<day>`) from a workout
/// name. Returns `None` when the name does not follow the convention.
pub fn parse_name(name: &str) -> Option<ParsedName> {
    let rest = name.strip_prefix(['W', 'w'])?;

    let week_end = rest.find(|c: char| !c.is_ascii_digit())?;
    if week_end == 0 {
        return None;
    }
    let week = rest[..week_end].parse().ok()?;
    let rest = &rest[week_end..];

    let rest = rest.strip_prefix(['D', 'd', 'S', 's'])?;
    let day_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if day_end == 0 {
        return None;
    }
    let day = rest[..day_end].parse().ok()?;
    let rest = &rest[day_end..];

    let label = rest
        .trim_start()
        .trim_start_matches(['-', '\u{2013}'])
        .trim_start();

    Some(ParsedName {
        week,
        day,
        label: label.to_string(),
    })
}

/// Render the canonical name for the given coordinates.
pub fn format_name(week: u32, day: u32, label: &str) -> String {
    if label.is_empty() {
        format!("W{:02}D{:02}", week, day)
    } else {
        format!("W{:02}D{:02} - {}", week, day, label)
    }
}
