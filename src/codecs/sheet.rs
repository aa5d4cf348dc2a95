//! Tabular sheet-workbook plan codec.
//!
//! The workbook is UTF-8 text: a `[SheetName]` line opens each sheet, the
//! first row is the column header, and every following line is a CSV row.
//! Required sheets are `Config`, `Paces`, `HeartRates` and `Workouts`;
//! cycling power zones travel in the optional `Power` sheet. The `Workouts`
//! sheet holds one header row per workout and one row per step or repeat
//! marker, step cells using the shared step literal.

use chrono::NaiveDate;

use crate::codecs::step_literal::{format_step_value, parse_step_value};
use crate::codecs::{DecodeIssue, Decoded, DocumentError, PlanDocument};
use crate::planning::config::{weekday_from_index, weekday_index, PlanConfig};
use crate::workouts::types::{Sport, Step, StepType, Workout};
use crate::zones::registry::{Zone, ZoneKind, ZoneRegistry, ZoneValue};

struct Sheet {
    name: String,
    /// (1-based line number, cells)
    rows: Vec<(usize, Vec<String>)>,
}

/// Decode a sheet workbook.
pub fn decode(text: &str) -> Result<Decoded, DocumentError> {
    let sheets = split_sheets(text);
    let mut issues = Vec::new();

    let config = parse_config_sheet(find_sheet(&sheets, "Config")?, &mut issues);

    let mut zones = ZoneRegistry::new();
    parse_pace_sheet(find_sheet(&sheets, "Paces")?, &mut zones, &mut issues);
    zones.heart_rates = parse_zone_sheet(
        find_sheet(&sheets, "HeartRates")?,
        ZoneKind::HeartRate,
        &mut issues,
    );
    if let Some(sheet) = sheets.iter().find(|s| s.name == "Power") {
        zones.cycling_power = parse_zone_sheet(sheet, ZoneKind::Power, &mut issues);
    }

    let workouts = parse_workouts_sheet(find_sheet(&sheets, "Workouts")?, &config, &mut issues);

    tracing::debug!(
        "Decoded sheet plan: {} workouts, {} issues",
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

/// Encode a plan into a workbook that decodes back to an equal plan.
pub fn encode(document: &PlanDocument) -> Result<String, DocumentError> {
    let mut out = String::new();

    out.push_str("[Config]\n");
    out.push_str("key,value\n");
    push_row(&mut out, &["athlete_name", &document.config.athlete_name]);
    push_row(&mut out, &["name_prefix", &document.config.name_prefix]);
    let race_day = document
        .config
        .race_day
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    push_row(&mut out, &["race_day", &race_day]);
    let preferred: Vec<String> = document
        .config
        .preferred_days
        .iter()
        .map(|d| weekday_index(*d).to_string())
        .collect();
    push_row(&mut out, &["preferred_days", &preferred.join(",")]);

    out.push_str("\n[Paces]\n");
    out.push_str("sport,name,value\n");
    for zone in &document.zones.running_paces {
        push_row(
            &mut out,
            &["running", &zone.name, &zone.value.format(ZoneKind::Pace)],
        );
    }
    for zone in &document.zones.swimming_paces {
        push_row(
            &mut out,
            &["swimming", &zone.name, &zone.value.format(ZoneKind::Pace)],
        );
    }

    if !document.zones.cycling_power.is_empty() {
        out.push_str("\n[Power]\n");
        out.push_str("name,value\n");
        for zone in &document.zones.cycling_power {
            push_row(&mut out, &[&zone.name, &zone.value.format(ZoneKind::Power)]);
        }
    }

    out.push_str("\n[HeartRates]\n");
    out.push_str("name,value\n");
    for zone in &document.zones.heart_rates {
        push_row(
            &mut out,
            &[&zone.name, &zone.value.format(ZoneKind::HeartRate)],
        );
    }

    out.push_str("\n[Workouts]\n");
    out.push_str("name,sport,date,description,step\n");
    for workout in &document.workouts {
        let date = workout
            .scheduled_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        push_row(
            &mut out,
            &[
                &workout.name,
                workout.sport.key(),
                &date,
                workout.description.as_deref().unwrap_or(""),
                "",
            ],
        );
        for step in &workout.steps {
            push_step_rows(&mut out, step);
        }
        out.push('\n');
    }

    Ok(out)
}

/// Encode the starter plan artifact.
pub fn encode_template() -> Result<String, DocumentError> {
    encode(&crate::codecs::template_document())
}

fn push_step_rows(out: &mut String, step: &Step) {
    match step {
        Step::Simple(simple) => {
            let cell = format!("{}: {}", simple.step_type.key(), format_step_value(simple));
            push_row(out, &["", "", "", "", &cell]);
        }
        Step::Repeat { count, steps } => {
            let marker = format!("repeat: {}", count);
            push_row(out, &["", "", "", "", &marker]);
            for child in steps {
                push_step_rows(out, child);
            }
            push_row(out, &["", "", "", "", "end_repeat"]);
        }
    }
}

fn split_sheets(text: &str) -> Vec<Sheet> {
    let mut sheets: Vec<Sheet> = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            sheets.push(Sheet {
                name: trimmed[1..trimmed.len() - 1].to_string(),
                rows: Vec::new(),
            });
            continue;
        }

        if let Some(sheet) = sheets.last_mut() {
            sheet.rows.push((index + 1, parse_csv_row(line)));
        }
    }

    sheets
}

fn find_sheet<'a>(sheets: &'a [Sheet], name: &'static str) -> Result<&'a Sheet, DocumentError> {
    sheets
        .iter()
        .find(|s| s.name == name)
        .ok_or(DocumentError::MissingSection(name))
}

/// Data rows of a sheet, skipping the column header.
fn data_rows(sheet: &Sheet) -> &[(usize, Vec<String>)] {
    if sheet.rows.is_empty() {
        &[]
    } else {
        &sheet.rows[1..]
    }
}

fn cell<'a>(cells: &'a [String], index: usize) -> &'a str {
    cells.get(index).map(String::as_str).unwrap_or("")
}

fn parse_config_sheet(sheet: &Sheet, issues: &mut Vec<DecodeIssue>) -> PlanConfig {
    let mut config = PlanConfig {
        preferred_days: Vec::new(),
        ..Default::default()
    };

    for (line, cells) in data_rows(sheet) {
        let key = cell(cells, 0);
        let value = cell(cells, 1);
        match key {
            "athlete_name" => config.athlete_name = value.to_string(),
            "name_prefix" => config.name_prefix = value.to_string(),
            "race_day" => {
                if !value.is_empty() {
                    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
                        Ok(date) => config.race_day = Some(date),
                        Err(_) => issues.push(DecodeIssue::new(
                            format!("Config row {}", line),
                            format!("invalid date '{}'", value),
                        )),
                    }
                }
            }
            "preferred_days" => {
                for part in value
                    .trim_matches(|c| c == '[' || c == ']')
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                {
                    match part.parse::<u32>().ok().and_then(weekday_from_index) {
                        Some(day) => config.preferred_days.push(day),
                        None => issues.push(DecodeIssue::new(
                            format!("Config row {}", line),
                            "weekday index must be 0-6",
                        )),
                    }
                }
            }
            "" => {}
            other => issues.push(DecodeIssue::new(
                format!("Config row {}", line),
                format!("unknown config key '{}'", other),
            )),
        }
    }

    config
}

fn parse_pace_sheet(sheet: &Sheet, zones: &mut ZoneRegistry, issues: &mut Vec<DecodeIssue>) {
    for (line, cells) in data_rows(sheet) {
        let sport = cell(cells, 0);
        let name = cell(cells, 1);
        let value = cell(cells, 2);
        if name.is_empty() {
            continue;
        }

        let table = match Sport::from_key(sport) {
            Some(Sport::Running) => &mut zones.running_paces,
            Some(Sport::Swimming) => &mut zones.swimming_paces,
            _ => {
                issues.push(DecodeIssue::new(
                    format!("Paces row {}", line),
                    format!("'{}' is not a pace sport", sport),
                ));
                continue;
            }
        };

        match ZoneValue::parse(ZoneKind::Pace, value) {
            Ok(zone_value) => table.push(Zone::new(name, zone_value)),
            Err(err) => issues.push(DecodeIssue::new(format!("Paces row {}", line), err)),
        }
    }
}

fn parse_zone_sheet(sheet: &Sheet, kind: ZoneKind, issues: &mut Vec<DecodeIssue>) -> Vec<Zone> {
    let mut zones = Vec::new();
    for (line, cells) in data_rows(sheet) {
        let name = cell(cells, 0);
        let value = cell(cells, 1);
        if name.is_empty() {
            continue;
        }
        match ZoneValue::parse(kind, value) {
            Ok(zone_value) => zones.push(Zone::new(name, zone_value)),
            Err(err) => issues.push(DecodeIssue::new(
                format!("{} row {}", sheet.name, line),
                err,
            )),
        }
    }
    zones
}

fn parse_workouts_sheet(
    sheet: &Sheet,
    config: &PlanConfig,
    issues: &mut Vec<DecodeIssue>,
) -> Vec<Workout> {
    let mut workouts: Vec<Workout> = Vec::new();
    let mut current: Option<Workout> = None;
    // Open repeat groups of the current workout, innermost last.
    let mut repeat_stack: Vec<(u32, Vec<Step>)> = Vec::new();

    for (line, cells) in data_rows(sheet) {
        let name = cell(cells, 0);
        let step_cell = cell(cells, 4);

        if !name.is_empty() {
            finish_workout(&mut current, &mut repeat_stack, &mut workouts, issues);

            let sport = match Sport::from_key(cell(cells, 1)) {
                Some(sport) => sport,
                None => {
                    issues.push(DecodeIssue::new(
                        format!("Workouts row {}", line),
                        format!("unknown sport '{}'", cell(cells, 1)),
                    ));
                    Sport::Running
                }
            };

            let display_name = if !config.name_prefix.is_empty() {
                name.strip_prefix(&config.name_prefix)
                    .map(str::trim_start)
                    .unwrap_or(name)
            } else {
                name
            };

            let mut workout = Workout::new(display_name, sport);
            let date = cell(cells, 2);
            if !date.is_empty() {
                match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
                    Ok(date) => workout.scheduled_date = Some(date),
                    Err(_) => issues.push(DecodeIssue::new(
                        format!("Workouts row {}", line),
                        format!("invalid date '{}'", date),
                    )),
                }
            }
            let description = cell(cells, 3);
            if !description.is_empty() {
                workout.description = Some(description.to_string());
            }
            current = Some(workout);
            continue;
        }

        if step_cell.is_empty() {
            continue;
        }

        let Some(workout) = current.as_mut() else {
            issues.push(DecodeIssue::new(
                format!("Workouts row {}", line),
                "step row before any workout row",
            ));
            continue;
        };

        if step_cell == "end_repeat" {
            match repeat_stack.pop() {
                Some((count, steps)) => {
                    // count >= 1 was checked when the marker was read.
                    if let Ok(step) = Step::repeat(count, steps) {
                        push_step(workout, &mut repeat_stack, step);
                    }
                }
                None => issues.push(DecodeIssue::new(
                    format!("Workouts row {}", line),
                    "end_repeat without an open repeat",
                )),
            }
            continue;
        }

        if let Some(count_text) = step_cell.strip_prefix("repeat") {
            let count_text = count_text.trim_start_matches(':').trim();
            match count_text.parse::<u32>() {
                Ok(count) if count >= 1 => repeat_stack.push((count, Vec::new())),
                _ => issues.push(DecodeIssue::new(
                    format!("Workouts row {}", line),
                    "repeat count must be a positive integer",
                )),
            }
            continue;
        }

        let Some((key, value)) = step_cell.split_once(':') else {
            issues.push(DecodeIssue::new(
                format!("Workouts row {}", line),
                format!("unrecognized step cell '{}'", step_cell),
            ));
            continue;
        };
        let Some(step_type) = StepType::from_key(key.trim()) else {
            issues.push(DecodeIssue::new(
                format!("Workouts row {}", line),
                format!("unknown step type '{}'", key.trim()),
            ));
            continue;
        };

        match parse_step_value(step_type, workout.sport, value.trim()) {
            Ok(parsed) => {
                if let Some(issue) = parsed.target_issue {
                    issues.push(DecodeIssue::new(format!("Workouts row {}", line), issue));
                }
                push_step(workout, &mut repeat_stack, Step::Simple(parsed.step));
            }
            Err(err) => issues.push(DecodeIssue::new(format!("Workouts row {}", line), err)),
        }
    }

    finish_workout(&mut current, &mut repeat_stack, &mut workouts, issues);
    workouts
}

fn push_step(workout: &mut Workout, repeat_stack: &mut Vec<(u32, Vec<Step>)>, step: Step) {
    match repeat_stack.last_mut() {
        Some((_, steps)) => steps.push(step),
        None => workout.add_step(step),
    }
}

fn finish_workout(
    current: &mut Option<Workout>,
    repeat_stack: &mut Vec<(u32, Vec<Step>)>,
    workouts: &mut Vec<Workout>,
    issues: &mut Vec<DecodeIssue>,
) {
    let Some(mut workout) = current.take() else {
        repeat_stack.clear();
        return;
    };

    // Close any repeat left open at the end of the workout block.
    while let Some((count, steps)) = repeat_stack.pop() {
        issues.push(DecodeIssue::new(
            format!("workout '{}'", workout.name),
            "repeat block was not closed with end_repeat",
        ));
        if let Ok(step) = Step::repeat(count, steps) {
            push_step(&mut workout, repeat_stack, step);
        }
    }

    workouts.push(workout);
}

fn push_row(out: &mut String, cells: &[&str]) {
    for (index, cell) in cells.iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        out.push_str(&escape_cell(cell));
    }
    out.push('\n');
}

fn escape_cell(cell: &str) -> String {
    let needs_quotes = cell.contains(',')
        || cell.contains('"')
        || cell.contains('\n')
        || cell.starts_with('[')
        || cell.starts_with(' ')
        || cell.ends_with(' ');

    if needs_quotes {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

fn parse_csv_row(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut chars = line.chars().peekable();
    let mut in_quotes = false;

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    cell.push('"');
                }
                '"' => in_quotes = false,
                _ => cell.push(c),
            }
        } else {
            match c {
                '"' if cell.is_empty() => in_quotes = true,
                ',' => {
                    cells.push(std::mem::take(&mut cell));
                }
                _ => cell.push(c),
            }
        }
    }
    cells.push(cell);
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::template_document;

    #[test]
    fn test_template_round_trip() {
        let document = template_document();
        let text = encode(&document).unwrap();
        let decoded = decode(&text).unwrap();

        assert!(decoded.issues.is_empty(), "issues: {:?}", decoded.issues);
        assert_eq!(decoded.document, document);
    }

    #[test]
    fn test_missing_heart_rates_is_fatal() {
        let text = "\
[Config]
key,value
race_day,2026-05-03

[Paces]
sport,name,value
running,Z2,6:00-5:30

[Workouts]
name,sport,date,description,step
";
        let err = decode(text).unwrap_err();
        assert!(matches!(err, DocumentError::MissingSection("HeartRates")));
    }

    #[test]
    fn test_nested_repeat_markers() {
        let text = "\
[Config]
key,value

[Paces]
sport,name,value

[HeartRates]
name,value
max_hr,180

[Workouts]
name,sport,date,description,step
W01D01 Ladder,running,,,
,,,,repeat: 3
,,,,repeat: 2
,,,,interval: 100m
,,,,end_repeat
,,,,recovery: 200m
,,,,end_repeat
";
        let decoded = decode(text).unwrap();
        assert!(decoded.issues.is_empty(), "issues: {:?}", decoded.issues);

        let workout = &decoded.document.workouts[0];
        // 3 * (2 * 1 + 1)
        assert_eq!(workout.flatten().count(), 9);
    }

    #[test]
    fn test_broken_row_is_reported_with_line() {
        let text = "\
[Config]
key,value

[Paces]
sport,name,value
running,Z2,banana

[HeartRates]
name,value
max_hr,180

[Workouts]
name,sport,date,description,step
";
        let decoded = decode(text).unwrap();
        assert_eq!(decoded.issues.len(), 1);
        assert!(decoded.issues[0].location.contains("Paces row 6"));
    }

    #[test]
    fn test_csv_quoting() {
        let row = parse_csv_row("a,\"b,c\",\"say \"\"hi\"\"\"");
        assert_eq!(row, vec!["a", "b,c", "say \"hi\""]);
        assert_eq!(escape_cell("b,c"), "\"b,c\"");
        assert_eq!(escape_cell("plain"), "plain");
    }
}
