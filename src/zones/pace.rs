//! Pace literal parsing and formatting.
//!
//! Paces are carried through documents and zone tables as `mm:ss` strings
//! and held in memory as whole seconds per kilometre. Both directions are
//! exact: `format_pace(parse_pace(s)) == s` for canonical input and
//! `parse_pace(format_pace(n)) == n` for every value.

use crate::zones::ZoneError;

/// Parse a `mm:ss` pace literal into seconds per kilometre.
pub fn parse_pace(text: &str) -> Result<u32, ZoneError> {
    let (minutes, seconds) = text
        .split_once(':')
        .ok_or_else(|| ZoneError::MalformedExpression(text.to_string()))?;

    if minutes.is_empty() || minutes.len() > 2 || seconds.len() != 2 {
        return Err(ZoneError::MalformedExpression(text.to_string()));
    }

    let minutes: u32 = minutes
        .parse()
        .map_err(|_| ZoneError::MalformedExpression(text.to_string()))?;
    let seconds: u32 = seconds
        .parse()
        .map_err(|_| ZoneError::MalformedExpression(text.to_string()))?;

    if seconds >= 60 {
        return Err(ZoneError::MalformedExpression(text.to_string()));
    }

    Ok(minutes * 60 + seconds)
}

/// Render seconds per kilometre back to the canonical `mm:ss` form.
pub fn format_pace(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pace() {
        assert_eq!(parse_pace("5:00").unwrap(), 300);
        assert_eq!(parse_pace("4:30").unwrap(), 270);
        assert_eq!(parse_pace("0:45").unwrap(), 45);
        assert_eq!(parse_pace("10:05").unwrap(), 605);
    }

    #[test]
    fn test_parse_pace_rejects_malformed() {
        assert!(parse_pace("500").is_err());
        assert!(parse_pace("5:7").is_err());
        assert!(parse_pace("5:70").is_err());
        assert!(parse_pace(":30").is_err());
        assert!(parse_pace("a:bc").is_err());
    }

    #[test]
    fn test_format_pace() {
        assert_eq!(format_pace(300), "5:00");
        assert_eq!(format_pace(270), "4:30");
        assert_eq!(format_pace(45), "0:45");
    }

    #[test]
    fn test_round_trip_identity() {
        for text in ["5:00", "4:30", "6:05", "0:59", "12:00"] {
            assert_eq!(format_pace(parse_pace(text).unwrap()), text);
        }
        for seconds in [0u32, 1, 59, 60, 299, 300, 3599] {
            assert_eq!(parse_pace(&format_pace(seconds)).unwrap(), seconds);
        }
    }
}
