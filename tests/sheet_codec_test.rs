//! Integration tests for the tabular sheet codec.

mod common;

use common::sample_document;
use trainplan::codecs::{sheet, yaml, DocumentError};

#[test]
fn test_full_plan_round_trip() {
    let document = sample_document();

    let text = sheet::encode(&document).unwrap();
    let decoded = sheet::decode(&text).unwrap();

    assert!(decoded.issues.is_empty(), "issues: {:?}", decoded.issues);
    assert_eq!(decoded.document, document);
}

#[test]
fn test_both_codecs_share_one_schema() {
    let document = sample_document();

    let via_yaml = yaml::decode(&yaml::encode(&document).unwrap()).unwrap();
    let via_sheet = sheet::decode(&sheet::encode(&document).unwrap()).unwrap();

    assert_eq!(via_yaml.document, via_sheet.document);
}

#[test]
fn test_missing_workouts_sheet_is_fatal() {
    let document = sample_document();
    let text = sheet::encode(&document).unwrap();

    let truncated: String = text
        .lines()
        .take_while(|line| line.trim() != "[Workouts]")
        .map(|line| format!("{}\n", line))
        .collect();

    let err = sheet::decode(&truncated).unwrap_err();
    assert!(matches!(err, DocumentError::MissingSection("Workouts")));
}

#[test]
fn test_template_decodes_cleanly() {
    let text = sheet::encode_template().unwrap();
    let decoded = sheet::decode(&text).unwrap();

    assert!(decoded.issues.is_empty());
    assert_eq!(decoded.document.workouts.len(), 1);
    // warmup + 4 x (interval + recovery) + cooldown
    assert_eq!(decoded.document.workouts[0].flatten().count(), 10);
}

#[test]
fn test_descriptions_survive_quoting() {
    let mut document = sample_document();
    document.workouts[0].description =
        Some("Easy pace, last 2km \"on\", then stretch".to_string());

    let decoded = sheet::decode(&sheet::encode(&document).unwrap()).unwrap();
    assert_eq!(
        decoded.document.workouts[0].description,
        document.workouts[0].description
    );
}
