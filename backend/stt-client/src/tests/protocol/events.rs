// Unit tests for typed event views

use crate::protocol::events::{Language, StatusSnapshot, TranscriptionResult, VadUpdate};

use serde_json::{Map, Value, json};

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

// ============================================
// TRANSCRIPTION
// ============================================

#[test]
fn given_full_transcription_data_when_from_data_then_all_fields_extracted() {
    let data = object(json!({
        "text": "hello world",
        "confidence": 0.93,
        "timestamp": 1_700_000_000_123_i64,
        "language": "en"
    }));

    let result = TranscriptionResult::from_data(&data);

    assert_eq!(result.text, "hello world");
    assert!((result.confidence - 0.93).abs() < f64::EPSILON);
    assert_eq!(result.timestamp, 1_700_000_000_123);
    assert_eq!(result.language.as_deref(), Some("en"));
    assert!(result.is_final());
}

/// **VALUE**: Verifies a sparse transcription still produces a usable result.
///
/// **BUG THIS CATCHES**: Dropping an utterance because the daemon omitted confidence.
#[test]
fn given_sparse_transcription_data_when_from_data_then_defaults_applied() {
    let result = TranscriptionResult::from_data(&object(json!({ "text": "hi" })));

    assert_eq!(result.text, "hi");
    assert!((result.confidence - 1.0).abs() < f64::EPSILON);
    assert_eq!(result.timestamp, 0);
    assert_eq!(result.language, None);
}

#[test]
fn given_zero_confidence_when_is_final_then_false() {
    let result = TranscriptionResult::from_data(&object(json!({ "text": "par", "confidence": 0.0 })));

    assert!(!result.is_final());
}

// ============================================
// STATUS
// ============================================

#[test]
fn given_status_data_when_from_data_then_fields_and_helpers_match() {
    let data = object(json!({
        "listening": true,
        "model": "base.en",
        "language": "en",
        "vad_enabled": false,
        "clients": 2,
        "uptime": 7200
    }));

    let status = StatusSnapshot::from_data(&data);

    assert!(status.is_active());
    assert_eq!(status.model, "base.en");
    assert!(!status.vad_enabled);
    assert_eq!(status.clients, 2);
    assert!((status.uptime_minutes() - 120.0).abs() < f64::EPSILON);
    assert!((status.uptime_hours() - 2.0).abs() < f64::EPSILON);
}

#[test]
fn given_non_object_result_when_from_value_then_defaults() {
    let status = StatusSnapshot::from_value(&json!("ok"));

    assert!(!status.listening);
    assert!(status.vad_enabled);
    assert_eq!(status.uptime, 0);
}

// ============================================
// LANGUAGE
// ============================================

#[test]
fn given_codes_in_any_case_when_parsed_then_matching_language() {
    assert_eq!("FR".parse::<Language>(), Ok(Language::Fr));
    assert_eq!(" auto ".parse::<Language>(), Ok(Language::Auto));
    assert_eq!(Language::Ja.to_string(), "ja");
}

#[test]
fn given_unknown_code_when_parsed_then_falls_back_to_english() {
    assert_eq!("klingon".parse::<Language>(), Ok(Language::En));
}

// ============================================
// VAD UPDATE
// ============================================

/// **VALUE**: Verifies only the fields actually set are sent.
///
/// **WHY THIS MATTERS**: `set_config` merges into the daemon config; sending nulls for
/// untouched fields would wipe them.
#[test]
fn given_partial_vad_update_when_serialized_then_only_set_fields_present() {
    let update = VadUpdate {
        energy_threshold: Some(0.02),
        speech_end_ms: Some(800),
        ..VadUpdate::default()
    };

    let value = serde_json::to_value(&update).expect("serialize");

    assert_eq!(value, json!({ "energy_threshold": 0.02, "speech_end_ms": 800 }));
    assert!(!update.is_empty());
    assert!(VadUpdate::default().is_empty());
}
