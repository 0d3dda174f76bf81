//! Typed views over daemon payloads.
//!
//! Extraction is lenient: a missing or mistyped field falls back to its default
//! instead of rejecting the whole event.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const DEFAULT_CONFIDENCE: f64 = 1.0;

/// One transcribed utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
    /// 0.0 to 1.0
    pub confidence: f64,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl TranscriptionResult {
    pub fn from_data(data: &Map<String, Value>) -> Self {
        Self {
            text: string_field(data, "text").unwrap_or_default(),
            confidence: data
                .get("confidence")
                .and_then(Value::as_f64)
                .unwrap_or(DEFAULT_CONFIDENCE),
            timestamp: integer_field(data, "timestamp").unwrap_or(0),
            language: string_field(data, "language"),
        }
    }

    /// Partial hypotheses are reported with zero confidence.
    pub fn is_final(&self) -> bool {
        self.confidence > 0.0
    }
}

impl fmt::Display for TranscriptionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Daemon state as reported by `get_status` or a `Status` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub listening: bool,
    pub model: String,
    pub language: String,
    pub vad_enabled: bool,
    pub clients: u64,
    /// Seconds.
    pub uptime: u64,
}

impl StatusSnapshot {
    pub fn from_data(data: &Map<String, Value>) -> Self {
        Self {
            listening: data
                .get("listening")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            model: string_field(data, "model").unwrap_or_default(),
            language: string_field(data, "language").unwrap_or_default(),
            vad_enabled: data
                .get("vad_enabled")
                .and_then(Value::as_bool)
                .unwrap_or(true),
            clients: data.get("clients").and_then(Value::as_u64).unwrap_or(0),
            uptime: data.get("uptime").and_then(Value::as_u64).unwrap_or(0),
        }
    }

    /// Build from a command result, which may be any JSON value.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self::from_data(map),
            _ => Self::from_data(&Map::new()),
        }
    }

    pub fn is_active(&self) -> bool {
        self.listening
    }

    pub fn uptime_minutes(&self) -> f64 {
        self.uptime as f64 / 60.0
    }

    pub fn uptime_hours(&self) -> f64 {
        self.uptime as f64 / 3600.0
    }
}

/// Recognition languages understood by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Es,
    Fr,
    De,
    It,
    Pt,
    Ru,
    Zh,
    Ja,
    Ko,
    /// Let the engine detect the language.
    Auto,
}

impl Language {
    pub const ALL: [Language; 11] = [
        Language::En,
        Language::Es,
        Language::Fr,
        Language::De,
        Language::It,
        Language::Pt,
        Language::Ru,
        Language::Zh,
        Language::Ja,
        Language::Ko,
        Language::Auto,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
            Language::Fr => "fr",
            Language::De => "de",
            Language::It => "it",
            Language::Pt => "pt",
            Language::Ru => "ru",
            Language::Zh => "zh",
            Language::Ja => "ja",
            Language::Ko => "ko",
            Language::Auto => "auto",
        }
    }
}

/// Case-insensitive; unknown codes fall back to English.
impl FromStr for Language {
    type Err = Infallible;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        let code = code.trim().to_ascii_lowercase();
        Ok(Language::ALL
            .into_iter()
            .find(|language| language.code() == code)
            .unwrap_or(Language::En))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Partial update of the daemon's voice-activity-detection settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VadUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_start_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_end_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_speech_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_start_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_end_threshold: Option<f64>,
}

impl VadUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn string_field(data: &Map<String, Value>, key: &str) -> Option<String> {
    data.get(key).and_then(Value::as_str).map(str::to_string)
}

fn integer_field(data: &Map<String, Value>, key: &str) -> Option<i64> {
    let value = data.get(key)?;
    value
        .as_i64()
        .or_else(|| value.as_u64().map(|v| v.min(i64::MAX as u64) as i64))
        .or_else(|| value.as_f64().map(|v| v as i64))
}
