//! Pure formatting for everything the CLI prints.
//!
//! Nothing here touches the terminal; callers decide where the text goes.

use crate::cli::StreamArgs;

use std::time::{Duration, UNIX_EPOCH};

use humantime::format_rfc3339_seconds;
use serde_json::{Value, json};
use stt_client::{StatusSnapshot, TranscriptionResult, VadUpdate};

pub const RULE: &str = "==============================";

const MONITOR_PREVIEW_CHARS: usize = 50;

/// `HH:MM:SS` (UTC) of a millisecond Unix timestamp.
pub fn format_timestamp(timestamp_ms: i64) -> String {
    let since_epoch = Duration::from_millis(timestamp_ms.max(0) as u64);
    let rendered = format_rfc3339_seconds(UNIX_EPOCH + since_epoch).to_string();
    // YYYY-MM-DDTHH:MM:SSZ
    rendered
        .get(11..19)
        .map(str::to_string)
        .unwrap_or_else(|| "00:00:00".to_string())
}

/// One line for `stream`, honoring the `-j/-t/-c` flags.
pub fn transcription_line(result: &TranscriptionResult, options: &StreamArgs) -> String {
    if options.json {
        return json!({
            "text": result.text,
            "confidence": result.confidence,
            "timestamp": result.timestamp,
        })
        .to_string();
    }

    let mut line = result.text.clone();
    if options.timestamps {
        line = format!("[{}] {line}", format_timestamp(result.timestamp));
    }
    if options.confidence {
        line = format!("{line} (confidence: {:.2})", result.confidence);
    }
    line
}

/// Minutes below one hour, hours from there on.
pub fn format_uptime(seconds: u64) -> String {
    if seconds < 3600 {
        format!("{:.1} minutes", seconds as f64 / 60.0)
    } else {
        format!("{:.1} hours", seconds as f64 / 3600.0)
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

pub fn status_report(status: &StatusSnapshot) -> String {
    let mut lines = vec![
        "RT-STT Daemon Status".to_string(),
        RULE.to_string(),
        format!("Listening: {}", yes_no(status.listening)),
        format!("Model: {}", status.model),
        format!("Language: {}", status.language),
        format!("VAD Enabled: {}", yes_no(status.vad_enabled)),
    ];
    if status.clients > 0 {
        lines.push(format!("Connected Clients: {}", status.clients));
    }
    if status.uptime > 0 {
        lines.push(format!("Uptime: {}", format_uptime(status.uptime)));
    }
    lines.join("\n")
}

pub fn status_json(status: &StatusSnapshot) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(status)
}

pub fn config_report(config: &Value, json: bool) -> Result<String, serde_json::Error> {
    let body = serde_json::to_string_pretty(config)?;
    if json {
        Ok(body)
    } else {
        Ok(format!("RT-STT Configuration\n{RULE}\n{body}"))
    }
}

pub fn metrics_report(metrics: &Value) -> String {
    let number = |key: &str| metrics.get(key).and_then(Value::as_f64).unwrap_or(0.0);
    let raw = |key: &str| match metrics.get(key) {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => "0".to_string(),
    };

    [
        "RT-STT Performance Metrics".to_string(),
        RULE.to_string(),
        format!("Average Latency: {:.1} ms", number("avg_latency_ms")),
        format!("Average RTF: {:.2}", number("avg_rtf")),
        format!("CPU Usage: {:.1}%", number("cpu_usage")),
        format!("Memory Usage: {} MB", raw("memory_usage_mb")),
        format!("Transcriptions: {}", raw("transcriptions_count")),
    ]
    .join("\n")
}

/// The settings a `set-vad` call changed, one `  key: value` line each.
pub fn vad_summary(update: &VadUpdate) -> String {
    let Ok(Value::Object(fields)) = serde_json::to_value(update) else {
        return String::new();
    };
    fields
        .iter()
        .map(|(key, value)| format!("  {key}: {value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Running totals shown by `monitor`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MonitorStats {
    pub count: u64,
    pub total_confidence: f64,
}

impl MonitorStats {
    pub fn record(&mut self, result: &TranscriptionResult) {
        self.count += 1;
        self.total_confidence += result.confidence;
    }

    pub fn average_confidence(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_confidence / self.count as f64
        }
    }

    /// Status line, rewritten in place with a leading carriage return.
    pub fn line(&self, latest: &str) -> String {
        let preview: String = latest.chars().take(MONITOR_PREVIEW_CHARS).collect();
        format!(
            "\rTranscriptions: {} | Avg Confidence: {:.2} | Latest: {preview}...",
            self.count,
            self.average_confidence()
        )
    }
}
