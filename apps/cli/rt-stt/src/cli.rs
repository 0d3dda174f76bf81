//! Command-line surface.

use crate::logger;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use serde_json::Value;
use stt_client::VadUpdate;

const AFTER_HELP: &str = "\
Examples:
  rt-stt stream                    # Stream transcriptions
  rt-stt stream -j                 # Output as JSON
  rt-stt stream -t                 # Include timestamps
  rt-stt status                    # Check daemon status
  rt-stt pause                     # Pause listening
  rt-stt resume                    # Resume listening
  rt-stt set-language es           # Set Spanish
  rt-stt monitor                   # Live monitoring";

#[derive(Debug, Parser)]
#[command(name = "rt-stt")]
#[command(version)]
#[command(about = "Command-line client for the real-time speech-to-text daemon")]
#[command(after_help = AFTER_HELP)]
pub struct Cli {
    /// Socket path (default: from client.json, else /tmp/rt-stt.sock)
    #[arg(short, long, global = true)]
    pub socket: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        logger::level_for(self.verbose)
    }

    /// The subcommand to run; streaming when none is given.
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Stream(StreamArgs::default()))
    }
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Stream transcriptions
    Stream(StreamArgs),

    /// Get daemon status
    Status {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Pause listening
    Pause,

    /// Resume listening
    Resume,

    /// Set language
    SetLanguage {
        /// Language code (e.g. en, es)
        language: String,
    },

    /// Set model
    SetModel {
        /// Model name
        model: String,
    },

    /// Set VAD sensitivity
    SetVadSensitivity {
        /// Sensitivity value (e.g. 1.08)
        sensitivity: f32,
    },

    /// Monitor daemon with live stats
    Monitor,

    /// Get current configuration
    GetConfig {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Update configuration
    SetConfig {
        /// Configuration JSON
        #[arg(value_parser = parse_json_object)]
        config: Value,

        /// Don't save to file
        #[arg(long)]
        no_save: bool,
    },

    /// Update VAD settings
    SetVad(VadArgs),

    /// Get performance metrics
    GetMetrics {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Args)]
pub struct StreamArgs {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,

    /// Include timestamps
    #[arg(short, long)]
    pub timestamps: bool,

    /// Include confidence scores
    #[arg(short, long)]
    pub confidence: bool,

    /// Suppress status messages
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Args)]
pub struct VadArgs {
    /// Energy threshold
    #[arg(long)]
    pub energy_threshold: Option<f64>,

    /// Speech start time
    #[arg(long)]
    pub speech_start_ms: Option<u64>,

    /// Speech end time
    #[arg(long)]
    pub speech_end_ms: Option<u64>,

    /// Minimum speech duration
    #[arg(long)]
    pub min_speech_ms: Option<u64>,

    /// Start threshold multiplier
    #[arg(long)]
    pub start_threshold: Option<f64>,

    /// End threshold multiplier
    #[arg(long)]
    pub end_threshold: Option<f64>,
}

impl From<&VadArgs> for VadUpdate {
    fn from(args: &VadArgs) -> Self {
        VadUpdate {
            energy_threshold: args.energy_threshold,
            speech_start_ms: args.speech_start_ms,
            speech_end_ms: args.speech_end_ms,
            min_speech_ms: args.min_speech_ms,
            speech_start_threshold: args.start_threshold,
            speech_end_threshold: args.end_threshold,
        }
    }
}

fn parse_json_object(raw: &str) -> Result<Value, String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err("configuration must be a JSON object".to_string()),
        Err(e) => Err(format!("invalid JSON: {e}")),
    }
}
