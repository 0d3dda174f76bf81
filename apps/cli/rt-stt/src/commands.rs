//! Subcommand handlers.
//!
//! One-shot commands connect, run a single request, print and disconnect.
//! `stream` and `monitor` stay connected until Ctrl+C.

use crate::cli::{Cli, Command, StreamArgs};
use crate::error::CliError;
use crate::output::{self, MonitorStats};

use common::ErrorLocation;

use std::io::{Write, stdout};
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info, warn};
use stt_client::{ClientConfig, SttClient, VadUpdate};

const CONFIG_DIR_NAME: &str = "rt-stt";

/// Run the parsed command line to completion.
pub async fn run(cli: Cli) -> Result<(), CliError> {
    let config_dir = dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME));
    let config = resolve_config(config_dir.as_deref(), cli.socket.clone())?;
    debug!("Using daemon socket {}", config.socket_path.display());

    let client = SttClient::new(config);

    match cli.command() {
        Command::Stream(options) => stream(&client, options).await,
        Command::Monitor => monitor(&client).await,
        command => {
            client.connect().await?;
            let mut out = stdout();
            let result = execute(&client, &command, &mut out).await;
            client.disconnect().await;
            result
        }
    }
}

/// Client config from `<config_dir>/client.json`, with `--socket` taking precedence.
///
/// # Errors
///
/// Returns [`CliError::Config`] if the file exists but is invalid.
pub fn resolve_config(
    config_dir: Option<&Path>,
    socket: Option<PathBuf>,
) -> Result<ClientConfig, CliError> {
    let mut config = match config_dir {
        Some(dir) => ClientConfig::load(dir)?,
        None => {
            warn!("No config directory available, using defaults");
            ClientConfig::default()
        }
    };

    if let Some(socket) = socket {
        config.socket_path = socket;
    }
    Ok(config)
}

/// Run a one-shot command on a connected client and print its outcome to `out`.
///
/// # Errors
///
/// Returns [`CliError::InvalidInput`] for `stream`/`monitor`, which are not one-shot.
pub async fn execute<W: Write>(
    client: &SttClient,
    command: &Command,
    out: &mut W,
) -> Result<(), CliError> {
    match command {
        Command::Status { json } => {
            let status = client.get_status().await?;
            let text = if *json {
                output::status_json(&status).map_err(output_error)?
            } else {
                output::status_report(&status)
            };
            writeln!(out, "{text}")?;
        }
        Command::Pause => {
            client.pause().await?;
            writeln!(out, "Listening paused")?;
        }
        Command::Resume => {
            client.resume().await?;
            writeln!(out, "Listening resumed")?;
        }
        Command::SetLanguage { language } => {
            client.set_language(language).await?;
            writeln!(out, "Language set to: {language}")?;
        }
        Command::SetModel { model } => {
            client.set_model(model).await?;
            writeln!(out, "Model set to: {model}")?;
        }
        Command::SetVadSensitivity { sensitivity } => {
            client.set_vad_sensitivity(f64::from(*sensitivity)).await?;
            writeln!(out, "VAD sensitivity set to: {sensitivity}")?;
        }
        Command::GetConfig { json } => {
            let config = client.get_config().await?;
            let text = output::config_report(&config, *json).map_err(output_error)?;
            writeln!(out, "{text}")?;
        }
        Command::SetConfig { config, no_save } => {
            client.set_config(config.clone(), !no_save).await?;
            writeln!(out, "Configuration updated successfully")?;
            if *no_save {
                writeln!(out, "(Changes not saved to file)")?;
            }
        }
        Command::SetVad(args) => {
            let update = VadUpdate::from(args);
            client.set_vad_config(&update).await?;
            writeln!(out, "VAD configuration updated")?;
            writeln!(out, "{}", output::vad_summary(&update))?;
        }
        Command::GetMetrics { json } => {
            let metrics = client.get_metrics().await?;
            let text = if *json {
                serde_json::to_string_pretty(&metrics).map_err(output_error)?
            } else {
                output::metrics_report(&metrics)
            };
            writeln!(out, "{text}")?;
        }
        Command::Stream(_) | Command::Monitor => {
            return Err(CliError::InvalidInput {
                message: "stream and monitor are not one-shot commands".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
    }

    out.flush()?;
    Ok(())
}

/// Print transcriptions until Ctrl+C.
pub async fn stream(client: &SttClient, options: StreamArgs) -> Result<(), CliError> {
    client
        .on_transcription(move |result| {
            let mut out = stdout().lock();
            let _ = writeln!(out, "{}", output::transcription_line(&result, &options));
            let _ = out.flush();
        })
        .await?;
    client.on_error(|message| eprintln!("Error: {message}"));

    client.connect().await?;

    if !options.quiet {
        println!("Connected to RT-STT daemon");
        println!("Streaming transcriptions... (Press Ctrl+C to stop)");
        println!();
        client.on_connection(|connected| {
            if connected {
                println!("Reconnected to daemon");
            } else {
                println!("Disconnected from daemon");
            }
        });
    }

    let result = listen_until_interrupted(client).await;
    if !options.quiet {
        println!("\nStopping...");
    }
    client.disconnect().await;
    result
}

/// Show live transcription statistics until Ctrl+C.
pub async fn monitor(client: &SttClient) -> Result<(), CliError> {
    let stats = Arc::new(Mutex::new(MonitorStats::default()));

    client
        .on_transcription(move |result| {
            let line = {
                let mut stats = stats.lock().unwrap_or_else(PoisonError::into_inner);
                stats.record(&result);
                stats.line(&result.text)
            };
            let mut out = stdout().lock();
            let _ = write!(out, "{line}");
            let _ = out.flush();
        })
        .await?;

    client.connect().await?;

    println!("RT-STT Monitor");
    println!("Press Ctrl+C to exit");
    println!();

    let result = listen_until_interrupted(client).await;
    println!("\n");
    client.disconnect().await;
    result
}

async fn listen_until_interrupted(client: &SttClient) -> Result<(), CliError> {
    client.start_listening().await?;
    info!("Listening; waiting for Ctrl+C");

    tokio::signal::ctrl_c().await?;
    debug!("Interrupted");
    Ok(())
}

#[track_caller]
fn output_error(error: serde_json::Error) -> CliError {
    CliError::Output {
        message: error.to_string(),
        location: ErrorLocation::from(Location::caller()),
    }
}
