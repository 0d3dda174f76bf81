use crate::helpers::{FakeDaemon, answer};

use rt_stt::cli::{Command, VadArgs};
use rt_stt::commands::{execute, resolve_config};
use rt_stt::error::CliError;

use std::path::PathBuf;

use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// One-shot commands against a fake daemon
// ============================================================================

/// **VALUE**: Verifies `status` prints the human-readable report from the daemon's reply.
///
/// **WHY THIS MATTERS**: This is the CLI's health check; scripts and users read it to see
/// whether the daemon is listening.
#[tokio::test]
async fn given_daemon_when_status_executed_then_report_printed() {
    // GIVEN
    let daemon = FakeDaemon::start();
    let (client, mut stream) = daemon.connected_client().await;

    // WHEN
    let mut out = Vec::new();
    let command = Command::Status { json: false };
    let (result, _) = tokio::join!(
        execute(&client, &command, &mut out),
        answer(
            &mut stream,
            "get_status",
            json!({
                "success": true,
                "result": { "listening": true, "model": "small", "language": "de", "clients": 2, "uptime": 120 }
            }),
        )
    );

    // THEN
    result.expect("status");
    let printed = String::from_utf8(out).expect("utf8");
    assert!(printed.contains("Listening: Yes"), "{printed}");
    assert!(printed.contains("Model: small"), "{printed}");
    assert!(printed.contains("Connected Clients: 2"), "{printed}");
    assert!(printed.contains("Uptime: 2.0 minutes"), "{printed}");
    client.disconnect().await;
}

#[tokio::test]
async fn given_vad_flags_when_set_vad_executed_then_nested_config_sent_and_summary_printed() {
    let daemon = FakeDaemon::start();
    let (client, mut stream) = daemon.connected_client().await;

    let mut out = Vec::new();
    let command = Command::SetVad(VadArgs {
        end_threshold: Some(0.9),
        ..VadArgs::default()
    });
    let (result, params) = tokio::join!(
        execute(&client, &command, &mut out),
        answer(&mut stream, "set_config", json!({ "success": true })),
    );

    result.expect("set-vad");
    assert_eq!(
        params,
        json!({ "config": { "stt": { "vad": { "speech_end_threshold": 0.9 } } }, "save": true })
    );
    let printed = String::from_utf8(out).expect("utf8");
    assert!(printed.contains("VAD configuration updated"));
    assert!(printed.contains("  speech_end_threshold: 0.9"));
    client.disconnect().await;
}

#[tokio::test]
async fn given_no_save_when_set_config_executed_then_save_false_and_notice_printed() {
    let daemon = FakeDaemon::start();
    let (client, mut stream) = daemon.connected_client().await;

    let mut out = Vec::new();
    let command = Command::SetConfig {
        config: json!({ "stt": { "language": "fr" } }),
        no_save: true,
    };
    let (result, params) = tokio::join!(
        execute(&client, &command, &mut out),
        answer(&mut stream, "set_config", json!({ "success": true })),
    );

    result.expect("set-config");
    assert_eq!(params["save"], json!(false));
    assert!(String::from_utf8(out).expect("utf8").contains("(Changes not saved to file)"));
    client.disconnect().await;
}

/// **VALUE**: Verifies a daemon rejection becomes a command error with nothing printed.
///
/// **BUG THIS CATCHES**: Printing "Model set to" even though the daemon refused.
#[tokio::test]
async fn given_daemon_rejects_when_set_model_executed_then_command_error() {
    let daemon = FakeDaemon::start();
    let (client, mut stream) = daemon.connected_client().await;

    let mut out = Vec::new();
    let command = Command::SetModel {
        model: "missing".to_string(),
    };
    let (result, _) = tokio::join!(
        execute(&client, &command, &mut out),
        answer(
            &mut stream,
            "set_model",
            json!({ "success": false, "error": "model not found" }),
        ),
    );

    let error = result.expect_err("should fail");
    assert!(matches!(error, CliError::Command { .. }));
    assert_eq!(error.summary(), "Command error: 'set_model' failed: model not found");
    assert!(out.is_empty());
    client.disconnect().await;
}

#[tokio::test]
async fn given_empty_set_vad_when_executed_then_invalid_input() {
    let daemon = FakeDaemon::start();
    let (client, _stream) = daemon.connected_client().await;

    let mut out = Vec::new();
    let result = execute(&client, &Command::SetVad(VadArgs::default()), &mut out).await;

    assert!(matches!(result, Err(CliError::InvalidInput { .. })));
    client.disconnect().await;
}

// ============================================================================
// Config resolution
// ============================================================================

#[test]
fn given_socket_flag_when_resolving_config_then_flag_wins_over_file() {
    // GIVEN: A config file pointing elsewhere
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(
        dir.path().join("client.json"),
        r#"{ "socket_path": "/from/file.sock", "command_timeout_ms": 750 }"#,
    )
    .expect("write");

    // WHEN
    let config = resolve_config(Some(dir.path()), Some(PathBuf::from("/from/flag.sock")))
        .expect("resolve");

    // THEN: Socket from the flag, other settings from the file
    assert_eq!(config.socket_path, PathBuf::from("/from/flag.sock"));
    assert_eq!(config.command_timeout_ms, 750);
}

#[test]
fn given_corrupt_config_file_when_resolving_then_config_error() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("client.json"), "nope").expect("write");

    let result = resolve_config(Some(dir.path()), None);

    assert!(matches!(result, Err(CliError::Config { .. })));
}
