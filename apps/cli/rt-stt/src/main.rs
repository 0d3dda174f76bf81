use rt_stt::cli::Cli;
use rt_stt::commands;
use rt_stt::logger::initialize as LoggerInitialize;

use std::process::ExitCode;

use clap::Parser;
use log::debug;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logger FIRST
    if let Err(e) = LoggerInitialize(cli.log_level(), cli.log_file.as_deref()) {
        eprintln!("{}", e.summary());
        return ExitCode::FAILURE;
    }

    debug!("rt-stt starting");

    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            debug!("{e}");
            eprintln!("{}", e.summary());
            ExitCode::FAILURE
        }
    }
}
