#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod command;
mod config;
mod output;

use std::process::ExitCode;

use crate::config::Cli;
use crate::output::Output;

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "warden_cli::startup";
pub const TRACING_TARGET_CONFIG: &str = "warden_cli::config";
pub const TRACING_TARGET_COMMAND: &str = "warden_cli::command";

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(error) => {
            if tracing::enabled!(tracing::Level::ERROR) {
                tracing::error!(
                    target: TRACING_TARGET_COMMAND,
                    error = %error,
                    "command failed"
                );
            } else {
                eprintln!("Error: {error:#}");
            }
            ExitCode::FAILURE
        }
    }
}

/// Main application entry point.
fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::init();

    cli.logging.init_tracing()?;
    cli.log_build_info();

    let output = Output::new(cli.json);
    cli.command.execute(output)
}
