//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── logging: LogConfig     # Log output format
//! ├── json: bool             # Machine-readable command output
//! └── command: Command       # Subcommand with its own arguments
//!     ├── HasherArgs         # Argon2id cost and memory (password commands)
//!     └── TokenArgs          # Signing secret, TTL, issuer (token commands)
//! ```
//!
//! Every option can be provided as an argument or an environment variable.

mod hasher;
mod logging;
mod token;

use std::process;

use clap::Parser;
pub use hasher::HasherArgs;
pub use logging::{LogConfig, LogFormat};
pub use token::TokenArgs;

use crate::TRACING_TARGET_STARTUP;
use crate::command::Command;

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "warden")]
#[command(about = "Password hashing, strength checks and signed tokens")]
#[command(version)]
pub struct Cli {
    /// Logging configuration.
    #[clap(flatten)]
    pub logging: LogConfig,

    /// Print command results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// The .env file is loaded first so that clap's `env` fallbacks see its
    /// values.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Logs build information at debug level.
    pub fn log_build_info(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            command = self.command.name(),
            features = ?Self::enabled_features(),
            "build information"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_nested_token_command() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from([
            "warden",
            "--json",
            "token",
            "issue",
            "--signing-secret",
            "s3cret",
            "--user-id",
            "42",
            "--ttl",
            "2h",
        ])?;

        assert!(cli.json);
        assert_eq!(cli.command.name(), "token issue");
        Ok(())
    }
}
