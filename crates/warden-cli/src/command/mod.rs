//! Subcommands.

mod password;
mod token;

use std::process::ExitCode;

use clap::Subcommand;
pub use password::{GenerateArgs, HashArgs, PolicyArgs, StrengthArgs, VerifyArgs};
pub use token::TokenCommand;

use crate::output::Output;

/// Available subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Hash a password with Argon2id.
    Hash(HashArgs),
    /// Verify a password against an encoded hash.
    Verify(VerifyArgs),
    /// Estimate the strength of a password.
    Strength(StrengthArgs),
    /// Check a password against a policy.
    Policy(PolicyArgs),
    /// Generate random passwords.
    Generate(GenerateArgs),
    /// Issue and inspect signed tokens.
    #[command(subcommand)]
    Token(TokenCommand),
}

impl Command {
    /// Returns the command name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hash(_) => "hash",
            Self::Verify(_) => "verify",
            Self::Strength(_) => "strength",
            Self::Policy(_) => "policy",
            Self::Generate(_) => "generate",
            Self::Token(command) => command.name(),
        }
    }

    /// Runs the command.
    pub fn execute(self, output: Output) -> anyhow::Result<ExitCode> {
        match self {
            Self::Hash(args) => args.execute(output),
            Self::Verify(args) => args.execute(output),
            Self::Strength(args) => args.execute(output),
            Self::Policy(args) => args.execute(output),
            Self::Generate(args) => args.execute(output),
            Self::Token(command) => command.execute(output),
        }
    }
}
