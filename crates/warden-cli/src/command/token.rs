//! Token subcommands.

use std::fmt;
use std::process::ExitCode;

use clap::{Args, Subcommand};
use jiff::{SignedDuration, Timestamp};
use serde::Serialize;
use warden_core::UserId;
use warden_token::TokenClaims;

use crate::TRACING_TARGET_COMMAND;
use crate::config::TokenArgs;
use crate::output::{Output, secret_or_stdin};

/// Token subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum TokenCommand {
    /// Issue a signed token for an identity.
    Issue(IssueArgs),
    /// Verify a token and print its claims.
    Inspect(InspectArgs),
}

impl TokenCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Issue(_) => "token issue",
            Self::Inspect(_) => "token inspect",
        }
    }

    pub fn execute(self, output: Output) -> anyhow::Result<ExitCode> {
        match self {
            Self::Issue(args) => args.execute(output),
            Self::Inspect(args) => args.execute(output),
        }
    }
}

/// Arguments for `warden token issue`.
#[derive(Debug, Clone, Args)]
pub struct IssueArgs {
    /// Identity to issue the token to (nonzero).
    #[arg(long)]
    pub user_id: u64,

    /// Lifetime of this token, overriding the default.
    #[arg(long)]
    pub ttl: Option<SignedDuration>,

    #[clap(flatten)]
    pub token: TokenArgs,
}

#[derive(Serialize)]
struct IssueReport {
    token: String,
    expires_at: Option<Timestamp>,
}

impl fmt::Display for IssueReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

impl IssueArgs {
    pub fn execute(self, output: Output) -> anyhow::Result<ExitCode> {
        let service = self.token.build()?;
        let identity = UserId::new(self.user_id);

        let token = match self.ttl {
            Some(ttl) => service.generate_with_ttl(identity, ttl)?,
            None => service.generate(identity)?,
        };
        let expires_at = service.parse(&token)?.expires_at;

        tracing::info!(
            target: TRACING_TARGET_COMMAND,
            user_id = %identity,
            expires_at = ?expires_at,
            "token issued"
        );

        output.emit(&IssueReport { token, expires_at })?;
        Ok(ExitCode::SUCCESS)
    }
}

/// Arguments for `warden token inspect`.
#[derive(Debug, Clone, Args)]
pub struct InspectArgs {
    /// Token to inspect. Read from stdin when omitted.
    pub token_value: Option<String>,

    #[clap(flatten)]
    pub token: TokenArgs,
}

#[derive(Serialize)]
struct InspectReport {
    claims: TokenClaims,
    remaining: SignedDuration,
}

impl fmt::Display for InspectReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let claims = &self.claims;
        writeln!(f, "user id:    {}", claims.user_id)?;
        writeln!(f, "token id:   {}", claims.token_id)?;
        writeln!(f, "subject:    {}", claims.subject)?;
        writeln!(f, "issuer:     {}", claims.issued_by)?;
        writeln!(f, "issued at:  {}", claims.issued_at)?;
        match claims.expires_at {
            Some(expires_at) => writeln!(f, "expires at: {expires_at}")?,
            None => writeln!(f, "expires at: never")?,
        }
        write!(f, "remaining:  {}", self.remaining)
    }
}

impl InspectArgs {
    pub fn execute(self, output: Output) -> anyhow::Result<ExitCode> {
        let service = self.token.build()?;
        let token = secret_or_stdin(self.token_value, "token")?;

        let claims = service.parse(&token)?;
        let remaining = service.remaining_ttl(&token)?;

        output.emit(&InspectReport { claims, remaining })?;
        Ok(ExitCode::SUCCESS)
    }
}
