//! Token engine parameters.

use anyhow::Context;
use clap::Args;
use jiff::SignedDuration;
use warden_token::{TokenConfig, TokenService};

use crate::TRACING_TARGET_CONFIG;

/// Token engine configuration for the token commands.
#[derive(Clone, Args)]
#[must_use = "config does nothing unless you use it"]
pub struct TokenArgs {
    /// HMAC secret used to sign and verify tokens.
    #[arg(long, env = "WARDEN_SIGNING_SECRET", hide_env_values = true)]
    pub signing_secret: String,

    /// Default token lifetime, such as `24h` or `PT30M`.
    #[arg(long = "default-ttl", env = "WARDEN_TOKEN_TTL", default_value = "24h")]
    pub default_ttl: SignedDuration,

    /// Issuer claim embedded in and required of tokens.
    #[arg(long, env = "WARDEN_TOKEN_ISSUER", default_value = "warden")]
    pub issuer: String,
}

impl std::fmt::Debug for TokenArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenArgs")
            .field("signing_secret", &"[REDACTED]")
            .field("default_ttl", &self.default_ttl)
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl TokenArgs {
    /// Builds the token service.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(&self) -> anyhow::Result<TokenService> {
        let config = TokenConfig::builder()
            .with_signing_secret(self.signing_secret.clone())
            .with_ttl(self.default_ttl)
            .with_issuer(self.issuer.clone())
            .build()
            .context("invalid token configuration")?;

        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            ttl = %config.ttl,
            issuer = %config.issuer,
            "token configuration"
        );

        TokenService::new(config).context("failed to create token service")
    }
}
