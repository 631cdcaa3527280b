use std::fmt;

use derive_builder::Builder;
use jiff::SignedDuration;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TokenError};

/// Default values for configuration options.
mod defaults {
    use jiff::SignedDuration;

    /// Default token lifetime (24 hours).
    pub const TTL: SignedDuration = SignedDuration::from_hours(24);

    /// Default trailing refresh window before expiry (7 days).
    pub const REFRESH_WINDOW: SignedDuration = SignedDuration::from_hours(7 * 24);

    /// Default issuer claim.
    pub const ISSUER: &str = "warden";

    /// Default cap on refreshes per token lineage.
    pub const MAX_REFRESH_COUNT: u32 = 5;
}

/// Token engine configuration.
///
/// The signing secret is required; every other field has a default.
#[derive(Clone, Serialize, Deserialize, Builder)]
#[must_use = "config does nothing unless you use it"]
#[builder(
    pattern = "owned",
    setter(into, strip_option, prefix = "with"),
    build_fn(validate = "Self::validate")
)]
pub struct TokenConfig {
    /// HMAC secret used to sign and verify tokens.
    pub signing_secret: String,

    /// Lifetime of tokens issued without an explicit TTL.
    #[builder(default = "defaults::TTL")]
    #[serde(default = "TokenConfig::default_ttl")]
    pub ttl: SignedDuration,

    /// Refresh is only permitted once `expiry - refresh_window` has passed.
    #[builder(default = "defaults::REFRESH_WINDOW")]
    #[serde(default = "TokenConfig::default_refresh_window")]
    pub refresh_window: SignedDuration,

    /// Issuer claim embedded in and required of every token.
    #[builder(default = "defaults::ISSUER.to_owned()")]
    #[serde(default = "TokenConfig::default_issuer")]
    pub issuer: String,

    /// Whether tokens may be refreshed at all.
    #[builder(default = "true")]
    #[serde(default = "TokenConfig::default_allow_refresh")]
    pub allow_refresh: bool,

    /// Maximum number of refreshes along one token lineage.
    #[builder(default = "defaults::MAX_REFRESH_COUNT")]
    #[serde(default = "TokenConfig::default_max_refresh_count")]
    pub max_refresh_count: u32,
}

impl TokenConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> TokenConfigBuilder {
        TokenConfigBuilder::default()
    }

    /// Creates a configuration with default settings and the given secret.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidConfig`] if the secret is empty.
    pub fn new(signing_secret: impl Into<String>) -> Result<Self> {
        Self::builder()
            .with_signing_secret(signing_secret)
            .build()
            .map_err(|e| TokenError::InvalidConfig(e.to_string()))
    }

    /// Checks the invariants the builder enforces, for configurations that
    /// were deserialized or constructed directly.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidConfig`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        check_secret(&self.signing_secret)
            .and_then(|()| check_ttl(self.ttl))
            .and_then(|()| check_refresh_window(self.refresh_window))
            .and_then(|()| check_issuer(&self.issuer))
            .map_err(TokenError::InvalidConfig)
    }

    fn default_ttl() -> SignedDuration {
        defaults::TTL
    }

    fn default_refresh_window() -> SignedDuration {
        defaults::REFRESH_WINDOW
    }

    fn default_issuer() -> String {
        defaults::ISSUER.to_owned()
    }

    fn default_allow_refresh() -> bool {
        true
    }

    fn default_max_refresh_count() -> u32 {
        defaults::MAX_REFRESH_COUNT
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("signing_secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .field("refresh_window", &self.refresh_window)
            .field("issuer", &self.issuer)
            .field("allow_refresh", &self.allow_refresh)
            .field("max_refresh_count", &self.max_refresh_count)
            .finish()
    }
}

impl TokenConfigBuilder {
    /// Wrapper for builder validation that returns String errors.
    fn validate(builder: &TokenConfigBuilder) -> Result<(), String> {
        if let Some(secret) = &builder.signing_secret {
            check_secret(secret)?;
        }
        if let Some(ttl) = builder.ttl {
            check_ttl(ttl)?;
        }
        if let Some(window) = builder.refresh_window {
            check_refresh_window(window)?;
        }
        if let Some(issuer) = &builder.issuer {
            check_issuer(issuer)?;
        }

        Ok(())
    }
}

fn check_secret(secret: &str) -> Result<(), String> {
    if secret.is_empty() {
        return Err("Signing secret cannot be empty".to_string());
    }
    Ok(())
}

fn check_ttl(ttl: SignedDuration) -> Result<(), String> {
    if !ttl.is_positive() {
        return Err("Token lifetime must be positive".to_string());
    }
    Ok(())
}

fn check_refresh_window(window: SignedDuration) -> Result<(), String> {
    if window.is_negative() {
        return Err("Refresh window cannot be negative".to_string());
    }
    Ok(())
}

fn check_issuer(issuer: &str) -> Result<(), String> {
    if issuer.is_empty() {
        return Err("Issuer cannot be empty".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_defaults() -> anyhow::Result<()> {
        let config = TokenConfig::new("secret")?;

        assert_eq!(config.ttl, SignedDuration::from_hours(24));
        assert_eq!(config.refresh_window, SignedDuration::from_hours(168));
        assert_eq!(config.issuer, "warden");
        assert!(config.allow_refresh);
        assert_eq!(config.max_refresh_count, 5);
        assert!(config.validate().is_ok());

        Ok(())
    }

    #[test]
    fn builder_rejects_invalid_values() {
        assert!(TokenConfig::new("").is_err());
        assert!(TokenConfig::builder().build().is_err());
        assert!(
            TokenConfig::builder()
                .with_signing_secret("secret")
                .with_ttl(SignedDuration::ZERO)
                .build()
                .is_err()
        );
        assert!(
            TokenConfig::builder()
                .with_signing_secret("secret")
                .with_refresh_window(SignedDuration::from_secs(-1))
                .build()
                .is_err()
        );
    }

    #[test]
    fn debug_redacts_secret() -> anyhow::Result<()> {
        let config = TokenConfig::new("super-secret-value")?;
        let rendered = format!("{config:?}");

        assert!(!rendered.contains("super-secret-value"));
        assert!(rendered.contains("REDACTED"));

        Ok(())
    }

    #[test]
    fn deserializes_with_defaults() -> anyhow::Result<()> {
        let config: TokenConfig = serde_json::from_str(r#"{"signing_secret":"s","ttl":"PT1H"}"#)?;

        assert_eq!(config.ttl, SignedDuration::from_hours(1));
        assert_eq!(config.issuer, "warden");
        assert!(config.validate().is_ok());

        Ok(())
    }
}
