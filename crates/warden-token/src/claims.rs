use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};
use warden_core::UserId;

/// Claims carried by every issued token.
///
/// Timestamps are encoded as whole seconds since the Unix epoch so that any
/// conforming verifier can check them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Identity the token was issued to.
    pub user_id: UserId,

    /// Unique token identifier (128-bit, hex-encoded).
    #[serde(rename = "jti")]
    pub token_id: String,

    /// Subject, `user:{id}`.
    #[serde(rename = "sub")]
    pub subject: String,

    /// Issuer (who created the token).
    #[serde(rename = "iss")]
    pub issued_by: String,

    /// Issued at.
    #[serde(rename = "iat", with = "jiff::fmt::serde::timestamp::second::required")]
    pub issued_at: Timestamp,

    /// Not valid before.
    #[serde(rename = "nbf", with = "jiff::fmt::serde::timestamp::second::required")]
    pub not_before: Timestamp,

    /// Expiration time.
    #[serde(
        rename = "exp",
        default,
        skip_serializing_if = "Option::is_none",
        with = "jiff::fmt::serde::timestamp::second::optional"
    )]
    pub expires_at: Option<Timestamp>,
}

impl TokenClaims {
    /// Builds claims for a token issued now.
    pub(crate) fn new(
        user_id: UserId,
        token_id: String,
        issuer: &str,
        issued_at: Timestamp,
        expires_at: Timestamp,
    ) -> Self {
        Self {
            user_id,
            token_id,
            subject: format!("user:{user_id}"),
            issued_by: issuer.to_owned(),
            issued_at,
            not_before: issued_at,
            expires_at: Some(expires_at),
        }
    }

    /// Returns `true` if the token's expiry has passed.
    #[inline]
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| exp <= Timestamp::now())
    }

    /// Returns the time left until expiry, if the token has an expiry.
    ///
    /// The result is negative once the token has expired.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> Option<SignedDuration> {
        self.expires_at
            .map(|exp| exp.duration_since(Timestamp::now()))
    }
}

/// Minimal view used when only the expiry of an unverified token is needed.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ExpiryClaim {
    #[serde(
        rename = "exp",
        default,
        with = "jiff::fmt::serde::timestamp::second::optional"
    )]
    pub expires_at: Option<Timestamp>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_registered_claims_as_seconds() -> anyhow::Result<()> {
        let issued_at = Timestamp::from_second(1_700_000_000)?;
        let expires_at = Timestamp::from_second(1_700_003_600)?;
        let claims = TokenClaims::new(
            UserId::new(42),
            "00ff".to_owned(),
            "warden",
            issued_at,
            expires_at,
        );

        let value = serde_json::to_value(&claims)?;
        assert_eq!(value["user_id"], 42);
        assert_eq!(value["sub"], "user:42");
        assert_eq!(value["iss"], "warden");
        assert_eq!(value["iat"], 1_700_000_000);
        assert_eq!(value["nbf"], 1_700_000_000);
        assert_eq!(value["exp"], 1_700_003_600);

        let parsed: TokenClaims = serde_json::from_value(value)?;
        assert_eq!(parsed, claims);

        Ok(())
    }

    #[test]
    fn expiry_is_optional() -> anyhow::Result<()> {
        let json = r#"{"user_id":1,"jti":"a","sub":"user:1","iss":"warden","iat":1,"nbf":1}"#;
        let claims: TokenClaims = serde_json::from_str(json)?;

        assert_eq!(claims.expires_at, None);
        assert!(!claims.is_expired());
        assert_eq!(claims.remaining(), None);

        Ok(())
    }
}
