//! Token issuance, validation, refresh and revocation.

use std::sync::Arc;

use jiff::{SignedDuration, Timestamp};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use warden_core::{TokenIssuer, UserId};

use crate::TRACING_TARGET_SERVICE;
use crate::claims::{ExpiryClaim, TokenClaims};
use crate::config::TokenConfig;
use crate::error::{Result, TokenError};
use crate::ledger::TokenLedger;

/// Signing algorithm for every issued token.
const ALGORITHM: Algorithm = Algorithm::HS256;

/// Issues and manages signed bearer tokens.
///
/// The signing key is fixed at construction. Revocation state lives in an
/// in-process ledger scoped to this instance; clones share it.
#[derive(Clone)]
pub struct TokenService {
    inner: Arc<TokenServiceInner>,
}

struct TokenServiceInner {
    config: TokenConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiry_validation: Validation,
    ledger: TokenLedger,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("config", &self.inner.config)
            .field("revoked", &self.inner.ledger.revoked_len())
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Creates a new token service.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidConfig`] if the configuration is invalid.
    pub fn new(config: TokenConfig) -> Result<Self> {
        config.validate()?;

        let secret = config.signing_secret.as_bytes();
        let encoding_key = EncodingKey::from_secret(secret);
        let decoding_key = DecodingKey::from_secret(secret);

        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();
        validation.set_issuer(&[config.issuer.as_str()]);

        // Only the expiry of a revoked token is needed during cleanup.
        let mut expiry_validation = Validation::new(ALGORITHM);
        expiry_validation.insecure_disable_signature_validation();
        expiry_validation.validate_exp = false;
        expiry_validation.validate_nbf = false;
        expiry_validation.validate_aud = false;
        expiry_validation.required_spec_claims.clear();

        tracing::info!(
            target: TRACING_TARGET_SERVICE,
            issuer = %config.issuer,
            ttl = %config.ttl,
            allow_refresh = config.allow_refresh,
            max_refresh_count = config.max_refresh_count,
            "token service initialized"
        );

        let inner = TokenServiceInner {
            config,
            encoding_key,
            decoding_key,
            validation,
            expiry_validation,
            ledger: TokenLedger::default(),
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Returns the configuration this service was built with.
    #[inline]
    pub fn config(&self) -> &TokenConfig {
        &self.inner.config
    }

    /// Generates a fresh token identifier: 16 random bytes, hex-encoded.
    pub fn generate_jti() -> String {
        let mut bytes = [0_u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Issues a token with the configured default lifetime.
    pub fn generate(&self, identity: UserId) -> Result<String> {
        self.generate_with_ttl(identity, self.inner.config.ttl)
    }

    /// Issues a token valid for `ttl` and indexes it under the identity.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidIdentity`] for the zero identity,
    /// [`TokenError::InvalidTtl`] for a non-positive lifetime and
    /// [`TokenError::Signing`] if signing fails.
    pub fn generate_with_ttl(&self, identity: UserId, ttl: SignedDuration) -> Result<String> {
        let (token, claims) = self.sign(identity, ttl)?;
        self.inner.ledger.register(&token, identity);

        tracing::debug!(
            target: TRACING_TARGET_SERVICE,
            user_id = %identity,
            jti = %claims.token_id,
            "token issued"
        );

        Ok(token)
    }

    /// Signs a new token without touching the ledger.
    fn sign(&self, identity: UserId, ttl: SignedDuration) -> Result<(String, TokenClaims)> {
        if !identity.is_valid() {
            return Err(TokenError::InvalidIdentity);
        }
        if !ttl.is_positive() {
            return Err(TokenError::InvalidTtl);
        }

        let issued_at = Timestamp::now();
        let expires_at = issued_at
            .checked_add(ttl)
            .map_err(|_| TokenError::InvalidTtl)?;

        let claims = TokenClaims::new(
            identity,
            Self::generate_jti(),
            &self.inner.config.issuer,
            issued_at,
            expires_at,
        );

        let token = encode(&Header::new(ALGORITHM), &claims, &self.inner.encoding_key).map_err(
            |e| {
                tracing::error!(
                    target: TRACING_TARGET_SERVICE,
                    error = %e,
                    user_id = %identity,
                    "failed to sign token"
                );
                TokenError::Signing(e)
            },
        )?;

        Ok((token, claims))
    }

    /// Verifies the signature, issuer and time claims and returns the claims.
    ///
    /// Revocation is not consulted.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Expired`] for an expired token and
    /// [`TokenError::Parse`] for any other verification failure.
    pub fn parse(&self, token: &str) -> Result<TokenClaims> {
        if token.is_empty() {
            return Err(TokenError::EmptyToken);
        }

        decode::<TokenClaims>(token, &self.inner.decoding_key, &self.inner.validation)
            .map(|data| data.claims)
            .map_err(TokenError::from_decode)
    }

    /// Validates a token and returns the identity it was issued to.
    ///
    /// # Arguments
    ///
    /// * `token` - The encoded token presented by the caller
    ///
    /// # Returns
    ///
    /// The identity from the token's claims.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::EmptyToken`], [`TokenError::Revoked`],
    /// [`TokenError::Expired`] or [`TokenError::Parse`].
    ///
    /// # Security
    ///
    /// The revocation ledger is consulted before the signature is checked,
    /// so a revoked token is rejected even while it is otherwise valid. The
    /// signature, issuer, `nbf` and `exp` are all verified with zero leeway.
    pub fn validate(&self, token: &str) -> Result<UserId> {
        if token.is_empty() {
            return Err(TokenError::EmptyToken);
        }
        if self.is_revoked(token) {
            return Err(TokenError::Revoked);
        }

        Ok(self.parse(token)?.user_id)
    }

    /// Revokes a token. Revoking an already revoked token is not an error.
    pub fn revoke(&self, token: &str) -> Result<()> {
        if token.is_empty() {
            return Err(TokenError::EmptyToken);
        }

        if self.inner.ledger.revoke(token) {
            tracing::debug!(
                target: TRACING_TARGET_SERVICE,
                jti = %self.token_id_hint(token),
                "token revoked"
            );
        }

        Ok(())
    }

    /// Returns `true` if the token has been revoked and not yet purged.
    pub fn is_revoked(&self, token: &str) -> bool {
        self.inner.ledger.is_revoked(token)
    }

    /// Revokes every token currently indexed for the identity and returns
    /// how many were revoked.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidIdentity`] for the zero identity.
    pub fn revoke_all(&self, identity: UserId) -> Result<usize> {
        if !identity.is_valid() {
            return Err(TokenError::InvalidIdentity);
        }

        let revoked = self.inner.ledger.revoke_all(identity);
        tracing::info!(
            target: TRACING_TARGET_SERVICE,
            user_id = %identity,
            revoked,
            "all tokens revoked for identity"
        );

        Ok(revoked)
    }

    /// Exchanges a token for a new one and revokes the original.
    ///
    /// Refresh is only allowed inside the trailing window before expiry and
    /// at most `max_refresh_count` times along one lineage. The new token
    /// carries the incremented count. Registering the new token and revoking
    /// the old one happen as a single ledger update, so a failed refresh
    /// leaves no bookkeeping behind.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::RefreshDisabled`], [`TokenError::EmptyToken`],
    /// [`TokenError::Parse`] or [`TokenError::Expired`],
    /// [`TokenError::Revoked`], [`TokenError::RefreshLimitExceeded`] or
    /// [`TokenError::TooEarly`].
    pub fn refresh(&self, token: &str) -> Result<String> {
        let config = &self.inner.config;
        if !config.allow_refresh {
            return Err(TokenError::RefreshDisabled);
        }
        if token.is_empty() {
            return Err(TokenError::EmptyToken);
        }

        let claims = self.parse(token)?;
        if self.is_revoked(token) {
            return Err(TokenError::Revoked);
        }

        if self.inner.ledger.refresh_count(token) >= config.max_refresh_count {
            return Err(TokenError::RefreshLimitExceeded {
                max: config.max_refresh_count,
            });
        }

        if let Some(expires_at) = claims.expires_at {
            let refreshable_from = expires_at
                .checked_sub(config.refresh_window)
                .unwrap_or(Timestamp::MIN);
            if Timestamp::now() < refreshable_from {
                return Err(TokenError::TooEarly);
            }
        }

        let (next, next_claims) = self.sign(claims.user_id, config.ttl)?;
        let count = self.inner.ledger.commit_refresh(
            token,
            &next,
            claims.user_id,
            config.max_refresh_count,
        )?;

        tracing::debug!(
            target: TRACING_TARGET_SERVICE,
            user_id = %claims.user_id,
            previous_jti = %claims.token_id,
            jti = %next_claims.token_id,
            refresh_count = count,
            "token refreshed"
        );

        Ok(next)
    }

    /// Returns how long the token remains valid.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Expired`] once the expiry has passed and
    /// [`TokenError::NoExpiry`] if the token carries no expiry.
    pub fn remaining_ttl(&self, token: &str) -> Result<SignedDuration> {
        let claims = self.parse(token)?;
        let remaining = claims.remaining().ok_or(TokenError::NoExpiry)?;

        if !remaining.is_positive() {
            return Err(TokenError::Expired);
        }

        Ok(remaining)
    }

    /// Returns the refresh count recorded for the token's lineage.
    pub fn refresh_count(&self, token: &str) -> u32 {
        self.inner.ledger.refresh_count(token)
    }

    /// Returns the number of live tokens indexed for the identity.
    pub fn active_tokens(&self, identity: UserId) -> usize {
        self.inner.ledger.active_tokens(identity)
    }

    /// Drops revocation records whose token has itself expired.
    ///
    /// Tokens are parsed without signature verification since only the expiry
    /// is needed. Unparseable records are dropped; records for tokens without
    /// an expiry are kept. Returns the number of records removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Timestamp::now();
        let expired: Vec<String> = self
            .inner
            .ledger
            .revoked_tokens()
            .into_iter()
            .filter(|token| match self.unverified_expiry(token) {
                Ok(Some(expires_at)) => expires_at < now,
                Ok(None) => false,
                Err(_) => true,
            })
            .collect();

        if expired.is_empty() {
            return 0;
        }

        let purged = self.inner.ledger.purge(&expired);
        tracing::info!(
            target: TRACING_TARGET_SERVICE,
            purged,
            "expired revocation records cleaned up"
        );

        purged
    }

    fn unverified_expiry(&self, token: &str) -> Result<Option<Timestamp>> {
        decode::<ExpiryClaim>(
            token,
            &DecodingKey::from_secret(&[]),
            &self.inner.expiry_validation,
        )
        .map(|data| data.claims.expires_at)
        .map_err(TokenError::Parse)
    }

    /// Token identifier for log lines, without logging the token itself.
    fn token_id_hint(&self, token: &str) -> String {
        decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(&[]),
            &self.inner.expiry_validation,
        )
        .map_or_else(|_| "unknown".to_owned(), |data| data.claims.token_id)
    }
}

impl TokenIssuer for TokenService {
    fn issue(&self, identity: UserId) -> warden_core::Result<String> {
        Ok(self.generate(identity)?)
    }

    fn validate(&self, token: &str) -> warden_core::Result<UserId> {
        Ok(TokenService::validate(self, token)?)
    }

    fn refresh(&self, token: &str) -> warden_core::Result<String> {
        Ok(TokenService::refresh(self, token)?)
    }

    fn revoke(&self, token: &str) -> warden_core::Result<()> {
        Ok(TokenService::revoke(self, token)?)
    }

    fn revoke_all(&self, identity: UserId) -> warden_core::Result<()> {
        TokenService::revoke_all(self, identity)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    use super::*;

    fn service() -> anyhow::Result<TokenService> {
        Ok(TokenService::new(TokenConfig::new("test-signing-secret")?)?)
    }

    #[test]
    fn generate_and_validate_round_trip() -> anyhow::Result<()> {
        let service = service()?;
        let user = UserId::new(7);

        let token = service.generate(user)?;
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(service.validate(&token)?, user);

        let claims = service.parse(&token)?;
        assert_eq!(claims.user_id, user);
        assert_eq!(claims.subject, "user:7");
        assert_eq!(claims.issued_by, "warden");
        assert_eq!(claims.token_id.len(), 32);
        assert_eq!(service.active_tokens(user), 1);

        Ok(())
    }

    #[test]
    fn generate_rejects_invalid_input() -> anyhow::Result<()> {
        let service = service()?;

        assert!(matches!(
            service.generate(UserId::new(0)),
            Err(TokenError::InvalidIdentity)
        ));
        assert!(matches!(
            service.generate_with_ttl(UserId::new(1), SignedDuration::ZERO),
            Err(TokenError::InvalidTtl)
        ));
        assert!(matches!(
            service.generate_with_ttl(UserId::new(1), SignedDuration::from_secs(-5)),
            Err(TokenError::InvalidTtl)
        ));

        Ok(())
    }

    #[test]
    fn jti_is_unique() {
        let ids: std::collections::HashSet<_> =
            (0..1000).map(|_| TokenService::generate_jti()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn validate_rejects_bad_tokens() -> anyhow::Result<()> {
        let service = service()?;
        let token = service.generate(UserId::new(1))?;

        assert!(matches!(service.validate(""), Err(TokenError::EmptyToken)));
        assert!(matches!(
            service.validate("not.a.token"),
            Err(TokenError::Parse(_))
        ));

        let mut tampered = token.clone();
        tampered.push('x');
        assert!(matches!(
            service.validate(&tampered),
            Err(TokenError::Parse(_))
        ));

        let foreign = TokenService::new(TokenConfig::new("another-secret")?)?;
        assert!(matches!(
            foreign.validate(&token),
            Err(TokenError::Parse(_))
        ));

        Ok(())
    }

    #[test]
    fn revocation_is_final() -> anyhow::Result<()> {
        let service = service()?;
        let user = UserId::new(2);
        let token = service.generate(user)?;

        service.revoke(&token)?;
        service.revoke(&token)?;
        assert!(service.is_revoked(&token));
        assert!(matches!(service.validate(&token), Err(TokenError::Revoked)));
        assert!(matches!(service.validate(&token), Err(TokenError::Revoked)));
        assert_eq!(service.active_tokens(user), 0);

        // The token has not expired, so cleanup keeps the revocation.
        assert_eq!(service.cleanup_expired(), 0);
        assert!(service.is_revoked(&token));

        assert!(matches!(service.revoke(""), Err(TokenError::EmptyToken)));

        Ok(())
    }

    #[test]
    fn refresh_revokes_predecessor() -> anyhow::Result<()> {
        let service = service()?;
        let user = UserId::new(3);
        let old = service.generate(user)?;

        let new = service.refresh(&old)?;
        assert_ne!(old, new);
        assert!(service.is_revoked(&old));
        assert_eq!(service.validate(&new)?, user);
        assert_eq!(service.refresh_count(&new), 1);
        assert_eq!(service.active_tokens(user), 1);

        assert!(matches!(service.refresh(&old), Err(TokenError::Revoked)));

        Ok(())
    }

    #[test]
    fn concurrent_refresh_has_one_winner() -> anyhow::Result<()> {
        const CALLERS: usize = 8;

        let service = service()?;
        let user = UserId::new(30);
        let token = service.generate(user)?;
        let barrier = Barrier::new(CALLERS);

        let results: Vec<Result<String>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..CALLERS)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        service.refresh(&token)
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| handle.join().expect("refresh thread panicked"))
                .collect()
        });

        let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1);
        assert!(
            results
                .iter()
                .filter(|r| r.is_err())
                .all(|r| matches!(r, Err(TokenError::Revoked)))
        );

        assert!(service.is_revoked(&token));
        assert_eq!(service.validate(winners[0])?, user);
        assert_eq!(service.refresh_count(winners[0]), 1);
        assert_eq!(service.active_tokens(user), 1);

        Ok(())
    }

    #[test]
    fn revoke_all_racing_refresh_leaves_no_live_token() -> anyhow::Result<()> {
        let service = service()?;
        let user = UserId::new(31);

        for _ in 0..20 {
            let token = service.generate(user)?;
            let barrier = Barrier::new(2);

            let refreshed = thread::scope(|scope| {
                let refresher = scope.spawn(|| {
                    barrier.wait();
                    service.refresh(&token)
                });
                let revoker = scope.spawn(|| {
                    barrier.wait();
                    service.revoke_all(user)
                });

                let revoked = revoker.join().expect("revoke thread panicked");
                assert!(revoked.is_ok());
                refresher.join().expect("refresh thread panicked")
            });

            match refreshed {
                Ok(next) => {
                    assert!(service.is_revoked(&next));
                    assert!(matches!(service.validate(&next), Err(TokenError::Revoked)));
                }
                Err(error) => assert!(matches!(error, TokenError::Revoked)),
            }

            assert!(service.is_revoked(&token));
            assert_eq!(service.active_tokens(user), 0);
        }

        Ok(())
    }

    #[test]
    fn refresh_lineage_is_capped() -> anyhow::Result<()> {
        let service = service()?;
        let max = service.config().max_refresh_count;
        let mut token = service.generate(UserId::new(4))?;

        for expected in 1..=max {
            token = service.refresh(&token)?;
            assert_eq!(service.refresh_count(&token), expected);
        }

        assert!(matches!(
            service.refresh(&token),
            Err(TokenError::RefreshLimitExceeded { max: 5 })
        ));
        // The capped token stays valid.
        assert!(!service.is_revoked(&token));

        Ok(())
    }

    #[test]
    fn refresh_respects_window_and_flag() -> anyhow::Result<()> {
        let early = TokenService::new(
            TokenConfig::builder()
                .with_signing_secret("secret")
                .with_ttl(SignedDuration::from_hours(1))
                .with_refresh_window(SignedDuration::from_mins(10))
                .build()?,
        )?;
        let token = early.generate(UserId::new(5))?;
        assert!(matches!(early.refresh(&token), Err(TokenError::TooEarly)));
        assert!(!early.is_revoked(&token));

        let disabled = TokenService::new(
            TokenConfig::builder()
                .with_signing_secret("secret")
                .with_allow_refresh(false)
                .build()?,
        )?;
        let token = disabled.generate(UserId::new(5))?;
        assert!(matches!(
            disabled.refresh(&token),
            Err(TokenError::RefreshDisabled)
        ));
        assert!(matches!(
            disabled.refresh(""),
            Err(TokenError::RefreshDisabled)
        ));

        let service = service()?;
        assert!(matches!(service.refresh(""), Err(TokenError::EmptyToken)));
        assert!(matches!(
            service.refresh("garbage"),
            Err(TokenError::Parse(_))
        ));

        Ok(())
    }

    #[test]
    fn revoke_all_revokes_every_token() -> anyhow::Result<()> {
        let service = service()?;
        let user = UserId::new(6);
        let other = UserId::new(60);

        let tokens = [service.generate(user)?, service.generate(user)?];
        let unrelated = service.generate(other)?;

        assert_eq!(service.revoke_all(user)?, 2);
        for token in &tokens {
            assert!(matches!(service.validate(token), Err(TokenError::Revoked)));
        }
        assert_eq!(service.validate(&unrelated)?, other);

        assert_eq!(service.revoke_all(user)?, 0);
        assert!(matches!(
            service.revoke_all(UserId::new(0)),
            Err(TokenError::InvalidIdentity)
        ));

        Ok(())
    }

    #[test]
    fn remaining_ttl_reports_expiry() -> anyhow::Result<()> {
        let service = service()?;

        let token = service.generate_with_ttl(UserId::new(8), SignedDuration::from_hours(1))?;
        let remaining = service.remaining_ttl(&token)?;
        assert!(remaining <= SignedDuration::from_hours(1));
        assert!(remaining > SignedDuration::from_mins(59));

        let short = service.generate_with_ttl(UserId::new(8), SignedDuration::from_millis(1))?;
        thread::sleep(Duration::from_millis(1100));
        assert!(matches!(
            service.remaining_ttl(&short),
            Err(TokenError::Expired)
        ));
        assert!(matches!(service.validate(&short), Err(TokenError::Expired)));

        Ok(())
    }

    #[test]
    fn remaining_ttl_requires_expiry() -> anyhow::Result<()> {
        let service = service()?;
        let now = Timestamp::now();
        let claims = TokenClaims {
            expires_at: None,
            ..TokenClaims::new(UserId::new(9), TokenService::generate_jti(), "warden", now, now)
        };
        let token = encode(
            &Header::new(ALGORITHM),
            &claims,
            &EncodingKey::from_secret(b"test-signing-secret"),
        )?;

        assert_eq!(service.validate(&token)?, UserId::new(9));
        assert!(matches!(
            service.remaining_ttl(&token),
            Err(TokenError::NoExpiry)
        ));

        // Revocations of tokens without expiry are never purged.
        service.revoke(&token)?;
        assert_eq!(service.cleanup_expired(), 0);
        assert!(service.is_revoked(&token));

        Ok(())
    }

    #[test]
    fn cleanup_purges_expired_revocations() -> anyhow::Result<()> {
        let service = service()?;
        let user = UserId::new(10);

        let short = service.generate_with_ttl(user, SignedDuration::from_millis(1))?;
        let long = service.generate(user)?;
        service.revoke(&short)?;
        service.revoke(&long)?;
        service.revoke("garbage")?;

        thread::sleep(Duration::from_millis(1100));
        assert_eq!(service.cleanup_expired(), 2);
        assert!(!service.is_revoked(&short));
        assert!(!service.is_revoked("garbage"));
        assert!(service.is_revoked(&long));

        Ok(())
    }

    #[test]
    fn usable_through_issuer_trait() -> anyhow::Result<()> {
        let issuer: Arc<dyn TokenIssuer> = Arc::new(service()?);
        let user = UserId::new(11);

        let token = issuer.issue(user)?;
        assert_eq!(issuer.validate(&token)?, user);

        issuer.revoke(&token)?;
        let error = issuer.validate(&token).err().map(|e| e.kind());
        assert_eq!(error, Some(warden_core::ErrorKind::Unauthorized));

        Ok(())
    }
}
