//! Single-use password-reset codes.

use std::collections::HashMap;

use jiff::Timestamp;
use parking_lot::RwLock;
use rand::RngCore;
use sha2::{Digest, Sha256};
use warden_core::UserId;

use crate::TRACING_TARGET_RESET;
use crate::error::Result;

/// Number of random bytes in a reset code (256 bits).
const RESET_CODE_BYTES: usize = 32;

/// A pending reset, keyed in the store by the digest of its code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetCode {
    /// Identity whose password may be reset.
    pub user_id: UserId,
    /// Instant after which the code is no longer accepted.
    pub expires_at: Timestamp,
}

impl ResetCode {
    /// Generates a fresh hex-encoded reset code.
    pub(crate) fn generate() -> String {
        let mut bytes = [0_u8; RESET_CODE_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Returns the storage key for a code.
    pub(crate) fn digest(code: &str) -> String {
        hex::encode(Sha256::digest(code.as_bytes()))
    }

    /// Returns `true` if the code is past its expiry at `now`.
    #[inline]
    #[must_use]
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }
}

/// Storage for pending reset codes.
///
/// Codes are keyed by their SHA-256 digest so a leaked store does not leak
/// redeemable codes.
pub trait ResetCodeStore: Send + Sync {
    /// Stores a code for the identity, replacing any earlier one it had.
    fn insert(&self, digest: String, code: ResetCode) -> Result<()>;

    /// Removes and returns the code with this digest.
    ///
    /// Removal and lookup are one step, so a code is redeemable once.
    fn take(&self, digest: &str) -> Result<Option<ResetCode>>;

    /// Drops every code expired at `now` and returns how many were dropped.
    fn purge_expired(&self, now: Timestamp) -> Result<usize>;
}

/// In-memory [`ResetCodeStore`].
#[derive(Debug, Default)]
pub struct MemoryResetCodeStore {
    codes: RwLock<HashMap<String, ResetCode>>,
}

impl MemoryResetCodeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of pending codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.read().len()
    }

    /// Returns `true` if no codes are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.read().is_empty()
    }
}

impl ResetCodeStore for MemoryResetCodeStore {
    fn insert(&self, digest: String, code: ResetCode) -> Result<()> {
        let mut codes = self.codes.write();
        codes.retain(|_, pending| pending.user_id != code.user_id);
        codes.insert(digest, code);
        Ok(())
    }

    fn take(&self, digest: &str) -> Result<Option<ResetCode>> {
        Ok(self.codes.write().remove(digest))
    }

    fn purge_expired(&self, now: Timestamp) -> Result<usize> {
        let mut codes = self.codes.write();
        let before = codes.len();
        codes.retain(|_, pending| !pending.is_expired_at(now));
        let purged = before - codes.len();

        tracing::debug!(
            target: TRACING_TARGET_RESET,
            purged,
            remaining = codes.len(),
            "expired reset codes purged"
        );

        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;

    use super::*;

    #[test]
    fn codes_are_256_bit_hex() {
        let code = ResetCode::generate();
        assert_eq!(code.len(), 64);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(code, ResetCode::generate());

        let digest = ResetCode::digest(&code);
        assert_eq!(digest.len(), 64);
        assert_ne!(digest, code);
        assert_eq!(digest, ResetCode::digest(&code));
    }

    #[test]
    fn take_consumes_once() -> anyhow::Result<()> {
        let store = MemoryResetCodeStore::new();
        let code = ResetCode {
            user_id: UserId::new(1),
            expires_at: Timestamp::now() + SignedDuration::from_mins(15),
        };

        store.insert("d1".to_owned(), code)?;
        assert_eq!(store.take("d1")?, Some(code));
        assert_eq!(store.take("d1")?, None);

        Ok(())
    }

    #[test]
    fn newer_code_replaces_older() -> anyhow::Result<()> {
        let store = MemoryResetCodeStore::new();
        let expires_at = Timestamp::now() + SignedDuration::from_mins(15);
        let user = UserId::new(1);
        let other = UserId::new(2);

        store.insert("d1".to_owned(), ResetCode { user_id: user, expires_at })?;
        store.insert("d2".to_owned(), ResetCode { user_id: other, expires_at })?;
        store.insert("d3".to_owned(), ResetCode { user_id: user, expires_at })?;

        assert_eq!(store.len(), 2);
        assert_eq!(store.take("d1")?, None);
        assert!(store.take("d3")?.is_some());

        Ok(())
    }

    #[test]
    fn purge_drops_expired() -> anyhow::Result<()> {
        let store = MemoryResetCodeStore::new();
        let now = Timestamp::now();

        store.insert("old".to_owned(), ResetCode {
            user_id: UserId::new(1),
            expires_at: now - SignedDuration::from_secs(1),
        })?;
        store.insert("new".to_owned(), ResetCode {
            user_id: UserId::new(2),
            expires_at: now + SignedDuration::from_mins(15),
        })?;

        assert_eq!(store.purge_expired(now)?, 1);
        assert_eq!(store.len(), 1);
        assert!(!store.is_empty());

        Ok(())
    }
}
