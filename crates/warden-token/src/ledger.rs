//! Revocation and refresh bookkeeping.
//!
//! All maps live behind one reader/writer lock so the per-identity index and
//! the reverse index are always updated together. Callers never hold the lock
//! while signing or parsing.

use std::collections::{HashMap, HashSet};

use jiff::Timestamp;
use parking_lot::RwLock;
use warden_core::UserId;

use crate::TRACING_TARGET_LEDGER;
use crate::error::{Result, TokenError};

#[derive(Debug, Default)]
struct LedgerState {
    /// Token -> time of revocation.
    revoked: HashMap<String, Timestamp>,
    /// Identity -> live tokens.
    by_identity: HashMap<UserId, HashSet<String>>,
    /// Token -> owning identity.
    owners: HashMap<String, UserId>,
    /// Token -> number of refreshes in its lineage.
    refresh_counts: HashMap<String, u32>,
}

impl LedgerState {
    fn register(&mut self, token: &str, identity: UserId) {
        self.by_identity
            .entry(identity)
            .or_default()
            .insert(token.to_owned());
        self.owners.insert(token.to_owned(), identity);
    }

    fn revoke(&mut self, token: &str, now: Timestamp) -> bool {
        let newly_revoked = !self.revoked.contains_key(token);
        self.revoked.entry(token.to_owned()).or_insert(now);

        if let Some(identity) = self.owners.remove(token)
            && let Some(tokens) = self.by_identity.get_mut(&identity)
        {
            tokens.remove(token);
            if tokens.is_empty() {
                self.by_identity.remove(&identity);
            }
        }
        self.refresh_counts.remove(token);

        newly_revoked
    }
}

/// In-process revocation ledger owned by a token service instance.
#[derive(Debug, Default)]
pub(crate) struct TokenLedger {
    state: RwLock<LedgerState>,
}

impl TokenLedger {
    /// Indexes a freshly issued token under its identity.
    pub fn register(&self, token: &str, identity: UserId) {
        self.state.write().register(token, identity);
    }

    /// Returns `true` if the token has been revoked.
    pub fn is_revoked(&self, token: &str) -> bool {
        self.state.read().revoked.contains_key(token)
    }

    /// Returns the refresh count recorded for the token's lineage.
    pub fn refresh_count(&self, token: &str) -> u32 {
        self.state
            .read()
            .refresh_counts
            .get(token)
            .copied()
            .unwrap_or_default()
    }

    /// Returns the number of live tokens indexed for the identity.
    pub fn active_tokens(&self, identity: UserId) -> usize {
        self.state
            .read()
            .by_identity
            .get(&identity)
            .map_or(0, HashSet::len)
    }

    /// Returns the number of recorded revocations.
    pub fn revoked_len(&self) -> usize {
        self.state.read().revoked.len()
    }

    /// Revokes a token. Returns `false` if it was already revoked.
    pub fn revoke(&self, token: &str) -> bool {
        self.state.write().revoke(token, Timestamp::now())
    }

    /// Revokes every live token of the identity and returns how many there were.
    pub fn revoke_all(&self, identity: UserId) -> usize {
        let now = Timestamp::now();
        let mut state = self.state.write();

        let Some(tokens) = state.by_identity.remove(&identity) else {
            return 0;
        };

        for token in &tokens {
            state.revoked.entry(token.clone()).or_insert(now);
            state.owners.remove(token);
            state.refresh_counts.remove(token);
        }

        tokens.len()
    }

    /// Swaps `previous` for `next` as one atomic step.
    ///
    /// Registers `next` under `identity` with the incremented lineage count and
    /// revokes `previous`. Nothing is recorded when the previous token was
    /// revoked concurrently or its lineage is already at `max_refresh_count`.
    pub fn commit_refresh(
        &self,
        previous: &str,
        next: &str,
        identity: UserId,
        max_refresh_count: u32,
    ) -> Result<u32> {
        let mut state = self.state.write();

        if state.revoked.contains_key(previous) {
            return Err(TokenError::Revoked);
        }

        let count = state.refresh_counts.get(previous).copied().unwrap_or_default();
        if count >= max_refresh_count {
            return Err(TokenError::RefreshLimitExceeded {
                max: max_refresh_count,
            });
        }

        let next_count = count + 1;
        state.register(next, identity);
        state.refresh_counts.insert(next.to_owned(), next_count);
        state.revoke(previous, Timestamp::now());

        Ok(next_count)
    }

    /// Snapshot of all revoked tokens.
    pub fn revoked_tokens(&self) -> Vec<String> {
        self.state.read().revoked.keys().cloned().collect()
    }

    /// Drops the given revocation records.
    pub fn purge(&self, tokens: &[String]) -> usize {
        let mut state = self.state.write();
        let purged = tokens
            .iter()
            .filter(|token| state.revoked.remove(token.as_str()).is_some())
            .count();

        tracing::debug!(
            target: TRACING_TARGET_LEDGER,
            purged,
            remaining = state.revoked.len(),
            "revocation records purged"
        );

        purged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revoke_removes_from_indices() {
        let ledger = TokenLedger::default();
        let user = UserId::new(1);

        ledger.register("a", user);
        ledger.register("b", user);
        assert_eq!(ledger.active_tokens(user), 2);

        assert!(ledger.revoke("a"));
        assert!(!ledger.revoke("a"));
        assert!(ledger.is_revoked("a"));
        assert!(!ledger.is_revoked("b"));
        assert_eq!(ledger.active_tokens(user), 1);
    }

    #[test]
    fn revoke_all_clears_identity() {
        let ledger = TokenLedger::default();
        let user = UserId::new(2);
        let other = UserId::new(3);

        ledger.register("a", user);
        ledger.register("b", user);
        ledger.register("c", other);

        assert_eq!(ledger.revoke_all(user), 2);
        assert_eq!(ledger.revoke_all(user), 0);
        assert!(ledger.is_revoked("a"));
        assert!(ledger.is_revoked("b"));
        assert!(!ledger.is_revoked("c"));
        assert_eq!(ledger.active_tokens(user), 0);
        assert_eq!(ledger.active_tokens(other), 1);
    }

    #[test]
    fn commit_refresh_carries_count() -> anyhow::Result<()> {
        let ledger = TokenLedger::default();
        let user = UserId::new(4);
        ledger.register("t0", user);

        assert_eq!(ledger.commit_refresh("t0", "t1", user, 2)?, 1);
        assert_eq!(ledger.commit_refresh("t1", "t2", user, 2)?, 2);
        assert!(matches!(
            ledger.commit_refresh("t2", "t3", user, 2),
            Err(TokenError::RefreshLimitExceeded { max: 2 })
        ));

        // The rejected refresh left no trace of the new token.
        assert_eq!(ledger.active_tokens(user), 1);
        assert_eq!(ledger.refresh_count("t3"), 0);
        assert!(!ledger.is_revoked("t2"));

        assert!(matches!(
            ledger.commit_refresh("t0", "t4", user, 2),
            Err(TokenError::Revoked)
        ));

        Ok(())
    }

    #[test]
    fn purge_drops_revocations() {
        let ledger = TokenLedger::default();
        ledger.revoke("a");
        ledger.revoke("b");

        assert_eq!(ledger.purge(&["a".to_owned(), "zzz".to_owned()]), 1);
        assert_eq!(ledger.revoked_len(), 1);
        assert_eq!(ledger.revoked_tokens(), vec!["b".to_owned()]);
    }
}
