//! Per-identity password history used to prevent reuse.

use std::collections::HashMap;
use std::sync::Arc;

use jiff::Timestamp;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use warden_core::UserId;

use crate::TRACING_TARGET_HISTORY;
use crate::error::{PasswordError, Result};
use crate::hasher::PasswordHasher;

/// A previously used password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordHistoryEntry {
    /// Identity the hash belonged to.
    pub user_id: UserId,
    /// Encoded hash as produced by [`PasswordHasher`].
    pub password_hash: String,
    /// When the entry was recorded.
    pub created_at: Timestamp,
}

/// Storage backing a [`PasswordHistoryManager`].
pub trait HistoryStore: Send + Sync {
    /// Appends a hash to the identity's history.
    fn add(&self, identity: UserId, password_hash: &str) -> Result<()>;

    /// Returns up to `limit` entries, most recent first. A limit of zero
    /// returns the whole history.
    fn history(&self, identity: UserId, limit: usize) -> Result<Vec<PasswordHistoryEntry>>;

    /// Keeps only the `keep` most recent entries.
    fn cleanup(&self, identity: UserId, keep: usize) -> Result<()>;
}

/// In-memory [`HistoryStore`].
///
/// Entries are kept oldest first per identity.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    entries: RwLock<HashMap<UserId, Vec<PasswordHistoryEntry>>>,
}

impl MemoryHistoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn add(&self, identity: UserId, password_hash: &str) -> Result<()> {
        if !identity.is_valid() {
            return Err(PasswordError::InvalidIdentity);
        }
        if password_hash.is_empty() {
            return Err(PasswordError::InvalidHash);
        }

        let entry = PasswordHistoryEntry {
            user_id: identity,
            password_hash: password_hash.to_owned(),
            created_at: Timestamp::now(),
        };
        self.entries.write().entry(identity).or_default().push(entry);

        Ok(())
    }

    fn history(&self, identity: UserId, limit: usize) -> Result<Vec<PasswordHistoryEntry>> {
        if !identity.is_valid() {
            return Err(PasswordError::InvalidIdentity);
        }

        let entries = self.entries.read();
        let Some(history) = entries.get(&identity) else {
            return Ok(Vec::new());
        };

        let limit = if limit == 0 { history.len() } else { limit };
        Ok(history.iter().rev().take(limit).cloned().collect())
    }

    fn cleanup(&self, identity: UserId, keep: usize) -> Result<()> {
        if !identity.is_valid() {
            return Err(PasswordError::InvalidIdentity);
        }

        let mut entries = self.entries.write();
        if let Some(history) = entries.get_mut(&identity)
            && history.len() > keep
        {
            let excess = history.len() - keep;
            history.drain(..excess);
        }

        Ok(())
    }
}

/// Records password hashes per identity and detects reuse.
#[derive(Clone)]
pub struct PasswordHistoryManager {
    store: Arc<dyn HistoryStore>,
    hasher: PasswordHasher,
}

impl std::fmt::Debug for PasswordHistoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHistoryManager")
            .field("hasher", &self.hasher)
            .finish_non_exhaustive()
    }
}

impl PasswordHistoryManager {
    /// Creates a manager over the given store, verifying with `hasher`.
    pub fn new(store: Arc<dyn HistoryStore>, hasher: PasswordHasher) -> Self {
        Self { store, hasher }
    }

    /// Appends a hash to the identity's history.
    ///
    /// # Errors
    ///
    /// Returns [`PasswordError::InvalidIdentity`] for the zero identity and
    /// [`PasswordError::InvalidHash`] for an empty hash.
    pub fn add_to_history(&self, identity: UserId, password_hash: &str) -> Result<()> {
        if !identity.is_valid() {
            return Err(PasswordError::InvalidIdentity);
        }
        if password_hash.is_empty() {
            return Err(PasswordError::InvalidHash);
        }

        self.store.add(identity, password_hash)?;
        tracing::debug!(
            target: TRACING_TARGET_HISTORY,
            user_id = %identity,
            "password added to history"
        );

        Ok(())
    }

    /// Returns `true` if the password matches any stored hash for the identity.
    ///
    /// # Errors
    ///
    /// Returns [`PasswordError::EmptyInput`] for an empty password.
    pub fn check_history(&self, identity: UserId, password: &str) -> Result<bool> {
        if password.is_empty() {
            return Err(PasswordError::EmptyInput);
        }

        let history = self.store.history(identity, 0)?;
        let reused = history
            .iter()
            .any(|entry| self.hasher.verify_password(password, &entry.password_hash));

        if reused {
            tracing::debug!(
                target: TRACING_TARGET_HISTORY,
                user_id = %identity,
                "password found in history"
            );
        }

        Ok(reused)
    }

    /// Keeps only the `keep` most recent entries for the identity.
    pub fn cleanup(&self, identity: UserId, keep: usize) -> Result<()> {
        self.store.cleanup(identity, keep)
    }

    /// Returns up to `limit` entries, most recent first (zero for all).
    pub fn history(&self, identity: UserId, limit: usize) -> Result<Vec<PasswordHistoryEntry>> {
        self.store.history(identity, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::HasherConfig;

    fn manager() -> PasswordHistoryManager {
        let hasher = PasswordHasher::new(HasherConfig {
            memory_kib: 1024,
            iterations: 1,
            ..HasherConfig::default()
        });
        PasswordHistoryManager::new(Arc::new(MemoryHistoryStore::new()), hasher)
    }

    #[test]
    fn history_prevents_reuse() -> anyhow::Result<()> {
        let manager = manager();
        let user = UserId::new(1);
        let hash = manager.hasher.hash_password("Secret123!")?;

        manager.add_to_history(user, &hash)?;
        assert!(manager.check_history(user, "Secret123!")?);
        assert!(!manager.check_history(user, "Different1!")?);
        assert!(!manager.check_history(UserId::new(2), "Secret123!")?);

        manager.cleanup(user, 0)?;
        assert!(!manager.check_history(user, "Secret123!")?);

        Ok(())
    }

    #[test]
    fn rejects_invalid_input() {
        let manager = manager();

        assert!(matches!(
            manager.add_to_history(UserId::new(0), "hash"),
            Err(PasswordError::InvalidIdentity)
        ));
        assert!(matches!(
            manager.add_to_history(UserId::new(1), ""),
            Err(PasswordError::InvalidHash)
        ));
        assert!(matches!(
            manager.check_history(UserId::new(1), ""),
            Err(PasswordError::EmptyInput)
        ));
    }

    #[test]
    fn cleanup_keeps_most_recent() -> anyhow::Result<()> {
        let store = MemoryHistoryStore::new();
        let user = UserId::new(3);

        for hash in ["h1", "h2", "h3", "h4"] {
            store.add(user, hash)?;
        }

        store.cleanup(user, 2)?;
        let hashes: Vec<_> = store
            .history(user, 0)?
            .into_iter()
            .map(|entry| entry.password_hash)
            .collect();
        assert_eq!(hashes, ["h4", "h3"]);

        // Already within bound.
        store.cleanup(user, 5)?;
        assert_eq!(store.history(user, 0)?.len(), 2);

        Ok(())
    }

    #[test]
    fn history_is_newest_first_and_limited() -> anyhow::Result<()> {
        let store = MemoryHistoryStore::new();
        let user = UserId::new(4);

        for hash in ["h1", "h2", "h3"] {
            store.add(user, hash)?;
        }

        let latest = store.history(user, 1)?;
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].password_hash, "h3");
        assert!(store.history(UserId::new(99), 0)?.is_empty());

        Ok(())
    }
}
