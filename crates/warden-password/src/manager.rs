//! Facade over the password engines with a swappable configuration snapshot.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use warden_core::UserId;

use crate::TRACING_TARGET_MANAGER;
use crate::error::{PasswordError, Result};
use crate::generator::{GenerateOptions, PasswordGenerator};
use crate::hasher::{HasherConfig, PasswordHasher};
use crate::history::{HistoryStore, PasswordHistoryEntry, PasswordHistoryManager};
use crate::policy::{PasswordPolicy, PasswordPolicyValidator, PolicyResult};
use crate::strength::{PasswordStrengthChecker, PasswordStrengthResult};

/// Configuration consumed by [`PasswordManager`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordManagerConfig {
    /// Argon2id parameters. Only the cost is applied on [`PasswordManager::update_config`];
    /// existing hashes keep the parameters they were created with.
    pub hasher: HasherConfig,
    /// Minimum strength score accepted by [`PasswordManager::is_password_strong`].
    pub min_strength_score: u8,
    /// Penalize well-known passwords during strength checks.
    pub dictionary_check: bool,
    /// Length used by [`PasswordManager::generate_with_defaults`].
    pub default_length: usize,
    /// Policy used by [`PasswordManager::validate_with_default_policy`].
    pub default_policy: PasswordPolicy,
    /// Number of past hashes kept per identity.
    pub history_count: usize,
}

impl Default for PasswordManagerConfig {
    fn default() -> Self {
        Self {
            hasher: HasherConfig::default(),
            min_strength_score: 60,
            dictionary_check: true,
            default_length: 12,
            default_policy: PasswordPolicy::default(),
            history_count: 5,
        }
    }
}

struct ManagerInner {
    config: RwLock<Arc<PasswordManagerConfig>>,
    hasher: PasswordHasher,
    history: PasswordHistoryManager,
}

/// Single entry point for hashing, strength, generation, policy and history.
///
/// The configuration is an immutable snapshot; [`update_config`] replaces the
/// snapshot atomically so an in-flight call observes either the old or the new
/// configuration, never a mix.
///
/// [`update_config`]: PasswordManager::update_config
#[derive(Clone)]
pub struct PasswordManager {
    inner: Arc<ManagerInner>,
}

impl std::fmt::Debug for PasswordManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordManager")
            .field("config", &self.config())
            .finish_non_exhaustive()
    }
}

impl PasswordManager {
    /// Creates a manager backed by the given history store.
    pub fn new(config: PasswordManagerConfig, store: Arc<dyn HistoryStore>) -> Self {
        let hasher = PasswordHasher::new(config.hasher.clone());
        let history = PasswordHistoryManager::new(store, hasher.clone());

        let inner = ManagerInner {
            config: RwLock::new(Arc::new(config)),
            hasher,
            history,
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// Returns the current configuration snapshot.
    pub fn config(&self) -> Arc<PasswordManagerConfig> {
        self.inner.config.read().clone()
    }

    /// Replaces the configuration snapshot and applies the new hashing cost.
    pub fn update_config(&self, config: PasswordManagerConfig) {
        let applied = self.inner.hasher.set_cost(config.hasher.iterations);
        *self.inner.config.write() = Arc::new(config);

        tracing::info!(
            target: TRACING_TARGET_MANAGER,
            hashing_cost = applied,
            "password manager configuration updated"
        );
    }

    /// Returns the underlying hasher.
    pub fn hasher(&self) -> &PasswordHasher {
        &self.inner.hasher
    }

    /// Hashes a password.
    pub fn hash_password(&self, password: &str) -> Result<String> {
        self.inner.hasher.hash_password(password)
    }

    /// Verifies a password against an encoded hash.
    pub fn verify_password(&self, password: &str, encoded: &str) -> bool {
        self.inner.hasher.verify_password(password, encoded)
    }

    fn strength_checker(config: &PasswordManagerConfig) -> PasswordStrengthChecker {
        PasswordStrengthChecker::new(config.dictionary_check)
    }

    /// Evaluates password strength under the current configuration.
    pub fn check_strength(&self, password: &str) -> PasswordStrengthResult {
        Self::strength_checker(&self.config()).check(password)
    }

    /// Returns `true` if the password reaches the configured minimum score.
    pub fn is_password_strong(&self, password: &str) -> bool {
        let config = self.config();
        Self::strength_checker(&config).meets(password, config.min_strength_score)
    }

    /// Generates a password with explicit options.
    pub fn generate_password(&self, options: &GenerateOptions) -> Result<String> {
        PasswordGenerator::new().generate(options)
    }

    /// Generates a password of the default length using all four classes,
    /// excluding ambiguous characters.
    pub fn generate_with_defaults(&self) -> Result<String> {
        let options = GenerateOptions::new(self.config().default_length);
        self.generate_password(&options)
    }

    /// Validates a password against an explicit policy.
    pub fn validate_policy(&self, password: &str, policy: &PasswordPolicy) -> PolicyResult {
        PasswordPolicyValidator::new().validate(password, policy)
    }

    /// Validates a password against the configured default policy.
    pub fn validate_with_default_policy(&self, password: &str) -> PolicyResult {
        self.validate_policy(password, &self.config().default_policy)
    }

    /// Appends a hash to the identity's history.
    pub fn add_to_history(&self, identity: UserId, password_hash: &str) -> Result<()> {
        self.inner.history.add_to_history(identity, password_hash)
    }

    /// Returns `true` if the password matches a recent hash of the identity.
    pub fn check_history(&self, identity: UserId, password: &str) -> Result<bool> {
        self.inner.history.check_history(identity, password)
    }

    /// Keeps only the `keep` most recent history entries.
    pub fn cleanup_history(&self, identity: UserId, keep: usize) -> Result<()> {
        self.inner.history.cleanup(identity, keep)
    }

    /// Returns up to `limit` history entries, most recent first (zero for all).
    pub fn password_history(
        &self,
        identity: UserId,
        limit: usize,
    ) -> Result<Vec<PasswordHistoryEntry>> {
        self.inner.history.history(identity, limit)
    }

    /// Accepts a new password for the identity and returns its hash.
    ///
    /// Equivalent to [`prepare_password`] followed by [`commit_password`].
    ///
    /// # Errors
    ///
    /// Returns [`PasswordError::TooWeak`] or [`PasswordError::InHistory`] when
    /// the password is rejected.
    ///
    /// [`prepare_password`]: PasswordManager::prepare_password
    /// [`commit_password`]: PasswordManager::commit_password
    pub fn change_password(&self, identity: UserId, new_password: &str) -> Result<String> {
        let hash = self.prepare_password(identity, new_password)?;
        self.commit_password(identity, &hash)?;
        Ok(hash)
    }

    /// Checks a new password and hashes it without touching the history.
    ///
    /// The password must reach the minimum strength score and must not match
    /// any retained history entry. Callers persist the returned hash and then
    /// record it with [`commit_password`].
    ///
    /// # Errors
    ///
    /// Returns [`PasswordError::TooWeak`] or [`PasswordError::InHistory`] when
    /// the password is rejected.
    ///
    /// [`commit_password`]: PasswordManager::commit_password
    pub fn prepare_password(&self, identity: UserId, new_password: &str) -> Result<String> {
        let config = self.config();

        let strength = Self::strength_checker(&config).check(new_password);
        if strength.score < config.min_strength_score {
            return Err(PasswordError::TooWeak {
                score: strength.score,
                feedback: strength.feedback,
            });
        }

        if self.check_history(identity, new_password)? {
            return Err(PasswordError::InHistory);
        }

        self.hash_password(new_password)
    }

    /// Appends an accepted hash to the history and prunes it to the retention
    /// count. A failed prune is logged and does not fail the commit.
    pub fn commit_password(&self, identity: UserId, password_hash: &str) -> Result<()> {
        self.add_to_history(identity, password_hash)?;

        let keep = self.config().history_count;
        if let Err(e) = self.cleanup_history(identity, keep) {
            tracing::warn!(
                target: TRACING_TARGET_MANAGER,
                user_id = %identity,
                error = %e,
                "failed to prune password history"
            );
        }

        tracing::info!(
            target: TRACING_TARGET_MANAGER,
            user_id = %identity,
            "password changed"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryHistoryStore;

    fn manager() -> PasswordManager {
        let config = PasswordManagerConfig {
            hasher: HasherConfig {
                memory_kib: 1024,
                iterations: 1,
                ..HasherConfig::default()
            },
            history_count: 2,
            ..PasswordManagerConfig::default()
        };
        PasswordManager::new(config, Arc::new(MemoryHistoryStore::new()))
    }

    #[test]
    fn change_password_enforces_strength_and_history() -> anyhow::Result<()> {
        let manager = manager();
        let user = UserId::new(10);

        assert!(matches!(
            manager.change_password(user, "Test123"),
            Err(PasswordError::TooWeak { score: 30, .. })
        ));

        let hash = manager.change_password(user, "Zr9!mK2#vL8@")?;
        assert!(manager.verify_password("Zr9!mK2#vL8@", &hash));

        assert!(matches!(
            manager.change_password(user, "Zr9!mK2#vL8@"),
            Err(PasswordError::InHistory)
        ));

        Ok(())
    }

    #[test]
    fn change_password_prunes_history() -> anyhow::Result<()> {
        let manager = manager();
        let user = UserId::new(11);

        for password in ["Zr9!mK2#vL8@", "Hq4$tW7&nB3!", "Pm6^cX9*kD2?"] {
            manager.change_password(user, password)?;
        }

        let history = manager.password_history(user, 0)?;
        assert_eq!(history.len(), 2);
        assert!(manager.verify_password("Pm6^cX9*kD2?", &history[0].password_hash));

        // The oldest password aged out of the retained history.
        assert!(!manager.check_history(user, "Zr9!mK2#vL8@")?);

        Ok(())
    }

    #[test]
    fn update_config_swaps_snapshot() {
        let manager = manager();
        let before = manager.config();

        let mut config = (*before).clone();
        config.hasher.iterations = 3;
        config.min_strength_score = 95;
        config.dictionary_check = false;
        manager.update_config(config);

        assert_eq!(before.min_strength_score, 60);
        assert_eq!(manager.config().min_strength_score, 95);
        assert_eq!(manager.hasher().cost(), 3);
        assert!(!manager.is_password_strong("Zr9!mK2#vL8@"));
    }

    #[test]
    fn cost_change_keeps_credentials_and_history() -> anyhow::Result<()> {
        let manager = manager();
        let user = UserId::new(12);
        let hash = manager.change_password(user, "Zr9!mK2#vL8@")?;

        let mut config = (*manager.config()).clone();
        config.hasher.iterations = 2;
        manager.update_config(config);
        assert_eq!(manager.hasher().cost(), 2);

        assert!(manager.verify_password("Zr9!mK2#vL8@", &hash));
        assert!(manager.check_history(user, "Zr9!mK2#vL8@")?);
        assert!(matches!(
            manager.change_password(user, "Zr9!mK2#vL8@"),
            Err(PasswordError::InHistory)
        ));

        Ok(())
    }

    #[test]
    fn prepared_password_is_not_recorded_until_committed() -> anyhow::Result<()> {
        let manager = manager();
        let user = UserId::new(13);

        let hash = manager.prepare_password(user, "Zr9!mK2#vL8@")?;
        assert!(manager.password_history(user, 0)?.is_empty());
        assert!(!manager.check_history(user, "Zr9!mK2#vL8@")?);

        manager.commit_password(user, &hash)?;
        assert!(manager.check_history(user, "Zr9!mK2#vL8@")?);

        Ok(())
    }

    #[test]
    fn defaults_drive_generation_and_policy() -> anyhow::Result<()> {
        let manager = manager();

        let password = manager.generate_with_defaults()?;
        assert_eq!(password.chars().count(), 12);

        assert!(manager.validate_with_default_policy("Blue7Harbor").valid);
        assert!(!manager.validate_with_default_policy("admin").valid);

        Ok(())
    }
}
