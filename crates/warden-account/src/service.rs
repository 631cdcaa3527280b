//! Account flows over the password and token engines.

use std::fmt;
use std::sync::Arc;

use jiff::Timestamp;
use warden_core::{TokenIssuer, UserId};
use warden_password::{PasswordError, PasswordHasher, PasswordManager};

use crate::config::AccountConfig;
use crate::error::{AccountError, Result};
use crate::reset::{MemoryResetCodeStore, ResetCode, ResetCodeStore};
use crate::user::{NewUser, UserRecord, UserStatus, UserStore};
use crate::{TRACING_TARGET_RESET, TRACING_TARGET_SERVICE};

/// A password supplied at registration.
///
/// The caller states whether the value is plaintext or an already encoded
/// hash; nothing is inferred from its shape.
#[derive(Clone, Copy)]
pub enum PasswordInput<'a> {
    /// Plaintext, hashed before storage.
    Plain(&'a str),
    /// An encoded hash produced by [`PasswordHasher`], stored as is.
    Hashed(&'a str),
}

impl fmt::Debug for PasswordInput<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(_) => f.write_str("Plain([REDACTED])"),
            Self::Hashed(_) => f.write_str("Hashed([REDACTED])"),
        }
    }
}

fn require_field(value: &str, field: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        Err(AccountError::EmptyField(field))
    } else {
        Ok(())
    }
}

/// Registration, login, session and password flows.
///
/// Cheap to clone; clones share the same stores and engines.
#[derive(Clone)]
pub struct AccountService {
    config: Arc<AccountConfig>,
    users: Arc<dyn UserStore>,
    passwords: PasswordManager,
    tokens: Arc<dyn TokenIssuer>,
    reset_codes: Arc<dyn ResetCodeStore>,
}

impl fmt::Debug for AccountService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountService")
            .field("config", &self.config)
            .field("passwords", &self.passwords)
            .finish_non_exhaustive()
    }
}

impl AccountService {
    /// Creates the service with an in-memory reset-code store.
    pub fn new(
        config: AccountConfig,
        users: Arc<dyn UserStore>,
        passwords: PasswordManager,
        tokens: Arc<dyn TokenIssuer>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            users,
            passwords,
            tokens,
            reset_codes: Arc::new(MemoryResetCodeStore::new()),
        }
    }

    /// Replaces the reset-code store.
    pub fn with_reset_codes(mut self, reset_codes: Arc<dyn ResetCodeStore>) -> Self {
        self.reset_codes = reset_codes;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &AccountConfig {
        &self.config
    }

    /// Registers an active account and issues its first token.
    ///
    /// A non-empty invitation code must be valid. The password hash is
    /// recorded as the first history entry and the registration counts as
    /// the first login.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::UsernameTaken`] or [`AccountError::EmailTaken`]
    /// on a uniqueness violation and [`AccountError::InvalidInvitationCode`]
    /// for a malformed code.
    pub fn register(
        &self,
        username: &str,
        email: &str,
        password: PasswordInput<'_>,
        invitation_code: &str,
    ) -> Result<(UserRecord, String)> {
        require_field(username, "username")?;
        require_field(email, "email")?;

        if !self.is_username_available(username)? {
            return Err(AccountError::UsernameTaken);
        }
        if !self.is_email_available(email)? {
            return Err(AccountError::EmailTaken);
        }
        if !invitation_code.is_empty() && !self.validate_invitation_code(invitation_code) {
            return Err(AccountError::InvalidInvitationCode);
        }

        let password_hash = match password {
            PasswordInput::Plain(plain) => self.passwords.hash_password(plain)?,
            PasswordInput::Hashed(encoded) if PasswordHasher::is_well_formed(encoded) => {
                encoded.to_owned()
            }
            PasswordInput::Hashed(_) => return Err(PasswordError::InvalidHashFormat.into()),
        };

        let user = self.users.create(NewUser {
            username: username.to_owned(),
            email: email.to_owned(),
            password_hash,
            status: UserStatus::Active,
            invitation_code: (!invitation_code.is_empty()).then(|| invitation_code.to_owned()),
            ..Default::default()
        })?;

        self.passwords.add_to_history(user.id, &user.password_hash)?;
        let token = self.tokens.issue(user.id)?;
        let user = self.record_login(user);

        tracing::info!(
            target: TRACING_TARGET_SERVICE,
            user_id = %user.id,
            username = %user.username,
            invited = user.invitation_code.is_some(),
            "user registered"
        );

        Ok((user, token))
    }

    /// Returns `true` if no account uses the username.
    pub fn is_username_available(&self, username: &str) -> Result<bool> {
        Ok(self.users.find_by_username(username)?.is_none())
    }

    /// Returns `true` if no account uses the email.
    pub fn is_email_available(&self, email: &str) -> Result<bool> {
        Ok(self.users.find_by_email(email)?.is_none())
    }

    /// Returns `true` if the invitation code is well formed.
    #[must_use]
    pub fn validate_invitation_code(&self, code: &str) -> bool {
        code.len() == self.config.invitation_code_len
    }

    /// Verifies credentials and issues a token.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::InvalidCredentials`] for an unknown username or
    /// a wrong password, and [`AccountError::AccountDisabled`] when the
    /// credentials are right but the account is disabled.
    pub fn login(&self, username: &str, password: &str) -> Result<(UserRecord, String)> {
        tracing::trace!(
            target: TRACING_TARGET_SERVICE,
            username = %username,
            "login attempt"
        );

        let user = self.users.find_by_username(username)?;
        let password_valid = match &user {
            Some(user) => self.passwords.verify_password(password, &user.password_hash),
            None => self.passwords.hasher().verify_dummy_password(password),
        };

        let user = match user {
            Some(user) if password_valid => user,
            user => {
                tracing::warn!(
                    target: TRACING_TARGET_SERVICE,
                    username = %username,
                    account_exists = user.is_some(),
                    "login failed"
                );
                return Err(AccountError::InvalidCredentials);
            }
        };

        if user.status == UserStatus::Disabled {
            tracing::warn!(
                target: TRACING_TARGET_SERVICE,
                user_id = %user.id,
                "login refused: account disabled"
            );
            return Err(AccountError::AccountDisabled);
        }

        let token = self.tokens.issue(user.id)?;
        let user = self.record_login(user);

        tracing::info!(target: TRACING_TARGET_SERVICE, user_id = %user.id, "login successful");
        Ok((user, token))
    }

    /// Stamps `last_login_at`. A failed write is logged and does not fail the
    /// login.
    fn record_login(&self, mut user: UserRecord) -> UserRecord {
        user.last_login_at = Some(Timestamp::now());

        match self.users.update(user.clone()) {
            Ok(updated) => updated,
            Err(e) => {
                tracing::error!(
                    target: TRACING_TARGET_SERVICE,
                    user_id = %user.id,
                    error = %e,
                    "failed to record successful login"
                );
                user
            }
        }
    }

    /// Resolves a token to its live, active account.
    pub fn authenticate(&self, token: &str) -> Result<UserRecord> {
        let user_id = self.tokens.validate(token)?;
        let user = self.load_user(user_id)?;

        if user.status == UserStatus::Disabled {
            return Err(AccountError::AccountDisabled);
        }

        Ok(user)
    }

    /// Exchanges a token for a fresh one.
    pub fn refresh(&self, token: &str) -> Result<String> {
        Ok(self.tokens.refresh(token)?)
    }

    /// Revokes a token.
    pub fn logout(&self, token: &str) -> Result<()> {
        self.tokens.revoke(token)?;
        tracing::debug!(target: TRACING_TARGET_SERVICE, "user logged out");
        Ok(())
    }

    fn load_user(&self, user_id: UserId) -> Result<UserRecord> {
        self.users
            .find_by_id(user_id)?
            .ok_or(AccountError::UserNotFound(user_id))
    }

    fn check_policy(&self, password: &str) -> Result<()> {
        let result = self.passwords.validate_with_default_policy(password);
        if result.valid {
            Ok(())
        } else {
            Err(AccountError::PolicyViolation {
                violations: result.violations,
            })
        }
    }

    /// Stores a new password for the user and ends all of their sessions.
    ///
    /// The hash enters the history only once the user record holds it.
    fn set_password(&self, mut user: UserRecord, new_password: &str) -> Result<()> {
        user.password_hash = self.passwords.prepare_password(user.id, new_password)?;
        let user = self.users.update(user)?;

        if let Err(e) = self.passwords.commit_password(user.id, &user.password_hash) {
            tracing::error!(
                target: TRACING_TARGET_SERVICE,
                user_id = %user.id,
                error = %e,
                "failed to record password history"
            );
        }

        self.tokens.revoke_all(user.id)?;
        Ok(())
    }

    /// Changes the password after verifying the current one.
    ///
    /// The new password must satisfy the default policy and strength minimum
    /// and must not be in the retained history. Every token of the identity
    /// is revoked afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::WrongPassword`] if `old_password` does not
    /// verify and [`AccountError::PolicyViolation`] with the itemized
    /// violations if the new password is rejected by policy.
    pub fn change_password(
        &self,
        user_id: UserId,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let user = self.load_user(user_id)?;

        if !self.passwords.verify_password(old_password, &user.password_hash) {
            tracing::warn!(
                target: TRACING_TARGET_SERVICE,
                user_id = %user_id,
                "password change refused: wrong current password"
            );
            return Err(AccountError::WrongPassword);
        }

        self.check_policy(new_password)?;
        self.set_password(user, new_password)?;

        tracing::info!(target: TRACING_TARGET_SERVICE, user_id = %user_id, "password changed");
        Ok(())
    }

    /// Issues a reset code for the account with this email.
    ///
    /// The returned plaintext code is meant for out-of-band delivery; only
    /// its digest is stored. Any earlier code for the same account stops
    /// working.
    pub fn request_password_reset(&self, email: &str) -> Result<String> {
        require_field(email, "email")?;
        let user = self
            .users
            .find_by_email(email)?
            .ok_or(AccountError::EmailNotFound)?;

        let expires_at = Timestamp::now()
            .checked_add(self.config.reset_code_ttl)
            .map_err(AccountError::storage)?;

        let code = ResetCode::generate();
        self.reset_codes.insert(ResetCode::digest(&code), ResetCode {
            user_id: user.id,
            expires_at,
        })?;

        tracing::info!(
            target: TRACING_TARGET_RESET,
            user_id = %user.id,
            expires_at = %expires_at,
            "password reset requested"
        );

        Ok(code)
    }

    /// Redeems a reset code and sets a new password.
    ///
    /// The new password is checked against policy and strength before the
    /// code is consumed. Once consumed, the code cannot be used again even if
    /// a later step fails. Every token of the identity is revoked afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::InvalidResetCode`] for an unknown, used or
    /// expired code.
    pub fn confirm_password_reset(&self, code: &str, new_password: &str) -> Result<()> {
        require_field(code, "reset code")?;
        self.check_policy(new_password)?;

        let strength = self.passwords.check_strength(new_password);
        if strength.score < self.passwords.config().min_strength_score {
            return Err(PasswordError::TooWeak {
                score: strength.score,
                feedback: strength.feedback,
            }
            .into());
        }

        let pending = self
            .reset_codes
            .take(&ResetCode::digest(code))?
            .ok_or(AccountError::InvalidResetCode)?;
        if pending.is_expired_at(Timestamp::now()) {
            tracing::debug!(
                target: TRACING_TARGET_RESET,
                user_id = %pending.user_id,
                "expired reset code presented"
            );
            return Err(AccountError::InvalidResetCode);
        }

        let user = self.load_user(pending.user_id)?;
        self.set_password(user, new_password)?;

        tracing::info!(
            target: TRACING_TARGET_RESET,
            user_id = %pending.user_id,
            "password reset completed"
        );

        Ok(())
    }

    /// Drops expired reset codes and returns how many were dropped.
    pub fn purge_expired_reset_codes(&self) -> Result<usize> {
        self.reset_codes.purge_expired(Timestamp::now())
    }
}
