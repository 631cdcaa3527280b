//! Account flow error types.

use warden_core::{BoxedError, Error, ErrorKind, UserId};
use warden_password::PasswordError;

/// Result type alias for account operations.
pub type Result<T, E = AccountError> = std::result::Result<T, E>;

/// Failures reported by the account flows and user stores.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// A required field was empty.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// Unknown username or wrong password. Deliberately indistinguishable.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The account exists but is disabled.
    #[error("account is disabled")]
    AccountDisabled,

    /// The current password supplied to a password change is wrong.
    #[error("current password is incorrect")]
    WrongPassword,

    /// The username belongs to another account.
    #[error("username exists")]
    UsernameTaken,

    /// The email belongs to another account.
    #[error("email exists")]
    EmailTaken,

    /// The invitation code is malformed or unknown.
    #[error("invalid invitation code")]
    InvalidInvitationCode,

    /// No live account has this identity.
    #[error("user {0} not found")]
    UserNotFound(UserId),

    /// No live account has this email.
    #[error("email not found")]
    EmailNotFound,

    /// The reset code is unknown, already used or expired.
    #[error("reset code is invalid or expired")]
    InvalidResetCode,

    /// The new password violates the password policy.
    #[error("password violates policy: {}", violations.join("; "))]
    PolicyViolation {
        /// Itemized violations.
        violations: Vec<String>,
    },

    /// A password engine failure.
    #[error(transparent)]
    Password(#[from] PasswordError),

    /// A token issuer failure.
    #[error(transparent)]
    Token(Error),

    /// The backing store failed.
    #[error("account store failed")]
    Storage(#[source] BoxedError),
}

impl AccountError {
    /// Wraps a store failure.
    pub fn storage(source: impl Into<BoxedError>) -> Self {
        Self::Storage(source.into())
    }

    /// Returns the caller-facing error category.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyField(_) | Self::InvalidInvitationCode => ErrorKind::InvalidInput,
            Self::InvalidCredentials
            | Self::AccountDisabled
            | Self::WrongPassword
            | Self::InvalidResetCode => ErrorKind::Unauthorized,
            Self::UsernameTaken | Self::EmailTaken => ErrorKind::Conflict,
            Self::UserNotFound(_) | Self::EmailNotFound => ErrorKind::NotFound,
            Self::PolicyViolation { .. } => ErrorKind::PolicyViolation,
            Self::Password(error) => error.kind(),
            Self::Token(error) => error.kind(),
            Self::Storage(_) => ErrorKind::Internal,
        }
    }
}

impl From<Error> for AccountError {
    fn from(error: Error) -> Self {
        Self::Token(error)
    }
}

impl From<AccountError> for Error {
    fn from(error: AccountError) -> Self {
        match error {
            AccountError::Password(error) => error.into(),
            AccountError::Token(error) => error,
            AccountError::PolicyViolation { violations } => {
                Error::policy_violation("password violates policy").with_violations(violations)
            }
            AccountError::Storage(source) => {
                Error::internal("account store", "operation failed").with_boxed_source(source)
            }
            other => Error::new(other.kind(), other.to_string()).with_source(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_failures_share_wording() {
        let error: Error = AccountError::InvalidCredentials.into();
        assert_eq!(error.kind(), ErrorKind::Unauthorized);
        assert_eq!(error.message(), "invalid username or password");

        let error: Error = AccountError::AccountDisabled.into();
        assert_eq!(error.kind(), ErrorKind::Unauthorized);
        assert_eq!(error.message(), "account is disabled");
    }

    #[test]
    fn conflicts_use_short_messages() {
        assert_eq!(AccountError::UsernameTaken.to_string(), "username exists");
        assert_eq!(AccountError::EmailTaken.to_string(), "email exists");
        assert_eq!(AccountError::EmailTaken.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn policy_violations_are_carried() {
        let error: Error = AccountError::PolicyViolation {
            violations: vec!["too short".to_owned()],
        }
        .into();

        assert_eq!(error.kind(), ErrorKind::PolicyViolation);
        assert_eq!(error.violations(), ["too short".to_owned()]);
    }

    #[test]
    fn wrapped_errors_keep_their_kind() {
        let error = AccountError::from(PasswordError::InHistory);
        assert_eq!(error.kind(), ErrorKind::PolicyViolation);

        let error = AccountError::from(Error::unauthorized("token has been revoked"));
        assert_eq!(error.kind(), ErrorKind::Unauthorized);
    }
}
