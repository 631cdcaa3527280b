//! Password engine error types.

use warden_core::{Error, ErrorKind};

/// Result type alias for password operations.
pub type Result<T, E = PasswordError> = std::result::Result<T, E>;

/// Failures reported by the password engines.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// The password to hash or check was empty.
    #[error("password must not be empty")]
    EmptyInput,

    /// The encoded hash is not `base64(salt)$base64(hash)`.
    #[error("invalid password hash format")]
    InvalidHashFormat,

    /// The key-derivation function rejected its parameters or input.
    #[error("password hashing failed: {0}")]
    Hashing(#[from] argon2::Error),

    /// Generator options resolve to an unusable configuration.
    #[error("invalid generator options: {0}")]
    InvalidOptions(&'static str),

    /// The zero identity was supplied.
    #[error("invalid user identity")]
    InvalidIdentity,

    /// An empty hash was supplied to the history.
    #[error("password hash must not be empty")]
    InvalidHash,

    /// The password scored below the configured minimum strength.
    #[error("password is too weak (score {score})")]
    TooWeak {
        /// Score the password achieved.
        score: u8,
        /// Suggestions returned by the strength checker.
        feedback: Vec<String>,
    },

    /// The password violates one or more policy predicates.
    #[error("password violates policy: {}", violations.join("; "))]
    PolicyViolation {
        /// Itemized violations.
        violations: Vec<String>,
    },

    /// The password matches one of the identity's recent passwords.
    #[error("password was used recently")]
    InHistory,

    /// The history store failed.
    #[error("password history store failed: {0}")]
    Storage(String),
}

impl PasswordError {
    /// Returns the caller-facing error category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyInput
            | Self::InvalidHashFormat
            | Self::InvalidOptions(_)
            | Self::InvalidIdentity
            | Self::InvalidHash => ErrorKind::InvalidInput,
            Self::TooWeak { .. } | Self::PolicyViolation { .. } | Self::InHistory => {
                ErrorKind::PolicyViolation
            }
            Self::Hashing(_) | Self::Storage(_) => ErrorKind::Internal,
        }
    }
}

impl From<PasswordError> for Error {
    fn from(error: PasswordError) -> Self {
        let message = error.to_string();
        match error {
            PasswordError::TooWeak { feedback, .. } => {
                Error::policy_violation(message).with_violations(feedback)
            }
            PasswordError::PolicyViolation { violations } => {
                Error::policy_violation("password violates policy").with_violations(violations)
            }
            PasswordError::Hashing(_) | PasswordError::Storage(_) => {
                Error::internal("password", message).with_source(error)
            }
            other => Error::new(other.kind(), message),
        }
    }
}
