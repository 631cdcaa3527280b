//! Token engine error types.

use warden_core::{Error, ErrorKind};

/// Result type alias for token operations.
pub type Result<T, E = TokenError> = std::result::Result<T, E>;

/// Failures reported by the token engine.
///
/// Token failures stay distinguishable (revoked, expired, malformed) so that
/// callers can tell them apart when debugging.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// An empty token string was supplied.
    #[error("token must not be empty")]
    EmptyToken,

    /// The zero identity was supplied.
    #[error("invalid user identity")]
    InvalidIdentity,

    /// The requested lifetime is zero, negative or out of range.
    #[error("token lifetime must be positive")]
    InvalidTtl,

    /// The configuration failed validation.
    #[error("invalid token configuration: {0}")]
    InvalidConfig(String),

    /// The token has been revoked.
    #[error("token has been revoked")]
    Revoked,

    /// The token is past its expiry.
    #[error("token has expired")]
    Expired,

    /// The token is malformed, tampered with or signed by another key.
    #[error("failed to parse token: {0}")]
    Parse(#[source] jsonwebtoken::errors::Error),

    /// The token carries no expiry claim.
    #[error("token has no expiry")]
    NoExpiry,

    /// Refresh is disabled by configuration.
    #[error("token refresh is disabled")]
    RefreshDisabled,

    /// The token lineage has been refreshed the maximum number of times.
    #[error("token refresh limit of {max} reached")]
    RefreshLimitExceeded {
        /// Configured maximum number of refreshes.
        max: u32,
    },

    /// The token is not yet inside its refresh window.
    #[error("token cannot be refreshed yet")]
    TooEarly,

    /// Signing the token failed.
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

impl TokenError {
    /// Returns the caller-facing error category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyToken
            | Self::InvalidIdentity
            | Self::InvalidTtl
            | Self::InvalidConfig(_)
            | Self::TooEarly => ErrorKind::InvalidInput,
            Self::Revoked
            | Self::Expired
            | Self::Parse(_)
            | Self::NoExpiry
            | Self::RefreshDisabled => ErrorKind::Unauthorized,
            Self::RefreshLimitExceeded { .. } => ErrorKind::LimitExceeded,
            Self::Signing(_) => ErrorKind::Internal,
        }
    }

    /// Maps a decoding failure, singling out expiry.
    pub(crate) fn from_decode(error: jsonwebtoken::errors::Error) -> Self {
        match error.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Parse(error),
        }
    }
}

impl From<TokenError> for Error {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::Signing(_) => Error::internal("token", error.to_string()).with_source(error),
            other => Error::new(other.kind(), other.to_string()).with_source(other),
        }
    }
}
