//! Shared error types and utilities.
//!
//! Every engine crate reports failures through its own error enum and converts
//! into the [`Error`] defined here when crossing a crate boundary. The
//! [`ErrorKind`] is the caller-facing category:
//!
//! - Strongly-typed error kinds for the categories callers branch on
//! - Builder pattern for ergonomic error construction
//! - Optional itemized violations for policy failures
//! - Type-safe error source tracking with boxed trait objects

use std::borrow::Cow;
use std::error::Error as StdError;

use strum::{AsRefStr, Display, IntoStaticStr};

/// Type alias for boxed errors that are Send + Sync.
pub type BoxedError = Box<dyn StdError + Send + Sync>;

/// Result type alias for warden operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error kind enumeration for categorizing failures.
///
/// Separated from [`Error`] to allow pattern matching on the category without
/// inspecting the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Zero identity, empty token or password, malformed options.
    InvalidInput,
    /// Lookup miss in an external store.
    NotFound,
    /// Uniqueness violation (username, email, role name, assignment).
    Conflict,
    /// Failed credential verification or an unusable token.
    Unauthorized,
    /// Password rejected by strength, policy or history checks.
    PolicyViolation,
    /// A configured cap (such as the refresh count) was reached.
    LimitExceeded,
    /// Failure not attributable to caller input.
    Internal,
}

impl ErrorKind {
    /// Returns the error kind as a string for categorization.
    #[must_use]
    #[inline]
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Returns `true` if the caller can fix the failure by changing the request.
    #[must_use]
    pub const fn is_caller_fixable(self) -> bool {
        !matches!(self, Self::Internal)
    }

    /// Wraps this kind into an [`Error`] with the given message.
    #[inline]
    pub fn with_message(self, message: impl Into<Cow<'static, str>>) -> Error {
        Error::new(self, message)
    }
}

/// Error with structured information.
///
/// Carries the error kind, a human-readable message, the itemized violations
/// for [`ErrorKind::PolicyViolation`] and an optional source error.
#[derive(Debug, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: Cow<'static, str>,
    violations: Vec<String>,
    #[source]
    source: Option<BoxedError>,
}

impl Error {
    /// Creates a new [`Error`].
    #[inline]
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            violations: Vec::new(),
            source: None,
        }
    }

    /// Attaches a source error to this error, enabling error chain tracking.
    #[inline]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Attaches an already boxed source error.
    #[inline]
    pub fn with_boxed_source(mut self, source: BoxedError) -> Self {
        self.source = Some(source);
        self
    }

    /// Attaches the itemized list of violations.
    #[inline]
    pub fn with_violations(mut self, violations: impl IntoIterator<Item = String>) -> Self {
        self.violations.extend(violations);
        self
    }

    /// Returns the error kind.
    #[must_use]
    #[inline]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error message.
    #[must_use]
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the itemized violations, empty unless this is a policy failure.
    #[must_use]
    #[inline]
    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    /// Creates a new invalid input error.
    #[inline]
    pub fn invalid_input(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    /// Creates a new not found error.
    #[inline]
    pub fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Creates a new conflict error.
    #[inline]
    pub fn conflict(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Creates a new unauthorized error.
    #[inline]
    pub fn unauthorized(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// Creates a new policy violation error.
    #[inline]
    pub fn policy_violation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::PolicyViolation, message)
    }

    /// Creates a new limit exceeded error.
    #[inline]
    pub fn limit_exceeded(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::LimitExceeded, message)
    }

    /// Creates a new internal error scoped to a component.
    #[inline]
    pub fn internal(
        component: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        let component = component.into();
        let message = message.into();
        Self::new(ErrorKind::Internal, format!("{component}: {message}"))
    }
}
