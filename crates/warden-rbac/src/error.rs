//! Authorization error types.

use warden_core::{BoxedError, Error, ErrorKind, UserId};

use crate::model::{PermissionId, RoleId};

/// Result type alias for authorization operations.
pub type Result<T, E = RbacError> = std::result::Result<T, E>;

/// An assignment pair that must be unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum Assignment {
    /// A permission granted to a role.
    #[display("permission {permission} on role {role}")]
    RolePermission {
        /// Role receiving the permission.
        role: RoleId,
        /// Granted permission.
        permission: PermissionId,
    },
    /// A role granted to an identity.
    #[display("role {role} on user {user}")]
    UserRole {
        /// Identity receiving the role.
        user: UserId,
        /// Granted role.
        role: RoleId,
    },
}

/// Failures reported by the authorization service and role stores.
#[derive(Debug, thiserror::Error)]
pub enum RbacError {
    /// The zero identity was supplied.
    #[error("invalid user identity")]
    InvalidIdentity,

    /// A required field was empty.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// No role with the given identifier exists.
    #[error("role {0} not found")]
    RoleNotFound(RoleId),

    /// No role with the given name exists.
    #[error("role '{0}' not found")]
    RoleNameNotFound(String),

    /// No permission with the given identifier exists.
    #[error("permission {0} not found")]
    PermissionNotFound(PermissionId),

    /// Another role already uses this name.
    #[error("role name '{0}' already exists")]
    DuplicateRoleName(String),

    /// Another permission already uses this name.
    #[error("permission name '{0}' already exists")]
    DuplicatePermissionName(String),

    /// The assignment pair already exists.
    #[error("{0} is already assigned")]
    DuplicateAssignment(Assignment),

    /// The role is still assigned to identities.
    #[error("role {role} is assigned to {users} user(s) and cannot be deleted")]
    RoleInUse {
        /// Role that was to be deleted.
        role: RoleId,
        /// Number of identities holding it.
        users: usize,
    },

    /// The backing store failed.
    #[error("role store lookup failed")]
    Lookup(#[source] BoxedError),
}

impl RbacError {
    /// Wraps a store failure.
    pub fn lookup(source: impl Into<BoxedError>) -> Self {
        Self::Lookup(source.into())
    }

    /// Returns the caller-facing error category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidIdentity | Self::EmptyField(_) => ErrorKind::InvalidInput,
            Self::RoleNotFound(_) | Self::RoleNameNotFound(_) | Self::PermissionNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::DuplicateRoleName(_)
            | Self::DuplicatePermissionName(_)
            | Self::DuplicateAssignment(_)
            | Self::RoleInUse { .. } => ErrorKind::Conflict,
            Self::Lookup(_) => ErrorKind::Internal,
        }
    }
}

impl From<RbacError> for Error {
    fn from(error: RbacError) -> Self {
        match error {
            RbacError::Lookup(source) => {
                Error::internal("role store", "lookup failed").with_boxed_source(source)
            }
            other => Error::new(other.kind(), other.to_string()).with_source(other),
        }
    }
}
