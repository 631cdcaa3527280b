//! Narrow capability traits implemented by the engine crates.
//!
//! Callers such as the account flows depend on these traits rather than on the
//! concrete engines, so an alternate backing (a distributed revocation store,
//! a database-backed permission oracle) can be substituted without touching
//! them.

use crate::{Result, UserId};

/// Salts, hashes and verifies credentials.
pub trait CredentialHasher: Send + Sync {
    /// Hashes a plaintext secret into its encoded storage form.
    fn hash(&self, plaintext: &str) -> Result<String>;

    /// Verifies a plaintext candidate against an encoded hash.
    ///
    /// Malformed encodings yield `false`; implementations never panic.
    fn verify(&self, plaintext: &str, encoded: &str) -> bool;
}

/// Issues and manages signed bearer tokens.
pub trait TokenIssuer: Send + Sync {
    /// Issues a token for the identity with the default lifetime.
    fn issue(&self, identity: UserId) -> Result<String>;

    /// Validates a token and returns the identity it was issued to.
    fn validate(&self, token: &str) -> Result<UserId>;

    /// Exchanges a token for a fresh one, revoking the original.
    fn refresh(&self, token: &str) -> Result<String>;

    /// Revokes a single token.
    fn revoke(&self, token: &str) -> Result<()>;

    /// Revokes every token currently issued to the identity.
    fn revoke_all(&self, identity: UserId) -> Result<()>;
}

/// Answers role and permission queries for an identity.
pub trait PermissionOracle: Send + Sync {
    /// Returns `true` if any role of the identity grants `action` on `resource`.
    fn has_permission(&self, identity: UserId, resource: &str, action: &str) -> Result<bool>;

    /// Returns `true` if the identity holds the named role.
    fn has_role(&self, identity: UserId, role_name: &str) -> Result<bool>;
}
