#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for password hashing and verification.
pub const TRACING_TARGET_HASHER: &str = "warden_password::hasher";

/// Tracing target for password strength evaluation.
pub const TRACING_TARGET_STRENGTH: &str = "warden_password::strength";

/// Tracing target for random password generation.
pub const TRACING_TARGET_GENERATOR: &str = "warden_password::generator";

/// Tracing target for password history bookkeeping.
pub const TRACING_TARGET_HISTORY: &str = "warden_password::history";

/// Tracing target for the password manager facade.
pub const TRACING_TARGET_MANAGER: &str = "warden_password::manager";

mod charset;
mod error;
mod generator;
mod hasher;
mod history;
mod manager;
mod policy;
mod strength;

pub use crate::charset::CharClass;
pub use crate::error::{PasswordError, Result};
pub use crate::generator::{GenerateOptions, PasswordGenerator};
pub use crate::hasher::{HasherConfig, PasswordHasher};
pub use crate::history::{
    HistoryStore, MemoryHistoryStore, PasswordHistoryEntry, PasswordHistoryManager,
};
pub use crate::manager::{PasswordManager, PasswordManagerConfig};
pub use crate::policy::{PasswordPolicy, PasswordPolicyValidator, PolicyResult};
pub use crate::strength::{
    CrackTime, PasswordStrengthChecker, PasswordStrengthResult, StrengthLevel,
};
