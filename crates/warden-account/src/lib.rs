#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for account flows.
pub const TRACING_TARGET_SERVICE: &str = "warden_account::service";

/// Tracing target for password-reset bookkeeping.
pub const TRACING_TARGET_RESET: &str = "warden_account::reset";

mod config;
mod error;
mod reset;
mod service;
mod user;

pub use crate::config::AccountConfig;
pub use crate::error::{AccountError, Result};
pub use crate::reset::{MemoryResetCodeStore, ResetCode, ResetCodeStore};
pub use crate::service::{AccountService, PasswordInput};
pub use crate::user::{MemoryUserStore, NewUser, UserRecord, UserStatus, UserStore};
