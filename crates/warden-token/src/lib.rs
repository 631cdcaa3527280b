#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for token issuance, validation and refresh.
pub const TRACING_TARGET_SERVICE: &str = "warden_token::service";

/// Tracing target for revocation bookkeeping.
pub const TRACING_TARGET_LEDGER: &str = "warden_token::ledger";

mod claims;
mod config;
mod error;
mod ledger;
mod service;

pub use crate::claims::TokenClaims;
pub use crate::config::{TokenConfig, TokenConfigBuilder, TokenConfigBuilderError};
pub use crate::error::{Result, TokenError};
pub use crate::service::TokenService;
