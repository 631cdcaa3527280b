#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod capability;
mod error;
mod identity;
mod pagination;

pub use crate::capability::{CredentialHasher, PermissionOracle, TokenIssuer};
pub use crate::error::{BoxedError, Error, ErrorKind, Result};
pub use crate::identity::UserId;
pub use crate::pagination::{Page, Pagination};
