#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for authorization service operations.
pub const TRACING_TARGET_SERVICE: &str = "warden_rbac::service";

/// Tracing target for the in-memory role store.
pub const TRACING_TARGET_STORE: &str = "warden_rbac::store";

mod error;
mod model;
mod service;
mod store;

pub use crate::error::{Assignment, RbacError, Result};
pub use crate::model::{
    NewPermission, NewRole, Permission, PermissionId, Role, RoleId, RoleStatus, UpdateRole,
};
pub use crate::service::AuthorizationService;
pub use crate::store::{MemoryRoleStore, RoleStore};
