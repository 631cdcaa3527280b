//! Authorization service over a [`RoleStore`].

use std::fmt;
use std::sync::Arc;

use warden_core::{Page, Pagination, PermissionOracle, UserId};

use crate::TRACING_TARGET_SERVICE;
use crate::error::{RbacError, Result};
use crate::model::{
    NewPermission, NewRole, Permission, PermissionId, Role, RoleId, UpdateRole,
};
use crate::store::{MemoryRoleStore, RoleStore};

/// Role and permission management plus access checks.
///
/// Cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct AuthorizationService {
    store: Arc<dyn RoleStore>,
}

impl fmt::Debug for AuthorizationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationService").finish_non_exhaustive()
    }
}

impl Default for AuthorizationService {
    fn default() -> Self {
        Self::in_memory()
    }
}

fn require_identity(user_id: UserId) -> Result<()> {
    if user_id.is_valid() {
        Ok(())
    } else {
        Err(RbacError::InvalidIdentity)
    }
}

fn require_field(value: &str, field: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        Err(RbacError::EmptyField(field))
    } else {
        Ok(())
    }
}

impl AuthorizationService {
    /// Creates a service backed by the given store.
    pub fn new(store: Arc<dyn RoleStore>) -> Self {
        Self { store }
    }

    /// Creates a service backed by a fresh [`MemoryRoleStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryRoleStore::new()))
    }

    /// Creates a role.
    ///
    /// # Errors
    ///
    /// Returns [`RbacError::DuplicateRoleName`] if the name is taken.
    pub fn create_role(&self, role: NewRole) -> Result<Role> {
        require_field(&role.name, "role name")?;
        let role = self.store.insert_role(role)?;

        tracing::info!(
            target: TRACING_TARGET_SERVICE,
            role_id = %role.id,
            role_name = %role.name,
            "role created"
        );

        Ok(role)
    }

    /// Gets a role by identifier.
    pub fn get_role(&self, role_id: RoleId) -> Result<Role> {
        self.store
            .find_role(role_id)?
            .ok_or(RbacError::RoleNotFound(role_id))
    }

    /// Gets a role by its unique name.
    pub fn get_role_by_name(&self, name: &str) -> Result<Role> {
        self.store
            .find_role_by_name(name)?
            .ok_or_else(|| RbacError::RoleNameNotFound(name.to_owned()))
    }

    /// Applies partial changes to a role.
    pub fn update_role(&self, role_id: RoleId, changes: UpdateRole) -> Result<Role> {
        if let Some(name) = &changes.name {
            require_field(name, "role name")?;
        }

        let role = self.store.update_role(role_id, changes)?;
        tracing::debug!(target: TRACING_TARGET_SERVICE, role_id = %role_id, "role updated");

        Ok(role)
    }

    /// Deletes a role and its permission links.
    ///
    /// # Errors
    ///
    /// Returns [`RbacError::RoleInUse`] while the role is assigned to any
    /// identity.
    pub fn delete_role(&self, role_id: RoleId) -> Result<()> {
        self.store.delete_role(role_id).inspect_err(|error| {
            tracing::debug!(
                target: TRACING_TARGET_SERVICE,
                role_id = %role_id,
                error = %error,
                "role deletion refused"
            );
        })?;

        tracing::info!(target: TRACING_TARGET_SERVICE, role_id = %role_id, "role deleted");
        Ok(())
    }

    /// Lists roles by 1-based page number.
    ///
    /// A page below 1 is treated as the first page and a non-positive page
    /// size falls back to 10.
    pub fn list_roles(&self, page: i64, page_size: i64) -> Result<Page<Role>> {
        self.store.list_roles(Pagination::from_page(page, page_size))
    }

    /// Creates a permission.
    ///
    /// # Errors
    ///
    /// Returns [`RbacError::DuplicatePermissionName`] if the name is taken.
    pub fn create_permission(&self, permission: NewPermission) -> Result<Permission> {
        require_field(&permission.name, "permission name")?;
        require_field(&permission.resource, "resource")?;
        require_field(&permission.action, "action")?;

        let permission = self.store.insert_permission(permission)?;
        tracing::info!(
            target: TRACING_TARGET_SERVICE,
            permission_id = %permission.id,
            resource = %permission.resource,
            action = %permission.action,
            "permission created"
        );

        Ok(permission)
    }

    /// Gets a permission by identifier.
    pub fn get_permission(&self, permission_id: PermissionId) -> Result<Permission> {
        self.store
            .find_permission(permission_id)?
            .ok_or(RbacError::PermissionNotFound(permission_id))
    }

    /// Lists permissions by 1-based page number.
    pub fn list_permissions(&self, page: i64, page_size: i64) -> Result<Page<Permission>> {
        self.store
            .list_permissions(Pagination::from_page(page, page_size))
    }

    /// Grants a permission to a role.
    ///
    /// # Errors
    ///
    /// Returns [`RbacError::DuplicateAssignment`] if the role already has it.
    pub fn assign_permission_to_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> Result<()> {
        self.store.link_permission(role_id, permission_id)?;

        tracing::debug!(
            target: TRACING_TARGET_SERVICE,
            role_id = %role_id,
            permission_id = %permission_id,
            "permission assigned to role"
        );

        Ok(())
    }

    /// Withdraws a permission from a role. Absent pairs are ignored.
    pub fn remove_permission_from_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> Result<()> {
        let removed = self.store.unlink_permission(role_id, permission_id)?;

        tracing::debug!(
            target: TRACING_TARGET_SERVICE,
            role_id = %role_id,
            permission_id = %permission_id,
            removed,
            "permission removed from role"
        );

        Ok(())
    }

    /// Lists the permissions granted to a role.
    pub fn role_permissions(&self, role_id: RoleId) -> Result<Vec<Permission>> {
        self.store.role_permissions(role_id)
    }

    /// Grants a role to an identity.
    ///
    /// # Errors
    ///
    /// Returns [`RbacError::DuplicateAssignment`] if the identity already
    /// holds the role.
    pub fn assign_role_to_user(&self, user_id: UserId, role_id: RoleId) -> Result<()> {
        require_identity(user_id)?;
        self.store.link_user(user_id, role_id)?;

        tracing::info!(
            target: TRACING_TARGET_SERVICE,
            user_id = %user_id,
            role_id = %role_id,
            "role assigned to user"
        );

        Ok(())
    }

    /// Withdraws a role from an identity. Absent pairs are ignored.
    pub fn remove_role_from_user(&self, user_id: UserId, role_id: RoleId) -> Result<()> {
        require_identity(user_id)?;
        let removed = self.store.unlink_user(user_id, role_id)?;

        tracing::info!(
            target: TRACING_TARGET_SERVICE,
            user_id = %user_id,
            role_id = %role_id,
            removed,
            "role removed from user"
        );

        Ok(())
    }

    /// Lists the roles held by an identity.
    pub fn user_roles(&self, user_id: UserId) -> Result<Vec<Role>> {
        require_identity(user_id)?;
        self.store.user_roles(user_id)
    }

    /// Lists the identities holding a role.
    pub fn users_with_role(&self, role_id: RoleId) -> Result<Vec<UserId>> {
        self.store.users_with_role(role_id)
    }

    /// Returns `true` if any role of the identity grants `action` on
    /// `resource`.
    ///
    /// Never mutates state. The zero identity holds nothing.
    pub fn has_permission(&self, user_id: UserId, resource: &str, action: &str) -> Result<bool> {
        if !user_id.is_valid() {
            return Ok(false);
        }

        let granted = self.store.has_permission(user_id, resource, action)?;
        tracing::trace!(
            target: TRACING_TARGET_SERVICE,
            user_id = %user_id,
            resource,
            action,
            granted,
            "permission checked"
        );

        Ok(granted)
    }

    /// Returns `true` if the identity holds the named role.
    pub fn has_role(&self, user_id: UserId, role_name: &str) -> Result<bool> {
        if !user_id.is_valid() {
            return Ok(false);
        }

        self.store.has_role(user_id, role_name)
    }
}

impl PermissionOracle for AuthorizationService {
    fn has_permission(
        &self,
        identity: UserId,
        resource: &str,
        action: &str,
    ) -> warden_core::Result<bool> {
        Ok(Self::has_permission(self, identity, resource, action)?)
    }

    fn has_role(&self, identity: UserId, role_name: &str) -> warden_core::Result<bool> {
        Ok(Self::has_role(self, identity, role_name)?)
    }
}

#[cfg(test)]
mod tests {
    use warden_core::ErrorKind;

    use super::*;
    use crate::model::RoleStatus;

    const ALICE: UserId = UserId::new(1);
    const BOB: UserId = UserId::new(2);

    fn seeded() -> anyhow::Result<(AuthorizationService, Role, Permission)> {
        let service = AuthorizationService::in_memory();
        let role = service.create_role(NewRole::new("editor").with_display_name("Editor"))?;
        let permission = service.create_permission(NewPermission::new("document", "write"))?;
        service.assign_permission_to_role(role.id, permission.id)?;
        Ok((service, role, permission))
    }

    #[test]
    fn permission_flows_through_role() -> anyhow::Result<()> {
        let (service, role, _) = seeded()?;

        assert!(!service.has_permission(ALICE, "document", "write")?);
        service.assign_role_to_user(ALICE, role.id)?;

        assert!(service.has_permission(ALICE, "document", "write")?);
        assert!(!service.has_permission(ALICE, "document", "delete")?);
        assert!(!service.has_permission(BOB, "document", "write")?);
        assert!(service.has_role(ALICE, "editor")?);
        assert!(!service.has_role(ALICE, "admin")?);

        service.remove_role_from_user(ALICE, role.id)?;
        assert!(!service.has_permission(ALICE, "document", "write")?);
        assert!(!service.has_role(ALICE, "editor")?);

        Ok(())
    }

    #[test]
    fn duplicate_assignments_conflict() -> anyhow::Result<()> {
        let (service, role, permission) = seeded()?;

        let error = service
            .assign_permission_to_role(role.id, permission.id)
            .unwrap_err();
        assert!(matches!(error, RbacError::DuplicateAssignment(_)));
        assert_eq!(error.kind(), ErrorKind::Conflict);

        service.assign_role_to_user(ALICE, role.id)?;
        assert!(matches!(
            service.assign_role_to_user(ALICE, role.id),
            Err(RbacError::DuplicateAssignment(_))
        ));

        Ok(())
    }

    #[test]
    fn removing_absent_pairs_is_noop() -> anyhow::Result<()> {
        let (service, role, permission) = seeded()?;

        service.remove_role_from_user(BOB, role.id)?;
        service.remove_permission_from_role(role.id, permission.id)?;
        service.remove_permission_from_role(role.id, permission.id)?;
        assert!(service.role_permissions(role.id)?.is_empty());

        Ok(())
    }

    #[test]
    fn duplicate_names_conflict() -> anyhow::Result<()> {
        let (service, ..) = seeded()?;

        assert!(matches!(
            service.create_role(NewRole::new("editor")),
            Err(RbacError::DuplicateRoleName(_))
        ));
        assert!(matches!(
            service.create_permission(NewPermission::new("document", "write")),
            Err(RbacError::DuplicatePermissionName(_))
        ));

        Ok(())
    }

    #[test]
    fn delete_refused_while_assigned() -> anyhow::Result<()> {
        let (service, role, permission) = seeded()?;
        service.assign_role_to_user(ALICE, role.id)?;

        assert!(matches!(
            service.delete_role(role.id),
            Err(RbacError::RoleInUse { users: 1, .. })
        ));

        service.remove_role_from_user(ALICE, role.id)?;
        service.delete_role(role.id)?;

        assert!(matches!(
            service.get_role(role.id),
            Err(RbacError::RoleNotFound(_))
        ));
        // The permission survives, only the link is gone.
        assert_eq!(service.get_permission(permission.id)?, permission);

        // A new role with the same name starts without permissions.
        let recreated = service.create_role(NewRole::new("editor"))?;
        assert!(service.role_permissions(recreated.id)?.is_empty());

        Ok(())
    }

    #[test]
    fn lookups_and_updates() -> anyhow::Result<()> {
        let (service, role, _) = seeded()?;

        assert_eq!(service.get_role_by_name("editor")?.id, role.id);
        assert!(matches!(
            service.get_role_by_name("ghost"),
            Err(RbacError::RoleNameNotFound(_))
        ));

        let updated = service.update_role(
            role.id,
            UpdateRole {
                status: Some(RoleStatus::Disabled),
                ..Default::default()
            },
        )?;
        assert_eq!(updated.status, RoleStatus::Disabled);
        assert_eq!(updated.display_name, "Editor");

        assert!(matches!(
            service.update_role(role.id, UpdateRole {
                name: Some(" ".to_owned()),
                ..Default::default()
            }),
            Err(RbacError::EmptyField(_))
        ));

        Ok(())
    }

    #[test]
    fn membership_queries() -> anyhow::Result<()> {
        let (service, editor, _) = seeded()?;
        let viewer = service.create_role(NewRole::new("viewer"))?;

        service.assign_role_to_user(ALICE, editor.id)?;
        service.assign_role_to_user(ALICE, viewer.id)?;
        service.assign_role_to_user(BOB, viewer.id)?;

        let names: Vec<_> = service
            .user_roles(ALICE)?
            .into_iter()
            .map(|role| role.name)
            .collect();
        assert_eq!(names, vec!["editor", "viewer"]);
        assert_eq!(service.users_with_role(viewer.id)?, vec![ALICE, BOB]);

        let page = service.list_roles(0, 0)?;
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 2);
        assert_eq!(service.list_permissions(1, 10)?.total, 1);

        Ok(())
    }

    #[test]
    fn zero_identity() -> anyhow::Result<()> {
        let (service, role, _) = seeded()?;
        let zero = UserId::default();

        assert!(matches!(
            service.assign_role_to_user(zero, role.id),
            Err(RbacError::InvalidIdentity)
        ));
        assert!(!service.has_permission(zero, "document", "write")?);
        assert!(!service.has_role(zero, "editor")?);

        Ok(())
    }

    #[test]
    fn usable_as_permission_oracle() -> anyhow::Result<()> {
        let (service, role, _) = seeded()?;
        service.assign_role_to_user(ALICE, role.id)?;

        let oracle: &dyn PermissionOracle = &service;
        assert!(oracle.has_permission(ALICE, "document", "write")?);
        assert!(oracle.has_role(ALICE, "editor")?);

        Ok(())
    }
}
