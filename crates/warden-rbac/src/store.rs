//! Storage collaborator for roles, permissions and their assignments.

use std::collections::{BTreeMap, BTreeSet};

use jiff::Timestamp;
use parking_lot::RwLock;
use warden_core::{Page, Pagination, UserId};

use crate::TRACING_TARGET_STORE;
use crate::error::{Assignment, RbacError, Result};
use crate::model::{
    NewPermission, NewRole, Permission, PermissionId, Role, RoleId, UpdateRole,
};

/// Storage for roles, permissions and both assignment relations.
///
/// Implementations must enforce uniqueness of role names, permission names
/// and assignment pairs atomically with the insert, the way a relational
/// store does with unique constraints.
pub trait RoleStore: Send + Sync {
    /// Inserts a new role.
    ///
    /// Fails with [`RbacError::DuplicateRoleName`] if the name is taken.
    fn insert_role(&self, role: NewRole) -> Result<Role>;

    /// Finds a role by its identifier.
    fn find_role(&self, role_id: RoleId) -> Result<Option<Role>>;

    /// Finds a role by its unique name.
    fn find_role_by_name(&self, name: &str) -> Result<Option<Role>>;

    /// Applies partial changes to a role.
    fn update_role(&self, role_id: RoleId, changes: UpdateRole) -> Result<Role>;

    /// Deletes a role together with its permission links.
    ///
    /// Fails with [`RbacError::RoleInUse`] while any identity holds the role.
    fn delete_role(&self, role_id: RoleId) -> Result<()>;

    /// Lists roles ordered by identifier.
    fn list_roles(&self, pagination: Pagination) -> Result<Page<Role>>;

    /// Inserts a new permission.
    ///
    /// Fails with [`RbacError::DuplicatePermissionName`] if the name is taken.
    fn insert_permission(&self, permission: NewPermission) -> Result<Permission>;

    /// Finds a permission by its identifier.
    fn find_permission(&self, permission_id: PermissionId) -> Result<Option<Permission>>;

    /// Lists permissions ordered by identifier.
    fn list_permissions(&self, pagination: Pagination) -> Result<Page<Permission>>;

    /// Grants a permission to a role.
    fn link_permission(&self, role_id: RoleId, permission_id: PermissionId) -> Result<()>;

    /// Withdraws a permission from a role. Returns `false` if it was not granted.
    fn unlink_permission(&self, role_id: RoleId, permission_id: PermissionId) -> Result<bool>;

    /// Lists the permissions granted to a role.
    fn role_permissions(&self, role_id: RoleId) -> Result<Vec<Permission>>;

    /// Grants a role to an identity.
    fn link_user(&self, user_id: UserId, role_id: RoleId) -> Result<()>;

    /// Withdraws a role from an identity. Returns `false` if it was not granted.
    fn unlink_user(&self, user_id: UserId, role_id: RoleId) -> Result<bool>;

    /// Lists the roles held by an identity.
    fn user_roles(&self, user_id: UserId) -> Result<Vec<Role>>;

    /// Lists the identities holding a role.
    fn users_with_role(&self, role_id: RoleId) -> Result<Vec<UserId>>;

    /// Returns `true` if any role of the identity grants `action` on `resource`.
    fn has_permission(&self, user_id: UserId, resource: &str, action: &str) -> Result<bool>;

    /// Returns `true` if the identity holds a role with the given name.
    fn has_role(&self, user_id: UserId, role_name: &str) -> Result<bool>;
}

#[derive(Debug, Default)]
struct StoreState {
    last_role_id: u64,
    last_permission_id: u64,
    roles: BTreeMap<RoleId, Role>,
    permissions: BTreeMap<PermissionId, Permission>,
    role_permissions: BTreeSet<(RoleId, PermissionId)>,
    user_roles: BTreeSet<(UserId, RoleId)>,
}

impl StoreState {
    fn role_name_taken(&self, name: &str, except: Option<RoleId>) -> bool {
        self.roles
            .values()
            .any(|role| role.name == name && Some(role.id) != except)
    }

    fn require_role(&self, role_id: RoleId) -> Result<&Role> {
        self.roles
            .get(&role_id)
            .ok_or(RbacError::RoleNotFound(role_id))
    }

    fn role_ids_of(&self, user_id: UserId) -> impl Iterator<Item = RoleId> + '_ {
        self.user_roles
            .range((user_id, RoleId::new(0))..=(user_id, RoleId::new(u64::MAX)))
            .map(|&(_, role_id)| role_id)
    }

    fn permissions_of(&self, role_id: RoleId) -> impl Iterator<Item = &Permission> + '_ {
        self.role_permissions
            .range((role_id, PermissionId::new(0))..=(role_id, PermissionId::new(u64::MAX)))
            .filter_map(|(_, permission_id)| self.permissions.get(permission_id))
    }
}

/// In-memory [`RoleStore`].
///
/// Identifiers are assigned sequentially starting at 1.
#[derive(Debug, Default)]
pub struct MemoryRoleStore {
    state: RwLock<StoreState>,
}

impl MemoryRoleStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn paginate<T>(items: impl ExactSizeIterator<Item = T>, pagination: Pagination) -> Page<T> {
    let total = items.len() as u64;
    Page {
        items: pagination.apply(items).collect(),
        total,
    }
}

impl RoleStore for MemoryRoleStore {
    fn insert_role(&self, role: NewRole) -> Result<Role> {
        let mut state = self.state.write();
        if state.role_name_taken(&role.name, None) {
            return Err(RbacError::DuplicateRoleName(role.name));
        }

        state.last_role_id += 1;
        let now = Timestamp::now();
        let record = Role {
            id: RoleId::new(state.last_role_id),
            name: role.name,
            display_name: role.display_name,
            description: role.description,
            status: role.status,
            created_at: now,
            updated_at: now,
        };
        state.roles.insert(record.id, record.clone());

        Ok(record)
    }

    fn find_role(&self, role_id: RoleId) -> Result<Option<Role>> {
        Ok(self.state.read().roles.get(&role_id).cloned())
    }

    fn find_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        let state = self.state.read();
        Ok(state.roles.values().find(|role| role.name == name).cloned())
    }

    fn update_role(&self, role_id: RoleId, changes: UpdateRole) -> Result<Role> {
        let mut state = self.state.write();
        state.require_role(role_id)?;

        if let Some(name) = &changes.name
            && state.role_name_taken(name, Some(role_id))
        {
            return Err(RbacError::DuplicateRoleName(name.clone()));
        }

        let role = state
            .roles
            .get_mut(&role_id)
            .ok_or(RbacError::RoleNotFound(role_id))?;
        changes.apply(role, Timestamp::now());

        Ok(role.clone())
    }

    fn delete_role(&self, role_id: RoleId) -> Result<()> {
        let mut state = self.state.write();
        state.require_role(role_id)?;

        let users = state
            .user_roles
            .iter()
            .filter(|&&(_, held)| held == role_id)
            .count();
        if users > 0 {
            return Err(RbacError::RoleInUse {
                role: role_id,
                users,
            });
        }

        let before = state.role_permissions.len();
        state.role_permissions.retain(|&(role, _)| role != role_id);
        state.roles.remove(&role_id);

        tracing::trace!(
            target: TRACING_TARGET_STORE,
            role_id = %role_id,
            unlinked = before - state.role_permissions.len(),
            "role removed"
        );

        Ok(())
    }

    fn list_roles(&self, pagination: Pagination) -> Result<Page<Role>> {
        let state = self.state.read();
        Ok(paginate(state.roles.values().cloned(), pagination))
    }

    fn insert_permission(&self, permission: NewPermission) -> Result<Permission> {
        let mut state = self.state.write();
        if state
            .permissions
            .values()
            .any(|existing| existing.name == permission.name)
        {
            return Err(RbacError::DuplicatePermissionName(permission.name));
        }

        state.last_permission_id += 1;
        let record = Permission {
            id: PermissionId::new(state.last_permission_id),
            name: permission.name,
            display_name: permission.display_name,
            resource: permission.resource,
            action: permission.action,
            description: permission.description,
            created_at: Timestamp::now(),
        };
        state.permissions.insert(record.id, record.clone());

        Ok(record)
    }

    fn find_permission(&self, permission_id: PermissionId) -> Result<Option<Permission>> {
        Ok(self.state.read().permissions.get(&permission_id).cloned())
    }

    fn list_permissions(&self, pagination: Pagination) -> Result<Page<Permission>> {
        let state = self.state.read();
        Ok(paginate(state.permissions.values().cloned(), pagination))
    }

    fn link_permission(&self, role_id: RoleId, permission_id: PermissionId) -> Result<()> {
        let mut state = self.state.write();
        state.require_role(role_id)?;
        if !state.permissions.contains_key(&permission_id) {
            return Err(RbacError::PermissionNotFound(permission_id));
        }

        if !state.role_permissions.insert((role_id, permission_id)) {
            return Err(RbacError::DuplicateAssignment(Assignment::RolePermission {
                role: role_id,
                permission: permission_id,
            }));
        }

        Ok(())
    }

    fn unlink_permission(&self, role_id: RoleId, permission_id: PermissionId) -> Result<bool> {
        Ok(self
            .state
            .write()
            .role_permissions
            .remove(&(role_id, permission_id)))
    }

    fn role_permissions(&self, role_id: RoleId) -> Result<Vec<Permission>> {
        let state = self.state.read();
        Ok(state.permissions_of(role_id).cloned().collect())
    }

    fn link_user(&self, user_id: UserId, role_id: RoleId) -> Result<()> {
        let mut state = self.state.write();
        state.require_role(role_id)?;

        if !state.user_roles.insert((user_id, role_id)) {
            return Err(RbacError::DuplicateAssignment(Assignment::UserRole {
                user: user_id,
                role: role_id,
            }));
        }

        Ok(())
    }

    fn unlink_user(&self, user_id: UserId, role_id: RoleId) -> Result<bool> {
        Ok(self.state.write().user_roles.remove(&(user_id, role_id)))
    }

    fn user_roles(&self, user_id: UserId) -> Result<Vec<Role>> {
        let state = self.state.read();
        Ok(state
            .role_ids_of(user_id)
            .filter_map(|role_id| state.roles.get(&role_id))
            .cloned()
            .collect())
    }

    fn users_with_role(&self, role_id: RoleId) -> Result<Vec<UserId>> {
        let state = self.state.read();
        Ok(state
            .user_roles
            .iter()
            .filter(|&&(_, held)| held == role_id)
            .map(|&(user_id, _)| user_id)
            .collect())
    }

    fn has_permission(&self, user_id: UserId, resource: &str, action: &str) -> Result<bool> {
        let state = self.state.read();
        Ok(state.role_ids_of(user_id).any(|role_id| {
            state
                .permissions_of(role_id)
                .any(|permission| permission.grants(resource, action))
        }))
    }

    fn has_role(&self, user_id: UserId, role_name: &str) -> Result<bool> {
        let state = self.state.read();
        Ok(state.role_ids_of(user_id).any(|role_id| {
            state
                .roles
                .get(&role_id)
                .is_some_and(|role| role.name == role_name)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_sequential_ids() -> anyhow::Result<()> {
        let store = MemoryRoleStore::new();
        let admin = store.insert_role(NewRole::new("admin"))?;
        let editor = store.insert_role(NewRole::new("editor"))?;

        assert_eq!(admin.id, RoleId::new(1));
        assert_eq!(editor.id, RoleId::new(2));
        assert_eq!(store.find_role_by_name("editor")?, Some(editor));
        assert_eq!(store.find_role(RoleId::new(9))?, None);

        Ok(())
    }

    #[test]
    fn rename_rejects_taken_name() -> anyhow::Result<()> {
        let store = MemoryRoleStore::new();
        store.insert_role(NewRole::new("admin"))?;
        let editor = store.insert_role(NewRole::new("editor"))?;

        let changes = UpdateRole {
            name: Some("admin".to_owned()),
            ..Default::default()
        };
        assert!(matches!(
            store.update_role(editor.id, changes),
            Err(RbacError::DuplicateRoleName(name)) if name == "admin"
        ));

        // Keeping its own name is not a conflict.
        let changes = UpdateRole {
            name: Some("editor".to_owned()),
            description: Some("Edits things".to_owned()),
            ..Default::default()
        };
        assert_eq!(store.update_role(editor.id, changes)?.description, "Edits things");

        Ok(())
    }

    #[test]
    fn links_require_existing_records() -> anyhow::Result<()> {
        let store = MemoryRoleStore::new();
        let role = store.insert_role(NewRole::new("admin"))?;

        assert!(matches!(
            store.link_permission(role.id, PermissionId::new(5)),
            Err(RbacError::PermissionNotFound(_))
        ));
        assert!(matches!(
            store.link_user(UserId::new(1), RoleId::new(5)),
            Err(RbacError::RoleNotFound(_))
        ));

        Ok(())
    }

    #[test]
    fn lists_are_paginated() -> anyhow::Result<()> {
        let store = MemoryRoleStore::new();
        for i in 0..5 {
            store.insert_permission(NewPermission::new("doc", format!("a{i}")))?;
        }

        let page = store.list_permissions(Pagination::from_page(2, 2))?;
        assert_eq!(page.total, 5);
        let names: Vec<_> = page.items.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["doc:a2", "doc:a3"]);

        let page = store.list_permissions(Pagination::from_page(4, 2))?;
        assert!(page.is_empty());
        assert_eq!(page.total, 5);

        Ok(())
    }
}
