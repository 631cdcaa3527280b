//! Role and permission records.

use derive_more::{Display, From, Into};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display as StrumDisplay, EnumString};

/// Store-assigned role identifier.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct RoleId(u64);

impl RoleId {
    /// Creates a role identifier from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Store-assigned permission identifier.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct PermissionId(u64);

impl PermissionId {
    /// Creates a permission identifier from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Lifecycle status of a role.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, StrumDisplay, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RoleStatus {
    /// The role is in use.
    #[default]
    Active,
    /// The role is retired but kept for reference.
    Disabled,
}

/// A named bundle of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Unique role identifier.
    pub id: RoleId,
    /// Unique machine name, such as `admin`.
    pub name: String,
    /// Human-readable name.
    pub display_name: String,
    /// Free-form description.
    pub description: String,
    /// Lifecycle status.
    pub status: RoleStatus,
    /// Timestamp when the role was created.
    pub created_at: Timestamp,
    /// Timestamp when the role was last updated.
    pub updated_at: Timestamp,
}

/// Data for creating a new role.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRole {
    /// Unique machine name.
    pub name: String,
    /// Human-readable name.
    #[serde(default)]
    pub display_name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Initial status.
    #[serde(default)]
    pub status: RoleStatus,
}

impl NewRole {
    /// Creates an active role with the given name, displayed as itself.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            ..Default::default()
        }
    }

    /// Sets the human-readable name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Partial changes to a role. Unset fields are left untouched.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRole {
    /// New machine name.
    pub name: Option<String>,
    /// New human-readable name.
    pub display_name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New status.
    pub status: Option<RoleStatus>,
}

impl UpdateRole {
    /// Applies the changes to a role, stamping `updated_at`.
    pub(crate) fn apply(self, role: &mut Role, now: Timestamp) {
        if let Some(name) = self.name {
            role.name = name;
        }
        if let Some(display_name) = self.display_name {
            role.display_name = display_name;
        }
        if let Some(description) = self.description {
            role.description = description;
        }
        if let Some(status) = self.status {
            role.status = status;
        }
        role.updated_at = now;
    }
}

/// Permission to perform `action` on `resource`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Unique permission identifier.
    pub id: PermissionId,
    /// Unique machine name, such as `user:read`.
    pub name: String,
    /// Human-readable name.
    pub display_name: String,
    /// Protected resource, such as `user`.
    pub resource: String,
    /// Action on the resource, such as `read`.
    pub action: String,
    /// Free-form description.
    pub description: String,
    /// Timestamp when the permission was created.
    pub created_at: Timestamp,
}

impl Permission {
    /// Returns `true` if this permission grants `action` on `resource`.
    #[inline]
    #[must_use]
    pub fn grants(&self, resource: &str, action: &str) -> bool {
        self.resource == resource && self.action == action
    }
}

/// Data for creating a new permission.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPermission {
    /// Unique machine name.
    pub name: String,
    /// Human-readable name.
    #[serde(default)]
    pub display_name: String,
    /// Protected resource.
    pub resource: String,
    /// Action on the resource.
    pub action: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

impl NewPermission {
    /// Creates a permission named `{resource}:{action}`.
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        let resource = resource.into();
        let action = action.into();
        let name = format!("{resource}:{action}");

        Self {
            display_name: name.clone(),
            name,
            resource,
            action,
            description: String::new(),
        }
    }

    /// Overrides the machine name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_permission_derives_name() {
        let permission = NewPermission::new("user", "read");
        assert_eq!(permission.name, "user:read");
        assert_eq!(permission.display_name, "user:read");

        let permission = permission.with_name("read_users");
        assert_eq!(permission.name, "read_users");
    }

    #[test]
    fn update_touches_only_set_fields() -> anyhow::Result<()> {
        let created = Timestamp::from_second(1_700_000_000)?;
        let mut role = Role {
            id: RoleId::new(1),
            name: "editor".to_owned(),
            display_name: "Editor".to_owned(),
            description: String::new(),
            status: RoleStatus::Active,
            created_at: created,
            updated_at: created,
        };

        let now = Timestamp::from_second(1_700_000_100)?;
        let changes = UpdateRole {
            status: Some(RoleStatus::Disabled),
            ..Default::default()
        };
        changes.apply(&mut role, now);

        assert_eq!(role.name, "editor");
        assert_eq!(role.status, RoleStatus::Disabled);
        assert_eq!(role.updated_at, now);
        assert_eq!(role.created_at, created);

        Ok(())
    }

    #[test]
    fn status_uses_snake_case() -> anyhow::Result<()> {
        assert_eq!(serde_json::to_string(&RoleStatus::Disabled)?, "\"disabled\"");
        assert_eq!(RoleStatus::Active.to_string(), "active");
        Ok(())
    }
}
