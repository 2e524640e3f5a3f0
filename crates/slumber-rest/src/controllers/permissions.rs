//! Server-side permission data for the user permission operations.

use async_trait::async_trait;
use parking_lot::RwLock;
use slumber_core::SlumberResult;
use std::collections::{BTreeSet, HashMap};

/// Permission data of one local user.
///
/// Permissions are `app_label.codename` strings. Inactive users hold no
/// permissions at all and active superusers hold every permission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPermissions {
    pub is_active: bool,
    pub is_superuser: bool,
    pub user_permissions: BTreeSet<String>,
    pub group_permissions: BTreeSet<String>,
}

impl UserPermissions {
    /// An active user with no permissions.
    #[must_use]
    pub fn active() -> Self {
        Self {
            is_active: true,
            ..Self::default()
        }
    }

    /// Grants a permission directly.
    #[must_use]
    pub fn with_permission(mut self, perm: impl Into<String>) -> Self {
        self.user_permissions.insert(perm.into());
        self
    }

    /// Grants a permission through a group.
    #[must_use]
    pub fn with_group_permission(mut self, perm: impl Into<String>) -> Self {
        self.group_permissions.insert(perm.into());
        self
    }

    /// Permissions held through groups.
    #[must_use]
    pub fn group(&self) -> BTreeSet<String> {
        if self.is_active {
            self.group_permissions.clone()
        } else {
            BTreeSet::new()
        }
    }

    /// Direct and group permissions together.
    #[must_use]
    pub fn all(&self) -> BTreeSet<String> {
        if !self.is_active {
            return BTreeSet::new();
        }
        self.user_permissions
            .union(&self.group_permissions)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn has_perm(&self, perm: &str) -> bool {
        self.is_active
            && (self.is_superuser
                || self.user_permissions.contains(perm)
                || self.group_permissions.contains(perm))
    }

    /// True when any permission belongs to the app `module`.
    #[must_use]
    pub fn has_module_perms(&self, module: &str) -> bool {
        if !self.is_active {
            return false;
        }
        if self.is_superuser {
            return true;
        }
        let prefix = format!("{module}.");
        self.user_permissions
            .iter()
            .chain(&self.group_permissions)
            .any(|perm| perm.starts_with(&prefix))
    }
}

/// Looks up permission data by username.
#[async_trait]
pub trait PermissionSource: Send + Sync {
    /// Returns `None` when no such user exists.
    async fn user_permissions(&self, username: &str) -> SlumberResult<Option<UserPermissions>>;
}

/// In-memory [`PermissionSource`].
#[derive(Debug, Default)]
pub struct InMemoryPermissionSource {
    users: RwLock<HashMap<String, UserPermissions>>,
}

impl InMemoryPermissionSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the permissions of a user, replacing earlier data.
    pub fn insert(&self, username: impl Into<String>, permissions: UserPermissions) {
        self.users.write().insert(username.into(), permissions);
    }
}

#[async_trait]
impl PermissionSource for InMemoryPermissionSource {
    async fn user_permissions(&self, username: &str) -> SlumberResult<Option<UserPermissions>> {
        Ok(self.users.read().get(username).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor() -> UserPermissions {
        UserPermissions::active()
            .with_permission("shop.add_pizza")
            .with_group_permission("shop.change_pizza")
    }

    #[test]
    fn test_all_is_union() {
        let perms = editor();
        assert_eq!(perms.group().len(), 1);
        assert_eq!(perms.all().len(), 2);
        assert!(perms.has_perm("shop.change_pizza"));
        assert!(!perms.has_perm("shop.delete_pizza"));
        assert!(perms.has_module_perms("shop"));
        assert!(!perms.has_module_perms("sho"));
    }

    #[test]
    fn test_inactive_user_holds_nothing() {
        let perms = UserPermissions {
            is_active: false,
            ..editor()
        };
        assert!(perms.all().is_empty());
        assert!(perms.group().is_empty());
        assert!(!perms.has_perm("shop.add_pizza"));
        assert!(!perms.has_module_perms("shop"));
    }

    #[test]
    fn test_superuser_holds_everything() {
        let perms = UserPermissions {
            is_superuser: true,
            ..UserPermissions::active()
        };
        assert!(perms.has_perm("billing.refund"));
        assert!(perms.has_module_perms("billing"));
    }

    #[tokio::test]
    async fn test_in_memory_source() {
        let source = InMemoryPermissionSource::new();
        source.insert("testuser", editor());

        assert_eq!(source.user_permissions("testuser").await.unwrap(), Some(editor()));
        assert!(source.user_permissions("nobody").await.unwrap().is_none());
    }
}
