//! Permission system for Storefront RS
//!
//! Roles grant named permissions; a user holds the union of their roles'
//! permissions. Administrators pass every check.

use sf_core::error::AppError;
use sf_core::traits::Id;
use std::collections::HashSet;

// ============================================================================
// Permission Definition
// ============================================================================

/// Built-in permission definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permission {
    pub name: &'static str,
    pub description: &'static str,
}

pub mod builtin {
    use super::Permission;

    pub const USERS_READ: Permission = Permission {
        name: "users.read",
        description: "List and view user accounts",
    };

    pub const USERS_WRITE: Permission = Permission {
        name: "users.write",
        description: "Create, edit and delete user accounts",
    };

    pub const ROLES_MANAGE: Permission = Permission {
        name: "roles.manage",
        description: "Manage roles and role assignments",
    };

    pub const PRODUCTS_WRITE: Permission = Permission {
        name: "products.write",
        description: "Create, edit and delete products",
    };

    pub const CONFIGURATION_READ: Permission = Permission {
        name: "configuration.read",
        description: "View configuration entries",
    };

    pub const CONFIGURATION_WRITE: Permission = Permission {
        name: "configuration.write",
        description: "Create, edit and delete configuration entries",
    };

    pub const ALL: &[Permission] = &[
        USERS_READ,
        USERS_WRITE,
        ROLES_MANAGE,
        PRODUCTS_WRITE,
        CONFIGURATION_READ,
        CONFIGURATION_WRITE,
    ];
}

pub fn is_known(name: &str) -> bool {
    builtin::ALL.iter().any(|p| p.name == name)
}

/// Names in `names` that are not in the catalogue
pub fn unknown_permissions(names: &[String]) -> Vec<&str> {
    names
        .iter()
        .map(String::as_str)
        .filter(|name| !is_known(name))
        .collect()
}

// ============================================================================
// User Context
// ============================================================================

/// Authenticated user with resolved permissions
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Id,
    pub email: String,
    pub is_admin: bool,
    permissions: HashSet<String>,
}

impl CurrentUser {
    pub fn new(id: Id, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            is_admin: false,
            permissions: HashSet::new(),
        }
    }

    pub fn admin(id: Id, email: impl Into<String>) -> Self {
        let mut user = Self::new(id, email);
        user.is_admin = true;
        user
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions
            .extend(permissions.into_iter().map(Into::into));
        self
    }

    pub fn add_permission(&mut self, permission: impl Into<String>) {
        self.permissions.insert(permission.into());
    }

    pub fn allowed(&self, permission: &Permission) -> bool {
        self.is_admin || self.permissions.contains(permission.name)
    }

    /// `Forbidden` unless the user holds `permission`
    pub fn require(&self, permission: &Permission) -> Result<(), AppError> {
        if self.allowed(permission) {
            Ok(())
        } else {
            tracing::debug!(user_id = self.id, permission = permission.name, "Permission denied");
            Err(AppError::forbidden(format!(
                "Missing permission '{}'",
                permission.name
            )))
        }
    }

    pub fn is_self(&self, user_id: Id) -> bool {
        self.id == user_id
    }

    /// Sorted, for stable output
    pub fn permissions(&self) -> Vec<&str> {
        let mut permissions: Vec<&str> = self.permissions.iter().map(String::as_str).collect();
        permissions.sort_unstable();
        permissions
    }
}

// ============================================================================
// Tests
// ============================================================================
