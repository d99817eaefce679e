//! Role model
//!
//! Table: roles, joined to users through user_roles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sf_core::traits::{Entity, Id, Identifiable, Timestamped};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: Id,
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn grants(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

impl Identifiable for Role {
    fn id(&self) -> Id {
        self.id
    }
}

impl Timestamped for Role {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Entity for Role {
    const TYPE_NAME: &'static str = "Role";
    const COLLECTION_PATH: &'static str = "/roles";
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewRole {
    #[validate(length(min = 1, max = 64, message = "must be between 1 and 64 characters"))]
    pub name: String,

    #[validate(length(max = 255, message = "is too long (maximum is 255 characters)"))]
    pub description: Option<String>,

    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRole {
    #[validate(length(min = 1, max = 64, message = "must be between 1 and 64 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 255, message = "is too long (maximum is 255 characters)"))]
    pub description: Option<String>,

    pub permissions: Option<Vec<String>>,
}

/// Replaces the full set of roles held by a user
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignRoles {
    pub role_ids: Vec<Id>,
}

impl AssignRoles {
    /// Role ids with duplicates removed, in ascending order
    pub fn unique_ids(&self) -> Vec<Id> {
        let mut ids = self.role_ids.clone();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;
    use serde_json::json;

    #[test]
    fn test_role_grants() {
        let role = Role {
            id: 1,
            name: "catalog".to_string(),
            description: None,
            permissions: vec!["products.write".to_string()],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(role.grants("products.write"));
        assert!(!role.grants("users.write"));
        assert_eq!(role.resource_path(), "/roles/1");
    }

    #[test]
    fn test_new_role_validation() {
        let role: NewRole = serde_json::from_value(json!({ "name": "" })).unwrap();
        let errors = validate(&role).unwrap_err();
        assert!(errors.has_error("name"));
        assert!(role.permissions.is_empty());
    }

    #[test]
    fn test_assign_roles_dedup() {
        let payload: AssignRoles = serde_json::from_value(json!({ "roleIds": [3, 1, 3, 2] })).unwrap();
        assert_eq!(payload.unique_ids(), vec![1, 2, 3]);
    }
}
