//! User model
//!
//! Table: users

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sf_core::traits::{Entity, Id, Identifiable, Timestamped};
use sf_core::types::UserStatus;
use validator::Validate;

/// A user account; the password hash never leaves the database layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Id,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub status: UserStatus,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn is_active(&self) -> bool {
        self.status.can_login()
    }
}

impl Identifiable for User {
    fn id(&self) -> Id {
        self.id
    }
}

impl Timestamped for User {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Entity for User {
    const TYPE_NAME: &'static str = "User";
    const COLLECTION_PATH: &'static str = "/users";
}

/// Self-registration payload
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUser {
    #[validate(email(message = "is not a valid email address"))]
    pub email: String,

    pub password: String,

    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub last_name: String,
}

/// Account creation by an administrator
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    #[validate(email(message = "is not a valid email address"))]
    pub email: String,

    pub password: String,

    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub last_name: String,

    #[serde(default)]
    pub status: UserStatus,

    #[serde(default)]
    pub is_admin: bool,
}

impl From<RegisterUser> for NewUser {
    fn from(payload: RegisterUser) -> Self {
        Self {
            email: payload.email,
            password: payload.password,
            first_name: payload.first_name,
            last_name: payload.last_name,
            status: UserStatus::Active,
            is_admin: false,
        }
    }
}

/// Partial update; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    #[validate(email(message = "is not a valid email address"))]
    pub email: Option<String>,

    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub last_name: Option<String>,

    pub status: Option<UserStatus>,

    pub is_admin: Option<bool>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.status.is_none()
            && self.is_admin.is_none()
    }

    /// Whether the update touches anything beyond the user's own name
    pub fn touches_privileged_fields(&self) -> bool {
        self.email.is_some() || self.status.is_some() || self.is_admin.is_some()
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Login {
    #[validate(length(min = 1, message = "can't be blank"))]
    pub email: String,

    #[validate(length(min = 1, message = "can't be blank"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePassword {
    #[validate(length(min = 1, message = "can't be blank"))]
    pub current_password: String,

    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;

    fn sample_user() -> User {
        User {
            id: 7,
            email: "jane@example.com".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            status: UserStatus::Active,
            is_admin: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_serialization_is_camel_case() {
        let json = serde_json::to_value(sample_user()).unwrap();
        assert_eq!(json["firstName"], "Jane");
        assert_eq!(json["isAdmin"], false);
        assert_eq!(json["status"], "active");
        assert!(json.get("passwordHash").is_none());
    }

    #[test]
    fn test_resource_path() {
        let user = sample_user();
        assert_eq!(user.resource_path(), "/users/7");
        assert_eq!(user.full_name(), "Jane Doe");
        assert!(user.is_active());
    }

    #[test]
    fn test_register_validation() {
        let payload: RegisterUser = serde_json::from_value(serde_json::json!({
            "email": "not-an-email",
            "password": "whatever1",
            "firstName": "",
            "lastName": "Doe"
        }))
        .unwrap();

        let errors = validate(&payload).unwrap_err();
        assert!(errors.has_error("email"));
        assert!(errors.has_error("firstName"));
        assert!(!errors.has_error("lastName"));
    }

    #[test]
    fn test_new_user_defaults() {
        let payload: NewUser = serde_json::from_value(serde_json::json!({
            "email": "bob@example.com",
            "password": "s3cret-pass",
            "firstName": "Bob",
            "lastName": "Smith"
        }))
        .unwrap();

        assert!(validate(&payload).is_ok());
        assert_eq!(payload.status, UserStatus::Active);
        assert!(!payload.is_admin);
    }

    #[test]
    fn test_update_user_privileged_fields() {
        let names_only = UpdateUser {
            first_name: Some("J".into()),
            ..Default::default()
        };
        assert!(!names_only.touches_privileged_fields());
        assert!(!names_only.is_empty());

        let status = UpdateUser {
            status: Some(UserStatus::Locked),
            ..Default::default()
        };
        assert!(status.touches_privileged_fields());
        assert!(UpdateUser::default().is_empty());
    }
}
