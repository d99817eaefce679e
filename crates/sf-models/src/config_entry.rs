//! Configuration entry model
//!
//! Table: configurations. Runtime key/value settings editable over the API.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sf_core::traits::{Entity, Id, Identifiable, Timestamped};
use validator::Validate;

static CONFIG_KEY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9_.-]+$").unwrap());

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigEntry {
    pub id: Id,
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identifiable for ConfigEntry {
    fn id(&self) -> Id {
        self.id
    }
}

impl Timestamped for ConfigEntry {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Entity for ConfigEntry {
    const TYPE_NAME: &'static str = "Configuration";
    const COLLECTION_PATH: &'static str = "/configuration";
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewConfigEntry {
    #[validate(
        length(min = 1, max = 128, message = "must be between 1 and 128 characters"),
        regex(path = "CONFIG_KEY", message = "may only contain lowercase letters, digits, '.', '_' and '-'")
    )]
    pub key: String,

    #[serde(default)]
    pub value: String,

    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConfigEntry {
    pub value: Option<String>,

    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;
    use serde_json::json;

    #[test]
    fn test_key_format() {
        let entry: NewConfigEntry =
            serde_json::from_value(json!({ "key": "checkout.currency", "value": "EUR" })).unwrap();
        assert!(validate(&entry).is_ok());

        let entry: NewConfigEntry =
            serde_json::from_value(json!({ "key": "Checkout Currency", "value": "EUR" })).unwrap();
        assert!(validate(&entry).unwrap_err().has_error("key"));
    }

    #[test]
    fn test_value_defaults_to_empty() {
        let entry: NewConfigEntry = serde_json::from_value(json!({ "key": "feature.beta" })).unwrap();
        assert_eq!(entry.value, "");
        assert!(entry.description.is_none());
    }

    #[test]
    fn test_serialization() {
        let entry = ConfigEntry {
            id: 2,
            key: "site.name".to_string(),
            value: "Storefront".to_string(),
            description: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["key"], "site.name");
        assert!(json.get("createdAt").is_some());
        assert_eq!(entry.resource_path(), "/configuration/2");
    }
}
