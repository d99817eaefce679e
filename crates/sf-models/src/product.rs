//! Product model
//!
//! Table: products

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sf_core::traits::{Entity, Id, Identifiable, Timestamped};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Id,
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub price: f64,
    pub stock: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn in_stock(&self) -> bool {
        self.active && self.stock > 0
    }
}

impl Identifiable for Product {
    fn id(&self) -> Id {
        self.id
    }
}

impl Timestamped for Product {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Entity for Product {
    const TYPE_NAME: &'static str = "Product";
    const COLLECTION_PATH: &'static str = "/products";
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    #[validate(length(min = 1, max = 255, message = "must be between 1 and 255 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 64, message = "must be between 1 and 64 characters"))]
    pub sku: String,

    pub description: Option<String>,

    #[validate(range(min = 0.0, message = "must be greater than or equal to 0"))]
    pub price: f64,

    #[serde(default)]
    #[validate(range(min = 0, message = "must be greater than or equal to 0"))]
    pub stock: i32,

    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProduct {
    #[validate(length(min = 1, max = 255, message = "must be between 1 and 255 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 64, message = "must be between 1 and 64 characters"))]
    pub sku: Option<String>,

    pub description: Option<String>,

    #[validate(range(min = 0.0, message = "must be greater than or equal to 0"))]
    pub price: Option<f64>,

    #[validate(range(min = 0, message = "must be greater than or equal to 0"))]
    pub stock: Option<i32>,

    pub active: Option<bool>,
}
