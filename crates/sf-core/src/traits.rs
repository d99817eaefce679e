//! Core traits shared by models and repositories

use chrono::{DateTime, Utc};

/// Primary key type
pub type Id = i64;

/// Trait for entities that have a primary key
pub trait Identifiable {
    fn id(&self) -> Id;
}

/// Trait for entities with timestamps (created_at, updated_at)
pub trait Timestamped {
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> DateTime<Utc>;
}

/// Base trait for all domain entities
pub trait Entity: Identifiable + Timestamped + Send + Sync {
    /// Human-readable type name for error messages
    const TYPE_NAME: &'static str;

    /// Path segment the entity is exposed under, e.g. `/products`
    const COLLECTION_PATH: &'static str;

    /// Path of this entity below the API root
    fn resource_path(&self) -> String {
        format!("{}/{}", Self::COLLECTION_PATH, self.id())
    }
}
