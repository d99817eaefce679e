//! # sf-models
//!
//! Domain models for Storefront RS.
//!
//! Entities are what the API returns; the `New*`/`Update*` structs are the
//! validated write payloads accepted from clients.

pub use sf_core::traits::{Entity, Id, Identifiable, Timestamped};

pub mod config_entry;
pub mod product;
pub mod role;
pub mod user;
pub mod validation;

pub use config_entry::{ConfigEntry, NewConfigEntry, UpdateConfigEntry};
pub use product::{NewProduct, Product, UpdateProduct};
pub use role::{AssignRoles, NewRole, Role, UpdateRole};
pub use user::{ChangePassword, Login, NewUser, RegisterUser, UpdateUser, User};
pub use validation::{validate, validate_password};
