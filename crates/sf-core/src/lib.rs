//! # sf-core
//!
//! Core types, traits, and configuration for Storefront RS.
//!
//! This crate provides the building blocks shared by every other crate:
//! - Common error types
//! - Result type aliases
//! - Core traits (Identifiable, Timestamped, Entity)
//! - Shared enums such as `UserStatus`
//! - Application configuration

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::*;
pub use result::*;
pub use traits::*;
pub use types::*;
