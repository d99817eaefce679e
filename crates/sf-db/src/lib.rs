//! # sf-db
//!
//! Database layer for Storefront RS.
//!
//! This crate provides PostgreSQL access using SQLx:
//!
//! - Connection pool management
//! - Repository pattern for CRUD operations
//! - A query executor that runs parsed query-string models as typed SQL
//!
//! ## Example
//!
//! ```ignore
//! use sf_db::{Database, DatabaseConfig, ProductRepository, QueryExecutor};
//! use sf_queries::ParameterProcessor;
//!
//! let db = Database::connect(&DatabaseConfig::from(settings.database)).await?;
//! let model = ParameterProcessor::default().process([("price[lt]", "100")]);
//!
//! let executor = QueryExecutor::new(db.pool(), 200);
//! let page = executor.execute::<ProductRow>(&model).await?;
//! ```
//!
//! The schema these repositories expect lives in `schema.sql` next to this
//! crate's manifest.

pub mod configurations;
pub mod pool;
pub mod products;
pub mod query_executor;
pub mod repository;
pub mod roles;
pub mod users;

pub use configurations::{ConfigEntryRepository, ConfigEntryRow};
pub use pool::{Database, DatabaseConfig};
pub use products::{ProductRepository, ProductRow};
pub use query_executor::{ColumnKind, ColumnSpec, QueryExecutor, Resource};
pub use repository::{Repository, RepositoryError, RepositoryResult};
pub use roles::{RoleRepository, RoleRow};
pub use users::{NewUserRecord, UserRepository, UserRow};
