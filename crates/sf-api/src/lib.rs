//! # sf-api
//!
//! REST API handlers for Storefront RS.
//!
//! Every resource endpoint answers with the hypermedia envelope
//! (`data`/`meta`/`links`); failures answer with `{"errors": [...]}`.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use extractors::AppState;
pub use routes::router;
