//! # sf-queries
//!
//! Query-string driven filtering, sorting and pagination for Storefront RS.
//!
//! ## Structure
//!
//! - `parser` - turns raw query-string pairs into a `QueryModel`
//! - `model` - the query model and the `QueryResponse` counters
//! - `condition` - compiles a model into a backend-neutral condition tree
//! - `hypermedia` - wraps results in the response envelope with self/next links
//! - `evaluate` - runs a model against in-memory JSON records
//!
//! ## Example
//!
//! ```
//! use sf_queries::{build_conditions, ParameterProcessor};
//!
//! let model = ParameterProcessor::default().process([
//!     ("name[like]", "oak"),
//!     ("sort_by", "desc(price)"),
//!     ("limit", "20"),
//! ]);
//!
//! assert_eq!(model.limit, Some(20));
//! let condition = build_conditions(&model);
//! assert_eq!(
//!     serde_json::to_string(&condition).unwrap(),
//!     r#"{"$and":[{"name":{"$like":["%oak%"]}}]}"#
//! );
//! ```

pub mod condition;
pub mod evaluate;
pub mod hypermedia;
pub mod model;
pub mod parser;

pub use condition::{build_conditions, Condition};
pub use hypermedia::{HypermediaProcessor, HypermediaResponse, Links, Meta, NextLink, RequestInfo, SelfLink};
pub use model::{
    ColumnFilter, ColumnFilterList, Conjunctive, FilterOperator, FilterValue, QueryModel,
    QueryResponse, ResponseData, SortDirection, SortEntry,
};
pub use parser::ParameterProcessor;
