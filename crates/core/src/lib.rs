//! anyquery core: the adapter execution engine.
//!
//! This crate holds everything that is independent of a concrete backend:
//!
//! ```text
//! Query ──► Adapter::load ──► filter ──► limit ──► joins ──► projection
//!                                                   │
//!                                       ┌───────────┴──────────┐
//!                                       │ fan-out / target load │
//!                                       └──────────────────────┘
//! ```
//!
//! Concrete adapters live in `anyquery-connectors`.

pub mod adapter;
pub mod fanout;
pub mod filter;
pub mod join;
pub mod locator;
pub mod model;
pub mod parse;
pub mod query;
pub mod row;
pub mod schema;

pub use adapter::{Adapter, AdapterKind, LoadRequest};
pub use filter::{Condition, Predicate};
pub use join::{Cardinality, Join, JoinStrategy, JoinTarget};
pub use locator::Locator;
pub use model::Model;
pub use query::Query;
pub use row::{Materialized, Row};
pub use schema::{FieldSpec, FieldType, ModelSchema};
