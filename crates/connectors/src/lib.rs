//! Source adapters for anyquery: SQLite, paginated HTTP APIs, CSV and
//! fixed-width files, plus the registry that builds them from config.
pub mod sources;

pub use sources::{default_registry, Catalog, SourceProvider, SourceRegistry};
