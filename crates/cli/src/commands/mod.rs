//! CLI command implementations.

mod helpers;
mod query;
mod sources;

pub use query::{query, QueryArgs};
pub use sources::list_sources;
