//! Structured exit codes for machine-readable error handling.
//!
//! These codes let scripts distinguish a bad sources file from an unreachable
//! backend or a query that cannot be evaluated.

/// General error (fallback for unknown errors)
pub const GENERAL_ERROR: i32 = 1;

/// CLI usage error (malformed --filter or --select arguments)
pub const USAGE_ERROR: i32 = 2;

/// Configuration error (YAML parse failure, missing backend options)
pub const CONFIG_ERROR: i32 = 3;

/// Source error (unknown source, transport failure, database unreachable)
pub const SOURCE_ERROR: i32 = 4;

/// Query error (unresolvable path, unsupported strategy, bad projection)
pub const QUERY_ERROR: i32 = 5;
