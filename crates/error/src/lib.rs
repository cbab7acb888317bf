//! # anyquery-error
//!
//! Unified error type for the anyquery federation layer.
//!
//! Every failure that reaches a caller carries:
//! - a stable numeric code (AQ-XXXX)
//! - structured context naming the failing record, field or endpoint
//! - an optional hint

mod code;
mod context;
mod convert;

pub use code::{ErrorCategory, ErrorCode};
pub use context::ErrorContext;
pub use convert::source_not_found;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The error type returned by every anyquery operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryError {
    /// Numeric error code (e.g., "AQ-1002")
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Structured context for programmatic handling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,

    /// Suggestion for fixing the query or the source declaration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl QueryError {
    /// Create a new error with code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            hint: None,
        }
    }

    /// Add structured context
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Add a hint
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// A locator could not be resolved against a record.
    pub fn resolution(locator: impl Into<String>, record: impl Into<String>, cause: &str) -> Self {
        let locator = locator.into();
        Self::new(
            ErrorCode::ResolutionFailed,
            format!("Failed to resolve path {}: {}", locator, cause),
        )
        .with_context(ErrorContext::Resolution {
            locator,
            record: record.into(),
        })
    }

    /// A remote call answered with a non-success status.
    pub fn transport(endpoint: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self::new(
            ErrorCode::TransportFailed,
            format!("Request to {} failed with status {}", endpoint, status),
        )
        .with_context(ErrorContext::Transport {
            endpoint,
            status: Some(status),
            body: body.into(),
        })
    }

    /// An explicitly unimplemented strategy was requested.
    pub fn unsupported_strategy(strategy: impl Into<String>) -> Self {
        let strategy = strategy.into();
        Self::new(
            ErrorCode::UnsupportedStrategy,
            format!("Strategy '{}' is not implemented", strategy),
        )
        .with_context(ErrorContext::Strategy { strategy })
    }

    /// A required configuration entry is missing.
    pub fn missing_field(source: impl Into<String>, field: impl Into<String>) -> Self {
        let source = source.into();
        let field = field.into();
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("Source '{}' is missing required field '{}'", source, field),
        )
        .with_context(ErrorContext::Config { source, field })
    }

    /// Serialize to JSON for machine consumers
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::warn!("Failed to serialize QueryError: {}", e);
            format!(
                r#"{{"code":"{}","message":"Serialization failed"}}"#,
                self.code
            )
        })
    }

    /// Serialize to pretty JSON for logging
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.to_json())
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, " (Hint: {})", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for QueryError {}

/// Result type alias for anyquery operations
pub type Result<T> = std::result::Result<T, QueryError>;
