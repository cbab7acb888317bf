//! # Error Contexts
//!
//! Structured metadata attached to errors so callers can tell which record,
//! field or endpoint failed without parsing the message.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorContext {
    /// Context for AQ-2001 (ResolutionFailed)
    Resolution {
        locator: String,
        /// Debug rendering of the record the locator was applied to
        record: String,
    },

    /// Context for AQ-2002 (ParseFailed)
    Parse {
        field: String,
        field_type: String,
        token: String,
    },

    /// Context for AQ-1002 (TransportFailed)
    Transport {
        endpoint: String,
        status: Option<u16>,
        /// Response body excerpt
        body: String,
    },

    /// Context for AQ-2003 (UnsupportedStrategy)
    Strategy { strategy: String },

    /// Context for AQ-1001 (SourceNotFound)
    SourceNotFound {
        source_name: String,
        available_sources: Vec<String>,
    },

    /// Context for AQ-3002/3003 (config errors)
    Config { source: String, field: String },

    /// Context for file-backed sources (AQ-5002)
    File { path: String, line: Option<usize> },

    /// Generic key-value context for extensibility
    Generic {
        #[serde(flatten)]
        data: std::collections::HashMap<String, serde_json::Value>,
    },
}
