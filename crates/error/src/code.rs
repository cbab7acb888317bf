use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric error codes following the AQ-XXXX format.
///
/// ## Code Ranges
/// - **1000-1999**: Source errors (lookup, transport)
/// - **2000-2999**: Query errors
/// - **3000-3999**: Configuration errors
/// - **5000-5999**: Internal/System errors
///
/// Codes are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
#[non_exhaustive]
pub enum ErrorCode {
    // === Source Errors (1000-1999) ===
    /// AQ-1001: Source not declared in the catalog
    SourceNotFound = 1001,
    /// AQ-1002: Remote call returned a failure status
    TransportFailed = 1002,
    /// AQ-1003: Source type has no registered provider
    UnsupportedSourceType = 1003,
    /// AQ-1004: Backend could not be reached or opened
    SourceUnavailable = 1004,

    // === Query Errors (2000-2999) ===
    /// AQ-2001: Locator could not be resolved against a record
    ResolutionFailed = 2001,
    /// AQ-2002: Field coercion failed
    ParseFailed = 2002,
    /// AQ-2003: Requested strategy is not implemented
    UnsupportedStrategy = 2003,
    /// AQ-2004: Value has an unexpected shape
    TypeMismatch = 2004,
    /// AQ-2005: Rows requested from a projected query (or vice versa)
    ProjectionMismatch = 2005,

    // === Configuration Errors (3000-3999) ===
    /// AQ-3001: Invalid YAML syntax
    InvalidYaml = 3001,
    /// AQ-3002: Missing required field in a source declaration
    MissingRequiredField = 3002,
    /// AQ-3003: Declaration is syntactically valid but unusable
    InvalidConfig = 3003,

    // === Internal Errors (5000-5999) ===
    /// AQ-5001: Serialization/deserialization failed
    SerializationFailed = 5001,
    /// AQ-5002: Filesystem or stream failure
    Io = 5002,
    /// AQ-5003: Unexpected internal state
    InternalPanic = 5003,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Get the formatted code string (e.g., "AQ-2001")
    pub fn as_str(&self) -> String {
        format!("AQ-{:04}", self.as_u16())
    }

    pub fn category(&self) -> ErrorCategory {
        match self.as_u16() {
            1000..=1999 => ErrorCategory::Source,
            2000..=2999 => ErrorCategory::Query,
            3000..=3999 => ErrorCategory::Config,
            _ => ErrorCategory::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> String {
        code.as_str()
    }
}

impl TryFrom<String> for ErrorCode {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        let num: u16 = s
            .strip_prefix("AQ-")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| "Invalid format".to_string())?;
        Self::try_from(num).map_err(|_| "Unknown code".to_string())
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = String;

    fn try_from(n: u16) -> std::result::Result<Self, Self::Error> {
        match n {
            1001 => Ok(Self::SourceNotFound),
            1002 => Ok(Self::TransportFailed),
            1003 => Ok(Self::UnsupportedSourceType),
            1004 => Ok(Self::SourceUnavailable),
            2001 => Ok(Self::ResolutionFailed),
            2002 => Ok(Self::ParseFailed),
            2003 => Ok(Self::UnsupportedStrategy),
            2004 => Ok(Self::TypeMismatch),
            2005 => Ok(Self::ProjectionMismatch),
            3001 => Ok(Self::InvalidYaml),
            3002 => Ok(Self::MissingRequiredField),
            3003 => Ok(Self::InvalidConfig),
            5001 => Ok(Self::SerializationFailed),
            5002 => Ok(Self::Io),
            5003 => Ok(Self::InternalPanic),
            _ => Err(format!("Unknown error code: {}", n)),
        }
    }
}

/// High-level error category, used by the CLI to pick an exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ErrorCategory {
    Source,
    Query,
    Config,
    Internal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_formatting() {
        assert_eq!(ErrorCode::SourceNotFound.as_str(), "AQ-1001");
        assert_eq!(ErrorCode::ResolutionFailed.as_str(), "AQ-2001");
        assert_eq!(ErrorCode::InternalPanic.as_str(), "AQ-5003");
    }

    #[test]
    fn test_error_code_parsing() {
        assert_eq!(
            ErrorCode::try_from("AQ-1002".to_string()).unwrap(),
            ErrorCode::TransportFailed
        );
        assert_eq!(
            ErrorCode::try_from("AQ-3003".to_string()).unwrap(),
            ErrorCode::InvalidConfig
        );
    }

    #[test]
    fn test_error_code_parsing_errors() {
        assert!(ErrorCode::try_from("INVALID".to_string()).is_err());
        assert!(ErrorCode::try_from("AQ-0000".to_string()).is_err());
        assert!(ErrorCode::try_from("AQ-ABC".to_string()).is_err());
        assert!(ErrorCode::try_from("AQ-9999".to_string()).is_err());
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(ErrorCode::TransportFailed.category(), ErrorCategory::Source);
        assert_eq!(ErrorCode::UnsupportedStrategy.category(), ErrorCategory::Query);
        assert_eq!(ErrorCode::InvalidYaml.category(), ErrorCategory::Config);
        assert_eq!(ErrorCode::Io.category(), ErrorCategory::Internal);
        assert_eq!(ErrorCode::InternalPanic.category(), ErrorCategory::Internal);
    }
}
