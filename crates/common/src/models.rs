//! Declarative source definitions, usually read from `sources.yaml`.
//!
//! A source names a backend (`type`), the primary key of its records, the
//! ordered list of typed fields (file backends only) and any
//! backend-specific options. Backend options stay as loose JSON here and are
//! deserialized by the provider that owns them.

use anyquery_error::{ErrorCode, QueryError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

fn default_primary_key() -> String {
    "id".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
pub struct SourcesConfig {
    #[serde(default)]
    #[validate(nested)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct SourceConfig {
    #[validate(length(min = 1))]
    pub name: String,

    #[serde(rename = "type")]
    #[validate(length(min = 1))]
    pub source_type: String, // e.g., sql, http, csv, fixed_width

    #[serde(default = "default_primary_key")]
    pub primary_key: String,

    #[serde(default)]
    #[validate(nested)]
    pub fields: Vec<FieldConfig>,

    // Flatten other loose config
    #[serde(flatten)]
    pub config: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct FieldConfig {
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(rename = "type", default = "default_field_type")]
    pub field_type: String,
    /// Width in bytes, fixed-width files only
    pub length: Option<usize>,
    /// strftime pattern for date and datetime fields
    pub format: Option<String>,
    /// Column header to read instead of `name`, delimited files only
    pub source: Option<String>,
}

fn default_field_type() -> String {
    "string".to_string()
}

impl SourcesConfig {
    pub fn from_yaml(yaml: &str) -> anyquery_error::Result<Self> {
        let config: SourcesConfig = serde_yaml::from_str(yaml)?;
        config.validate().map_err(|e| {
            QueryError::new(
                ErrorCode::InvalidConfig,
                format!("Sources validation failed: {}", e),
            )
        })?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyquery_error::Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            QueryError::new(
                ErrorCode::Io,
                format!("Failed to read sources file {}: {}", path.display(), e),
            )
        })?;
        let config = Self::from_yaml(&yaml)?;
        tracing::debug!(
            "Loaded {} source definitions from {}",
            config.sources.len(),
            path.display()
        );
        Ok(config)
    }

    pub fn names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sources_config_parsing() {
        let yaml = r#"
sources:
  - name: articles
    type: csv
    path: ./articles.csv
    fields:
      - name: id
        type: integer
      - name: created_at
        type: datetime
        format: "%Y-%m-%d %H:%M:%S"
      - name: title
"#;
        let config = SourcesConfig::from_yaml(yaml).expect("valid sources");
        let source = config.get("articles").expect("declared");
        assert_eq!(source.source_type, "csv");
        assert_eq!(source.primary_key, "id");
        assert_eq!(source.fields.len(), 3);
        assert_eq!(source.fields[2].field_type, "string");
        assert_eq!(source.config["path"], "./articles.csv");
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let yaml = r#"
sources:
  - name: ""
    type: csv
"#;
        let err = SourcesConfig::from_yaml(yaml).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfig);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.yaml");
        std::fs::write(
            &path,
            "sources:\n  - name: users\n    type: sql\n    url: \"sqlite::memory:\"\n    table: users\n",
        )
        .unwrap();

        let config = SourcesConfig::from_file(&path).unwrap();
        assert_eq!(config.names(), vec!["users".to_string()]);
    }
}
