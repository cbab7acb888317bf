//! File-based data sources (delimited and fixed-width text).
//!
//! Both formats share one provider and the same row pipeline: read the
//! whole file, cut every line into raw tokens per declared field, parse the
//! tokens into typed values, then filter, limit, join and project in memory.
//! Files are reopened on every load.
use crate::sources::csv::CsvAdapter;
use crate::sources::fixed_width::FixedWidthAdapter;
use crate::sources::SourceProvider;
use anyquery_common::config::{AppConfig, SourceConfig};
use anyquery_common::{Record, Value};
use anyquery_core::adapter::Adapter;
use anyquery_core::parse::parse_field;
use anyquery_core::{FieldSpec, ModelSchema};
use anyquery_error::{ErrorCode, ErrorContext, QueryError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub struct FileSourceProvider;

#[async_trait]
impl SourceProvider for FileSourceProvider {
    fn type_name(&self) -> &'static str {
        "file"
    }

    async fn build(&self, config: &SourceConfig, _settings: &AppConfig) -> Result<Arc<dyn Adapter>> {
        match config.source_type.as_str() {
            "csv" => {
                #[derive(serde::Deserialize)]
                struct CsvConfig {
                    path: String,
                    delimiter: Option<char>,
                }
                let cfg: CsvConfig = parse_options(config)?;
                let mut adapter = CsvAdapter::new(cfg.path);
                if let Some(delimiter) = cfg.delimiter {
                    adapter = adapter.with_delimiter(delimiter)?;
                }
                Ok(Arc::new(adapter))
            }
            "fixed_width" | "fixed_length" => {
                #[derive(serde::Deserialize)]
                struct FixedWidthConfig {
                    path: String,
                }
                let cfg: FixedWidthConfig = parse_options(config)?;
                let schema = ModelSchema::from(config);
                Ok(Arc::new(FixedWidthAdapter::new(cfg.path, &schema)?))
            }
            other => Err(QueryError::new(
                ErrorCode::UnsupportedSourceType,
                format!("Invalid type for FileSourceProvider: {}", other),
            )),
        }
    }
}

fn parse_options<T: serde::de::DeserializeOwned>(config: &SourceConfig) -> Result<T> {
    serde_json::from_value(config.config.clone()).map_err(|e| {
        QueryError::new(
            ErrorCode::InvalidConfig,
            format!(
                "Failed to parse {} source '{}': {}",
                config.source_type, config.name, e
            ),
        )
    })
}

/// Read a whole file as UTF-8 text.
pub async fn read_file(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        QueryError::new(
            ErrorCode::Io,
            format!("Failed to read {}: {}", path.display(), e),
        )
        .with_context(ErrorContext::File {
            path: path.display().to_string(),
            line: None,
        })
    })
}

/// Build one record from raw tokens, one per declared field.
///
/// `token` returns the raw text for a field, or `None` when the line has no
/// such column or slice. Unparseable tokens are stored as `Null`.
pub fn parse_row<'a, F>(schema: &ModelSchema, mut token: F) -> Record
where
    F: FnMut(&FieldSpec) -> Option<&'a str>,
{
    schema
        .fields
        .iter()
        .map(|field| {
            let value = parse_field(field, token(field)).unwrap_or(Value::Null);
            (field.name.clone(), value)
        })
        .collect()
}
