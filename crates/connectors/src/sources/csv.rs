//! Delimited text files with a header row.
use crate::sources::file::{parse_row, read_file};
use anyquery_common::{Record, Value};
use anyquery_core::adapter::{run_pipeline, Adapter, AdapterKind, LoadRequest};
use anyquery_core::{Materialized, ModelSchema};
use anyquery_error::{ErrorCode, ErrorContext, QueryError, Result};
use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct CsvAdapter {
    path: PathBuf,
    delimiter: u8,
}

impl CsvAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Result<Self> {
        if !delimiter.is_ascii() {
            return Err(QueryError::new(
                ErrorCode::InvalidConfig,
                format!("CSV delimiter must be a single ASCII character, got {:?}", delimiter),
            ));
        }
        self.delimiter = delimiter as u8;
        Ok(self)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parse delimited `text` into records shaped by `schema`.
///
/// Fields read the column named by their `source` override or their name.
/// A schema without fields keeps every column as a trimmed string.
pub fn read_records(
    schema: &ModelSchema,
    text: &str,
    delimiter: u8,
    origin: &Path,
) -> Result<Vec<Record>> {
    let mut reader = ::csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| csv_error(e, origin))?
        .clone();
    let positions: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.trim(), idx))
        .collect();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| csv_error(e, origin))?;
        let record = if schema.fields.is_empty() {
            headers
                .iter()
                .zip(row.iter())
                .map(|(name, value)| (name.trim().to_string(), Value::from(value.trim())))
                .collect()
        } else {
            parse_row(schema, |field| {
                positions
                    .get(field.column())
                    .and_then(|idx| row.get(*idx))
            })
        };
        records.push(record);
    }

    tracing::debug!(
        "Read {} records from {}",
        records.len(),
        origin.display()
    );
    Ok(records)
}

fn csv_error(e: ::csv::Error, origin: &Path) -> QueryError {
    let line = e.position().map(|p| p.line() as usize);
    QueryError::new(
        ErrorCode::ParseFailed,
        format!("Malformed CSV in {}: {}", origin.display(), e),
    )
    .with_context(ErrorContext::File {
        path: origin.display().to_string(),
        line,
    })
}

#[async_trait]
impl Adapter for CsvAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Csv
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn load(&self, schema: &ModelSchema, request: LoadRequest) -> Result<Materialized> {
        let text = read_file(&self.path).await?;
        let records = read_records(schema, &text, self.delimiter, &self.path)?;
        run_pipeline(self, schema, records, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyquery_core::{FieldSpec, FieldType};

    fn schema() -> ModelSchema {
        ModelSchema::new("articles")
            .field(FieldSpec::new("id", FieldType::Integer))
            .field(FieldSpec::new("title", FieldType::String).source("Title"))
            .field(FieldSpec::new("status", FieldType::Integer))
    }

    #[test]
    fn test_source_override_and_missing_column() {
        let text = "id,Title\n1, hello \n2,world\n";
        let records = read_records(&schema(), text, b',', Path::new("a.csv")).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["title"], Value::from("hello"));
        // Undeclared column in the file: stored as null.
        assert_eq!(records[0]["status"], Value::Null);
    }

    #[test]
    fn test_custom_delimiter() {
        let text = "id;Title;status\n7;x;1\n";
        let records = read_records(&schema(), text, b';', Path::new("a.csv")).unwrap();
        assert_eq!(records[0]["id"], Value::Int(7));
        assert_eq!(records[0]["status"], Value::Int(1));
    }

    #[test]
    fn test_schemaless_keeps_strings() {
        let text = "id,name\n1,ada\n";
        let records =
            read_records(&ModelSchema::new("raw"), text, b',', Path::new("a.csv")).unwrap();
        assert_eq!(records[0]["id"], Value::from("1"));
        assert_eq!(records[0]["name"], Value::from("ada"));
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let text = "id,Title\n1,a,extra\n";
        let err = read_records(&schema(), text, b',', Path::new("a.csv")).unwrap_err();
        assert_eq!(err.code, ErrorCode::ParseFailed);
    }

    #[test]
    fn test_non_ascii_delimiter() {
        assert!(CsvAdapter::new("a.csv").with_delimiter('§').is_err());
    }
}
