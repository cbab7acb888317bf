//! Fixed-width text files: one record per line, fields cut by declared length.
use crate::sources::file::{parse_row, read_file};
use anyquery_common::{Record, Value};
use anyquery_core::adapter::{run_pipeline, Adapter, AdapterKind, LoadRequest};
use anyquery_core::{FieldSpec, Materialized, ModelSchema};
use anyquery_error::{ErrorCode, QueryError, Result};
use async_trait::async_trait;
use std::any::Any;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FixedWidthAdapter {
    path: PathBuf,
}

impl FixedWidthAdapter {
    /// Fails when any field of `schema` lacks a length.
    pub fn new(path: impl Into<PathBuf>, schema: &ModelSchema) -> Result<Self> {
        if let Some(field) = schema.fields.iter().find(|f| f.length.is_none()) {
            return Err(QueryError::missing_field(
                &schema.name,
                format!("fields.{}.length", field.name),
            )
            .with_hint("Every field of a fixed_width source needs a length"));
        }
        Ok(Self { path: path.into() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Cut `line` into the declared fields, left to right.
///
/// A slice starting past the end of the line is missing (stored as `Null`);
/// a slice running past the end is shortened.
pub fn parse_line(schema: &ModelSchema, line: &str) -> Record {
    let mut offset = 0;
    parse_row(schema, |field| {
        let start = offset;
        let width = field.length.unwrap_or(0);
        offset += width;
        if start > line.len() {
            return None;
        }
        line.get(start..(start + width).min(line.len()))
    })
}

/// Render `record` as one fixed-width line, the inverse of [`parse_line`].
///
/// Widths are in bytes, matching how [`parse_line`] slices.
pub fn encode_line(schema: &ModelSchema, record: &Record) -> Result<String> {
    let mut line = String::new();
    for field in &schema.fields {
        let width = field.length.unwrap_or(0);
        let text = render(field, record.get(&field.name).unwrap_or(&Value::Null));
        let len = text.len();
        if len > width {
            return Err(QueryError::new(
                ErrorCode::TypeMismatch,
                format!(
                    "Value {:?} for field '{}' is {} bytes wide, length is {}",
                    text, field.name, len, width
                ),
            ));
        }
        line.push_str(&text);
        line.extend(std::iter::repeat(' ').take(width - len));
    }
    Ok(line)
}

fn render(field: &FieldSpec, value: &Value) -> String {
    match (value, field.format.as_deref()) {
        (Value::Null, _) => String::new(),
        (Value::Date(d), Some(format)) => d.format(format).to_string(),
        (Value::DateTime(dt), Some(format)) => dt.format(format).to_string(),
        (other, _) => other.to_param(),
    }
}

#[async_trait]
impl Adapter for FixedWidthAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::FixedWidth
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn load(&self, schema: &ModelSchema, request: LoadRequest) -> Result<Materialized> {
        let text = read_file(&self.path).await?;
        let records: Vec<Record> = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| parse_line(schema, line))
            .collect();
        tracing::debug!(
            "Read {} records from {}",
            records.len(),
            self.path.display()
        );
        run_pipeline(self, schema, records, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyquery_core::FieldType;

    fn schema() -> ModelSchema {
        ModelSchema::new("articles")
            .field(FieldSpec::new("id", FieldType::Integer).length(4))
            .field(FieldSpec::new("title", FieldType::String).length(10))
            .field(FieldSpec::new("status", FieldType::Integer).length(1))
    }

    #[test]
    fn test_parse_line() {
        let record = parse_line(&schema(), "0001hello     2");
        assert_eq!(record["id"], Value::Int(1));
        assert_eq!(record["title"], Value::from("hello"));
        assert_eq!(record["status"], Value::Int(2));
    }

    #[test]
    fn test_short_line() {
        let record = parse_line(&schema(), "0001hel");
        assert_eq!(record["title"], Value::from("hel"));
        assert_eq!(record["status"], Value::Null);
    }

    #[test]
    fn test_missing_length_is_rejected() {
        let schema = ModelSchema::new("broken").field(FieldSpec::new("id", FieldType::Integer));
        let err = FixedWidthAdapter::new("x.txt", &schema).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingRequiredField);
    }

    #[test]
    fn test_encode_rejects_overflow() {
        let record = anyquery_common::record([("title", "far too long for ten")]);
        assert!(encode_line(&schema(), &record).is_err());
    }

    #[test]
    fn test_multibyte_values_pad_in_bytes() {
        let schema = ModelSchema::new("people")
            .field(FieldSpec::new("name", FieldType::String).length(8))
            .field(FieldSpec::new("age", FieldType::Integer).length(3));
        let mut record = anyquery_common::record([("name", "éééé")]);
        record.insert("age".to_string(), Value::Int(42));

        let line = encode_line(&schema, &record).unwrap();
        assert_eq!(line.len(), 11);
        let parsed = parse_line(&schema, &line);
        assert_eq!(parsed["name"], Value::from("éééé"));
        assert_eq!(parsed["age"], Value::Int(42));

        // Five characters, ten bytes.
        let wide = anyquery_common::record([("name", "ééééé")]);
        assert!(encode_line(&schema, &wide).is_err());
    }
}
