//! Model schema: the ordered, typed field declarations of a source.

use anyquery_common::config::SourceConfig;
use anyquery_common::models::FieldConfig;
use anyquery_common::Value;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Float,
    Decimal,
    Date,
    DateTime,
    String,
    Boolean,
    /// Unrecognized tag; the raw token is kept as a trimmed string.
    Other(String),
}

impl FieldType {
    pub fn parse(tag: &str) -> Self {
        match tag.to_lowercase().as_str() {
            "integer" | "int" => FieldType::Integer,
            "float" | "double" => FieldType::Float,
            "decimal" => FieldType::Decimal,
            "date" => FieldType::Date,
            "datetime" | "timestamp" => FieldType::DateTime,
            "string" | "text" => FieldType::String,
            "boolean" | "bool" => FieldType::Boolean,
            _ => FieldType::Other(tag.to_string()),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Decimal => "decimal",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Other(tag) => tag,
        };
        write!(f, "{}", tag)
    }
}

/// Post-parse hook, applied to successfully parsed values only.
pub type Transform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

#[derive(Clone)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    pub length: Option<usize>,
    pub format: Option<String>,
    pub source: Option<String>,
    pub transform: Option<Transform>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            length: None,
            format: None,
            source: None,
            transform: None,
        }
    }

    pub fn length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn source(mut self, column: impl Into<String>) -> Self {
        self.source = Some(column.into());
        self
    }

    pub fn transform<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(f));
        self
    }

    /// Column header to read in delimited files.
    pub fn column(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.name)
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("type", &self.field_type)
            .field("length", &self.length)
            .field("format", &self.format)
            .field("source", &self.source)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

impl From<&FieldConfig> for FieldSpec {
    fn from(config: &FieldConfig) -> Self {
        Self {
            name: config.name.clone(),
            field_type: FieldType::parse(&config.field_type),
            length: config.length,
            format: config.format.clone(),
            source: config.source.clone(),
            transform: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelSchema {
    pub name: String,
    pub primary_key: String,
    pub fields: Vec<FieldSpec>,
}

impl ModelSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: "id".to_string(),
            fields: Vec::new(),
        }
    }

    pub fn primary_key(mut self, key: impl Into<String>) -> Self {
        self.primary_key = key.into();
        self
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl From<&SourceConfig> for ModelSchema {
    fn from(config: &SourceConfig) -> Self {
        Self {
            name: config.name.clone(),
            primary_key: config.primary_key.clone(),
            fields: config.fields.iter().map(FieldSpec::from).collect(),
        }
    }
}
