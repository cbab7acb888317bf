//! Field locators and the path resolver.
//!
//! A locator names where a value lives inside a [`Record`]: a top-level key,
//! an ordered path of keys into nested records, or a function computing a
//! virtual field. Every filter, join key and projection goes through
//! [`Locator::resolve`].

use anyquery_common::{Record, Value};
use anyquery_error::{QueryError, Result};
use std::fmt;
use std::sync::Arc;

pub type LocatorFn = Arc<dyn Fn(&Record) -> anyhow::Result<Value> + Send + Sync>;

#[derive(Clone)]
pub enum Locator {
    /// Direct lookup; a missing key resolves to `Null`.
    Key(String),
    /// Nested lookup; a missing or null level short-circuits to `Null`.
    Path(Vec<String>),
    /// Computed value.
    Func { name: String, f: LocatorFn },
}

impl Locator {
    pub fn key(name: impl Into<String>) -> Self {
        Locator::Key(name.into())
    }

    pub fn path<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Locator::Path(segments.into_iter().map(Into::into).collect())
    }

    pub fn func<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Record) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Locator::Func {
            name: name.into(),
            f: Arc::new(f),
        }
    }

    /// The column name when this locator is a plain top-level key.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Locator::Key(k) => Some(k),
            Locator::Path(segments) if segments.len() == 1 => Some(&segments[0]),
            _ => None,
        }
    }

    pub fn resolve(&self, record: &Record) -> Result<Value> {
        resolve(record, self)
    }
}

/// Resolve `locator` against `record`.
///
/// Failures are logged with the locator and the record, then returned as
/// `ResolutionFailed`; no default value is substituted.
pub fn resolve(record: &Record, locator: &Locator) -> Result<Value> {
    let outcome = match locator {
        Locator::Key(key) => Ok(record.get(key).cloned().unwrap_or_default()),
        Locator::Path(segments) => dig(record, segments),
        Locator::Func { f, .. } => f(record).map_err(|e| format!("{:#}", e)),
    };

    outcome.map_err(|cause| {
        let rendered = describe(record);
        tracing::error!(
            "Failed to resolve path {} on {}: {}",
            locator,
            rendered,
            cause
        );
        QueryError::resolution(locator.to_string(), rendered, &cause)
    })
}

fn dig(record: &Record, segments: &[String]) -> std::result::Result<Value, String> {
    let Some((first, rest)) = segments.split_first() else {
        return Err("empty path".to_string());
    };

    let mut current = match record.get(first) {
        Some(value) => value,
        None => return Ok(Value::Null),
    };

    for segment in rest {
        current = match current {
            Value::Null => return Ok(Value::Null),
            Value::Record(inner) => match inner.get(segment) {
                Some(value) => value,
                None => return Ok(Value::Null),
            },
            other => {
                return Err(format!(
                    "cannot look up '{}' in a {} value",
                    segment,
                    other.type_name()
                ))
            }
        };
    }

    Ok(current.clone())
}

fn describe(record: &Record) -> String {
    let json: serde_json::Map<String, serde_json::Value> = record
        .iter()
        .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
        .collect();
    serde_json::Value::Object(json).to_string()
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Key(k) => write!(f, "{}", k),
            Locator::Path(segments) => write!(f, "{}", segments.join(".")),
            Locator::Func { name, .. } => write!(f, "<fn {}>", name),
        }
    }
}

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Key(k) => f.debug_tuple("Key").field(k).finish(),
            Locator::Path(segments) => f.debug_tuple("Path").field(segments).finish(),
            Locator::Func { name, .. } => f.debug_struct("Func").field("name", name).finish(),
        }
    }
}

impl From<&str> for Locator {
    fn from(key: &str) -> Self {
        Locator::Key(key.to_string())
    }
}

impl From<String> for Locator {
    fn from(key: String) -> Self {
        Locator::Key(key)
    }
}

impl From<&String> for Locator {
    fn from(key: &String) -> Self {
        Locator::Key(key.clone())
    }
}

impl<const N: usize> From<[&str; N]> for Locator {
    fn from(segments: [&str; N]) -> Self {
        Locator::path(segments)
    }
}

impl From<Vec<&str>> for Locator {
    fn from(segments: Vec<&str>) -> Self {
        Locator::path(segments)
    }
}

impl From<Vec<String>> for Locator {
    fn from(segments: Vec<String>) -> Self {
        Locator::Path(segments)
    }
}
