//! Result rows and materialized result sets.

use crate::locator::{resolve, Locator};
use anyquery_common::{Record, Value};
use anyquery_error::{ErrorCode, QueryError, Result};
use serde::Serialize;

/// One result row: a bag of named attributes over a [`Record`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Row {
    attributes: Record,
}

impl Row {
    pub fn new(attributes: Record) -> Self {
        Self { attributes }
    }

    /// Unknown attributes read as `Null`.
    pub fn get(&self, name: &str) -> Value {
        self.attributes.get(name).cloned().unwrap_or_default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn dig(&self, locator: impl Into<Locator>) -> Result<Value> {
        resolve(&self.attributes, &locator.into())
    }

    pub fn attributes(&self) -> &Record {
        &self.attributes
    }

    pub fn into_record(self) -> Record {
        self.attributes
    }
}

impl From<Record> for Row {
    fn from(attributes: Record) -> Self {
        Self::new(attributes)
    }
}

/// A fully materialized result set.
///
/// `Tuples` is produced whenever the query carried a select list; each tuple
/// holds the projected values in select order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Materialized {
    Rows(Vec<Row>),
    Tuples(Vec<Vec<Value>>),
}

impl Materialized {
    pub fn len(&self) -> usize {
        match self {
            Materialized::Rows(rows) => rows.len(),
            Materialized::Tuples(tuples) => tuples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rows(&self) -> Option<&[Row]> {
        match self {
            Materialized::Rows(rows) => Some(rows),
            Materialized::Tuples(_) => None,
        }
    }

    pub fn tuples(&self) -> Option<&[Vec<Value>]> {
        match self {
            Materialized::Rows(_) => None,
            Materialized::Tuples(tuples) => Some(tuples),
        }
    }

    pub fn into_rows(self) -> Result<Vec<Row>> {
        match self {
            Materialized::Rows(rows) => Ok(rows),
            Materialized::Tuples(_) => Err(QueryError::new(
                ErrorCode::ProjectionMismatch,
                "Result was projected into tuples; rows are not available",
            )
            .with_hint("Drop the select list or read the result with tuples()")),
        }
    }

    /// Raw records, one per row; tuples have no field names and are rejected.
    pub fn into_records(self) -> Result<Vec<Record>> {
        Ok(self.into_rows()?.into_iter().map(Row::into_record).collect())
    }
}
