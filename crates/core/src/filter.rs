//! Filter predicates and the in-memory scan-and-keep fallback.

use crate::locator::Locator;
use anyquery_common::{Record, Value};
use anyquery_error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Eq(Value),
    In(Vec<Value>),
}

impl Condition {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Condition::Eq(expected) => value == expected,
            Condition::In(candidates) => candidates.contains(value),
        }
    }
}

/// A conjunction of `(locator, condition)` pairs.
#[derive(Debug, Clone, Default)]
pub struct Predicate {
    pub conditions: Vec<(Locator, Condition)>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, locator: impl Into<Locator>, value: impl Into<Value>) -> Self {
        self.conditions
            .push((locator.into(), Condition::Eq(value.into())));
        self
    }

    pub fn is_in<I, V>(mut self, locator: impl Into<Locator>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.conditions.push((
            locator.into(),
            Condition::In(values.into_iter().map(Into::into).collect()),
        ));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, record: &Record) -> Result<bool> {
        for (locator, condition) in &self.conditions {
            if !condition.matches(&locator.resolve(record)?) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// True when every condition targets a plain top-level column.
    pub fn is_key_only(&self) -> bool {
        self.conditions.iter().all(|(l, _)| l.as_key().is_some())
    }
}

impl<K, V> FromIterator<(K, V)> for Predicate
where
    K: Into<Locator>,
    V: Into<Value>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Predicate::new(), |p, (k, v)| p.eq(k, v))
    }
}

/// Keep the records for which every predicate holds.
pub fn fallback_filter(records: Vec<Record>, filters: &[Predicate]) -> Result<Vec<Record>> {
    if filters.iter().all(Predicate::is_empty) {
        return Ok(records);
    }

    let mut kept = Vec::with_capacity(records.len());
    for record in records {
        let mut keep = true;
        for predicate in filters {
            if !predicate.matches(&record)? {
                keep = false;
                break;
            }
        }
        if keep {
            kept.push(record);
        }
    }
    Ok(kept)
}
