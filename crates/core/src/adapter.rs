//! The adapter contract and the shared in-memory pipeline steps.
//!
//! Every backend implements [`Adapter`]. Backends that cannot push work down
//! compose the free functions here in the fixed order filter, limit, joins,
//! projection (see [`run_pipeline`]).

use crate::filter::{fallback_filter, Predicate};
use crate::join::{resolve_join, resolve_self_detail, Join};
use crate::locator::Locator;
use crate::row::{Materialized, Row};
use crate::schema::ModelSchema;
use anyquery_common::config::DEFAULT_BATCH_SIZE;
use anyquery_common::{Record, Value};
use anyquery_error::Result;
use async_trait::async_trait;
use std::any::Any;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    Sql,
    Http,
    Csv,
    FixedWidth,
    /// Caller-supplied adapter
    Custom,
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdapterKind::Sql => "sql",
            AdapterKind::Http => "http",
            AdapterKind::Csv => "csv",
            AdapterKind::FixedWidth => "fixed_width",
            AdapterKind::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// Everything a query asks of an adapter for one load.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub select: Vec<Locator>,
    pub joins: Vec<Join>,
    pub filters: Vec<Predicate>,
    pub limit: Option<usize>,
    pub batch_size: usize,
}

impl Default for LoadRequest {
    fn default() -> Self {
        Self {
            select: Vec::new(),
            joins: Vec::new(),
            filters: Vec::new(),
            limit: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[async_trait]
pub trait Adapter: Send + Sync + fmt::Debug {
    fn kind(&self) -> AdapterKind;

    fn as_any(&self) -> &dyn Any;

    async fn load(&self, schema: &ModelSchema, request: LoadRequest) -> Result<Materialized>;

    /// Fetch one record by primary key.
    ///
    /// `batch_size` bounds the fan-out of any join resolved on the result.
    async fn load_single(
        &self,
        schema: &ModelSchema,
        id: Value,
        joins: Vec<Join>,
        batch_size: usize,
    ) -> Result<Option<Row>> {
        let request = LoadRequest {
            filters: vec![Predicate::new().eq(schema.primary_key.as_str(), id)],
            limit: Some(1),
            joins,
            batch_size,
            ..LoadRequest::default()
        };
        Ok(self.load(schema, request).await?.into_rows()?.into_iter().next())
    }

    /// Whether a join against `other` can run inside this backend.
    fn can_push_down_with(&self, _other: &dyn Adapter) -> bool {
        false
    }
}

pub fn apply_limit(mut records: Vec<Record>, limit: Option<usize>) -> Vec<Record> {
    if let Some(limit) = limit {
        records.truncate(limit);
    }
    records
}

/// Resolve detail re-fetches first, then every other join in order.
pub async fn resolve_joins(
    adapter: &dyn Adapter,
    schema: &ModelSchema,
    mut records: Vec<Record>,
    joins: &[Join],
    batch_size: usize,
) -> Result<Vec<Record>> {
    if let Some(detail) = joins.iter().find(|j| j.is_self_detail()) {
        let batch_size = detail.batch_size.unwrap_or(batch_size);
        records = resolve_self_detail(adapter, schema, records, batch_size).await?;
    }
    for join in joins.iter().filter(|j| !j.is_self_detail()) {
        records = resolve_join(records, join, batch_size).await?;
    }
    Ok(records)
}

pub fn instantiate(records: Vec<Record>) -> Vec<Row> {
    records.into_iter().map(Row::new).collect()
}

/// Rows when `select` is empty, otherwise one tuple per record in select order.
pub fn project(records: Vec<Record>, select: &[Locator]) -> Result<Materialized> {
    if select.is_empty() {
        return Ok(Materialized::Rows(instantiate(records)));
    }
    let tuples = records
        .iter()
        .map(|record| {
            select
                .iter()
                .map(|locator| locator.resolve(record))
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Materialized::Tuples(tuples))
}

/// Filter, limit, join and project records an adapter loaded itself.
pub async fn run_pipeline(
    adapter: &dyn Adapter,
    schema: &ModelSchema,
    records: Vec<Record>,
    request: LoadRequest,
) -> Result<Materialized> {
    let records = fallback_filter(records, &request.filters)?;
    let records = apply_limit(records, request.limit);
    let records = resolve_joins(adapter, schema, records, &request.joins, request.batch_size).await?;
    project(records, &request.select)
}
