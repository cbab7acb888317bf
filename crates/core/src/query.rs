//! The query builder and execution façade.
//!
//! A [`Query`] is an immutable description of what to fetch. Every builder
//! call returns a modified copy and leaves the receiver untouched; nothing is
//! fetched until [`Query::to_list`], [`Query::rows`] or [`Query::find`].
//!
//! Whatever the call order, materialization always runs load, filters,
//! limit, joins, projection.

use crate::adapter::LoadRequest;
use crate::filter::Predicate;
use crate::join::Join;
use crate::locator::Locator;
use crate::model::Model;
use crate::row::{Materialized, Row};
use anyquery_common::{Record, Value};
use anyquery_error::{ErrorCode, QueryError, Result};

#[derive(Debug, Clone)]
pub struct Query {
    model: Model,
    filters: Vec<Predicate>,
    select: Vec<Locator>,
    limit: Option<usize>,
    joins: Vec<Join>,
}

impl Query {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            filters: Vec::new(),
            select: Vec::new(),
            limit: None,
            joins: Vec::new(),
        }
    }

    /// Keep rows where every `(locator, value)` pair matches.
    pub fn filter<I, K, V>(&self, conditions: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Locator>,
        V: Into<Value>,
    {
        self.filter_predicate(conditions.into_iter().collect())
    }

    /// Keep rows whose `locator` resolves to one of `values`.
    pub fn filter_in<I, V>(&self, locator: impl Into<Locator>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.filter_predicate(Predicate::new().is_in(locator, values))
    }

    pub fn filter_predicate(&self, predicate: Predicate) -> Self {
        let mut next = self.clone();
        next.filters.push(predicate);
        next
    }

    /// Append to the projection; the result becomes tuples.
    pub fn select<I, L>(&self, locators: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Locator>,
    {
        let mut next = self.clone();
        next.select.extend(locators.into_iter().map(Into::into));
        next
    }

    /// Replace the row limit.
    pub fn limit(&self, limit: usize) -> Self {
        let mut next = self.clone();
        next.limit = Some(limit);
        next
    }

    pub fn joins(&self, join: Join) -> Self {
        let mut next = self.clone();
        next.joins.push(join);
        next
    }

    /// Re-fetch every listed row through the source's single-record path.
    pub fn with_single(&self) -> Self {
        self.joins(Join::self_detail())
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.filters
    }

    pub fn projection(&self) -> &[Locator] {
        &self.select
    }

    pub fn row_limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn join_specs(&self) -> &[Join] {
        &self.joins
    }

    pub async fn to_list(&self) -> Result<Materialized> {
        let request = LoadRequest {
            select: self.select.clone(),
            joins: self.joins.clone(),
            filters: self.filters.clone(),
            limit: self.limit,
            batch_size: self.model.batch_size(),
        };
        tracing::debug!(
            "Loading {} via {} adapter ({} filters, {} joins, limit {:?})",
            self.model.name(),
            self.model.adapter().kind(),
            request.filters.len(),
            request.joins.len(),
            request.limit
        );
        self.model
            .adapter()
            .load(self.model.schema(), request)
            .await
    }

    /// Materialize as rows; fails when a select list is present.
    pub async fn rows(&self) -> Result<Vec<Row>> {
        if !self.select.is_empty() {
            return Err(QueryError::new(
                ErrorCode::ProjectionMismatch,
                format!(
                    "Query on {} selects {} fields and yields tuples, not rows",
                    self.model.name(),
                    self.select.len()
                ),
            )
            .with_hint("Use to_list() to read projected tuples"));
        }
        self.to_list().await?.into_rows()
    }

    pub async fn records(&self) -> Result<Vec<Record>> {
        Ok(self.rows().await?.into_iter().map(Row::into_record).collect())
    }

    /// Fetch one record by primary key, resolving this query's joins.
    pub async fn find(&self, id: impl Into<Value>) -> Result<Option<Row>> {
        self.model
            .adapter()
            .load_single(
                self.model.schema(),
                id.into(),
                self.joins.clone(),
                self.model.batch_size(),
            )
            .await
    }
}
