use crate::adapter::Adapter;
use crate::query::Query;
use crate::row::Row;
use crate::schema::ModelSchema;
use anyquery_common::config::DEFAULT_BATCH_SIZE;
use anyquery_common::Value;
use anyquery_error::Result;
use std::fmt;
use std::sync::Arc;

/// A queryable source: schema plus the adapter bound to it.
#[derive(Clone)]
pub struct Model {
    schema: Arc<ModelSchema>,
    adapter: Arc<dyn Adapter>,
    batch_size: usize,
}

impl Model {
    pub fn new(schema: ModelSchema, adapter: Arc<dyn Adapter>) -> Self {
        Self {
            schema: Arc::new(schema),
            adapter,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Fan-out width for joins and detail lookups started from this model.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    pub fn adapter(&self) -> &Arc<dyn Adapter> {
        &self.adapter
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn all(&self) -> Query {
        Query::new(self.clone())
    }

    pub async fn find(&self, id: impl Into<Value>) -> Result<Option<Row>> {
        self.adapter
            .load_single(&self.schema, id.into(), Vec::new(), self.batch_size)
            .await
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.schema.name)
            .field("kind", &self.adapter.kind())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}
