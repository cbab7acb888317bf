#![allow(dead_code)]

use anyquery_common::{Record, Value};
use anyquery_core::adapter::{run_pipeline, Adapter, AdapterKind, LoadRequest};
use anyquery_core::join::Join;
use anyquery_core::{Materialized, Model, ModelSchema, Row};
use anyquery_error::Result;
use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Adapter over a fixed list of records, counting every call it serves.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    records: Vec<Record>,
    /// Detail records returned by `load_single`, keyed by primary key.
    details: Option<HashMap<Value, Record>>,
    pub loads: AtomicUsize,
    pub singles: AtomicUsize,
    pub requested_ids: Mutex<Vec<Value>>,
    /// Batch size passed to every `load_single` call.
    pub single_batch_sizes: Mutex<Vec<usize>>,
}

impl MemoryAdapter {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }

    pub fn with_details(records: Vec<Record>, details: Vec<Record>, key: &str) -> Self {
        let details = details
            .into_iter()
            .map(|d| (d.get(key).cloned().unwrap_or_default(), d))
            .collect();
        Self {
            records,
            details: Some(details),
            ..Default::default()
        }
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn single_count(&self) -> usize {
        self.singles.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Custom
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn load(&self, schema: &ModelSchema, request: LoadRequest) -> Result<Materialized> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        run_pipeline(self, schema, self.records.clone(), request).await
    }

    async fn load_single(
        &self,
        schema: &ModelSchema,
        id: Value,
        joins: Vec<Join>,
        batch_size: usize,
    ) -> Result<Option<Row>> {
        self.singles.fetch_add(1, Ordering::SeqCst);
        self.requested_ids.lock().unwrap().push(id.clone());
        self.single_batch_sizes.lock().unwrap().push(batch_size);
        match &self.details {
            Some(details) => Ok(details.get(&id).cloned().map(Row::new)),
            None => {
                let request = LoadRequest {
                    filters: vec![anyquery_core::Predicate::new()
                        .eq(schema.primary_key.as_str(), id)],
                    limit: Some(1),
                    joins,
                    batch_size,
                    ..LoadRequest::default()
                };
                let records = self.records.clone();
                Ok(run_pipeline(self, schema, records, request)
                    .await?
                    .into_rows()?
                    .into_iter()
                    .next())
            }
        }
    }
}

pub fn memory_model(name: &str, records: Vec<Record>) -> (Model, Arc<MemoryAdapter>) {
    let adapter = Arc::new(MemoryAdapter::new(records));
    let model = Model::new(ModelSchema::new(name), adapter.clone());
    (model, adapter)
}
