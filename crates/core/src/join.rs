//! Generic join resolution between independently loaded sources.
//!
//! Foreign keys are collected from the loaded rows, the target is fetched
//! once per strategy through its own adapter, target records are grouped by
//! primary key and the groups are attached to every source row.

use crate::adapter::Adapter;
use crate::fanout::map_concurrently;
use crate::locator::Locator;
use crate::model::Model;
use crate::schema::ModelSchema;
use anyquery_common::{Record, Value};
use anyquery_error::Result;
use futures::future::BoxFuture;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cardinality {
    #[default]
    Single,
    List,
}

/// Caller-supplied fetch: receives the unique foreign keys, returns target records.
pub type BatchResolver = Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<Vec<Record>>> + Send + Sync>;

#[derive(Clone, Default)]
pub enum JoinStrategy {
    /// Query the target with `primary_key IN (keys)`.
    #[default]
    Default,
    /// One `find` per unique key, through the fan-out.
    Single,
    /// Load the whole target once.
    FullScan,
    Custom(BatchResolver),
}

impl JoinStrategy {
    pub fn custom<F, Fut>(f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Vec<Record>>> + Send + 'static,
    {
        JoinStrategy::Custom(Arc::new(move |keys| Box::pin(f(keys))))
    }

    fn name(&self) -> &'static str {
        match self {
            JoinStrategy::Default => "default",
            JoinStrategy::Single => "single",
            JoinStrategy::FullScan => "full_scan",
            JoinStrategy::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for JoinStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
pub enum JoinTarget {
    Model(Model),
    /// Re-fetch every row through its own source's single-record path.
    SelfDetail,
}

#[derive(Debug, Clone)]
pub struct Join {
    pub target: JoinTarget,
    /// Locator on the target records.
    pub primary_key: Locator,
    /// Locator on the source records.
    pub foreign_key: Locator,
    pub into: String,
    pub cardinality: Cardinality,
    pub strategy: JoinStrategy,
    pub batch_size: Option<usize>,
}

impl Join {
    /// Join `target` on `target.primary_key == source.foreign_key`.
    ///
    /// The result lands under the target's name as a single record unless
    /// overridden with [`Join::into_field`] and [`Join::cardinality`].
    pub fn new(
        target: &Model,
        primary_key: impl Into<Locator>,
        foreign_key: impl Into<Locator>,
    ) -> Self {
        Self {
            into: target.name().to_string(),
            target: JoinTarget::Model(target.clone()),
            primary_key: primary_key.into(),
            foreign_key: foreign_key.into(),
            cardinality: Cardinality::default(),
            strategy: JoinStrategy::default(),
            batch_size: None,
        }
    }

    pub fn self_detail() -> Self {
        Self {
            target: JoinTarget::SelfDetail,
            primary_key: Locator::key("id"),
            foreign_key: Locator::key("id"),
            into: String::new(),
            cardinality: Cardinality::Single,
            strategy: JoinStrategy::Single,
            batch_size: None,
        }
    }

    pub fn into_field(mut self, name: impl Into<String>) -> Self {
        self.into = name.into();
        self
    }

    pub fn cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    pub fn strategy(mut self, strategy: JoinStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn is_self_detail(&self) -> bool {
        matches!(self.target, JoinTarget::SelfDetail)
    }

    pub fn target_model(&self) -> Option<&Model> {
        match &self.target {
            JoinTarget::Model(model) => Some(model),
            JoinTarget::SelfDetail => None,
        }
    }
}

/// Attach the targets of `join` to every record.
pub async fn resolve_join(
    records: Vec<Record>,
    join: &Join,
    default_batch_size: usize,
) -> Result<Vec<Record>> {
    let Some(target) = join.target_model() else {
        return Ok(records);
    };
    let batch_size = join.batch_size.unwrap_or(default_batch_size);

    let foreign_keys = records
        .iter()
        .map(|record| join.foreign_key.resolve(record))
        .collect::<Result<Vec<_>>>()?;
    let keys = unique_keys(&foreign_keys);

    tracing::debug!(
        "Resolving join '{}' on {} with {} unique keys ({:?} strategy)",
        join.into,
        target.name(),
        keys.len(),
        join.strategy
    );

    let targets = fetch_targets(target, join, keys, batch_size).await?;
    attach(records, &foreign_keys, targets, join)
}

fn unique_keys(foreign_keys: &[Value]) -> Vec<Value> {
    let mut seen = HashSet::new();
    foreign_keys
        .iter()
        .filter(|key| !key.is_null() && seen.insert(*key))
        .cloned()
        .collect()
}

async fn fetch_targets(
    target: &Model,
    join: &Join,
    keys: Vec<Value>,
    batch_size: usize,
) -> Result<Vec<Record>> {
    match &join.strategy {
        JoinStrategy::Default => {
            if keys.is_empty() {
                return Ok(Vec::new());
            }
            target
                .all()
                .filter_in(join.primary_key.clone(), keys)
                .records()
                .await
        }
        JoinStrategy::Single => {
            let found = map_concurrently(keys, batch_size, |key| target.find(key)).await?;
            Ok(found.into_iter().flatten().map(|row| row.into_record()).collect())
        }
        JoinStrategy::FullScan => target.all().records().await,
        JoinStrategy::Custom(resolver) => resolver(keys).await,
    }
}

fn attach(
    records: Vec<Record>,
    foreign_keys: &[Value],
    targets: Vec<Record>,
    join: &Join,
) -> Result<Vec<Record>> {
    match join.cardinality {
        Cardinality::List => {
            let mut groups: HashMap<Value, Vec<Value>> = HashMap::new();
            for target in targets {
                let key = join.primary_key.resolve(&target)?;
                if key.is_null() {
                    continue;
                }
                groups.entry(key).or_default().push(Value::Record(target));
            }
            Ok(records
                .into_iter()
                .zip(foreign_keys)
                .map(|(mut record, key)| {
                    let group = match key {
                        Value::Null => Vec::new(),
                        key => groups.get(key).cloned().unwrap_or_default(),
                    };
                    record.insert(join.into.clone(), Value::List(group));
                    record
                })
                .collect())
        }
        Cardinality::Single => {
            let mut index: HashMap<Value, Record> = HashMap::new();
            for target in targets {
                let key = join.primary_key.resolve(&target)?;
                if key.is_null() {
                    continue;
                }
                index.insert(key, target);
            }
            Ok(records
                .into_iter()
                .zip(foreign_keys)
                .map(|(mut record, key)| {
                    let entry = match key {
                        Value::Null => Value::Null,
                        key => index
                            .get(key)
                            .cloned()
                            .map(Value::Record)
                            .unwrap_or_default(),
                    };
                    record.insert(join.into.clone(), entry);
                    record
                })
                .collect())
        }
    }
}

/// Replace every record with its detailed version from `load_single`.
///
/// A record whose detail cannot be found is kept as listed.
pub async fn resolve_self_detail(
    adapter: &dyn Adapter,
    schema: &ModelSchema,
    records: Vec<Record>,
    batch_size: usize,
) -> Result<Vec<Record>> {
    let primary_key = Locator::key(schema.primary_key.as_str());
    map_concurrently(records, batch_size, |record| {
        let primary_key = &primary_key;
        async move {
            let id = primary_key.resolve(&record)?;
            match adapter
                .load_single(schema, id.clone(), Vec::new(), batch_size)
                .await?
            {
                Some(detail) => Ok(detail.into_record()),
                None => {
                    tracing::warn!(
                        "No detail found for {} with {} = {}, keeping listed row",
                        schema.name,
                        schema.primary_key,
                        id
                    );
                    Ok(record)
                }
            }
        }
    })
    .await
}
