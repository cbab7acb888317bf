//! Data source abstractions and implementations.
//!
//! Every source kind is built by a `SourceProvider`. The registry maps the
//! `type` field of a source definition onto a provider, and the `Catalog`
//! turns a whole `sources.yaml` into named, queryable models.
//!
//! # Supported Sources
//!
//! | Source Type | Implementation | Description |
//! |-------------|----------------|-------------|
//! | `sql`       | `SqlSourceProvider` | SQLite tables, native joins on a shared connection |
//! | `http`      | `RestSourceProvider` | Paginated JSON APIs |
//! | `csv`       | `FileSourceProvider` | Delimited files with a header row |
//! | `fixed_width` | `FileSourceProvider` | Fixed-length columns, one record per line |
//!
//! # Adding a New Source
//!
//! 1. Implement `anyquery_core::Adapter` for the new source.
//! 2. Create a struct implementing `SourceProvider` that builds it from config.
//! 3. Register the provider in `default_registry` in this module.

use anyquery_common::config::{AppConfig, SourceConfig, SourcesConfig};
use anyquery_core::{Adapter, Model, ModelSchema};
use anyquery_error::{source_not_found, ErrorCode, QueryError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

pub mod csv;
pub mod file;
pub mod fixed_width;
pub mod pagination;
pub mod rest;
pub mod sql;
pub mod transport;

#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Returns the type of source this provider handles (e.g., "sql", "http")
    fn type_name(&self) -> &'static str;

    /// Builds the adapter for one source definition
    async fn build(&self, config: &SourceConfig, settings: &AppConfig) -> Result<Arc<dyn Adapter>>;
}

#[derive(Default)]
pub struct SourceRegistry {
    providers: HashMap<&'static str, Box<dyn SourceProvider>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SourceRegistry {
    pub fn register_provider(&mut self, provider: Box<dyn SourceProvider>) {
        self.providers.insert(provider.type_name(), provider);
    }

    pub async fn build_model(&self, config: &SourceConfig, settings: &AppConfig) -> Result<Model> {
        let type_name = match config.source_type.as_str() {
            "csv" | "fixed_width" | "fixed_length" => "file",
            "sqlite" => "sql",
            "rest" => "http",
            other => other,
        };

        let Some(provider) = self.providers.get(type_name) else {
            let mut known: Vec<&str> = self.providers.keys().copied().collect();
            known.sort_unstable();
            return Err(QueryError::new(
                ErrorCode::UnsupportedSourceType,
                format!(
                    "No provider found for source type '{}' (source '{}')",
                    config.source_type, config.name
                ),
            )
            .with_hint(format!("Known source types: {}", known.join(", "))));
        };

        let adapter = provider.build(config, settings).await?;
        tracing::info!(
            "Registered source '{}' ({}) via {} provider",
            config.name,
            adapter.kind(),
            provider.type_name()
        );
        Ok(Model::new(ModelSchema::from(config), adapter)
            .with_batch_size(settings.fanout.batch_size))
    }
}

pub fn default_registry() -> SourceRegistry {
    let mut registry = SourceRegistry::new();
    registry.register_provider(Box::new(sql::SqlSourceProvider::default()));
    registry.register_provider(Box::new(file::FileSourceProvider));
    registry.register_provider(Box::new(rest::RestSourceProvider));

    registry
}

/// Named models built from a sources file.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    models: BTreeMap<String, Model>,
}

impl Catalog {
    pub async fn from_config(sources: &SourcesConfig, settings: &AppConfig) -> Result<Self> {
        let registry = default_registry();
        let mut catalog = Self::default();
        for source in &sources.sources {
            if catalog.models.contains_key(&source.name) {
                return Err(QueryError::new(
                    ErrorCode::InvalidConfig,
                    format!("Source '{}' is defined more than once", source.name),
                ));
            }
            let model = registry.build_model(source, settings).await?;
            catalog.insert(model);
        }
        Ok(catalog)
    }

    pub async fn from_file(path: impl AsRef<Path>, settings: &AppConfig) -> Result<Self> {
        let sources = SourcesConfig::from_file(path)?;
        Self::from_config(&sources, settings).await
    }

    pub fn get(&self, name: &str) -> Result<&Model> {
        self.models
            .get(name)
            .ok_or_else(|| source_not_found(name, &self.names()))
    }

    pub fn names(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    pub fn insert(&mut self, model: Model) {
        self.models.insert(model.name().to_string(), model);
    }
}
