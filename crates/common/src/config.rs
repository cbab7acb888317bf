pub use crate::models::{FieldConfig, SourceConfig, SourcesConfig};
use anyhow::{Context, Result};
use serde::Deserialize;
use validator::Validate;

// Default constants
pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const MAX_ITERATIONS: usize = 1000;
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_SOURCES_FILE: &str = "sources.yaml";
pub const ENV_PREFIX: &str = "ANYQUERY";

#[derive(Debug, Deserialize, Default, Clone, Validate)]
pub struct AppConfig {
    #[serde(default)]
    #[validate(nested)]
    pub logging: LoggingConfig,
    #[serde(default)]
    #[validate(nested)]
    pub fanout: FanoutSettings,
    #[serde(default)]
    #[validate(nested)]
    pub http: HttpSettings,
}

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    #[validate(length(min = 1))]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

#[derive(Debug, Deserialize, Clone, Copy, Validate)]
pub struct FanoutSettings {
    /// Upper bound on concurrent lookups during joins
    #[serde(default = "default_batch_size")]
    #[validate(range(min = 1))]
    pub batch_size: usize,
}

impl Default for FanoutSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

#[derive(Debug, Deserialize, Clone, Copy, Validate)]
pub struct HttpSettings {
    /// Per-query page cap; never above MAX_ITERATIONS
    #[serde(default = "default_max_iterations")]
    #[validate(range(min = 1, max = 1000))]
    pub max_iterations: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
        }
    }
}

fn default_max_iterations() -> usize {
    MAX_ITERATIONS
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let builder = config::Config::builder();

        let builder = if std::path::Path::new(path).exists() {
            builder.add_source(config::File::with_name(path))
        } else {
            builder
        };

        // Map ANYQUERY__FANOUT__BATCH_SIZE to fanout.batch_size, etc.
        let builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build().context("Failed to build configuration")?;

        let app_config: AppConfig = cfg
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config
            .validate()
            .map_err(|e| anyhow::anyhow!("Configuration validation failed: {:?}", e))?;

        Ok(app_config)
    }
}
