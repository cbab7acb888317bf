//! Common types and configuration shared across anyquery crates.
//!
//! - **Values**: the dynamically typed `Value`/`Record` model every adapter produces (`value`).
//! - **Sources**: declarative source definitions read from YAML (`models`).
//! - **Configuration**: application settings with env overrides (`config`).
//! - **Telemetry**: tracing subscriber setup for binaries (`telemetry`).
pub mod config;
pub mod models;
pub mod telemetry;
pub mod value;

pub use value::{record, Record, Value};
