//! Structured output handling for CLI commands.

use anyquery_common::{Record, Value};
use anyquery_core::{Locator, Materialized};
use serde::Serialize;

#[derive(clap::ValueEnum, Clone, Debug, Default, PartialEq, Eq, Copy)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Returns true if the output format is intended for machine consumption
    pub fn is_machine_readable(&self) -> bool {
        match self {
            OutputFormat::Human => false,
            OutputFormat::Json | OutputFormat::Yaml => true,
        }
    }
}

/// Helper struct for JSON output responses
#[derive(Serialize)]
pub struct CommandResponse<T> {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(flatten)]
    pub data: T,
}

impl<T> CommandResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: None,
            exit_code: Some(0),
            data,
        }
    }

    pub fn error(message: String, exit_code: i32, data: T) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message),
            exit_code: Some(exit_code),
            data,
        }
    }
}

/// Render a serializable value in a machine format.
pub fn render<T: Serialize>(format: OutputFormat, data: &T) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Human | OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::Yaml => serde_yaml::to_string(data)?,
    })
}

/// Print a structured success response for machine outputs
pub fn print_success<T: Serialize>(format: OutputFormat, data: T) -> anyhow::Result<()> {
    if format == OutputFormat::Human {
        return Ok(());
    }

    println!("{}", render(format, &CommandResponse::success(data))?);
    Ok(())
}

/// Print a structured error response for machine outputs
/// Note: In Human mode, errors are printed to stderr by main's error handler.
pub fn print_error<T: Serialize + Default>(
    format: OutputFormat,
    message: &str,
    exit_code: i32,
) -> anyhow::Result<()> {
    if format == OutputFormat::Human {
        return Ok(());
    }

    let response = CommandResponse::error(message.to_string(), exit_code, T::default());
    println!("{}", render(format, &response)?);
    Ok(())
}

/// One line per row: `key=value` pairs for rows, tab-separated values for
/// projected tuples (preceded by a header of the selected locators).
pub fn human_lines(result: &Materialized, select: &[Locator]) -> Vec<String> {
    match result {
        Materialized::Rows(rows) => rows
            .iter()
            .map(|row| record_line(row.attributes()))
            .collect(),
        Materialized::Tuples(tuples) => {
            let header = select
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\t");
            std::iter::once(header)
                .chain(tuples.iter().map(|tuple| {
                    tuple
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("\t")
                }))
                .collect()
        }
    }
}

pub fn record_line(record: &Record) -> String {
    record
        .iter()
        .map(|(key, value)| format!("{}={}", key, compact(value)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn compact(value: &Value) -> String {
    match value {
        Value::List(_) | Value::Record(_) => {
            serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
        }
        other => other.to_string(),
    }
}
