//! The `sources` command: list the sources declared in a sources file.
use crate::output::{self, OutputFormat};
use anyhow::{Context, Result};
use anyquery_common::config::SourcesConfig;
use owo_colors::OwoColorize;
use serde::Serialize;

#[derive(Serialize)]
struct SourceSummary<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    source_type: &'a str,
    primary_key: &'a str,
    fields: Vec<&'a str>,
}

pub fn list_sources(file: &str, format: OutputFormat) -> Result<()> {
    let config = SourcesConfig::from_file(file)
        .with_context(|| format!("Failed to load sources from {}", file))?;

    let summaries: Vec<SourceSummary<'_>> = config
        .sources
        .iter()
        .map(|s| SourceSummary {
            name: &s.name,
            source_type: &s.source_type,
            primary_key: &s.primary_key,
            fields: s.fields.iter().map(|f| f.name.as_str()).collect(),
        })
        .collect();

    if format.is_machine_readable() {
        #[derive(Serialize)]
        struct Sources<'a> {
            sources: Vec<SourceSummary<'a>>,
        }
        return output::print_success(format, Sources { sources: summaries });
    }

    if summaries.is_empty() {
        println!("No sources configured in {}.", file.yellow());
        return Ok(());
    }
    for summary in &summaries {
        println!(
            "{} {} (Type: {}, Key: {})",
            "Source:".bold().blue(),
            summary.name.bold(),
            summary.source_type.dimmed(),
            summary.primary_key
        );
        if !summary.fields.is_empty() {
            println!("  {} {}", "Fields:".dimmed(), summary.fields.join(", "));
        }
    }
    Ok(())
}
