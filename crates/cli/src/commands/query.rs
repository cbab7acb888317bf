//! The `query` command: run one query against one source.
//!
//! Filters are applied before the limit, joins are not exposed on the command
//! line. `--find` short-circuits to the single-record path.

use super::helpers::{load_catalog, parse_filter, parse_scalar, parse_select};
use crate::output::{self, human_lines, record_line, OutputFormat};
use anyhow::Result;
use anyquery_common::config::AppConfig;
use anyquery_core::{Materialized, Model, Query, Row};
use owo_colors::OwoColorize;
use serde::Serialize;

pub struct QueryArgs<'a> {
    pub source: &'a str,
    pub file: &'a str,
    pub filters: &'a [String],
    pub select: Option<&'a str>,
    pub limit: Option<usize>,
    pub find: Option<&'a str>,
}

#[derive(Serialize)]
struct QueryOutput<'a> {
    source: &'a str,
    count: usize,
    rows: Materialized,
}

#[derive(Serialize)]
struct FindOutput<'a> {
    source: &'a str,
    found: bool,
    row: Option<Row>,
}

/// Apply command-line arguments to a fresh query on `model`.
pub fn build_query(model: &Model, args: &QueryArgs<'_>) -> Result<Query> {
    let mut query = model.all();
    for raw in args.filters {
        query = query.filter_predicate(parse_filter(raw)?);
    }
    if let Some(select) = args.select {
        query = query.select(parse_select(select)?);
    }
    if let Some(limit) = args.limit {
        query = query.limit(limit);
    }
    Ok(query)
}

pub async fn query(args: QueryArgs<'_>, settings: &AppConfig, format: OutputFormat) -> Result<()> {
    let catalog = load_catalog(args.file, settings).await?;
    let model = catalog.get(args.source)?;

    if let Some(id) = args.find {
        let row = model.find(parse_scalar(id)).await?;
        if format.is_machine_readable() {
            return output::print_success(
                format,
                FindOutput {
                    source: args.source,
                    found: row.is_some(),
                    row,
                },
            );
        }
        match row {
            Some(row) => println!("{}", record_line(row.attributes())),
            None => println!("{} {} has no record {}", "Not found:".yellow(), args.source.bold(), id),
        }
        return Ok(());
    }

    let query = build_query(model, &args)?;
    let rows = query.to_list().await?;

    if format.is_machine_readable() {
        return output::print_success(
            format,
            QueryOutput {
                source: args.source,
                count: rows.len(),
                rows,
            },
        );
    }

    for line in human_lines(&rows, query.projection()) {
        println!("{}", line);
    }
    println!(
        "{} {} from {}",
        rows.len().to_string().bold(),
        if rows.len() == 1 { "row" } else { "rows" },
        args.source.cyan()
    );
    Ok(())
}
