//! anyquery CLI: query heterogeneous sources from the command line.
//!
//! Sources are declared in a `sources.yaml` file. Each source becomes a model
//! that can be filtered, limited and projected with the same semantics as the
//! library's query builder.
//!
//! # Commands
//!
//! - `query`: Run a query against one source and print the rows.
//! - `sources`: List the sources declared in a sources file.

use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;

mod commands;
mod exit_codes;
mod output;

use anyquery_common::config::{AppConfig, DEFAULT_SOURCES_FILE};
use anyquery_error::{ErrorCategory, QueryError};

use output::OutputFormat;

#[derive(Parser)]
#[command(name = "anyquery")]
#[command(about = "Query SQL, HTTP, CSV and fixed-width sources", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (human, json, yaml)
    #[arg(long, global = true, value_enum, default_value = "human")]
    output: OutputFormat,

    /// Settings file (logging, fan-out, pagination cap)
    #[arg(long, global = true, env = "ANYQUERY_CONFIG", default_value = "anyquery.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a query against one source
    Query {
        /// The name of the source
        source: String,
        /// Path to the sources.yaml file
        #[arg(long, default_value = DEFAULT_SOURCES_FILE)]
        file: String,
        /// Keep rows where key=value (dotted keys reach into nested records, commas mean any of)
        #[arg(long = "filter")]
        filters: Vec<String>,
        /// Comma-separated fields to project, e.g. id,user.name
        #[arg(long)]
        select: Option<String>,
        /// Maximum number of rows
        #[arg(long)]
        limit: Option<usize>,
        /// Fetch a single record by primary key instead
        #[arg(long, conflicts_with_all = ["filters", "select", "limit"])]
        find: Option<String>,
    },
    /// List the sources declared in a sources file
    Sources {
        /// Path to the sources.yaml file
        #[arg(long, default_value = DEFAULT_SOURCES_FILE)]
        file: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    let settings = AppConfig::from_file(&cli.config)
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {:#}", e))?;
    anyquery_common::telemetry::init_tracing(&settings.logging)?;

    if let Err(e) = run_cli(&cli, &settings).await {
        let exit_code = map_error_to_exit_code(&e);
        tracing::debug!("Command failed with exit code {}: {:#}", exit_code, e);
        if cli.output.is_machine_readable() {
            output::print_error::<()>(cli.output, &format!("{:#}", e), exit_code).ok();
        } else {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
        }
        std::process::exit(exit_code);
    }

    Ok(())
}

fn map_error_to_exit_code(e: &anyhow::Error) -> i32 {
    if let Some(query_err) = e.downcast_ref::<QueryError>() {
        return match query_err.category() {
            ErrorCategory::Source => exit_codes::SOURCE_ERROR,
            ErrorCategory::Config => exit_codes::CONFIG_ERROR,
            ErrorCategory::Query => exit_codes::QUERY_ERROR,
            ErrorCategory::Internal => exit_codes::GENERAL_ERROR,
            _ => exit_codes::GENERAL_ERROR,
        };
    }

    // Fallback: string heuristics for errors raised by the CLI itself
    let s = e.to_string().to_lowercase();
    if s.contains("usage") || s.contains("argument") {
        return exit_codes::USAGE_ERROR;
    }
    if s.contains("config") || s.contains("yaml") {
        return exit_codes::CONFIG_ERROR;
    }
    exit_codes::GENERAL_ERROR
}

async fn run_cli(cli: &Cli, settings: &AppConfig) -> Result<(), anyhow::Error> {
    match &cli.command {
        Commands::Query {
            source,
            file,
            filters,
            select,
            limit,
            find,
        } => {
            commands::query(
                commands::QueryArgs {
                    source,
                    file,
                    filters,
                    select: select.as_deref(),
                    limit: *limit,
                    find: find.as_deref(),
                },
                settings,
                cli.output,
            )
            .await?;
        }
        Commands::Sources { file } => {
            commands::list_sources(file, cli.output)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyquery_error::ErrorCode;

    #[test]
    fn test_cli_parses_query_arguments() {
        let cli = Cli::try_parse_from([
            "anyquery",
            "query",
            "articles",
            "--filter",
            "status=1",
            "--filter",
            "user.name=ada",
            "--select",
            "id,title",
            "--limit",
            "5",
            "--output",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Commands::Query {
                source,
                file,
                filters,
                limit,
                ..
            } => {
                assert_eq!(source, "articles");
                assert_eq!(file, DEFAULT_SOURCES_FILE);
                assert_eq!(filters.len(), 2);
                assert_eq!(limit, Some(5));
            }
            Commands::Sources { .. } => panic!("Wrong command"),
        }
    }

    #[test]
    fn test_find_conflicts_with_filters() {
        assert!(Cli::try_parse_from([
            "anyquery", "query", "articles", "--find", "1", "--filter", "a=b"
        ])
        .is_err());
    }

    #[test]
    fn test_exit_codes_follow_error_category() {
        let code = |e: QueryError| map_error_to_exit_code(&anyhow::Error::from(e));
        assert_eq!(
            code(QueryError::new(ErrorCode::TransportFailed, "down")),
            exit_codes::SOURCE_ERROR
        );
        assert_eq!(
            code(QueryError::new(ErrorCode::InvalidConfig, "bad")),
            exit_codes::CONFIG_ERROR
        );
        assert_eq!(
            code(QueryError::new(ErrorCode::ResolutionFailed, "bad path")),
            exit_codes::QUERY_ERROR
        );

        let wrapped = anyhow::Error::from(QueryError::new(ErrorCode::InvalidYaml, "bad"))
            .context("Failed to load sources from x.yaml");
        assert_eq!(map_error_to_exit_code(&wrapped), exit_codes::CONFIG_ERROR);

        let usage = anyhow::anyhow!("Invalid filter argument 'x': expected key=value");
        assert_eq!(map_error_to_exit_code(&usage), exit_codes::USAGE_ERROR);
    }
}
