//! Argument parsing shared by the query commands.
use anyhow::{bail, Context, Result};
use anyquery_common::config::AppConfig;
use anyquery_common::Value;
use anyquery_connectors::Catalog;
use anyquery_core::{Locator, Predicate};

/// Interpret a command-line token: `null`, `true`/`false`, integers and
/// plain decimals are typed, anything else stays a string.
pub fn parse_scalar(raw: &str) -> Value {
    match raw {
        "null" => return Value::Null,
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Int(i);
    }
    let numeric = !raw.is_empty()
        && raw
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == '-');
    match raw.parse::<f64>() {
        Ok(f) if numeric => Value::Float(f),
        _ => Value::from(raw),
    }
}

/// `a` is a key, `a.b.c` a nested path.
pub fn parse_locator(raw: &str) -> Locator {
    let segments: Vec<&str> = raw.split('.').collect();
    if segments.len() == 1 {
        Locator::key(raw)
    } else {
        Locator::path(segments)
    }
}

/// `key=value` is an equality, `key=v1,v2` a membership test.
pub fn parse_filter(raw: &str) -> Result<Predicate> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("Invalid filter argument '{}': expected key=value", raw);
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("Invalid filter argument '{}': empty key", raw);
    }

    let locator = parse_locator(key);
    Ok(if value.contains(',') {
        Predicate::new().is_in(locator, value.split(',').map(|v| parse_scalar(v.trim())))
    } else {
        Predicate::new().eq(locator, parse_scalar(value.trim()))
    })
}

pub fn parse_select(raw: &str) -> Result<Vec<Locator>> {
    let locators: Vec<Locator> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_locator)
        .collect();
    if locators.is_empty() {
        bail!("Invalid select argument '{}': no fields named", raw);
    }
    Ok(locators)
}

pub async fn load_catalog(file: &str, settings: &AppConfig) -> Result<Catalog> {
    let catalog = Catalog::from_file(file, settings)
        .await
        .with_context(|| format!("Failed to load sources from {}", file))?;
    tracing::debug!("Loaded {} sources from {}", catalog.names().len(), file);
    Ok(catalog)
}
