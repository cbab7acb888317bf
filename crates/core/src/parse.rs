//! Field-level parsing for file backends.
//!
//! Turns one raw text token into a typed [`Value`] according to a
//! [`FieldSpec`]. A token that cannot be parsed is logged and becomes `None`;
//! the caller stores `Null` and keeps the row.

use crate::schema::{FieldSpec, FieldType};
use anyquery_common::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

const DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%Y%m%d%H%M%S",
];

const DATE_LAYOUTS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%Y%m%d",
    "%d %B %Y",
    "%B %d, %Y",
];

/// Parse `raw` as the type declared by `field`.
///
/// `raw == None` means the column or slice was absent and counts as a
/// failure. The field's transform runs only when parsing succeeded.
pub fn parse_field(field: &FieldSpec, raw: Option<&str>) -> Option<Value> {
    let Some(raw) = raw else {
        tracing::warn!(
            "Field '{}' ({}) is missing from the input row",
            field.name,
            field.field_type
        );
        return None;
    };

    match parse_token(field, raw.trim()) {
        Ok(value) => Some(match &field.transform {
            Some(transform) => transform(value),
            None => value,
        }),
        Err(cause) => {
            tracing::warn!(
                "Failed to parse field {:?} from token {:?}: {}",
                field,
                raw,
                cause
            );
            None
        }
    }
}

fn parse_token(field: &FieldSpec, token: &str) -> Result<Value, String> {
    match &field.field_type {
        FieldType::Integer => token
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| e.to_string()),
        FieldType::Float => token
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| e.to_string()),
        FieldType::Decimal => Decimal::from_str(token)
            .map(Value::Decimal)
            .map_err(|e| e.to_string()),
        FieldType::Date => parse_date(token, field.format.as_deref()).map(Value::Date),
        FieldType::DateTime => {
            parse_datetime(token, field.format.as_deref()).map(Value::DateTime)
        }
        FieldType::Boolean => Ok(Value::Bool(token == "true")),
        FieldType::String | FieldType::Other(_) => Ok(Value::String(token.to_string())),
    }
}

fn parse_date(token: &str, format: Option<&str>) -> Result<NaiveDate, String> {
    if let Some(format) = format {
        return NaiveDate::parse_from_str(token, format)
            .or_else(|e| {
                NaiveDateTime::parse_from_str(token, format)
                    .map(|dt| dt.date())
                    .map_err(|_| e)
            })
            .map_err(|e| format!("'{}' does not match '{}': {}", token, format, e));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(token) {
        return Ok(dt.date_naive());
    }
    DATE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDate::parse_from_str(token, layout).ok())
        .or_else(|| {
            DATETIME_LAYOUTS
                .iter()
                .find_map(|layout| NaiveDateTime::parse_from_str(token, layout).ok())
                .map(|dt| dt.date())
        })
        .ok_or_else(|| format!("'{}' is not a recognizable date", token))
}

fn parse_datetime(token: &str, format: Option<&str>) -> Result<DateTime<Utc>, String> {
    if let Some(format) = format {
        if format.contains("%z") || format.contains("%:z") {
            return DateTime::parse_from_str(token, format)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| format!("'{}' does not match '{}': {}", token, format, e));
        }
        return NaiveDateTime::parse_from_str(token, format)
            .map(|dt| dt.and_utc())
            .or_else(|e| {
                NaiveDate::parse_from_str(token, format)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|dt| dt.and_utc())
                    .ok_or(e)
            })
            .map_err(|e| format!("'{}' does not match '{}': {}", token, format, e));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(token) {
        return Ok(dt.with_timezone(&Utc));
    }
    DATETIME_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(token, layout).ok())
        .or_else(|| {
            DATE_LAYOUTS
                .iter()
                .find_map(|layout| NaiveDate::parse_from_str(token, layout).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("'{}' is not a recognizable datetime", token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn field(field_type: FieldType) -> FieldSpec {
        FieldSpec::new("f", field_type)
    }

    #[test]
    fn test_integer_and_float() {
        assert_eq!(
            parse_field(&field(FieldType::Integer), Some(" 42 ")),
            Some(Value::Int(42))
        );
        assert_eq!(parse_field(&field(FieldType::Integer), Some("12abc")), None);
        assert_eq!(
            parse_field(&field(FieldType::Float), Some("1.5")),
            Some(Value::Float(1.5))
        );
        assert_eq!(parse_field(&field(FieldType::Float), Some("")), None);
    }

    #[test]
    fn test_decimal_is_exact() {
        let parsed = parse_field(&field(FieldType::Decimal), Some("0.10")).unwrap();
        assert_eq!(parsed, Value::Decimal(Decimal::from_str("0.10").unwrap()));
        assert_eq!(parsed.to_string(), "0.10");
    }

    #[test]
    fn test_boolean_only_true_is_true() {
        let f = field(FieldType::Boolean);
        assert_eq!(parse_field(&f, Some("true")), Some(Value::Bool(true)));
        assert_eq!(parse_field(&f, Some(" true ")), Some(Value::Bool(true)));
        for token in ["1", "", "TRUE", "yes", "false"] {
            assert_eq!(parse_field(&f, Some(token)), Some(Value::Bool(false)));
        }
    }

    #[test]
    fn test_string_is_trimmed() {
        assert_eq!(
            parse_field(&field(FieldType::String), Some("  hi ")),
            Some(Value::from("hi"))
        );
        assert_eq!(
            parse_field(&field(FieldType::Other("uuid".into())), Some(" abc ")),
            Some(Value::from("abc"))
        );
    }

    #[test]
    fn test_datetime_with_format() {
        let f = field(FieldType::DateTime).format("%Y%m%d%H%M%S");
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        assert_eq!(
            parse_field(&f, Some("20240301123005")),
            Some(Value::DateTime(expected))
        );
        assert_eq!(parse_field(&f, Some("2024-03-01")), None);
    }

    #[test]
    fn test_datetime_with_offset_format() {
        let f = field(FieldType::DateTime).format("%Y-%m-%d %H:%M:%S %z");
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(
            parse_field(&f, Some("2024-03-01 12:00:00 +0200")),
            Some(Value::DateTime(expected))
        );
    }

    #[test]
    fn test_datetime_date_only_format_is_midnight() {
        let f = field(FieldType::DateTime).format("%Y-%m-%d");
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(
            parse_field(&f, Some("2024-03-01")),
            Some(Value::DateTime(expected))
        );
    }

    #[test]
    fn test_permissive_dates() {
        let f = field(FieldType::Date);
        let expected = Value::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(parse_field(&f, Some("2024-03-01")), Some(expected.clone()));
        assert_eq!(parse_field(&f, Some("2024/03/01")), Some(expected.clone()));
        assert_eq!(
            parse_field(&f, Some("2024-03-01T08:00:00Z")),
            Some(expected)
        );
        assert_eq!(parse_field(&f, Some("not a date")), None);
    }

    #[test]
    fn test_transform_runs_on_success_only() {
        let f = field(FieldType::Integer).transform(|v| match v {
            Value::Int(n) => Value::Int(n * 10),
            other => other,
        });
        assert_eq!(parse_field(&f, Some("4")), Some(Value::Int(40)));
        assert_eq!(parse_field(&f, Some("x")), None);
    }

    #[test]
    fn test_missing_token_is_failure() {
        assert_eq!(parse_field(&field(FieldType::String), None), None);
    }
}
