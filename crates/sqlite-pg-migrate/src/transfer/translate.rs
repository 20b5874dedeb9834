//! Coercion of legacy SQLite values into destination column types.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::core::schema::{ColumnDefault, ColumnSpec, ColumnType, TableSpec};
use crate::core::value::{LegacyValue, SourceRow, SqlNullType, SqlValue};
use crate::error::{MigrateError, Result};

/// Epoch values above this magnitude are milliseconds, not seconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Translate one legacy row into `table.columns` order.
///
/// Missing fields are NULL. A NULL lands as the column default when there is
/// one, `NOW()` defaults taking `migrated_at`.
pub fn translate_row(
    table: &TableSpec,
    row: &SourceRow,
    migrated_at: NaiveDateTime,
) -> Result<Vec<SqlValue>> {
    table
        .columns
        .iter()
        .map(|col| {
            let value = row.get(col.name).unwrap_or(&LegacyValue::Null);
            translate_value(col, value, migrated_at)
                .map_err(|message| MigrateError::translate(table.name, col.name, message))
        })
        .collect()
}

fn translate_value(
    col: &ColumnSpec,
    value: &LegacyValue,
    migrated_at: NaiveDateTime,
) -> std::result::Result<SqlValue, String> {
    if value.is_null() {
        return match col.default {
            Some(default) => default_value(default, migrated_at),
            None if col.nullable => Ok(SqlValue::Null(SqlNullType::from(col.ty))),
            None => Err("NULL in a NOT NULL column".to_string()),
        };
    }

    match col.ty {
        ColumnType::VarChar(max) => {
            let text = to_text(value)?;
            let len = text.chars().count();
            if len > usize::from(max) {
                return Err(format!("{} characters exceed VARCHAR({})", len, max));
            }
            Ok(SqlValue::String(text))
        }
        ColumnType::Text => to_text(value).map(SqlValue::String),
        ColumnType::Integer => to_i32(value).map(SqlValue::I32),
        ColumnType::Boolean => to_bool(value).map(SqlValue::Bool),
        ColumnType::Timestamp => to_timestamp(value).map(SqlValue::DateTime),
        ColumnType::Jsonb => to_json(value).map(SqlValue::Json),
    }
}

fn default_value(
    default: ColumnDefault,
    migrated_at: NaiveDateTime,
) -> std::result::Result<SqlValue, String> {
    match default {
        ColumnDefault::Now => Ok(SqlValue::DateTime(migrated_at)),
        ColumnDefault::Text(s) => Ok(SqlValue::String(s.to_string())),
        ColumnDefault::Integer(n) => Ok(SqlValue::I32(n)),
        ColumnDefault::Boolean(b) => Ok(SqlValue::Bool(b)),
        ColumnDefault::Json(s) => serde_json::from_str(s)
            .map(SqlValue::Json)
            .map_err(|e| format!("invalid JSON default {}: {}", s, e)),
    }
}

fn unsupported(value: &LegacyValue, target: &str) -> String {
    format!("cannot convert {} value to {}", value.kind(), target)
}

fn to_text(value: &LegacyValue) -> std::result::Result<String, String> {
    match value {
        LegacyValue::Text(s) => Ok(s.clone()),
        // Snowflake IDs are often stored as integers
        LegacyValue::Integer(n) => Ok(n.to_string()),
        LegacyValue::Real(f) => Ok(f.to_string()),
        LegacyValue::Blob(bytes) => {
            String::from_utf8(bytes.clone()).map_err(|_| "BLOB is not valid UTF-8".to_string())
        }
        LegacyValue::Null => Err(unsupported(value, "text")),
    }
}

fn to_i32(value: &LegacyValue) -> std::result::Result<i32, String> {
    let out_of_range = |v: &dyn std::fmt::Display| format!("{} is out of INTEGER range", v);

    match value {
        LegacyValue::Integer(n) => i32::try_from(*n).map_err(|_| out_of_range(n)),
        LegacyValue::Real(f) => real_to_i32(*f),
        LegacyValue::Text(s) => {
            let s = s.trim();
            if let Ok(n) = s.parse::<i64>() {
                return i32::try_from(n).map_err(|_| out_of_range(&n));
            }
            match s.parse::<f64>() {
                Ok(f) => real_to_i32(f),
                Err(_) => Err(format!("'{}' is not an integer", s)),
            }
        }
        _ => Err(unsupported(value, "integer")),
    }
}

fn real_to_i32(f: f64) -> std::result::Result<i32, String> {
    if f.fract() != 0.0 || !f.is_finite() {
        return Err(format!("{} is not integral", f));
    }
    if f < f64::from(i32::MIN) || f > f64::from(i32::MAX) {
        return Err(format!("{} is out of INTEGER range", f));
    }
    Ok(f as i32)
}

fn to_bool(value: &LegacyValue) -> std::result::Result<bool, String> {
    match value {
        LegacyValue::Integer(n) => Ok(*n != 0),
        LegacyValue::Real(f) => Ok(*f != 0.0),
        LegacyValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" | "on" => Ok(true),
            "false" | "f" | "no" | "n" | "0" | "off" => Ok(false),
            other => Err(format!("'{}' is not a boolean", other)),
        },
        _ => Err(unsupported(value, "boolean")),
    }
}

fn to_timestamp(value: &LegacyValue) -> std::result::Result<NaiveDateTime, String> {
    match value {
        LegacyValue::Text(s) => parse_timestamp(s.trim()),
        LegacyValue::Integer(n) => from_epoch(*n as f64),
        LegacyValue::Real(f) => from_epoch(*f),
        _ => Err(unsupported(value, "timestamp")),
    }
}

fn parse_timestamp(s: &str) -> std::result::Result<NaiveDateTime, String> {
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(ts);
        }
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.naive_utc());
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(ts) = date.and_hms_opt(0, 0, 0) {
            return Ok(ts);
        }
    }

    if let Ok(n) = s.parse::<i64>() {
        return from_epoch(n as f64);
    }

    Err(format!("'{}' is not a recognized timestamp", s))
}

fn from_epoch(value: f64) -> std::result::Result<NaiveDateTime, String> {
    if !value.is_finite() {
        return Err(format!("{} is not a valid epoch", value));
    }

    let millis = if value.abs() > EPOCH_MILLIS_THRESHOLD {
        value.round() as i64
    } else {
        (value * 1000.0).round() as i64
    };

    let secs = millis.div_euclid(1000);
    let nanos = (millis.rem_euclid(1000) * 1_000_000) as u32;

    DateTime::from_timestamp(secs, nanos)
        .map(|ts| ts.naive_utc())
        .ok_or_else(|| format!("epoch {} is out of range", value))
}

fn to_json(value: &LegacyValue) -> std::result::Result<serde_json::Value, String> {
    match value {
        LegacyValue::Text(s) => Ok(parse_json_text(s)),
        LegacyValue::Integer(n) => Ok(serde_json::Value::from(*n)),
        LegacyValue::Real(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .ok_or_else(|| format!("{} is not representable in JSON", f)),
        LegacyValue::Blob(bytes) => std::str::from_utf8(bytes)
            .map(parse_json_text)
            .map_err(|_| "BLOB is not valid UTF-8".to_string()),
        LegacyValue::Null => Err(unsupported(value, "json")),
    }
}

/// Parse stored JSON text; free text is kept as a JSON string.
fn parse_json_text(s: &str) -> serde_json::Value {
    serde_json::from_str(s).unwrap_or_else(|_| serde_json::Value::String(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog;
    use serde_json::json;

    fn migrated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn ts(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    fn column(table: &str, name: &str) -> ColumnSpec {
        *catalog::find(table).unwrap().column(name).unwrap()
    }

    fn convert(table: &str, name: &str, value: LegacyValue) -> std::result::Result<SqlValue, String> {
        translate_value(&column(table, name), &value, migrated_at())
    }

    #[test]
    fn test_users_row_with_defaults() {
        let users = catalog::find("users").unwrap();
        let row = SourceRow::new()
            .with("id", 7i64)
            .with("discord_id", "123")
            .with("username", "alice")
            .with("guild_id", "g1")
            .with("permission_level", 2i64);

        let values = translate_row(users, &row, migrated_at()).unwrap();
        assert_eq!(
            values,
            vec![
                SqlValue::String("123".into()),
                SqlValue::String("alice".into()),
                SqlValue::Null(SqlNullType::String),
                SqlValue::String("g1".into()),
                SqlValue::I32(2),
                SqlValue::DateTime(migrated_at()),
                SqlValue::DateTime(migrated_at()),
                SqlValue::DateTime(migrated_at()),
            ]
        );
    }

    #[test]
    fn test_guild_settings_defaults_fill_nulls() {
        let table = catalog::find("guild_settings").unwrap();
        let row = SourceRow::new()
            .with("guild_id", "g1")
            .with("prefix", LegacyValue::Null);

        let values = translate_row(table, &row, migrated_at()).unwrap();
        assert_eq!(values[1], SqlValue::String("!".into()));
        assert_eq!(values[4], SqlValue::Json(json!([])));
        assert_eq!(values[5], SqlValue::Bool(true));
        assert_eq!(values[6], SqlValue::I32(5));
    }

    #[test]
    fn test_missing_required_field_is_rejected() {
        let warnings = catalog::find("warnings").unwrap();
        let row = SourceRow::new().with("user_id", "u1").with("guild_id", "g1");

        let err = translate_row(warnings, &row, migrated_at()).unwrap_err();
        assert!(err.is_row_level());
        assert!(err.to_string().contains("warnings.moderator_id"));
    }

    #[test]
    fn test_integer_ids_become_text() {
        assert_eq!(
            convert("users", "discord_id", LegacyValue::Integer(876543210987654321)).unwrap(),
            SqlValue::String("876543210987654321".into())
        );
    }

    #[test]
    fn test_varchar_length_is_enforced() {
        let long = "x".repeat(21);
        assert!(convert("users", "guild_id", LegacyValue::Text(long)).is_err());
    }

    #[test]
    fn test_blob_text_must_be_utf8() {
        assert_eq!(
            convert("warnings", "reason", LegacyValue::Blob(b"spam".to_vec())).unwrap(),
            SqlValue::String("spam".into())
        );
        assert!(convert("warnings", "reason", LegacyValue::Blob(vec![0xff, 0xfe])).is_err());
    }

    #[test]
    fn test_integer_coercions() {
        let conv = |v| convert("moderation_logs", "duration", v);
        assert_eq!(conv(LegacyValue::Integer(600)).unwrap(), SqlValue::I32(600));
        assert_eq!(conv(LegacyValue::Real(60.0)).unwrap(), SqlValue::I32(60));
        assert_eq!(conv(LegacyValue::Text(" 42 ".into())).unwrap(), SqlValue::I32(42));
        assert!(conv(LegacyValue::Real(1.5)).is_err());
        assert!(conv(LegacyValue::Integer(i64::from(i32::MAX) + 1)).is_err());
        assert!(conv(LegacyValue::Text("soon".into())).is_err());
    }

    #[test]
    fn test_boolean_coercions() {
        let conv = |v| convert("warnings", "active", v);
        assert_eq!(conv(LegacyValue::Integer(0)).unwrap(), SqlValue::Bool(false));
        assert_eq!(conv(LegacyValue::Integer(1)).unwrap(), SqlValue::Bool(true));
        assert_eq!(conv(LegacyValue::Text("TRUE".into())).unwrap(), SqlValue::Bool(true));
        assert_eq!(conv(LegacyValue::Text("off".into())).unwrap(), SqlValue::Bool(false));
        assert!(conv(LegacyValue::Text("maybe".into())).is_err());
        assert!(conv(LegacyValue::Blob(vec![1])).is_err());
    }

    #[test]
    fn test_timestamp_text_formats() {
        let conv = |s: &str| convert("muted_users", "expires_at", LegacyValue::Text(s.into()));
        let expected = ts(2024, 3, 5, 10, 20, 30);

        assert_eq!(conv("2024-03-05 10:20:30").unwrap(), SqlValue::DateTime(expected));
        assert_eq!(conv("2024-03-05T10:20:30").unwrap(), SqlValue::DateTime(expected));
        assert_eq!(conv("2024-03-05T10:20:30.000Z").unwrap(), SqlValue::DateTime(expected));
        assert_eq!(conv("2024-03-05T12:20:30+02:00").unwrap(), SqlValue::DateTime(expected));
        assert_eq!(
            conv("2024-03-05").unwrap(),
            SqlValue::DateTime(ts(2024, 3, 5, 0, 0, 0))
        );
        assert!(conv("next tuesday").is_err());
    }

    #[test]
    fn test_timestamp_fractional_seconds() {
        let value = convert(
            "command_usage",
            "used_at",
            LegacyValue::Text("2024-03-05 10:20:30.250".into()),
        )
        .unwrap();
        let expected = ts(2024, 3, 5, 10, 20, 30) + chrono::Duration::milliseconds(250);
        assert_eq!(value, SqlValue::DateTime(expected));
    }

    #[test]
    fn test_timestamp_from_epoch() {
        let conv = |v| convert("muted_users", "expires_at", v);
        let expected = SqlValue::DateTime(ts(2023, 11, 14, 22, 13, 20));

        assert_eq!(conv(LegacyValue::Integer(1_700_000_000)).unwrap(), expected);
        assert_eq!(conv(LegacyValue::Integer(1_700_000_000_000)).unwrap(), expected);
        assert_eq!(conv(LegacyValue::Real(1_700_000_000.0)).unwrap(), expected);
    }

    #[test]
    fn test_source_timestamps_are_preserved() {
        let table = catalog::find("warnings").unwrap();
        let row = SourceRow::new()
            .with("user_id", "u1")
            .with("guild_id", "g1")
            .with("moderator_id", "m1")
            .with("reason", "spam")
            .with("active", 0i64)
            .with("created_at", "2023-01-02 03:04:05");

        let values = translate_row(table, &row, migrated_at()).unwrap();
        assert_eq!(values[4], SqlValue::Bool(false));
        assert_eq!(values[5], SqlValue::DateTime(ts(2023, 1, 2, 3, 4, 5)));
    }

    #[test]
    fn test_json_coercions() {
        let conv = |v| convert("automod_violations", "metadata", v);
        assert_eq!(
            conv(LegacyValue::Text(r#"{"links":2}"#.into())).unwrap(),
            SqlValue::Json(json!({"links": 2}))
        );
        assert_eq!(
            conv(LegacyValue::Text("free text".into())).unwrap(),
            SqlValue::Json(json!("free text"))
        );
        assert_eq!(conv(LegacyValue::Integer(3)).unwrap(), SqlValue::Json(json!(3)));
        assert_eq!(conv(LegacyValue::Null).unwrap(), SqlValue::Null(SqlNullType::Json));
    }

    #[test]
    fn test_catalog_json_defaults_parse() {
        for table in catalog::all() {
            for col in table.columns {
                if let Some(default) = col.default {
                    assert!(
                        default_value(default, migrated_at()).is_ok(),
                        "default of {}.{}",
                        table.name,
                        col.name
                    );
                }
            }
        }
    }
}
