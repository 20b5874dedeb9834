//! Row and value types exchanged between the legacy reader and the writer.

use chrono::NaiveDateTime;

use super::schema::ColumnType;

/// A value as stored in the legacy SQLite file (dynamic storage classes).
#[derive(Debug, Clone, PartialEq)]
pub enum LegacyValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl LegacyValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, LegacyValue::Null)
    }

    /// SQLite storage class name, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            LegacyValue::Null => "NULL",
            LegacyValue::Integer(_) => "INTEGER",
            LegacyValue::Real(_) => "REAL",
            LegacyValue::Text(_) => "TEXT",
            LegacyValue::Blob(_) => "BLOB",
        }
    }
}

impl From<i64> for LegacyValue {
    fn from(v: i64) -> Self {
        LegacyValue::Integer(v)
    }
}

impl From<f64> for LegacyValue {
    fn from(v: f64) -> Self {
        LegacyValue::Real(v)
    }
}

impl From<&str> for LegacyValue {
    fn from(v: &str) -> Self {
        LegacyValue::Text(v.to_string())
    }
}

impl From<String> for LegacyValue {
    fn from(v: String) -> Self {
        LegacyValue::Text(v)
    }
}

impl<T: Into<LegacyValue>> From<Option<T>> for LegacyValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(LegacyValue::Null, Into::into)
    }
}

/// One legacy row: field names in store order with their values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRow {
    fields: Vec<(String, LegacyValue)>,
}

impl SourceRow {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<LegacyValue>) -> Self {
        self.push(name, value);
        self
    }

    /// Append a field.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<LegacyValue>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Value of the named field. SQLite column names are case-insensitive.
    pub fn get(&self, name: &str) -> Option<&LegacyValue> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the row has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Type hint for NULL values so the writer binds the right parameter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlNullType {
    Bool,
    I32,
    String,
    DateTime,
    Json,
}

impl From<ColumnType> for SqlNullType {
    fn from(ty: ColumnType) -> Self {
        match ty {
            ColumnType::VarChar(_) | ColumnType::Text => SqlNullType::String,
            ColumnType::Integer => SqlNullType::I32,
            ColumnType::Boolean => SqlNullType::Bool,
            ColumnType::Timestamp => SqlNullType::DateTime,
            ColumnType::Jsonb => SqlNullType::Json,
        }
    }
}

/// A value coerced to its destination column type.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL with type hint for parameter binding.
    Null(SqlNullType),
    Bool(bool),
    I32(i32),
    String(String),
    DateTime(NaiveDateTime),
    Json(serde_json::Value),
}

impl SqlValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null(_))
    }
}
