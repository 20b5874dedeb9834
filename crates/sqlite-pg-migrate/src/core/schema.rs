//! Declarative table descriptors for the destination schema.
//!
//! A [`TableSpec`] drives both DDL generation and the row mapping: each
//! [`ColumnSpec`] names the destination column (read from the same-named
//! legacy field), its type, nullability and default.

use std::fmt;

/// Destination column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// `VARCHAR(n)`.
    VarChar(u16),
    /// `TEXT`.
    Text,
    /// `INTEGER`.
    Integer,
    /// `BOOLEAN`.
    Boolean,
    /// `TIMESTAMP` (without time zone).
    Timestamp,
    /// `JSONB`.
    Jsonb,
}

impl ColumnType {
    /// PostgreSQL type name used in DDL.
    pub fn sql_type(&self) -> String {
        match self {
            ColumnType::VarChar(n) => format!("VARCHAR({})", n),
            ColumnType::Text => "TEXT".to_string(),
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::Boolean => "BOOLEAN".to_string(),
            ColumnType::Timestamp => "TIMESTAMP".to_string(),
            ColumnType::Jsonb => "JSONB".to_string(),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql_type())
    }
}

/// Column default, applied by the database for DDL and by the translator
/// when the legacy value is NULL or missing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnDefault {
    /// `NOW()`; the translator substitutes the migration timestamp.
    Now,
    /// String literal.
    Text(&'static str),
    /// Integer literal.
    Integer(i32),
    /// Boolean literal.
    Boolean(bool),
    /// JSON literal.
    Json(&'static str),
}

impl ColumnDefault {
    /// SQL expression for the `DEFAULT` clause.
    pub fn sql(&self) -> String {
        match self {
            ColumnDefault::Now => "NOW()".to_string(),
            ColumnDefault::Text(s) | ColumnDefault::Json(s) => {
                format!("'{}'", s.replace('\'', "''"))
            }
            ColumnDefault::Integer(n) => n.to_string(),
            ColumnDefault::Boolean(b) => b.to_string(),
        }
    }
}

/// Destination column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnSpec {
    /// Column name in both stores.
    pub name: &'static str,
    /// Destination type.
    pub ty: ColumnType,
    /// Whether the column allows NULL.
    pub nullable: bool,
    /// Default value, if any.
    pub default: Option<ColumnDefault>,
}

impl ColumnSpec {
    /// Nullable column without default, read from the same-named legacy field.
    pub const fn new(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: true,
            default: None,
        }
    }

    /// Mark the column `NOT NULL`.
    pub const fn not_null(self) -> Self {
        Self {
            nullable: false,
            ..self
        }
    }

    /// Attach a default.
    pub const fn default(self, default: ColumnDefault) -> Self {
        Self {
            default: Some(default),
            ..self
        }
    }
}

/// Logical table: name, optional conflict key, ordered columns.
///
/// Every table also gets an `id SERIAL PRIMARY KEY` that is not part of
/// `columns` and is never copied from the legacy store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableSpec {
    /// Table name (same in both stores).
    pub name: &'static str,
    /// Unique column used as the `ON CONFLICT` target. `None` = append-only.
    pub unique_key: Option<&'static str>,
    /// Columns in destination order.
    pub columns: &'static [ColumnSpec],
}

impl TableSpec {
    /// Whether repeated loads are deduplicated by a unique key.
    pub fn is_append_only(&self) -> bool {
        self.unique_key.is_none()
    }

    /// Destination column names in insert order.
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Look up a column by destination name.
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }
}
