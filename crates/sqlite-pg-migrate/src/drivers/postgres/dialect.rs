//! PostgreSQL SQL generation for provisioning and inserts.

use crate::core::schema::TableSpec;

/// PostgreSQL dialect bound to a target schema.
#[derive(Debug, Clone)]
pub struct PostgresDialect {
    schema: String,
}

impl PostgresDialect {
    /// Create a dialect for the given target schema.
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
        }
    }

    /// Target schema name.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Quote a PostgreSQL identifier.
    pub fn quote_ident(name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Schema-qualified, quoted table name.
    pub fn qualify(&self, table: &str) -> String {
        format!("{}.{}", Self::quote_ident(&self.schema), Self::quote_ident(table))
    }

    /// `CREATE SCHEMA IF NOT EXISTS`.
    pub fn create_schema_sql(&self) -> String {
        format!("CREATE SCHEMA IF NOT EXISTS {}", Self::quote_ident(&self.schema))
    }

    /// Idempotent DDL for a table: surrogate `id`, columns, defaults, unique key.
    pub fn create_table_sql(&self, table: &TableSpec) -> String {
        let mut lines = vec![format!("    {} SERIAL PRIMARY KEY", Self::quote_ident("id"))];

        for col in table.columns {
            let mut line = format!("    {} {}", Self::quote_ident(col.name), col.ty.sql_type());
            if !col.nullable {
                line.push_str(" NOT NULL");
            }
            if table.unique_key == Some(col.name) {
                line.push_str(" UNIQUE");
            }
            if let Some(default) = &col.default {
                line.push_str(" DEFAULT ");
                line.push_str(&default.sql());
            }
            lines.push(line);
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
            self.qualify(table.name),
            lines.join(",\n")
        )
    }

    /// Parameterized insert over every mapped column.
    ///
    /// Keyed tables get `ON CONFLICT (key) DO NOTHING`.
    pub fn insert_sql(&self, table: &TableSpec) -> String {
        let cols: Vec<String> = table
            .column_names()
            .into_iter()
            .map(Self::quote_ident)
            .collect();
        let params: Vec<String> = (1..=cols.len()).map(|i| format!("${}", i)).collect();

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.qualify(table.name),
            cols.join(", "),
            params.join(", ")
        );

        if let Some(key) = table.unique_key {
            sql.push_str(&format!(" ON CONFLICT ({}) DO NOTHING", Self::quote_ident(key)));
        }

        sql
    }

    /// Row count query.
    pub fn count_sql(&self, table: &str) -> String {
        format!("SELECT COUNT(*) FROM {}", self.qualify(table))
    }
}
