//! SQLite legacy store reader.
//!
//! Implements the `SourceReader` trait over a read-only SQLx pool holding a
//! single connection. Values keep SQLite's dynamic storage class; coercion to
//! destination types happens in the transfer layer.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tracing::{debug, info};

use crate::config::SourceConfig;
use crate::core::traits::SourceReader;
use crate::core::value::{LegacyValue, SourceRow};
use crate::error::Result;

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Read-only reader over the legacy SQLite file.
pub struct SqliteReader {
    pool: SqlitePool,
    path: PathBuf,
}

impl SqliteReader {
    /// Open the legacy store read-only.
    ///
    /// Returns `Ok(None)` when the file does not exist: there is no source
    /// data, which is not an error.
    pub async fn open(config: &SourceConfig) -> Result<Option<Self>> {
        Self::open_path(&config.path).await
    }

    /// Open a SQLite file read-only, `Ok(None)` if it does not exist.
    pub async fn open_path(path: &Path) -> Result<Option<Self>> {
        if !path.is_file() {
            info!("No SQLite database found at {}", path.display());
            return Ok(None);
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .create_if_missing(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect_with(options)
            .await?;

        // Test connection
        sqlx::query("SELECT 1").fetch_one(&pool).await?;

        info!("Opened legacy SQLite store (read-only): {}", path.display());

        Ok(Some(Self {
            pool,
            path: path.to_path_buf(),
        }))
    }

    /// Path of the opened file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Quote a SQLite identifier.
    fn quote_ident(name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Check if a table exists.
    async fn table_exists(&self, table: &str) -> Result<bool> {
        let row = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
        )
        .bind(table)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    /// Convert a SQLite row, keeping each value's storage class.
    fn row_to_source(row: &SqliteRow) -> Result<SourceRow> {
        let mut source = SourceRow::new();

        for (i, column) in row.columns().iter().enumerate() {
            let (is_null, storage) = {
                let raw = row.try_get_raw(i)?;
                (raw.is_null(), raw.type_info().name().to_string())
            };

            let value = if is_null {
                LegacyValue::Null
            } else {
                match storage.as_str() {
                    "INTEGER" | "BOOLEAN" => {
                        LegacyValue::Integer(row.try_get_unchecked::<i64, _>(i)?)
                    }
                    "REAL" => LegacyValue::Real(row.try_get_unchecked::<f64, _>(i)?),
                    "BLOB" => LegacyValue::Blob(row.try_get_unchecked::<Vec<u8>, _>(i)?),
                    // SQLite accepts non-UTF-8 bytes in TEXT cells
                    _ => match row.try_get_unchecked::<String, _>(i) {
                        Ok(text) => LegacyValue::Text(text),
                        Err(_) => LegacyValue::Blob(row.try_get_unchecked::<Vec<u8>, _>(i)?),
                    },
                }
            };

            source.push(column.name(), value);
        }

        Ok(source)
    }
}

#[async_trait]
impl SourceReader for SqliteReader {
    async fn fetch_table(&self, table: &str) -> Result<Option<Vec<SourceRow>>> {
        if !self.table_exists(table).await? {
            debug!("Table {} not present in legacy store", table);
            return Ok(None);
        }

        let sql = format!("SELECT * FROM {}", Self::quote_ident(table));
        let rows: Vec<SqliteRow> = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let rows = rows
            .iter()
            .map(Self::row_to_source)
            .collect::<Result<Vec<_>>>()?;

        debug!("Fetched {} rows from {}", rows.len(), table);
        Ok(Some(rows))
    }

    async fn row_count(&self, table: &str) -> Result<Option<i64>> {
        if !self.table_exists(table).await? {
            return Ok(None);
        }

        let sql = format!("SELECT COUNT(*) FROM {}", Self::quote_ident(table));
        let row = sqlx::query(&sql).fetch_one(&self.pool).await?;
        Ok(Some(row.try_get::<i64, _>(0)?))
    }

    fn db_type(&self) -> &str {
        "sqlite"
    }

    async fn close(&self) {
        self.pool.close().await;
        debug!("Closed legacy SQLite store {}", self.path.display());
    }
}
