//! Core traits for the legacy reader and the destination writer.
//!
//! - [`SourceReader`]: full-table snapshots from the legacy store
//! - [`TargetWriter`]: schema provisioning and row inserts on the destination

use async_trait::async_trait;

use crate::error::Result;

use super::schema::TableSpec;
use super::value::{SourceRow, SqlValue};

/// Result of a single conflict-tolerant insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written.
    Inserted,
    /// The unique key already existed; nothing was written.
    Conflict,
}

/// Read data from the legacy store.
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Fetch every row of a table in store order.
    ///
    /// Returns `Ok(None)` when the table does not exist in the legacy store.
    async fn fetch_table(&self, table: &str) -> Result<Option<Vec<SourceRow>>>;

    /// Count the rows of a table, `Ok(None)` when it does not exist.
    async fn row_count(&self, table: &str) -> Result<Option<i64>>;

    /// Get the database type identifier.
    fn db_type(&self) -> &str;

    /// Release the handle.
    async fn close(&self);
}

/// Write schema and rows to the destination.
#[async_trait]
pub trait TargetWriter: Send + Sync {
    /// Create the target schema if it doesn't exist.
    async fn create_schema(&self) -> Result<()>;

    /// Create a table with its constraints and defaults if it doesn't exist.
    async fn create_table(&self, table: &TableSpec) -> Result<()>;

    /// Check that rows of `table` can be inserted before the first row is sent.
    ///
    /// A failure here concerns the whole table (missing column, no unique
    /// constraint behind the conflict key) and ends it.
    async fn prepare_insert(&self, table: &TableSpec) -> Result<()>;

    /// Insert one row. `values` follow `table.columns` order.
    ///
    /// Tables with a unique key skip conflicting rows silently.
    async fn insert_row(&self, table: &TableSpec, values: &[SqlValue]) -> Result<InsertOutcome>;

    /// Count the rows of a table, `Ok(None)` when it does not exist.
    async fn row_count(&self, table: &str) -> Result<Option<i64>>;

    /// Get the database type identifier.
    fn db_type(&self) -> &str;

    /// Close all connections.
    async fn close(&self);
}
