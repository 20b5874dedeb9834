//! Per-table transfer: read a full legacy table, translate each row and write
//! it to the destination one row at a time.

mod translate;

pub use translate::translate_row;

use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::core::schema::TableSpec;
use crate::core::traits::{InsertOutcome, SourceReader, TargetWriter};
use crate::core::value::SourceRow;
use crate::error::Result;

/// Statistics from a table transfer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferStats {
    /// Rows read from the legacy table.
    pub rows_read: u64,

    /// Rows written to the destination.
    pub inserted: u64,

    /// Rows skipped because their unique key already existed.
    pub duplicates: u64,

    /// Rows that could not be translated or were refused by the destination.
    pub rejected: u64,

    /// Time spent reading the legacy table.
    pub read_time: Duration,

    /// Time spent translating and writing rows.
    pub write_time: Duration,
}

/// Moves rows of one table at a time from the legacy store to the destination.
pub struct TransferEngine<'a> {
    source: &'a dyn SourceReader,
    target: &'a dyn TargetWriter,
    migrated_at: NaiveDateTime,
}

impl<'a> TransferEngine<'a> {
    /// Create an engine; `migrated_at` replaces `NOW()` defaults.
    pub fn new(
        source: &'a dyn SourceReader,
        target: &'a dyn TargetWriter,
        migrated_at: NaiveDateTime,
    ) -> Self {
        Self {
            source,
            target,
            migrated_at,
        }
    }

    /// Transfer a whole table.
    ///
    /// Returns `Ok(None)` when the table is absent from the legacy store.
    /// Row-level failures are counted in `rejected`; any other failure ends
    /// the table with an error.
    pub async fn execute(&self, table: &TableSpec) -> Result<Option<TransferStats>> {
        let read_start = Instant::now();
        let rows = match self.source.fetch_table(table.name).await? {
            Some(rows) => rows,
            None => return Ok(None),
        };

        let mut stats = TransferStats {
            rows_read: rows.len() as u64,
            read_time: read_start.elapsed(),
            ..Default::default()
        };
        debug!("{}: read {} rows in {:?}", table.name, stats.rows_read, stats.read_time);

        let write_start = Instant::now();
        self.target.prepare_insert(table).await?;
        for (index, row) in rows.iter().enumerate() {
            match self.write_row(table, row).await {
                Ok(InsertOutcome::Inserted) => stats.inserted += 1,
                Ok(InsertOutcome::Conflict) => stats.duplicates += 1,
                Err(e) if e.is_row_level() => {
                    warn!("{}: row {} rejected: {}", table.name, index + 1, e);
                    stats.rejected += 1;
                }
                Err(e) => return Err(e),
            }
        }
        stats.write_time = write_start.elapsed();

        Ok(Some(stats))
    }

    async fn write_row(&self, table: &TableSpec, row: &SourceRow) -> Result<InsertOutcome> {
        let values = translate_row(table, row, self.migrated_at)?;
        self.target.insert_row(table, &values).await
    }
}
