//! Per-table outcomes and the run report.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::transfer::TransferStats;

/// Why a table was not migrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The legacy store file does not exist.
    SourceMissing,
    /// The legacy store has no such table.
    TableMissing,
    /// Filtered out by `include_tables`/`exclude_tables`.
    Excluded,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::SourceMissing => "no legacy store",
            SkipReason::TableMissing => "table not in legacy store",
            SkipReason::Excluded => "excluded by configuration",
        };
        f.write_str(s)
    }
}

/// Outcome of migrating one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableOutcome {
    Migrated {
        rows_read: u64,
        inserted: u64,
        duplicates: u64,
        rejected: u64,
    },
    Skipped {
        reason: SkipReason,
    },
    Failed {
        error: String,
    },
}

impl TableOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, TableOutcome::Failed { .. })
    }
}

impl From<TransferStats> for TableOutcome {
    fn from(stats: TransferStats) -> Self {
        TableOutcome::Migrated {
            rows_read: stats.rows_read,
            inserted: stats.inserted,
            duplicates: stats.duplicates,
            rejected: stats.rejected,
        }
    }
}

impl fmt::Display for TableOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableOutcome::Migrated {
                rows_read,
                inserted,
                duplicates,
                rejected,
            } => write!(
                f,
                "migrated {} rows ({} inserted, {} duplicates, {} rejected)",
                rows_read, inserted, duplicates, rejected
            ),
            TableOutcome::Skipped { reason } => write!(f, "skipped: {}", reason),
            TableOutcome::Failed { error } => write!(f, "failed: {}", error),
        }
    }
}

/// Outcome of one table, by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableReport {
    /// Table name.
    pub table: String,

    /// What happened to it.
    #[serde(flatten)]
    pub outcome: TableOutcome,
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status: `completed` or `completed_with_errors`.
    pub status: String,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    /// Whether the legacy store file was found.
    pub source_present: bool,

    /// Total tables processed.
    pub tables_total: usize,

    /// Tables migrated (possibly with rejected rows).
    pub tables_migrated: usize,

    /// Tables skipped.
    pub tables_skipped: usize,

    /// Tables that failed.
    pub tables_failed: usize,

    /// Rows read from the legacy store.
    pub rows_read: u64,

    /// Rows written to the destination.
    pub rows_inserted: u64,

    /// Rows skipped on unique-key conflicts.
    pub rows_duplicate: u64,

    /// Rows rejected by translation or the destination.
    pub rows_rejected: u64,

    /// List of failed table names.
    pub failed_tables: Vec<String>,

    /// Per-table outcomes in migration order.
    pub tables: Vec<TableReport>,
}

impl MigrationReport {
    /// Aggregate per-table outcomes into a report.
    pub fn new(
        run_id: String,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        source_present: bool,
        tables: Vec<TableReport>,
    ) -> Self {
        let mut report = Self {
            run_id,
            status: String::new(),
            duration_seconds: (completed_at - started_at).num_milliseconds() as f64 / 1000.0,
            started_at,
            completed_at,
            source_present,
            tables_total: tables.len(),
            tables_migrated: 0,
            tables_skipped: 0,
            tables_failed: 0,
            rows_read: 0,
            rows_inserted: 0,
            rows_duplicate: 0,
            rows_rejected: 0,
            failed_tables: Vec::new(),
            tables: Vec::new(),
        };

        for entry in &tables {
            match &entry.outcome {
                TableOutcome::Migrated {
                    rows_read,
                    inserted,
                    duplicates,
                    rejected,
                } => {
                    report.tables_migrated += 1;
                    report.rows_read += rows_read;
                    report.rows_inserted += inserted;
                    report.rows_duplicate += duplicates;
                    report.rows_rejected += rejected;
                }
                TableOutcome::Skipped { .. } => report.tables_skipped += 1,
                TableOutcome::Failed { .. } => {
                    report.tables_failed += 1;
                    report.failed_tables.push(entry.table.clone());
                }
            }
        }

        report.status = if report.tables_failed > 0 {
            "completed_with_errors"
        } else {
            "completed"
        }
        .to_string();
        report.tables = tables;
        report
    }

    /// Outcome of a table by name.
    pub fn outcome(&self, table: &str) -> Option<&TableOutcome> {
        self.tables
            .iter()
            .find(|t| t.table == table)
            .map(|t| &t.outcome)
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Row counts of one table in both stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCounts {
    /// Table name.
    pub table: String,

    /// Legacy row count, `None` when the store or table is absent.
    pub source_rows: Option<i64>,

    /// Destination row count, `None` when the table does not exist or was not queried.
    pub target_rows: Option<i64>,
}

impl TableCounts {
    /// Whether both sides hold the same number of rows (absent counts as zero).
    pub fn matches(&self) -> bool {
        self.source_rows.unwrap_or(0) == self.target_rows.unwrap_or(0)
    }
}
