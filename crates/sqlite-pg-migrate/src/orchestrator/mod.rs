//! Migration orchestrator - main workflow coordinator.
//!
//! A run moves through `Start -> ProvisionSchema -> {ProvisionFailed | MigrateTables} -> Done`.
//! Provisioning errors abort the run; per-table problems are recorded as
//! [`TableOutcome`]s and the next table proceeds. Both stores are released on
//! every exit path.

mod report;

pub use report::{MigrationReport, SkipReason, TableCounts, TableOutcome, TableReport};

use std::fmt;

use chrono::{NaiveDateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::core::catalog;
use crate::core::schema::TableSpec;
use crate::core::traits::{SourceReader, TargetWriter};
use crate::drivers::{PostgresWriter, SqliteReader};
use crate::error::{MigrateError, Result};
use crate::transfer::TransferEngine;

/// Run phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    ProvisionSchema,
    ProvisionFailed,
    MigrateTables,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Start => "start",
            Phase::ProvisionSchema => "provision_schema",
            Phase::ProvisionFailed => "provision_failed",
            Phase::MigrateTables => "migrate_tables",
            Phase::Done => "done",
        };
        f.write_str(s)
    }
}

/// Migration orchestrator.
pub struct Orchestrator {
    config: Config,
    target: Box<dyn TargetWriter>,
    source: Option<Box<dyn SourceReader>>,
    phase: Phase,
}

impl Orchestrator {
    /// Connect to the destination and open the legacy store.
    ///
    /// An unreachable destination is fatal. A missing legacy file is not:
    /// the orchestrator then provisions the schema and skips every table.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let target = PostgresWriter::new(&config.target).await?;

        let source = match SqliteReader::open(&config.source).await {
            Ok(source) => source,
            Err(e) => {
                target.close().await;
                return Err(e);
            }
        };

        let source = source.map(|s| Box::new(s) as Box<dyn SourceReader>);
        Ok(Self::with_parts(config, Box::new(target), source))
    }

    /// Build an orchestrator over already opened stores.
    pub fn with_parts(
        config: Config,
        target: Box<dyn TargetWriter>,
        source: Option<Box<dyn SourceReader>>,
    ) -> Self {
        Self {
            config,
            target,
            source,
            phase: Phase::Start,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether a legacy store was opened.
    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Provision the schema, then migrate every table in catalog order.
    ///
    /// Succeeds iff provisioning succeeded; failed tables are reported in the
    /// result, not as an error.
    pub async fn run(mut self) -> Result<MigrationReport> {
        let outcome = self.execute().await;
        self.close().await;
        outcome
    }

    /// Provision the schema only.
    pub async fn provision(mut self) -> Result<()> {
        let outcome = self.provision_tables().await;
        self.close().await;
        outcome
    }

    /// Report legacy row counts per table without writing anything.
    pub async fn dry_run(mut self) -> Result<Vec<TableCounts>> {
        let outcome = self.count_rows(false).await;
        self.close().await;
        outcome
    }

    /// Compare row counts between the legacy store and the destination.
    pub async fn validate(mut self) -> Result<Vec<TableCounts>> {
        let outcome = self.count_rows(true).await;
        self.close().await;

        if let Ok(counts) = &outcome {
            for c in counts {
                if c.matches() {
                    info!("{}: {} rows (match)", c.table, c.source_rows.unwrap_or(0));
                } else {
                    warn!(
                        "{}: source={} target={} (MISMATCH)",
                        c.table,
                        c.source_rows.unwrap_or(0),
                        c.target_rows.unwrap_or(0)
                    );
                }
            }
        }

        outcome
    }

    async fn execute(&mut self) -> Result<MigrationReport> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        info!("Starting migration run: {}", run_id);

        // Phase 1: Provision schema
        self.enter(Phase::ProvisionSchema);
        if let Err(e) = self.provision_tables().await {
            self.enter(Phase::ProvisionFailed);
            error!("Schema provisioning failed: {}", e);
            return Err(e);
        }

        // Phase 2: Migrate tables
        self.enter(Phase::MigrateTables);
        if self.source.is_none() {
            warn!(
                "No SQLite database found at {}, skipping data migration",
                self.config.source.path.display()
            );
        }

        let migrated_at = started_at.naive_utc();
        let mut tables = Vec::with_capacity(catalog::all().len());
        for table in catalog::all() {
            let outcome = self.migrate_table(table, migrated_at).await;
            match &outcome {
                TableOutcome::Migrated { .. } => info!("{}: {}", table.name, outcome),
                TableOutcome::Skipped { .. } => warn!("{}: {}", table.name, outcome),
                TableOutcome::Failed { .. } => error!("{}: {}", table.name, outcome),
            }
            tables.push(TableReport {
                table: table.name.to_string(),
                outcome,
            });
        }

        self.enter(Phase::Done);
        let report = MigrationReport::new(
            run_id,
            started_at,
            Utc::now(),
            self.source.is_some(),
            tables,
        );

        info!(
            "Migration {}: {} tables ({} migrated, {} skipped, {} failed), {} rows inserted in {:.1}s",
            report.status,
            report.tables_total,
            report.tables_migrated,
            report.tables_skipped,
            report.tables_failed,
            report.rows_inserted,
            report.duration_seconds
        );

        Ok(report)
    }

    fn enter(&mut self, phase: Phase) {
        debug!("Phase {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    /// Create the schema and all tables. Idempotent.
    async fn provision_tables(&self) -> Result<()> {
        let schema = &self.config.target.schema;
        info!("Provisioning schema '{}'", schema);

        self.target
            .create_schema()
            .await
            .map_err(|e| MigrateError::provision(format!("schema {}", schema), e))?;

        for table in catalog::all() {
            debug!("Creating table: {}", table.name);
            self.target
                .create_table(table)
                .await
                .map_err(|e| MigrateError::provision(table.name, e))?;
        }

        info!("Provisioned {} tables", catalog::all().len());
        Ok(())
    }

    async fn migrate_table(&self, table: &TableSpec, migrated_at: NaiveDateTime) -> TableOutcome {
        if !self.config.migration.selects(table.name) {
            return TableOutcome::Skipped {
                reason: SkipReason::Excluded,
            };
        }

        let source = match &self.source {
            Some(source) => source.as_ref(),
            None => {
                return TableOutcome::Skipped {
                    reason: SkipReason::SourceMissing,
                }
            }
        };

        debug!(
            "Migrating {} ({})",
            table.name,
            if table.is_append_only() { "append-only" } else { "keyed" }
        );
        let engine = TransferEngine::new(source, self.target.as_ref(), migrated_at);
        match engine.execute(table).await {
            Ok(Some(stats)) => TableOutcome::from(stats),
            Ok(None) => TableOutcome::Skipped {
                reason: SkipReason::TableMissing,
            },
            Err(e) => TableOutcome::Failed {
                error: e.to_string(),
            },
        }
    }

    async fn count_rows(&self, with_target: bool) -> Result<Vec<TableCounts>> {
        let mut counts = Vec::with_capacity(catalog::all().len());

        for table in catalog::all() {
            if !self.config.migration.selects(table.name) {
                continue;
            }

            let source_rows = match &self.source {
                Some(source) => source.row_count(table.name).await?,
                None => None,
            };
            let target_rows = if with_target {
                self.target.row_count(table.name).await?
            } else {
                None
            };

            counts.push(TableCounts {
                table: table.name.to_string(),
                source_rows,
                target_rows,
            });
        }

        Ok(counts)
    }

    /// Release both stores.
    async fn close(&mut self) {
        if let Some(source) = self.source.take() {
            source.close().await;
        }
        self.target.close().await;
        debug!("Released source and target connections");
    }
}
