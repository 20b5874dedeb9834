//! # sqlite-pg-migrate
//!
//! One-shot migration of the moderation bot's legacy SQLite store into
//! PostgreSQL.
//!
//! - **Schema provisioning** of the nine bot tables with their defaults and
//!   unique keys, safe to repeat
//! - **Conflict-tolerant copy**: `users` and `guild_settings` keep the first
//!   row per key, the other tables are append-only
//! - **Per-table outcomes**: a missing or broken table never stops the others
//!
//! ## Example
//!
//! ```rust,no_run
//! use sqlite_pg_migrate::{Config, Orchestrator};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let orchestrator = Orchestrator::new(config).await?;
//!     let report = orchestrator.run().await?;
//!     println!("Inserted {} rows", report.rows_inserted);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod orchestrator;
pub mod transfer;

// Re-exports for convenient access
pub use config::{Config, MigrationConfig, SourceConfig, TargetConfig};
pub use crate::core::{
    catalog, ColumnDefault, ColumnSpec, ColumnType, InsertOutcome, LegacyValue, SourceReader,
    SourceRow, SqlNullType, SqlValue, TableSpec, TargetWriter,
};
pub use drivers::{PostgresWriter, SqliteReader};
pub use error::{MigrateError, Result};
pub use orchestrator::{
    MigrationReport, Orchestrator, Phase, SkipReason, TableCounts, TableOutcome, TableReport,
};
pub use transfer::{translate_row, TransferEngine, TransferStats};
