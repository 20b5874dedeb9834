//! Shared fixtures: a seeded legacy SQLite file and an in-memory destination.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlite_pg_migrate::{
    Config, InsertOutcome, MigrateError, Orchestrator, Result, SourceReader, SourceRow,
    SqlValue, SqliteReader, TableSpec, TargetWriter,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use tempfile::TempDir;

/// Legacy tables as the bot created them.
pub const LEGACY_SCHEMA: &[&str] = &[
    "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, discord_id TEXT NOT NULL, \
     username TEXT NOT NULL, discriminator TEXT, guild_id TEXT NOT NULL, \
     permission_level INTEGER DEFAULT 1, joined_at DATETIME, created_at DATETIME, updated_at DATETIME)",
    "CREATE TABLE guild_settings (id INTEGER PRIMARY KEY AUTOINCREMENT, guild_id TEXT NOT NULL, \
     prefix TEXT, welcome_channel_id TEXT, mod_log_channel_id TEXT, auto_roles TEXT, \
     automod_enabled INTEGER, spam_threshold INTEGER, created_at DATETIME, updated_at DATETIME)",
    "CREATE TABLE warnings (id INTEGER PRIMARY KEY AUTOINCREMENT, user_id TEXT, guild_id TEXT, \
     moderator_id TEXT, reason TEXT, active INTEGER DEFAULT 1, created_at DATETIME)",
    "CREATE TABLE moderation_logs (id INTEGER PRIMARY KEY AUTOINCREMENT, action TEXT, user_id TEXT, \
     guild_id TEXT, moderator_id TEXT, reason TEXT, duration INTEGER, message_id TEXT, \
     channel_id TEXT, created_at DATETIME)",
];

/// The remaining append-only legacy tables.
pub const ACTIVITY_SCHEMA: &[&str] = &[
    "CREATE TABLE automod_violations (id INTEGER PRIMARY KEY AUTOINCREMENT, user_id TEXT, \
     guild_id TEXT, violation_type TEXT, message_content TEXT, action_taken TEXT, severity TEXT, \
     metadata TEXT, created_at DATETIME)",
    "CREATE TABLE muted_users (id INTEGER PRIMARY KEY AUTOINCREMENT, user_id TEXT, guild_id TEXT, \
     moderator_id TEXT, reason TEXT, expires_at DATETIME, created_at DATETIME)",
    "CREATE TABLE command_usage (id INTEGER PRIMARY KEY AUTOINCREMENT, command_name TEXT, \
     user_id TEXT, guild_id TEXT, channel_id TEXT, success INTEGER, execution_time INTEGER, \
     error_message TEXT, used_at DATETIME)",
    "CREATE TABLE security_events (id INTEGER PRIMARY KEY AUTOINCREMENT, event_type TEXT, \
     user_id TEXT, guild_id TEXT, severity TEXT, details TEXT, action_taken TEXT, \
     resolved INTEGER, resolved_by TEXT, resolved_at DATETIME, created_at DATETIME)",
    "CREATE TABLE user_activity (id INTEGER PRIMARY KEY AUTOINCREMENT, user_id TEXT, guild_id TEXT, \
     activity_type TEXT, channel_id TEXT, metadata TEXT, suspicion_score INTEGER, created_at DATETIME)",
];

/// Create a SQLite file in `dir` and run `statements` against it.
pub async fn seed_legacy_db(dir: &TempDir, statements: &[&str]) -> PathBuf {
    let path = dir.path().join("bot.db");
    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await.unwrap();
    for statement in statements {
        sqlx::query(statement).execute(&pool).await.unwrap();
    }
    pool.close().await;
    path
}

/// Open the legacy file the way the orchestrator does.
pub async fn open_source(path: &Path) -> Option<Box<dyn SourceReader>> {
    SqliteReader::open_path(path)
        .await
        .unwrap()
        .map(|reader| Box::new(reader) as Box<dyn SourceReader>)
}

pub fn test_config() -> Config {
    Config::with_database_url("postgres://bot@localhost/bot")
}

/// Run one full migration of `path` into `target`.
pub async fn run_once(path: &Path, target: &MemoryTarget) -> sqlite_pg_migrate::MigrationReport {
    let orchestrator = Orchestrator::with_parts(
        test_config(),
        Box::new(target.clone()),
        open_source(path).await,
    );
    orchestrator.run().await.unwrap()
}

#[derive(Default)]
struct MemoryState {
    schema_creations: usize,
    table_creations: usize,
    tables: HashMap<String, Vec<Vec<SqlValue>>>,
    closed: bool,
}

/// Destination kept in memory, enforcing unique keys like `ON CONFLICT DO NOTHING`.
#[derive(Clone, Default)]
pub struct MemoryTarget {
    state: Arc<Mutex<MemoryState>>,
    fail_create: Option<&'static str>,
    misshapen: Option<&'static str>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// A target whose `create_table` fails for `table`.
    pub fn failing_on(table: &'static str) -> Self {
        Self {
            fail_create: Some(table),
            ..Self::default()
        }
    }

    /// A target where `table` already exists with columns the insert does not
    /// match: preparing the insert fails and every single row would be refused.
    pub fn with_misshapen(table: &'static str) -> Self {
        Self {
            misshapen: Some(table),
            ..Self::default()
        }
    }

    pub fn rows(&self, table: &str) -> Vec<Vec<SqlValue>> {
        let state = self.state.lock().unwrap();
        state.tables.get(table).cloned().unwrap_or_default()
    }

    pub fn count(&self, table: &str) -> usize {
        self.rows(table).len()
    }

    pub fn table_names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut names: Vec<_> = state.tables.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn schema_creations(&self) -> usize {
        self.state.lock().unwrap().schema_creations
    }

    pub fn table_creations(&self) -> usize {
        self.state.lock().unwrap().table_creations
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

#[async_trait]
impl TargetWriter for MemoryTarget {
    async fn create_schema(&self) -> Result<()> {
        self.state.lock().unwrap().schema_creations += 1;
        Ok(())
    }

    async fn create_table(&self, table: &TableSpec) -> Result<()> {
        if self.fail_create == Some(table.name) {
            return Err(MigrateError::pool("permission denied", "creating table"));
        }
        let mut state = self.state.lock().unwrap();
        state.table_creations += 1;
        state.tables.entry(table.name.to_string()).or_default();
        Ok(())
    }

    async fn prepare_insert(&self, table: &TableSpec) -> Result<()> {
        if self.misshapen == Some(table.name) {
            return Err(MigrateError::transfer(
                table.name,
                "preparing insert failed: column \"username\" does not exist",
            ));
        }
        Ok(())
    }

    async fn insert_row(&self, table: &TableSpec, values: &[SqlValue]) -> Result<InsertOutcome> {
        if self.misshapen == Some(table.name) {
            return Err(MigrateError::translate(table.name, "username", "column does not exist"));
        }
        let mut state = self.state.lock().unwrap();
        let rows = state
            .tables
            .get_mut(table.name)
            .ok_or_else(|| MigrateError::transfer(table.name, "relation does not exist"))?;

        if let Some(key) = table.unique_key {
            let idx = table
                .columns
                .iter()
                .position(|c| c.name == key)
                .unwrap();
            if rows.iter().any(|row| row[idx] == values[idx]) {
                return Ok(InsertOutcome::Conflict);
            }
        }

        rows.push(values.to_vec());
        Ok(InsertOutcome::Inserted)
    }

    async fn row_count(&self, table: &str) -> Result<Option<i64>> {
        let state = self.state.lock().unwrap();
        Ok(state.tables.get(table).map(|rows| rows.len() as i64))
    }

    fn db_type(&self) -> &str {
        "memory"
    }

    async fn close(&self) {
        self.state.lock().unwrap().closed = true;
    }
}

/// Legacy reader whose extraction of one table always fails.
pub struct FailingSource {
    inner: SqliteReader,
    broken: &'static str,
}

impl FailingSource {
    pub async fn open(path: &Path, broken: &'static str) -> Self {
        let inner = SqliteReader::open_path(path).await.unwrap().unwrap();
        Self { inner, broken }
    }
}

#[async_trait]
impl SourceReader for FailingSource {
    async fn fetch_table(&self, table: &str) -> Result<Option<Vec<SourceRow>>> {
        if table == self.broken {
            return Err(MigrateError::Source(sqlx::Error::Protocol(
                "database disk image is malformed".into(),
            )));
        }
        self.inner.fetch_table(table).await
    }

    async fn row_count(&self, table: &str) -> Result<Option<i64>> {
        self.inner.row_count(table).await
    }

    fn db_type(&self) -> &str {
        "sqlite"
    }

    async fn close(&self) {
        self.inner.close().await;
    }
}
