//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Environment variable holding the destination connection string.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Environment variable overriding the legacy store location.
pub const LEGACY_DB_PATH_ENV: &str = "LEGACY_DB_PATH";

/// Environment variable overriding the destination TLS mode.
pub const PG_SSL_MODE_ENV: &str = "PG_SSL_MODE";

/// Where the bot kept its SQLite file.
pub const DEFAULT_LEGACY_DB_PATH: &str = "./database/bot.db";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Legacy store configuration (SQLite).
    #[serde(default)]
    pub source: SourceConfig,

    /// Destination database configuration (PostgreSQL).
    #[serde(default)]
    pub target: TargetConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// Legacy store (SQLite) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path of the SQLite database file (default: ./database/bot.db).
    #[serde(default = "default_legacy_path")]
    pub path: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: default_legacy_path(),
        }
    }
}

/// Destination database (PostgreSQL) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Connection string, URL (`postgres://...`) or key=value form.
    /// Falls back to `DATABASE_URL` when empty.
    #[serde(default)]
    pub url: String,

    /// Target schema (default: "public").
    #[serde(default = "default_public_schema")]
    pub schema: String,

    /// TLS mode (default: "prefer").
    #[serde(default = "default_prefer")]
    pub ssl_mode: String,

    /// Connect timeout in seconds (default: 30).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            schema: default_public_schema(),
            ssl_mode: default_prefer(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl TargetConfig {
    /// Connection string with the password masked, safe for logs.
    pub fn redacted_url(&self) -> String {
        redact_connection_string(&self.url)
    }
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("url", &self.redacted_url())
            .field("schema", &self.schema)
            .field("ssl_mode", &self.ssl_mode)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Tables to migrate (empty = every catalog table).
    #[serde(default)]
    pub include_tables: Vec<String>,

    /// Tables to leave out.
    #[serde(default)]
    pub exclude_tables: Vec<String>,
}

impl MigrationConfig {
    /// Whether rows of `table` should be copied in this run.
    pub fn selects(&self, table: &str) -> bool {
        let included =
            self.include_tables.is_empty() || self.include_tables.iter().any(|t| t == table);
        included && !self.exclude_tables.iter().any(|t| t == table)
    }
}

/// Mask the password of a PostgreSQL connection string.
pub(crate) fn redact_connection_string(conn: &str) -> String {
    const MASK: &str = "[REDACTED]";

    if let Some(scheme_end) = conn.find("://") {
        let (scheme, rest) = conn.split_at(scheme_end + 3);
        let authority_end = rest.find('/').unwrap_or(rest.len());
        if let Some(at) = rest[..authority_end].rfind('@') {
            let userinfo = &rest[..at];
            if let Some(colon) = userinfo.find(':') {
                return format!("{}{}:{}{}", scheme, &userinfo[..colon], MASK, &rest[at..]);
            }
        }
        return conn.to_string();
    }

    conn.split_whitespace()
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if key.eq_ignore_ascii_case("password") => format!("{}={}", key, MASK),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// Default value functions for serde
fn default_legacy_path() -> PathBuf {
    PathBuf::from(DEFAULT_LEGACY_DB_PATH)
}

fn default_public_schema() -> String {
    "public".to_string()
}

fn default_prefer() -> String {
    "prefer".to_string()
}

fn default_connect_timeout() -> u64 {
    30
}
