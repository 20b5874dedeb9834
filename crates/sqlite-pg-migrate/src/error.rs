//! Error types for the migration library.

use thiserror::Error;

/// Exit code for configuration problems (invalid YAML, missing DATABASE_URL, ...).
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Exit code when the destination database cannot be reached.
pub const EXIT_TARGET_ERROR: u8 = 2;
/// Exit code when schema provisioning fails.
pub const EXIT_PROVISION_ERROR: u8 = 3;
/// Exit code when the legacy store exists but cannot be opened.
pub const EXIT_SOURCE_ERROR: u8 = 4;
/// Exit code for file system errors.
pub const EXIT_IO_ERROR: u8 = 7;
/// Exit code for anything else that escapes the run.
pub const EXIT_INTERNAL_ERROR: u8 = 10;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Legacy SQLite store error
    #[error("Source database error: {0}")]
    Source(#[from] sqlx::Error),

    /// Destination PostgreSQL error
    #[error("Target database error: {0}")]
    Target(#[from] tokio_postgres::Error),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// Creating the destination schema failed
    #[error("Schema provisioning failed for {table}: {message}")]
    Provision { table: String, message: String },

    /// A source value could not be coerced into the destination column type
    #[error("Cannot convert {table}.{column}: {message}")]
    Translate {
        table: String,
        column: String,
        message: String,
    },

    /// Data transfer failed for a specific table
    #[error("Transfer failed for table {table}: {message}")]
    Transfer { table: String, message: String },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl ToString, context: impl Into<String>) -> Self {
        MigrateError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a Provision error
    pub fn provision(table: impl Into<String>, message: impl ToString) -> Self {
        MigrateError::Provision {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Create a Translate error
    pub fn translate(
        table: impl Into<String>,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        MigrateError::Translate {
            table: table.into(),
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a Transfer error
    pub fn transfer(table: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Transfer {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Whether the error concerns a single row only.
    ///
    /// Row-level errors are counted as rejected rows and the table keeps going.
    /// On the destination only data exceptions (SQLSTATE class 22) and
    /// constraint violations (class 23) qualify; anything else (undefined
    /// column, lost connection, pool exhaustion) ends the table.
    pub fn is_row_level(&self) -> bool {
        match self {
            MigrateError::Translate { .. } => true,
            MigrateError::Target(e) => e.code().is_some_and(|c| is_row_sqlstate(c.code())),
            _ => false,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) => EXIT_CONFIG_ERROR,
            MigrateError::Target(_) | MigrateError::Pool { .. } => EXIT_TARGET_ERROR,
            MigrateError::Provision { .. } => EXIT_PROVISION_ERROR,
            MigrateError::Source(_) => EXIT_SOURCE_ERROR,
            MigrateError::Io(_) => EXIT_IO_ERROR,
            MigrateError::Translate { .. }
            | MigrateError::Transfer { .. }
            | MigrateError::Json(_) => EXIT_INTERNAL_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// SQLSTATE classes caused by the values of a single row.
fn is_row_sqlstate(code: &str) -> bool {
    code.starts_with("22") || code.starts_with("23")
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(MigrateError::Config("x".into()).exit_code(), EXIT_CONFIG_ERROR);
        assert_eq!(
            MigrateError::pool("refused", "connecting").exit_code(),
            EXIT_TARGET_ERROR
        );
        assert_eq!(
            MigrateError::provision("users", "boom").exit_code(),
            EXIT_PROVISION_ERROR
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert_eq!(MigrateError::from(io).exit_code(), EXIT_IO_ERROR);
    }

    #[test]
    fn test_translate_is_row_level() {
        let err = MigrateError::translate("warnings", "active", "not a boolean");
        assert!(err.is_row_level());
        assert!(!MigrateError::pool("closed", "insert").is_row_level());
        assert!(!MigrateError::transfer("warnings", "lost").is_row_level());
    }

    #[test]
    fn test_row_sqlstates() {
        // not_null_violation, invalid_text_representation
        assert!(is_row_sqlstate("23502"));
        assert!(is_row_sqlstate("22P02"));
        // undefined_column, invalid_column_reference (ON CONFLICT without constraint)
        assert!(!is_row_sqlstate("42703"));
        assert!(!is_row_sqlstate("42P10"));
        // connection_failure
        assert!(!is_row_sqlstate("08006"));
    }

    #[test]
    fn test_format_detailed_includes_message() {
        let err = MigrateError::provision("guild_settings", "relation locked");
        let detailed = err.format_detailed();
        assert!(detailed.starts_with("Error: Schema provisioning failed for guild_settings"));
        assert!(detailed.contains("relation locked"));
    }
}
