//! PostgreSQL target writer implementation.
//!
//! Implements the `TargetWriter` trait on a deadpool-postgres pool capped at a
//! single connection, so the run holds exactly one destination session.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use tokio_postgres::types::ToSql;
use tokio_postgres::Config as PgConfig;
use tracing::{debug, info, warn};

use crate::config::TargetConfig;
use crate::core::schema::TableSpec;
use crate::core::traits::{InsertOutcome, TargetWriter};
use crate::core::value::{SqlNullType, SqlValue};
use crate::drivers::common::{SslMode, TlsBuilder};
use crate::error::{MigrateError, Result};

use super::dialect::PostgresDialect;

/// TCP keepalive idle time for the destination session.
const KEEPALIVE_IDLE: Duration = Duration::from_secs(30);

/// PostgreSQL target writer implementation.
pub struct PostgresWriter {
    pool: Pool,
    dialect: PostgresDialect,
}

impl PostgresWriter {
    /// Connect to the destination described by `config`.
    ///
    /// Fails if the connection string is invalid or no session can be opened.
    pub async fn new(config: &TargetConfig) -> Result<Self> {
        let (pg_config, ssl_mode) = connect_options(config)?;

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let pool = match TlsBuilder::new(ssl_mode).build()? {
            None => {
                warn!("PostgreSQL TLS is disabled. Credentials will be transmitted in plaintext.");
                let mgr = Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config);
                Pool::builder(mgr)
                    .max_size(1)
                    .build()
                    .map_err(|e| MigrateError::pool(e, "creating PostgreSQL target pool"))?
            }
            Some(tls) => {
                let mgr = Manager::from_config(pg_config, tls, mgr_config);
                Pool::builder(mgr)
                    .max_size(1)
                    .build()
                    .map_err(|e| MigrateError::pool(e, "creating PostgreSQL target pool"))?
            }
        };

        // Test connection
        {
            let client = pool
                .get()
                .await
                .map_err(|e| MigrateError::pool(e, "connecting to PostgreSQL target"))?;
            client.simple_query("SELECT 1").await?;
        }

        info!(
            "Connected to PostgreSQL target: {} (schema {})",
            config.redacted_url(),
            config.schema
        );

        Ok(Self {
            pool,
            dialect: PostgresDialect::new(config.schema.clone()),
        })
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    async fn client(&self) -> Result<Object> {
        self.pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e, "getting PostgreSQL connection"))
    }

    async fn table_exists(&self, client: &Object, table: &str) -> Result<bool> {
        let sql = r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = $1 AND table_name = $2
            )
        "#;

        let row = client
            .query_one(sql, &[&self.dialect.schema(), &table])
            .await?;
        Ok(row.get::<_, bool>(0))
    }
}

#[async_trait]
impl TargetWriter for PostgresWriter {
    async fn create_schema(&self) -> Result<()> {
        let client = self.client().await?;
        client.execute(&self.dialect.create_schema_sql(), &[]).await?;

        debug!("Ensured schema '{}'", self.dialect.schema());
        Ok(())
    }

    async fn create_table(&self, table: &TableSpec) -> Result<()> {
        let client = self.client().await?;

        let ddl = self.dialect.create_table_sql(table);
        debug!("{}", ddl);
        client.execute(&ddl, &[]).await?;

        debug!("Ensured table {}.{}", self.dialect.schema(), table.name);
        Ok(())
    }

    async fn prepare_insert(&self, table: &TableSpec) -> Result<()> {
        let client = self.client().await?;
        let sql = self.dialect.insert_sql(table);
        client.prepare_cached(&sql).await.map_err(|e| {
            MigrateError::transfer(table.name, format!("preparing insert failed: {}", e))
        })?;

        debug!("Prepared insert for {}.{}", self.dialect.schema(), table.name);
        Ok(())
    }

    async fn insert_row(&self, table: &TableSpec, values: &[SqlValue]) -> Result<InsertOutcome> {
        if values.len() != table.columns.len() {
            return Err(MigrateError::transfer(
                table.name,
                format!(
                    "expected {} values, got {}",
                    table.columns.len(),
                    values.len()
                ),
            ));
        }

        let client = self.client().await?;
        let stmt = client.prepare_cached(&self.dialect.insert_sql(table)).await?;

        let params: Vec<Box<dyn ToSql + Sync + Send>> =
            values.iter().map(sql_value_to_param).collect();
        let refs: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let affected = client.execute(&stmt, &refs).await?;
        Ok(if affected == 0 {
            InsertOutcome::Conflict
        } else {
            InsertOutcome::Inserted
        })
    }

    async fn row_count(&self, table: &str) -> Result<Option<i64>> {
        let client = self.client().await?;
        if !self.table_exists(&client, table).await? {
            return Ok(None);
        }

        let row = client.query_one(&self.dialect.count_sql(table), &[]).await?;
        Ok(Some(row.get::<_, i64>(0)))
    }

    fn db_type(&self) -> &str {
        "postgres"
    }

    async fn close(&self) {
        self.pool.close();
        debug!("Closed PostgreSQL target pool");
    }
}

/// Parse the connection string and apply the session settings from `config`.
///
/// An explicit `ssl_mode` wins over the URL's `sslmode`; the default `prefer`
/// defers to it. A `connect_timeout` in the URL wins over `connect_timeout_secs`.
fn connect_options(config: &TargetConfig) -> Result<(PgConfig, SslMode)> {
    let mut pg_config: PgConfig = config.url.parse().map_err(|e| {
        MigrateError::Config(format!(
            "Invalid target.url '{}': {}",
            config.redacted_url(),
            e
        ))
    })?;

    let ssl_mode = match SslMode::parse(&config.ssl_mode)? {
        SslMode::Prefer => SslMode::from_pg(pg_config.get_ssl_mode()),
        explicit => explicit,
    };
    pg_config.ssl_mode(ssl_mode.to_pg());

    pg_config.keepalives(true);
    pg_config.keepalives_idle(KEEPALIVE_IDLE);
    if pg_config.get_connect_timeout().is_none() {
        pg_config.connect_timeout(Duration::from_secs(config.connect_timeout_secs));
    }

    Ok((pg_config, ssl_mode))
}

/// Convert a SqlValue to a typed parameter matching its destination column.
fn sql_value_to_param(value: &SqlValue) -> Box<dyn ToSql + Sync + Send> {
    match value {
        SqlValue::Null(SqlNullType::Bool) => Box::new(None::<bool>),
        SqlValue::Null(SqlNullType::I32) => Box::new(None::<i32>),
        SqlValue::Null(SqlNullType::String) => Box::new(None::<String>),
        SqlValue::Null(SqlNullType::DateTime) => Box::new(None::<NaiveDateTime>),
        SqlValue::Null(SqlNullType::Json) => Box::new(None::<serde_json::Value>),
        SqlValue::Bool(b) => Box::new(*b),
        SqlValue::I32(n) => Box::new(*n),
        SqlValue::String(s) => Box::new(s.clone()),
        SqlValue::DateTime(dt) => Box::new(*dt),
        SqlValue::Json(v) => Box::new(v.clone()),
    }
}
