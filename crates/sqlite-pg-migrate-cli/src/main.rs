//! sqlite-pg-migrate CLI - move the moderation bot's SQLite data into PostgreSQL.

use clap::{Parser, Subcommand};
use sqlite_pg_migrate::config::{DATABASE_URL_ENV, LEGACY_DB_PATH_ENV, PG_SSL_MODE_ENV};
use sqlite_pg_migrate::{Config, MigrateError, MigrationReport, Orchestrator, TableCounts};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "sqlite-pg-migrate")]
#[command(about = "Migrate the moderation bot's legacy SQLite store to PostgreSQL")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file (default: environment only)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path of the legacy SQLite database
    #[arg(long, global = true, env = LEGACY_DB_PATH_ENV)]
    source_path: Option<PathBuf>,

    /// Destination connection string (fills an empty target.url in the config file)
    #[arg(long, global = true, env = DATABASE_URL_ENV, hide_env_values = true)]
    database_url: Option<String>,

    /// Override target schema
    #[arg(long, global = true)]
    target_schema: Option<String>,

    /// Output JSON result to stdout
    #[arg(long, global = true)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, global = true, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision the schema and migrate every table (default)
    Run {
        /// Dry run: report legacy row counts without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Create the destination schema and tables only
    Provision,

    /// Compare row counts between the legacy store and PostgreSQL
    Validate,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| MigrateError::Config(e.to_string()))?;

    let config = load_config(&cli)?;

    match cli.command.unwrap_or(Commands::Run { dry_run: false }) {
        Commands::Run { dry_run: true } => {
            let orchestrator = Orchestrator::new(config).await?;
            let counts = orchestrator.dry_run().await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&counts)?);
            } else {
                println!("\nDry run completed! Nothing was written.");
                print_counts(&counts, false);
            }
        }

        Commands::Run { dry_run: false } => {
            let orchestrator = Orchestrator::new(config).await?;
            let report = orchestrator.run().await?;

            if cli.output_json {
                println!("{}", report.to_json()?);
            } else {
                print_report(&report);
            }
        }

        Commands::Provision => {
            let schema = config.target.schema.clone();
            Orchestrator::new(config).await?.provision().await?;
            println!("Schema '{}' provisioned", schema);
        }

        Commands::Validate => {
            let orchestrator = Orchestrator::new(config).await?;
            let counts = orchestrator.validate().await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&counts)?);
            } else {
                println!("\nValidation results:");
                print_counts(&counts, true);
            }
        }
    }

    Ok(())
}

/// Build the configuration from the YAML file or the environment, then apply flags.
fn load_config(cli: &Cli) -> Result<Config, MigrateError> {
    let mut config = match &cli.config {
        Some(path) => {
            let config = Config::load_with_fallback_url(path, cli.database_url.clone())?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => {
            let url = cli.database_url.clone().ok_or_else(|| {
                MigrateError::Config(format!(
                    "{} is not set (use --database-url, a .env file or --config)",
                    DATABASE_URL_ENV
                ))
            })?;
            let mut config = Config::with_database_url(url);
            if let Ok(mode) = std::env::var(PG_SSL_MODE_ENV) {
                config.target.ssl_mode = mode;
            }
            config
        }
    };

    if let Some(path) = &cli.source_path {
        config.source.path = path.clone();
    }
    if let Some(schema) = &cli.target_schema {
        config.target.schema = schema.clone();
    }

    config.validate()?;
    Ok(config)
}

fn print_report(report: &MigrationReport) {
    let status_msg = if report.tables_failed > 0 {
        "Migration completed with errors."
    } else {
        "Migration completed!"
    };
    println!("\n{}", status_msg);
    println!("  Run ID: {}", report.run_id);
    println!("  Duration: {:.2}s", report.duration_seconds);
    if !report.source_present {
        println!("  Legacy store not found: schema provisioned, no data copied");
    }
    for entry in &report.tables {
        println!("  {:<20} {}", entry.table, entry.outcome);
    }
    println!(
        "  Tables: {} migrated, {} skipped, {} failed (of {})",
        report.tables_migrated, report.tables_skipped, report.tables_failed, report.tables_total
    );
    println!(
        "  Rows: {} read, {} inserted, {} duplicates, {} rejected",
        report.rows_read, report.rows_inserted, report.rows_duplicate, report.rows_rejected
    );
    if !report.failed_tables.is_empty() {
        println!("  Failed tables: {:?}", report.failed_tables);
    }
}

fn print_counts(counts: &[TableCounts], with_target: bool) {
    let show = |n: Option<i64>| n.map_or_else(|| "-".to_string(), |n| n.to_string());

    for c in counts {
        if with_target {
            let status = if c.matches() { "match" } else { "MISMATCH" };
            println!(
                "  {:<20} source={:<8} target={:<8} {}",
                c.table,
                show(c.source_rows),
                show(c.target_rows),
                status
            );
        } else {
            println!("  {:<20} {} rows", c.table, show(c.source_rows));
        }
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("Invalid verbosity '{}'", other)),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("Invalid log format '{}'", other)),
    }

    Ok(())
}
