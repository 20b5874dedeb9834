//! Database drivers.
//!
//! - [`sqlite`]: read-only reader for the legacy store
//! - [`postgres`]: DDL and conflict-tolerant inserts on the destination

pub mod common;
pub mod postgres;
pub mod sqlite;

pub use postgres::PostgresWriter;
pub use sqlite::SqliteReader;
