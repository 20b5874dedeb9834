//! Core abstractions shared by the drivers and the migration engine.
//!
//! - [`schema`]: declarative table and column descriptors
//! - [`catalog`]: the nine tables of the moderation bot
//! - [`value`]: legacy values, source rows and typed destination values
//! - [`traits`]: the reader/writer seams the orchestrator drives

pub mod catalog;
pub mod schema;
pub mod traits;
pub mod value;

pub use schema::{ColumnDefault, ColumnSpec, ColumnType, TableSpec};
pub use traits::{InsertOutcome, SourceReader, TargetWriter};
pub use value::{LegacyValue, SourceRow, SqlNullType, SqlValue};
