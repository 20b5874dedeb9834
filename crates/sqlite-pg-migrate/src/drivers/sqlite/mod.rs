//! SQLite legacy store driver.

mod reader;

pub use reader::SqliteReader;
