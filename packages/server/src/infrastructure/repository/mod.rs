//! Persistence gateway implementations.

pub mod sqlite;

pub use sqlite::SqliteStore;
