//! Persistence layer for paperhub
//!
//! Provides the SQLite schema and the store implementing every operation.

mod schema;
mod sqlite;

pub use schema::{Schema, SCHEMA_VERSION};
pub use sqlite::SqlitePaperStore;
