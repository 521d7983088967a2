//! Storage layer: SQLite database wrapper and schema.

pub mod database;
pub mod schema;

pub use database::{Database, DatabaseError};
