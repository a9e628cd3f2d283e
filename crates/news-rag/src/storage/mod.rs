//! Storage module for persistent data storage
//!
//! Provides the SQLite-backed vector collection.

mod database;

pub use database::{SqliteVectorIndex, METRIC};
