//! juris-store - SQLite storage layer
//!
//! This crate provides persistent storage for matters, documents, passages,
//! shares, and conversation history using SQLite with an FTS5 index for
//! ranked keyword search.

mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

// Re-export schema for testing/migrations
pub use schema::SCHEMA;
