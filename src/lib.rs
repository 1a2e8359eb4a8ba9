//! # Relstore - Event relationship graph store
//!
//! Persists typed parent → child edges between immutable events and answers
//! "all children of event X with relation type R" lookups.
//!
//! Relstore provides:
//! - Relationship extraction from an event's `m.relationship` content
//! - An edge table plus a node table holding the child event's metadata
//! - Idempotent, transactional writes across both tables
//! - SQLite (embedded, single writer) and PostgreSQL (client/server) backends

pub mod event;
pub mod relation;
pub mod storage;
pub mod config;
pub mod ingest;
pub mod ui;

// Re-exports for convenient access
pub use event::{Event, RelationEvent};
pub use relation::{extract_relation, Node, Relation};
pub use storage::{open_store, Backend, RelationStore, SqliteRelationStore, StoreStats};
pub use config::{ConnectionString, DatabaseOptions};
pub use ingest::{ingest_events, IngestSummary};

/// Result type alias for Relstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Relstore operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error("Postgres error: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),
}
