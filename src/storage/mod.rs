//! Storage Layer - relation graph persistence
//!
//! Two tables back every store:
//! - relation_edges(parent_event_id, child_event_id, rel_type), unique over all three
//! - relation_nodes(event_id, origin_server_ts, room_id), keyed by event_id
//!
//! The engine is picked once from the connection string by [`open_store`].

pub mod schema;
pub mod sqlite;
pub mod writer;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use sqlite::SqliteRelationStore;
pub use writer::ExclusiveWriter;
#[cfg(feature = "postgres")]
pub use postgres::PostgresRelationStore;

use crate::config::DatabaseOptions;
use crate::event::RelationEvent;
use crate::relation::Node;
use crate::Result;

/// Engine family behind a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Embedded, single writer
    Sqlite,
    /// Client/server, multi writer
    Postgres,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Sqlite => "sqlite",
            Backend::Postgres => "postgres",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Persistent parent → child relation graph.
///
/// Implementations are shared across threads; every method blocks the caller
/// until the engine has answered.
pub trait RelationStore: Send + Sync {
    /// Record the relation `event` declares, plus the event's own metadata.
    ///
    /// An event declaring no relation is accepted without touching storage.
    /// Re-storing an existing edge or node is a silent no-op. Both rows are
    /// written in one transaction.
    fn store_relation(&self, event: &dyn RelationEvent) -> Result<()>;

    /// Child event IDs of every edge matching `(parent_event_id, rel_type)`.
    ///
    /// Order is whatever the engine scans in.
    fn children_for_parent(&self, parent_event_id: &str, rel_type: &str) -> Result<Vec<String>>;

    /// The cached metadata row for `event_id`, if one was recorded.
    fn node(&self, event_id: &str) -> Result<Option<Node>>;

    fn stats(&self) -> Result<StoreStats>;

    fn backend(&self) -> Backend;
}

/// Open the store described by `options`, creating the schema if needed.
pub fn open_store(options: &DatabaseOptions) -> Result<Box<dyn RelationStore>> {
    if options.connection_string.is_postgres() {
        return open_postgres(options);
    }
    Ok(Box::new(SqliteRelationStore::open_with_options(options)?))
}

#[cfg(feature = "postgres")]
fn open_postgres(options: &DatabaseOptions) -> Result<Box<dyn RelationStore>> {
    Ok(Box::new(PostgresRelationStore::open(options)?))
}

#[cfg(not(feature = "postgres"))]
fn open_postgres(_options: &DatabaseOptions) -> Result<Box<dyn RelationStore>> {
    Err(crate::Error::Config(
        "postgres connection strings need the `postgres` feature".to_string(),
    ))
}

/// Row counts of both tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub edges: usize,
    pub nodes: usize,
}
