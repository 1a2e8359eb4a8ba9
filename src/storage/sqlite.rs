//! SQLite storage implementation

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use super::schema;
use super::writer::ExclusiveWriter;
use super::{Backend, RelationStore, StoreStats};
use crate::config::{ensure_db_dir, DatabaseOptions};
use crate::event::RelationEvent;
use crate::relation::{extract_relation, Node};
use crate::{Error, Result};

/// SQLite-backed relation store
///
/// Writes are serialized through one [`ExclusiveWriter`]. File databases run
/// in WAL mode with a second, read-only connection so lookups never queue
/// behind the writer; in-memory databases read through the writer connection.
#[derive(Debug)]
pub struct SqliteRelationStore {
    writer: ExclusiveWriter,
    reader: Option<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteRelationStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_options(&DatabaseOptions::new(format!("file:{}", path.display())))
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::open_with_options(&DatabaseOptions::new(":memory:"))
    }

    pub fn open_with_options(options: &DatabaseOptions) -> Result<Self> {
        if options.connection_string.is_postgres() {
            return Err(Error::Config(format!(
                "not a sqlite connection string: {}",
                options.connection_string
            )));
        }

        let path = options.connection_string.sqlite_path();
        let store = match &path {
            Some(path) => {
                ensure_db_dir(path)?;
                let conn = Connection::open(path)?;
                conn.busy_timeout(options.busy_timeout())?;
                let mode: String =
                    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
                tracing::debug!("sqlite journal mode for {}: {}", path.display(), mode);

                let store = Self {
                    writer: ExclusiveWriter::new(conn),
                    reader: None,
                    path: Some(path.clone()),
                };
                store.initialize_schema()?;

                let reader = Connection::open_with_flags(
                    path,
                    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
                )?;
                reader.busy_timeout(options.busy_timeout())?;
                Self {
                    reader: Some(Mutex::new(reader)),
                    ..store
                }
            }
            None => {
                let store = Self {
                    writer: ExclusiveWriter::new(Connection::open_in_memory()?),
                    reader: None,
                    path: None,
                };
                store.initialize_schema()?;
                store
            }
        };

        tracing::info!(
            "Opened sqlite relation store at {}",
            store.path.as_deref().map(|p| p.display().to_string()).unwrap_or_else(|| ":memory:".to_string())
        );
        Ok(store)
    }

    /// Database file, `None` when in memory
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        self.writer.with_connection(|conn| {
            for stmt in schema::sqlite_schema_statements() {
                conn.execute(stmt, [])?;
            }
            Ok(())
        })
    }

    fn read<T>(&self, work: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        match &self.reader {
            Some(reader) => {
                let conn = reader.lock().unwrap_or_else(PoisonError::into_inner);
                work(&conn)
            }
            None => self.writer.with_connection(work),
        }
    }

    fn count(&self, sql: &str) -> Result<usize> {
        let count: i64 = self.read(|conn| Ok(conn.query_row(sql, [], |row| row.get(0))?))?;
        Ok(count as usize)
    }
}

impl RelationStore for SqliteRelationStore {
    fn store_relation(&self, event: &dyn RelationEvent) -> Result<()> {
        let Some(relation) = extract_relation(Some(event)) else {
            return Ok(());
        };

        let node = Node::from_event(event);
        self.writer.transact(|txn| {
            txn.prepare_cached(schema::SQLITE_INSERT_EDGE)?.execute(params![
                relation.parent_event_id,
                relation.child_event_id,
                relation.rel_type,
            ])?;
            txn.prepare_cached(schema::SQLITE_INSERT_NODE)?.execute(params![
                node.event_id,
                node.origin_server_ts,
                node.room_id,
            ])?;
            Ok(())
        })?;

        tracing::debug!(
            parent = %relation.parent_event_id,
            child = %relation.child_event_id,
            rel_type = %relation.rel_type,
            "stored relation"
        );
        Ok(())
    }

    fn children_for_parent(&self, parent_event_id: &str, rel_type: &str) -> Result<Vec<String>> {
        self.read(|conn| {
            let mut stmt = conn.prepare_cached(schema::SQLITE_SELECT_CHILDREN)?;
            let children = stmt
                .query_map(params![parent_event_id, rel_type], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(children)
        })
    }

    fn node(&self, event_id: &str) -> Result<Option<Node>> {
        self.read(|conn| {
            conn.prepare_cached(schema::SQLITE_SELECT_NODE)?
                .query_row([event_id], |row| {
                    Ok(Node {
                        event_id: row.get(0)?,
                        origin_server_ts: row.get(1)?,
                        room_id: row.get(2)?,
                    })
                })
                .optional()
                .map_err(Into::into)
        })
    }

    fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            edges: self.count(schema::COUNT_EDGES)?,
            nodes: self.count(schema::COUNT_NODES)?,
        })
    }

    fn backend(&self) -> Backend {
        Backend::Sqlite
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use std::collections::HashSet;

    fn relation_event(child: &str, parent: &str, rel_type: &str) -> Event {
        let content = serde_json::json!({
            "body": "hello",
            "m.relationship": { "rel_type": rel_type, "event_id": parent },
        });
        Event::new(child, "!room:example.org", 1_700_000_000_000, content.to_string())
    }

    fn children_set(store: &SqliteRelationStore, parent: &str, rel_type: &str) -> HashSet<String> {
        store.children_for_parent(parent, rel_type).unwrap().into_iter().collect()
    }

    #[test]
    fn test_store_and_lookup() {
        let store = SqliteRelationStore::open_in_memory().unwrap();

        store.store_relation(&relation_event("$b", "$a", "m.reference")).unwrap();

        assert_eq!(store.children_for_parent("$a", "m.reference").unwrap(), vec!["$b"]);
        let node = store.node("$b").unwrap().unwrap();
        assert_eq!(node.room_id, "!room:example.org");
        assert_eq!(node.origin_server_ts, 1_700_000_000_000);
        // parents get no metadata row
        assert_eq!(store.node("$a").unwrap(), None);
    }

    #[test]
    fn test_idempotent_edge_insert() {
        let store = SqliteRelationStore::open_in_memory().unwrap();
        let event = relation_event("$b", "$a", "m.reference");

        store.store_relation(&event).unwrap();
        store.store_relation(&event).unwrap();

        assert_eq!(store.stats().unwrap(), StoreStats { edges: 1, nodes: 1 });
        assert_eq!(store.children_for_parent("$a", "m.reference").unwrap().len(), 1);
    }

    #[test]
    fn test_node_first_write_wins() {
        let store = SqliteRelationStore::open_in_memory().unwrap();
        let first = Event::new(
            "$dup",
            "!first",
            100,
            r#"{"m.relationship": {"rel_type": "m.reference", "event_id": "$p1"}}"#,
        );
        let second = Event::new(
            "$dup",
            "!second",
            200,
            r#"{"m.relationship": {"rel_type": "m.reference", "event_id": "$p2"}}"#,
        );

        store.store_relation(&first).unwrap();
        store.store_relation(&second).unwrap();

        assert_eq!(store.stats().unwrap(), StoreStats { edges: 2, nodes: 1 });
        assert_eq!(
            store.node("$dup").unwrap(),
            Some(Node { event_id: "$dup".into(), origin_server_ts: 100, room_id: "!first".into() })
        );
    }

    #[test]
    fn test_no_relation_is_noop() {
        let store = SqliteRelationStore::open_in_memory().unwrap();

        for content in [r#"{"body": "plain"}"#, "{broken", r#"{"m.relationship": {"rel_type": "m.reference"}}"#] {
            store.store_relation(&Event::new("$x", "!room", 1, content)).unwrap();
        }

        assert_eq!(store.stats().unwrap(), StoreStats { edges: 0, nodes: 0 });
        assert_eq!(store.node("$x").unwrap(), None);
    }

    #[test]
    fn test_type_filtered_lookup() {
        let store = SqliteRelationStore::open_in_memory().unwrap();
        store.store_relation(&relation_event("B", "A", "reference")).unwrap();
        store.store_relation(&relation_event("C", "A", "reference")).unwrap();
        store.store_relation(&relation_event("D", "A", "reply")).unwrap();

        let expected: HashSet<String> = ["B", "C"].iter().map(|s| s.to_string()).collect();
        assert_eq!(children_set(&store, "A", "reference"), expected);
        assert_eq!(store.children_for_parent("A", "reply").unwrap(), vec!["D"]);
    }

    #[test]
    fn test_empty_result_lookup() {
        let store = SqliteRelationStore::open_in_memory().unwrap();
        store.store_relation(&relation_event("B", "A", "reference")).unwrap();

        assert!(store.children_for_parent("A", "unknown-type").unwrap().is_empty());
        assert!(store.children_for_parent("Z", "reference").unwrap().is_empty());
        assert!(store.children_for_parent("", "").unwrap().is_empty());
    }

    #[test]
    fn test_same_child_many_parents_and_types() {
        let store = SqliteRelationStore::open_in_memory().unwrap();
        store.store_relation(&relation_event("$c", "$p", "m.reference")).unwrap();
        store.store_relation(&relation_event("$c", "$p", "m.reply")).unwrap();
        store.store_relation(&relation_event("$c", "$q", "m.reference")).unwrap();

        assert_eq!(store.stats().unwrap(), StoreStats { edges: 3, nodes: 1 });
        assert_eq!(store.children_for_parent("$p", "m.reply").unwrap(), vec!["$c"]);
        assert_eq!(store.children_for_parent("$q", "m.reference").unwrap(), vec!["$c"]);
    }

    #[test]
    fn test_round_trip_arbitrary_ids() {
        let store = SqliteRelationStore::open_in_memory().unwrap();
        let cases = [
            ("$parent:example.org", "$child:example.org", "m.reference"),
            ("p with spaces", "c'quote", "type\"with\"quotes"),
            ("ü", "🧵", "réponse"),
        ];

        for (parent, child, rel_type) in cases {
            store.store_relation(&relation_event(child, parent, rel_type)).unwrap();
            assert!(
                store.children_for_parent(parent, rel_type).unwrap().contains(&child.to_string()),
                "missing {child} under {parent}/{rel_type}"
            );
        }
    }

    #[test]
    fn test_concurrent_identical_writes_converge() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteRelationStore::open(&dir.path().join("relstore.db")).unwrap();
        let event = relation_event("$b", "$a", "m.reference");

        let results: Vec<Result<()>> = crossbeam::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|_| s.spawn(|_| store.store_relation(&event)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        })
        .unwrap();

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(store.stats().unwrap(), StoreStats { edges: 1, nodes: 1 });
    }

    #[test]
    fn test_concurrent_distinct_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteRelationStore::open(&dir.path().join("relstore.db")).unwrap();

        crossbeam::scope(|s| {
            for worker in 0..8 {
                let store = &store;
                s.spawn(move |_| {
                    for i in 0..25 {
                        let child = format!("$child-{worker}-{i}");
                        store.store_relation(&relation_event(&child, "$root", "m.reference")).unwrap();
                    }
                });
            }
        })
        .unwrap();

        assert_eq!(store.stats().unwrap(), StoreStats { edges: 200, nodes: 200 });
        assert_eq!(store.children_for_parent("$root", "m.reference").unwrap().len(), 200);
    }

    #[test]
    fn test_reopen_keeps_data_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relstore.db");

        {
            let store = SqliteRelationStore::open(&path).unwrap();
            assert_eq!(store.path(), Some(path.as_path()));
            store.store_relation(&relation_event("$b", "$a", "m.reference")).unwrap();
        }

        let store = SqliteRelationStore::open(&path).unwrap();
        assert_eq!(store.children_for_parent("$a", "m.reference").unwrap(), vec!["$b"]);
        assert_eq!(store.stats().unwrap(), StoreStats { edges: 1, nodes: 1 });
    }

    #[test]
    fn test_failed_write_rolls_back_both_rows() {
        let store = SqliteRelationStore::open_in_memory().unwrap();
        store
            .writer
            .with_connection(|conn| Ok(conn.execute("DROP TABLE relation_nodes", [])?))
            .unwrap();

        let err = store.store_relation(&relation_event("$b", "$a", "m.reference")).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert!(store.children_for_parent("$a", "m.reference").unwrap().is_empty());
    }

    #[test]
    fn test_uri_query_is_not_part_of_path() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("relstore.db");
        let conn = format!("file:{}?_busy_timeout=5000", db.display());

        let store = SqliteRelationStore::open_with_options(&DatabaseOptions::new(conn)).unwrap();
        store.store_relation(&relation_event("$b", "$a", "m.reference")).unwrap();

        assert_eq!(store.path(), Some(db.as_path()));
        assert!(db.exists());
        let stray = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .any(|entry| entry.file_name().to_string_lossy().contains('?'));
        assert!(!stray);
    }

    #[test]
    fn test_memory_uri_with_parameters_stays_in_memory() {
        let store =
            SqliteRelationStore::open_with_options(&DatabaseOptions::new("file::memory:?cache=shared")).unwrap();
        store.store_relation(&relation_event("$b", "$a", "m.reference")).unwrap();

        assert_eq!(store.path(), None);
        assert_eq!(store.children_for_parent("$a", "m.reference").unwrap(), vec!["$b"]);
    }

    #[test]
    fn test_rejects_postgres_connection_string() {
        let err = SqliteRelationStore::open_with_options(&DatabaseOptions::new("postgres://localhost/db"))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
