//! Database schema definitions
//!
//! Both engine families share the logical layout; they differ only in how
//! the uniqueness constraint over the edge triple is declared.

/// SQL to create the edges table (SQLite)
pub const SQLITE_CREATE_EDGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS relation_edges (
    parent_event_id TEXT NOT NULL,
    child_event_id TEXT NOT NULL,
    rel_type TEXT NOT NULL,
    UNIQUE (parent_event_id, child_event_id, rel_type)
)
"#;

/// SQL to create the edges table (PostgreSQL)
pub const POSTGRES_CREATE_EDGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS relation_edges (
    parent_event_id TEXT NOT NULL,
    child_event_id TEXT NOT NULL,
    rel_type TEXT NOT NULL,
    CONSTRAINT relation_edges_unique UNIQUE (parent_event_id, child_event_id, rel_type)
)
"#;

/// SQL to create the nodes table (both engines)
pub const CREATE_NODES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS relation_nodes (
    event_id TEXT PRIMARY KEY NOT NULL,
    origin_server_ts BIGINT NOT NULL,
    room_id TEXT NOT NULL
)
"#;

pub const SQLITE_INSERT_EDGE: &str = "INSERT INTO relation_edges (parent_event_id, child_event_id, rel_type) \
     VALUES (?1, ?2, ?3) ON CONFLICT (parent_event_id, child_event_id, rel_type) DO NOTHING";

pub const SQLITE_INSERT_NODE: &str = "INSERT INTO relation_nodes (event_id, origin_server_ts, room_id) \
     VALUES (?1, ?2, ?3) ON CONFLICT DO NOTHING";

pub const SQLITE_SELECT_CHILDREN: &str =
    "SELECT child_event_id FROM relation_edges WHERE parent_event_id = ?1 AND rel_type = ?2";

pub const SQLITE_SELECT_NODE: &str =
    "SELECT event_id, origin_server_ts, room_id FROM relation_nodes WHERE event_id = ?1";

pub const POSTGRES_INSERT_EDGE: &str = "INSERT INTO relation_edges (parent_event_id, child_event_id, rel_type) \
     VALUES ($1, $2, $3) ON CONFLICT DO NOTHING";

pub const POSTGRES_INSERT_NODE: &str = "INSERT INTO relation_nodes (event_id, origin_server_ts, room_id) \
     VALUES ($1, $2, $3) ON CONFLICT DO NOTHING";

pub const POSTGRES_SELECT_CHILDREN: &str =
    "SELECT child_event_id FROM relation_edges WHERE parent_event_id = $1 AND rel_type = $2";

pub const POSTGRES_SELECT_NODE: &str =
    "SELECT event_id, origin_server_ts, room_id FROM relation_nodes WHERE event_id = $1";

pub const COUNT_EDGES: &str = "SELECT COUNT(*) FROM relation_edges";
pub const COUNT_NODES: &str = "SELECT COUNT(*) FROM relation_nodes";

/// All schema creation statements for SQLite
pub fn sqlite_schema_statements() -> Vec<&'static str> {
    vec![SQLITE_CREATE_EDGES_TABLE, CREATE_NODES_TABLE]
}

/// All schema creation statements for PostgreSQL
pub fn postgres_schema_statements() -> Vec<&'static str> {
    vec![POSTGRES_CREATE_EDGES_TABLE, CREATE_NODES_TABLE]
}
