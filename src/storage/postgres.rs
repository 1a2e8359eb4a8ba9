//! PostgreSQL storage implementation
//!
//! PostgreSQL handles concurrent writers itself, so there is no write lock
//! here: each `store_relation` runs its two inserts in one transaction on a
//! pooled connection and lets `ON CONFLICT DO NOTHING` absorb races. The
//! async driver is run on a runtime owned by the store so the public API
//! stays blocking.

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tokio::runtime::Runtime;

use super::schema;
use super::{Backend, RelationStore, StoreStats};
use crate::config::DatabaseOptions;
use crate::event::RelationEvent;
use crate::relation::{extract_relation, Node};
use crate::{Error, Result};

const DEFAULT_MAX_OPEN_CONNS: u32 = 10;

pub struct PostgresRelationStore {
    pool: PgPool,
    runtime: Runtime,
}

impl std::fmt::Debug for PostgresRelationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresRelationStore")
            .field("pool_size", &self.pool.size())
            .finish()
    }
}

impl PostgresRelationStore {
    /// Connect and create the schema if it is missing.
    ///
    /// Must not be called from inside an async runtime.
    pub fn open(options: &DatabaseOptions) -> Result<Self> {
        if !options.connection_string.is_postgres() {
            return Err(Error::Config(format!(
                "not a postgres connection string: {}",
                options.connection_string
            )));
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("relstore-pg")
            .enable_all()
            .build()?;

        let pool = runtime.block_on(
            PgPoolOptions::new()
                .max_connections(options.max_open_conns.unwrap_or(DEFAULT_MAX_OPEN_CONNS))
                .connect(options.connection_string.as_str()),
        )?;

        let store = Self { pool, runtime };
        store.initialize_schema()?;
        tracing::info!("Opened postgres relation store");
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<()> {
        self.runtime.block_on(async {
            for stmt in schema::postgres_schema_statements() {
                sqlx::query(stmt).execute(&self.pool).await?;
            }
            Ok::<_, Error>(())
        })
    }

    async fn count(&self, sql: &'static str) -> Result<usize> {
        let count: i64 = sqlx::query_scalar(sql).fetch_one(&self.pool).await?;
        Ok(count as usize)
    }
}

impl RelationStore for PostgresRelationStore {
    fn store_relation(&self, event: &dyn RelationEvent) -> Result<()> {
        let Some(relation) = extract_relation(Some(event)) else {
            return Ok(());
        };

        let node = Node::from_event(event);
        self.runtime.block_on(async {
            let mut txn = self.pool.begin().await?;
            sqlx::query(schema::POSTGRES_INSERT_EDGE)
                .bind(&relation.parent_event_id)
                .bind(&relation.child_event_id)
                .bind(&relation.rel_type)
                .execute(&mut *txn)
                .await?;
            sqlx::query(schema::POSTGRES_INSERT_NODE)
                .bind(&node.event_id)
                .bind(node.origin_server_ts)
                .bind(&node.room_id)
                .execute(&mut *txn)
                .await?;
            txn.commit().await?;
            Ok::<_, Error>(())
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
        self.runtime.block_on(async {
            let children: Vec<String> = sqlx::query_scalar(schema::POSTGRES_SELECT_CHILDREN)
                .bind(parent_event_id)
                .bind(rel_type)
                .fetch_all(&self.pool)
                .await?;
            Ok::<_, Error>(children)
        })
    }

    fn node(&self, event_id: &str) -> Result<Option<Node>> {
        self.runtime.block_on(async {
            let row = sqlx::query(schema::POSTGRES_SELECT_NODE)
                .bind(event_id)
                .fetch_optional(&self.pool)
                .await?;
            row.map(|row| -> Result<Node> {
                Ok(Node {
                    event_id: row.try_get(0)?,
                    origin_server_ts: row.try_get(1)?,
                    room_id: row.try_get(2)?,
                })
            })
            .transpose()
        })
    }

    fn stats(&self) -> Result<StoreStats> {
        self.runtime.block_on(async {
            Ok::<_, Error>(StoreStats {
                edges: self.count(schema::COUNT_EDGES).await?,
                nodes: self.count(schema::COUNT_NODES).await?,
            })
        })
    }

    fn backend(&self) -> Backend {
        Backend::Postgres
    }
}
