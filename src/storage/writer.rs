//! Write serialization for the embedded engine
//!
//! SQLite tolerates a single writer at a time. Every unit of work that
//! touches the database goes through one [`ExclusiveWriter`], which holds the
//! writer connection behind a mutex and runs the work inside a transaction.

use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::Result;

/// Funnels all writes for one database through a single connection.
#[derive(Debug)]
pub struct ExclusiveWriter {
    conn: Mutex<Connection>,
}

impl ExclusiveWriter {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Run `work` inside an immediate transaction while holding the write lock.
    ///
    /// The transaction commits only if `work` returns `Ok`; any error rolls
    /// back everything `work` did.
    pub fn transact<T>(&self, work: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.lock();
        let txn = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = work(&txn)?;
        txn.commit()?;
        Ok(value)
    }

    /// Borrow the writer connection outside of a transaction.
    ///
    /// Used for schema setup and, for in-memory databases, for reads.
    pub fn with_connection<T>(&self, work: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.lock();
        work(&conn)
    }

    // A panic inside `work` drops the transaction, which rolls it back, so
    // the connection is still usable after poisoning.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
