//! Shared storage handle.
//!
//! # Responsibility
//! - Own the single catalog connection and serialize access to it.
//! - Run each write as one `IMMEDIATE` transaction and broadcast a change
//!   version after every commit.
//!
//! # Invariants
//! - A write closure that returns `Err` leaves no trace: the transaction is
//!   rolled back when dropped.
//! - The change version only advances after a successful commit.
//! - Closures passed to `read`/`write` must not call back into the same
//!   store (the connection mutex is not reentrant).

use super::open::open_connection;
use super::DbResult;
use crate::config::CatalogConfig;
use parking_lot::Mutex;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable handle to one migrated catalog database.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    conn: Mutex<Connection>,
    changes: watch::Sender<u64>,
    config: CatalogConfig,
}

impl Store {
    /// Opens the database described by `config` and applies migrations.
    pub fn open(config: &CatalogConfig) -> DbResult<Self> {
        let conn = open_connection(config.db_path.as_deref(), config.busy_timeout())?;
        Ok(Self::from_connection(conn, config.clone()))
    }

    /// Opens a fresh in-memory database with default configuration.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::open(&CatalogConfig::default())
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection, config: CatalogConfig) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            inner: Arc::new(StoreInner {
                conn: Mutex::new(conn),
                changes,
                config,
            }),
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.inner.config
    }

    /// Runs a read-only closure against the connection.
    pub fn read<T, E>(&self, op: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E> {
        let conn = self.inner.conn.lock();
        op(&conn)
    }

    /// Runs `op` inside one immediate transaction and commits on `Ok`.
    ///
    /// The connection stays locked for the whole closure, so checks made
    /// inside it cannot be invalidated by another writer on this store.
    pub fn write<T, E>(&self, op: impl FnOnce(&Transaction<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<rusqlite::Error>,
    {
        let value = {
            let mut conn = self.inner.conn.lock();
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let value = op(&tx)?;
            tx.commit()?;
            value
        };
        self.inner.changes.send_modify(|version| *version += 1);
        Ok(value)
    }

    /// Subscribes to the committed-change version counter.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.inner.changes.subscribe()
    }

    /// Current committed-change version.
    pub fn version(&self) -> u64 {
        *self.inner.changes.borrow()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("version", &self.version())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
