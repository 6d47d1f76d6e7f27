use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::EntityLiteError;
use crate::results::{DmlOutcome, ResultSet};
use crate::value::FieldValue;

use super::config::SqliteOptions;
use super::params::Params;
use super::transaction::Transaction;
use super::worker::SqliteWorker;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Owned `SQLite` connection backed by a dedicated worker thread.
///
/// Cloning is cheap; clones share the same worker and therefore the same
/// underlying database handle.
#[derive(Clone)]
pub struct SqliteConnection {
    worker: Arc<SqliteWorker>,
    connection_id: u64,
}

impl SqliteConnection {
    /// Open a database file (or `:memory:`) and spawn its worker thread.
    ///
    /// Configured pragmas are applied before the worker takes ownership of
    /// the handle, so `journal_mode` changes never collide with an implicit
    /// transaction.
    ///
    /// # Errors
    /// Returns [`EntityLiteError`] if the file cannot be opened, a pragma
    /// fails, or the background worker thread cannot be spawned.
    pub fn connect(options: &SqliteOptions) -> Result<Self, EntityLiteError> {
        let conn = open_connection(options)?;
        let pragma_batch = options.pragma_batch();
        if !pragma_batch.is_empty() {
            conn.execute_batch(&pragma_batch)?;
        }
        let connection_id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        let worker = SqliteWorker::spawn(conn, connection_id)?;
        Ok(Self {
            worker: Arc::new(worker),
            connection_id,
        })
    }

    /// Execute a batch of SQL statements on the worker-owned connection.
    ///
    /// # Errors
    /// Propagates any [`EntityLiteError`] produced while dispatching the
    /// command or running the batch within the worker.
    pub async fn execute_batch(&self, sql: &str) -> Result<(), EntityLiteError> {
        self.worker.execute_batch(sql.to_owned()).await
    }

    /// Execute a SQL query and return a [`ResultSet`] produced by the worker thread.
    ///
    /// # Errors
    /// Returns any [`EntityLiteError`] encountered while the worker prepares or
    /// evaluates the statement, or if channel communication with the worker fails.
    pub async fn query(
        &self,
        sql: &str,
        params: &[FieldValue],
    ) -> Result<ResultSet, EntityLiteError> {
        let converted = Params::convert(params);
        self.worker
            .execute_select(sql.to_owned(), converted.into_values())
            .await
    }

    /// Execute a DML statement (INSERT/UPDATE/DELETE) and return its outcome.
    ///
    /// The statement runs inside its own transaction on the worker thread, so
    /// `last_insert_id` is read before any other statement can interleave.
    ///
    /// # Errors
    /// Returns any [`EntityLiteError`] reported by the worker while executing
    /// the statement or relaying the result back to the caller.
    pub async fn execute(
        &self,
        sql: &str,
        params: &[FieldValue],
    ) -> Result<DmlOutcome, EntityLiteError> {
        let converted = Params::convert(params);
        self.worker
            .execute_dml(sql.to_owned(), converted.into_values())
            .await
    }

    /// Begin an explicit transaction and return its guard.
    ///
    /// While the guard is alive the worker rejects non-transactional
    /// statements on this connection.
    ///
    /// # Errors
    /// Returns [`EntityLiteError`] if a transaction is already in progress or
    /// the worker cannot start one.
    pub async fn begin(&self) -> Result<Transaction, EntityLiteError> {
        let tx_id = self.worker.begin_transaction().await?;
        Ok(Transaction::new(self.clone(), tx_id))
    }

    pub(crate) async fn tx_query(
        &self,
        tx_id: u64,
        sql: &str,
        params: &[FieldValue],
    ) -> Result<ResultSet, EntityLiteError> {
        let converted = Params::convert(params);
        self.worker
            .execute_tx_select(tx_id, sql.to_owned(), converted.into_values())
            .await
    }

    pub(crate) async fn tx_execute(
        &self,
        tx_id: u64,
        sql: &str,
        params: &[FieldValue],
    ) -> Result<DmlOutcome, EntityLiteError> {
        let converted = Params::convert(params);
        self.worker
            .execute_tx_dml(tx_id, sql.to_owned(), converted.into_values())
            .await
    }

    pub(crate) async fn tx_commit(&self, tx_id: u64) -> Result<(), EntityLiteError> {
        self.worker.commit_tx(tx_id).await
    }

    pub(crate) async fn tx_rollback(&self, tx_id: u64) -> Result<(), EntityLiteError> {
        self.worker.rollback_tx(tx_id).await
    }

    pub(crate) fn send_rollback(&self, tx_id: u64) {
        self.worker.send_rollback(tx_id);
    }
}

impl fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("connection_id", &self.connection_id)
            .finish()
    }
}

fn open_connection(options: &SqliteOptions) -> Result<rusqlite::Connection, EntityLiteError> {
    if options.db_path() == ":memory:" {
        return Ok(rusqlite::Connection::open_in_memory()?);
    }
    let path = std::path::Path::new(options.db_path());
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|err| {
            EntityLiteError::ConnectionError(format!(
                "failed to create database directory {}: {err}",
                parent.display()
            ))
        })?;
    }
    Ok(rusqlite::Connection::open(path)?)
}
