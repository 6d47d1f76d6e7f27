use tracing::warn;

use crate::error::EntityLiteError;
use crate::results::{DmlOutcome, ResultSet};
use crate::value::FieldValue;

use super::connection::SqliteConnection;

/// Guard for an explicit transaction on a worker-owned connection.
///
/// Statements issued through the guard run inside the open transaction.
/// Dropping the guard without calling [`Transaction::commit`] or
/// [`Transaction::rollback`] asks the worker to roll back.
pub struct Transaction {
    conn: SqliteConnection,
    tx_id: u64,
    completed: bool,
}

impl Transaction {
    pub(crate) fn new(conn: SqliteConnection, tx_id: u64) -> Self {
        Self {
            conn,
            tx_id,
            completed: false,
        }
    }

    /// Execute a SQL query inside the transaction.
    ///
    /// # Errors
    /// Returns any [`EntityLiteError`] produced while the worker evaluates the
    /// statement.
    pub async fn query(
        &self,
        sql: &str,
        params: &[FieldValue],
    ) -> Result<ResultSet, EntityLiteError> {
        self.conn.tx_query(self.tx_id, sql, params).await
    }

    /// Execute a DML statement inside the transaction.
    ///
    /// # Errors
    /// Returns any [`EntityLiteError`] produced while the worker executes the
    /// statement.
    pub async fn execute(
        &self,
        sql: &str,
        params: &[FieldValue],
    ) -> Result<DmlOutcome, EntityLiteError> {
        self.conn.tx_execute(self.tx_id, sql, params).await
    }

    /// Commit the transaction.
    ///
    /// # Errors
    /// Returns [`EntityLiteError`] if the commit fails on the worker.
    pub async fn commit(mut self) -> Result<(), EntityLiteError> {
        self.completed = true;
        self.conn.tx_commit(self.tx_id).await
    }

    /// Roll back the transaction.
    ///
    /// # Errors
    /// Returns [`EntityLiteError`] if the rollback fails on the worker.
    pub async fn rollback(mut self) -> Result<(), EntityLiteError> {
        self.completed = true;
        self.conn.tx_rollback(self.tx_id).await
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.completed {
            warn!(tx_id = self.tx_id, "transaction dropped without commit; rolling back");
            self.conn.send_rollback(self.tx_id);
        }
    }
}
