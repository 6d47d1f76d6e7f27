use std::sync::mpsc::{self, Sender};
use std::thread;

use tokio::sync::oneshot;

use crate::error::EntityLiteError;
use crate::results::{DmlOutcome, ResultSet};

use super::channel::Command;
use super::dispatcher::run_sqlite_worker;

/// Handle to the dedicated thread that owns a `rusqlite::Connection`.
///
/// `rusqlite` types are not `Send`, so every statement is shipped to the
/// worker over an mpsc channel and answered on a oneshot.
pub(crate) struct SqliteWorker {
    sender: Sender<Command>,
}

impl SqliteWorker {
    pub(crate) fn spawn(
        conn: rusqlite::Connection,
        connection_id: u64,
    ) -> Result<Self, EntityLiteError> {
        let (sender, receiver) = mpsc::channel::<Command>();
        thread::Builder::new()
            .name(format!("sqlite-worker-{connection_id}"))
            .spawn(move || {
                run_sqlite_worker(conn, &receiver);
            })
            .map_err(|err| {
                EntityLiteError::ConnectionError(format!(
                    "failed to spawn SQLite worker thread: {err}"
                ))
            })?;

        Ok(Self { sender })
    }

    fn send_command(&self, command: Command) -> Result<(), EntityLiteError> {
        self.sender
            .send(command)
            .map_err(|_| connection_error("SQLite worker closed"))
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T, EntityLiteError>>) -> Command,
        drop_message: &'static str,
    ) -> Result<T, EntityLiteError> {
        let (tx, rx) = oneshot::channel();
        self.send_command(build(tx))?;
        rx.await.map_err(|_| connection_error(drop_message))?
    }

    pub(crate) async fn execute_batch(&self, sql: String) -> Result<(), EntityLiteError> {
        self.request(
            |respond_to| Command::ExecuteBatch { sql, respond_to },
            "SQLite worker dropped while executing batch",
        )
        .await
    }

    pub(crate) async fn execute_select(
        &self,
        sql: String,
        params: Vec<rusqlite::types::Value>,
    ) -> Result<ResultSet, EntityLiteError> {
        self.request(
            |respond_to| Command::ExecuteSelect {
                sql,
                params,
                respond_to,
            },
            "SQLite worker dropped while executing select",
        )
        .await
    }

    pub(crate) async fn execute_dml(
        &self,
        sql: String,
        params: Vec<rusqlite::types::Value>,
    ) -> Result<DmlOutcome, EntityLiteError> {
        self.request(
            |respond_to| Command::ExecuteDml {
                sql,
                params,
                respond_to,
            },
            "SQLite worker dropped while executing dml",
        )
        .await
    }

    pub(crate) async fn begin_transaction(&self) -> Result<u64, EntityLiteError> {
        self.request(
            |respond_to| Command::BeginTransaction { respond_to },
            "SQLite worker dropped while beginning transaction",
        )
        .await
    }

    pub(crate) async fn execute_tx_select(
        &self,
        tx_id: u64,
        sql: String,
        params: Vec<rusqlite::types::Value>,
    ) -> Result<ResultSet, EntityLiteError> {
        self.request(
            |respond_to| Command::ExecuteTxSelect {
                tx_id,
                sql,
                params,
                respond_to,
            },
            "SQLite worker dropped while executing select in transaction",
        )
        .await
    }

    pub(crate) async fn execute_tx_dml(
        &self,
        tx_id: u64,
        sql: String,
        params: Vec<rusqlite::types::Value>,
    ) -> Result<DmlOutcome, EntityLiteError> {
        self.request(
            |respond_to| Command::ExecuteTxDml {
                tx_id,
                sql,
                params,
                respond_to,
            },
            "SQLite worker dropped while executing dml in transaction",
        )
        .await
    }

    pub(crate) async fn commit_tx(&self, tx_id: u64) -> Result<(), EntityLiteError> {
        self.request(
            |respond_to| Command::CommitTx { tx_id, respond_to },
            "SQLite worker dropped while committing transaction",
        )
        .await
    }

    pub(crate) async fn rollback_tx(&self, tx_id: u64) -> Result<(), EntityLiteError> {
        self.request(
            |respond_to| Command::RollbackTx { tx_id, respond_to },
            "SQLite worker dropped while rolling back transaction",
        )
        .await
    }

    /// Fire-and-forget rollback used from `Drop`, where awaiting is not an option.
    pub(crate) fn send_rollback(&self, tx_id: u64) {
        let (tx, _rx) = oneshot::channel();
        let _ = self.send_command(Command::RollbackTx {
            tx_id,
            respond_to: tx,
        });
    }
}

impl Drop for SqliteWorker {
    fn drop(&mut self) {
        let _ = self.sender.send(Command::Shutdown);
    }
}

fn connection_error(message: &str) -> EntityLiteError {
    EntityLiteError::ConnectionError(message.into())
}
