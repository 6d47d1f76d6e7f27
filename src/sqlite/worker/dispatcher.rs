use std::sync::mpsc::Receiver;

use crate::error::EntityLiteError;
use crate::results::{DmlOutcome, ResultSet};
use crate::sqlite::rows::build_result_set;

use super::channel::Command;

pub(super) fn run_sqlite_worker(mut conn: rusqlite::Connection, receiver: &Receiver<Command>) {
    // Connection-level tx IDs never leave this thread; u64 won't exhaust in practice.
    let mut next_tx_id: u64 = 1;

    while let Ok(command) = receiver.recv() {
        match command {
            Command::Shutdown => break,
            Command::BeginTransaction { respond_to } => match conn.transaction() {
                Ok(tx) => {
                    let tx_id = next_tx_id;
                    next_tx_id = next_tx_id.saturating_add(1);
                    let _ = respond_to.send(Ok(tx_id));
                    // Enter the transaction loop until commit/rollback. The
                    // rusqlite::Transaction is !Send, so it stays on this
                    // thread; tx commands are routed here via tx_id.
                    run_tx_loop(tx_id, tx, receiver);
                }
                Err(err) => {
                    let _ = respond_to.send(Err(EntityLiteError::SqliteError(err)));
                }
            },
            Command::ExecuteTxSelect { respond_to, .. } => {
                let _ = respond_to.send(Err(no_active_tx_error()));
            }
            Command::ExecuteTxDml { respond_to, .. } => {
                let _ = respond_to.send(Err(no_active_tx_error()));
            }
            Command::CommitTx { respond_to, .. } => {
                let _ = respond_to.send(Err(no_active_tx_error()));
            }
            Command::RollbackTx { respond_to, .. } => {
                let _ = respond_to.send(Err(no_active_tx_error()));
            }
            Command::ExecuteBatch { sql, respond_to } => {
                let _ = respond_to.send(execute_batch(&mut conn, &sql));
            }
            Command::ExecuteSelect {
                sql,
                params,
                respond_to,
            } => {
                let _ = respond_to.send(execute_select(&conn, &sql, &params));
            }
            Command::ExecuteDml {
                sql,
                params,
                respond_to,
            } => {
                let _ = respond_to.send(execute_dml(&mut conn, &sql, &params));
            }
        }
    }
}

fn run_tx_loop(tx_id: u64, tx: rusqlite::Transaction<'_>, receiver: &Receiver<Command>) {
    while let Ok(command) = receiver.recv() {
        match command {
            Command::ExecuteTxSelect {
                tx_id: id,
                sql,
                params,
                respond_to,
            } => {
                if id != tx_id {
                    let _ = respond_to.send(Err(tx_id_mismatch(tx_id, id)));
                    continue;
                }
                let _ = respond_to.send(execute_tx_select(&tx, &sql, &params));
            }
            Command::ExecuteTxDml {
                tx_id: id,
                sql,
                params,
                respond_to,
            } => {
                if id != tx_id {
                    let _ = respond_to.send(Err(tx_id_mismatch(tx_id, id)));
                    continue;
                }
                let _ = respond_to.send(execute_tx_dml(&tx, &sql, &params));
            }
            Command::CommitTx {
                tx_id: id,
                respond_to,
            } => {
                if id != tx_id {
                    let _ = respond_to.send(Err(tx_id_mismatch(tx_id, id)));
                    continue;
                }
                let res = tx.commit().map_err(EntityLiteError::SqliteError);
                let _ = respond_to.send(res);
                break;
            }
            Command::RollbackTx {
                tx_id: id,
                respond_to,
            } => {
                if id != tx_id {
                    let _ = respond_to.send(Err(tx_id_mismatch(tx_id, id)));
                    continue;
                }
                let res = tx.rollback().map_err(EntityLiteError::SqliteError);
                let _ = respond_to.send(res);
                break;
            }
            Command::Shutdown => break,
            // All other commands are blocked while a transaction is active.
            Command::BeginTransaction { respond_to } => {
                let _ = respond_to.send(Err(EntityLiteError::ExecutionError(
                    "SQLite transaction already in progress".into(),
                )));
            }
            Command::ExecuteBatch { respond_to, .. } => {
                let _ = respond_to.send(Err(tx_in_progress_error()));
            }
            Command::ExecuteSelect { respond_to, .. } => {
                let _ = respond_to.send(Err(tx_in_progress_error()));
            }
            Command::ExecuteDml { respond_to, .. } => {
                let _ = respond_to.send(Err(tx_in_progress_error()));
            }
        }
    }
}

fn tx_id_mismatch(active: u64, requested: u64) -> EntityLiteError {
    EntityLiteError::ExecutionError(format!(
        "SQLite transaction mismatch: active {active}, requested {requested}"
    ))
}

fn no_active_tx_error() -> EntityLiteError {
    EntityLiteError::ExecutionError("No active SQLite transaction".into())
}

fn tx_in_progress_error() -> EntityLiteError {
    EntityLiteError::ExecutionError(
        "SQLite transaction in progress; operation not permitted".into(),
    )
}

fn execute_batch(conn: &mut rusqlite::Connection, sql: &str) -> Result<(), EntityLiteError> {
    let tx = conn.transaction()?;
    tx.execute_batch(sql)?;
    tx.commit()?;
    Ok(())
}

fn execute_select(
    conn: &rusqlite::Connection,
    sql: &str,
    params: &[rusqlite::types::Value],
) -> Result<ResultSet, EntityLiteError> {
    let mut stmt = conn.prepare(sql)?;
    build_result_set(&mut stmt, params)
}

fn execute_dml(
    conn: &mut rusqlite::Connection,
    sql: &str,
    params: &[rusqlite::types::Value],
) -> Result<DmlOutcome, EntityLiteError> {
    let tx = conn.transaction()?;
    let outcome = {
        let mut stmt = tx.prepare(sql)?;
        let param_refs = values_as_tosql(params);
        let rows_affected = stmt.execute(&param_refs[..])?;
        DmlOutcome {
            rows_affected,
            last_insert_id: tx.last_insert_rowid(),
        }
    };
    tx.commit()?;
    Ok(outcome)
}

fn execute_tx_select(
    tx: &rusqlite::Transaction<'_>,
    sql: &str,
    params: &[rusqlite::types::Value],
) -> Result<ResultSet, EntityLiteError> {
    let mut stmt = tx.prepare(sql)?;
    build_result_set(&mut stmt, params)
}

fn execute_tx_dml(
    tx: &rusqlite::Transaction<'_>,
    sql: &str,
    params: &[rusqlite::types::Value],
) -> Result<DmlOutcome, EntityLiteError> {
    let rows_affected = {
        let mut stmt = tx.prepare(sql)?;
        let param_refs = values_as_tosql(params);
        stmt.execute(&param_refs[..])?
    };
    Ok(DmlOutcome {
        rows_affected,
        last_insert_id: tx.last_insert_rowid(),
    })
}

fn values_as_tosql(values: &[rusqlite::types::Value]) -> Vec<&dyn rusqlite::ToSql> {
    values.iter().map(|v| v as &dyn rusqlite::ToSql).collect()
}
