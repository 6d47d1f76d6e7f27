use tokio::sync::oneshot;

use crate::error::EntityLiteError;
use crate::results::{DmlOutcome, ResultSet};

pub(super) enum Command {
    ExecuteBatch {
        sql: String,
        respond_to: oneshot::Sender<Result<(), EntityLiteError>>,
    },
    ExecuteSelect {
        sql: String,
        params: Vec<rusqlite::types::Value>,
        respond_to: oneshot::Sender<Result<ResultSet, EntityLiteError>>,
    },
    ExecuteDml {
        sql: String,
        params: Vec<rusqlite::types::Value>,
        respond_to: oneshot::Sender<Result<DmlOutcome, EntityLiteError>>,
    },
    BeginTransaction {
        respond_to: oneshot::Sender<Result<u64, EntityLiteError>>,
    },
    ExecuteTxSelect {
        tx_id: u64,
        sql: String,
        params: Vec<rusqlite::types::Value>,
        respond_to: oneshot::Sender<Result<ResultSet, EntityLiteError>>,
    },
    ExecuteTxDml {
        tx_id: u64,
        sql: String,
        params: Vec<rusqlite::types::Value>,
        respond_to: oneshot::Sender<Result<DmlOutcome, EntityLiteError>>,
    },
    CommitTx {
        tx_id: u64,
        respond_to: oneshot::Sender<Result<(), EntityLiteError>>,
    },
    RollbackTx {
        tx_id: u64,
        respond_to: oneshot::Sender<Result<(), EntityLiteError>>,
    },
    Shutdown,
}
