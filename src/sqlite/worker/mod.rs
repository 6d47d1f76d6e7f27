// Worker-thread internals for the SQLite driver:
// - channel: command enum exchanged with the worker thread
// - dispatcher: the worker loop that owns the rusqlite connection
// - manager: the async handle used by the rest of the crate

mod channel;
mod dispatcher;
mod manager;

pub(crate) use manager::SqliteWorker;
