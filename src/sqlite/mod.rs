// SQLite driver - owns the database handle and runs every statement
//
// This module is split into several sub-modules for better organization:
// - config: Connection options and PRAGMA handling
// - connection: Cloneable async handle over the worker thread
// - params: Parameter conversion between field values and SQLite types
// - rows: Result extraction and building
// - transaction: Explicit transaction guard
// - worker: The thread that owns the rusqlite connection

pub mod config;
pub mod connection;
pub mod params;
pub mod rows;
pub mod transaction;
mod worker;

// Re-export the public API
pub use config::{SqliteOptions, SqliteOptionsBuilder};
pub use connection::SqliteConnection;
pub use transaction::Transaction;
