/// Options for opening a `SQLite` database.
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    pub db_path: String,
    pub journal_wal: bool,
    pub foreign_keys: bool,
    pub busy_timeout_ms: Option<u64>,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            db_path,
            journal_wal: true,
            foreign_keys: true,
            busy_timeout_ms: None,
        }
    }

    #[must_use]
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// PRAGMA statements applied to the raw connection before the worker
    /// thread takes ownership.
    #[must_use]
    pub(crate) fn pragma_batch(&self) -> String {
        let mut batch = String::new();
        if self.journal_wal {
            batch.push_str("PRAGMA journal_mode = WAL;\n");
        }
        if self.foreign_keys {
            batch.push_str("PRAGMA foreign_keys = ON;\n");
        }
        if let Some(timeout) = self.busy_timeout_ms {
            batch.push_str(&format!("PRAGMA busy_timeout = {timeout};\n"));
        }
        batch
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn journal_wal(mut self, enabled: bool) -> Self {
        self.opts.journal_wal = enabled;
        self
    }

    #[must_use]
    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.opts.foreign_keys = enabled;
        self
    }

    #[must_use]
    pub fn busy_timeout_ms(mut self, timeout: u64) -> Self {
        self.opts.busy_timeout_ms = Some(timeout);
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }
}
