use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::error::EntityLiteError;
use crate::expr::col;
use crate::metadata::{EntityDef, EntityMeta, EntityRegistry};
use crate::query::Query;
use crate::record::Record;
use crate::schema;
use crate::schema::metadata::{self as schema_metadata, ColumnMetadata};
use crate::sqlite::{SqliteConnection, SqliteOptionsBuilder, Transaction};

/// Seed hook run by [`Context::initialize_seeded`] after schema sync.
#[async_trait]
pub trait SeedData: Send + Sync {
    /// Populate initial data through the freshly synced context.
    async fn seed(&self, ctx: &Context) -> Result<(), EntityLiteError>;
}

/// One database: an entity registry plus the worker-owned connection.
///
/// ```rust,no_run
/// use entity_lite::prelude::*;
///
/// # async fn demo() -> Result<(), EntityLiteError> {
/// let ctx = Context::builder("app.db").build()?;
/// ctx.register(EntityDef::new("User").field("name", FieldDef::text().not_null()))?;
/// ctx.initialize().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Context {
    registry: Arc<EntityRegistry>,
    conn: SqliteConnection,
}

/// Builder for [`Context`], wrapping the driver options.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    opts: SqliteOptionsBuilder,
}

impl ContextBuilder {
    #[must_use]
    pub fn journal_wal(mut self, enabled: bool) -> Self {
        self.opts = self.opts.journal_wal(enabled);
        self
    }

    #[must_use]
    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.opts = self.opts.foreign_keys(enabled);
        self
    }

    #[must_use]
    pub fn busy_timeout_ms(mut self, timeout: u64) -> Self {
        self.opts = self.opts.busy_timeout_ms(timeout);
        self
    }

    /// Open the database and spawn its worker.
    ///
    /// # Errors
    /// Returns [`EntityLiteError`] if the database cannot be opened or the
    /// worker thread cannot be spawned.
    pub fn build(self) -> Result<Context, EntityLiteError> {
        let conn = SqliteConnection::connect(&self.opts.finish())?;
        Ok(Context {
            registry: Arc::new(EntityRegistry::new()),
            conn,
        })
    }
}

impl Context {
    /// Start building a context for the database at `db_path`
    /// (`":memory:"` for an in-memory database).
    #[must_use]
    pub fn builder(db_path: impl Into<String>) -> ContextBuilder {
        ContextBuilder {
            opts: SqliteOptionsBuilder::new(db_path.into()),
        }
    }

    /// Register an entity shape with this context.
    ///
    /// Identical re-registration is a no-op returning the existing metadata.
    ///
    /// # Errors
    /// Returns [`EntityLiteError::ConfigError`] for an invalid definition or
    /// a name collision with a differently shaped registration.
    pub fn register(&self, def: EntityDef) -> Result<Arc<EntityMeta>, EntityLiteError> {
        self.registry.register(def)
    }

    /// Synchronize the schema of every registered entity, in registration
    /// order. Returns the DDL applied; an already-synced context returns an
    /// empty list.
    ///
    /// # Errors
    /// Returns [`EntityLiteError::SchemaConflict`] when a foreign key
    /// references a table that does not exist yet, and propagates any driver
    /// error.
    pub async fn initialize(&self) -> Result<Vec<String>, EntityLiteError> {
        let mut applied = Vec::new();
        for meta in self.registry.entities() {
            info!(entity = meta.entity_name(), "syncing entity schema");
            let statements = schema::sync_entity(&self.registry, &self.conn, &meta).await?;
            applied.extend(statements);
        }
        Ok(applied)
    }

    /// [`Context::initialize`], then run the seed hook.
    ///
    /// # Errors
    /// Propagates initialization errors and anything the seeder returns.
    pub async fn initialize_seeded(
        &self,
        seeder: &dyn SeedData,
    ) -> Result<Vec<String>, EntityLiteError> {
        let applied = self.initialize().await?;
        seeder.seed(self).await?;
        Ok(applied)
    }

    /// Start a query over `entity`.
    ///
    /// # Errors
    /// Returns [`EntityLiteError::UnknownEntity`] for an unregistered name.
    pub fn query(&self, entity: &str) -> Result<Query, EntityLiteError> {
        let meta = self.registry.resolve(entity)?;
        Ok(Query::new(meta, self.conn.clone()))
    }

    /// Fetch one record by primary key.
    ///
    /// # Errors
    /// Returns [`EntityLiteError::UnknownEntity`] for an unregistered name
    /// and propagates any driver error.
    pub async fn get_by_id(
        &self,
        entity: &str,
        id: i64,
    ) -> Result<Option<Record>, EntityLiteError> {
        let meta = self.registry.resolve(entity)?;
        let pk = meta.primary_key().name.clone();
        self.query(entity)?.filter(col(pk).eq(id)).first().await
    }

    /// Fetch every record of `entity`.
    ///
    /// # Errors
    /// Returns [`EntityLiteError::UnknownEntity`] for an unregistered name
    /// and propagates any driver error.
    pub async fn get_all(&self, entity: &str) -> Result<Vec<Record>, EntityLiteError> {
        self.query(entity)?.all().await
    }

    /// Construct a transient record of `entity` with declared defaults
    /// applied.
    ///
    /// # Errors
    /// Returns [`EntityLiteError::UnknownEntity`] for an unregistered name.
    pub fn new_record(&self, entity: &str) -> Result<Record, EntityLiteError> {
        let meta = self.registry.resolve(entity)?;
        Ok(Record::new(meta))
    }

    /// Insert records row by row inside one transaction.
    ///
    /// The first failure rolls everything back and surfaces; generated keys
    /// and persistence flags are applied only after the commit lands.
    ///
    /// # Errors
    /// Propagates the first per-row driver error, or any transaction error.
    pub async fn insert_many(&self, records: &mut [Record]) -> Result<(), EntityLiteError> {
        if records.is_empty() {
            return Ok(());
        }
        let tx = self.conn.begin().await?;
        let mut outcomes = Vec::with_capacity(records.len());
        for record in records.iter() {
            let (sql, params) = record.insert_statement();
            match tx.execute(&sql, &params).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    let _ = tx.rollback().await;
                    return Err(err);
                }
            }
        }
        tx.commit().await?;
        for (record, outcome) in records.iter_mut().zip(&outcomes) {
            record.apply_insert(outcome);
        }
        Ok(())
    }

    /// Update records row by row inside one transaction.
    ///
    /// A record without a primary-key value aborts the batch with
    /// [`EntityLiteError::NotPersisted`]; nothing is committed.
    ///
    /// # Errors
    /// Propagates the first per-row failure, or any transaction error.
    pub async fn update_many(&self, records: &mut [Record]) -> Result<(), EntityLiteError> {
        if records.is_empty() {
            return Ok(());
        }
        let tx = self.conn.begin().await?;
        for record in records.iter() {
            let statement = match record.update_statement() {
                Ok(statement) => statement,
                Err(err) => {
                    let _ = tx.rollback().await;
                    return Err(err);
                }
            };
            if let Some((sql, params)) = statement
                && let Err(err) = tx.execute(&sql, &params).await
            {
                let _ = tx.rollback().await;
                return Err(err);
            }
        }
        tx.commit().await?;
        for record in records.iter_mut() {
            record.mark_persisted();
        }
        Ok(())
    }

    /// Begin an explicit transaction on this context's connection.
    ///
    /// # Errors
    /// Returns [`EntityLiteError`] if a transaction is already active or the
    /// worker cannot start one.
    pub async fn begin(&self) -> Result<Transaction, EntityLiteError> {
        self.conn.begin().await
    }

    /// Record the registered shapes into the bookkeeping tables and write a
    /// schema version row when the fingerprint changed. Returns the new
    /// version id, or `None` when nothing changed.
    ///
    /// # Errors
    /// Propagates any driver error.
    pub async fn record_schema_metadata(&self) -> Result<Option<i64>, EntityLiteError> {
        schema_metadata::ensure_metadata_tables(&self.conn).await?;
        schema_metadata::record_entity_columns(&self.conn, &self.registry).await?;
        schema_metadata::record_schema_version(&self.conn, &self.registry).await
    }

    /// Read back the recorded columns of `table`.
    ///
    /// # Errors
    /// Propagates any driver error.
    pub async fn table_metadata(
        &self,
        table: &str,
    ) -> Result<Vec<ColumnMetadata>, EntityLiteError> {
        schema_metadata::ensure_metadata_tables(&self.conn).await?;
        schema_metadata::table_metadata(&self.conn, table).await
    }

    /// The underlying driver connection, for raw SQL alongside the mapped
    /// surface.
    #[must_use]
    pub fn connection(&self) -> &SqliteConnection {
        &self.conn
    }

    #[must_use]
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }
}
