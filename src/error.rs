use thiserror::Error;

/// Errors produced by the entity engine and its `SQLite` driver.
#[derive(Debug, Error)]
pub enum EntityLiteError {
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error("Unknown entity: {name}")]
    UnknownEntity { name: String },

    #[error("Unknown attribute {attribute} on entity {entity}")]
    UnknownAttribute { entity: String, attribute: String },

    #[error("Type coercion failed for {entity}.{column}: {detail}")]
    TypeCoercion {
        entity: String,
        column: String,
        detail: String,
    },

    #[error("Instance of {entity} is not persisted: {detail}")]
    NotPersisted { entity: String, detail: String },

    #[error("Invalid limit: {value}")]
    InvalidLimit { value: i64 },

    #[error("IN filter on column {column} has no values")]
    EmptyMembership { column: String },

    #[error(
        "Table {table} references {referenced}, which does not exist yet; register the referenced entity first"
    )]
    SchemaConflict { table: String, referenced: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),
}
