use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::EntityLiteError;
use crate::metadata::{ColumnDef, EntityRegistry};
use crate::results::DbRow;
use crate::sqlite::SqliteConnection;
use crate::value::FieldValue;

/// One recorded column of a synced table, as read back from the
/// bookkeeping table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub table_name: String,
    pub column_name: String,
    pub column_type: String,
    pub is_primary_key: bool,
    pub is_nullable: bool,
    pub recorded_at: NaiveDateTime,
}

impl ColumnMetadata {
    fn from_row(row: &DbRow) -> Result<Self, EntityLiteError> {
        Ok(Self {
            table_name: read_text(row, "table_name")?,
            column_name: read_text(row, "column_name")?,
            column_type: read_text(row, "column_type")?,
            is_primary_key: read_flag(row, "is_primary_key")?,
            is_nullable: read_flag(row, "is_nullable")?,
            recorded_at: row
                .get("recorded_at")
                .and_then(FieldValue::as_timestamp)
                .ok_or_else(|| missing_column("recorded_at"))?,
        })
    }
}

fn read_text(row: &DbRow, name: &str) -> Result<String, EntityLiteError> {
    row.get(name)
        .and_then(FieldValue::as_text)
        .map(str::to_string)
        .ok_or_else(|| missing_column(name))
}

fn read_flag(row: &DbRow, name: &str) -> Result<bool, EntityLiteError> {
    row.get(name)
        .and_then(|value| value.as_bool().copied())
        .ok_or_else(|| missing_column(name))
}

fn missing_column(name: &str) -> EntityLiteError {
    EntityLiteError::ExecutionError(format!("schema metadata row is missing column {name}"))
}

pub(crate) async fn ensure_metadata_tables(
    conn: &SqliteConnection,
) -> Result<(), EntityLiteError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _entity_lite_columns (\
         table_name TEXT NOT NULL, \
         column_name TEXT NOT NULL, \
         column_type TEXT NOT NULL, \
         is_primary_key INTEGER NOT NULL, \
         is_nullable INTEGER NOT NULL, \
         recorded_at TEXT NOT NULL); \
         CREATE TABLE IF NOT EXISTS _entity_lite_schema_versions (\
         id INTEGER PRIMARY KEY AUTOINCREMENT, \
         fingerprint TEXT NOT NULL, \
         entity_count INTEGER NOT NULL, \
         recorded_at TEXT NOT NULL);",
    )
    .await
}

/// Re-record every registered shape's columns, replacing earlier rows for
/// the same tables.
pub(crate) async fn record_entity_columns(
    conn: &SqliteConnection,
    registry: &EntityRegistry,
) -> Result<(), EntityLiteError> {
    let now = FieldValue::Timestamp(Utc::now().naive_utc());
    for meta in registry.entities() {
        conn.execute(
            "DELETE FROM _entity_lite_columns WHERE table_name = ?",
            &[FieldValue::Text(meta.table_name().to_string())],
        )
        .await?;
        for column in meta.columns() {
            conn.execute(
                "INSERT INTO _entity_lite_columns \
                 (table_name, column_name, column_type, is_primary_key, is_nullable, recorded_at) \
                 VALUES (?, ?, ?, ?, ?, ?)",
                &[
                    FieldValue::Text(meta.table_name().to_string()),
                    FieldValue::Text(column.name.clone()),
                    FieldValue::Text(format!("{:?}", column.field_type)),
                    FieldValue::Bool(column.primary_key),
                    FieldValue::Bool(column.nullable),
                    now.clone(),
                ],
            )
            .await?;
        }
    }
    Ok(())
}

/// Record a schema version row when the registered shapes changed since the
/// last recorded version. Returns the new version id, or `None` when the
/// fingerprint is unchanged.
pub(crate) async fn record_schema_version(
    conn: &SqliteConnection,
    registry: &EntityRegistry,
) -> Result<Option<i64>, EntityLiteError> {
    let fingerprint = registry_fingerprint(registry)?;
    let latest = conn
        .query(
            "SELECT fingerprint FROM _entity_lite_schema_versions ORDER BY id DESC LIMIT 1",
            &[],
        )
        .await?;
    if let Some(row) = latest.rows.first()
        && row.get("fingerprint").and_then(FieldValue::as_text) == Some(fingerprint.as_str())
    {
        return Ok(None);
    }
    let entity_count = i64::try_from(registry.len()).unwrap_or(i64::MAX);
    let outcome = conn
        .execute(
            "INSERT INTO _entity_lite_schema_versions (fingerprint, entity_count, recorded_at) \
             VALUES (?, ?, ?)",
            &[
                FieldValue::Text(fingerprint),
                FieldValue::Int(entity_count),
                FieldValue::Timestamp(Utc::now().naive_utc()),
            ],
        )
        .await?;
    Ok(Some(outcome.last_insert_id))
}

pub(crate) async fn table_metadata(
    conn: &SqliteConnection,
    table: &str,
) -> Result<Vec<ColumnMetadata>, EntityLiteError> {
    let result = conn
        .query(
            "SELECT table_name, column_name, column_type, is_primary_key, is_nullable, recorded_at \
             FROM _entity_lite_columns WHERE table_name = ? ORDER BY rowid",
            &[FieldValue::Text(table.to_string())],
        )
        .await?;
    let mut columns = Vec::with_capacity(result.rows.len());
    for row in &result.rows {
        columns.push(ColumnMetadata::from_row(row)?);
    }
    Ok(columns)
}

#[derive(Serialize)]
struct ShapeDigest<'a> {
    entity: &'a str,
    table: &'a str,
    columns: &'a [ColumnDef],
}

/// Deterministic fingerprint over every registered shape, in registration
/// order. Canonical JSON per shape, length-prefixed into one hash stream.
fn registry_fingerprint(registry: &EntityRegistry) -> Result<String, EntityLiteError> {
    let mut hasher = Sha256::new();
    hasher.update(b"entity-lite:schema:v1");
    for meta in registry.entities() {
        let shape = ShapeDigest {
            entity: meta.entity_name(),
            table: meta.table_name(),
            columns: meta.columns(),
        };
        let encoded = serde_json::to_vec(&shape).map_err(|err| {
            EntityLiteError::ConfigError(format!("failed to encode schema fingerprint: {err}"))
        })?;
        hasher.update((encoded.len() as u64).to_be_bytes());
        hasher.update(&encoded);
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(out, "{byte:02x}");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{EntityDef, FieldDef};

    #[test]
    fn fingerprint_is_stable_and_shape_sensitive() {
        let registry = EntityRegistry::new();
        registry
            .register(EntityDef::new("User").field("name", FieldDef::text()))
            .unwrap();
        let first = registry_fingerprint(&registry).unwrap();
        let second = registry_fingerprint(&registry).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);

        registry
            .register(EntityDef::new("Post").field("title", FieldDef::text()))
            .unwrap();
        let third = registry_fingerprint(&registry).unwrap();
        assert_ne!(first, third);
    }
}
