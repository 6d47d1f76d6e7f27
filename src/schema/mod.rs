// Schema synchronization: declared shapes to live SQLite tables.
//
// - metadata: bookkeeping tables recording synced shapes and versions

pub mod metadata;

use std::collections::HashSet;

use tracing::info;

use crate::error::EntityLiteError;
use crate::metadata::naming::quote_ident;
use crate::metadata::{ColumnDef, EntityMeta, EntityRegistry};
use crate::sqlite::SqliteConnection;
use crate::value::FieldValue;

/// Bring the live table for `meta` in line with its declared shape.
///
/// Creates the table when absent, otherwise adds declared-but-missing
/// columns. Nothing is ever dropped or rewritten, so columns that exist
/// only in the database survive. Returns the DDL statements applied, in
/// order; a second run over an unchanged shape returns an empty list.
pub(crate) async fn sync_entity(
    registry: &EntityRegistry,
    conn: &SqliteConnection,
    meta: &EntityMeta,
) -> Result<Vec<String>, EntityLiteError> {
    let mut applied = Vec::new();
    if table_exists(conn, meta.table_name()).await? {
        let live = live_columns(conn, meta.table_name()).await?;
        for column in meta.columns() {
            if live.contains(&column.name) {
                continue;
            }
            let ddl = add_column_sql(registry, conn, meta, column).await?;
            info!(table = meta.table_name(), column = %column.name, %ddl, "adding column");
            conn.execute_batch(&ddl).await?;
            applied.push(ddl);
        }
    } else {
        let ddl = create_table_sql(registry, conn, meta).await?;
        info!(table = meta.table_name(), %ddl, "creating table");
        conn.execute_batch(&ddl).await?;
        applied.push(ddl);
    }
    Ok(applied)
}

pub(crate) async fn table_exists(
    conn: &SqliteConnection,
    table: &str,
) -> Result<bool, EntityLiteError> {
    let result = conn
        .query(
            "SELECT name FROM sqlite_master WHERE type='table' AND name = ?",
            &[FieldValue::Text(table.to_string())],
        )
        .await?;
    Ok(!result.rows.is_empty())
}

async fn live_columns(
    conn: &SqliteConnection,
    table: &str,
) -> Result<HashSet<String>, EntityLiteError> {
    let result = conn
        .query(&format!("PRAGMA table_info({})", quote_ident(table)), &[])
        .await?;
    Ok(result
        .rows
        .iter()
        .filter_map(|row| row.get("name"))
        .filter_map(|value| value.as_text().map(str::to_string))
        .collect())
}

async fn create_table_sql(
    registry: &EntityRegistry,
    conn: &SqliteConnection,
    meta: &EntityMeta,
) -> Result<String, EntityLiteError> {
    let mut pieces: Vec<String> = meta.columns().iter().map(column_sql).collect();
    for column in meta.foreign_key_columns() {
        let target_table = referenced_table(registry, conn, meta, column).await?;
        let Some(fk) = &column.foreign_key else {
            continue;
        };
        pieces.push(format!(
            "FOREIGN KEY ({}) REFERENCES {}({})",
            quote_ident(&column.name),
            quote_ident(&target_table),
            quote_ident(&fk.target_column)
        ));
    }
    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(meta.table_name()),
        pieces.join(", ")
    ))
}

async fn add_column_sql(
    registry: &EntityRegistry,
    conn: &SqliteConnection,
    meta: &EntityMeta,
    column: &ColumnDef,
) -> Result<String, EntityLiteError> {
    let mut ddl = format!(
        "ALTER TABLE {} ADD COLUMN {}",
        quote_ident(meta.table_name()),
        column_sql(column)
    );
    if let Some(fk) = &column.foreign_key {
        let target_table = referenced_table(registry, conn, meta, column).await?;
        ddl.push_str(&format!(
            " REFERENCES {}({})",
            quote_ident(&target_table),
            quote_ident(&fk.target_column)
        ));
    }
    Ok(ddl)
}

fn column_sql(column: &ColumnDef) -> String {
    let mut sql = format!(
        "{} {}",
        quote_ident(&column.name),
        column.field_type.sql_type()
    );
    if column.primary_key {
        sql.push_str(" PRIMARY KEY AUTOINCREMENT");
        return sql;
    }
    if !column.nullable {
        sql.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        sql.push_str(&format!(" DEFAULT {}", default.sql_literal()));
    }
    sql
}

/// Resolve the table a foreign-key column references, insisting that it can
/// actually be referenced: the target shape must be registered, carry the
/// referenced column, and its table must already exist (a table may
/// reference itself mid-creation).
async fn referenced_table(
    registry: &EntityRegistry,
    conn: &SqliteConnection,
    meta: &EntityMeta,
    column: &ColumnDef,
) -> Result<String, EntityLiteError> {
    let Some(fk) = &column.foreign_key else {
        return Err(EntityLiteError::ConfigError(format!(
            "column {} on {} is not a foreign key",
            column.name,
            meta.entity_name()
        )));
    };
    let target = registry.resolve(&fk.target_entity)?;
    if target.column(&fk.target_column).is_none() {
        return Err(EntityLiteError::ConfigError(format!(
            "entity {}: foreign key {} references unknown column {}.{}",
            meta.entity_name(),
            column.name,
            fk.target_entity,
            fk.target_column
        )));
    }
    let target_table = target.table_name().to_string();
    if target_table != meta.table_name() && !table_exists(conn, &target_table).await? {
        return Err(EntityLiteError::SchemaConflict {
            table: meta.table_name().to_string(),
            referenced: target_table,
        });
    }
    Ok(target_table)
}
