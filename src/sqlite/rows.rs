use std::sync::Arc;

use rusqlite::types::Value;
use rusqlite::{Statement, ToSql};

use crate::error::EntityLiteError;
use crate::results::ResultSet;
use crate::value::FieldValue;

/// Extract one column of a rusqlite row as a raw [`FieldValue`]. Raw means
/// storage-typed: decoding into declared semantic types (booleans,
/// timestamps, decimals) happens later, at record materialization.
///
/// # Errors
///
/// Returns `EntityLiteError` if the value cannot be read from the row.
pub fn extract_value(row: &rusqlite::Row, idx: usize) -> Result<FieldValue, EntityLiteError> {
    let value: Value = row.get(idx).map_err(EntityLiteError::SqliteError)?;
    match value {
        Value::Null => Ok(FieldValue::Null),
        Value::Integer(i) => Ok(FieldValue::Int(i)),
        Value::Real(f) => Ok(FieldValue::Real(f)),
        Value::Text(s) => Ok(FieldValue::Text(s)),
        Value::Blob(b) => Ok(FieldValue::Blob(b)),
    }
}

/// Run a prepared statement and collect its rows into a [`ResultSet`].
///
/// # Errors
///
/// Returns `EntityLiteError` if query execution or row extraction fails.
pub fn build_result_set(
    stmt: &mut Statement,
    params: &[Value],
) -> Result<ResultSet, EntityLiteError> {
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|v| v as &dyn ToSql).collect();
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let column_count = column_names.len();

    let mut result_set = ResultSet::with_capacity(10);
    result_set.set_column_names(Arc::new(column_names));

    let mut rows_iter = stmt.query(&param_refs[..])?;
    while let Some(row) = rows_iter.next()? {
        let mut values = Vec::with_capacity(column_count);
        for i in 0..column_count {
            values.push(extract_value(row, i)?);
        }
        result_set.add_row_values(values);
    }

    Ok(result_set)
}
