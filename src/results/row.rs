use std::collections::HashMap;
use std::sync::Arc;

use crate::value::FieldValue;

/// A single row from a query result, with access by column name or index.
///
/// Column names and the name-to-index map are shared across all rows of one
/// result set to avoid duplicating them per row.
#[derive(Debug, Clone)]
pub struct DbRow {
    column_names: Arc<Vec<String>>,
    values: Vec<FieldValue>,
    column_index: Arc<HashMap<String, usize>>,
}

impl DbRow {
    pub(crate) fn new(
        column_names: Arc<Vec<String>>,
        column_index: Arc<HashMap<String, usize>>,
        values: Vec<FieldValue>,
    ) -> Self {
        Self {
            column_names,
            values,
            column_index,
        }
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Index of a column by name, or None if the result has no such column.
    #[must_use]
    pub fn column_index(&self, column_name: &str) -> Option<usize> {
        self.column_index.get(column_name).copied()
    }

    /// Value at a column by name, or None if the column wasn't selected.
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&FieldValue> {
        self.column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Value at a column index, or None if the index is out of bounds.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&FieldValue> {
        self.values.get(index)
    }

    #[must_use]
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }
}
