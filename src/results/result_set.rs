use std::collections::HashMap;
use std::sync::Arc;

use crate::value::FieldValue;

use super::row::DbRow;

/// Rows returned by a query, sharing one set of column names.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub rows: Vec<DbRow>,
    column_names: Option<Arc<Vec<String>>>,
    column_index: Option<Arc<HashMap<String, usize>>>,
}

impl ResultSet {
    /// Create an empty result set with preallocated row capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            rows: Vec::with_capacity(capacity),
            column_names: None,
            column_index: None,
        }
    }

    /// Set the column names shared by all rows, building the name-to-index
    /// map once for the whole result set.
    pub fn set_column_names(&mut self, column_names: Arc<Vec<String>>) {
        let index: HashMap<String, usize> = column_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        self.column_index = Some(Arc::new(index));
        self.column_names = Some(column_names);
    }

    #[must_use]
    pub fn column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.column_names.as_ref()
    }

    /// Append a row of values. Column names must have been set first;
    /// values arrive in column order.
    pub fn add_row_values(&mut self, values: Vec<FieldValue>) {
        if let (Some(names), Some(index)) = (&self.column_names, &self.column_index) {
            self.rows
                .push(DbRow::new(Arc::clone(names), Arc::clone(index), values));
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
