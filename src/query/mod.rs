use std::sync::Arc;

use tracing::debug;

use crate::error::EntityLiteError;
use crate::expr::compile::{compile_order, compile_where};
use crate::expr::{Expr, OrderKey, col};
use crate::metadata::EntityMeta;
use crate::metadata::naming::quote_ident;
use crate::record::Record;
use crate::sqlite::SqliteConnection;
use crate::value::FieldValue;

/// Fluent `SELECT` builder over one entity.
///
/// Chain calls stay infallible; anything that goes wrong while building
/// (a negative limit, an empty `IN` list) is parked and surfaced by the
/// terminal operation. The first parked error wins.
#[derive(Debug)]
pub struct Query {
    meta: Arc<EntityMeta>,
    conn: SqliteConnection,
    filters: Vec<Expr>,
    order: Vec<OrderKey>,
    limit: Option<i64>,
    pending_error: Option<EntityLiteError>,
}

impl Query {
    pub(crate) fn new(meta: Arc<EntityMeta>, conn: SqliteConnection) -> Self {
        Self {
            meta,
            conn,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            pending_error: None,
        }
    }

    /// Append a filter expression. Filters combine conjunctively.
    #[must_use]
    pub fn filter(mut self, expr: Expr) -> Self {
        self.filters.push(expr);
        self
    }

    /// Append an equality filter on `column`.
    #[must_use]
    pub fn filter_by(self, column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        let column = column.into();
        self.filter(col(column).eq(value))
    }

    /// Replace the ordering. The last `order_by` call wins.
    #[must_use]
    pub fn order_by(mut self, keys: impl IntoIterator<Item = OrderKey>) -> Self {
        self.order = keys.into_iter().collect();
        self
    }

    /// Replace the row limit. A negative `n` parks [`EntityLiteError::InvalidLimit`]
    /// for the terminal operation.
    #[must_use]
    pub fn limit(mut self, n: i64) -> Self {
        if n < 0 {
            if self.pending_error.is_none() {
                self.pending_error = Some(EntityLiteError::InvalidLimit { value: n });
            }
        } else {
            self.limit = Some(n);
        }
        self
    }

    /// Run the query and materialize every matching row.
    ///
    /// # Errors
    /// Surfaces any parked builder error, compilation failure, driver error,
    /// or [`EntityLiteError::TypeCoercion`] raised while decoding rows.
    pub async fn all(mut self) -> Result<Vec<Record>, EntityLiteError> {
        if let Some(err) = self.pending_error.take() {
            return Err(err);
        }
        let (sql, params) = self.render_select()?;
        debug!(entity = self.meta.entity_name(), sql = %sql, "running select");
        let result = self.conn.query(&sql, &params).await?;
        let mut records = Vec::with_capacity(result.rows.len());
        for row in &result.rows {
            records.push(Record::from_row(Arc::clone(&self.meta), row)?);
        }
        Ok(records)
    }

    /// Run the query capped at one row.
    ///
    /// Any limit set earlier is overridden; a parked error still surfaces.
    ///
    /// # Errors
    /// Same failure modes as [`Query::all`].
    pub async fn first(mut self) -> Result<Option<Record>, EntityLiteError> {
        self.limit = Some(1);
        let records = self.all().await?;
        Ok(records.into_iter().next())
    }

    /// Count matching rows with the same `WHERE` clause, ignoring order and limit.
    ///
    /// # Errors
    /// Surfaces any parked builder error, compilation failure, or driver error.
    pub async fn count(mut self) -> Result<i64, EntityLiteError> {
        if let Some(err) = self.pending_error.take() {
            return Err(err);
        }
        let mut sql = format!(
            "SELECT COUNT(*) AS cnt FROM {}",
            quote_ident(self.meta.table_name())
        );
        let mut params = Vec::new();
        if let Some(clause) = compile_where(&self.filters)? {
            sql.push_str(" WHERE ");
            sql.push_str(&clause.sql);
            params = clause.params;
        }
        debug!(entity = self.meta.entity_name(), sql = %sql, "running count");
        let result = self.conn.query(&sql, &params).await?;
        let count = result
            .rows
            .first()
            .and_then(|row| row.get("cnt"))
            .and_then(|value| value.as_int().copied())
            .ok_or_else(|| {
                EntityLiteError::ExecutionError("COUNT(*) query returned no usable row".into())
            })?;
        Ok(count)
    }

    fn render_select(&self) -> Result<(String, Vec<FieldValue>), EntityLiteError> {
        let mut sql = format!("SELECT * FROM {}", quote_ident(self.meta.table_name()));
        let mut params = Vec::new();
        if let Some(clause) = compile_where(&self.filters)? {
            sql.push_str(" WHERE ");
            sql.push_str(&clause.sql);
            params = clause.params;
        }
        if let Some(order) = compile_order(&self.order) {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order);
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        Ok((sql, params))
    }
}
