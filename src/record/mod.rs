use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::context::Context;
use crate::error::EntityLiteError;
use crate::expr::col;
use crate::metadata::EntityMeta;
use crate::metadata::naming::{quote_ident, relation_name_for_fk};
use crate::query::Query;
use crate::results::{DbRow, DmlOutcome};
use crate::value::FieldValue;

/// One entity instance: field values in declaration order plus a hidden
/// persistence flag.
///
/// A record is transient when constructed (defaults applied, `persisted`
/// false) and persisted when materialized from a row or after a successful
/// insert. [`Record::save`] dispatches on the flag alone, so an instance
/// with a manually assigned key still inserts until it has been written
/// once.
#[derive(Debug, Clone)]
pub struct Record {
    meta: Arc<EntityMeta>,
    values: Vec<FieldValue>,
    persisted: bool,
    to_one_cache: HashMap<String, Option<Record>>,
}

impl Record {
    pub(crate) fn new(meta: Arc<EntityMeta>) -> Self {
        let values = meta
            .columns()
            .iter()
            .map(|column| column.default.clone().unwrap_or(FieldValue::Null))
            .collect();
        Self {
            meta,
            values,
            persisted: false,
            to_one_cache: HashMap::new(),
        }
    }

    /// Materialize a record from a driver row. Declared columns missing from
    /// the row keep their defaults; row columns the shape never declared are
    /// ignored.
    pub(crate) fn from_row(meta: Arc<EntityMeta>, row: &DbRow) -> Result<Self, EntityLiteError> {
        let mut values = Vec::with_capacity(meta.columns().len());
        for column in meta.columns() {
            let value = match row.get(&column.name) {
                Some(raw) => {
                    FieldValue::decode_stored(column.field_type, raw).map_err(|detail| {
                        EntityLiteError::TypeCoercion {
                            entity: meta.entity_name().to_string(),
                            column: column.name.clone(),
                            detail,
                        }
                    })?
                }
                None => column.default.clone().unwrap_or(FieldValue::Null),
            };
            values.push(value);
        }
        Ok(Self {
            meta,
            values,
            persisted: true,
            to_one_cache: HashMap::new(),
        })
    }

    #[must_use]
    pub fn entity_name(&self) -> &str {
        self.meta.entity_name()
    }

    /// Whether this instance corresponds to a stored row.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// The primary-key value, if one is set.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        self.values[self.meta.primary_key_index()].as_int().copied()
    }

    /// Read a field value.
    ///
    /// # Errors
    /// Returns [`EntityLiteError::UnknownAttribute`] for a column the shape
    /// never declared.
    pub fn get(&self, column: &str) -> Result<&FieldValue, EntityLiteError> {
        let idx = self
            .meta
            .column_index(column)
            .ok_or_else(|| self.unknown_attribute(column))?;
        Ok(&self.values[idx])
    }

    /// Assign a field value, enforcing the column's declared type.
    ///
    /// Integer values widen losslessly into Real and Decimal columns; any
    /// other mismatch fails. Assigning a foreign-key column drops the cached
    /// to-one resolution for its relationship.
    ///
    /// # Errors
    /// Returns [`EntityLiteError::UnknownAttribute`] for an undeclared column
    /// and [`EntityLiteError::TypeCoercion`] for a type mismatch or a `Null`
    /// assigned to a non-nullable column.
    pub fn set(
        &mut self,
        column: &str,
        value: impl Into<FieldValue>,
    ) -> Result<(), EntityLiteError> {
        let meta = Arc::clone(&self.meta);
        let idx = meta
            .column_index(column)
            .ok_or_else(|| self.unknown_attribute(column))?;
        let declared = &meta.columns()[idx];
        let value = value.into();
        if value.is_null() && !declared.nullable {
            return Err(EntityLiteError::TypeCoercion {
                entity: meta.entity_name().to_string(),
                column: column.to_string(),
                detail: "NULL is not allowed for a non-nullable column".to_string(),
            });
        }
        let coerced =
            value
                .coerce_for(declared.field_type)
                .map_err(|detail| EntityLiteError::TypeCoercion {
                    entity: meta.entity_name().to_string(),
                    column: column.to_string(),
                    detail,
                })?;
        self.values[idx] = coerced;
        if declared.foreign_key.is_some()
            && let Some(relation) = relation_name_for_fk(&declared.name)
        {
            self.to_one_cache.remove(relation);
        }
        Ok(())
    }

    /// Point a to-one relationship at `target` by copying its key into the
    /// foreign-key column. A transient target clears the key instead.
    ///
    /// # Errors
    /// Returns [`EntityLiteError::UnknownAttribute`] when no foreign-key
    /// column induces `relation`, or [`EntityLiteError::TypeCoercion`] when
    /// clearing a non-nullable key.
    pub fn set_to_one(&mut self, relation: &str, target: &Record) -> Result<(), EntityLiteError> {
        let meta = Arc::clone(&self.meta);
        let Some(column) = meta.to_one_column(relation) else {
            return Err(self.unknown_attribute(relation));
        };
        let column_name = column.name.clone();
        let value = match target.id() {
            Some(id) => FieldValue::Int(id),
            None => FieldValue::Null,
        };
        self.set(&column_name, value)
    }

    /// INSERT this record.
    ///
    /// An unset auto-increment key is omitted from the statement and filled
    /// in from the generated row id afterwards; a manually assigned key is
    /// written as-is.
    ///
    /// # Errors
    /// Propagates any driver error.
    pub async fn insert(&mut self, ctx: &Context) -> Result<(), EntityLiteError> {
        let (sql, params) = self.insert_statement();
        debug!(entity = self.meta.entity_name(), sql = %sql, "inserting record");
        let outcome = ctx.connection().execute(&sql, &params).await?;
        self.apply_insert(&outcome);
        Ok(())
    }

    /// UPDATE this record's row by primary key.
    ///
    /// # Errors
    /// Returns [`EntityLiteError::NotPersisted`] when no primary-key value is
    /// set, and propagates any driver error.
    pub async fn update(&mut self, ctx: &Context) -> Result<(), EntityLiteError> {
        if let Some((sql, params)) = self.update_statement()? {
            debug!(entity = self.meta.entity_name(), sql = %sql, "updating record");
            ctx.connection().execute(&sql, &params).await?;
        }
        self.persisted = true;
        Ok(())
    }

    /// Insert or update depending on whether this instance is persisted.
    ///
    /// # Errors
    /// Propagates the errors of [`Record::insert`] or [`Record::update`].
    pub async fn save(&mut self, ctx: &Context) -> Result<(), EntityLiteError> {
        if self.persisted {
            self.update(ctx).await
        } else {
            self.insert(ctx).await
        }
    }

    /// DELETE this record's row, then clear its key and persistence flag so
    /// a later save performs a fresh insert.
    ///
    /// # Errors
    /// Returns [`EntityLiteError::NotPersisted`] when the instance is not
    /// persisted, and propagates any driver error.
    pub async fn delete(&mut self, ctx: &Context) -> Result<(), EntityLiteError> {
        let (sql, params) = self.delete_statement()?;
        debug!(entity = self.meta.entity_name(), sql = %sql, "deleting record");
        ctx.connection().execute(&sql, &params).await?;
        self.mark_deleted();
        Ok(())
    }

    /// The to-many relationship `relation` as a further-filterable query
    /// scoped to this record's key.
    ///
    /// For a transient owner the query is pinned to an impossible generated
    /// key, so it matches nothing.
    ///
    /// # Errors
    /// Returns [`EntityLiteError::UnknownAttribute`] when no registered
    /// entity back-populates `relation` onto this shape.
    pub fn to_many(&self, ctx: &Context, relation: &str) -> Result<Query, EntityLiteError> {
        let (child_meta, fk_column) = ctx.registry().to_many_source(&self.meta, relation)?;
        let query = Query::new(Arc::clone(&child_meta), ctx.connection().clone());
        let query = match self.id() {
            Some(id) => query.filter(col(fk_column).eq(id)),
            None => query.filter(col(child_meta.primary_key().name.clone()).eq(-1_i64)),
        };
        Ok(query)
    }

    /// Resolve the to-one relationship `relation`, caching the result
    /// (including absence) on this instance.
    ///
    /// A NULL foreign key resolves to `None` without touching the database.
    /// Reassigning the foreign-key column invalidates the cache.
    ///
    /// # Errors
    /// Returns [`EntityLiteError::UnknownAttribute`] when no foreign-key
    /// column induces `relation`, [`EntityLiteError::UnknownEntity`] when the
    /// key's target shape was never registered, and propagates driver errors.
    pub async fn to_one(
        &mut self,
        ctx: &Context,
        relation: &str,
    ) -> Result<Option<Record>, EntityLiteError> {
        let meta = Arc::clone(&self.meta);
        let Some(column) = meta.to_one_column(relation) else {
            return Err(self.unknown_attribute(relation));
        };
        let Some(fk) = &column.foreign_key else {
            return Err(self.unknown_attribute(relation));
        };
        if let Some(cached) = self.to_one_cache.get(relation) {
            return Ok(cached.clone());
        }
        let fk_value = self.get(&column.name)?.clone();
        if fk_value.is_null() {
            self.to_one_cache.insert(relation.to_string(), None);
            return Ok(None);
        }
        let target_meta = ctx.registry().resolve(&fk.target_entity)?;
        let fetched = Query::new(target_meta, ctx.connection().clone())
            .filter(col(fk.target_column.clone()).eq(fk_value))
            .first()
            .await?;
        self.to_one_cache.insert(relation.to_string(), fetched.clone());
        Ok(fetched)
    }

    pub(crate) fn insert_statement(&self) -> (String, Vec<FieldValue>) {
        let pk_index = self.meta.primary_key_index();
        let mut columns = Vec::new();
        let mut params = Vec::new();
        for (idx, column) in self.meta.columns().iter().enumerate() {
            if idx == pk_index && self.values[idx].is_null() {
                continue;
            }
            columns.push(quote_ident(&column.name));
            params.push(self.values[idx].clone());
        }
        let table = quote_ident(self.meta.table_name());
        if columns.is_empty() {
            return (format!("INSERT INTO {table} DEFAULT VALUES"), params);
        }
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({placeholders})",
            columns.join(", ")
        );
        (sql, params)
    }

    pub(crate) fn apply_insert(&mut self, outcome: &DmlOutcome) {
        let pk_index = self.meta.primary_key_index();
        if self.values[pk_index].is_null() {
            self.values[pk_index] = FieldValue::Int(outcome.last_insert_id);
        }
        self.persisted = true;
    }

    pub(crate) fn update_statement(
        &self,
    ) -> Result<Option<(String, Vec<FieldValue>)>, EntityLiteError> {
        let pk_index = self.meta.primary_key_index();
        let pk_value = self.values[pk_index].clone();
        if pk_value.is_null() {
            return Err(EntityLiteError::NotPersisted {
                entity: self.meta.entity_name().to_string(),
                detail: "update requires a primary key value".to_string(),
            });
        }
        let mut assignments = Vec::new();
        let mut params = Vec::new();
        for (idx, column) in self.meta.columns().iter().enumerate() {
            if idx == pk_index {
                continue;
            }
            assignments.push(format!("{} = ?", quote_ident(&column.name)));
            params.push(self.values[idx].clone());
        }
        if assignments.is_empty() {
            return Ok(None);
        }
        params.push(pk_value);
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            quote_ident(self.meta.table_name()),
            assignments.join(", "),
            quote_ident(&self.meta.primary_key().name)
        );
        Ok(Some((sql, params)))
    }

    pub(crate) fn delete_statement(&self) -> Result<(String, Vec<FieldValue>), EntityLiteError> {
        if !self.persisted {
            return Err(EntityLiteError::NotPersisted {
                entity: self.meta.entity_name().to_string(),
                detail: "delete requires a persisted instance".to_string(),
            });
        }
        let pk_value = self.values[self.meta.primary_key_index()].clone();
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?",
            quote_ident(self.meta.table_name()),
            quote_ident(&self.meta.primary_key().name)
        );
        Ok((sql, vec![pk_value]))
    }

    pub(crate) fn mark_deleted(&mut self) {
        let pk_index = self.meta.primary_key_index();
        self.values[pk_index] = FieldValue::Null;
        self.persisted = false;
    }

    pub(crate) fn mark_persisted(&mut self) {
        self.persisted = true;
    }

    fn unknown_attribute(&self, attribute: &str) -> EntityLiteError {
        EntityLiteError::UnknownAttribute {
            entity: self.meta.entity_name().to_string(),
            attribute: attribute.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{EntityDef, FieldDef};

    fn user_meta() -> Arc<EntityMeta> {
        let def = EntityDef::new("User")
            .field("name", FieldDef::text().not_null())
            .field("active", FieldDef::boolean().default_value(true));
        Arc::new(EntityMeta::from_def(def).unwrap())
    }

    #[test]
    fn new_record_applies_defaults() {
        let record = Record::new(user_meta());
        assert!(!record.is_persisted());
        assert_eq!(record.id(), None);
        assert_eq!(record.get("active").unwrap(), &FieldValue::Bool(true));
        assert_eq!(record.get("name").unwrap(), &FieldValue::Null);
    }

    #[test]
    fn insert_statement_skips_unset_key() {
        let mut record = Record::new(user_meta());
        record.set("name", "alice").unwrap();
        let (sql, params) = record.insert_statement();
        assert_eq!(sql, "INSERT INTO users (name, active) VALUES (?, ?)");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn insert_statement_includes_assigned_key() {
        let mut record = Record::new(user_meta());
        record.set("id", 42_i64).unwrap();
        record.set("name", "alice").unwrap();
        let (sql, params) = record.insert_statement();
        assert_eq!(sql, "INSERT INTO users (id, name, active) VALUES (?, ?, ?)");
        assert_eq!(params[0], FieldValue::Int(42));
    }

    #[test]
    fn update_statement_requires_key_value() {
        let record = Record::new(user_meta());
        let err = record.update_statement().unwrap_err();
        assert!(matches!(err, EntityLiteError::NotPersisted { .. }));
    }

    #[test]
    fn delete_statement_requires_persistence() {
        let mut record = Record::new(user_meta());
        record.set("id", 7_i64).unwrap();
        let err = record.delete_statement().unwrap_err();
        assert!(matches!(err, EntityLiteError::NotPersisted { .. }));
    }

    #[test]
    fn set_rejects_mismatched_values() {
        let mut record = Record::new(user_meta());
        let err = record.set("active", "yes").unwrap_err();
        assert!(matches!(err, EntityLiteError::TypeCoercion { .. }));
        let err = record.set("name", FieldValue::Null).unwrap_err();
        assert!(matches!(err, EntityLiteError::TypeCoercion { .. }));
        let err = record.set("nickname", "al").unwrap_err();
        assert!(matches!(err, EntityLiteError::UnknownAttribute { .. }));
    }
}
