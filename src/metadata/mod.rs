// Entity metadata: declaration builders, the normalized per-shape metadata,
// and the registry that owns one metadata instance per registered shape.
//
// - naming: table-name derivation and identifier escaping
// - registry: the per-context entity registry

pub(crate) mod naming;
pub mod registry;

use serde::Serialize;

use crate::error::EntityLiteError;
use crate::value::{FieldType, FieldValue};

pub use registry::EntityRegistry;

/// Declares one plain column: its semantic type, nullability, key and
/// default attributes.
///
/// ```rust
/// use entity_lite::prelude::*;
///
/// let def = FieldDef::text().not_null().default_value("pending");
/// # let _ = def;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    field_type: FieldType,
    primary_key: bool,
    nullable: bool,
    default: Option<FieldValue>,
}

impl FieldDef {
    fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            primary_key: false,
            nullable: true,
            default: None,
        }
    }

    #[must_use]
    pub fn integer() -> Self {
        Self::new(FieldType::Integer)
    }

    #[must_use]
    pub fn real() -> Self {
        Self::new(FieldType::Real)
    }

    #[must_use]
    pub fn text() -> Self {
        Self::new(FieldType::Text)
    }

    #[must_use]
    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    #[must_use]
    pub fn timestamp() -> Self {
        Self::new(FieldType::Timestamp)
    }

    #[must_use]
    pub fn decimal() -> Self {
        Self::new(FieldType::Decimal)
    }

    /// Mark this field as the primary key. Primary keys are implicitly
    /// non-nullable and auto-generated on insert when left unset.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<FieldValue>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Declares a foreign-key column referencing another entity's key column.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyDef {
    target_entity: String,
    target_column: String,
    nullable: bool,
    back_populates: Option<String>,
}

impl ForeignKeyDef {
    #[must_use]
    pub fn new(target_entity: impl Into<String>) -> Self {
        Self {
            target_entity: target_entity.into(),
            target_column: "id".to_string(),
            nullable: true,
            back_populates: None,
        }
    }

    #[must_use]
    pub fn target_column(mut self, column: impl Into<String>) -> Self {
        self.target_column = column.into();
        self
    }

    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Name of the to-many relationship this key installs on the target
    /// entity.
    #[must_use]
    pub fn back_populates(mut self, name: impl Into<String>) -> Self {
        self.back_populates = Some(name.into());
        self
    }
}

/// Builder for one entity shape: a name, an optional table override, and the
/// declared fields and foreign keys in order.
///
/// Registration (see [`EntityRegistry::register`]) normalizes a definition
/// into an immutable [`EntityMeta`], injecting an `id` integer primary key
/// when the shape declares none.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDef {
    name: String,
    table_name: Option<String>,
    fields: Vec<(String, FieldDef)>,
    foreign_keys: Vec<(String, ForeignKeyDef)>,
}

impl EntityDef {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table_name: None,
            fields: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Override the derived table name.
    #[must_use]
    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.fields.push((name.into(), def));
        self
    }

    #[must_use]
    pub fn foreign_key(mut self, name: impl Into<String>, def: ForeignKeyDef) -> Self {
        self.foreign_keys.push((name.into(), def));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Resolved foreign-key attributes carried by a column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForeignKeyRef {
    /// Name of the referenced entity shape. Resolved lazily: schema sync,
    /// query building, and relationship access look it up in the registry
    /// at use time, so entities may be declared in any order.
    pub target_entity: String,
    /// Referenced column on the target, `id` unless overridden.
    pub target_column: String,
    /// To-many relationship name installed on the target entity, if any.
    pub back_populates: Option<String>,
}

/// One normalized column of an entity's table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDef {
    pub name: String,
    pub field_type: FieldType,
    pub primary_key: bool,
    pub nullable: bool,
    pub default: Option<FieldValue>,
    pub foreign_key: Option<ForeignKeyRef>,
}

/// Immutable metadata for one registered entity shape, shared by every
/// record of that shape.
#[derive(Debug, PartialEq)]
pub struct EntityMeta {
    entity_name: String,
    table_name: String,
    columns: Vec<ColumnDef>,
    primary_key_index: usize,
}

impl EntityMeta {
    /// Normalize a declaration into metadata. Fails with
    /// [`EntityLiteError::ConfigError`] for duplicate column names, multiple
    /// primary keys, a non-integer primary key, or a default value that does
    /// not match its field's declared type.
    pub(crate) fn from_def(def: EntityDef) -> Result<Self, EntityLiteError> {
        let EntityDef {
            name,
            table_name,
            fields,
            foreign_keys,
        } = def;

        let mut columns: Vec<ColumnDef> = Vec::with_capacity(fields.len() + foreign_keys.len() + 1);

        let declares_pk = fields.iter().any(|(_, f)| f.primary_key);
        if !declares_pk {
            columns.push(ColumnDef {
                name: "id".to_string(),
                field_type: FieldType::Integer,
                primary_key: true,
                nullable: false,
                default: None,
                foreign_key: None,
            });
        }

        for (field_name, field) in fields {
            if field.primary_key && field.field_type != FieldType::Integer {
                return Err(EntityLiteError::ConfigError(format!(
                    "entity {name}: primary key {field_name} must be an Integer field"
                )));
            }
            let default = match field.default {
                Some(value) => Some(value.coerce_for(field.field_type).map_err(|detail| {
                    EntityLiteError::ConfigError(format!(
                        "entity {name}: default for {field_name}: {detail}"
                    ))
                })?),
                None => None,
            };
            columns.push(ColumnDef {
                name: field_name,
                field_type: field.field_type,
                primary_key: field.primary_key,
                nullable: field.nullable && !field.primary_key,
                default,
                foreign_key: None,
            });
        }

        for (fk_name, fk) in foreign_keys {
            columns.push(ColumnDef {
                name: fk_name,
                field_type: FieldType::Integer,
                primary_key: false,
                nullable: fk.nullable,
                default: None,
                foreign_key: Some(ForeignKeyRef {
                    target_entity: fk.target_entity,
                    target_column: fk.target_column,
                    back_populates: fk.back_populates,
                }),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(EntityLiteError::ConfigError(format!(
                    "entity {name}: duplicate column {}",
                    column.name
                )));
            }
        }

        let pk_indices: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.primary_key)
            .map(|(i, _)| i)
            .collect();
        let primary_key_index = match pk_indices.as_slice() {
            [single] => *single,
            _ => {
                return Err(EntityLiteError::ConfigError(format!(
                    "entity {name}: exactly one primary key is required"
                )));
            }
        };

        let table_name = table_name.unwrap_or_else(|| naming::derive_table_name(&name));

        Ok(Self {
            entity_name: name,
            table_name,
            columns,
            primary_key_index,
        })
    }

    #[must_use]
    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    #[must_use]
    pub fn primary_key_index(&self) -> usize {
        self.primary_key_index
    }

    #[must_use]
    pub fn primary_key(&self) -> &ColumnDef {
        &self.columns[self.primary_key_index]
    }

    /// Foreign-key columns in declaration order.
    pub fn foreign_key_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.foreign_key.is_some())
    }

    /// The foreign-key column behind a to-one relationship name:
    /// `user` -> column `user_id`, if declared as a foreign key.
    #[must_use]
    pub fn to_one_column(&self, relation: &str) -> Option<&ColumnDef> {
        self.foreign_key_columns()
            .find(|c| naming::relation_name_for_fk(&c.name) == Some(relation))
    }
}
