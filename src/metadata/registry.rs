use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::EntityLiteError;

use super::{EntityDef, EntityMeta};

/// Per-context registry of entity shapes.
///
/// Registration is append-only and idempotent: registering the identical
/// shape again returns the existing metadata, while registering a different
/// shape under the same name fails. Registration order is preserved because
/// schema synchronization walks entities in that order.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    by_name: HashMap<String, Arc<EntityMeta>>,
    order: Vec<String>,
}

impl EntityRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity shape.
    ///
    /// # Errors
    ///
    /// Returns [`EntityLiteError::ConfigError`] if the definition is invalid
    /// or conflicts with an already-registered shape of the same name.
    pub fn register(&self, def: EntityDef) -> Result<Arc<EntityMeta>, EntityLiteError> {
        let candidate = EntityMeta::from_def(def)?;
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = inner.by_name.get(candidate.entity_name()) {
            if **existing == candidate {
                return Ok(Arc::clone(existing));
            }
            return Err(EntityLiteError::ConfigError(format!(
                "entity {} is already registered with a different shape",
                candidate.entity_name()
            )));
        }
        let name = candidate.entity_name().to_string();
        let meta = Arc::new(candidate);
        inner.by_name.insert(name.clone(), Arc::clone(&meta));
        inner.order.push(name);
        Ok(meta)
    }

    /// Look up a registered shape by name.
    ///
    /// # Errors
    ///
    /// Returns [`EntityLiteError::UnknownEntity`] if the name was never
    /// registered.
    pub fn resolve(&self, name: &str) -> Result<Arc<EntityMeta>, EntityLiteError> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .by_name
            .get(name)
            .map(Arc::clone)
            .ok_or_else(|| EntityLiteError::UnknownEntity {
                name: name.to_string(),
            })
    }

    /// All registered shapes, in registration order.
    #[must_use]
    pub fn entities(&self) -> Vec<Arc<EntityMeta>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .order
            .iter()
            .filter_map(|name| inner.by_name.get(name).map(Arc::clone))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve a to-many relationship: find the registered entity carrying a
    /// foreign key that targets `owner` and whose `back_populates` equals
    /// `relation`. Returns that entity's metadata and the foreign-key column
    /// name.
    ///
    /// # Errors
    ///
    /// Returns [`EntityLiteError::UnknownAttribute`] if no registered entity
    /// back-populates `relation` onto `owner`.
    pub fn to_many_source(
        &self,
        owner: &EntityMeta,
        relation: &str,
    ) -> Result<(Arc<EntityMeta>, String), EntityLiteError> {
        for meta in self.entities() {
            for column in meta.foreign_key_columns() {
                let Some(fk) = &column.foreign_key else {
                    continue;
                };
                if fk.target_entity == owner.entity_name()
                    && fk.back_populates.as_deref() == Some(relation)
                {
                    let column_name = column.name.clone();
                    return Ok((Arc::clone(&meta), column_name));
                }
            }
        }
        Err(EntityLiteError::UnknownAttribute {
            entity: owner.entity_name().to_string(),
            attribute: relation.to_string(),
        })
    }
}
