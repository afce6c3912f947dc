use crate::entity::Entity;
use crate::error::{OrmError, Result};
use crate::mapper::MappedObject;
use std::collections::HashMap;
use std::sync::Arc;

/// Entities known to a [`Context`](crate::Context), keyed by entity name.
///
/// Built up front and frozen once registered: entries are shared behind
/// `Arc` and never mutated afterwards.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    entities: HashMap<String, Arc<Entity>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entity: Entity) -> Result<Arc<Entity>> {
        if self.entities.contains_key(entity.name()) {
            return Err(OrmError::Schema(format!(
                "entity {} already registered",
                entity.name()
            )));
        }
        let entity = Arc::new(entity);
        self.entities
            .insert(entity.name().to_string(), Arc::clone(&entity));
        Ok(entity)
    }

    pub fn with_entity(mut self, entity: Entity) -> Result<Self> {
        self.register(entity)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Entity>> {
        self.entities.get(name)
    }

    /// Entity registered for the mapped type `T`.
    pub fn entity_for<T: MappedObject>(&self) -> Result<Arc<Entity>> {
        self.get(T::ENTITY_NAME)
            .cloned()
            .ok_or_else(|| OrmError::EntityNotRegistered(T::ENTITY_NAME.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Entity>> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
