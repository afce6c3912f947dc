use crate::mapper::MappedObject;

/// Link from a local property to a field of another entity. Only used to
/// synthesize `LEFT JOIN` clauses.
///
/// The foreign entity is referenced by registry name and resolved each time
/// SQL is generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    property_key: String,
    foreign_entity: String,
    foreign_property_key: Option<String>,
}

impl Relationship {
    /// The join matches the column of the local property `property_key`,
    /// which need not be the primary key.
    pub fn new(property_key: &str, foreign_entity: &str) -> Self {
        Self {
            property_key: property_key.to_string(),
            foreign_entity: foreign_entity.to_string(),
            foreign_property_key: None,
        }
    }

    /// Relationship to the entity registered for `T`.
    pub fn to<T: MappedObject>(property_key: &str) -> Self {
        Self::new(property_key, T::ENTITY_NAME)
    }

    /// Join on this foreign property instead of the foreign primary key.
    pub fn on_foreign_property(mut self, key: &str) -> Self {
        self.foreign_property_key = Some(key.to_string());
        self
    }

    pub fn property_key(&self) -> &str {
        &self.property_key
    }

    pub fn foreign_entity(&self) -> &str {
        &self.foreign_entity
    }

    pub fn foreign_property_key(&self) -> Option<&str> {
        self.foreign_property_key.as_deref()
    }
}
