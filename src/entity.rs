//! Entity descriptors and the SQL generated from them.
//!
//! Every statement uses `?` placeholders for values. Table and column names
//! are interpolated directly and are validated when the descriptor is built.

use crate::error::{OrmError, Result};
use crate::mapper::MappedObject;
use crate::property::{validate_identifier, Property};
use crate::registry::Registry;
use crate::relationship::Relationship;
use indexmap::IndexMap;
use std::any::Any;
use tracing::debug;

/// Constructor producing a blank instance of the mapped type.
pub type Factory = fn() -> Box<dyn Any + Send>;

fn blank<T: Default + Send + 'static>() -> Box<dyn Any + Send> {
    Box::new(T::default())
}

/// Schema descriptor mapping a record type to a table.
#[derive(Debug, Clone)]
pub struct Entity {
    name: String,
    table_name: String,
    properties: IndexMap<String, Property>,
    primary_key: Option<String>,
    relationships: Vec<Relationship>,
    factory: Option<Factory>,
}

impl Entity {
    pub fn new(name: &str, table_name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(OrmError::Schema("entity name must not be empty".to_string()));
        }
        validate_identifier("table", table_name)?;
        Ok(Self {
            name: name.to_string(),
            table_name: table_name.to_string(),
            properties: IndexMap::new(),
            primary_key: None,
            relationships: Vec::new(),
            factory: None,
        })
    }

    /// Descriptor for `T`, named after `T::ENTITY_NAME` and producing
    /// `T::default()` as its blank instance.
    pub fn for_type<T: MappedObject + Default>(table_name: &str) -> Result<Self> {
        Ok(Self::new(T::ENTITY_NAME, table_name)?.with_factory(blank::<T>))
    }

    pub fn with_factory(mut self, factory: Factory) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn add_property(&mut self, property: Property) -> Result<()> {
        if self.properties.contains_key(property.key()) {
            return Err(OrmError::Schema(format!(
                "duplicate property {} on entity {}",
                property.key(),
                self.name
            )));
        }
        if self.property_for_column_name(property.column_name()).is_some() {
            return Err(OrmError::Schema(format!(
                "duplicate column {} on table {}",
                property.column_name(),
                self.table_name
            )));
        }
        self.properties.insert(property.key().to_string(), property);
        Ok(())
    }

    pub fn with_property(mut self, property: Property) -> Result<Self> {
        self.add_property(property)?;
        Ok(self)
    }

    /// Marks `key` as the primary key, replacing any previous choice.
    pub fn set_primary_key(&mut self, key: &str) -> Result<()> {
        match self.properties.get(key) {
            Some(property) if property.is_persistent() => {
                self.primary_key = Some(key.to_string());
                Ok(())
            }
            Some(_) => Err(OrmError::Schema(format!(
                "primary key {} of entity {} has no storage type",
                key, self.name
            ))),
            None => Err(OrmError::Schema(format!(
                "primary key {} is not a property of entity {}",
                key, self.name
            ))),
        }
    }

    pub fn with_primary_key(mut self, key: &str) -> Result<Self> {
        self.set_primary_key(key)?;
        Ok(self)
    }

    pub fn add_relationship(&mut self, relationship: Relationship) {
        self.relationships.push(relationship);
    }

    pub fn with_relationship(mut self, relationship: Relationship) -> Self {
        self.add_relationship(relationship);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn property(&self, key: &str) -> Option<&Property> {
        self.properties.get(key)
    }

    /// Property for `key` if it is stored in a column.
    pub fn persistent_property(&self, key: &str) -> Option<&Property> {
        self.property(key).filter(|p| p.is_persistent())
    }

    /// First property stored under `column`, scanning in registration order.
    pub fn property_for_column_name(&self, column: &str) -> Option<&Property> {
        self.properties.values().find(|p| p.column_name() == column)
    }

    pub fn primary_key_property(&self) -> Option<&Property> {
        self.primary_key.as_deref().and_then(|key| self.property(key))
    }

    fn require_primary_key(&self) -> Result<&Property> {
        self.primary_key_property()
            .ok_or_else(|| OrmError::NoPrimaryKey(self.name.clone()))
    }

    fn persistent_properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.values().filter(|p| p.is_persistent())
    }

    /// Builds a blank instance through the registered factory.
    pub fn instantiate<T: 'static>(&self) -> Result<T> {
        let factory = self.factory.ok_or_else(|| {
            OrmError::Factory(format!("entity {} has no factory", self.name))
        })?;
        factory().downcast::<T>().map(|object| *object).map_err(|_| {
            OrmError::Factory(format!(
                "factory of entity {} does not produce {}",
                self.name,
                std::any::type_name::<T>()
            ))
        })
    }

    pub fn schema_sql(&self) -> String {
        let columns: Vec<String> = self
            .persistent_properties()
            .map(|p| {
                let mut def = p.column_definition();
                if self.primary_key.as_deref() == Some(p.key()) {
                    def.push_str(" PRIMARY KEY");
                }
                def
            })
            .collect();

        if columns.is_empty() {
            format!("CREATE TABLE IF NOT EXISTS {}", self.table_name)
        } else {
            format!(
                "CREATE TABLE IF NOT EXISTS {} ({})",
                self.table_name,
                columns.join(", ")
            )
        }
    }

    /// Comma separated column names, or `*` when nothing is mapped.
    pub fn columns_list_string(&self) -> String {
        let columns: Vec<&str> = self.persistent_properties().map(|p| p.column_name()).collect();
        if columns.is_empty() {
            "*".to_string()
        } else {
            columns.join(", ")
        }
    }

    fn qualified_columns_list(&self) -> String {
        let columns: Vec<String> = self
            .persistent_properties()
            .map(|p| format!("{}.{}", self.table_name, p.column_name()))
            .collect();
        if columns.is_empty() {
            "*".to_string()
        } else {
            columns.join(", ")
        }
    }

    fn resolve_columns<'a>(&'a self, keys: &[&str]) -> Vec<&'a str> {
        keys.iter()
            .filter_map(|key| self.persistent_property(key))
            .map(|p| p.column_name())
            .collect()
    }

    /// `INSERT` for the resolvable `keys`, in their order. Unknown keys are
    /// skipped without shifting the placeholders.
    pub fn insert_sql_for_keys(&self, keys: &[&str]) -> String {
        let columns = self.resolve_columns(keys);
        if columns.is_empty() {
            return format!("INSERT INTO {} DEFAULT VALUES", self.table_name);
        }
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table_name,
            columns.join(", "),
            vec!["?"; columns.len()].join(", ")
        )
    }

    /// `UPDATE` of the resolvable `keys`; the primary key is the last parameter.
    pub fn update_sql_for_keys(&self, keys: &[&str]) -> Result<String> {
        let pk = self.require_primary_key()?;
        let columns = self.resolve_columns(keys);
        if columns.is_empty() {
            return Err(OrmError::NoColumns(self.name.clone()));
        }
        let assignments: Vec<String> = columns.iter().map(|c| format!("{} = ?", c)).collect();
        Ok(format!(
            "UPDATE {} SET {} WHERE {} = ?",
            self.table_name,
            assignments.join(", "),
            pk.column_name()
        ))
    }

    /// Single-statement insert or update keyed on the primary key. `keys`
    /// must include the primary key.
    pub fn upsert_sql_for_keys(&self, keys: &[&str]) -> Result<String> {
        let pk = self.require_primary_key()?;
        if !keys.contains(&pk.key()) {
            return Err(OrmError::NoPrimaryKey(self.name.clone()));
        }
        let insert = self.insert_sql_for_keys(keys);
        let assignments: Vec<String> = self
            .resolve_columns(keys)
            .into_iter()
            .filter(|c| *c != pk.column_name())
            .map(|c| format!("{} = excluded.{}", c, c))
            .collect();
        if assignments.is_empty() {
            Ok(format!("{} ON CONFLICT({}) DO NOTHING", insert, pk.column_name()))
        } else {
            Ok(format!(
                "{} ON CONFLICT({}) DO UPDATE SET {}",
                insert,
                pk.column_name(),
                assignments.join(", ")
            ))
        }
    }

    pub fn delete_by_primary_key_sql(&self) -> Result<String> {
        let pk = self.require_primary_key()?;
        Ok(format!(
            "DELETE FROM {} WHERE {} = ?",
            self.table_name,
            pk.column_name()
        ))
    }

    pub fn select_sql(&self) -> String {
        format!("SELECT {} FROM {}", self.columns_list_string(), self.table_name)
    }

    /// Lookup by primary key, optionally joining every relationship whose
    /// columns resolve against `registry`, in registration order.
    ///
    /// Joined tables are aliased `j1`, `j2`, ... so the same table may be
    /// joined more than once, including the entity's own table.
    pub fn find_by_primary_key_sql(
        &self,
        include_relationships: bool,
        registry: &Registry,
    ) -> Result<String> {
        let pk = self.require_primary_key()?;
        let joins: Vec<String> = if include_relationships {
            self.relationships
                .iter()
                .filter_map(|r| self.join_target(r, registry))
                .enumerate()
                .map(|(n, (table, local, foreign))| {
                    let alias = format!("j{}", n + 1);
                    format!(
                        "LEFT JOIN {} AS {} ON {}.{} = {}.{}",
                        table, alias, self.table_name, local, alias, foreign
                    )
                })
                .collect()
        } else {
            Vec::new()
        };

        if joins.is_empty() {
            return Ok(format!(
                "SELECT {} FROM {} WHERE {} = ?",
                self.columns_list_string(),
                self.table_name,
                pk.column_name()
            ));
        }
        Ok(format!(
            "SELECT {} FROM {} {} WHERE {}.{} = ?",
            self.qualified_columns_list(),
            self.table_name,
            joins.join(" "),
            self.table_name,
            pk.column_name()
        ))
    }

    /// Foreign table, local column and foreign column of `relationship`.
    fn join_target<'a>(
        &'a self,
        relationship: &Relationship,
        registry: &'a Registry,
    ) -> Option<(&'a str, &'a str, &'a str)> {
        let clause = self
            .persistent_property(relationship.property_key())
            .zip(registry.get(relationship.foreign_entity()))
            .and_then(|(local, foreign)| {
                let foreign_column = match relationship.foreign_property_key() {
                    Some(key) => foreign.persistent_property(key),
                    None => foreign.primary_key_property(),
                }?;
                Some((
                    foreign.table_name(),
                    local.column_name(),
                    foreign_column.column_name(),
                ))
            });
        if clause.is_none() {
            debug!(
                entity = %self.name,
                foreign = %relationship.foreign_entity(),
                "dropping unresolvable relationship from join"
            );
        }
        clause
    }
}
