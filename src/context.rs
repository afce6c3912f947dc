use crate::entity::Entity;
use crate::error::{OrmError, Result};
use crate::mapper::{self, MappedObject};
use crate::registry::Registry;
use crate::sqlite::{Connection, SqliteConfig};
use crate::value::{Params, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A table that could not be created during bulk schema setup.
#[derive(Debug)]
pub struct SchemaFailure {
    pub entity: String,
    pub error: OrmError,
}

/// Owns one connection and the registered entities, and runs typed CRUD
/// operations through them.
///
/// One logical operation at a time: statements are prepared per call and
/// released before the call returns.
#[derive(Debug)]
pub struct Context {
    config: SqliteConfig,
    registry: Registry,
    connection: Option<Connection>,
}

impl Context {
    pub fn new(config: SqliteConfig, registry: Registry) -> Self {
        Self {
            config,
            registry,
            connection: None,
        }
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    /// Opens the connection and creates the table of every registered
    /// entity. Table failures are logged and tolerated. Calling this again
    /// on an open context does nothing.
    pub fn initialize_database(&mut self) -> Result<()> {
        if self.connection.is_some() {
            debug!(path = %self.config.db_path.display(), "database already open");
            return Ok(());
        }
        self.connection = Some(Connection::open(&self.config)?);
        self.create_entity_tables()?;
        Ok(())
    }

    /// Creates every registered table, continuing past failures.
    pub fn create_entity_tables(&self) -> Result<Vec<SchemaFailure>> {
        let connection = self.connection()?;
        let mut failures = Vec::new();
        for entity in self.registry.iter() {
            if let Err(error) = create_table(connection, entity) {
                warn!(entity = %entity.name(), %error, "failed to create table");
                failures.push(SchemaFailure {
                    entity: entity.name().to_string(),
                    error,
                });
            }
        }
        Ok(failures)
    }

    /// Creates the table for `T`.
    pub fn initialize_for_type<T: MappedObject>(&self) -> Result<()> {
        let entity = self.registry.entity_for::<T>()?;
        create_table(self.connection()?, &entity)
    }

    /// Registers `entity`, creating its table right away when the database
    /// is open. A failed table creation is logged, not returned.
    pub fn register(&mut self, entity: Entity) -> Result<()> {
        let entity = self.registry.register(entity)?;
        if let Some(connection) = &self.connection {
            if let Err(error) = create_table(connection, &entity) {
                warn!(entity = %entity.name(), %error, "failed to create table");
            }
        }
        Ok(())
    }

    fn connection(&self) -> Result<&Connection> {
        self.connection.as_ref().ok_or(OrmError::DatabaseNotOpen)
    }

    /// Inserts a row built from `values` and returns an object populated from
    /// the same values. The row is not read back, so generated columns are
    /// only visible through [`Context::last_insert_row_id`].
    pub fn create<T: MappedObject>(&self, values: &Params) -> Result<T> {
        let connection = self.connection()?;
        let entity = self.registry.entity_for::<T>()?;
        let bound = mapper::resolve_values(&entity, values);
        let keys: Vec<&str> = bound.iter().map(|(p, _)| p.key()).collect();
        let sql = entity.insert_sql_for_keys(&keys);

        let mut statement = connection.prepare(&sql)?;
        mapper::bind_values(&mut statement, &bound)?;
        statement.execute()?;
        statement.finalize()?;
        mapper::populate(&entity, bound)
    }

    /// Reads the row with primary key `pk`. No row is `Ok(None)`.
    pub fn find<T: MappedObject>(&self, pk: impl Into<Value>) -> Result<Option<T>> {
        let connection = self.connection()?;
        let entity = self.registry.entity_for::<T>()?;
        let pk_property = entity
            .primary_key_property()
            .ok_or_else(|| OrmError::NoPrimaryKey(entity.name().to_string()))?;
        let sql = entity.find_by_primary_key_sql(self.config.include_relationships, &self.registry)?;

        let mut statement = connection.prepare(&sql)?;
        mapper::bind_values(&mut statement, &[(pk_property, pk.into())])?;
        let found = statement.query_first(|row| mapper::extract_row::<T>(row, &entity))?;
        statement.finalize()?;
        Ok(found)
    }

    /// Reads every row of the table for `T`.
    pub fn all<T: MappedObject>(&self) -> Result<Vec<T>> {
        let connection = self.connection()?;
        let entity = self.registry.entity_for::<T>()?;
        let mut statement = connection.prepare(&entity.select_sql())?;
        let rows = statement.query_all(|row| mapper::extract_row::<T>(row, &entity))?;
        statement.finalize()?;
        Ok(rows)
    }

    /// Updates the row with primary key `pk` and returns the changed row count.
    pub fn update<T: MappedObject>(&self, pk: impl Into<Value>, values: &Params) -> Result<usize> {
        let connection = self.connection()?;
        let entity = self.registry.entity_for::<T>()?;
        let mut bound = mapper::resolve_values(&entity, values);
        let keys: Vec<&str> = bound.iter().map(|(p, _)| p.key()).collect();
        let sql = entity.update_sql_for_keys(&keys)?;
        let pk_property = entity
            .primary_key_property()
            .ok_or_else(|| OrmError::NoPrimaryKey(entity.name().to_string()))?;
        bound.push((pk_property, pk.into()));

        let mut statement = connection.prepare(&sql)?;
        mapper::bind_values(&mut statement, &bound)?;
        let changed = statement.execute()?;
        statement.finalize()?;
        Ok(changed)
    }

    pub fn exists<T: MappedObject>(&self, pk: impl Into<Value>) -> Result<bool> {
        let connection = self.connection()?;
        let entity = self.registry.entity_for::<T>()?;
        let pk_property = entity
            .primary_key_property()
            .ok_or_else(|| OrmError::NoPrimaryKey(entity.name().to_string()))?;
        let sql = entity.find_by_primary_key_sql(self.config.include_relationships, &self.registry)?;

        let mut statement = connection.prepare(&sql)?;
        mapper::bind_values(&mut statement, &[(pk_property, pk.into())])?;
        let found = statement.query_first(|_| Ok(()))?.is_some();
        statement.finalize()?;
        Ok(found)
    }

    /// Deletes the row with primary key `pk` and returns the changed row count.
    pub fn delete<T: MappedObject>(&self, pk: impl Into<Value>) -> Result<usize> {
        let connection = self.connection()?;
        let entity = self.registry.entity_for::<T>()?;
        let sql = entity.delete_by_primary_key_sql()?;
        let pk_property = entity
            .primary_key_property()
            .ok_or_else(|| OrmError::NoPrimaryKey(entity.name().to_string()))?;

        let mut statement = connection.prepare(&sql)?;
        mapper::bind_values(&mut statement, &[(pk_property, pk.into())])?;
        let changed = statement.execute()?;
        statement.finalize()?;
        Ok(changed)
    }

    /// Inserts the row keyed by `pk`, or updates it when it already exists,
    /// in a single upsert statement. A primary key entry in `values` is
    /// replaced by `pk`.
    ///
    /// The returned object is built from the supplied values. When only the
    /// key is supplied an existing row is left untouched, so the object is
    /// read back from the table instead.
    pub fn create_or_update<T: MappedObject>(
        &self,
        pk: impl Into<Value>,
        values: &Params,
    ) -> Result<T> {
        let connection = self.connection()?;
        let entity = self.registry.entity_for::<T>()?;
        let pk_property = entity
            .primary_key_property()
            .ok_or_else(|| OrmError::NoPrimaryKey(entity.name().to_string()))?;
        let mut bound = vec![(pk_property, pk.into())];
        bound.extend(
            mapper::resolve_values(&entity, values)
                .into_iter()
                .filter(|(p, _)| p.key() != pk_property.key()),
        );
        let keys: Vec<&str> = bound.iter().map(|(p, _)| p.key()).collect();
        let sql = entity.upsert_sql_for_keys(&keys)?;

        let mut statement = connection.prepare(&sql)?;
        mapper::bind_values(&mut statement, &bound)?;
        statement.execute()?;
        statement.finalize()?;

        if bound.len() == 1 {
            let pk = bound[0].1.clone();
            return self.find::<T>(pk)?.ok_or_else(|| {
                OrmError::Step(format!("upserted row of entity {} not found", entity.name()))
            });
        }
        mapper::populate(&entity, bound)
    }

    pub fn last_insert_row_id(&self) -> Result<i64> {
        Ok(self.connection()?.last_insert_rowid())
    }

    /// Closes the connection. Closing a closed context does nothing.
    pub fn close(&mut self) -> Result<()> {
        match self.connection.take() {
            Some(connection) => connection.close(),
            None => Ok(()),
        }
    }
}

fn create_table(connection: &Connection, entity: &Arc<Entity>) -> Result<()> {
    connection.execute(&entity.schema_sql())?;
    info!(entity = %entity.name(), table = %entity.table_name(), "created table");
    Ok(())
}
