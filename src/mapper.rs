//! Moves values between mapped objects and statements.

use crate::entity::Entity;
use crate::error::{OrmError, Result};
use crate::property::Property;
use crate::sqlite::{ResultRow, Statement};
use crate::value::{Params, Value};
use tracing::trace;

/// A record type persisted through an [`Entity`].
///
/// Implementations dispatch on the logical key explicitly and ignore keys
/// they do not know.
pub trait MappedObject: Send + 'static {
    /// Registry name of the entity describing this type.
    const ENTITY_NAME: &'static str;

    fn set_value(&mut self, key: &str, value: Value);
}

/// Pairs each key of `params` with its persistent property, keeping the
/// order of `params`. Keys without a stored property are dropped.
pub fn resolve_values<'e>(entity: &'e Entity, params: &Params) -> Vec<(&'e Property, Value)> {
    params
        .iter()
        .filter_map(|(key, value)| {
            let property = entity.persistent_property(key);
            if property.is_none() {
                trace!(entity = %entity.name(), key, "skipping unmapped key");
            }
            property.map(|p| (p, value.clone()))
        })
        .collect()
}

/// Binds `values` positionally, parameter `i + 1` taking entry `i`. Each
/// value must be coercible to the declared type of its property, and every
/// placeholder must receive exactly one value.
pub fn bind_values(statement: &mut Statement<'_>, values: &[(&Property, Value)]) -> Result<()> {
    if values.len() != statement.parameter_count() {
        return Err(OrmError::Bind(format!(
            "statement expects {} parameters, got {}",
            statement.parameter_count(),
            values.len()
        )));
    }
    for (offset, (property, value)) in values.iter().enumerate() {
        if !value.is_coercible_to(property.sql_type()) {
            return Err(OrmError::Bind(format!(
                "cannot bind {} value to {} column {}",
                value.sql_type(),
                property.sql_type(),
                property.column_name()
            )));
        }
        statement.bind_value(offset + 1, value)?;
    }
    Ok(())
}

/// Builds an object from the columns of `row` that map to a property of
/// `entity`. Other columns are skipped.
pub fn extract_row<T: MappedObject>(row: &ResultRow<'_, '_>, entity: &Entity) -> Result<T> {
    let mut object = entity.instantiate::<T>()?;
    for index in 0..row.column_count() {
        let property = row
            .column_name(index)
            .and_then(|column| entity.property_for_column_name(column));
        match property {
            Some(property) => object.set_value(property.key(), row.read(index)?),
            None => trace!(entity = %entity.name(), column = ?row.column_name(index), "skipping column"),
        }
    }
    Ok(object)
}

/// Builds a fresh object from already resolved values.
pub fn populate<T: MappedObject>(entity: &Entity, values: Vec<(&Property, Value)>) -> Result<T> {
    let mut object = entity.instantiate::<T>()?;
    for (property, value) in values {
        object.set_value(property.key(), value);
    }
    Ok(object)
}
