//! Typed entity mapping over SQLite for the Runar ecosystem.
//!
//! # Intention
//!
//! - Describe record types as entities (properties, primary key, relationships).
//! - Generate the DDL and DML for those entities with `?` placeholders only.
//! - Bind typed values into statements and map result rows back into typed objects.
//!
//! # Architectural Boundaries
//!
//! - Only SQLite/database code belongs here.
//! - No business logic, query builders or schema migrations.
//! - One connection per [`Context`]; [`SqliteService`] serializes access to it.
//!
//! # Example
//!
//! ```rust,no_run
//! use rust_sqlite_orm::*;
//!
//! #[derive(Debug, Default)]
//! struct Person {
//!     id: i64,
//!     name: String,
//! }
//!
//! impl MappedObject for Person {
//!     const ENTITY_NAME: &'static str = "Person";
//!
//!     fn set_value(&mut self, key: &str, value: Value) {
//!         match key {
//!             "id" => self.id = value.as_integer().unwrap_or_default(),
//!             "name" => self.name = value.as_text().unwrap_or_default().to_string(),
//!             _ => {}
//!         }
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let person = Entity::for_type::<Person>("person")?
//!         .with_property(Property::new("id", SqlType::Integer)?)?
//!         .with_property(Property::new("name", SqlType::Text)?)?
//!         .with_primary_key("id")?;
//!     let registry = Registry::new().with_entity(person)?;
//!
//!     let mut context = Context::new(SqliteConfig::new("people.db"), registry);
//!     context.initialize_database()?;
//!     context.create::<Person>(&params! { "id" => 1_i64, "name" => "Ann" })?;
//!     let ann = context.find::<Person>(1_i64)?;
//!     assert_eq!(ann.map(|p| p.name), Some("Ann".to_string()));
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod entity;
pub mod error;
pub mod mapper;
pub mod property;
pub mod registry;
pub mod relationship;
pub mod service;
pub mod sqlite;
pub mod value;

pub use context::{Context, SchemaFailure};
pub use entity::{Entity, Factory};
pub use error::{OrmError, Result};
pub use mapper::MappedObject;
pub use property::Property;
pub use registry::Registry;
pub use relationship::Relationship;
pub use service::SqliteService;
pub use sqlite::{Connection, ResultRow, SqliteConfig, Statement};
pub use value::{Params, SqlType, Value};
