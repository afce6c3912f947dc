// Tests for the serial work queue in front of a Context.

use anyhow::Result;
use rust_sqlite_orm::{
    params, Entity, MappedObject, OrmError, Property, Registry, SqlType, SqliteConfig,
    SqliteService, Value,
};
use std::sync::Arc;
use tempfile::NamedTempFile;

#[derive(Debug, Default, Clone, PartialEq)]
struct User {
    id: i64,
    name: String,
    email: String,
    age: Option<i64>,
}

impl MappedObject for User {
    const ENTITY_NAME: &'static str = "User";

    fn set_value(&mut self, key: &str, value: Value) {
        match key {
            "id" => self.id = value.as_integer().unwrap_or_default(),
            "name" => self.name = value.as_text().unwrap_or_default().to_string(),
            "email" => self.email = value.as_text().unwrap_or_default().to_string(),
            "age" => self.age = value.as_integer(),
            _ => {}
        }
    }
}

fn registry() -> rust_sqlite_orm::Result<Registry> {
    let users = Entity::for_type::<User>("users")?
        .with_property(Property::new("id", SqlType::Integer)?)?
        .with_property(Property::new("name", SqlType::Text)?.not_null())?
        .with_property(Property::new("email", SqlType::Text)?.not_null().unique())?
        .with_property(Property::new("age", SqlType::Integer)?)?
        .with_primary_key("id")?;
    Registry::new().with_entity(users)
}

async fn start_service() -> Result<(SqliteService, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let service = SqliteService::start(SqliteConfig::new(temp_file.path()), registry()?).await?;
    Ok((service, temp_file))
}

#[tokio::test]
async fn test_basic_operations() {
    test_basic_operations_impl().await.unwrap();
}

async fn test_basic_operations_impl() -> Result<()> {
    let (service, _file) = start_service().await?;

    let john: User = service
        .create(params! {
            "id" => 1_i64,
            "name" => "John Doe",
            "email" => "john@example.com",
            "age" => 30_i64,
        })
        .await?;
    assert_eq!(john.age, Some(30));

    let user = service.find::<User>(1_i64).await?.expect("user exists");
    assert_eq!(user, john);

    service
        .update::<User>(1_i64, params! { "age" => 31_i64 })
        .await?;
    let updated = service.find::<User>(1_i64).await?;
    assert_eq!(updated.and_then(|u| u.age), Some(31));

    service
        .create_or_update::<User>(
            2_i64,
            params! { "name" => "Jane", "email" => "jane@example.com" },
        )
        .await?;
    assert_eq!(service.all::<User>().await?.len(), 2);

    assert_eq!(service.delete::<User>(1_i64).await?, 1);
    assert!(!service.exists::<User>(1_i64).await?);
    assert!(service.exists::<User>(2_i64).await?);

    service.stop().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_are_serialized() -> Result<()> {
    let (service, _file) = start_service().await?;
    let service = Arc::new(service);

    let mut handles = Vec::new();
    for id in 0..32_i64 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service
                .create::<User>(params! {
                    "id" => id,
                    "name" => format!("user {}", id),
                    "email" => format!("user{}@example.com", id),
                })
                .await
        }));
    }
    for handle in handles {
        handle.await??;
    }

    let users = service.all::<User>().await?;
    assert_eq!(users.len(), 32);

    let count = service
        .execute(|context| Ok(context.all::<User>()?.len()))
        .await?;
    assert_eq!(count, 32);
    Ok(())
}

#[tokio::test]
async fn test_errors_are_returned_to_caller() -> Result<()> {
    let (service, _file) = start_service().await?;
    service
        .create::<User>(params! { "id" => 1_i64, "name" => "A", "email" => "a@example.com" })
        .await?;

    let duplicate = service
        .create::<User>(params! { "id" => 2_i64, "name" => "B", "email" => "a@example.com" })
        .await;
    assert!(matches!(duplicate, Err(OrmError::Step(_))));

    let mismatch = service.find::<User>(Value::Blob(vec![1])).await;
    assert!(matches!(mismatch, Err(OrmError::Bind(_))));

    assert_eq!(service.find::<User>(2_i64).await?, None);
    Ok(())
}

#[test]
fn test_blocking_execution() -> Result<()> {
    let temp_file = NamedTempFile::new()?;
    let service = futures::executor::block_on(SqliteService::start(
        SqliteConfig::new(temp_file.path()),
        registry()?,
    ))?;

    let rowid = service.execute_blocking(|context| {
        context.create::<User>(&params! { "name" => "Ann", "email" => "ann@example.com" })?;
        context.last_insert_row_id()
    })?;
    assert_eq!(rowid, 1);

    let ann = service.execute_blocking(move |context| context.find::<User>(rowid))?;
    assert_eq!(ann.map(|u| u.email), Some("ann@example.com".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_start_fails_for_unopenable_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("db.sqlite");
    let result = SqliteService::start(SqliteConfig::new(path), Registry::new()).await;
    assert!(matches!(result, Err(OrmError::Open(_))));
}
