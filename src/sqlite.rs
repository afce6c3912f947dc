//! Narrow wrapper over the rusqlite connection and statement API.
//!
//! Statements are finalized when dropped, so every exit path releases them;
//! [`Statement::finalize`] is the explicit form used on success.

use crate::error::{OrmError, Result};
use crate::value::{SqlType, Value};
use rusqlite::types::Null;
use rusqlite::{OpenFlags, ToSql};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_include_relationships() -> bool {
    true
}

/// SQLite configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Path to the SQLite database file
    pub db_path: PathBuf,
    /// Upper bound on how long a statement waits for a locked database
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Whether primary key lookups join registered relationships
    #[serde(default = "default_include_relationships")]
    pub include_relationships: bool,
}

impl SqliteConfig {
    /// Create a new SQLite config for the given path
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            busy_timeout_ms: default_busy_timeout_ms(),
            include_relationships: default_include_relationships(),
        }
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_relationships(mut self, include: bool) -> Self {
        self.include_relationships = include;
        self
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// An open SQLite database.
#[derive(Debug)]
pub struct Connection {
    inner: rusqlite::Connection,
    path: PathBuf,
}

impl Connection {
    /// Opens (or creates) the database read-write in serialized mode.
    pub fn open(config: &SqliteConfig) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
        let inner = rusqlite::Connection::open_with_flags(&config.db_path, flags)
            .map_err(|e| OrmError::engine(e, OrmError::Open))?;
        inner
            .busy_timeout(config.busy_timeout())
            .map_err(|e| OrmError::engine(e, OrmError::Open))?;
        info!(path = %config.db_path.display(), "opened sqlite database");
        Ok(Self {
            inner,
            path: config.db_path.clone(),
        })
    }

    /// Runs parameterless SQL such as DDL.
    pub fn execute(&self, sql: &str) -> Result<()> {
        debug!(%sql, "execute");
        self.inner
            .execute_batch(sql)
            .map_err(|e| OrmError::engine(e, OrmError::Exec))
    }

    pub fn prepare(&self, sql: &str) -> Result<Statement<'_>> {
        debug!(%sql, "prepare");
        let inner = self
            .inner
            .prepare(sql)
            .map_err(|e| OrmError::engine(e, OrmError::Prepare))?;
        Ok(Statement { inner })
    }

    pub fn last_insert_rowid(&self) -> i64 {
        self.inner.last_insert_rowid()
    }

    pub fn close(self) -> Result<()> {
        let path = self.path;
        self.inner
            .close()
            .map_err(|(_, e)| OrmError::engine(e, OrmError::Close))?;
        info!(path = %path.display(), "closed sqlite database");
        Ok(())
    }
}

/// A prepared statement tied to its connection.
pub struct Statement<'conn> {
    inner: rusqlite::Statement<'conn>,
}

impl<'conn> Statement<'conn> {
    pub fn parameter_count(&self) -> usize {
        self.inner.parameter_count()
    }

    fn bind_raw<T: ToSql>(&mut self, index: usize, value: T) -> Result<()> {
        self.inner
            .raw_bind_parameter(index, value)
            .map_err(|e| OrmError::engine(e, OrmError::Bind))
    }

    pub fn bind_null(&mut self, index: usize) -> Result<()> {
        self.bind_raw(index, Null)
    }

    pub fn bind_i64(&mut self, index: usize, value: i64) -> Result<()> {
        self.bind_raw(index, value)
    }

    pub fn bind_f64(&mut self, index: usize, value: f64) -> Result<()> {
        self.bind_raw(index, value)
    }

    /// Text is copied by the engine, the caller's buffer may go away.
    pub fn bind_text(&mut self, index: usize, value: &str) -> Result<()> {
        self.bind_raw(index, value)
    }

    /// Blobs are copied by the engine, as with text.
    pub fn bind_blob(&mut self, index: usize, value: &[u8]) -> Result<()> {
        self.bind_raw(index, value)
    }

    /// Binds `value` at the 1-based `index` by its storage class.
    pub fn bind_value(&mut self, index: usize, value: &Value) -> Result<()> {
        match value {
            Value::Null => self.bind_null(index),
            Value::Integer(v) => self.bind_i64(index, *v),
            Value::Float(v) => self.bind_f64(index, *v),
            Value::Text(v) => self.bind_text(index, v),
            Value::Blob(v) => self.bind_blob(index, v),
        }
    }

    /// Steps to completion and returns the number of changed rows.
    pub fn execute(&mut self) -> Result<usize> {
        self.inner
            .raw_execute()
            .map_err(|e| OrmError::engine(e, OrmError::Step))
    }

    /// Steps once and maps the produced row, if any.
    pub fn query_first<T>(
        &mut self,
        map: impl FnOnce(&ResultRow<'_, '_>) -> Result<T>,
    ) -> Result<Option<T>> {
        let columns = self.column_names();
        let mut rows = self.inner.raw_query();
        match rows.next().map_err(|e| OrmError::engine(e, OrmError::Step))? {
            Some(row) => map(&ResultRow {
                columns: &columns,
                row,
            })
            .map(Some),
            None => Ok(None),
        }
    }

    /// Steps until done, mapping every row.
    pub fn query_all<T>(
        &mut self,
        mut map: impl FnMut(&ResultRow<'_, '_>) -> Result<T>,
    ) -> Result<Vec<T>> {
        let columns = self.column_names();
        let mut rows = self.inner.raw_query();
        let mut mapped = Vec::new();
        while let Some(row) = rows.next().map_err(|e| OrmError::engine(e, OrmError::Step))? {
            mapped.push(map(&ResultRow {
                columns: &columns,
                row,
            })?);
        }
        Ok(mapped)
    }

    fn column_names(&self) -> Vec<String> {
        self.inner
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn finalize(self) -> Result<()> {
        self.inner
            .finalize()
            .map_err(|e| OrmError::engine(e, OrmError::Step))
    }
}

/// One result row together with the column names of its statement.
pub struct ResultRow<'r, 's> {
    columns: &'r [String],
    row: &'r rusqlite::Row<'s>,
}

impl ResultRow<'_, '_> {
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_name(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(String::as_str)
    }

    /// Runtime storage class of the cell, which may differ from the
    /// declared column type.
    pub fn column_type(&self, index: usize) -> Result<SqlType> {
        self.row
            .get_ref(index)
            .map(|cell| SqlType::from(cell.data_type()))
            .map_err(|e| OrmError::engine(e, OrmError::Step))
    }

    pub fn read(&self, index: usize) -> Result<Value> {
        self.row
            .get_ref(index)
            .map(Value::from)
            .map_err(|e| OrmError::engine(e, OrmError::Step))
    }
}
