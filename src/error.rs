use thiserror::Error;

pub type Result<T> = std::result::Result<T, OrmError>;

#[derive(Debug, Error)]
pub enum OrmError {
    #[error("Open error: {0}")]
    Open(String),

    #[error("Close error: {0}")]
    Close(String),

    #[error("Exec error: {0}")]
    Exec(String),

    #[error("Prepare error: {0}")]
    Prepare(String),

    #[error("Bind error: {0}")]
    Bind(String),

    #[error("Step error: {0}")]
    Step(String),

    #[error("Database is not open")]
    DatabaseNotOpen,

    #[error("Unknown sqlite error (code {0})")]
    Unknown(i32),

    #[error("Entity {0} has no primary key")]
    NoPrimaryKey(String),

    #[error("No persistent columns resolved for entity {0}")]
    NoColumns(String),

    #[error("Entity not registered: {0}")]
    EntityNotRegistered(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Factory error: {0}")]
    Factory(String),

    #[error("Worker queue closed")]
    QueueClosed,
}

impl OrmError {
    /// Maps a rusqlite failure onto the stage that raised it.
    ///
    /// A failure the engine reported without a message becomes
    /// [`OrmError::Unknown`] carrying the extended result code.
    pub(crate) fn engine(err: rusqlite::Error, stage: fn(String) -> OrmError) -> OrmError {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(message)) => stage(message),
            rusqlite::Error::SqliteFailure(code, None) => OrmError::Unknown(code.extended_code),
            other => stage(other.to_string()),
        }
    }
}
