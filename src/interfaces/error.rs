//! Errors shared by every store and by the query core.

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors from query construction and store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Malformed input or a business-rule violation.
    #[error("query: {0}")]
    Query(String),

    /// A single row was expected but the query matched none.
    #[error("empty result")]
    Empty,

    #[error("not found: {0}")]
    NotFound(String),

    /// The active backend does not offer this capability.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification used at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Query,
    Empty,
    NotFound,
    NotImplemented,
    Internal,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Query(_) => ErrorKind::Query,
            StoreError::Empty => ErrorKind::Empty,
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::NotImplemented(_) => ErrorKind::NotImplemented,
            StoreError::Database(_)
            | StoreError::Migration(_)
            | StoreError::Io(_)
            | StoreError::Csv(_)
            | StoreError::Serialization(_)
            | StoreError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::Empty,
            other => StoreError::Database(other),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
