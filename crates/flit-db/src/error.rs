//! Error types for flit-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Statement execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Primary key or unique constraint violated (D003)
    #[error("[D003] Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Operation abandoned because its cancellation token fired (D004)
    #[error("[D004] Operation cancelled")]
    Cancelled,

    /// Mutex poisoned (D005)
    #[error("[D005] Database mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// Backend not compiled in (D006)
    #[error("[D006] {backend} support requires the '{feature}' feature")]
    Unsupported { backend: String, feature: String },
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    /// Whether this error came from a cancelled token rather than the database.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DbError::Cancelled)
    }
}

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        // duckdb::Error does not expose constraint kinds, so the message is
        // the only thing to go on.
        let msg = err.to_string();
        if msg.contains("Duplicate key")
            || msg.contains("violates primary key constraint")
            || msg.contains("violates unique constraint")
        {
            DbError::UniqueViolation(msg)
        } else {
            DbError::ExecutionError(msg)
        }
    }
}

#[cfg(feature = "mysql")]
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                DbError::UniqueViolation(db.message().to_string())
            }
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Configuration(_) => DbError::ConnectionError(err.to_string()),
            _ => DbError::ExecutionError(err.to_string()),
        }
    }
}
