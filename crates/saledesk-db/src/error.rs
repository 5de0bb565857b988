//! Errors raised by the sales store.
//!
//! sqlx errors are folded into a handful of categories the API can map to a
//! status code without string matching of its own:
//!
//! ```text
//! sqlx::Error::RowNotFound              → NotFound
//! sqlx::Error::Database "UNIQUE ..."    → UniqueViolation
//! sqlx::Error::Database "FOREIGN KEY"   → ForeignKeyViolation
//! sqlx::Error::Database (other)         → Query
//! sqlx::Error::PoolTimedOut             → PoolExhausted
//! sqlx::Error::PoolClosed               → ConnectionFailed
//! anything else                         → Internal
//! ```

use saledesk_core::CoreError;
use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// `column` is the `table.column` SQLite names in its message.
    #[error("Duplicate value for {column}")]
    UniqueViolation { column: String },

    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// The store could not be opened, or the pool was already closed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// A row held something that does not decode into a domain value, e.g.
    /// a money column that is not a decimal or an outbox payload that is not
    /// a sale event.
    #[error("Invalid data in {column}: {reason}")]
    InvalidData { column: String, reason: String },

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn invalid_data(column: impl Into<String>, reason: impl ToString) -> Self {
        DbError::InvalidData {
            column: column.into(),
            reason: reason.to_string(),
        }
    }

    fn from_sqlite_message(message: &str) -> Self {
        const UNIQUE: &str = "UNIQUE constraint failed: ";

        if let Some(at) = message.find(UNIQUE) {
            let column = message[at + UNIQUE.len()..].trim().to_string();
            return DbError::UniqueViolation { column };
        }
        if message.contains("FOREIGN KEY constraint failed") {
            return DbError::ForeignKeyViolation(message.to_string());
        }
        DbError::Query(message.to_string())
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => DbError::from_sqlite_message(db_err.message()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::Migration(err.to_string())
    }
}

/// Events are encoded inside the write transaction, so a bad event surfaces
/// as a store error.
impl From<CoreError> for DbError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidEvent(reason) => DbError::invalid_data("event_outbox.payload", reason),
            other => DbError::Internal(other.to_string()),
        }
    }
}
