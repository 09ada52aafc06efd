//! # Database Error Types
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error ──────────────┐                                            │
//! │  CoreError (preconditions) ┼──► DbError (this module) ──► ApiError      │
//! │  MigrateError ─────────────┘                                            │
//! │                                                                         │
//! │  UniqueViolation / Busy inside a transaction are retried once by the   │
//! │  caller, then surface as Contention ("try again").                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;

use thiserror::Error;
use tracing::warn;
use vendorya_core::CoreError;

#[derive(Debug, Error)]
pub enum DbError {
    /// Row missing, or outside the caller's tenant scope.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE index rejected the write.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Delete rejected because another row still references this one.
    #[error("Cannot delete {entity} {id}: {message}")]
    ProtectedReference {
        entity: String,
        id: String,
        message: String,
    },

    /// SQLite could not obtain the write lock within the busy timeout.
    #[error("Database is busy")]
    Busy,

    /// A retried write still collided.
    #[error("The operation collided with a concurrent update, please try again")]
    Contention,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),

    /// Business rule or precondition failure.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Worth one more attempt with freshly computed values.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::UniqueViolation { .. } | DbError::Busy)
    }
}

/// Convert sqlx errors to DbError.
///
/// ```text
/// sqlx::Error::RowNotFound               → DbError::NotFound
/// "UNIQUE constraint failed: t.col"      → DbError::UniqueViolation
/// "FOREIGN KEY constraint failed"        → DbError::ForeignKeyViolation
/// SQLITE_BUSY / "database is locked"     → DbError::Busy
/// sqlx::Error::PoolTimedOut              → DbError::PoolExhausted
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                let code = db_err.code();

                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if matches!(code.as_deref(), Some("5") | Some("517") | Some("6"))
                    || msg.contains("database is locked")
                {
                    DbError::Busy
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<vendorya_core::ValidationError> for DbError {
    fn from(err: vendorya_core::ValidationError) -> Self {
        DbError::Core(err.into())
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Runs a write transaction, and once more if it hit a uniqueness clash or
/// a busy database. A second clash surfaces as [`DbError::Contention`].
///
/// `op` must recompute everything it writes on each call.
pub async fn retry_once<T, F, Fut>(operation: &'static str, mut op: F) -> DbResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DbResult<T>>,
{
    match op().await {
        Err(e) if e.is_retryable() => {
            warn!(operation, error = %e, "Write collided, retrying once");
            match op().await {
                Err(e) if e.is_retryable() => {
                    warn!(operation, error = %e, "Write collided again");
                    Err(DbError::Contention)
                }
                other => other,
            }
        }
        other => other,
    }
}
