//! Error types for the API server.
//!
//! ## Status Mapping
//! ```text
//! ┌──────────────────────────────────────────┬────────┐
//! │ EmptyCart, NoCustomer, validation        │  400   │
//! │ unknown x-user-id                        │  401   │
//! │ NoOpenShift, PermissionDenied            │  403   │
//! │ NotFound                                 │  404   │
//! │ wrong method (router)                    │  405   │
//! │ duplicate, stale status, protected row,  │  409   │
//! │ insufficient stock, contention           │        │
//! │ anything else (logged, message hidden)   │  500   │
//! └──────────────────────────────────────────┴────────┘
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use vendorya_core::CoreError;
use vendorya_db::DbError;

/// An HTTP error with a client-facing message.
#[derive(Debug, thiserror::Error)]
#[error("{status}: {message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn internal(source: &dyn std::fmt::Display) -> Self {
        error!(error = %source, "Internal error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let status = match &err {
            CoreError::EmptyCart
            | CoreError::NoCustomer
            | CoreError::NoBranch { .. }
            | CoreError::CartTooLarge { .. }
            | CoreError::InvalidAttribute { .. }
            | CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::NoOpenShift | CoreError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
            CoreError::InsufficientStock { .. } | CoreError::InvalidStatus { .. } | CoreError::ShiftAlreadyOpen => {
                StatusCode::CONFLICT
            }
        };
        Self::new(status, err.to_string())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Core(core) => core.into(),
            DbError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            DbError::ForeignKeyViolation { .. } => Self::bad_request(err.to_string()),
            DbError::UniqueViolation { .. } | DbError::ProtectedReference { .. } => {
                Self::new(StatusCode::CONFLICT, err.to_string())
            }
            DbError::Busy | DbError::Contention => {
                Self::new(StatusCode::CONFLICT, DbError::Contention.to_string())
            }
            DbError::ConnectionFailed(_)
            | DbError::MigrationFailed(_)
            | DbError::QueryFailed(_)
            | DbError::PoolExhausted
            | DbError::Internal(_) => Self::internal(&err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vendorya_core::ValidationError;

    #[test]
    fn test_checkout_preconditions_map_to_documented_statuses() {
        assert_eq!(ApiError::from(CoreError::EmptyCart).status, StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(CoreError::NoCustomer).status, StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(CoreError::NoOpenShift).status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_db_errors() {
        let err = ApiError::from(DbError::Core(CoreError::Validation(ValidationError::Required {
            field: "name".into(),
        })));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = ApiError::from(DbError::Busy);
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert!(err.message.contains("try again"));

        let err = ApiError::from(DbError::ProtectedReference {
            entity: "Address".into(),
            id: "a1".into(),
            message: "still used by a branch".into(),
        });
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert!(err.message.contains("still used by a branch"));

        let err = ApiError::from(DbError::QueryFailed("near \"SELEC\": syntax error".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Internal server error");
    }
}
