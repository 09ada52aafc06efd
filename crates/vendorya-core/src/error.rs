//! # Error Types
//!
//! Domain-specific error types for vendorya-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  vendorya-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule / precondition failures           │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  vendorya-db errors (separate crate)                                    │
//! │  └── DbError          - Database failures, wraps CoreError              │
//! │                                                                         │
//! │  api-server errors                                                      │
//! │  └── ApiError         - HTTP status + JSON body                         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations and precondition failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Checkout without an OPEN shift for (user, store).
    #[error("No open shift")]
    NoOpenShift,

    #[error("Cart is empty")]
    EmptyCart,

    /// Checkout needs at least one customer in the store.
    #[error("No customers found")]
    NoCustomer,

    #[error("Store {store_id} has no branch")]
    NoBranch { store_id: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Insufficient stock while the store forbids negative stock.
    ///
    /// ```text
    /// Cart line qty: 5
    ///      │
    ///      ▼
    /// StockLevel(variant, branch) = 3, allow_negative_stock = false
    ///      │
    ///      ▼
    /// InsufficientStock { sku, available: 3, requested: 5 }  → whole checkout rolls back
    /// ```
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Entity is not in a state that allows the requested operation.
    #[error("{entity} {id} is {status}, cannot perform operation")]
    InvalidStatus {
        entity: &'static str,
        id: String,
        status: String,
    },

    #[error("User already has an open shift for this branch")]
    ShiftAlreadyOpen,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A custom attribute value failed its definition.
    #[error("Invalid attribute '{key}': {reason}")]
    InvalidAttribute { key: String, reason: String },

    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised before any business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// An amount computed from valid inputs no longer fits in cents.
    #[error("{field} is too large")]
    AmountTooLarge { field: String },
}

impl ValidationError {
    pub fn amount_too_large(field: &str) -> Self {
        ValidationError::AmountTooLarge {
            field: field.to_string(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
