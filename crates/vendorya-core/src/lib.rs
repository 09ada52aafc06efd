//! # vendorya-core: Pure Business Logic for Vendorya
//!
//! Domain types and every rule that can be decided without touching the
//! database: money arithmetic, tenant access policy, code sequencing,
//! custom-attribute validation, invoice and shift math.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Vendorya Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 api-server (axum HTTP)                          │   │
//! │  │   search, variant search, checkout, shifts, purchases, refunds  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 vendorya-db (SQLite via sqlx)                   │   │
//! │  │   repositories, tenant-scoped queries, checkout transaction     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ vendorya-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐   │   │
//! │  │   │ tenant  │ │ catalog │ │inventory│ │ finance │ │  audit  │   │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘   │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐   │   │
//! │  │   │  money  │ │ access  │ │  codes  │ │ totals  │ │  attrs  │   │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use vendorya_core::money::Money;
//! use vendorya_core::totals::InvoiceTotals;
//!
//! let line = Money::from_major_minor(50, 0).checked_multiply_quantity(2).unwrap();
//! let totals = InvoiceTotals::compute([line], Money::zero(), Money::zero()).unwrap();
//! assert_eq!(totals.grand_total.to_string(), "100.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod attributes;
pub mod audit;
pub mod catalog;
pub mod codes;
pub mod error;
pub mod finance;
pub mod inventory;
pub mod money;
pub mod tenant;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use access::{authorize, AccessScope, EntityKind, Operation, Principal};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Minimum length of any search query.
pub const MIN_SEARCH_LEN: usize = 3;

/// Matches per category returned by the global search.
pub const GLOBAL_SEARCH_LIMIT: i64 = 5;

/// Rows returned by the POS variant search.
pub const VARIANT_SEARCH_LIMIT: i64 = 10;

/// Maximum lines in a single checkout cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Upper bound of any catalog price or entered amount (1,000,000,000.00).
///
/// A full cart at this price, maximum quantity and 100% tax is still
/// several orders of magnitude below `i64::MAX` cents.
pub const MAX_PRICE_CENTS: i64 = 100_000_000_000;

/// Name of the payment method checkout creates lazily.
pub const CASH_METHOD_NAME: &str = "Cash";

/// Code prefix when neither the product nor the store names a supplier.
pub const FALLBACK_CODE_PREFIX: &str = "00";
