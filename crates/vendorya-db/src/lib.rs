//! # vendorya-db: Database Layer for Vendorya
//!
//! All persistence for the multi-tenant retail backend, on SQLite via sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Vendorya Data Flow                               │
//! │                                                                         │
//! │  api-server handler (POST /pos/checkout)                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   vendorya-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  catalog.rs   │    │  (embedded)  │  │   │
//! │  │   │               │    │  sales.rs     │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│  stock.rs ... │    │ 001_initial  │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │                               │   │
//! │  │                        ┌───────┴───────┐                       │   │
//! │  │                        │  checkout.rs  │  one transaction      │   │
//! │  │                        └───────────────┘                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL, foreign keys on)                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types and the retry helper
//! - [`scope`] - Tenant scoping of SQL by entity kind
//! - [`repository`] - Repository implementations
//! - [`checkout`] - The POS checkout transaction
//! - [`seed`] - Demo tenant used by the seed binary and tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vendorya_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./vendorya.db")).await?;
//! let receipt = db.checkout().checkout(&principal, &store_id, &lines).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod scope;
pub mod seed;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::CheckoutService;
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
