//! # Repository Module
//!
//! One repository per aggregate, each a cheap clone over the shared pool.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  db.catalog().create_product(&principal, &input)                        │
//! │       │                                                                 │
//! │       ├── authorize(principal, kind, op)   ← role × entity × operation  │
//! │       ├── principal.ensure_store(..)       ← tenant boundary            │
//! │       ├── validation (vendorya-core)                                    │
//! │       ▼                                                                 │
//! │  SQL, scoped by store                                                   │
//! │                                                                         │
//! │  Free functions taking `&mut SqliteConnection` (apply_delta,            │
//! │  next_invoice_number, record, ...) are the building blocks that         │
//! │  checkout, receiving and refunds compose inside one transaction.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`store::StoreRepository`] - Stores, addresses, branches, store settings
//! - [`user::UserRepository`] - Staff accounts and principals
//! - [`customer::CustomerRepository`] - Customers and balances
//! - [`catalog::CatalogRepository`] - Taxes, suppliers, categories, products, variants, attributes
//! - [`stock::StockRepository`] - Stock levels and manual adjustments
//! - [`sales::SalesRepository`] - Draft invoices, posting, payments
//! - [`refund::RefundRepository`] - Refunds with optional restock
//! - [`purchase::PurchaseRepository`] - Purchase drafts and receiving
//! - [`shift::ShiftRepository`] - Work shifts and drawer reconciliation
//! - [`expense::ExpenseRepository`]
//! - [`activity::ActivityRepository`] - Append-only audit trail
//! - [`preference::PreferenceRepository`] - Per-user table settings
//! - [`search::SearchRepository`] - Global and POS search
//! - [`scoped::ScopedRepository`] - Generic list/get/delete/restore by entity kind

pub mod activity;
pub mod catalog;
pub mod customer;
pub mod expense;
pub mod preference;
pub mod purchase;
pub mod refund;
pub mod sales;
pub mod scoped;
pub mod search;
pub mod shift;
pub mod stock;
pub mod store;
pub mod user;
