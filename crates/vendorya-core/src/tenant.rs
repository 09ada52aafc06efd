//! # Tenant & Identity Types
//!
//! A [`Store`] is the tenant root. Everything else in the system hangs off
//! a store either directly (`store_id`) or through a branch, product or
//! variant relation.
//!
//! ```text
//! Store ──┬── Branch ── Address (1:1, PROTECT)
//!         ├── User (staff, with a Role)
//!         └── Customer (unique phone per store, running balance)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Store
// =============================================================================

/// Subscription plan of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum SubscriptionPlan {
    #[default]
    Free,
    Premium,
}

/// A tenant.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Store {
    pub id: String,
    pub name: String,
    pub owner_id: Option<String>,
    pub plan: SubscriptionPlan,
    pub is_active: bool,

    /// Supplier whose code prefix is used when a product has none.
    pub default_supplier_id: Option<String>,
    pub default_category_id: Option<String>,
    pub default_language: String,
    pub currency_symbol: String,

    /// When false, checkout rejects any line that would drive a stock
    /// level below zero.
    pub allow_negative_stock: bool,

    pub is_deleted: bool,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStore {
    pub name: String,
    pub owner_id: Option<String>,
    pub default_language: Option<String>,
    pub currency_symbol: Option<String>,
    pub allow_negative_stock: bool,
}

// =============================================================================
// Address & Branch
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Address {
    pub id: String,
    pub store_id: String,
    pub street_1: String,
    pub street_2: Option<String>,
    pub city: String,
    pub country: String,
    pub is_deleted: bool,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAddress {
    pub street_1: String,
    pub street_2: Option<String>,
    pub city: String,
    pub country: Option<String>,
}

/// A physical location of a store. Stock is tracked per branch.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Branch {
    pub id: String,
    pub store_id: String,
    pub name: String,
    /// Deleting this address is rejected while the branch exists.
    pub address_id: String,
    pub is_main_branch: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Users & Roles
// =============================================================================

/// Role of a user.
///
/// `Superuser` is platform staff and bypasses tenant scoping entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum Role {
    Superuser,
    Owner,
    Manager,
    Cashier,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    /// `None` for superusers and for staff not yet attached to a store.
    pub store_id: Option<String>,
    pub role: Role,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Customer
// =============================================================================

/// A customer of one store.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub store_id: String,
    pub name: String,
    /// Unique per store.
    pub phone_number: String,
    pub notes: Option<String>,
    pub shipping_address_id: Option<String>,
    pub billing_address_id: Option<String>,
    /// Positive = the customer owes the store. Negative = the store owes them.
    pub balance: Money,
    pub is_deleted: bool,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCustomer {
    /// Ignored for non-superusers; their own store is used instead.
    pub store_id: Option<String>,
    pub name: String,
    pub phone_number: String,
    pub notes: Option<String>,
}
