//! # Audit & Preference Types
//!
//! [`ActivityLog`] rows are append-only; the schema aborts any UPDATE or
//! DELETE against them. [`TablePreference`] is an opaque JSON blob per
//! (user, table) that the backend stores and returns untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// What happened, as recorded in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ActivityAction {
    Create,
    Update,
    Delete,
    Restore,
    Checkout,
    ShiftOpen,
    ShiftClose,
    PurchaseReceive,
    RefundPost,
    StockAdjust,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ActivityLog {
    pub id: String,
    pub store_id: Option<String>,
    pub user_id: Option<String>,
    pub action: ActivityAction,
    pub entity_kind: String,
    pub entity_id: String,
    /// JSON object.
    pub details: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TablePreference {
    pub id: String,
    pub user_id: String,
    pub table_id: String,
    /// Column/sort/filter settings as JSON text.
    pub config: String,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}
