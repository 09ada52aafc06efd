//! # Inventory Types
//!
//! Stock is a running balance per (variant, branch). Every mutation is a
//! signed delta applied through one ledger operation in vendorya-db:
//!
//! ```text
//!   purchase receipt   +qty ─┐
//!   refund restock     +qty ─┤
//!   manual adjustment  ±qty ─┼──► apply_delta(variant, branch, delta) ──► StockLevel
//!   checkout           -qty ─┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockLevel {
    pub id: String,
    pub variant_id: String,
    pub branch_id: String,
    pub quantity: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Reason code of a manual stock adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum AdjustmentReason {
    Theft,
    Damage,
    Correction,
    Gift,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockAdjustment {
    pub id: String,
    pub variant_id: String,
    pub branch_id: String,
    /// Signed. Negative removes stock.
    pub quantity_change: i64,
    pub reason: AdjustmentReason,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStockAdjustment {
    pub variant_id: String,
    pub branch_id: String,
    pub quantity_change: i64,
    pub reason: AdjustmentReason,
    pub notes: Option<String>,
}
