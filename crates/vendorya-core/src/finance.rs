//! # Finance Types
//!
//! Sales invoices, payments, refunds, purchases, expenses and work shifts.
//!
//! ## Sales Invoice Lifecycle
//! ```text
//!              post()                      void()
//!   DRAFT ───────────────────► POSTED ───────────────► VOID
//!     │   invoice_number := next(store)      │
//!     │   (assigned once, never reused)      └── payments recompute paid_amount
//!     └── add/update/remove items recompute subtotal/grand_total
//! ```
//!
//! ## Purchase Lifecycle
//! ```text
//!   DRAFT ── receive() ──► RECEIVED      (stock += qty, cost_price := unit_cost, once)
//! ```
//!
//! ## Shift Lifecycle
//! ```text
//!   OPEN ── close(counted) ──► CLOSED    (terminal)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::TaxRate;

// =============================================================================
// Sales Invoice
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Posted,
    Void,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "DRAFT",
            InvoiceStatus::Posted => "POSTED",
            InvoiceStatus::Void => "VOID",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SalesInvoice {
    pub id: String,
    pub store_id: String,
    pub branch_id: String,
    pub customer_id: String,
    /// Sequential per store. `None` until the first POSTED save.
    pub invoice_number: Option<i64>,
    pub status: InvoiceStatus,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    /// Sum of line totals (tax included).
    pub subtotal: Money,
    pub shipping: Money,
    pub discount: Money,
    pub grand_total: Money,
    /// Sum of all payments against this invoice.
    pub paid_amount: Money,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl SalesInvoice {
    /// Amount still owed. Negative when overpaid.
    pub fn balance_due(&self) -> Money {
        self.grand_total - self.paid_amount
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SalesInvoiceItem {
    pub id: String,
    pub invoice_id: String,
    pub variant_id: String,
    pub description: String,
    pub quantity: i64,
    /// Snapshot of the variant's sell price at the time of sale.
    pub unit_price: Money,
    /// Snapshot of the product's tax rate at the time of sale.
    pub tax_rate: TaxRate,
    pub tax_amount: Money,
    pub total: Money,
}

/// Input for a draft invoice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSalesInvoice {
    /// Defaults to the store's first branch.
    pub branch_id: Option<String>,
    pub customer_id: String,
    #[serde(default)]
    pub shipping: Money,
    #[serde(default)]
    pub discount: Money,
}

// =============================================================================
// Payments
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PaymentMethod {
    pub id: String,
    pub store_id: String,
    pub name: String,
    /// Counted toward expected drawer cash at shift close.
    pub is_cash: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub invoice_id: String,
    pub method_id: String,
    pub amount: Money,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Refunds
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct RefundInvoice {
    pub id: String,
    pub store_id: String,
    pub branch_id: String,
    /// Becomes `None` if the original invoice is ever deleted.
    pub original_invoice_id: Option<String>,
    pub reason: Option<String>,
    pub total_refunded: Money,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct RefundItem {
    pub id: String,
    pub refund_id: String,
    pub variant_id: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub total: Money,
    /// Put the quantity back into stock at the refund's branch.
    pub restock: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRefund {
    pub branch_id: Option<String>,
    pub original_invoice_id: Option<String>,
    pub reason: Option<String>,
    pub items: Vec<NewRefundItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRefundItem {
    pub variant_id: String,
    pub quantity: i64,
    pub unit_price: Money,
    #[serde(default)]
    pub restock: bool,
}

// =============================================================================
// Purchases
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum PurchaseStatus {
    #[default]
    Draft,
    Received,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseInvoice {
    pub id: String,
    pub store_id: String,
    pub branch_id: String,
    pub supplier_id: String,
    pub reference: Option<String>,
    pub status: PurchaseStatus,
    pub total_cost: Money,
    #[ts(as = "Option<String>")]
    pub received_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseInvoiceItem {
    pub id: String,
    pub purchase_id: String,
    pub variant_id: String,
    pub quantity: i64,
    pub unit_cost: Money,
    pub total: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPurchase {
    pub branch_id: String,
    pub supplier_id: String,
    pub reference: Option<String>,
    pub items: Vec<NewPurchaseItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPurchaseItem {
    pub variant_id: String,
    pub quantity: i64,
    pub unit_cost: Money,
}

// =============================================================================
// Expenses
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Expense {
    pub id: String,
    pub store_id: String,
    pub branch_id: Option<String>,
    pub description: String,
    pub amount: Money,
    pub spent_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExpense {
    pub branch_id: Option<String>,
    pub description: String,
    pub amount: Money,
}

// =============================================================================
// Work Shifts
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ShiftStatus {
    #[default]
    Open,
    Closed,
}

/// A cashier's drawer session.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct WorkShift {
    pub id: String,
    pub user_id: String,
    pub store_id: String,
    pub branch_id: String,
    pub status: ShiftStatus,
    #[ts(as = "String")]
    pub start_time: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub end_time: Option<DateTime<Utc>>,
    pub starting_cash: Money,
    /// Counted by the cashier at close.
    pub closing_cash: Option<Money>,
    pub expected_cash: Option<Money>,
    /// `closing_cash - expected_cash`. Negative means the drawer is short.
    pub difference: Option<Money>,
}

impl WorkShift {
    pub fn is_open(&self) -> bool {
        self.status == ShiftStatus::Open
    }
}

// =============================================================================
// Checkout
// =============================================================================

/// One cart line as posted by the POS screen.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    /// Variant ID.
    pub id: String,
    pub qty: i64,
}

/// Outcome of a committed checkout.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutReceipt {
    pub invoice_id: String,
    pub invoice_number: i64,
    pub grand_total: Money,
}
