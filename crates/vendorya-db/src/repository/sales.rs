//! # Sales Repository
//!
//! Sales invoices, their lines and payments.
//!
//! ## Derived Fields
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  item insert / update / delete ──► recompute_totals(invoice)            │
//! │                                      subtotal    = Σ item.total         │
//! │                                      grand_total = subtotal + ship − disc│
//! │                                                                         │
//! │  payment insert ─────────────────► recompute_paid(invoice)              │
//! │                                      paid_amount = Σ payment.amount     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both recomputations re-sum from the persisted rows, so calling them
//! again is always safe. They run on the caller's transaction.
//!
//! ## Invoice Numbers
//! One atomic upsert on `invoice_sequences` hands out the next number; the
//! UNIQUE(store_id, invoice_number) index is the backstop.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use vendorya_core::catalog::SellableVariant;
use vendorya_core::finance::{
    InvoiceStatus, NewSalesInvoice, Payment, PaymentMethod, SalesInvoice, SalesInvoiceItem,
};
use vendorya_core::totals::{line_amounts, InvoiceTotals};
use vendorya_core::validation::{validate_payment_amount, validate_price, validate_quantity};
use vendorya_core::{
    authorize, new_id, AccessScope, CoreError, EntityKind, Money, Operation, Principal,
    ValidationError, CASH_METHOD_NAME,
};

use crate::error::{retry_once, DbError, DbResult};
use crate::repository::catalog::sellable_variant;
use crate::repository::store::resolve_branch;

// =============================================================================
// Transaction helpers
// =============================================================================

/// Hands out the next invoice number of a store.
pub async fn next_invoice_number(conn: &mut SqliteConnection, store_id: &str) -> DbResult<i64> {
    let number: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO invoice_sequences (store_id, last_number) VALUES (?1, 1)
        ON CONFLICT (store_id) DO UPDATE SET last_number = last_number + 1
        RETURNING last_number
        "#,
    )
    .bind(store_id)
    .fetch_one(&mut *conn)
    .await?;

    debug!(store_id = %store_id, number, "Invoice number allocated");
    Ok(number)
}

/// Re-sums line totals into subtotal / grand_total.
pub async fn recompute_totals(conn: &mut SqliteConnection, invoice_id: &str) -> DbResult<InvoiceTotals> {
    let line_totals: Vec<Money> = sqlx::query_scalar("SELECT total FROM sales_invoice_items WHERE invoice_id = ?1")
        .bind(invoice_id)
        .fetch_all(&mut *conn)
        .await?;

    let (shipping, discount): (Money, Money) =
        sqlx::query_as("SELECT shipping, discount FROM sales_invoices WHERE id = ?1")
            .bind(invoice_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found("SalesInvoice", invoice_id))?;

    let totals = InvoiceTotals::compute(line_totals, shipping, discount)?;

    sqlx::query("UPDATE sales_invoices SET subtotal = ?2, grand_total = ?3, updated_at = ?4 WHERE id = ?1")
        .bind(invoice_id)
        .bind(totals.subtotal)
        .bind(totals.grand_total)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    Ok(totals)
}

/// Re-sums payments into paid_amount.
pub async fn recompute_paid(conn: &mut SqliteConnection, invoice_id: &str) -> DbResult<Money> {
    let paid: Money = sqlx::query_scalar(
        r#"
        UPDATE sales_invoices
        SET paid_amount = (SELECT COALESCE(SUM(amount), 0) FROM payments WHERE invoice_id = ?1),
            updated_at = ?2
        WHERE id = ?1
        RETURNING paid_amount
        "#,
    )
    .bind(invoice_id)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("SalesInvoice", invoice_id))?;

    Ok(paid)
}

/// The store's cash method: the first `is_cash` method, or a new "Cash"
/// when the store has none.
pub async fn cash_method(conn: &mut SqliteConnection, store_id: &str) -> DbResult<PaymentMethod> {
    if let Some(method) = existing_cash_method(conn, store_id).await? {
        return Ok(method);
    }

    let created = sqlx::query_as::<_, PaymentMethod>(
        r#"
        INSERT INTO payment_methods (id, store_id, name, is_cash) VALUES (?1, ?2, ?3, 1)
        ON CONFLICT (store_id, name) DO NOTHING
        RETURNING id, store_id, name, is_cash
        "#,
    )
    .bind(new_id())
    .bind(store_id)
    .bind(CASH_METHOD_NAME)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(method) = created {
        debug!(store_id = %store_id, method_id = %method.id, "Cash method created");
        return Ok(method);
    }

    // The name is taken by a method that is not cash
    existing_cash_method(conn, store_id).await?.ok_or_else(|| {
        DbError::from(ValidationError::InvalidFormat {
            field: "payment_methods".to_string(),
            reason: format!("'{}' exists but is not a cash method", CASH_METHOD_NAME),
        })
    })
}

async fn existing_cash_method(conn: &mut SqliteConnection, store_id: &str) -> DbResult<Option<PaymentMethod>> {
    Ok(sqlx::query_as::<_, PaymentMethod>(
        r#"
        SELECT id, store_id, name, is_cash FROM payment_methods
        WHERE store_id = ?1 AND is_cash = 1
        ORDER BY rowid
        LIMIT 1
        "#,
    )
    .bind(store_id)
    .fetch_optional(&mut *conn)
    .await?)
}

/// Inserts a line priced from the variant's current sell price and tax.
pub async fn insert_item(
    conn: &mut SqliteConnection,
    invoice_id: &str,
    variant: &SellableVariant,
    quantity: i64,
) -> DbResult<SalesInvoiceItem> {
    let amounts = line_amounts(variant.sell_price, quantity, variant.tax_rate)?;
    let item = SalesInvoiceItem {
        id: new_id(),
        invoice_id: invoice_id.to_string(),
        variant_id: variant.variant_id.clone(),
        description: variant.display_name(),
        quantity,
        unit_price: variant.sell_price,
        tax_rate: variant.tax_rate,
        tax_amount: amounts.tax_amount,
        total: amounts.total,
    };

    sqlx::query(
        r#"
        INSERT INTO sales_invoice_items (
            id, invoice_id, variant_id, description, quantity, unit_price, tax_rate, tax_amount, total
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&item.id)
    .bind(&item.invoice_id)
    .bind(&item.variant_id)
    .bind(&item.description)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.tax_rate)
    .bind(item.tax_amount)
    .bind(item.total)
    .execute(&mut *conn)
    .await?;

    Ok(item)
}

pub async fn insert_payment(
    conn: &mut SqliteConnection,
    invoice_id: &str,
    method_id: &str,
    amount: Money,
    created_by: &str,
) -> DbResult<Payment> {
    let payment = Payment {
        id: new_id(),
        invoice_id: invoice_id.to_string(),
        method_id: method_id.to_string(),
        amount,
        created_by: Some(created_by.to_string()),
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO payments (id, invoice_id, method_id, amount, created_by, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.invoice_id)
    .bind(&payment.method_id)
    .bind(payment.amount)
    .bind(&payment.created_by)
    .bind(payment.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(payment)
}

fn wrong_status(invoice: &SalesInvoice) -> DbError {
    CoreError::InvalidStatus {
        entity: "SalesInvoice",
        id: invoice.id.clone(),
        status: invoice.status.as_str().to_string(),
    }
    .into()
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct SalesRepository {
    pool: SqlitePool,
}

impl SalesRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SalesRepository { pool }
    }

    async fn load(&self, scope: &AccessScope, invoice_id: &str) -> DbResult<SalesInvoice> {
        let invoice = sqlx::query_as::<_, SalesInvoice>("SELECT * FROM sales_invoices WHERE id = ?1")
            .bind(invoice_id)
            .fetch_optional(&self.pool)
            .await?;

        match invoice {
            Some(invoice) if scope.allows_store(&invoice.store_id) => Ok(invoice),
            _ => Err(DbError::not_found("SalesInvoice", invoice_id)),
        }
    }

    async fn load_draft(&self, scope: &AccessScope, invoice_id: &str) -> DbResult<SalesInvoice> {
        let invoice = self.load(scope, invoice_id).await?;
        if invoice.status != InvoiceStatus::Draft {
            return Err(wrong_status(&invoice));
        }
        Ok(invoice)
    }

    /// Invoice a line belongs to, as long as it is still a draft.
    async fn draft_of_item(&self, scope: &AccessScope, item_id: &str) -> DbResult<SalesInvoice> {
        let invoice_id: Option<String> =
            sqlx::query_scalar("SELECT invoice_id FROM sales_invoice_items WHERE id = ?1")
                .bind(item_id)
                .fetch_optional(&self.pool)
                .await?;
        let invoice_id = invoice_id.ok_or_else(|| DbError::not_found("SalesInvoiceItem", item_id))?;
        self.load_draft(scope, &invoice_id).await
    }

    pub async fn get(&self, principal: &Principal, invoice_id: &str) -> DbResult<SalesInvoice> {
        let scope = authorize(principal, EntityKind::SalesInvoice, Operation::View)?;
        self.load(&scope, invoice_id).await
    }

    pub async fn items(&self, principal: &Principal, invoice_id: &str) -> DbResult<Vec<SalesInvoiceItem>> {
        let scope = authorize(principal, EntityKind::SalesInvoiceItem, Operation::View)?;
        self.load(&scope, invoice_id).await?;

        Ok(sqlx::query_as::<_, SalesInvoiceItem>(
            "SELECT * FROM sales_invoice_items WHERE invoice_id = ?1 ORDER BY rowid",
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn payments(&self, principal: &Principal, invoice_id: &str) -> DbResult<Vec<Payment>> {
        let scope = authorize(principal, EntityKind::Payment, Operation::View)?;
        self.load(&scope, invoice_id).await?;

        Ok(sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE invoice_id = ?1 ORDER BY created_at",
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Opens a DRAFT invoice for a customer. The store is the customer's.
    pub async fn create_draft(&self, principal: &Principal, input: &NewSalesInvoice) -> DbResult<SalesInvoice> {
        let scope = authorize(principal, EntityKind::SalesInvoice, Operation::Add)?;
        validate_price("shipping", input.shipping)?;
        validate_price("discount", input.discount)?;

        let store_id: Option<String> =
            sqlx::query_scalar("SELECT store_id FROM customers WHERE id = ?1 AND is_deleted = 0")
                .bind(&input.customer_id)
                .fetch_optional(&self.pool)
                .await?;
        let store_id = match store_id {
            Some(store_id) if scope.allows_store(&store_id) => store_id,
            _ => return Err(DbError::not_found("Customer", &input.customer_id)),
        };

        let branch = {
            let mut conn = self.pool.acquire().await?;
            resolve_branch(&mut conn, &store_id, input.branch_id.as_deref()).await?
        };

        let now = Utc::now();
        let invoice = SalesInvoice {
            id: new_id(),
            store_id,
            branch_id: branch.id,
            customer_id: input.customer_id.clone(),
            invoice_number: None,
            status: InvoiceStatus::Draft,
            date: now,
            subtotal: Money::zero(),
            shipping: input.shipping,
            discount: input.discount,
            grand_total: input.shipping - input.discount,
            paid_amount: Money::zero(),
            created_by: Some(principal.user_id.clone()),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO sales_invoices (
                id, store_id, branch_id, customer_id, invoice_number, status, date,
                subtotal, shipping, discount, grand_total, paid_amount, created_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?6, 0, ?7, ?8, ?9, 0, ?10, ?6, ?6)
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.store_id)
        .bind(&invoice.branch_id)
        .bind(&invoice.customer_id)
        .bind(invoice.status)
        .bind(now)
        .bind(invoice.shipping)
        .bind(invoice.discount)
        .bind(invoice.grand_total)
        .bind(&invoice.created_by)
        .execute(&self.pool)
        .await?;

        debug!(invoice_id = %invoice.id, "Draft invoice created");
        Ok(invoice)
    }

    pub async fn add_item(
        &self,
        principal: &Principal,
        invoice_id: &str,
        variant_id: &str,
        quantity: i64,
    ) -> DbResult<SalesInvoiceItem> {
        let scope = authorize(principal, EntityKind::SalesInvoiceItem, Operation::Add)?;
        validate_quantity(quantity)?;
        let invoice = self.load_draft(&scope, invoice_id).await?;

        let variant = {
            let mut conn = self.pool.acquire().await?;
            sellable_variant(&mut conn, &invoice.store_id, variant_id).await?
        }
        .ok_or_else(|| DbError::not_found("Variant", variant_id))?;

        let mut tx = self.pool.begin().await?;
        let item = insert_item(&mut tx, invoice_id, &variant, quantity).await?;
        recompute_totals(&mut tx, invoice_id).await?;
        tx.commit().await?;

        Ok(item)
    }

    pub async fn update_item_quantity(
        &self,
        principal: &Principal,
        item_id: &str,
        quantity: i64,
    ) -> DbResult<SalesInvoiceItem> {
        let scope = authorize(principal, EntityKind::SalesInvoice, Operation::Change)?;
        validate_quantity(quantity)?;
        let invoice = self.draft_of_item(&scope, item_id).await?;

        let mut tx = self.pool.begin().await?;

        // Line amounts are recomputed from the price/tax snapshot on the row.
        let item = sqlx::query_as::<_, SalesInvoiceItem>(
            r#"
            UPDATE sales_invoice_items SET quantity = ?2
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(item_id)
        .bind(quantity)
        .fetch_one(&mut *tx)
        .await?;

        let amounts = line_amounts(item.unit_price, quantity, item.tax_rate)?;
        sqlx::query("UPDATE sales_invoice_items SET tax_amount = ?2, total = ?3 WHERE id = ?1")
            .bind(item_id)
            .bind(amounts.tax_amount)
            .bind(amounts.total)
            .execute(&mut *tx)
            .await?;

        recompute_totals(&mut tx, &invoice.id).await?;
        tx.commit().await?;

        Ok(SalesInvoiceItem {
            tax_amount: amounts.tax_amount,
            total: amounts.total,
            ..item
        })
    }

    pub async fn remove_item(&self, principal: &Principal, item_id: &str) -> DbResult<()> {
        let scope = authorize(principal, EntityKind::SalesInvoice, Operation::Change)?;
        let invoice = self.draft_of_item(&scope, item_id).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM sales_invoice_items WHERE id = ?1")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;
        recompute_totals(&mut tx, &invoice.id).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Changes shipping and discount on a draft.
    pub async fn set_charges(
        &self,
        principal: &Principal,
        invoice_id: &str,
        shipping: Money,
        discount: Money,
    ) -> DbResult<SalesInvoice> {
        let scope = authorize(principal, EntityKind::SalesInvoice, Operation::Change)?;
        validate_price("shipping", shipping)?;
        validate_price("discount", discount)?;
        self.load_draft(&scope, invoice_id).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE sales_invoices SET shipping = ?2, discount = ?3 WHERE id = ?1")
            .bind(invoice_id)
            .bind(shipping)
            .bind(discount)
            .execute(&mut *tx)
            .await?;
        recompute_totals(&mut tx, invoice_id).await?;
        tx.commit().await?;

        self.load(&scope, invoice_id).await
    }

    /// DRAFT → POSTED. The number is assigned here, exactly once.
    pub async fn post(&self, principal: &Principal, invoice_id: &str) -> DbResult<SalesInvoice> {
        let scope = authorize(principal, EntityKind::SalesInvoice, Operation::Change)?;
        let invoice = self.load_draft(&scope, invoice_id).await?;

        let number = retry_once("post_invoice", || self.post_once(&invoice)).await?;

        info!(invoice_id = %invoice_id, number, "Invoice posted");
        self.load(&scope, invoice_id).await
    }

    async fn post_once(&self, invoice: &SalesInvoice) -> DbResult<i64> {
        let mut tx = self.pool.begin().await?;

        let number = next_invoice_number(&mut tx, &invoice.store_id).await?;
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE sales_invoices SET status = 'POSTED', invoice_number = ?2, date = ?3, updated_at = ?3
            WHERE id = ?1 AND status = 'DRAFT'
            "#,
        )
        .bind(&invoice.id)
        .bind(number)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // Someone else posted or voided it first; the counter rolls back.
            return Err(wrong_status(invoice));
        }

        tx.commit().await?;
        Ok(number)
    }

    /// POSTED → VOID. The number stays taken.
    pub async fn void(&self, principal: &Principal, invoice_id: &str) -> DbResult<SalesInvoice> {
        let scope = authorize(principal, EntityKind::SalesInvoice, Operation::Change)?;
        let invoice = self.load(&scope, invoice_id).await?;

        let result = sqlx::query(
            "UPDATE sales_invoices SET status = 'VOID', updated_at = ?2 WHERE id = ?1 AND status = 'POSTED'",
        )
        .bind(invoice_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(wrong_status(&invoice));
        }

        info!(invoice_id = %invoice_id, "Invoice voided");
        self.load(&scope, invoice_id).await
    }

    /// Records a payment on a POSTED invoice and refreshes paid_amount.
    pub async fn add_payment(
        &self,
        principal: &Principal,
        invoice_id: &str,
        method_id: &str,
        amount: Money,
    ) -> DbResult<Payment> {
        let scope = authorize(principal, EntityKind::Payment, Operation::Add)?;
        validate_payment_amount(amount)?;
        let invoice = self.load(&scope, invoice_id).await?;
        if invoice.status != InvoiceStatus::Posted {
            return Err(wrong_status(&invoice));
        }

        let method_ok: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM payment_methods WHERE id = ?1 AND store_id = ?2")
                .bind(method_id)
                .bind(&invoice.store_id)
                .fetch_optional(&self.pool)
                .await?;
        if method_ok.is_none() {
            return Err(DbError::not_found("PaymentMethod", method_id));
        }

        let mut tx = self.pool.begin().await?;
        let payment = insert_payment(&mut tx, invoice_id, method_id, amount, &principal.user_id).await?;
        let paid = recompute_paid(&mut tx, invoice_id).await?;
        tx.commit().await?;

        info!(invoice_id = %invoice_id, amount = %amount, paid = %paid, "Payment recorded");
        Ok(payment)
    }

    /// Re-derives totals and paid amount from the stored rows.
    pub async fn recompute(&self, principal: &Principal, invoice_id: &str) -> DbResult<SalesInvoice> {
        let scope = authorize(principal, EntityKind::SalesInvoice, Operation::Change)?;
        self.load(&scope, invoice_id).await?;

        let mut tx = self.pool.begin().await?;
        recompute_paid(&mut tx, invoice_id).await?;
        recompute_totals(&mut tx, invoice_id).await?;
        tx.commit().await?;

        self.load(&scope, invoice_id).await
    }

    /// Lazily creates and returns the store's cash method.
    pub async fn cash_method(&self, principal: &Principal, store_id: &str) -> DbResult<PaymentMethod> {
        authorize(principal, EntityKind::PaymentMethod, Operation::View)?;
        principal.ensure_store(store_id)?;

        let mut tx = self.pool.begin().await?;
        let method = cash_method(&mut tx, store_id).await?;
        tx.commit().await?;
        Ok(method)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
