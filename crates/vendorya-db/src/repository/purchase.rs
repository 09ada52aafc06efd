//! # Purchase Repository
//!
//! Supplier purchase invoices.
//!
//! ```text
//! create_draft()  → DRAFT header + lines, total_cost = Σ qty × unit_cost
//! receive()       → UPDATE ... SET status = 'RECEIVED' WHERE status = 'DRAFT'
//!                     1 row  → stock += qty, cost_price := unit_cost (per line)
//!                     0 rows → InvalidStatus, nothing applied
//! ```
//!
//! The guarded status flip is the only way stock is applied, so a receipt
//! can never be applied twice.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use vendorya_core::audit::ActivityAction;
use vendorya_core::finance::{NewPurchase, PurchaseInvoice, PurchaseInvoiceItem, PurchaseStatus};
use vendorya_core::totals::{line_total, sum_amounts};
use vendorya_core::validation::{validate_price, validate_quantity};
use vendorya_core::{authorize, new_id, CoreError, EntityKind, Operation, Principal, ValidationError};

use crate::error::{retry_once, DbError, DbResult};
use crate::repository::activity::{record, Activity};
use crate::repository::catalog::sellable_variant;
use crate::repository::stock::{apply_delta, stock_targets, StockTarget};
use crate::repository::store::resolve_branch;

/// A purchase line with the ledger moves receiving it triggers.
struct ReceiptLine {
    item: PurchaseInvoiceItem,
    targets: Vec<StockTarget>,
}

#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    pub async fn create_draft(
        &self,
        principal: &Principal,
        store_id: &str,
        input: &NewPurchase,
    ) -> DbResult<PurchaseInvoice> {
        authorize(principal, EntityKind::PurchaseInvoice, Operation::Add)?;
        principal.ensure_store(store_id)?;

        if input.items.is_empty() {
            return Err(ValidationError::Required {
                field: "items".to_string(),
            }
            .into());
        }

        let mut conn = self.pool.acquire().await?;
        let branch = resolve_branch(&mut conn, store_id, Some(&input.branch_id)).await?;

        let supplier: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM suppliers WHERE id = ?1 AND store_id = ?2 AND is_deleted = 0")
                .bind(&input.supplier_id)
                .bind(store_id)
                .fetch_optional(&mut *conn)
                .await?;
        if supplier.is_none() {
            return Err(DbError::not_found("Supplier", &input.supplier_id));
        }

        let purchase_id = new_id();
        let mut items = Vec::with_capacity(input.items.len());
        for line in &input.items {
            validate_quantity(line.quantity)?;
            validate_price("unit_cost", line.unit_cost)?;
            if sellable_variant(&mut conn, store_id, &line.variant_id).await?.is_none() {
                return Err(DbError::not_found("Variant", &line.variant_id));
            }
            items.push(PurchaseInvoiceItem {
                id: new_id(),
                purchase_id: purchase_id.clone(),
                variant_id: line.variant_id.clone(),
                quantity: line.quantity,
                unit_cost: line.unit_cost,
                total: line_total(line.unit_cost, line.quantity)?,
            });
        }
        drop(conn);

        let purchase = PurchaseInvoice {
            id: purchase_id,
            store_id: store_id.to_string(),
            branch_id: branch.id,
            supplier_id: input.supplier_id.clone(),
            reference: input.reference.clone(),
            status: PurchaseStatus::Draft,
            total_cost: sum_amounts("total_cost", items.iter().map(|i| i.total))?,
            received_at: None,
            created_by: Some(principal.user_id.clone()),
            created_at: Utc::now(),
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO purchase_invoices (
                id, store_id, branch_id, supplier_id, reference, status, total_cost, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&purchase.id)
        .bind(&purchase.store_id)
        .bind(&purchase.branch_id)
        .bind(&purchase.supplier_id)
        .bind(&purchase.reference)
        .bind(purchase.status)
        .bind(purchase.total_cost)
        .bind(&purchase.created_by)
        .bind(purchase.created_at)
        .execute(&mut *tx)
        .await?;

        for item in &items {
            sqlx::query(
                r#"
                INSERT INTO purchase_invoice_items (id, purchase_id, variant_id, quantity, unit_cost, total)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&item.id)
            .bind(&item.purchase_id)
            .bind(&item.variant_id)
            .bind(item.quantity)
            .bind(item.unit_cost)
            .bind(item.total)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(purchase_id = %purchase.id, lines = items.len(), "Purchase draft created");
        Ok(purchase)
    }

    pub async fn get(&self, principal: &Principal, purchase_id: &str) -> DbResult<PurchaseInvoice> {
        let scope = authorize(principal, EntityKind::PurchaseInvoice, Operation::View)?;
        let purchase = sqlx::query_as::<_, PurchaseInvoice>("SELECT * FROM purchase_invoices WHERE id = ?1")
            .bind(purchase_id)
            .fetch_optional(&self.pool)
            .await?;

        match purchase {
            Some(p) if scope.allows_store(&p.store_id) => Ok(p),
            _ => Err(DbError::not_found("PurchaseInvoice", purchase_id)),
        }
    }

    pub async fn items(&self, principal: &Principal, purchase_id: &str) -> DbResult<Vec<PurchaseInvoiceItem>> {
        authorize(principal, EntityKind::PurchaseInvoiceItem, Operation::View)?;
        self.get(principal, purchase_id).await?;

        Ok(sqlx::query_as::<_, PurchaseInvoiceItem>(
            "SELECT * FROM purchase_invoice_items WHERE purchase_id = ?1 ORDER BY rowid",
        )
        .bind(purchase_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// DRAFT → RECEIVED, applying every line to stock and cost exactly once.
    pub async fn receive(&self, principal: &Principal, purchase_id: &str) -> DbResult<PurchaseInvoice> {
        authorize(principal, EntityKind::PurchaseInvoice, Operation::Change)?;
        let purchase = self.get(principal, purchase_id).await?;
        if purchase.status != PurchaseStatus::Draft {
            return Err(already_received(&purchase));
        }

        let items = sqlx::query_as::<_, PurchaseInvoiceItem>(
            "SELECT * FROM purchase_invoice_items WHERE purchase_id = ?1 ORDER BY rowid",
        )
        .bind(purchase_id)
        .fetch_all(&self.pool)
        .await?;

        let mut lines = Vec::with_capacity(items.len());
        {
            let mut conn = self.pool.acquire().await?;
            for item in items {
                let variant = sellable_variant(&mut conn, &purchase.store_id, &item.variant_id)
                    .await?
                    .ok_or_else(|| DbError::not_found("Variant", &item.variant_id))?;
                let targets = stock_targets(&mut conn, &variant, item.quantity).await?;
                lines.push(ReceiptLine { item, targets });
            }
        }

        retry_once("receive_purchase", || self.receive_once(principal, &purchase, &lines)).await?;

        info!(purchase_id = %purchase_id, lines = lines.len(), "Purchase received");
        self.get(principal, purchase_id).await
    }

    async fn receive_once(&self, principal: &Principal, purchase: &PurchaseInvoice, lines: &[ReceiptLine]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let flipped = sqlx::query(
            "UPDATE purchase_invoices SET status = 'RECEIVED', received_at = ?2 WHERE id = ?1 AND status = 'DRAFT'",
        )
        .bind(&purchase.id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if flipped.rows_affected() == 0 {
            return Err(already_received(purchase));
        }

        for line in lines {
            for target in &line.targets {
                apply_delta(&mut tx, &target.variant_id, &purchase.branch_id, target.quantity).await?;
            }

            sqlx::query("UPDATE product_variants SET cost_price = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(&line.item.variant_id)
                .bind(line.item.unit_cost)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }

        let total = sum_amounts("total_cost", lines.iter().map(|l| l.item.total))?;
        record(
            &mut tx,
            Activity {
                store_id: Some(&purchase.store_id),
                user_id: Some(&principal.user_id),
                action: ActivityAction::PurchaseReceive,
                entity_kind: EntityKind::PurchaseInvoice,
                entity_id: &purchase.id,
                details: serde_json::json!({
                    "branch_id": purchase.branch_id,
                    "lines": lines.len(),
                    "total_cost": total,
                }),
            },
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

fn already_received(purchase: &PurchaseInvoice) -> DbError {
    CoreError::InvalidStatus {
        entity: "PurchaseInvoice",
        id: purchase.id.clone(),
        status: "RECEIVED".to_string(),
    }
    .into()
}
