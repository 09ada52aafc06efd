//! # Refund Repository
//!
//! A refund is posted in one transaction: header, lines, restock of the
//! flagged lines through the stock ledger, then `total_refunded` is
//! re-summed from the lines.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use vendorya_core::audit::ActivityAction;
use vendorya_core::finance::{NewRefund, RefundInvoice, RefundItem};
use vendorya_core::totals::line_total;
use vendorya_core::validation::{validate_price, validate_quantity};
use vendorya_core::{authorize, new_id, EntityKind, Money, Operation, Principal, ValidationError};

use crate::error::{retry_once, DbError, DbResult};
use crate::repository::activity::{record, Activity};
use crate::repository::catalog::sellable_variant;
use crate::repository::stock::{apply_delta, stock_targets, StockTarget};
use crate::repository::store::resolve_branch;

/// A refund line with the ledger moves it triggers.
struct PreparedLine {
    item: RefundItem,
    restock: Vec<StockTarget>,
}

#[derive(Debug, Clone)]
pub struct RefundRepository {
    pool: SqlitePool,
}

impl RefundRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RefundRepository { pool }
    }

    pub async fn post(&self, principal: &Principal, store_id: &str, input: &NewRefund) -> DbResult<RefundInvoice> {
        authorize(principal, EntityKind::RefundInvoice, Operation::Add)?;
        principal.ensure_store(store_id)?;

        if input.items.is_empty() {
            return Err(ValidationError::Required {
                field: "items".to_string(),
            }
            .into());
        }

        let mut conn = self.pool.acquire().await?;
        let branch = resolve_branch(&mut conn, store_id, input.branch_id.as_deref()).await?;

        if let Some(original) = &input.original_invoice_id {
            let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM sales_invoices WHERE id = ?1 AND store_id = ?2")
                .bind(original)
                .bind(store_id)
                .fetch_optional(&mut *conn)
                .await?;
            if found.is_none() {
                return Err(DbError::not_found("SalesInvoice", original));
            }
        }

        let refund_id = new_id();
        let mut lines = Vec::with_capacity(input.items.len());
        for line in &input.items {
            validate_quantity(line.quantity)?;
            validate_price("unit_price", line.unit_price)?;

            let variant = sellable_variant(&mut conn, store_id, &line.variant_id)
                .await?
                .ok_or_else(|| DbError::not_found("Variant", &line.variant_id))?;
            let restock = if line.restock {
                stock_targets(&mut conn, &variant, line.quantity).await?
            } else {
                Vec::new()
            };

            lines.push(PreparedLine {
                item: RefundItem {
                    id: new_id(),
                    refund_id: refund_id.clone(),
                    variant_id: line.variant_id.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    total: line_total(line.unit_price, line.quantity)?,
                    restock: line.restock,
                },
                restock,
            });
        }
        drop(conn);

        let refund = RefundInvoice {
            id: refund_id,
            store_id: store_id.to_string(),
            branch_id: branch.id,
            original_invoice_id: input.original_invoice_id.clone(),
            reason: input.reason.clone(),
            total_refunded: Money::zero(),
            created_by: Some(principal.user_id.clone()),
            created_at: Utc::now(),
        };

        let total = retry_once("post_refund", || self.post_once(principal, &refund, &lines)).await?;

        info!(refund_id = %refund.id, total = %total, lines = lines.len(), "Refund posted");
        Ok(RefundInvoice {
            total_refunded: total,
            ..refund
        })
    }

    async fn post_once(&self, principal: &Principal, refund: &RefundInvoice, lines: &[PreparedLine]) -> DbResult<Money> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO refund_invoices (id, store_id, branch_id, original_invoice_id, reason, total_refunded, created_by, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7)
            "#,
        )
        .bind(&refund.id)
        .bind(&refund.store_id)
        .bind(&refund.branch_id)
        .bind(&refund.original_invoice_id)
        .bind(&refund.reason)
        .bind(&refund.created_by)
        .bind(refund.created_at)
        .execute(&mut *tx)
        .await?;

        for line in lines {
            insert_item(&mut tx, &line.item).await?;
            for target in &line.restock {
                apply_delta(&mut tx, &target.variant_id, &refund.branch_id, target.quantity).await?;
            }
        }

        let total: Money = sqlx::query_scalar(
            r#"
            UPDATE refund_invoices
            SET total_refunded = (SELECT COALESCE(SUM(total), 0) FROM refund_items WHERE refund_id = ?1)
            WHERE id = ?1
            RETURNING total_refunded
            "#,
        )
        .bind(&refund.id)
        .fetch_one(&mut *tx)
        .await?;

        record(
            &mut tx,
            Activity {
                store_id: Some(&refund.store_id),
                user_id: Some(&principal.user_id),
                action: ActivityAction::RefundPost,
                entity_kind: EntityKind::RefundInvoice,
                entity_id: &refund.id,
                details: serde_json::json!({
                    "original_invoice_id": refund.original_invoice_id,
                    "total_refunded": total,
                    "lines": lines.len(),
                }),
            },
        )
        .await?;

        tx.commit().await?;
        Ok(total)
    }

    pub async fn get(&self, principal: &Principal, refund_id: &str) -> DbResult<RefundInvoice> {
        let scope = authorize(principal, EntityKind::RefundInvoice, Operation::View)?;
        let refund = sqlx::query_as::<_, RefundInvoice>("SELECT * FROM refund_invoices WHERE id = ?1")
            .bind(refund_id)
            .fetch_optional(&self.pool)
            .await?;

        match refund {
            Some(refund) if scope.allows_store(&refund.store_id) => Ok(refund),
            _ => Err(DbError::not_found("RefundInvoice", refund_id)),
        }
    }

    pub async fn items(&self, principal: &Principal, refund_id: &str) -> DbResult<Vec<RefundItem>> {
        authorize(principal, EntityKind::RefundItem, Operation::View)?;
        self.get(principal, refund_id).await?;

        Ok(sqlx::query_as::<_, RefundItem>("SELECT * FROM refund_items WHERE refund_id = ?1 ORDER BY rowid")
            .bind(refund_id)
            .fetch_all(&self.pool)
            .await?)
    }
}

async fn insert_item(conn: &mut SqliteConnection, item: &RefundItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO refund_items (id, refund_id, variant_id, quantity, unit_price, total, restock)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&item.id)
    .bind(&item.refund_id)
    .bind(&item.variant_id)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.total)
    .bind(item.restock)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
