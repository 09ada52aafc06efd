//! Purchases, refunds and manual stock adjustments.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use vendorya_core::finance::{NewPurchase, NewRefund, PurchaseInvoice, RefundInvoice};
use vendorya_core::inventory::{NewStockAdjustment, StockAdjustment};

use crate::error::ApiResult;
use crate::extract::CurrentPrincipal;
use crate::state::SharedState;

/// `POST /api/stores/{store_id}/purchases`
pub async fn create_purchase(
    State(state): State<SharedState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(store_id): Path<String>,
    Json(input): Json<NewPurchase>,
) -> ApiResult<(StatusCode, Json<PurchaseInvoice>)> {
    let purchase = state.db.purchases().create_draft(&principal, &store_id, &input).await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}

/// `POST /api/purchases/{purchase_id}/receive`
pub async fn receive_purchase(
    State(state): State<SharedState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(purchase_id): Path<String>,
) -> ApiResult<Json<PurchaseInvoice>> {
    let purchase = state.db.purchases().receive(&principal, &purchase_id).await?;
    Ok(Json(purchase))
}

/// `POST /api/stores/{store_id}/refunds`
pub async fn post_refund(
    State(state): State<SharedState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(store_id): Path<String>,
    Json(input): Json<NewRefund>,
) -> ApiResult<(StatusCode, Json<RefundInvoice>)> {
    let refund = state.db.refunds().post(&principal, &store_id, &input).await?;
    Ok((StatusCode::CREATED, Json(refund)))
}

/// `POST /api/stores/{store_id}/stock/adjustments`
pub async fn adjust_stock(
    State(state): State<SharedState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(store_id): Path<String>,
    Json(input): Json<NewStockAdjustment>,
) -> ApiResult<(StatusCode, Json<StockAdjustment>)> {
    principal.ensure_store(&store_id)?;
    let adjustment = state.db.stock().adjust(&principal, &input).await?;
    Ok((StatusCode::CREATED, Json(adjustment)))
}
