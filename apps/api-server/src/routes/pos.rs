//! POS handlers: variant lookup and checkout.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use vendorya_core::finance::CartLine;
use vendorya_core::Money;
use vendorya_db::repository::search::VariantHit;

use crate::error::ApiResult;
use crate::extract::CurrentPrincipal;
use crate::routes::search::SearchParams;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub items: Vec<CartLine>,
}

/// `total` is in major units, e.g. `100.0`.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub success: bool,
    pub invoice_number: i64,
    #[serde(with = "vendorya_core::money::major_units")]
    pub total: Money,
}

/// `GET /api/stores/{store_id}/pos/variants?q=`
pub async fn variants(
    State(state): State<SharedState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(store_id): Path<String>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<VariantHit>>> {
    let hits = state.db.search().variants(&principal, &store_id, &params.q).await?;
    Ok(Json(hits))
}

/// `POST /api/stores/{store_id}/pos/checkout`
pub async fn checkout(
    State(state): State<SharedState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(store_id): Path<String>,
    Json(request): Json<CheckoutRequest>,
) -> ApiResult<Json<CheckoutResponse>> {
    let receipt = state.db.checkout().checkout(&principal, &store_id, &request.items).await?;

    Ok(Json(CheckoutResponse {
        success: true,
        invoice_number: receipt.invoice_number,
        total: receipt.grand_total,
    }))
}
