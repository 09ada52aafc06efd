//! Shift handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use vendorya_core::finance::WorkShift;
use vendorya_core::Money;

use crate::error::ApiResult;
use crate::extract::CurrentPrincipal;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct OpenShiftRequest {
    /// Defaults to the store's first branch.
    pub branch_id: Option<String>,
    #[serde(default)]
    pub starting_cash: Money,
}

#[derive(Debug, Deserialize)]
pub struct CloseShiftRequest {
    pub counted_cash: Money,
}

/// `POST /api/stores/{store_id}/shifts`
pub async fn open(
    State(state): State<SharedState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(store_id): Path<String>,
    Json(request): Json<OpenShiftRequest>,
) -> ApiResult<(StatusCode, Json<WorkShift>)> {
    let shift = state
        .db
        .shifts()
        .open(&principal, &store_id, request.branch_id.as_deref(), request.starting_cash)
        .await?;
    Ok((StatusCode::CREATED, Json(shift)))
}

/// `POST /api/shifts/{shift_id}/close`
pub async fn close(
    State(state): State<SharedState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(shift_id): Path<String>,
    Json(request): Json<CloseShiftRequest>,
) -> ApiResult<Json<WorkShift>> {
    let shift = state.db.shifts().close(&principal, &shift_id, request.counted_cash).await?;
    Ok(Json(shift))
}
