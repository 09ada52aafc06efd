//! Table preference handlers. The blob is any JSON value.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::extract::CurrentPrincipal;
use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct PreferenceResponse {
    pub table_id: String,
    /// `null` until the user saves something.
    pub config: Value,
}

/// `GET /api/preferences/{table_id}`
pub async fn get(
    State(state): State<SharedState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(table_id): Path<String>,
) -> ApiResult<Json<PreferenceResponse>> {
    let config = match state.db.preferences().get(&principal, &table_id).await? {
        Some(pref) => serde_json::from_str(&pref.config).map_err(|e| ApiError::bad_request(e.to_string()))?,
        None => Value::Null,
    };
    Ok(Json(PreferenceResponse { table_id, config }))
}

/// `PUT /api/preferences/{table_id}`
pub async fn put(
    State(state): State<SharedState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(table_id): Path<String>,
    Json(config): Json<Value>,
) -> ApiResult<Json<PreferenceResponse>> {
    state.db.preferences().upsert(&principal, &table_id, &config.to_string()).await?;
    Ok(Json(PreferenceResponse { table_id, config }))
}
