//! Global search handler.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use vendorya_db::repository::search::SearchResults;

use crate::error::ApiResult;
use crate::extract::CurrentPrincipal;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

/// `GET /api/stores/{store_id}/search?q=`
pub async fn global(
    State(state): State<SharedState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(store_id): Path<String>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<SearchResults>> {
    let results = state.db.search().global(&principal, &store_id, &params.q).await?;
    Ok(Json(results))
}
