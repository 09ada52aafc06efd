//! Principal extractor.
//!
//! Identity is asserted upstream: the gateway forwards the authenticated
//! user id in `x-user-id`. This layer only resolves it to an active user.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tracing::warn;

use vendorya_core::Principal;

use crate::error::ApiError;
use crate::state::SharedState;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The acting user of a request.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

impl FromRequestParts<SharedState> for CurrentPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        if let Some(principal) = parts.extensions.get::<CurrentPrincipal>() {
            return Ok(principal.clone());
        }

        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Missing x-user-id header"))?;

        let principal = state.db.users().principal(user_id).await?.ok_or_else(|| {
            warn!(user_id = %user_id, uri = %parts.uri, "Unknown or inactive user");
            ApiError::unauthorized("Unknown user")
        })?;

        let principal = CurrentPrincipal(principal);
        parts.extensions.insert(principal.clone());
        Ok(principal)
    }
}
