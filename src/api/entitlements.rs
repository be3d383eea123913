// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use crate::{
    auth::Auth,
    entitlements::{access_status, AccessStatus},
    error::ApiError,
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementResponse {
    pub product: String,
    pub status: AccessStatus,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Access status of the caller for a product. Drives the paywall.
#[utoipa::path(
    get,
    path = "/entitlements/{product}",
    tag = "Scam Likely",
    security(("bearer_auth" = [])),
    params(("product" = String, Path, description = "Product id, e.g. scam_likely")),
    responses(
        (status = 200, description = "Access status", body = EntitlementResponse),
        (status = 401, description = "Missing or invalid session"),
        (status = 500, description = "Datastore error")
    )
)]
pub async fn get_entitlement(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(product): Path<String>,
) -> Result<Json<EntitlementResponse>, ApiError> {
    let entitlement = state
        .store
        .entitlement_for(&user.user_id, &product)
        .await
        .map_err(|e| {
            error!(user_id = %user.user_id, %product, error = %e, "Failed to load entitlement");
            ApiError::internal("Failed to load entitlement")
        })?;

    Ok(Json(EntitlementResponse {
        status: access_status(entitlement.as_ref()),
        expires_at: entitlement.and_then(|e| e.expires_at),
        product,
    }))
}
