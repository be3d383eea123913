// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

use axum::{body::Bytes, extract::State, Json};
use serde::Deserialize;
use tracing::error;
use utoipa::ToSchema;

use super::{parse_json_body, record_scan};
use crate::{
    analysis::{normalize_analysis, AnalysisReport},
    auth::Auth,
    entitlements::SCAM_LIKELY_AI_PRODUCT_ID,
    error::ApiError,
    providers::gemini::{analysis_prompt, read_generation},
    risk::verdict_for_score,
    state::AppState,
    storage::NewScan,
};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AnalysisRequest {
    /// Contract address, symbol or name
    #[serde(default)]
    pub query: Option<String>,
}

/// AI-assisted token analysis grounded in web search results.
#[utoipa::path(
    post,
    path = "/gemini-analysis",
    tag = "Scam Likely",
    security(("bearer_auth" = [])),
    request_body = AnalysisRequest,
    responses(
        (status = 200, description = "Normalized analysis", body = AnalysisReport),
        (status = 400, description = "Missing query or invalid JSON"),
        (status = 401, description = "Missing or invalid session"),
        (status = 405, description = "Only POST is allowed"),
        (status = 500, description = "Gemini not configured or the generation failed")
    )
)]
pub async fn analyze_token(
    State(state): State<AppState>,
    Auth(user): Auth,
    body: Bytes,
) -> Result<Json<AnalysisReport>, ApiError> {
    let request: AnalysisRequest = parse_json_body(&body)?;
    let query = request
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::bad_request("Query is required"))?;

    let model = state
        .model
        .as_ref()
        .ok_or_else(|| ApiError::internal("Gemini API key not configured"))?;

    let generation = model
        .generate_content(&analysis_prompt(query))
        .await
        .and_then(|response| read_generation(&response))
        .map_err(|e| {
            error!(user_id = %user.user_id, error = %e, "Gemini analysis failed");
            ApiError::internal(e.to_string())
        })?;

    let report = normalize_analysis(&generation.payload, &generation.grounding);

    record_scan(
        &state,
        NewScan {
            user_id: user.user_id,
            product: SCAM_LIKELY_AI_PRODUCT_ID.to_string(),
            query: query.to_string(),
            score: report.overall_score,
            verdict: verdict_for_score(report.overall_score.unwrap_or(0.0)).to_string(),
            raw_response: serde_json::to_value(&report).unwrap_or_default(),
        },
    )
    .await;

    Ok(Json(report))
}
