// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

use axum::{body::Bytes, extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use super::{parse_json_body, record_scan};
use crate::{
    auth::Auth,
    entitlements::SCAM_LIKELY_PRODUCT_ID,
    error::ApiError,
    providers::TokenInfo,
    risk::{self, RiskFlag, RiskTier, TokenSignals, Verdict},
    state::AppState,
    storage::NewScan,
};

const DEFAULT_TOKEN_TYPE: &str = "ERC20";

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ScanRequest {
    /// ERC-20 contract address (`0x` + 40 hex characters)
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanToken {
    pub address: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u32>,
    #[serde(rename = "type")]
    pub token_type: String,
    pub owner: Option<String>,
    /// Raw supply in base units, as reported
    pub total_supply: Option<String>,
    pub circulating_supply: Option<String>,
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScanMetrics {
    pub supply: Option<f64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScanRisk {
    pub score: u32,
    pub verdict: Verdict,
    /// Display tier for the product UI
    pub tier: RiskTier,
    pub flags: Vec<RiskFlag>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScanSources {
    pub etherscan: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub token: ScanToken,
    pub metrics: ScanMetrics,
    pub risk: ScanRisk,
    pub sources: ScanSources,
    pub fetched_at: DateTime<Utc>,
}

pub fn is_contract_address(query: &str) -> bool {
    query.len() == 42
        && query.starts_with("0x")
        && query[2..].bytes().all(|b| b.is_ascii_hexdigit())
}

pub(crate) fn build_report(
    address: &str,
    info: Option<&TokenInfo>,
    total_supply: Option<String>,
    fetched_at: DateTime<Utc>,
) -> ScanReport {
    let owner = info.and_then(|i| i.owner.clone());
    let decimals = info.and_then(TokenInfo::decimals);
    let assessment = risk::assess(TokenSignals {
        owner: owner.as_deref(),
        decimals,
    });
    let supply = total_supply
        .as_deref()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|s| s.is_finite());

    ScanReport {
        token: ScanToken {
            address: address.to_string(),
            name: info.and_then(|i| i.token_name.clone()),
            symbol: info.and_then(|i| i.token_symbol.clone()),
            decimals,
            token_type: info
                .and_then(|i| i.token_type.clone())
                .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string()),
            owner,
            total_supply,
            circulating_supply: info.and_then(|i| i.circulating_supply.clone()),
            last_updated: info.and_then(|i| i.last_updated.clone()),
        },
        metrics: ScanMetrics { supply },
        risk: ScanRisk {
            score: assessment.score,
            verdict: assessment.verdict,
            tier: RiskTier::from_score(f64::from(assessment.score)),
            flags: assessment.flags,
        },
        sources: ScanSources { etherscan: true },
        fetched_at,
    }
}

/// Run a Scam Likely scan on a contract address.
#[utoipa::path(
    post,
    path = "/scam-likely-run",
    tag = "Scam Likely",
    request_body = ScanRequest,
    responses(
        (status = 200, description = "Token analysis", body = ScanReport),
        (status = 400, description = "Missing query, invalid JSON or not a contract address"),
        (status = 401, description = "Missing or invalid session"),
        (status = 405, description = "Only POST is allowed"),
        (status = 500, description = "Etherscan lookup failed"),
        (status = 503, description = "Etherscan is not configured")
    ),
    security(("bearer_auth" = []))
)]
pub async fn run_scan(
    State(state): State<AppState>,
    Auth(user): Auth,
    body: Bytes,
) -> Result<Json<ScanReport>, ApiError> {
    let request: ScanRequest = parse_json_body(&body)?;
    let query = request
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::bad_request("Query is required"))?;

    if !is_contract_address(query) {
        return Err(ApiError::bad_request(
            "Only direct contract addresses are supported in this preview",
        ));
    }

    let token_data = state
        .token_data
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Etherscan API key not configured"))?;

    let (info, supply) = tokio::join!(token_data.token_info(query), token_data.token_supply(query));
    let (info, supply) = match (info, supply) {
        (Ok(info), Ok(supply)) => (info, supply),
        (Err(e), _) | (_, Err(e)) => {
            error!(user_id = %user.user_id, address = %query, error = %e, "Scan run failed");
            return Err(ApiError::internal(e.to_string()));
        }
    };

    let report = build_report(query, info.as_ref(), supply, Utc::now());

    record_scan(
        &state,
        NewScan {
            user_id: user.user_id,
            product: SCAM_LIKELY_PRODUCT_ID.to_string(),
            query: query.to_string(),
            score: Some(f64::from(report.risk.score)),
            verdict: report.risk.verdict.to_string(),
            raw_response: serde_json::to_value(&report).unwrap_or_default(),
        },
    )
    .await;

    Ok(Json(report))
}
