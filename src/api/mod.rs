// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

use axum::{
    body::Bytes,
    routing::{get, post},
    Router,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    error::{method_not_allowed, ApiError},
    state::AppState,
    storage::NewScan,
};

pub mod entitlements;
pub mod gemini;
pub mod health;
pub mod newsletters;
pub mod paypal;
pub mod scam_likely;

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        // Health (no auth)
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        // Scam Likely
        .route(
            "/scam-likely-run",
            post(scam_likely::run_scan).fallback(method_not_allowed),
        )
        .route(
            "/gemini-analysis",
            post(gemini::analyze_token).fallback(method_not_allowed),
        )
        .route(
            "/entitlements/{product}",
            get(entitlements::get_entitlement),
        )
        // Newsletter
        .route("/newsletters", get(newsletters::list_newsletters))
        .route(
            "/newsletter-generate",
            post(newsletters::generate_newsletter).fallback(method_not_allowed),
        )
        .route(
            "/newsletter-create",
            post(newsletters::create_newsletter).fallback(method_not_allowed),
        )
        .route(
            "/newsletter-send",
            post(newsletters::send_newsletter).fallback(method_not_allowed),
        )
        // PayPal
        .route(
            "/paypal-subscription-activate",
            post(paypal::activate_subscription).fallback(method_not_allowed),
        )
        .route(
            "/paypal-webhook",
            post(paypal::webhook).fallback(method_not_allowed),
        )
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

/// Parse a JSON request body.
///
/// An empty body is `T::default()`. A body that is itself a JSON string is
/// unwrapped once, for clients that double-encode. Anything that does not
/// parse is a `400` with a generic message.
pub(crate) fn parse_json_body<T>(body: &Bytes) -> Result<T, ApiError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    let value = match serde_json::from_slice::<Value>(body).map_err(|_| ApiError::invalid_json())? {
        Value::String(inner) if inner.trim().is_empty() => return Ok(T::default()),
        Value::String(inner) => {
            serde_json::from_str::<Value>(&inner).map_err(|_| ApiError::invalid_json())?
        }
        other => other,
    };

    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value).map_err(|_| ApiError::invalid_json())
}

/// Append a scan audit row. Failures are logged, never returned.
pub(crate) async fn record_scan(state: &AppState, scan: NewScan) {
    let user_id = scan.user_id.clone();
    let product = scan.product.clone();
    match state.store.insert_scan(scan).await {
        Ok(()) => info!(%user_id, %product, "Scan recorded"),
        Err(e) => error!(%user_id, %product, error = %e, "Failed to record scan"),
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        scam_likely::run_scan,
        gemini::analyze_token,
        entitlements::get_entitlement,
        newsletters::list_newsletters,
        newsletters::generate_newsletter,
        newsletters::create_newsletter,
        newsletters::send_newsletter,
        paypal::activate_subscription,
        paypal::webhook
    ),
    components(
        schemas(
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            scam_likely::ScanRequest,
            scam_likely::ScanReport,
            gemini::AnalysisRequest,
            crate::analysis::AnalysisReport,
            entitlements::EntitlementResponse,
            newsletters::GenerateNewsletterRequest,
            newsletters::CreateNewsletterRequest,
            newsletters::NewsletterResponse,
            newsletters::SendNewsletterRequest,
            newsletters::SendNewsletterResponse,
            paypal::ActivateSubscriptionRequest,
            paypal::SuccessResponse,
            paypal::WebhookReceived
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Scam Likely", description = "Token risk scans"),
        (name = "Newsletter", description = "Scam Watch briefings (admin only)"),
        (name = "PayPal", description = "Subscription activation and webhooks")
    )
)]
struct ApiDoc;

/// Registers the Supabase access token as the `bearer_auth` scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
