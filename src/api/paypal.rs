// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

//! PayPal subscription endpoints.
//!
//! `/paypal-subscription-activate` is called by the browser when the buyer
//! returns from checkout. `/paypal-webhook` receives PayPal's asynchronous
//! events and is the only other writer of entitlement status.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{value::RawValue, Value};
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;

use super::parse_json_body;
use crate::{
    auth::Auth,
    entitlements::SCAM_LIKELY_PRODUCT_ID,
    error::ApiError,
    providers::{
        paypal::is_valid_subscription_id, PayPalError, PaymentProvider, WebhookSignatureHeaders,
    },
    state::AppState,
    storage::{EntitlementActivation, EntitlementStatus, EntitlementUpdate, StorageError},
};

const PAYMENT_PROVIDER: &str = "paypal";

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivateSubscriptionRequest {
    /// PayPal subscription id, e.g. `I-BW452GLLEP1G`
    #[serde(default)]
    pub subscription_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookReceived {
    pub received: bool,
}

fn payments(state: &AppState) -> Result<&dyn PaymentProvider, ApiError> {
    state
        .payments
        .as_deref()
        .ok_or_else(|| ApiError::internal("PayPal is not configured on the server"))
}

// =============================================================================
// Activation
// =============================================================================

/// Confirm a checkout and activate the caller's Scam Likely entitlement.
#[utoipa::path(
    post,
    path = "/paypal-subscription-activate",
    tag = "PayPal",
    security(("bearer_auth" = [])),
    request_body = ActivateSubscriptionRequest,
    responses(
        (status = 200, description = "Entitlement activated", body = SuccessResponse),
        (status = 400, description = "Missing, unknown or inactive subscription"),
        (status = 401, description = "Missing or invalid session"),
        (status = 500, description = "PayPal not configured or activation failed")
    )
)]
pub async fn activate_subscription(
    State(state): State<AppState>,
    Auth(user): Auth,
    body: Bytes,
) -> Result<Json<SuccessResponse>, ApiError> {
    let request: ActivateSubscriptionRequest = parse_json_body(&body)?;
    let subscription_id = request
        .subscription_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing subscriptionId"))?;
    if !is_valid_subscription_id(subscription_id) {
        return Err(ApiError::bad_request("Invalid subscriptionId"));
    }

    let subscription = payments(&state)?
        .get_subscription(subscription_id)
        .await
        .map_err(|e| {
            warn!(user_id = %user.user_id, %subscription_id, error = %e, "Subscription lookup failed");
            match e {
                PayPalError::MissingConfig(_) => ApiError::internal(e.to_string()),
                _ => ApiError::bad_request(e.to_string()),
            }
        })?;

    if !subscription.is_activatable() {
        return Err(ApiError::bad_request(format!(
            "Subscription status {} not valid",
            subscription.status().unwrap_or("UNKNOWN")
        )));
    }

    state
        .store
        .activate_entitlement(EntitlementActivation {
            user_id: user.user_id.clone(),
            product: SCAM_LIKELY_PRODUCT_ID.to_string(),
            provider: PAYMENT_PROVIDER.to_string(),
            payment_reference: subscription_id.to_string(),
            expires_at: subscription.next_billing_time(),
        })
        .await
        .map_err(|e| {
            error!(user_id = %user.user_id, %subscription_id, error = %e, "Failed to activate entitlement");
            ApiError::internal("Failed to activate entitlement")
        })?;

    info!(user_id = %user.user_id, %subscription_id, "Subscription activated");
    Ok(Json(SuccessResponse { success: true }))
}

// =============================================================================
// Webhook
// =============================================================================

/// What an event does to the entitlement it references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventAction {
    Activate,
    Revoke,
    PastDue,
}

impl EventAction {
    fn for_event(event_type: &str) -> Option<Self> {
        match event_type {
            "BILLING.SUBSCRIPTION.ACTIVATED" | "PAYMENT.SALE.COMPLETED" => Some(Self::Activate),
            "BILLING.SUBSCRIPTION.CANCELLED"
            | "BILLING.SUBSCRIPTION.SUSPENDED"
            | "BILLING.SUBSCRIPTION.EXPIRED" => Some(Self::Revoke),
            "PAYMENT.SALE.DENIED" => Some(Self::PastDue),
            _ => None,
        }
    }
}

/// Subscription id an event refers to.
///
/// Sale events carry the subscription as `billing_agreement_id` and their own
/// sale id as `id`; subscription events are the other way around.
fn subscription_reference(event: &Value) -> Option<&str> {
    let event_type = event.get("event_type").and_then(Value::as_str).unwrap_or_default();
    let resource = event.get("resource")?;
    let field = |key: &str| {
        resource
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };
    if event_type.starts_with("PAYMENT.SALE.") {
        field("billing_agreement_id").or_else(|| field("id"))
    } else {
        field("id").or_else(|| field("billing_agreement_id"))
    }
}

fn resource_update_time(event: &Value) -> Option<DateTime<Utc>> {
    let raw = event.pointer("/resource/update_time").and_then(Value::as_str)?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

#[derive(Debug, thiserror::Error)]
enum DispatchError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    PayPal(#[from] PayPalError),
}

/// Apply a verified event. Events for unknown subscriptions are ignored.
async fn dispatch_event(
    state: &AppState,
    payments: &dyn PaymentProvider,
    event: &Value,
) -> Result<(), DispatchError> {
    let event_type = event.get("event_type").and_then(Value::as_str).unwrap_or_default();
    let Some(action) = EventAction::for_event(event_type) else {
        debug!(%event_type, "Ignoring PayPal event");
        return Ok(());
    };
    let Some(reference) = subscription_reference(event) else {
        debug!(%event_type, "PayPal event without subscription reference");
        return Ok(());
    };
    let Some(entitlement) = state.store.find_entitlement_by_reference(reference).await? else {
        debug!(%event_type, %reference, "No entitlement for PayPal subscription");
        return Ok(());
    };

    let update = match action {
        EventAction::Activate => {
            let subscription = payments.get_subscription(reference).await?;
            EntitlementUpdate {
                status: EntitlementStatus::Active,
                activated_at: Some(Utc::now()),
                expires_at: Some(subscription.next_billing_time()),
                metadata: Some(subscription.0),
            }
        }
        EventAction::Revoke => EntitlementUpdate {
            expires_at: Some(resource_update_time(event)),
            ..EntitlementUpdate::status(EntitlementStatus::Revoked)
        },
        EventAction::PastDue => EntitlementUpdate::status(EntitlementStatus::PastDue),
    };

    state
        .store
        .update_entitlement(&entitlement.id, update)
        .await?;
    info!(
        %event_type,
        %reference,
        entitlement_id = %entitlement.id,
        "Applied PayPal event"
    );
    Ok(())
}

/// PayPal webhook receiver.
///
/// The body is verified with PayPal exactly as received, then dispatched.
#[utoipa::path(
    post,
    path = "/paypal-webhook",
    tag = "PayPal",
    request_body(content = serde_json::Value, description = "PayPal webhook event", content_type = "application/json"),
    responses(
        (status = 200, description = "Event accepted", body = WebhookReceived),
        (status = 400, description = "Invalid JSON or signature"),
        (status = 500, description = "PayPal not configured or the event could not be applied")
    )
)]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookReceived>, ApiError> {
    let raw: &RawValue = serde_json::from_slice(&body).map_err(|_| ApiError::invalid_json())?;
    let event: Value = serde_json::from_str(raw.get()).map_err(|_| ApiError::invalid_json())?;
    let payments = payments(&state)?;

    let signature = WebhookSignatureHeaders::from_headers(&headers);
    match payments.verify_webhook_signature(&signature, raw).await {
        Ok(true) => {}
        Ok(false) => {
            warn!(transmission_id = ?signature.transmission_id, "PayPal webhook signature rejected");
            return Err(ApiError::bad_request("Invalid webhook signature"));
        }
        Err(e @ PayPalError::MissingConfig(_)) => {
            error!(error = %e, "Cannot verify PayPal webhooks");
            return Err(ApiError::internal(e.to_string()));
        }
        Err(e) => {
            warn!(error = %e, "PayPal webhook verification failed");
            return Err(ApiError::bad_request("Invalid webhook signature"));
        }
    }

    dispatch_event(&state, payments, &event).await.map_err(|e| {
        error!(error = %e, "Failed to process PayPal webhook");
        ApiError::internal("Failed to process webhook")
    })?;

    Ok(Json(WebhookReceived { received: true }))
}
