// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

//! PayPal REST integration for Scam Likely subscriptions.

use std::time::Duration;

use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{value::RawValue, Value};
use tracing::{debug, warn};

use super::token_cache::{AccessTokenCache, IssuedToken};
use crate::config::PayPalConfig;

/// Subscription states accepted when a buyer returns from checkout.
pub const ACTIVATABLE_SUBSCRIPTION_STATUSES: [&str; 2] = ["ACTIVE", "APPROVAL_PENDING"];

const VERIFICATION_SUCCESS: &str = "SUCCESS";

#[derive(Debug, thiserror::Error)]
pub enum PayPalError {
    #[error("PayPal configuration missing: {0}")]
    MissingConfig(String),

    #[error("Failed to obtain PayPal token: {0}")]
    Auth(String),

    #[error("PayPal request failed: {0}")]
    Request(String),

    #[error("PayPal API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("PayPal response was invalid: {0}")]
    InvalidResponse(String),
}

/// Subscription resource as returned by `GET /v1/billing/subscriptions/{id}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription(pub Value);

impl Subscription {
    pub fn status(&self) -> Option<&str> {
        self.0.get("status").and_then(Value::as_str)
    }

    pub fn next_billing_time(&self) -> Option<DateTime<Utc>> {
        let raw = self
            .0
            .pointer("/billing_info/next_billing_time")
            .and_then(Value::as_str)?;
        match DateTime::parse_from_rfc3339(raw) {
            Ok(parsed) => Some(parsed.with_timezone(&Utc)),
            Err(e) => {
                warn!(value = %raw, error = %e, "Ignoring unparseable next_billing_time");
                None
            }
        }
    }

    pub fn is_activatable(&self) -> bool {
        self.status()
            .is_some_and(|status| ACTIVATABLE_SUBSCRIPTION_STATUSES.contains(&status))
    }
}

/// Transmission headers PayPal signs every webhook delivery with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookSignatureHeaders {
    pub auth_algo: Option<String>,
    pub cert_url: Option<String>,
    pub transmission_id: Option<String>,
    pub transmission_sig: Option<String>,
    pub transmission_time: Option<String>,
}

impl WebhookSignatureHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        Self {
            auth_algo: get("paypal-auth-algo"),
            cert_url: get("paypal-cert-url"),
            transmission_id: get("paypal-transmission-id"),
            transmission_sig: get("paypal-transmission-sig"),
            transmission_time: get("paypal-transmission-time"),
        }
    }
}

/// Payment provider operations the API depends on.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn get_subscription(&self, subscription_id: &str) -> Result<Subscription, PayPalError>;

    /// Ask the provider whether `event` (the exact bytes received) was signed by it.
    async fn verify_webhook_signature(
        &self,
        headers: &WebhookSignatureHeaders,
        event: &RawValue,
    ) -> Result<bool, PayPalError>;
}

#[derive(Debug)]
pub struct PayPalClient {
    api_base: String,
    client_id: String,
    client_secret: String,
    webhook_id: Option<String>,
    http: Client,
    tokens: AccessTokenCache,
}

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct VerificationResponse {
    #[serde(default)]
    verification_status: Option<String>,
}

#[derive(Serialize)]
struct VerifySignatureRequest<'a> {
    auth_algo: Option<&'a str>,
    cert_url: Option<&'a str>,
    transmission_id: Option<&'a str>,
    transmission_sig: Option<&'a str>,
    transmission_time: Option<&'a str>,
    webhook_id: &'a str,
    webhook_event: &'a RawValue,
}

impl PayPalClient {
    pub fn new(config: &PayPalConfig) -> Result<Self, PayPalError> {
        if config.client_id.trim().is_empty() || config.client_secret.trim().is_empty() {
            return Err(PayPalError::MissingConfig(
                "PAYPAL_CLIENT_ID / PAYPAL_CLIENT_SECRET".to_string(),
            ));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| PayPalError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            webhook_id: config.webhook_id.clone(),
            http,
            tokens: AccessTokenCache::new(),
        })
    }

    async fn access_token(&self) -> Result<String, PayPalError> {
        self.tokens.get_or_refresh(|| self.request_token()).await
    }

    async fn request_token(&self) -> Result<IssuedToken, PayPalError> {
        debug!("Requesting PayPal access token");
        let response = self
            .http
            .post(format!("{}/v1/oauth2/token", self.api_base))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| PayPalError::Auth(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(PayPalError::Auth(response.status().as_u16().to_string()));
        }

        let token: OAuthTokenResponse = response
            .json()
            .await
            .map_err(|e| PayPalError::Auth(format!("invalid token response: {e}")))?;

        if token.access_token.trim().is_empty() {
            return Err(PayPalError::Auth(
                "token response did not include access_token".to_string(),
            ));
        }

        Ok(IssuedToken {
            access_token: token.access_token,
            expires_in: token.expires_in,
        })
    }

    /// Authenticated JSON call. `Ok(None)` for `204 No Content`.
    async fn fetch_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Option<Value>, PayPalError> {
        let token = self.access_token().await?;
        let mut request = self
            .http
            .request(method.clone(), format!("{}{}", self.api_base, path))
            .bearer_auth(token)
            .header("Content-Type", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PayPalError::Request(format!("{method} {path} failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            // Revoked before its advertised expiry; the next call fetches a new one.
            self.tokens.clear().await;
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PayPalError::Api {
                status: status.as_u16(),
                body,
            });
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        response.json().await.map(Some).map_err(|e| {
            PayPalError::InvalidResponse(format!("{method} {path} invalid JSON: {e}"))
        })
    }
}

#[async_trait]
impl PaymentProvider for PayPalClient {
    async fn get_subscription(&self, subscription_id: &str) -> Result<Subscription, PayPalError> {
        if !is_valid_subscription_id(subscription_id) {
            return Err(PayPalError::InvalidResponse(format!(
                "invalid subscription id {subscription_id:?}"
            )));
        }

        let path = format!("/v1/billing/subscriptions/{subscription_id}");
        self.fetch_json::<()>(Method::GET, &path, None)
            .await?
            .map(Subscription)
            .ok_or_else(|| PayPalError::InvalidResponse("empty subscription response".to_string()))
    }

    async fn verify_webhook_signature(
        &self,
        headers: &WebhookSignatureHeaders,
        event: &RawValue,
    ) -> Result<bool, PayPalError> {
        let webhook_id = self
            .webhook_id
            .as_deref()
            .ok_or_else(|| PayPalError::MissingConfig("PAYPAL_WEBHOOK_ID".to_string()))?;

        let request = VerifySignatureRequest {
            auth_algo: headers.auth_algo.as_deref(),
            cert_url: headers.cert_url.as_deref(),
            transmission_id: headers.transmission_id.as_deref(),
            transmission_sig: headers.transmission_sig.as_deref(),
            transmission_time: headers.transmission_time.as_deref(),
            webhook_id,
            webhook_event: event,
        };

        let response = self
            .fetch_json(
                Method::POST,
                "/v1/notifications/verify-webhook-signature",
                Some(&request),
            )
            .await?;

        let verification: Option<VerificationResponse> = response
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| PayPalError::InvalidResponse(e.to_string()))?;

        Ok(verification
            .and_then(|v| v.verification_status)
            .is_some_and(|status| status == VERIFICATION_SUCCESS))
    }
}

/// PayPal subscription ids are short upper-case tokens such as `I-BW452GLLEP1G`.
pub fn is_valid_subscription_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
