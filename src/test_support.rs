// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

//! In-process fakes for every external service, and helpers to drive the router.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
};
use serde_json::{json, value::RawValue, Value};
use tower::ServiceExt;

use crate::{
    api::router,
    auth::{AdminAllowlist, AuthenticatedUser, IdentityError, IdentityProvider},
    providers::{
        EtherscanError, GeminiError, GenerativeModel, Mailer, OutgoingEmail, PayPalError,
        PaymentProvider, ResendError, Subscription, TokenDataSource, TokenInfo,
        WebhookSignatureHeaders,
    },
    state::AppState,
    storage::InMemoryStore,
};

pub const USER_TOKEN: &str = "user-token";
pub const ADMIN_TOKEN: &str = "admin-token";
pub const ADMIN_EMAIL: &str = "admin@montecrypto.io";

// =============================================================================
// Identity
// =============================================================================

/// Knows exactly two sessions: a regular user and a newsletter admin.
pub struct StaticIdentity;

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn verify(&self, access_token: &str) -> Result<AuthenticatedUser, IdentityError> {
        match access_token {
            USER_TOKEN => Ok(AuthenticatedUser::new(
                "user-1",
                Some("user@example.com".to_string()),
            )),
            ADMIN_TOKEN => Ok(AuthenticatedUser::new("admin-1", Some(ADMIN_EMAIL.to_string()))),
            _ => Err(IdentityError::InvalidSession),
        }
    }
}

// =============================================================================
// Token data
// =============================================================================

#[derive(Default)]
pub struct ScriptedTokenData {
    info: Mutex<Option<TokenInfo>>,
    supply: Mutex<Option<String>>,
    failure: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl ScriptedTokenData {
    pub fn set_info(&self, info: Option<TokenInfo>) {
        *self.info.lock().unwrap() = info;
    }

    pub fn set_supply(&self, supply: Option<String>) {
        *self.supply.lock().unwrap() = supply;
    }

    /// Every lookup fails with an Etherscan API error carrying `message`.
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), EtherscanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failure.lock().unwrap().clone() {
            Some(message) => Err(EtherscanError::Api(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TokenDataSource for ScriptedTokenData {
    async fn token_info(&self, _contract_address: &str) -> Result<Option<TokenInfo>, EtherscanError> {
        self.check()?;
        Ok(self.info.lock().unwrap().clone())
    }

    async fn token_supply(&self, _contract_address: &str) -> Result<Option<String>, EtherscanError> {
        self.check()?;
        Ok(self.supply.lock().unwrap().clone())
    }
}

// =============================================================================
// Payments
// =============================================================================

/// Outcome of the next webhook signature checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verification {
    #[default]
    Accepted,
    Rejected,
    MissingWebhookId,
}

#[derive(Default)]
pub struct ScriptedPayments {
    subscriptions: Mutex<HashMap<String, Value>>,
    verification: Mutex<Verification>,
    verified_events: Mutex<Vec<String>>,
    lookups: Mutex<Vec<String>>,
}

impl ScriptedPayments {
    pub fn insert_subscription(&self, id: &str, subscription: Value) {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(id.to_string(), subscription);
    }

    pub fn set_verification(&self, verification: Verification) {
        *self.verification.lock().unwrap() = verification;
    }

    /// Raw event bodies submitted for signature verification.
    pub fn verified_events(&self) -> Vec<String> {
        self.verified_events.lock().unwrap().clone()
    }

    /// Subscription ids fetched, in order.
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProvider for ScriptedPayments {
    async fn get_subscription(&self, subscription_id: &str) -> Result<Subscription, PayPalError> {
        self.lookups
            .lock()
            .unwrap()
            .push(subscription_id.to_string());
        self.subscriptions
            .lock()
            .unwrap()
            .get(subscription_id)
            .cloned()
            .map(Subscription)
            .ok_or_else(|| PayPalError::Api {
                status: 404,
                body: r#"{"name":"RESOURCE_NOT_FOUND"}"#.to_string(),
            })
    }

    async fn verify_webhook_signature(
        &self,
        _headers: &WebhookSignatureHeaders,
        event: &RawValue,
    ) -> Result<bool, PayPalError> {
        self.verified_events
            .lock()
            .unwrap()
            .push(event.get().to_string());
        match *self.verification.lock().unwrap() {
            Verification::Accepted => Ok(true),
            Verification::Rejected => Ok(false),
            Verification::MissingWebhookId => {
                Err(PayPalError::MissingConfig("PAYPAL_WEBHOOK_ID".to_string()))
            }
        }
    }
}

// =============================================================================
// Generative model
// =============================================================================

#[derive(Default)]
pub struct ScriptedModel {
    response: Mutex<Option<Value>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn respond_with(&self, response: Value) {
        *self.response.lock().unwrap() = Some(response);
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate_content(&self, prompt: &str) -> Result<Value, GeminiError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.response
            .lock()
            .unwrap()
            .clone()
            .ok_or(GeminiError::EmptyResponse)
    }
}

/// Raw `generateContent` response with one text part and web citations.
pub fn gemini_response(text: &str, grounding: &[(&str, &str)]) -> Value {
    let chunks: Vec<Value> = grounding
        .iter()
        .map(|(uri, title)| json!({ "web": { "uri": uri, "title": title } }))
        .collect();
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "groundingMetadata": { "groundingChunks": chunks }
        }]
    })
}

// =============================================================================
// Mailer
// =============================================================================

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail_next: AtomicBool,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), ResendError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(ResendError::Api {
                status: 500,
                message: "delivery failed".to_string(),
            });
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct TestHarness {
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub token_data: Arc<ScriptedTokenData>,
    pub payments: Arc<ScriptedPayments>,
    pub model: Arc<ScriptedModel>,
    pub mailer: Arc<RecordingMailer>,
}

/// State with every integration configured and faked.
pub fn test_state() -> TestHarness {
    let store = Arc::new(InMemoryStore::new());
    let token_data = Arc::new(ScriptedTokenData::default());
    let payments = Arc::new(ScriptedPayments::default());
    let model = Arc::new(ScriptedModel::default());
    let mailer = Arc::new(RecordingMailer::default());

    let state = AppState::new(store.clone())
        .with_identity(Arc::new(StaticIdentity))
        .with_token_data(token_data.clone())
        .with_payments(payments.clone())
        .with_model(model.clone())
        .with_mailer(mailer.clone())
        .with_admins(AdminAllowlist::new([ADMIN_EMAIL]));

    TestHarness {
        state,
        store,
        token_data,
        payments,
        model,
        mailer,
    }
}

pub fn post_raw(uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    post_raw(uri, token, &body.to_string())
}

/// Run one request through the full router. An empty body reads as `Null`.
pub async fn call(state: AppState, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, headers, body)
}
