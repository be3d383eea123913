// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

//! Scam Watch newsletter endpoints.
//!
//! Flow: `/newsletter-generate` drafts a briefing with Gemini, an admin edits
//! it and publishes through `/newsletter-create`, then `/newsletter-send`
//! mails it to every subscriber with active access. Subscribers read the
//! published archive through `GET /newsletters`.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};
use utoipa::ToSchema;

use super::parse_json_body;
use crate::{
    auth::{Auth, NewsletterAdmin},
    entitlements::{access_status, SCAM_LIKELY_PRODUCT_ID},
    error::ApiError,
    newsletter::render_email,
    providers::{
        gemini::{newsletter_prompt, read_generation},
        OutgoingEmail,
    },
    state::AppState,
    storage::{Insight, NewNewsletter, Newsletter, NewsletterSource, NewsletterStatus},
};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct GenerateNewsletterRequest {
    /// Optional topic to steer the briefing
    #[serde(default)]
    pub focus: Option<String>,
}

/// Documents the `/newsletter-create` body. The handler validates the raw
/// JSON field by field instead of deserializing into this type.
#[derive(Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateNewsletterRequest {
    pub headline: String,
    pub summary: String,
    pub insights: Vec<Insight>,
    #[serde(default)]
    pub sources: Vec<NewsletterSource>,
    /// Defaults to `published`
    #[serde(default)]
    pub status: Option<NewsletterStatus>,
    /// RFC 3339 timestamp; defaults to now when published
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterResponse {
    pub id: String,
    pub headline: String,
    pub summary: String,
    pub insights: Vec<Insight>,
    pub sources: Vec<NewsletterSource>,
    pub status: NewsletterStatus,
    pub published_at: Option<DateTime<Utc>>,
}

impl From<Newsletter> for NewsletterResponse {
    fn from(row: Newsletter) -> Self {
        Self {
            id: row.id,
            headline: row.headline,
            summary: row.summary,
            insights: row.insights,
            sources: row.sources,
            status: row.status,
            published_at: row.published_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendNewsletterRequest {
    /// Defaults to the most recently published newsletter
    #[serde(default)]
    pub newsletter_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SendNewsletterResponse {
    pub success: bool,
    pub recipients: usize,
}

// =============================================================================
// Generate
// =============================================================================

/// Draft a briefing on the latest crypto scams.
#[utoipa::path(
    post,
    path = "/newsletter-generate",
    tag = "Newsletter",
    security(("bearer_auth" = [])),
    request_body = GenerateNewsletterRequest,
    responses(
        (status = 200, description = "Draft with headline, summary, insights, sources, publishedAt and status"),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Not a newsletter admin"),
        (status = 500, description = "Gemini not configured or the generation failed")
    )
)]
pub async fn generate_newsletter(
    State(state): State<AppState>,
    NewsletterAdmin(admin): NewsletterAdmin,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let model = state
        .model
        .as_ref()
        .ok_or_else(|| ApiError::internal("Gemini API key not configured"))?;
    let request: GenerateNewsletterRequest = parse_json_body(&body)?;

    let generation = model
        .generate_content(&newsletter_prompt(request.focus.as_deref()))
        .await
        .and_then(|response| read_generation(&response))
        .map_err(|e| {
            error!(user_id = %admin.user_id, error = %e, "Failed to generate newsletter briefing");
            ApiError::internal(e.to_string())
        })?;

    let mut draft = match generation.payload {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    if !generation.grounding.is_empty() {
        let sources: Vec<Value> = generation
            .grounding
            .iter()
            .map(|source| json!({ "uri": source.uri, "title": source.display_title() }))
            .collect();
        draft.insert("sources".to_string(), Value::Array(sources));
    }
    draft.insert(
        "publishedAt".to_string(),
        Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    draft.insert("status".to_string(), json!(NewsletterStatus::Draft));

    info!(user_id = %admin.user_id, "Generated newsletter draft");
    Ok(Json(Value::Object(draft)))
}

// =============================================================================
// Create
// =============================================================================

/// Check a create payload and build the row to insert.
fn validate_newsletter(
    payload: &Value,
    generated_by: &str,
    now: DateTime<Utc>,
) -> Result<NewNewsletter, String> {
    let Some(fields) = payload.as_object() else {
        return Err("Payload required".to_string());
    };

    let required_text = |key: &str| {
        fields
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let headline = required_text("headline").ok_or("headline is required")?;
    let summary = required_text("summary").ok_or("summary is required")?;

    let raw_insights = fields
        .get("insights")
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty())
        .ok_or("At least one insight is required")?;
    let mut insights = Vec::with_capacity(raw_insights.len());
    for item in raw_insights {
        let object = item.as_object().ok_or("Each insight must be an object")?;
        let text = |key: &str| {
            object
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        match (text("title"), text("summary"), text("howToAvoid")) {
            (Some(title), Some(summary), Some(how_to_avoid)) => insights.push(Insight {
                title,
                summary,
                how_to_avoid,
                threat_level: text("threatLevel"),
            }),
            _ => return Err("Each insight must include title, summary, and howToAvoid".to_string()),
        }
    }

    let sources = match fields.get("sources") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                let uri = item
                    .get("uri")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or("Each source must include uri")?;
                let title = item
                    .get("title")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
                Ok(NewsletterSource {
                    uri: uri.to_string(),
                    title,
                })
            })
            .collect::<Result<Vec<_>, &str>>()?,
        Some(_) => return Err("sources must be an array".to_string()),
    };

    let status = match fields.get("status") {
        None | Some(Value::Null) => NewsletterStatus::Published,
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|_| "status must be draft or published".to_string())?,
    };

    let published_at = match status {
        NewsletterStatus::Draft => None,
        NewsletterStatus::Published => match fields.get("publishedAt").and_then(Value::as_str) {
            Some(raw) if !raw.trim().is_empty() => Some(
                DateTime::parse_from_rfc3339(raw.trim())
                    .map_err(|_| "publishedAt must be an RFC 3339 timestamp".to_string())?
                    .with_timezone(&Utc),
            ),
            _ => Some(now),
        },
    };

    let metadata = match fields.get("metadata") {
        None | Some(Value::Null) => json!({}),
        Some(value) => value.clone(),
    };

    Ok(NewNewsletter {
        headline,
        summary,
        insights,
        sources,
        status,
        published_at,
        generated_by: generated_by.to_string(),
        metadata,
    })
}

/// Publish (or save as draft) a newsletter.
#[utoipa::path(
    post,
    path = "/newsletter-create",
    tag = "Newsletter",
    security(("bearer_auth" = [])),
    request_body = CreateNewsletterRequest,
    responses(
        (status = 201, description = "Stored newsletter", body = NewsletterResponse),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Not a newsletter admin"),
        (status = 500, description = "Failed to store newsletter")
    )
)]
pub async fn create_newsletter(
    State(state): State<AppState>,
    NewsletterAdmin(admin): NewsletterAdmin,
    body: Bytes,
) -> Result<(StatusCode, Json<NewsletterResponse>), ApiError> {
    let payload: Value = parse_json_body(&body)?;
    let newsletter =
        validate_newsletter(&payload, &admin.user_id, Utc::now()).map_err(ApiError::bad_request)?;

    let stored = state.store.insert_newsletter(newsletter).await.map_err(|e| {
        error!(user_id = %admin.user_id, error = %e, "Failed to persist newsletter");
        ApiError::internal("Failed to store newsletter")
    })?;

    info!(newsletter_id = %stored.id, status = ?stored.status, "Newsletter stored");
    Ok((StatusCode::CREATED, Json(stored.into())))
}

// =============================================================================
// Archive
// =============================================================================

/// Published newsletters, newest first. Requires active Scam Likely access.
#[utoipa::path(
    get,
    path = "/newsletters",
    tag = "Newsletter",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Published newsletters", body = Vec<NewsletterResponse>),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "No active Scam Likely subscription"),
        (status = 500, description = "Datastore error")
    )
)]
pub async fn list_newsletters(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<Vec<NewsletterResponse>>, ApiError> {
    let entitlement = state
        .store
        .entitlement_for(&user.user_id, SCAM_LIKELY_PRODUCT_ID)
        .await
        .map_err(|e| {
            error!(user_id = %user.user_id, error = %e, "Failed to load entitlement");
            ApiError::internal("Failed to load entitlement")
        })?;
    if !access_status(entitlement.as_ref()).grants_access() {
        return Err(ApiError::forbidden("Active Scam Likely subscription required"));
    }

    let newsletters = state.store.published_newsletters().await.map_err(|e| {
        error!(user_id = %user.user_id, error = %e, "Failed to load newsletters");
        ApiError::internal("Failed to load newsletters")
    })?;

    Ok(Json(newsletters.into_iter().map(Into::into).collect()))
}

// =============================================================================
// Send
// =============================================================================

/// Email a newsletter to every subscriber, recipients in BCC.
#[utoipa::path(
    post,
    path = "/newsletter-send",
    tag = "Newsletter",
    security(("bearer_auth" = [])),
    request_body = SendNewsletterRequest,
    responses(
        (status = 200, description = "Newsletter sent", body = SendNewsletterResponse),
        (status = 400, description = "No recipients"),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Not a newsletter admin"),
        (status = 404, description = "Newsletter not found"),
        (status = 500, description = "Resend not configured or delivery failed")
    )
)]
pub async fn send_newsletter(
    State(state): State<AppState>,
    NewsletterAdmin(admin): NewsletterAdmin,
    body: Bytes,
) -> Result<Json<SendNewsletterResponse>, ApiError> {
    let mailer = state
        .mailer
        .as_ref()
        .ok_or_else(|| ApiError::internal("Resend is not configured on the server"))?;
    let request: SendNewsletterRequest = parse_json_body(&body)?;

    let lookup = match request.newsletter_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => state.store.newsletter_by_id(id).await,
        _ => state.store.latest_published_newsletter().await,
    };
    let newsletter = lookup
        .map_err(|e| {
            error!(error = %e, "Failed to load newsletter");
            ApiError::internal("Failed to load newsletter")
        })?
        .ok_or_else(|| ApiError::not_found("Newsletter not found"))?;

    let recipients = state.store.newsletter_recipient_emails().await.map_err(|e| {
        error!(error = %e, "Failed to load newsletter recipients");
        ApiError::internal("Failed to load newsletter recipients")
    })?;
    if recipients.is_empty() {
        return Err(ApiError::bad_request("No subscribers with active access found"));
    }

    let rendered = render_email(&newsletter);
    let email = OutgoingEmail {
        subject: rendered.subject,
        html: rendered.html,
        text: rendered.text,
        bcc: recipients,
    };
    mailer.send(&email).await.map_err(|e| {
        error!(newsletter_id = %newsletter.id, error = %e, "Failed to send newsletter emails");
        ApiError::internal(e.to_string())
    })?;

    if let Err(e) = state.store.mark_newsletter_sent(&newsletter.id).await {
        warn!(newsletter_id = %newsletter.id, error = %e, "Newsletter sent but email_sent_at not stamped");
    }

    info!(
        newsletter_id = %newsletter.id,
        recipients = email.bcc.len(),
        user_id = %admin.user_id,
        "Newsletter sent"
    );
    Ok(Json(SendNewsletterResponse {
        success: true,
        recipients: email.bcc.len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Entitlement, EntitlementStatus, Store};
    use crate::test_support::{
        call, gemini_response, post_json, post_raw, test_state, TestHarness, ADMIN_TOKEN,
        USER_TOKEN,
    };
    use axum::{
        body::Body,
        http::{header::AUTHORIZATION, Request},
    };
    use chrono::Duration;

    fn get_archive(token: &str) -> Request<Body> {
        Request::builder()
            .uri("/newsletters")
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn subscribe(harness: &TestHarness, status: EntitlementStatus) {
        harness
            .store
            .insert_entitlement(Entitlement {
                id: "ent-1".to_string(),
                user_id: "user-1".to_string(),
                product: SCAM_LIKELY_PRODUCT_ID.to_string(),
                status,
                provider: Some("paypal".to_string()),
                payment_reference: Some("I-SUB1".to_string()),
                activated_at: None,
                expires_at: None,
                metadata: None,
            })
            .await;
    }

    async fn seed_archive(harness: &TestHarness) {
        for row in [
            stored("old", NewsletterStatus::Published, 14),
            stored("draft", NewsletterStatus::Draft, 0),
            stored("new", NewsletterStatus::Published, 1),
        ] {
            harness.store.insert_newsletter_row(row).await;
        }
    }

    fn valid_payload() -> Value {
        json!({
            "headline": "Drainers are back",
            "summary": "Three scams to watch this week.",
            "insights": [{
                "title": "Fake airdrop",
                "summary": "Drainer links on X",
                "howToAvoid": "Never sign blind",
                "threatLevel": "High"
            }],
            "sources": [{ "uri": "https://news.example/a", "title": "A" }]
        })
    }

    fn stored(id: &str, status: NewsletterStatus, days_ago: i64) -> Newsletter {
        Newsletter {
            id: id.to_string(),
            headline: format!("Headline {id}"),
            summary: "Summary".to_string(),
            insights: vec![],
            sources: vec![],
            status,
            published_at: Some(Utc::now() - Duration::days(days_ago)),
            generated_by: None,
            email_sent_at: None,
            metadata: None,
        }
    }

    #[test]
    fn validation_messages() {
        let now = Utc::now();
        let cases = [
            (json!([]), "Payload required"),
            (json!({ "summary": "s" }), "headline is required"),
            (json!({ "headline": "h" }), "summary is required"),
            (
                json!({ "headline": "h", "summary": "s", "insights": [] }),
                "At least one insight is required",
            ),
            (
                json!({ "headline": "h", "summary": "s", "insights": ["text"] }),
                "Each insight must be an object",
            ),
            (
                json!({ "headline": "h", "summary": "s", "insights": [{ "title": "t", "summary": "s" }] }),
                "Each insight must include title, summary, and howToAvoid",
            ),
        ];
        for (payload, expected) in cases {
            assert_eq!(
                validate_newsletter(&payload, "admin-1", now).unwrap_err(),
                expected
            );
        }

        let mut bad_sources = valid_payload();
        bad_sources["sources"] = json!("https://news.example");
        assert_eq!(
            validate_newsletter(&bad_sources, "admin-1", now).unwrap_err(),
            "sources must be an array"
        );
    }

    #[test]
    fn publish_defaults() {
        let now = Utc::now();
        let row = validate_newsletter(&valid_payload(), "admin-1", now).unwrap();
        assert_eq!(row.status, NewsletterStatus::Published);
        assert_eq!(row.published_at, Some(now));
        assert_eq!(row.metadata, json!({}));
        assert_eq!(row.generated_by, "admin-1");
        assert_eq!(row.insights[0].threat_level.as_deref(), Some("High"));

        let mut draft = valid_payload();
        draft["status"] = json!("draft");
        draft["publishedAt"] = json!("2026-10-01T00:00:00Z");
        let row = validate_newsletter(&draft, "admin-1", now).unwrap();
        assert_eq!(row.published_at, None);

        let mut dated = valid_payload();
        dated["publishedAt"] = json!("2026-10-01T09:30:00+02:00");
        let row = validate_newsletter(&dated, "admin-1", now).unwrap();
        assert_eq!(
            row.published_at.unwrap().to_rfc3339(),
            "2026-10-01T07:30:00+00:00"
        );

        let mut bogus = valid_payload();
        bogus["status"] = json!("archived");
        assert!(validate_newsletter(&bogus, "admin-1", now).is_err());
    }

    #[tokio::test]
    async fn archive_lists_published_newest_first_for_active_subscribers() {
        let harness = test_state();
        subscribe(&harness, EntitlementStatus::Active).await;
        seed_archive(&harness).await;

        let (status, _, body) = call(harness.state, get_archive(USER_TOKEN)).await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["new", "old"]);
        assert_eq!(body[0]["headline"], "Headline new");
        assert!(body[0]["publishedAt"].is_string());
    }

    #[tokio::test]
    async fn archive_allows_past_due_subscribers() {
        let harness = test_state();
        subscribe(&harness, EntitlementStatus::PastDue).await;
        seed_archive(&harness).await;

        let (status, _, body) = call(harness.state, get_archive(USER_TOKEN)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn archive_is_forbidden_without_active_access() {
        for entitlement in [
            None,
            Some(EntitlementStatus::Pending),
            Some(EntitlementStatus::Revoked),
        ] {
            let harness = test_state();
            if let Some(status) = entitlement.clone() {
                subscribe(&harness, status).await;
            }
            seed_archive(&harness).await;

            let (status, _, body) = call(harness.state, get_archive(USER_TOKEN)).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{entitlement:?}");
            assert_eq!(body["error"], "Active Scam Likely subscription required");
        }
    }

    #[tokio::test]
    async fn archive_requires_session() {
        let harness = test_state();
        let request = Request::builder()
            .uri("/newsletters")
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = call(harness.state, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_requires_admin() {
        let harness = test_state();
        let request = post_json("/newsletter-create", Some(USER_TOKEN), valid_payload());
        let (status, _, body) = call(harness.state, request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Insufficient permissions");
    }

    #[tokio::test]
    async fn create_stores_and_returns_201() {
        let harness = test_state();
        let request = post_json("/newsletter-create", Some(ADMIN_TOKEN), valid_payload());
        let (status, _, body) = call(harness.state.clone(), request).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["headline"], "Drainers are back");
        assert_eq!(body["status"], "published");
        assert!(body["publishedAt"].is_string());
        assert_eq!(body["insights"][0]["howToAvoid"], "Never sign blind");

        let id = body["id"].as_str().unwrap();
        let row = harness.store.newsletter_by_id(id).await.unwrap().unwrap();
        assert_eq!(row.generated_by.as_deref(), Some("admin-1"));
    }

    #[tokio::test]
    async fn create_persistence_failure_is_500() {
        let harness = test_state();
        harness.store.set_fail_writes(true);
        let request = post_json("/newsletter-create", Some(ADMIN_TOKEN), valid_payload());
        let (status, _, body) = call(harness.state, request).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to store newsletter");
    }

    #[tokio::test]
    async fn create_rejects_invalid_json() {
        let harness = test_state();
        let request = post_raw("/newsletter-create", Some(ADMIN_TOKEN), "{headline:");
        let (status, _, body) = call(harness.state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid JSON payload");
    }

    #[tokio::test]
    async fn generate_returns_grounded_draft() {
        let harness = test_state();
        harness.model.respond_with(gemini_response(
            "```json\n{\"headline\":\"Week 42\",\"summary\":\"s\",\"insights\":[],\
             \"sources\":[{\"uri\":\"https://invented.example\"}]}\n```",
            &[("https://news.example/1", "One"), ("https://news.example/1", "Dup")],
        ));

        let request = post_json(
            "/newsletter-generate",
            Some(ADMIN_TOKEN),
            json!({ "focus": "fake exchanges" }),
        );
        let (status, _, body) = call(harness.state.clone(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["headline"], "Week 42");
        assert_eq!(body["status"], "draft");
        assert!(DateTime::parse_from_rfc3339(body["publishedAt"].as_str().unwrap()).is_ok());
        assert_eq!(
            body["sources"],
            json!([{ "uri": "https://news.example/1", "title": "One" }])
        );
        assert!(harness.model.prompts()[0].contains("Focus on fake exchanges. "));
    }

    #[tokio::test]
    async fn send_defaults_to_latest_published_and_uses_bcc() {
        let harness = test_state();
        harness
            .store
            .insert_newsletter_row(stored("old", NewsletterStatus::Published, 7))
            .await;
        harness
            .store
            .insert_newsletter_row(stored("new", NewsletterStatus::Published, 1))
            .await;
        harness.store.add_recipient("a@example.com").await;
        harness.store.add_recipient("b@example.com").await;
        harness.store.add_recipient("a@example.com").await;

        let request = post_raw("/newsletter-send", Some(ADMIN_TOKEN), "");
        let (status, _, body) = call(harness.state.clone(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "recipients": 2 }));

        let sent = harness.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Scam Watch: Headline new");
        assert_eq!(sent[0].bcc, vec!["a@example.com", "b@example.com"]);

        let row = harness.store.newsletter_by_id("new").await.unwrap().unwrap();
        assert!(row.email_sent_at.is_some());
    }

    #[tokio::test]
    async fn send_unknown_newsletter_is_404() {
        let harness = test_state();
        harness.store.add_recipient("a@example.com").await;
        let request = post_json(
            "/newsletter-send",
            Some(ADMIN_TOKEN),
            json!({ "newsletterId": "missing" }),
        );
        let (status, _, body) = call(harness.state, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Newsletter not found");
    }

    #[tokio::test]
    async fn send_without_recipients_is_400() {
        let harness = test_state();
        harness
            .store
            .insert_newsletter_row(stored("n1", NewsletterStatus::Published, 0))
            .await;
        let request = post_json("/newsletter-send", Some(ADMIN_TOKEN), json!({ "newsletterId": "n1" }));
        let (status, _, body) = call(harness.state.clone(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No subscribers with active access found");
        assert!(harness.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn delivery_failure_is_500_and_not_stamped() {
        let harness = test_state();
        harness
            .store
            .insert_newsletter_row(stored("n1", NewsletterStatus::Published, 0))
            .await;
        harness.store.add_recipient("a@example.com").await;
        harness.mailer.fail_next();

        let request = post_json("/newsletter-send", Some(ADMIN_TOKEN), json!({ "newsletterId": "n1" }));
        let (status, _, _) = call(harness.state.clone(), request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let row = harness.store.newsletter_by_id("n1").await.unwrap().unwrap();
        assert!(row.email_sent_at.is_none());
    }

    #[tokio::test]
    async fn missing_mailer_is_500() {
        let mut harness = test_state();
        harness.state.mailer = None;
        let request = post_json("/newsletter-send", Some(ADMIN_TOKEN), json!({}));
        let (status, _, body) = call(harness.state, request).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Resend is not configured on the server");
    }
}
