// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

//! Rows persisted in the relational backend.
//!
//! Field names follow the table columns (snake_case). Newsletter insights and
//! sources are stored as JSON columns and keep the camelCase shape the
//! product UI reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

// =============================================================================
// Entitlements
// =============================================================================

/// Subscription status of an entitlement row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementStatus {
    Active,
    PastDue,
    Pending,
    Revoked,
    /// Any status this service does not write itself.
    #[serde(other)]
    Unknown,
}

/// One row per (user, product) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Entitlement {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub product: String,
    pub status: EntitlementStatus,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub payment_reference: Option<String>,
    #[serde(default)]
    pub activated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
}

/// Partial update applied by webhook events.
///
/// `None` leaves a column untouched; `Some(None)` clears it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitlementUpdate {
    pub status: EntitlementStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl EntitlementUpdate {
    pub fn status(status: EntitlementStatus) -> Self {
        Self {
            status,
            activated_at: None,
            expires_at: None,
            metadata: None,
        }
    }
}

/// Arguments of the `activate_entitlement` datastore function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitlementActivation {
    #[serde(rename = "p_user")]
    pub user_id: String,
    #[serde(rename = "p_product")]
    pub product: String,
    #[serde(rename = "p_provider")]
    pub provider: String,
    #[serde(rename = "p_reference")]
    pub payment_reference: String,
    #[serde(rename = "p_expires")]
    pub expires_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Scans
// =============================================================================

/// Append-only audit record of a risk scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewScan {
    pub user_id: String,
    pub product: String,
    pub query: String,
    pub score: Option<f64>,
    pub verdict: String,
    pub raw_response: Value,
}

// =============================================================================
// Newsletters
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NewsletterStatus {
    Draft,
    Published,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub title: String,
    pub summary: String,
    pub how_to_avoid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NewsletterSource {
    pub uri: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Newsletter row ready to be inserted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewNewsletter {
    pub headline: String,
    pub summary: String,
    pub insights: Vec<Insight>,
    pub sources: Vec<NewsletterSource>,
    pub status: NewsletterStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub generated_by: String,
    pub metadata: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Newsletter {
    pub id: String,
    pub headline: String,
    pub summary: String,
    #[serde(default)]
    pub insights: Vec<Insight>,
    #[serde(default)]
    pub sources: Vec<NewsletterSource>,
    pub status: NewsletterStatus,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub generated_by: Option<String>,
    #[serde(default)]
    pub email_sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Option<Value>,
}
