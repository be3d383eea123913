// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

//! Supabase (PostgREST) datastore.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;

use super::{
    dedup_emails, Entitlement, EntitlementActivation, EntitlementUpdate, NewNewsletter, NewScan,
    Newsletter, StorageError, StorageResult, Store,
};
use crate::config::SupabaseConfig;

const ENTITLEMENT_COLUMNS: &str =
    "id,user_id,product,status,provider,payment_reference,activated_at,expires_at,metadata";
const NEWSLETTER_COLUMNS: &str =
    "id,headline,summary,insights,sources,status,published_at,generated_by,email_sent_at,metadata";

#[derive(Debug, Clone)]
pub struct SupabaseStore {
    rest_url: String,
    service_role_key: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct RecipientRow {
    #[serde(default)]
    email: Option<String>,
}

impl SupabaseStore {
    pub fn new(config: &SupabaseConfig) -> StorageResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| StorageError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            rest_url: format!("{}/rest/v1", config.url.trim_end_matches('/')),
            service_role_key: config.service_role_key.clone(),
            http,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.rest_url, path))
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
    }

    async fn send(&self, builder: RequestBuilder) -> StorageResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Status { status, body });
        }
        Ok(response)
    }

    async fn rows<T: DeserializeOwned>(&self, builder: RequestBuilder) -> StorageResult<Vec<T>> {
        self.send(builder)
            .await?
            .json()
            .await
            .map_err(|e| StorageError::InvalidResponse(e.to_string()))
    }

    async fn first_row<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> StorageResult<Option<T>> {
        Ok(self.rows(builder).await?.into_iter().next())
    }
}

#[async_trait]
impl Store for SupabaseStore {
    async fn insert_scan(&self, scan: NewScan) -> StorageResult<()> {
        self.send(
            self.request(Method::POST, "scans")
                .header("Prefer", "return=minimal")
                .json(&scan),
        )
        .await?;
        Ok(())
    }

    async fn entitlement_for(
        &self,
        user_id: &str,
        product: &str,
    ) -> StorageResult<Option<Entitlement>> {
        self.first_row(self.request(Method::GET, "entitlements").query(&[
            ("select", ENTITLEMENT_COLUMNS.to_string()),
            ("user_id", format!("eq.{user_id}")),
            ("product", format!("eq.{product}")),
            ("limit", "1".to_string()),
        ]))
        .await
    }

    async fn find_entitlement_by_reference(
        &self,
        payment_reference: &str,
    ) -> StorageResult<Option<Entitlement>> {
        self.first_row(self.request(Method::GET, "entitlements").query(&[
            ("select", ENTITLEMENT_COLUMNS.to_string()),
            ("payment_reference", format!("eq.{payment_reference}")),
            ("limit", "1".to_string()),
        ]))
        .await
    }

    async fn update_entitlement(
        &self,
        entitlement_id: &str,
        update: EntitlementUpdate,
    ) -> StorageResult<()> {
        self.send(
            self.request(Method::PATCH, "entitlements")
                .query(&[("id", format!("eq.{entitlement_id}"))])
                .header("Prefer", "return=minimal")
                .json(&update),
        )
        .await?;
        Ok(())
    }

    async fn activate_entitlement(&self, activation: EntitlementActivation) -> StorageResult<()> {
        self.send(
            self.request(Method::POST, "rpc/activate_entitlement")
                .json(&activation),
        )
        .await?;
        Ok(())
    }

    async fn insert_newsletter(&self, newsletter: NewNewsletter) -> StorageResult<Newsletter> {
        self.first_row(
            self.request(Method::POST, "newsletters")
                .query(&[("select", NEWSLETTER_COLUMNS)])
                .header("Prefer", "return=representation")
                .json(&newsletter),
        )
        .await?
        .ok_or_else(|| {
            StorageError::InvalidResponse("insert returned no newsletter row".to_string())
        })
    }

    async fn newsletter_by_id(&self, id: &str) -> StorageResult<Option<Newsletter>> {
        self.first_row(self.request(Method::GET, "newsletters").query(&[
            ("select", NEWSLETTER_COLUMNS.to_string()),
            ("id", format!("eq.{id}")),
            ("limit", "1".to_string()),
        ]))
        .await
    }

    async fn latest_published_newsletter(&self) -> StorageResult<Option<Newsletter>> {
        self.first_row(self.request(Method::GET, "newsletters").query(&[
            ("select", NEWSLETTER_COLUMNS),
            ("status", "eq.published"),
            ("order", "published_at.desc.nullslast"),
            ("limit", "1"),
        ]))
        .await
    }

    async fn published_newsletters(&self) -> StorageResult<Vec<Newsletter>> {
        self.rows(self.request(Method::GET, "newsletters").query(&[
            ("select", NEWSLETTER_COLUMNS),
            ("status", "eq.published"),
            ("order", "published_at.desc.nullslast"),
        ]))
        .await
    }

    async fn mark_newsletter_sent(&self, id: &str) -> StorageResult<()> {
        self.send(
            self.request(Method::PATCH, "newsletters")
                .query(&[("id", format!("eq.{id}"))])
                .header("Prefer", "return=minimal")
                .json(&json!({ "email_sent_at": Utc::now() })),
        )
        .await?;
        Ok(())
    }

    async fn newsletter_recipient_emails(&self) -> StorageResult<Vec<String>> {
        let rows: Vec<RecipientRow> = self
            .rows(
                self.request(Method::POST, "rpc/newsletter_recipient_emails")
                    .json(&json!({})),
            )
            .await?;
        Ok(dedup_emails(rows.into_iter().filter_map(|row| row.email)))
    }

    async fn ping(&self) -> StorageResult<()> {
        self.send(
            self.request(Method::GET, "entitlements")
                .query(&[("select", "id"), ("limit", "1")]),
        )
        .await?;
        Ok(())
    }
}
