// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

//! Resend transactional email client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::ResendConfig;

#[derive(Debug, thiserror::Error)]
pub enum ResendError {
    #[error("Resend request failed: {0}")]
    Request(String),

    #[error("Resend API error {status}: {message}")]
    Api { status: u16, message: String },
}

/// A single broadcast. Recipients only ever appear in `bcc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
    pub bcc: Vec<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), ResendError>;
}

#[derive(Debug, Clone)]
pub struct ResendClient {
    api_base: String,
    api_key: String,
    from_email: String,
    http: Client,
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    bcc: &'a [String],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

impl ResendClient {
    pub fn new(config: &ResendConfig) -> Result<Self, ResendError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ResendError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            from_email: config.from_email.clone(),
            http,
        })
    }

    /// The visible recipient is the sender itself.
    fn request_body<'a>(&'a self, email: &'a OutgoingEmail) -> SendEmailRequest<'a> {
        SendEmailRequest {
            from: &self.from_email,
            to: [&self.from_email],
            bcc: &email.bcc,
            subject: &email.subject,
            html: &email.html,
            text: &email.text,
        }
    }
}

#[async_trait]
impl Mailer for ResendClient {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), ResendError> {
        debug!(recipients = email.bcc.len(), subject = %email.subject, "Sending email via Resend");
        let response = self
            .http
            .post(format!("{}/emails", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(email))
            .send()
            .await
            .map_err(|e| ResendError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(body);
            return Err(ResendError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}
