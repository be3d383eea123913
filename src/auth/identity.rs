// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

//! Access-token verification against Supabase Auth.
//!
//! Two verifiers implement [`IdentityProvider`]:
//!
//! - [`SupabaseAuth`] asks the Auth server (`GET /auth/v1/user`) on every
//!   request. Works with any Supabase project.
//! - [`JwtVerifier`] checks the HS256 signature locally with the project JWT
//!   secret (`SUPABASE_JWT_SECRET`). No network round trip, but a token keeps
//!   working until `exp` even after sign-out.

use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::claims::{AuthenticatedUser, SupabaseClaims};
use crate::config::SupabaseConfig;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Audience Supabase puts in tokens of signed-in users.
const AUTHENTICATED_AUDIENCE: &str = "authenticated";

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("invalid session")]
    InvalidSession,

    #[error("session expired")]
    Expired,

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, access_token: &str) -> Result<AuthenticatedUser, IdentityError>;
}

// =============================================================================
// Remote verification
// =============================================================================

#[derive(Debug, Clone)]
pub struct SupabaseAuth {
    user_url: String,
    api_key: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct SupabaseUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl SupabaseAuth {
    pub fn new(config: &SupabaseConfig) -> Result<Self, IdentityError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| IdentityError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            user_url: format!("{}/auth/v1/user", config.url.trim_end_matches('/')),
            api_key: config.service_role_key.clone(),
            http,
        })
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    async fn verify(&self, access_token: &str) -> Result<AuthenticatedUser, IdentityError> {
        let response = self
            .http
            .get(&self.user_url)
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                return Err(IdentityError::InvalidSession)
            }
            status => {
                return Err(IdentityError::Unavailable(format!(
                    "HTTP {status} from Supabase Auth"
                )))
            }
        }

        let user: SupabaseUser = response
            .json()
            .await
            .map_err(|e| IdentityError::Unavailable(format!("invalid user payload: {e}")))?;

        if user.id.trim().is_empty() {
            return Err(IdentityError::InvalidSession);
        }
        Ok(AuthenticatedUser::new(
            user.id,
            user.email.filter(|e| !e.trim().is_empty()),
        ))
    }
}

// =============================================================================
// Local verification
// =============================================================================

pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.set_audience(&[AUTHENTICATED_AUDIENCE]);

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify_token(&self, access_token: &str) -> Result<AuthenticatedUser, IdentityError> {
        let token_data = decode::<SupabaseClaims>(access_token, &self.key, &self.validation)
            .map_err(|e| {
                debug!(error = %e, "Rejected access token");
                match e.kind() {
                    ErrorKind::ExpiredSignature => IdentityError::Expired,
                    _ => IdentityError::InvalidSession,
                }
            })?;

        if token_data.claims.sub.trim().is_empty() {
            return Err(IdentityError::InvalidSession);
        }
        Ok(token_data.claims.into())
    }
}

#[async_trait]
impl IdentityProvider for JwtVerifier {
    async fn verify(&self, access_token: &str) -> Result<AuthenticatedUser, IdentityError> {
        self.verify_token(access_token)
    }
}
