// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug)]
pub enum AuthError {
    /// No bearer token in the request
    MissingAuthHeader,
    /// Authorization header present but not `Bearer <token>`
    InvalidAuthHeader,
    /// Identity provider rejected the token
    InvalidSession,
    /// Token was valid once but has expired
    TokenExpired,
    /// Identity provider could not be reached
    ProviderUnavailable(String),
    /// No identity provider configured on this server
    NotConfigured,
    /// Verified user is not on the admin allow-list
    InsufficientPermissions,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::InvalidSession => "invalid_session",
            AuthError::TokenExpired => "token_expired",
            AuthError::ProviderUnavailable(_) => "identity_unavailable",
            AuthError::NotConfigured => "identity_not_configured",
            AuthError::InsufficientPermissions => "insufficient_permissions",
        }
    }

    /// An unreachable identity provider is still a failed authentication.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::InvalidSession
            | AuthError::TokenExpired
            | AuthError::ProviderUnavailable(_) => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AuthError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthHeader => write!(f, "Missing Supabase access token"),
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::InvalidSession | AuthError::ProviderUnavailable(_) => {
                write!(f, "Invalid Supabase session")
            }
            AuthError::TokenExpired => write!(f, "Supabase session has expired"),
            AuthError::NotConfigured => write!(f, "Authentication is not configured on the server"),
            AuthError::InsufficientPermissions => write!(f, "Insufficient permissions"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
