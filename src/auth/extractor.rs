// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

//! Axum extractors for authenticated users.
//!
//! ```rust,ignore
//! async fn run_scan(Auth(user): Auth, State(state): State<AppState>) -> Response {
//!     // user.user_id is the Supabase auth user id
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use super::{AuthError, AuthenticatedUser, IdentityError};
use crate::state::AppState;

/// Any user with a valid Supabase session.
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Already verified earlier in this request
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        let token = bearer_token(parts)?;

        let identity = state.identity.as_ref().ok_or(AuthError::NotConfigured)?;
        let user = identity.verify(token).await.map_err(|e| match e {
            IdentityError::InvalidSession => AuthError::InvalidSession,
            IdentityError::Expired => AuthError::TokenExpired,
            IdentityError::Unavailable(reason) => {
                warn!(%reason, "Identity provider unavailable");
                AuthError::ProviderUnavailable(reason)
            }
        })?;

        parts.extensions.insert(user.clone());
        Ok(Auth(user))
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidAuthHeader)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MissingAuthHeader);
    }
    Ok(token)
}

/// A verified user whose email is on the newsletter allow-list.
pub struct NewsletterAdmin(pub AuthenticatedUser);

impl FromRequestParts<AppState> for NewsletterAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;

        if !state.admins.is_admin(user.email.as_deref()) {
            warn!(user_id = %user.user_id, "Newsletter admin access denied");
            return Err(AuthError::InsufficientPermissions);
        }

        Ok(NewsletterAdmin(user))
    }
}
