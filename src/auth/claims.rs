// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

//! Supabase access-token claims and the authenticated user.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims of a Supabase access token (HS256, signed with the project JWT secret).
///
/// Only the fields this service reads are declared; `exp` and `aud` are
/// checked by `jsonwebtoken` during decoding.
#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseClaims {
    /// Auth user id
    pub sub: String,

    #[serde(default)]
    pub email: Option<String>,

    /// `authenticated` for signed-in users, `anon` for the public key
    #[serde(default)]
    pub role: Option<String>,
}

/// A user whose access token has been verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Supabase auth user id
    pub user_id: String,
    pub email: Option<String>,
}

impl AuthenticatedUser {
    pub fn new(user_id: impl Into<String>, email: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email,
        }
    }
}

impl From<SupabaseClaims> for AuthenticatedUser {
    fn from(claims: SupabaseClaims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email.filter(|e| !e.trim().is_empty()),
        }
    }
}
