// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

//! # Authentication Module
//!
//! Every endpoint except the PayPal webhook and the health probes requires a
//! Supabase session.
//!
//! ## Auth Flow
//!
//! 1. The site signs the user in with Supabase Auth
//! 2. The site sends `Authorization: Bearer <Supabase access token>`
//! 3. The server:
//!    - verifies the token ([`SupabaseAuth`] remotely, or [`JwtVerifier`]
//!      locally when `SUPABASE_JWT_SECRET` is set)
//!    - extracts `sub` as the canonical `user_id`, plus the email
//!    - for newsletter admin endpoints, checks the email against
//!      [`AdminAllowlist`]
//!
//! Missing or invalid sessions are `401`; a valid session that is not
//! allow-listed is `403`.

pub mod allowlist;
pub mod claims;
pub mod error;
pub mod extractor;
pub mod identity;

pub use allowlist::AdminAllowlist;
pub use claims::AuthenticatedUser;
pub use error::AuthError;
pub use extractor::{Auth, NewsletterAdmin};
pub use identity::{IdentityError, IdentityProvider, JwtVerifier, SupabaseAuth};
