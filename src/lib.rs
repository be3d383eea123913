// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

//! MonteCrypto Scam Likely API
//!
//! Backend for the Scam Likely product suite: token risk scans over Etherscan
//! data, AI-assisted analysis grounded in web search, PayPal-backed
//! subscription entitlements and the admin-curated Scam Watch newsletter.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Supabase session verification and the newsletter admin allow-list
//! - `providers` - Etherscan, PayPal, Gemini and Resend clients
//! - `storage` - Supabase (PostgREST) datastore and its in-memory twin
//! - `risk` / `analysis` - scoring rules and AI report normalization

pub mod analysis;
pub mod api;
pub mod auth;
pub mod config;
pub mod entitlements;
pub mod error;
pub mod newsletter;
pub mod providers;
pub mod risk;
pub mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;
