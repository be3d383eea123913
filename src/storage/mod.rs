// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

//! # Storage Module
//!
//! Rows live in the managed Postgres behind Supabase and are reached through
//! its PostgREST interface. Handlers only see the [`Store`] trait so the same
//! code runs against [`SupabaseStore`] in production and [`InMemoryStore`] in
//! tests and local development.
//!
//! ## Tables
//!
//! ```text
//! entitlements   one row per (user_id, product); status driven by PayPal
//! scans          append-only audit of every risk scan
//! newsletters    Scam Watch briefings (draft | published)
//! ```
//!
//! ## Datastore functions
//!
//! - `activate_entitlement(p_user, p_product, p_provider, p_reference, p_expires)`
//! - `newsletter_recipient_emails()` returning `[{ email }]`
//!
//! No handler deletes rows. Each write is a single insert or update.

use async_trait::async_trait;

pub mod memory;
pub mod models;
pub mod supabase;

pub use memory::InMemoryStore;
pub use models::{
    Entitlement, EntitlementActivation, EntitlementStatus, EntitlementUpdate, Insight, NewNewsletter,
    NewScan, Newsletter, NewsletterSource, NewsletterStatus,
};
pub use supabase::SupabaseStore;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("datastore request failed: {0}")]
    Request(String),

    #[error("datastore returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("datastore response was invalid: {0}")]
    InvalidResponse(String),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Typed access to the relational backend.
#[async_trait]
pub trait Store: Send + Sync {
    /// Append a scan audit record.
    async fn insert_scan(&self, scan: NewScan) -> StorageResult<()>;

    /// Entitlement of `user_id` for `product`, if any.
    async fn entitlement_for(&self, user_id: &str, product: &str)
        -> StorageResult<Option<Entitlement>>;

    /// Entitlement whose `payment_reference` equals the provider subscription id.
    async fn find_entitlement_by_reference(
        &self,
        payment_reference: &str,
    ) -> StorageResult<Option<Entitlement>>;

    async fn update_entitlement(
        &self,
        entitlement_id: &str,
        update: EntitlementUpdate,
    ) -> StorageResult<()>;

    /// Create or re-activate the entitlement for a user/product pair.
    async fn activate_entitlement(&self, activation: EntitlementActivation) -> StorageResult<()>;

    async fn insert_newsletter(&self, newsletter: NewNewsletter) -> StorageResult<Newsletter>;

    async fn newsletter_by_id(&self, id: &str) -> StorageResult<Option<Newsletter>>;

    /// Most recently published newsletter.
    async fn latest_published_newsletter(&self) -> StorageResult<Option<Newsletter>>;

    /// Every published newsletter, newest first, undated rows last.
    async fn published_newsletters(&self) -> StorageResult<Vec<Newsletter>>;

    async fn mark_newsletter_sent(&self, id: &str) -> StorageResult<()>;

    /// Deduplicated, non-empty subscriber emails.
    async fn newsletter_recipient_emails(&self) -> StorageResult<Vec<String>>;

    /// Cheap reachability probe for readiness checks.
    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Keep the first occurrence of every non-blank email.
pub(crate) fn dedup_emails<I>(emails: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut unique: Vec<String> = Vec::new();
    for email in emails {
        let email = email.trim().to_string();
        if !email.is_empty() && !unique.contains(&email) {
            unique.push(email);
        }
    }
    unique
}
