// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

//! In-memory datastore.
//!
//! Mirrors the semantics of the Supabase tables and functions. Used by the
//! test-suite and as the fallback when no Supabase project is configured, in
//! which case nothing survives a restart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    dedup_emails, Entitlement, EntitlementActivation, EntitlementStatus, EntitlementUpdate,
    NewNewsletter, NewScan, Newsletter, NewsletterStatus, StorageError, StorageResult, Store,
};

#[derive(Default)]
struct Tables {
    entitlements: HashMap<String, Entitlement>,
    scans: Vec<NewScan>,
    newsletters: Vec<Newsletter>,
    recipients: Vec<String>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    fail_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StorageError::Request("writes are disabled".to_string()))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
impl InMemoryStore {
    /// Make every subsequent write fail, to exercise persistence error paths.
    pub(crate) fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub(crate) async fn insert_entitlement(&self, entitlement: Entitlement) -> Entitlement {
        let mut tables = self.tables.write().await;
        tables
            .entitlements
            .insert(entitlement.id.clone(), entitlement.clone());
        entitlement
    }

    pub(crate) async fn entitlement(&self, entitlement_id: &str) -> Option<Entitlement> {
        self.tables
            .read()
            .await
            .entitlements
            .get(entitlement_id)
            .cloned()
    }

    pub(crate) async fn insert_newsletter_row(&self, newsletter: Newsletter) -> Newsletter {
        self.tables
            .write()
            .await
            .newsletters
            .push(newsletter.clone());
        newsletter
    }

    pub(crate) async fn add_recipient(&self, email: impl Into<String>) {
        self.tables.write().await.recipients.push(email.into());
    }

    pub(crate) async fn scans(&self) -> Vec<NewScan> {
        self.tables.read().await.scans.clone()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_scan(&self, scan: NewScan) -> StorageResult<()> {
        self.check_writable()?;
        self.tables.write().await.scans.push(scan);
        Ok(())
    }

    async fn entitlement_for(
        &self,
        user_id: &str,
        product: &str,
    ) -> StorageResult<Option<Entitlement>> {
        Ok(self
            .tables
            .read()
            .await
            .entitlements
            .values()
            .find(|e| e.user_id == user_id && e.product == product)
            .cloned())
    }

    async fn find_entitlement_by_reference(
        &self,
        payment_reference: &str,
    ) -> StorageResult<Option<Entitlement>> {
        Ok(self
            .tables
            .read()
            .await
            .entitlements
            .values()
            .find(|e| e.payment_reference.as_deref() == Some(payment_reference))
            .cloned())
    }

    async fn update_entitlement(
        &self,
        entitlement_id: &str,
        update: EntitlementUpdate,
    ) -> StorageResult<()> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let entitlement = tables
            .entitlements
            .get_mut(entitlement_id)
            .ok_or_else(|| StorageError::NotFound(format!("Entitlement {entitlement_id}")))?;

        entitlement.status = update.status;
        if let Some(activated_at) = update.activated_at {
            entitlement.activated_at = Some(activated_at);
        }
        if let Some(expires_at) = update.expires_at {
            entitlement.expires_at = expires_at;
        }
        if let Some(metadata) = update.metadata {
            entitlement.metadata = Some(metadata);
        }
        Ok(())
    }

    async fn activate_entitlement(&self, activation: EntitlementActivation) -> StorageResult<()> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        let existing = tables
            .entitlements
            .values_mut()
            .find(|e| e.user_id == activation.user_id && e.product == activation.product);

        match existing {
            Some(entitlement) => {
                entitlement.status = EntitlementStatus::Active;
                entitlement.provider = Some(activation.provider);
                entitlement.payment_reference = Some(activation.payment_reference);
                entitlement.activated_at = Some(now);
                entitlement.expires_at = activation.expires_at;
            }
            None => {
                let id = Uuid::new_v4().to_string();
                tables.entitlements.insert(
                    id.clone(),
                    Entitlement {
                        id,
                        user_id: activation.user_id,
                        product: activation.product,
                        status: EntitlementStatus::Active,
                        provider: Some(activation.provider),
                        payment_reference: Some(activation.payment_reference),
                        activated_at: Some(now),
                        expires_at: activation.expires_at,
                        metadata: None,
                    },
                );
            }
        }
        Ok(())
    }

    async fn insert_newsletter(&self, newsletter: NewNewsletter) -> StorageResult<Newsletter> {
        self.check_writable()?;
        let stored = Newsletter {
            id: Uuid::new_v4().to_string(),
            headline: newsletter.headline,
            summary: newsletter.summary,
            insights: newsletter.insights,
            sources: newsletter.sources,
            status: newsletter.status,
            published_at: newsletter.published_at,
            generated_by: Some(newsletter.generated_by),
            email_sent_at: None,
            metadata: Some(newsletter.metadata),
        };
        self.tables.write().await.newsletters.push(stored.clone());
        Ok(stored)
    }

    async fn newsletter_by_id(&self, id: &str) -> StorageResult<Option<Newsletter>> {
        Ok(self
            .tables
            .read()
            .await
            .newsletters
            .iter()
            .find(|n| n.id == id)
            .cloned())
    }

    async fn latest_published_newsletter(&self) -> StorageResult<Option<Newsletter>> {
        Ok(self
            .tables
            .read()
            .await
            .newsletters
            .iter()
            .filter(|n| n.status == NewsletterStatus::Published)
            .max_by_key(|n| n.published_at)
            .cloned())
    }

    async fn published_newsletters(&self) -> StorageResult<Vec<Newsletter>> {
        let mut published: Vec<Newsletter> = self
            .tables
            .read()
            .await
            .newsletters
            .iter()
            .filter(|n| n.status == NewsletterStatus::Published)
            .cloned()
            .collect();
        // None sorts below Some, so reversing keeps undated rows last
        published.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(published)
    }

    async fn mark_newsletter_sent(&self, id: &str) -> StorageResult<()> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let newsletter = tables
            .newsletters
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| StorageError::NotFound(format!("Newsletter {id}")))?;
        newsletter.email_sent_at = Some(Utc::now());
        Ok(())
    }

    async fn newsletter_recipient_emails(&self) -> StorageResult<Vec<String>> {
        Ok(dedup_emails(self.tables.read().await.recipients.clone()))
    }
}
