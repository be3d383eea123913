// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

//! OAuth access-token caching for client-credentials flows.
//!
//! The cache holds a single token and its expiry. A token is considered
//! expired [`EXPIRY_SAFETY_MARGIN`] before the provider says it is, so a
//! request never leaves with a token that dies in flight.
//!
//! The lock is released while a refresh is in progress. Two callers that miss
//! at the same time both refresh; the provider accepts several live tokens, so
//! the only cost is an extra token request.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

/// Subtracted from the provider-reported lifetime.
pub const EXPIRY_SAFETY_MARGIN: Duration = Duration::from_secs(60);

/// Token as returned by a token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
pub struct AccessTokenCache {
    slot: RwLock<Option<CachedToken>>,
}

impl AccessTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached token, or obtain a new one with `refresh`.
    pub async fn get_or_refresh<F, Fut, E>(&self, refresh: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<IssuedToken, E>>,
    {
        if let Some(value) = self.current().await {
            return Ok(value);
        }

        let issued = refresh().await?;
        let lifetime =
            Duration::from_secs(issued.expires_in).saturating_sub(EXPIRY_SAFETY_MARGIN);
        // Lifetimes past the clock's range are served once and never cached
        if let Some(expires_at) = Instant::now().checked_add(lifetime) {
            self.store(issued.access_token.clone(), expires_at).await;
        }
        Ok(issued.access_token)
    }

    /// The cached token if it has not expired.
    pub async fn current(&self) -> Option<String> {
        let slot = self.slot.read().await;
        slot.as_ref()
            .filter(|token| token.expires_at > Instant::now())
            .map(|token| token.value.clone())
    }

    pub async fn clear(&self) {
        *self.slot.write().await = None;
    }

    pub(crate) async fn store(&self, value: String, expires_at: Instant) {
        *self.slot.write().await = Some(CachedToken { value, expires_at });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn counting_refresh(
        calls: &AtomicUsize,
        expires_in: u64,
    ) -> Result<IssuedToken, std::convert::Infallible> {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(IssuedToken {
            access_token: format!("token-{n}"),
            expires_in,
        })
    }

    #[tokio::test]
    async fn empty_cache_refreshes_once() {
        let cache = AccessTokenCache::new();
        let calls = AtomicUsize::new(0);

        let first = cache
            .get_or_refresh(|| counting_refresh(&calls, 3600))
            .await
            .unwrap();
        let second = cache
            .get_or_refresh(|| counting_refresh(&calls, 3600))
            .await
            .unwrap();

        assert_eq!(first, "token-1");
        assert_eq!(second, "token-1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_token_triggers_exactly_one_refresh() {
        let cache = AccessTokenCache::new();
        cache.store("stale".to_string(), Instant::now()).await;
        let calls = AtomicUsize::new(0);

        let token = cache
            .get_or_refresh(|| counting_refresh(&calls, 3600))
            .await
            .unwrap();

        assert_eq!(token, "token-1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn live_token_triggers_no_refresh() {
        let cache = AccessTokenCache::new();
        cache
            .store("fresh".to_string(), Instant::now() + Duration::from_secs(600))
            .await;
        let calls = AtomicUsize::new(0);

        let token = cache
            .get_or_refresh(|| counting_refresh(&calls, 3600))
            .await
            .unwrap();

        assert_eq!(token, "fresh");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn lifetime_inside_safety_margin_is_not_reused() {
        let cache = AccessTokenCache::new();
        let calls = AtomicUsize::new(0);

        cache
            .get_or_refresh(|| counting_refresh(&calls, 30))
            .await
            .unwrap();
        assert!(cache.current().await.is_none());

        cache
            .get_or_refresh(|| counting_refresh(&calls, 30))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unrepresentable_lifetime_returns_token_without_caching() {
        let cache = AccessTokenCache::new();
        let calls = AtomicUsize::new(0);

        let token = cache
            .get_or_refresh(|| counting_refresh(&calls, u64::MAX))
            .await
            .unwrap();
        assert_eq!(token, "token-1");
        assert!(cache.current().await.is_none());

        let token = cache
            .get_or_refresh(|| counting_refresh(&calls, u64::MAX))
            .await
            .unwrap();
        assert_eq!(token, "token-2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn refresh_errors_leave_cache_empty() {
        let cache = AccessTokenCache::new();
        let result: Result<String, &str> = cache.get_or_refresh(|| async { Err("denied") }).await;
        assert_eq!(result, Err("denied"));
        assert!(cache.current().await.is_none());
    }

    #[tokio::test]
    async fn clear_forces_refresh() {
        let cache = AccessTokenCache::new();
        cache
            .store("fresh".to_string(), Instant::now() + Duration::from_secs(600))
            .await;
        cache.clear().await;
        assert!(cache.current().await.is_none());
    }
}
