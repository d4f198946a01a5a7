use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::jwk::{Jwk, JwkSet};
use tracing::debug;

use super::AuthError;
use crate::clock::Clock;

/// Source of the identity provider's published signing keys.
#[async_trait]
pub trait KeySetFetcher: Send + Sync {
    async fn fetch(&self) -> Result<JwkSet, AuthError>;
}

pub struct HttpKeySetFetcher {
    client: reqwest::Client,
    url: String,
}

impl HttpKeySetFetcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl KeySetFetcher for HttpKeySetFetcher {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        let unavailable = |err: reqwest::Error| AuthError::KeySetUnavailable(err.to_string());
        self.client
            .get(&self.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(unavailable)?
            .json::<JwkSet>()
            .await
            .map_err(unavailable)
    }
}

struct KeySetSnapshot {
    keys: JwkSet,
    fetched_at: DateTime<Utc>,
}

/// Read-through cache of signing keys with a fixed lifetime.
///
/// Readers share an immutable snapshot; at most one refresh runs at a time.
pub struct KeySetCache {
    fetcher: Arc<dyn KeySetFetcher>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    snapshot: RwLock<Option<Arc<KeySetSnapshot>>>,
    refresh: tokio::sync::Mutex<()>,
}

impl KeySetCache {
    pub fn new(fetcher: Arc<dyn KeySetFetcher>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            fetcher,
            clock,
            ttl,
            snapshot: RwLock::new(None),
            refresh: tokio::sync::Mutex::new(()),
        }
    }

    pub async fn key(&self, kid: &str) -> Result<Jwk, AuthError> {
        let snapshot = self.snapshot().await?;
        snapshot
            .keys
            .find(kid)
            .cloned()
            .ok_or_else(|| AuthError::UnknownKey(kid.to_string()))
    }

    fn fresh(&self) -> Option<Arc<KeySetSnapshot>> {
        let guard = self.snapshot.read().expect("key set lock poisoned");
        guard
            .as_ref()
            .filter(|snapshot| self.clock.now() - snapshot.fetched_at < self.ttl)
            .cloned()
    }

    async fn snapshot(&self) -> Result<Arc<KeySetSnapshot>, AuthError> {
        if let Some(snapshot) = self.fresh() {
            return Ok(snapshot);
        }

        let _refresh = self.refresh.lock().await;
        // another task may have refreshed while this one waited
        if let Some(snapshot) = self.fresh() {
            return Ok(snapshot);
        }

        let keys = self.fetcher.fetch().await?;
        let snapshot = Arc::new(KeySetSnapshot {
            keys,
            fetched_at: self.clock.now(),
        });
        debug!(keys = snapshot.keys.keys.len(), "signing key set refreshed");
        *self.snapshot.write().expect("key set lock poisoned") = Some(snapshot.clone());
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const JWKS: &str = include_str!("../../tests/fixtures/jwks.json");

    #[derive(Default)]
    struct CountingFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl KeySetFetcher for CountingFetcher {
        async fn fetch(&self) -> Result<JwkSet, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            serde_json::from_str(JWKS).map_err(|err| AuthError::KeySetUnavailable(err.to_string()))
        }
    }

    struct FailingFetcher;

    #[async_trait]
    impl KeySetFetcher for FailingFetcher {
        async fn fetch(&self) -> Result<JwkSet, AuthError> {
            Err(AuthError::KeySetUnavailable("connection refused".to_string()))
        }
    }

    fn cache(fetcher: Arc<dyn KeySetFetcher>) -> (KeySetCache, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap(),
        ));
        let cache = KeySetCache::new(fetcher, clock.clone(), Duration::hours(24));
        (cache, clock)
    }

    #[tokio::test]
    async fn keys_are_fetched_once_per_lifetime() {
        let fetcher = Arc::new(CountingFetcher::default());
        let (cache, clock) = cache(fetcher.clone());

        cache.key("hub-test-key").await.expect("key present");
        cache.key("hub-test-key").await.expect("key cached");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::hours(24));
        cache.key("hub-test-key").await.expect("key refreshed");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_misses_share_one_refresh() {
        let fetcher = Arc::new(CountingFetcher::default());
        let (cache, _) = cache(fetcher.clone());

        let (first, second, third) = tokio::join!(
            cache.key("hub-test-key"),
            cache.key("hub-test-key"),
            cache.key("hub-test-key"),
        );
        assert!(first.is_ok() && second.is_ok() && third.is_ok());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_key_ids_are_reported() {
        let (cache, _) = cache(Arc::new(CountingFetcher::default()));
        match cache.key("rotated-away").await {
            Err(AuthError::UnknownKey(kid)) => assert_eq!(kid, "rotated-away"),
            other => panic!("expected unknown key, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_failures_surface_as_unavailable() {
        let (cache, _) = cache(Arc::new(FailingFetcher));
        match cache.key("hub-test-key").await {
            Err(AuthError::KeySetUnavailable(_)) => {}
            other => panic!("expected unavailable key set, got {other:?}"),
        }
    }
}
