use crate::payments::error::PaymentResult;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// A token is treated as stale once less than this remains before expiry.
pub const REFRESH_MARGIN: Duration = Duration::from_secs(30);

/// TTL assumed when the provider does not report one.
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// Bearer token with an absolute expiry.
#[derive(Debug, Clone)]
pub struct BearerToken {
    pub token: String,
    pub expires_at: Instant,
}

impl BearerToken {
    pub fn from_ttl(token: String, ttl_secs: u64) -> Self {
        Self {
            token,
            expires_at: Instant::now() + Duration::from_secs(ttl_secs),
        }
    }

    fn is_fresh(&self) -> bool {
        self.expires_at.saturating_duration_since(Instant::now()) > REFRESH_MARGIN
    }
}

/// Cached bearer token owned by a single gateway instance.
///
/// The slot starts empty and is populated lazily on first use. The mutex is
/// held across the refresh call so two concurrent payouts observing a stale
/// token trigger exactly one re-authentication.
#[derive(Debug)]
pub struct TokenCache {
    slot: Mutex<Option<BearerToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Return a fresh bearer token, invoking `refresh` only when the cached
    /// token is absent or within the staleness margin.
    pub async fn bearer<F, Fut>(&self, refresh: F) -> PaymentResult<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = PaymentResult<BearerToken>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(token) = slot.as_ref() {
            if token.is_fresh() {
                return Ok(token.token.clone());
            }
            debug!("cached bearer token is stale, re-authenticating");
        }

        let token = refresh().await?;
        let value = token.token.clone();
        *slot = Some(token);
        Ok(value)
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::error::PaymentError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn counting_refresh(
        counter: Arc<AtomicU32>,
        ttl_secs: u64,
    ) -> impl FnOnce() -> std::pin::Pin<Box<dyn Future<Output = PaymentResult<BearerToken>> + Send>>
    {
        move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Box::pin(async move { Ok(BearerToken::from_ttl(format!("tok-{}", n), ttl_secs)) })
        }
    }

    #[tokio::test]
    async fn second_call_reuses_cached_token() {
        let cache = TokenCache::new();
        let calls = Arc::new(AtomicU32::new(0));

        let first = cache
            .bearer(counting_refresh(calls.clone(), 3600))
            .await
            .unwrap();
        let second = cache
            .bearer(counting_refresh(calls.clone(), 3600))
            .await
            .unwrap();

        assert_eq!(first, "tok-1");
        assert_eq!(second, "tok-1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_token_triggers_exactly_one_refresh() {
        let cache = TokenCache::new();
        let calls = Arc::new(AtomicU32::new(0));

        // TTL below the 30s margin: fresh now, stale for the next call.
        cache
            .bearer(counting_refresh(calls.clone(), 10))
            .await
            .unwrap();
        let renewed = cache
            .bearer(counting_refresh(calls.clone(), 3600))
            .await
            .unwrap();

        assert_eq!(renewed, "tok-2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // Now fresh again; no further refresh.
        cache
            .bearer(counting_refresh(calls.clone(), 3600))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_refresh_leaves_slot_empty() {
        let cache = TokenCache::new();

        let result = cache
            .bearer(|| async {
                Err(PaymentError::Authentication {
                    provider: "wonyapay".to_string(),
                    message: "invalid credentials".to_string(),
                })
            })
            .await;
        assert!(matches!(
            result,
            Err(PaymentError::Authentication { .. })
        ));

        // A later successful refresh still works.
        let calls = Arc::new(AtomicU32::new(0));
        let token = cache
            .bearer(counting_refresh(calls.clone(), 3600))
            .await
            .unwrap();
        assert_eq!(token, "tok-1");
    }

    #[tokio::test]
    async fn concurrent_calls_refresh_once() {
        let cache = Arc::new(TokenCache::new());
        let calls = Arc::new(AtomicU32::new(0));

        let a = {
            let cache = cache.clone();
            let calls = calls.clone();
            tokio::spawn(async move { cache.bearer(counting_refresh(calls, 3600)).await })
        };
        let b = {
            let cache = cache.clone();
            let calls = calls.clone();
            tokio::spawn(async move { cache.bearer(counting_refresh(calls, 3600)).await })
        };

        let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());
        assert_eq!(a, b);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
