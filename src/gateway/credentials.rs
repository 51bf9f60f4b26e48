use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::error::Result;

#[derive(Debug, Clone)]
struct CachedCredential {
    token: String,
    expires_at: Instant,
}

/// Process-scoped cache for the gateway bearer credential.
///
/// The slot lives behind an async mutex that is held across the refresh
/// call, so concurrent callers needing a new token share one in-flight
/// refresh and everyone else blocks until it lands. The credential is
/// treated as expired `margin` before its actual expiry to avoid
/// request-time failures.
pub struct CredentialCache {
    slot: Mutex<Option<CachedCredential>>,
    margin: Duration,
}

impl CredentialCache {
    pub fn new(margin: Duration) -> Self {
        Self {
            slot: Mutex::new(None),
            margin,
        }
    }

    /// Returns the cached token, or runs `refresh` (single-flight) to obtain
    /// a new one. `refresh` yields the token and its time-to-live.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(String, Duration)>>,
    {
        let mut slot = self.slot.lock().await;

        if let Some(cached) = slot.as_ref() {
            if Instant::now() + self.margin < cached.expires_at {
                return Ok(cached.token.clone());
            }
        }

        let (token, ttl) = refresh().await?;
        *slot = Some(CachedCredential {
            token: token.clone(),
            expires_at: Instant::now() + ttl,
        });

        Ok(token)
    }

    /// Drops the cached credential, forcing the next caller to refresh.
    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }
}
