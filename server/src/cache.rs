//! Fixed-TTL memoization of rendered responses.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// A rendered response body plus the content type it was rendered with.
#[derive(Debug, Clone)]
pub struct RenderedFeed {
    pub content_type: &'static str,
    pub body: String,
}

struct CacheEntry {
    feed: RenderedFeed,
    expires_at: Instant,
}

/// Process-wide response cache. The key must incorporate every input that
/// affects output (credentials, list identifier, retweets flag, format); an
/// under-specified key would hand one user's cached feed to another.
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached response for `key` if it is still fresh. Expired
    /// entries are pruned lazily here rather than by a sweeper task.
    pub fn get(&self, key: &str) -> Option<RenderedFeed> {
        let mut entries = self.lock();
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);
        entries.get(key).map(|entry| {
            debug!("response cache hit");
            entry.feed.clone()
        })
    }

    pub fn insert(&self, key: String, feed: RenderedFeed) {
        let expires_at = Instant::now() + self.ttl;
        self.lock().insert(key, CacheEntry { feed, expires_at });
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(body: &str) -> RenderedFeed {
        RenderedFeed {
            content_type: "application/atom+xml",
            body: body.to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn entries_live_for_the_ttl_window() {
        let cache = ResponseCache::new(Duration::from_secs(900));
        cache.insert("key".to_string(), feed("body"));

        tokio::time::advance(Duration::from_secs(899)).await;
        assert_eq!(cache.get("key").map(|f| f.body), Some("body".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_the_ttl_window() {
        let cache = ResponseCache::new(Duration::from_secs(900));
        cache.insert("key".to_string(), feed("body"));

        tokio::time::advance(Duration::from_secs(901)).await;
        assert!(cache.get("key").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn keys_do_not_collide() {
        let cache = ResponseCache::new(Duration::from_secs(900));
        cache.insert("alice".to_string(), feed("alice's feed"));
        cache.insert("bob".to_string(), feed("bob's feed"));

        assert_eq!(
            cache.get("alice").map(|f| f.body),
            Some("alice's feed".to_string())
        );
        assert_eq!(
            cache.get("bob").map(|f| f.body),
            Some("bob's feed".to_string())
        );
        assert!(cache.get("carol").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn reinsertion_refreshes_the_window() {
        let cache = ResponseCache::new(Duration::from_secs(900));
        cache.insert("key".to_string(), feed("stale"));

        tokio::time::advance(Duration::from_secs(600)).await;
        cache.insert("key".to_string(), feed("fresh"));

        tokio::time::advance(Duration::from_secs(600)).await;
        assert_eq!(cache.get("key").map(|f| f.body), Some("fresh".to_string()));
    }
}
