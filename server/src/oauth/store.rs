use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// A request token awaiting its callback, plus the consumer credentials the
/// handshake was started with.
#[derive(Debug, Clone)]
pub struct StoredRequestToken {
    pub token_secret: String,
    pub consumer_key: String,
    pub consumer_secret: String,
}

/// Transient store bridging `/generate` and `/oauth_callback`.
///
/// Each row is written once and consumed by exactly one callback (Twitter
/// assigns the random token key), so a mutex-guarded map suffices. Rows for
/// abandoned handshakes die with the process.
#[derive(Debug, Default)]
pub struct RequestTokenStore {
    tokens: Mutex<HashMap<String, StoredRequestToken>>,
}

impl RequestTokenStore {
    pub fn insert(&self, token_key: String, token: StoredRequestToken) {
        self.lock().insert(token_key, token);
    }

    /// Look up and consume the row for a callback's `oauth_token`.
    pub fn take(&self, token_key: &str) -> Option<StoredRequestToken> {
        self.lock().remove(token_key)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StoredRequestToken>> {
        self.tokens.lock().unwrap_or_else(|e| e.into_inner())
    }
}
