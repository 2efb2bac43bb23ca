//! In-memory session storage.

use std::collections::HashMap;

use async_trait::async_trait;
use portico_application::ports::TokenStore;
use portico_domain::SessionKey;
use tokio::sync::RwLock;

/// Token store that keeps the session in process memory.
///
/// Nothing survives a restart. Useful for tests and for callers that
/// manage persistence themselves.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    values: RwLock<HashMap<SessionKey, String>>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self, key: SessionKey) -> Option<String> {
        self.values.read().await.get(&key).cloned()
    }

    async fn set(&self, key: SessionKey, value: &str) {
        self.values.write().await.insert(key, value.to_string());
    }

    async fn remove(&self, key: SessionKey) {
        self.values.write().await.remove(&key);
    }
}
