//! Token store port
//!
//! Defines the interface for session persistence. The client never
//! caches tokens itself; every dispatch reads the store, so new
//! credentials take effect immediately and a cleared store downgrades
//! the next request to anonymous.

use async_trait::async_trait;
use portico_domain::{Session, SessionKey};

/// Port for persisting session credentials.
///
/// Implementations decide where values live (memory, a file, a
/// keychain). Operations are infallible by contract; an adapter that
/// can fail internally must degrade gracefully and keep reads
/// consistent with the last successful write.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Returns the stored value for `key`, if any.
    async fn get(&self, key: SessionKey) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: SessionKey, value: &str);

    /// Removes the value stored under `key`, if any.
    async fn remove(&self, key: SessionKey);

    /// Loads the full session snapshot.
    ///
    /// The user profile is stored serialized; a value that no longer
    /// parses as JSON reads back as no profile.
    async fn session(&self) -> Session {
        let access_token = self.get(SessionKey::AccessToken).await;
        let refresh_token = self.get(SessionKey::RefreshToken).await;
        let user = match self.get(SessionKey::User).await {
            Some(raw) => serde_json::from_str(&raw).ok(),
            None => None,
        };
        Session {
            access_token,
            refresh_token,
            user,
        }
    }

    /// Persists a session snapshot, removing fields the snapshot
    /// does not carry.
    async fn store_session(&self, session: &Session) {
        match &session.access_token {
            Some(token) => self.set(SessionKey::AccessToken, token).await,
            None => self.remove(SessionKey::AccessToken).await,
        }
        match &session.refresh_token {
            Some(token) => self.set(SessionKey::RefreshToken, token).await,
            None => self.remove(SessionKey::RefreshToken).await,
        }
        match &session.user {
            Some(user) => self.set(SessionKey::User, &user.to_string()).await,
            None => self.remove(SessionKey::User).await,
        }
    }

    /// Removes every session key.
    async fn clear_session(&self) {
        for key in SessionKey::all() {
            self.remove(key).await;
        }
    }
}
