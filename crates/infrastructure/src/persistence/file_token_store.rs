//! File-backed session storage.
//!
//! The session lives in a single JSON file, by default under the
//! user's configuration directory. Values are cached in memory, so
//! reads never touch the disk after startup. Writes persist
//! best-effort: a read-only disk degrades durability, not client
//! behavior.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use portico_application::ports::TokenStore;
use portico_domain::SessionKey;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::warn;

/// On-disk shape of the session file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<String>,
}

impl StoredSession {
    const fn field(&self, key: SessionKey) -> &Option<String> {
        match key {
            SessionKey::AccessToken => &self.access_token,
            SessionKey::RefreshToken => &self.refresh_token,
            SessionKey::User => &self.user,
        }
    }

    const fn field_mut(&mut self, key: SessionKey) -> &mut Option<String> {
        match key {
            SessionKey::AccessToken => &mut self.access_token,
            SessionKey::RefreshToken => &mut self.refresh_token,
            SessionKey::User => &mut self.user,
        }
    }
}

/// Token store persisted to a JSON file.
///
/// The lock is held across the disk write so concurrent updates
/// cannot interleave a stale snapshot over a newer one.
pub struct FileTokenStore {
    path: PathBuf,
    cache: Mutex<StoredSession>,
}

impl FileTokenStore {
    /// Opens the store, loading any previously saved session.
    ///
    /// A missing file starts an empty session. A file that cannot be
    /// read or parsed is logged and treated as empty.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cache = Mutex::new(Self::load(&path).await);
        Self { path, cache }
    }

    /// The default session file location.
    ///
    /// Resolves to `<config dir>/portico/session.json`, or `None` when
    /// the platform has no configuration directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("portico").join("session.json"))
    }

    /// The file this store persists to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(path: &Path) -> StoredSession {
        match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                warn!(path = %path.display(), %err, "session file is corrupt, starting empty");
                StoredSession::default()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoredSession::default(),
            Err(err) => {
                warn!(path = %path.display(), %err, "could not read session file, starting empty");
                StoredSession::default()
            }
        }
    }

    async fn persist(&self, snapshot: &StoredSession) {
        if let Some(parent) = self.path.parent() {
            if let Err(err) = tokio::fs::create_dir_all(parent).await {
                warn!(path = %parent.display(), %err, "could not create session directory");
                return;
            }
        }

        match serde_json::to_vec_pretty(snapshot) {
            Ok(bytes) => {
                if let Err(err) = tokio::fs::write(&self.path, bytes).await {
                    warn!(path = %self.path.display(), %err, "could not write session file");
                }
            }
            Err(err) => warn!(%err, "could not serialize session"),
        }
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self, key: SessionKey) -> Option<String> {
        self.cache.lock().await.field(key).clone()
    }

    async fn set(&self, key: SessionKey, value: &str) {
        let mut cache = self.cache.lock().await;
        *cache.field_mut(key) = Some(value.to_string());
        let snapshot = cache.clone();
        self.persist(&snapshot).await;
    }

    async fn remove(&self, key: SessionKey) {
        let mut cache = self.cache.lock().await;
        if cache.field_mut(key).take().is_some() {
            let snapshot = cache.clone();
            self.persist(&snapshot).await;
        }
    }
}
