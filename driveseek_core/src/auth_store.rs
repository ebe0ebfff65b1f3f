//! Persistence for per-account token caches.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::oauth::OAuthTokens;

/// Refresh this many seconds before the advertised expiry.
const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("persist error: {0}")]
    Persist(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix seconds; `None` means the token's lifetime is unknown and it is
    /// treated as already expired.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl CachedTokens {
    pub fn from_grant(tokens: &OAuthTokens) -> Self {
        let expires_at = tokens
            .expires_in
            .map(|secs| Utc::now().timestamp() + secs - EXPIRY_SKEW_SECS);
        Self {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            expires_at,
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.expires_at
            .map(|at| at > Utc::now().timestamp())
            .unwrap_or(false)
    }
}

pub trait TokenStore: Send + Sync {
    fn load(&self, account_id: &str) -> Option<CachedTokens>;
    fn save(&self, account_id: &str, tokens: &CachedTokens) -> Result<(), StoreError>;
}

/// A simple in-memory store, mainly for testing.
pub struct MemoryTokenStore {
    map: std::sync::Mutex<HashMap<String, CachedTokens>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self {
            map: std::sync::Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self, account_id: &str) -> Option<CachedTokens> {
        self.map.lock().ok()?.get(account_id).cloned()
    }

    fn save(&self, account_id: &str, tokens: &CachedTokens) -> Result<(), StoreError> {
        self.map
            .lock()
            .map_err(|e| StoreError::Persist(format!("lock poisoned: {}", e)))?
            .insert(account_id.to_string(), tokens.clone());
        Ok(())
    }
}

/// A file-backed JSON store at `~/.config/driveseek/tokens.json` (Unix) or
/// the platform config dir elsewhere.
pub struct FileTokenStore {
    path: std::path::PathBuf,
}

impl FileTokenStore {
    pub fn new_default() -> Self {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|p| p.join(".config")))
            .unwrap_or_else(|| std::path::PathBuf::from("."));
        let dir = base.join("driveseek");
        let path = dir.join("tokens.json");
        std::fs::create_dir_all(&dir).ok();
        Self { path }
    }

    pub fn with_path(path: std::path::PathBuf) -> Self {
        Self { path }
    }

    fn read_map(&self) -> HashMap<String, CachedTokens> {
        match std::fs::read_to_string(&self.path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_default(),
            Err(_) => HashMap::new(),
        }
    }

    fn write_map(&self, map: &HashMap<String, CachedTokens>) -> Result<(), StoreError> {
        let s = serde_json::to_string_pretty(map)
            .map_err(|e| StoreError::Persist(format!("serde: {}", e)))?;
        std::fs::write(&self.path, &s).map_err(|e| StoreError::Persist(e.to_string()))?;

        // Set restrictive permissions on Unix (owner read/write only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms)
                .map_err(|e| StoreError::Persist(format!("chmod: {}", e)))?;
        }

        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self, account_id: &str) -> Option<CachedTokens> {
        self.read_map().get(account_id).cloned()
    }

    fn save(&self, account_id: &str, tokens: &CachedTokens) -> Result<(), StoreError> {
        let mut map = self.read_map();
        map.insert(account_id.to_string(), tokens.clone());
        self.write_map(&map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(expires_at: Option<i64>) -> CachedTokens {
        CachedTokens {
            access_token: "at".into(),
            refresh_token: Some("rt".into()),
            expires_at,
        }
    }

    #[test]
    fn freshness_tracks_expiry() {
        let now = Utc::now().timestamp();
        assert!(sample(Some(now + 600)).is_fresh());
        assert!(!sample(Some(now - 1)).is_fresh());
        assert!(!sample(None).is_fresh());
    }

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryTokenStore::new();
        assert!(store.load("alice").is_none());
        store.save("alice", &sample(Some(0))).unwrap();
        assert_eq!(store.load("alice").unwrap().access_token, "at");
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::with_path(dir.path().join("tokens.json"));
        assert!(store.load("bob").is_none());
        store.save("bob", &sample(Some(123))).unwrap();
        let loaded = store.load("bob").unwrap();
        assert_eq!(loaded.refresh_token.as_deref(), Some("rt"));
        assert_eq!(loaded.expires_at, Some(123));
    }
}
