//! Authentication — token persistence, session state, token issuance.
//!
//! ## Storage Model
//!
//! The trading-API token and its expiry live in client-local persistent
//! storage under two well-known keys ([`TOKEN_KEY`], [`TOKEN_EXPIRY_KEY`]).
//! Storage is reached only through the [`TokenStore`] trait, so tests inject
//! a [`MemoryTokenStore`] and CLIs use a [`FileTokenStore`].
//!
//! - **Startup**: [`TokenVault::restore`] decides `Connected` / `Idle`,
//!   clearing both keys when the stored expiry has passed.
//! - **Requests**: the HTTP layer reads the token at send time, so a token
//!   saved by one sub-client is visible to every other one.
//! - **Logout**: clears both keys.

#[cfg(feature = "http")]
pub mod client;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::AuthError;

/// Storage key for the bearer token.
pub const TOKEN_KEY: &str = "oauth_token";

/// Storage key for the token expiry (RFC 3339).
pub const TOKEN_EXPIRY_KEY: &str = "oauth_token_expiry";

/// Lifetime assumed when the token service omits `expiresDt`.
pub const DEFAULT_TOKEN_LIFETIME_HOURS: i64 = 24;

// ============================================================================
// Storage
// ============================================================================

/// Key/value persistence for credentials.
pub trait TokenStore: Send + Sync + std::fmt::Debug {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), AuthError>;
    fn remove(&self, key: &str) -> Result<(), AuthError>;
}

/// Process-local store. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AuthError> {
        self.entries
            .lock()
            .map_err(|e| AuthError::Storage(e.to_string()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AuthError> {
        self.entries
            .lock()
            .map_err(|e| AuthError::Storage(e.to_string()))?
            .remove(key);
        Ok(())
    }
}

/// JSON-file store that survives restarts.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileTokenStore {
    /// Open (or lazily create) a store at `path`. An unreadable or corrupt
    /// file starts empty.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = std::fs::read_to_string(&path)
            .ok()
            .and_then(|text| match serde_json::from_str(&text) {
                Ok(map) => Some(map),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring corrupt token file");
                    None
                }
            })
            .unwrap_or_default();
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<(), AuthError> {
        let text =
            serde_json::to_string_pretty(entries).map_err(|e| AuthError::Storage(e.to_string()))?;
        std::fs::write(&self.path, text).map_err(|e| AuthError::Storage(e.to_string()))
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AuthError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), AuthError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

// ============================================================================
// Session state
// ============================================================================

/// Connection state shown by the auth card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Idle,
    Connecting,
    Connected { expires_at: DateTime<Utc> },
    Error(String),
}

impl AuthState {
    pub fn is_connected(&self) -> bool {
        matches!(self, AuthState::Connected { .. })
    }
}

/// Explicit accessor over the two persisted credential keys.
#[derive(Debug, Clone)]
pub struct TokenVault {
    store: Arc<dyn TokenStore>,
}

impl TokenVault {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStore::new()))
    }

    /// Startup check: valid token ⇒ `Connected`, otherwise `Idle`.
    /// An expired or unparseable expiry clears both keys.
    pub fn restore(&self, now: DateTime<Utc>) -> AuthState {
        let token = self.store.get(TOKEN_KEY);
        let expiry = self.store.get(TOKEN_EXPIRY_KEY);

        match (token, expiry) {
            (Some(_), Some(expiry)) => match DateTime::parse_from_rfc3339(&expiry) {
                Ok(expires_at) if expires_at.with_timezone(&Utc) > now => AuthState::Connected {
                    expires_at: expires_at.with_timezone(&Utc),
                },
                _ => {
                    tracing::info!("Stored token expired, clearing");
                    self.clear_quietly();
                    AuthState::Idle
                }
            },
            _ => AuthState::Idle,
        }
    }

    pub fn save(&self, token: &str, expires_at: DateTime<Utc>) -> Result<(), AuthError> {
        self.store.set(TOKEN_KEY, token)?;
        self.store.set(TOKEN_EXPIRY_KEY, &expires_at.to_rfc3339())
    }

    pub fn clear(&self) -> Result<(), AuthError> {
        self.store.remove(TOKEN_KEY)?;
        self.store.remove(TOKEN_EXPIRY_KEY)
    }

    /// Stored expiry, if any.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.store
            .get(TOKEN_EXPIRY_KEY)
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|d| d.with_timezone(&Utc))
    }

    /// Token to attach to a request. An expired token is cleared and not sent.
    pub(crate) fn bearer(&self, now: DateTime<Utc>) -> Option<String> {
        let token = self.store.get(TOKEN_KEY)?;
        match self.expires_at() {
            Some(expires_at) if expires_at <= now => {
                tracing::info!("Token expired before request, clearing");
                self.clear_quietly();
                None
            }
            _ => Some(token),
        }
    }

    fn clear_quietly(&self) {
        if let Err(e) = self.clear() {
            tracing::warn!(error = %e, "Failed to clear stored token");
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

/// Response from `POST /api/v1/oauth/token` and `GET /api/v1/oauth/token/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub expires_dt: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Resolve the token service's `expiresDt`.
///
/// Accepts RFC 3339 or the trading API's `YYYYMMDDHHMMSS` (local time).
/// Anything else falls back to `now + 24h`.
pub fn parse_expires_dt(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    let fallback = now + chrono::Duration::hours(DEFAULT_TOKEN_LIFETIME_HOURS);
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return fallback;
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y%m%d%H%M%S") {
        if let Some(local) = Local.from_local_datetime(&naive).single() {
            return local.with_timezone(&Utc);
        }
    }

    tracing::warn!(expires_dt = raw, "Unrecognized token expiry, assuming 24h");
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_restore_without_token_is_idle() {
        let vault = TokenVault::in_memory();
        assert_eq!(vault.restore(now()), AuthState::Idle);
    }

    #[test]
    fn test_restore_valid_token_is_connected() {
        let vault = TokenVault::in_memory();
        let expires_at = now() + Duration::hours(3);
        vault.save("tok", expires_at).unwrap();
        assert_eq!(vault.restore(now()), AuthState::Connected { expires_at });
        assert_eq!(vault.bearer(now()).as_deref(), Some("tok"));
    }

    #[test]
    fn test_restore_expired_token_clears_both_keys() {
        let store = Arc::new(MemoryTokenStore::new());
        let vault = TokenVault::new(store.clone());
        vault.save("tok", now() - Duration::minutes(1)).unwrap();
        assert_eq!(vault.restore(now()), AuthState::Idle);
        assert!(store.get(TOKEN_KEY).is_none());
        assert!(store.get(TOKEN_EXPIRY_KEY).is_none());
    }

    #[test]
    fn test_bearer_skips_expired_token() {
        let vault = TokenVault::in_memory();
        vault.save("tok", now()).unwrap();
        assert_eq!(vault.bearer(now()), None);
        assert_eq!(vault.expires_at(), None);
    }

    #[test]
    fn test_file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let expires_at = now() + Duration::hours(1);
        {
            let vault = TokenVault::new(Arc::new(FileTokenStore::open(&path)));
            vault.save("persisted", expires_at).unwrap();
        }
        let reopened = TokenVault::new(Arc::new(FileTokenStore::open(&path)));
        assert_eq!(reopened.restore(now()), AuthState::Connected { expires_at });

        reopened.clear().unwrap();
        let again = FileTokenStore::open(&path);
        assert!(again.get(TOKEN_KEY).is_none());
    }

    #[test]
    fn test_file_store_ignores_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = FileTokenStore::open(&path);
        assert!(store.get(TOKEN_KEY).is_none());
    }

    #[test]
    fn test_parse_expires_dt_formats() {
        let rfc = parse_expires_dt(Some("2024-03-02T09:00:00Z"), now());
        assert_eq!(rfc, Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap());

        let local = parse_expires_dt(Some("20240302090000"), now());
        let expected = Local
            .with_ymd_and_hms(2024, 3, 2, 9, 0, 0)
            .single()
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(local, expected);

        assert_eq!(parse_expires_dt(None, now()), now() + Duration::hours(24));
        assert_eq!(parse_expires_dt(Some("soon"), now()), now() + Duration::hours(24));
    }
}
