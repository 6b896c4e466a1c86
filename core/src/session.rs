//! Bearer-token storage.
//!
//! The token is the only client-side state that outlives a call: written on
//! login, cleared on logout, read by every `build_*`. Mobile shells keep it in
//! platform key-value storage under a fixed key; `FileTokenStore` reproduces
//! that as a small JSON object on disk.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde_json::{Map, Value};

use crate::error::ApiError;

/// Key under which the bearer token is persisted.
pub const TOKEN_KEY: &str = "userToken";

/// Storage backend for the session's bearer token.
pub trait TokenStore: Send + Sync {
    /// The stored token, or `None` when logged out.
    fn load(&self) -> Result<Option<String>, ApiError>;

    /// Store `token`, replacing any previous one.
    fn save(&self, token: &str) -> Result<(), ApiError>;

    /// Remove the stored token. Succeeds when nothing was stored.
    fn clear(&self) -> Result<(), ApiError>;

    fn is_authenticated(&self) -> Result<bool, ApiError> {
        Ok(self.load()?.is_some())
    }
}

/// Process-local token store. Lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, ApiError> {
        let guard = self.token.read().map_err(|e| ApiError::Storage(e.to_string()))?;
        Ok(guard.clone())
    }

    fn save(&self, token: &str) -> Result<(), ApiError> {
        let mut guard = self.token.write().map_err(|e| ApiError::Storage(e.to_string()))?;
        *guard = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), ApiError> {
        let mut guard = self.token.write().map_err(|e| ApiError::Storage(e.to_string()))?;
        *guard = None;
        Ok(())
    }
}

/// Key-value JSON file holding the token under [`TOKEN_KEY`].
///
/// Other keys in the file are preserved, so the file can be shared with
/// unrelated settings the way platform key-value stores are.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<Map<String, Value>, ApiError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(Map::new()),
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| ApiError::Storage(format!("{}: {e}", self.path.display()))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(ApiError::Storage(format!("{}: {e}", self.path.display()))),
        }
    }

    fn write_entries(&self, entries: &Map<String, Value>) -> Result<(), ApiError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| ApiError::Storage(e.to_string()))?;
            }
        }
        let raw = serde_json::to_string_pretty(entries).map_err(|e| ApiError::Storage(e.to_string()))?;
        fs::write(&self.path, raw)
            .map_err(|e| ApiError::Storage(format!("{}: {e}", self.path.display())))?;
        restrict_permissions(&self.path)
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, ApiError> {
        match self.read_entries()?.remove(TOKEN_KEY) {
            Some(Value::String(token)) => Ok(Some(token)),
            Some(Value::Null) | None => Ok(None),
            Some(other) => Err(ApiError::Storage(format!(
                "{}: {TOKEN_KEY} is not a string: {other}",
                self.path.display()
            ))),
        }
    }

    fn save(&self, token: &str) -> Result<(), ApiError> {
        let mut entries = self.read_entries()?;
        entries.insert(TOKEN_KEY.to_string(), Value::String(token.to_string()));
        self.write_entries(&entries)
    }

    fn clear(&self) -> Result<(), ApiError> {
        let mut entries = self.read_entries()?;
        if entries.remove(TOKEN_KEY).is_none() {
            return Ok(());
        }
        self.write_entries(&entries)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), ApiError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .map_err(|e| ApiError::Storage(e.to_string()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), ApiError> {
    Ok(())
}
