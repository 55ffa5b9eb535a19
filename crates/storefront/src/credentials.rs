//! Durable storage for the bearer credential.
//!
//! The credential is the only client state that survives a restart. It is
//! stored under the fixed key `auth_token` in a small JSON document, next to
//! whatever other keys the file already holds.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use bazaar_core::BearerToken;
use thiserror::Error;
use tracing::debug;

/// Key the credential is stored under.
pub const CREDENTIAL_KEY: &str = "auth_token";

#[derive(Debug, Error)]
pub enum CredentialStoreError {
    #[error("credential file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("credential file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where the credential lives between runs.
pub trait CredentialStore: Send + Sync + fmt::Debug {
    /// Read the stored credential. Blank values count as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn load(&self) -> Result<Option<BearerToken>, CredentialStoreError>;

    /// Persist a credential, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn save(&self, token: &BearerToken) -> Result<(), CredentialStoreError>;

    /// Remove the stored credential. Removing an absent credential is fine.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn clear(&self) -> Result<(), CredentialStoreError>;
}

// =============================================================================
// File store
// =============================================================================

/// Stores the credential in a JSON file, e.g. `.bazaar/credentials.json`.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

type Document = BTreeMap<String, serde_json::Value>;

impl FileCredentialStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Document, CredentialStoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(Document::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Document::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_document(&self, document: &Document) -> Result<(), CredentialStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        // Write a sibling file and rename it so a crash never leaves half a token.
        let tmp = self.path.with_extension("json.tmp");
        let contents = serde_json::to_vec_pretty(document)?;
        write_private(&tmp, &contents)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, contents)
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<BearerToken>, CredentialStoreError> {
        let document = self.read_document()?;
        let token = document
            .get(CREDENTIAL_KEY)
            .and_then(serde_json::Value::as_str)
            .map(BearerToken::new)
            .filter(|token| !token.is_blank());
        Ok(token)
    }

    fn save(&self, token: &BearerToken) -> Result<(), CredentialStoreError> {
        let mut document = self.read_document().unwrap_or_default();
        document.insert(
            CREDENTIAL_KEY.to_string(),
            serde_json::Value::String(token.expose().to_string()),
        );
        self.write_document(&document)?;
        debug!(path = %self.path.display(), "credential saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialStoreError> {
        let mut document = self.read_document().unwrap_or_default();
        if document.remove(CREDENTIAL_KEY).is_none() && !self.path.exists() {
            return Ok(());
        }
        self.write_document(&document)?;
        debug!(path = %self.path.display(), "credential cleared");
        Ok(())
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// Keeps the credential in memory only. Used by tests and one-shot tools.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: RwLock<Option<BearerToken>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that starts out holding `token`.
    #[must_use]
    pub fn with_token(token: BearerToken) -> Self {
        Self {
            token: RwLock::new(Some(token)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<BearerToken>, CredentialStoreError> {
        let guard = self.token.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.clone().filter(|token| !token.is_blank()))
    }

    fn save(&self, token: &BearerToken) -> Result<(), CredentialStoreError> {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialStoreError> {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("nested/credentials.json"));

        assert!(store.load().unwrap().is_none());
        store.save(&BearerToken::new("jwt-1")).unwrap();
        assert_eq!(store.load().unwrap(), Some(BearerToken::new("jwt-1")));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_file_store_uses_auth_token_key_and_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, r#"{"theme":"dark"}"#).unwrap();

        let store = FileCredentialStore::new(&path);
        store.save(&BearerToken::new("abc")).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["auth_token"], "abc");
        assert_eq!(raw["theme"], "dark");
    }

    #[test]
    fn test_file_store_blank_token_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, r#"{"auth_token":"  "}"#).unwrap();

        assert!(FileCredentialStore::new(&path).load().unwrap().is_none());
    }

    #[test]
    fn test_file_store_clear_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("none.json"));
        store.clear().unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_store_corrupt_file_errors_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileCredentialStore::new(&path);
        assert!(matches!(store.load(), Err(CredentialStoreError::Json(_))));
        // Saving overwrites the corrupt document.
        store.save(&BearerToken::new("fresh")).unwrap();
        assert_eq!(store.load().unwrap(), Some(BearerToken::new("fresh")));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryCredentialStore::with_token(BearerToken::new("t"));
        assert!(store.load().unwrap().is_some());
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
