//! Session credential and its client-local persistence.
//!
//! The credential is the only value this layer persists. It is written at
//! sign-in, read at restore and deleted at sign-out, all by the session
//! store. Reads and writes are synchronous so that the only suspension
//! points in the session lifecycle are remote calls.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

/// Key under which the credential is kept in the key/value store.
pub const CREDENTIAL_KEY: &str = "token";

/// Opaque bearer token proving authentication to the remote gateway.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct Credential(SecretString);

impl Credential {
    /// Wrap a raw token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// The raw token, for attaching to outgoing requests.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for Credential {}

/// Errors from the credential store.
#[derive(Debug, Error)]
pub enum CredentialStoreError {
    /// Reading or writing the backing file failed.
    #[error("credential store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The backing file is not a JSON object.
    #[error("credential store at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Client-local persistence for the session credential.
pub trait CredentialStore: Send + Sync {
    /// Read the persisted credential, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn load(&self) -> Result<Option<Credential>, CredentialStoreError>;

    /// Persist `credential`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn save(&self, credential: &Credential) -> Result<(), CredentialStoreError>;

    /// Delete the persisted credential. Succeeds if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn clear(&self) -> Result<(), CredentialStoreError>;
}

// =============================================================================
// In-memory store
// =============================================================================

/// Credential store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<Credential>>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `credential`.
    #[must_use]
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            slot: Mutex::new(Some(credential)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<Credential>, CredentialStoreError> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, credential: &Credential) -> Result<(), CredentialStoreError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialStoreError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

// =============================================================================
// File-backed store
// =============================================================================

/// Credential store backed by a JSON object file.
///
/// Only the `token` key is owned by this store; any other keys in the file
/// are preserved across writes. Writes go to a uniquely named sibling temp
/// file, created owner-only, which is then persisted over the original.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCredentialStore {
    /// Create a store backed by `path`. The file is created on first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<Map<String, Value>, CredentialStoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(CredentialStoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }

        serde_json::from_slice(&bytes).map_err(|source| CredentialStoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<(), CredentialStoreError> {
        let io_err = |source| CredentialStoreError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(io_err)?;

        let body = serde_json::to_vec_pretty(map).map_err(|source| {
            CredentialStoreError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;

        // Owner-only and uniquely named per writer.
        let mut temp = NamedTempFile::new_in(dir).map_err(io_err)?;
        temp.write_all(&body).map_err(io_err)?;
        temp.as_file().sync_all().map_err(io_err)?;
        temp.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Credential>, CredentialStoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let map = self.read_map()?;
        Ok(map
            .get(CREDENTIAL_KEY)
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(Credential::new))
    }

    fn save(&self, credential: &Credential) -> Result<(), CredentialStoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = match self.read_map() {
            Ok(map) => map,
            Err(CredentialStoreError::Corrupt { .. }) => Map::new(),
            Err(e) => return Err(e),
        };
        map.insert(
            CREDENTIAL_KEY.to_string(),
            Value::String(credential.expose().to_string()),
        );
        self.write_map(&map)?;
        debug!(path = %self.path.display(), "Credential persisted");
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialStoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut map, corrupt) = match self.read_map() {
            Ok(map) => (map, false),
            // A corrupt file cannot hold a usable credential; replace it.
            Err(CredentialStoreError::Corrupt { .. }) => (Map::new(), true),
            Err(e) => return Err(e),
        };
        if map.remove(CREDENTIAL_KEY).is_none() && !corrupt {
            return Ok(());
        }
        self.write_map(&map)?;
        debug!(path = %self.path.display(), "Credential removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("super-secret-token");
        let debug = format!("{credential:?}");
        assert!(!debug.contains("super-secret-token"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.load().expect("load"), None);

        store.save(&Credential::new("abc")).expect("save");
        assert_eq!(store.load().expect("load"), Some(Credential::new("abc")));

        store.clear().expect("clear");
        store.clear().expect("clear twice");
        assert_eq!(store.load().expect("load"), None);
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileCredentialStore::new(dir.path().join("nested").join("creds.json"));
        assert_eq!(store.load().expect("load"), None);
        store.clear().expect("clear on missing file");
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_store_preserves_other_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("creds.json");
        fs::write(&path, r#"{"theme":"dark","token":"old"}"#).expect("seed");

        let store = FileCredentialStore::new(&path);
        assert_eq!(store.load().expect("load"), Some(Credential::new("old")));

        store.save(&Credential::new("new")).expect("save");
        store.clear().expect("clear");

        let map: Map<String, Value> =
            serde_json::from_slice(&fs::read(&path).expect("read")).expect("json");
        assert_eq!(map.get("theme"), Some(&Value::String("dark".into())));
        assert!(!map.contains_key(CREDENTIAL_KEY));
        assert_eq!(store.load().expect("load"), None);
    }

    #[test]
    fn test_file_store_corrupt_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("creds.json");
        fs::write(&path, "not json").expect("seed");

        let store = FileCredentialStore::new(&path);
        assert!(matches!(
            store.load(),
            Err(CredentialStoreError::Corrupt { .. })
        ));

        store.clear().expect("clear replaces corrupt file");
        assert_eq!(store.load().expect("load"), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileCredentialStore::new(dir.path().join("creds.json"));
        store.save(&Credential::new("abc")).expect("save");

        let mode = fs::metadata(store.path()).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_tightens_existing_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("creds.json");
        fs::write(&path, r#"{"theme":"dark"}"#).expect("seed");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).expect("chmod");

        let store = FileCredentialStore::new(&path);
        store.save(&Credential::new("abc")).expect("save");

        let mode = fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_file_store_leaves_no_temp_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileCredentialStore::new(dir.path().join("creds.json"));
        store.save(&Credential::new("abc")).expect("save");
        store.save(&Credential::new("def")).expect("save again");
        store.clear().expect("clear");

        let names: Vec<_> = fs::read_dir(dir.path())
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("creds.json")]);
    }

    #[test]
    fn test_concurrent_stores_share_one_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("creds.json");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let path = path.clone();
                std::thread::spawn(move || {
                    FileCredentialStore::new(path)
                        .save(&Credential::new(format!("token-{i}")))
                        .expect("save");
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("writer");
        }

        let loaded = FileCredentialStore::new(&path)
            .load()
            .expect("load")
            .expect("some writer won");
        assert!(loaded.expose().starts_with("token-"));
    }
}
