//! Client-side storage for the access and refresh tokens.
//!
//! Reads and writes never fail loudly: a read that cannot be satisfied
//! returns `None` and a write that cannot be persisted is logged. Callers
//! treat a missing token the same way whether it was never stored or the
//! storage is gone. Clearing is the exception, a token left behind is
//! reported to the caller.

use std::{
    collections::BTreeMap,
    fmt::Debug,
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use serde::{Deserialize, Serialize};

use crate::Error;

/// Which of the two tokens to read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenKind {
    /// The short-lived bearer credential.
    Access,
    /// The long-lived credential used to obtain new access tokens.
    Refresh,
}

impl TokenKind {
    /// The fixed key the token is stored under.
    pub fn key(self) -> &'static str {
        match self {
            TokenKind::Access => "accessToken",
            TokenKind::Refresh => "refreshToken",
        }
    }
}

/// An access and refresh token issued together by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// The bearer token for authenticated requests.
    #[serde(rename = "access")]
    pub access_token: String,
    /// The token used to refresh `access_token`.
    #[serde(rename = "refresh")]
    pub refresh_token: String,
}

/// Storage for the token pair.
///
/// Implementations must be safe to share between clones of the API client
/// and the session controller. Concurrent writers overwrite each other, the
/// last write wins.
pub trait TokenStore: Debug + Send + Sync {
    /// Get the stored token of `kind`, if there is one.
    fn get(&self, kind: TokenKind) -> Option<String>;

    /// Store `value` as the token of `kind`.
    fn set(&self, kind: TokenKind, value: &str);

    /// Remove both tokens.
    ///
    /// # Errors
    ///
    /// Returns [Error::Io] if the tokens could not be removed from storage.
    fn clear(&self) -> Result<(), Error>;

    /// Store both tokens of `pair`.
    fn set_pair(&self, pair: &TokenPair) {
        self.set(TokenKind::Access, &pair.access_token);
        self.set(TokenKind::Refresh, &pair.refresh_token);
    }
}

/// Keeps tokens in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<BTreeMap<TokenKind, String>>,
}

impl MemoryTokenStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, kind: TokenKind) -> Option<String> {
        match self.tokens.lock() {
            Ok(tokens) => tokens.get(&kind).cloned(),
            Err(_) => {
                tracing::warn!("token store lock is poisoned, treating {} as missing", kind.key());
                None
            }
        }
    }

    fn set(&self, kind: TokenKind, value: &str) {
        match self.tokens.lock() {
            Ok(mut tokens) => {
                tokens.insert(kind, value.to_owned());
            }
            Err(_) => tracing::warn!("token store lock is poisoned, dropped {}", kind.key()),
        }
    }

    fn clear(&self) -> Result<(), Error> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}

/// Keeps tokens in a JSON file, e.g. `{"accessToken": "...", "refreshToken": "..."}`.
///
/// The file is created on the first write, together with any missing parent
/// directories. On unix it is only readable by the owner.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    // Serializes the read-modify-write of the file within this process.
    lock: Mutex<()>,
}

impl FileTokenStore {
    /// Create a store backed by the file at `path`.
    ///
    /// Nothing is read or written until the store is used.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// The file the tokens are kept in.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> BTreeMap<String, String> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(error) => {
                tracing::warn!("could not read token file {}: {error}", self.path.display());
                return BTreeMap::new();
            }
        };

        serde_json::from_str(&contents).unwrap_or_else(|error| {
            tracing::warn!("ignoring malformed token file {}: {error}", self.path.display());
            BTreeMap::new()
        })
    }

    fn write(&self, tokens: &BTreeMap<String, String>) -> std::io::Result<()> {
        if tokens.is_empty() {
            return match fs::remove_file(&self.path) {
                Err(error) if self.path.exists() => Err(error),
                _ => Ok(()),
            };
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(tokens).map_err(std::io::Error::other)?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;

        // The mode only applies on creation, so tighten a file that predates it.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }

        file.write_all(contents.as_bytes())
    }

    fn update(&self, change: impl FnOnce(&mut BTreeMap<String, String>)) -> std::io::Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut tokens = self.read();
        change(&mut tokens);
        self.write(&tokens)
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, kind: TokenKind) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.read().remove(kind.key())
    }

    fn set(&self, kind: TokenKind, value: &str) {
        let result = self.update(|tokens| {
            tokens.insert(kind.key().to_owned(), value.to_owned());
        });

        if let Err(error) = result {
            tracing::warn!("could not write token file {}: {error}", self.path.display());
        }
    }

    fn clear(&self) -> Result<(), Error> {
        self.update(|tokens| {
            tokens.remove(TokenKind::Access.key());
            tokens.remove(TokenKind::Refresh.key());
        })
        .map_err(|error| {
            Error::Io(format!(
                "could not remove tokens from {}: {error}",
                self.path.display()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use crate::Error;

    use super::{FileTokenStore, MemoryTokenStore, TokenKind, TokenPair, TokenStore};

    #[test]
    fn memory_store_starts_empty() {
        let store = MemoryTokenStore::new();

        assert_eq!(store.get(TokenKind::Access), None);
        assert_eq!(store.get(TokenKind::Refresh), None);
    }

    #[test]
    fn memory_store_keeps_tokens_apart() {
        let store = MemoryTokenStore::new();

        store.set(TokenKind::Access, "access");
        store.set(TokenKind::Refresh, "refresh");

        assert_eq!(store.get(TokenKind::Access).as_deref(), Some("access"));
        assert_eq!(store.get(TokenKind::Refresh).as_deref(), Some("refresh"));
    }

    #[test]
    fn memory_store_clear_removes_both_tokens() {
        let store = MemoryTokenStore::new();
        store.set_pair(&TokenPair {
            access_token: "access".to_owned(),
            refresh_token: "refresh".to_owned(),
        });

        store.clear().unwrap();

        assert_eq!(store.get(TokenKind::Access), None);
        assert_eq!(store.get(TokenKind::Refresh), None);
    }

    #[test]
    fn file_store_persists_between_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("tokens.json");

        FileTokenStore::new(&path).set(TokenKind::Access, "access");
        FileTokenStore::new(&path).set(TokenKind::Refresh, "refresh");

        let store = FileTokenStore::new(&path);
        assert_eq!(store.get(TokenKind::Access).as_deref(), Some("access"));
        assert_eq!(store.get(TokenKind::Refresh).as_deref(), Some("refresh"));
    }

    #[test]
    fn file_store_uses_fixed_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        let store = FileTokenStore::new(&path);

        store.set(TokenKind::Access, "a");
        store.set(TokenKind::Refresh, "r");

        let contents: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            contents,
            serde_json::json!({"accessToken": "a", "refreshToken": "r"})
        );
    }

    #[test]
    fn file_store_clear_removes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        let store = FileTokenStore::new(&path);
        store.set(TokenKind::Access, "access");

        store.clear().unwrap();

        assert!(!path.exists());
        assert_eq!(store.get(TokenKind::Access), None);
    }

    #[test]
    fn file_store_returns_none_for_missing_file() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("missing.json"));

        assert_eq!(store.get(TokenKind::Access), None);
    }

    #[test]
    fn file_store_treats_malformed_file_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(&path, "not json").unwrap();
        let store = FileTokenStore::new(&path);

        assert_eq!(store.get(TokenKind::Refresh), None);

        store.set(TokenKind::Refresh, "refresh");
        assert_eq!(store.get(TokenKind::Refresh).as_deref(), Some("refresh"));
    }

    #[test]
    fn file_store_does_not_panic_when_storage_is_unavailable() {
        let dir = tempdir().unwrap();
        // A regular file where a directory is expected makes every write fail.
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let store = FileTokenStore::new(blocker.join("tokens.json"));

        store.set(TokenKind::Access, "access");

        assert_eq!(store.get(TokenKind::Access), None);
        assert_eq!(store.clear(), Ok(()));
    }

    #[test]
    fn file_store_reports_tokens_it_could_not_remove() {
        let dir = tempdir().unwrap();
        // A directory in place of the file cannot be removed as a file.
        let path = dir.path().join("tokens.json");
        fs::create_dir(&path).unwrap();
        let store = FileTokenStore::new(&path);

        let result = store.clear();

        assert!(matches!(result, Err(Error::Io(_))), "got {result:?}");
    }

    #[cfg(unix)]
    #[test]
    fn file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        FileTokenStore::new(&path).set(TokenKind::Access, "access");

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn file_store_tightens_existing_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(&path, "{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        FileTokenStore::new(&path).set(TokenKind::Refresh, "refresh");

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(
            FileTokenStore::new(&path).get(TokenKind::Refresh).as_deref(),
            Some("refresh")
        );
    }
}
