use std::{
    collections::HashMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use crate::error::ClientError;

/// Storage key for the access token.
pub const AUTH_TOKEN_KEY: &str = "auth_token";
/// Storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
/// Storage key for the serialized user object.
pub const USER_DATA_KEY: &str = "user_data";

// 1. SessionStorage Contract
/// SessionStorage
///
/// Durable client-side key/value storage for the session. Each call is atomic
/// for its own key only; there is no transaction spanning the three session
/// keys, so a crash between writes can leave them out of step. `restore_auth`
/// is what tolerates that.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// # Errors
    /// Returns `ClientError::Storage` when the value could not be persisted.
    fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;

    /// Removing a missing key is not an error.
    ///
    /// # Errors
    /// Returns `ClientError::Storage` when the removal could not be persisted.
    fn remove(&self, key: &str) -> Result<(), ClientError>;
}

/// StorageState
///
/// The shared handle every component holds on the storage backend.
pub type StorageState = Arc<dyn SessionStorage>;

// 2. The Real Implementation (JSON file on disk)
/// FileStorage
///
/// Keeps all keys in one JSON object file. The file is read once at
/// construction and rewritten on every mutation; the in-memory map stays the
/// source of truth for reads.
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStorage {
    /// Opens (or lazily creates) the storage file at `path`.
    ///
    /// A missing file starts empty. A corrupt file also starts empty: the
    /// session it held is unrecoverable anyway and the next write replaces it.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "Session file is corrupt, starting empty"
                );
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };

        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `entries` to disk. The file holds bearer and refresh tokens, so
    /// on Unix it is created owner-only (0600) inside an owner-only (0700)
    /// directory.
    fn persist(&self, entries: &HashMap<String, String>) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_private_dir(parent).map_err(storage_error)?;
        }
        let raw = serde_json::to_string_pretty(entries)?;

        // Write next to the target then rename, so readers never see a torn file.
        let tmp = self.path.with_extension("tmp");
        let mut file = open_private_file(&tmp).map_err(storage_error)?;
        file.write_all(raw.as_bytes()).map_err(storage_error)?;
        file.sync_all().map_err(storage_error)?;
        drop(file);
        fs::rename(&tmp, &self.path).map_err(storage_error)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map is still a valid map of strings.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let mut entries = self.lock();
        // The map only changes once the file does, so reads never see an unsaved value.
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        let mut entries = self.lock();
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }
}

fn storage_error(err: std::io::Error) -> ClientError {
    ClientError::Storage(err.to_string())
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn open_private_file(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation; a leftover temp file keeps its old bits.
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private_file(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

// 3. The Mock Implementation (For Tests)
/// MemoryStorage
///
/// In-memory storage. `new_failing` builds an instance whose writes always
/// fail, to exercise the "session mutation always succeeds" path.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    /// When true, every `set`/`remove` returns a simulated failure.
    pub should_fail: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            entries: Mutex::default(),
            should_fail: true,
        }
    }

    /// Seeds a value, bypassing the failure switch.
    pub fn with_entry(self, key: &str, value: &str) -> Self {
        self.lock().insert(key.to_string(), value.to_string());
        self
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        if self.should_fail {
            return Err(ClientError::Storage(
                "Mock Storage Error: Simulation requested".to_string(),
            ));
        }
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        if self.should_fail {
            return Err(ClientError::Storage(
                "Mock Storage Error: Simulation requested".to_string(),
            ));
        }
        self.lock().remove(key);
        Ok(())
    }
}
