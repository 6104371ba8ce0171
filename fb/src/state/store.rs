//! Registry persistence
//!
//! `RegistryStore` owns the load/parse/serialize logic; a `StorageBackend` only
//! moves bytes. The file backend replaces the document atomically (temp file +
//! rename) so a crash mid-write never leaves a truncated document behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::document::WatchState;
use super::messages::RegistryError;

/// Raw byte storage for the registry document
pub trait StorageBackend: Send + Sync {
    /// Current document bytes, or `None` if nothing has been written yet
    fn read(&self) -> Result<Option<Vec<u8>>, RegistryError>;

    /// Replace the whole document
    fn write(&self, bytes: &[u8]) -> Result<(), RegistryError>;

    /// Human-readable location for logs
    fn describe(&self) -> String;
}

/// JSON file on local disk
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StorageBackend for FileBackend {
    fn read(&self) -> Result<Option<Vec<u8>>, RegistryError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RegistryError::StoreError(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn write(&self, bytes: &[u8]) -> Result<(), RegistryError> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .map_err(|e| RegistryError::StoreError(format!("Failed to create {}: {}", parent.display(), e)))?;

        let mut temp = NamedTempFile::new_in(parent)
            .map_err(|e| RegistryError::StoreError(format!("Temp file error: {}", e)))?;
        temp.write_all(bytes)
            .map_err(|e| RegistryError::StoreError(format!("Failed to write temp registry file: {}", e)))?;
        temp.flush()
            .map_err(|e| RegistryError::StoreError(format!("Failed to flush temp registry file: {}", e)))?;
        temp.persist(&self.path).map_err(|e| {
            RegistryError::StoreError(format!("Failed to replace {}: {}", self.path.display(), e.error))
        })?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-process storage; clones share the same bytes
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    data: Arc<Mutex<Option<Vec<u8>>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing document bytes (possibly invalid)
    pub fn with_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Arc::new(Mutex::new(Some(bytes.into()))),
        }
    }

    /// Bytes last written, if any
    pub fn contents(&self) -> Option<Vec<u8>> {
        self.data.lock().ok().and_then(|guard| guard.clone())
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self) -> Result<Option<Vec<u8>>, RegistryError> {
        let guard = self
            .data
            .lock()
            .map_err(|_| RegistryError::StoreError("memory backend lock poisoned".to_string()))?;
        Ok(guard.clone())
    }

    fn write(&self, bytes: &[u8]) -> Result<(), RegistryError> {
        let mut guard = self
            .data
            .lock()
            .map_err(|_| RegistryError::StoreError("memory backend lock poisoned".to_string()))?;
        *guard = Some(bytes.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Loads and saves the whole `WatchState` document through a backend
pub struct RegistryStore {
    backend: Box<dyn StorageBackend>,
}

impl RegistryStore {
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// File-backed store at `path`
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(FileBackend::new(path))
    }

    /// Fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    pub fn describe(&self) -> String {
        self.backend.describe()
    }

    /// Load the document
    ///
    /// Missing, empty, unreadable or corrupt documents all load as an empty
    /// state; the next save replaces them.
    pub fn load(&self) -> WatchState {
        let bytes = match self.backend.read() {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(store = %self.describe(), "RegistryStore::load: no document yet");
                return WatchState::default();
            }
            Err(e) => {
                warn!(store = %self.describe(), error = %e, "Registry unreadable, starting empty");
                return WatchState::default();
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            debug!(store = %self.describe(), "RegistryStore::load: empty document");
            return WatchState::default();
        }

        match serde_json::from_slice::<WatchState>(&bytes) {
            Ok(state) => state,
            Err(e) => {
                warn!(store = %self.describe(), error = %e, "Corrupt registry document, starting empty");
                WatchState::default()
            }
        }
    }

    /// Replace the persisted document with `state`
    pub fn save(&self, state: &WatchState) -> Result<(), RegistryError> {
        let bytes =
            serde_json::to_vec_pretty(state).map_err(|e| RegistryError::SerializationError(e.to_string()))?;
        self.backend.write(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Phase;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_missing_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = RegistryStore::file(temp.path().join("state.json"));
        assert_eq!(store.load(), WatchState::default());
    }

    #[test]
    fn test_file_store_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("state.json");
        let store = RegistryStore::file(&path);

        let mut state = WatchState::default();
        state.subscribe("prj_1", "42");
        state.set_last_notified("prj_1", Phase::Passed);
        store.save(&state).unwrap();

        assert!(path.exists());
        assert_eq!(store.load(), state);
    }

    #[test]
    fn test_file_store_corrupt_is_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.json");
        fs::write(&path, "{\"watch\": [").unwrap();

        let store = RegistryStore::file(&path);
        assert_eq!(store.load(), WatchState::default());
    }

    #[test]
    fn test_file_store_wrong_shape_is_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.json");
        fs::write(&path, r#"{"watch": {"prj_1": "not-a-list"}}"#).unwrap();

        let store = RegistryStore::file(&path);
        assert_eq!(store.load(), WatchState::default());
    }

    #[test]
    fn test_memory_store_blank_is_empty() {
        let store = RegistryStore::new(MemoryBackend::with_bytes("  \n"));
        assert_eq!(store.load(), WatchState::default());
    }

    #[test]
    fn test_memory_backend_shares_bytes() {
        let backend = MemoryBackend::new();
        let store = RegistryStore::new(backend.clone());

        let mut state = WatchState::default();
        state.subscribe("prj_1", "1");
        store.save(&state).unwrap();

        let raw: serde_json::Value = serde_json::from_slice(&backend.contents().unwrap()).unwrap();
        assert_eq!(raw["watch"]["prj_1"][0], "1");
        assert!(raw["chats"].is_object());
        assert!(raw["last_notified"].is_object());
    }
}
