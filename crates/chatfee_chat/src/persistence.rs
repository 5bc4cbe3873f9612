//! Session persistence layer.
//!
//! The whole session list and the display preference are stored as two
//! independent keyed records. With the file backend they live under the data
//! directory:
//!
//! ```text
//! <data_dir>/
//! ├── chats.json     # Serialized session list, replaced on every save
//! └── theme.json     # Display mode ("light" or "dark")
//! ```
//!
//! Reads degrade to defaults when a record is missing or unreadable; a
//! corrupt mirror means starting fresh, never a fatal error.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::{ChatError, ChatResult};
use crate::types::{DisplayMode, Session};

/// Key of the session collection record
pub const SESSIONS_KEY: &str = "chats";

/// Key of the display preference record
pub const DISPLAY_MODE_KEY: &str = "theme";

/// Raw keyed storage underneath the persistent store
pub trait StorageBackend: Send + Sync {
    /// Read a record; `None` when it was never written
    fn read(&self, key: &str) -> ChatResult<Option<String>>;

    /// Replace a record
    fn write(&self, key: &str, value: &str) -> ChatResult<()>;
}

/// Stores each record as `<dir>/<key>.json`
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> ChatResult<Option<String>> {
        let path = self.record_path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn write(&self, key: &str, value: &str) -> ChatResult<()> {
        fs::create_dir_all(&self.dir)?;

        // Write to a sibling temp file and rename so a crash never leaves a
        // half-written record behind.
        let mut file = tempfile::NamedTempFile::new_in(&self.dir)?;
        file.write_all(value.as_bytes())?;
        file.flush()?;
        file.as_file().sync_all()?;
        file.persist(self.record_path(key))?;
        Ok(())
    }
}

/// Volatile backend for tests and ephemeral runs
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    records: Arc<RwLock<HashMap<String, String>>>,
    fail_writes: Arc<RwLock<bool>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, simulating a full disk or quota
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.write() = fail;
    }

    /// Put raw text under a key, bypassing serialization
    pub fn insert_raw(&self, key: &str, value: impl Into<String>) {
        self.records.write().insert(key.to_string(), value.into());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.records.read().get(key).cloned()
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> ChatResult<Option<String>> {
        Ok(self.records.read().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> ChatResult<()> {
        if *self.fail_writes.read() {
            return Err(ChatError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "storage quota exceeded",
            )));
        }
        self.records.write().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Durable mirror of the session list and display preference
#[derive(Clone)]
pub struct PersistentStore {
    backend: Arc<dyn StorageBackend>,
}

impl PersistentStore {
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Store backed by JSON files in `dir`
    pub fn open(dir: impl AsRef<Path>) -> Self {
        Self::new(FileBackend::new(dir))
    }

    /// Store that forgets everything when dropped
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Load the session list. Missing or corrupt data yields an empty list.
    pub fn load(&self) -> Vec<Session> {
        match self.try_load() {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!("Discarding unreadable session mirror: {}", e);
                Vec::new()
            }
        }
    }

    fn try_load(&self) -> ChatResult<Vec<Session>> {
        match self.backend.read(SESSIONS_KEY)? {
            Some(content) if !content.trim().is_empty() => Ok(serde_json::from_str(&content)?),
            _ => Ok(Vec::new()),
        }
    }

    /// Replace the stored session list
    pub fn save(&self, sessions: &[Session]) -> ChatResult<()> {
        let content = serde_json::to_string(sessions)?;
        self.backend.write(SESSIONS_KEY, &content)?;
        debug!(count = sessions.len(), "saved session mirror");
        Ok(())
    }

    /// Load the display preference, `Light` when absent or unreadable
    pub fn load_display_mode(&self) -> DisplayMode {
        let stored = match self.backend.read(DISPLAY_MODE_KEY) {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Could not read display mode: {}", e);
                None
            }
        };

        stored
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    pub fn save_display_mode(&self, mode: DisplayMode) -> ChatResult<()> {
        let content = serde_json::to_string(&mode)?;
        self.backend.write(DISPLAY_MODE_KEY, &content)
    }
}
