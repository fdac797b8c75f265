use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::warn;

use crate::config::{ConfigError, ConfigLocator};

/// Synchronous key/value persistence used for session data.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn set(&self, key: &str, value: &Value) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Errors raised by persistence backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// JSON file in the user configuration directory, one file per profile.
///
/// Every operation re-reads the file so separate handles see each other's writes.
/// Writes go to a sibling temp file that is renamed over the session file.
pub struct FileKeyValueStore {
    path: PathBuf,
    profile: String,
}

impl FileKeyValueStore {
    pub fn new(locator: &ConfigLocator, profile: impl Into<String>) -> Self {
        let profile = profile.into();
        Self {
            path: locator.session_file(&profile),
            profile,
        }
    }

    pub fn with_default_locator(profile: impl Into<String>) -> Result<Self, StoreError> {
        Ok(Self::new(&ConfigLocator::new()?, profile))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, Value>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        let envelope: StoreEnvelope = serde_json::from_str(&raw)?;
        Ok(envelope.entries)
    }

    fn write_entries(&self, entries: BTreeMap<String, Value>) -> Result<(), StoreError> {
        let envelope = StoreEnvelope {
            version: 1,
            profile: self.profile.clone(),
            entries,
        };
        let payload = serde_json::to_string_pretty(&envelope)?;
        write_file(&self.path, &payload)
    }
}

fn write_file(path: &Path, payload: &str) -> Result<(), StoreError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    let mut file = NamedTempFile::new_in(parent)?;
    file.write_all(payload.as_bytes())?;
    file.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perm = file.as_file().metadata()?.permissions();
        perm.set_mode(0o600);
        fs::set_permissions(file.path(), perm)?;
    }

    file.persist(path).map_err(|err| StoreError::Io(err.error))?;
    Ok(())
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let mut entries = self.read_entries()?;
        entries.insert(key.to_owned(), value.clone());
        self.write_entries(entries)
    }

    /// An unreadable session file is deleted so a logout can always recover.
    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = match self.read_entries() {
            Ok(entries) => entries,
            Err(StoreError::Serde(err)) => {
                warn!(path = %self.path.display(), error = %err, "discarding corrupt session file");
                return match fs::remove_file(&self.path) {
                    Ok(()) => Ok(()),
                    Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
                    Err(err) => Err(err.into()),
                };
            }
            Err(err) => return Err(err),
        };
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.write_entries(entries)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreEnvelope {
    version: u32,
    profile: String,
    #[serde(default)]
    entries: BTreeMap<String, Value>,
}

/// Process-local store, handy for tests and ephemeral sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    inner: Arc<Mutex<HashMap<String, Value>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(inner.get(key).cloned())
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.insert(key.to_owned(), value.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.remove(key);
        Ok(())
    }
}
