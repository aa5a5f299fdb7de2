//! Persisted user preferences.
//!
//! Preferences are a flat map of string keys to boolean values. The JSON file
//! store is the durable one; the memory store backs tests and one-shot runs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

/// Errors that can occur while reading or writing preferences.
#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid preferences file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no data directory available on this platform")]
    NoDataDir,
}

/// Result type for preference operations.
pub type Result<T> = std::result::Result<T, PreferenceError>;

/// Key-value preference storage.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Reads a flag, returning `None` if it was never set.
    async fn get_bool(&self, key: &str) -> Result<Option<bool>>;

    /// Writes a flag.
    async fn set_bool(&self, key: &str, value: bool) -> Result<()>;
}

/// Preferences kept in a JSON file.
#[derive(Debug)]
pub struct JsonPreferenceStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonPreferenceStore {
    /// Opens (lazily) the preference file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Opens the preference file in the platform data directory.
    pub fn in_data_dir() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("io", "inquiry-triage", "inquiry-triage")
            .ok_or(PreferenceError::NoDataDir)?;
        Ok(Self::new(dirs.data_dir().join("preferences.json")))
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<BTreeMap<String, bool>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl PreferenceStore for JsonPreferenceStore {
    async fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.read_all().await?.get(key).copied())
    }

    async fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut all = self.read_all().await?;
        all.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_string_pretty(&all)?).await?;
        Ok(())
    }
}

/// Preferences held in memory only.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: RwLock<BTreeMap<String, bool>>,
}

impl MemoryPreferenceStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.values.read().await.get(key).copied())
    }

    async fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// Whether processed originals are deleted after their reply is filed.
pub struct DeleteEmailsPreference;

impl DeleteEmailsPreference {
    /// Storage key, shared with earlier releases of the add-in.
    pub const KEY: &'static str = "deleteEmailsToggle";

    /// Reads the current value, defaulting to `false`.
    pub async fn load(store: &dyn PreferenceStore) -> Result<bool> {
        Ok(store.get_bool(Self::KEY).await?.unwrap_or(false))
    }

    /// Flips the stored value and returns the new one.
    pub async fn toggle(store: &dyn PreferenceStore) -> Result<bool> {
        let next = !Self::load(store).await?;
        store.set_bool(Self::KEY, next).await?;
        tracing::info!(delete_emails = next, "delete emails toggle set");
        Ok(next)
    }
}
