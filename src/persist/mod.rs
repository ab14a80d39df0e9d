//! Durable persistence of the whitelisted part of the application state.

use crate::error::ErrorContext;
use crate::store::{AppState, Mutation, StateSubscriber};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// Storage key of the persisted snapshot.
pub const STORAGE_KEY: &str = "data";

/// Top-level state keys that survive a restart.
pub const WHITELIST: [&str; 4] = ["host", "username", "apiKey", "language"];

/// The persisted subset of [`AppState`].
///
/// A key missing from a stored blob stays `None`, and restoring leaves the
/// store's current value for that key untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedSnapshot {
    pub host: Option<String>,
    pub username: Option<String>,
    pub api_key: Option<String>,
    pub language: Option<String>,
}

impl PersistedSnapshot {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            host: Some(state.host.clone()),
            username: Some(state.username.clone()),
            api_key: Some(state.api_key.clone()),
            language: Some(state.language.clone()),
        }
    }
}

/// Synchronous key-value storage.
pub trait LocalStorage: Send + Sync {
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn get_item(&self, key: &str) -> Result<Option<String>>;
}

/// Volatile storage, mainly for tests.
#[derive(Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
    writes: RwLock<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set_item` calls so far.
    pub fn write_count(&self) -> usize {
        *self.writes.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LocalStorage for MemoryStorage {
    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        *self.writes.write().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }

    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }
}

/// One file per key inside a directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(Error::storage_with_context(
                "invalid storage key",
                ErrorContext::new()
                    .with_details(key.to_string())
                    .with_source("file_storage"),
            ));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl LocalStorage for FileStorage {
    /// Writes to a temporary file first so a crash never leaves half a blob.
    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Writes the whitelisted snapshot after every mutation.
pub struct StatePersister {
    storage: Arc<dyn LocalStorage>,
}

impl StatePersister {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self { storage }
    }

    /// Serialize and store the snapshot of `state`, replacing the previous one.
    pub fn persist(&self, state: &AppState) -> Result<()> {
        let json = serde_json::to_string(&PersistedSnapshot::from_state(state))?;
        self.storage.set_item(STORAGE_KEY, &json)
    }

    /// Read back the stored snapshot, if any.
    pub fn restore(storage: &dyn LocalStorage) -> Result<Option<PersistedSnapshot>> {
        match storage.get_item(STORAGE_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

impl StateSubscriber for StatePersister {
    fn on_mutation(&self, mutation: &Mutation, state: &AppState) {
        match self.persist(state) {
            Ok(()) => debug!(mutation = mutation.name(), "state persisted"),
            Err(e) => warn!(mutation = mutation.name(), error = %e, "failed to persist state"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StateStore};
    use std::collections::BTreeSet;

    fn stored_keys(storage: &MemoryStorage) -> BTreeSet<String> {
        let json = storage.get_item(STORAGE_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value.as_object().unwrap().keys().cloned().collect()
    }

    #[test]
    fn test_snapshot_keys_are_exactly_the_whitelist() {
        let store = MemoryStore::new();
        let storage = Arc::new(MemoryStorage::new());
        store.subscribe(Arc::new(StatePersister::new(storage.clone())));

        store.commit(Mutation::SetHost("https://kimai.example".into()));
        store.commit(Mutation::SetExtra {
            key: "activeTimesheet".into(),
            value: serde_json::json!({"id": 1}),
        });
        store.commit(Mutation::SetLoading(true));

        let expected: BTreeSet<String> = WHITELIST.iter().map(|k| k.to_string()).collect();
        assert_eq!(stored_keys(&storage), expected);
    }

    #[test]
    fn test_one_write_per_mutation() {
        let store = MemoryStore::new();
        let storage = Arc::new(MemoryStorage::new());
        store.subscribe(Arc::new(StatePersister::new(storage.clone())));

        for i in 0..5 {
            store.commit(Mutation::SetUsername(format!("user{}", i)));
        }

        assert_eq!(storage.write_count(), 5);
        let restored = StatePersister::restore(storage.as_ref()).unwrap().unwrap();
        assert_eq!(restored.username.as_deref(), Some("user4"));
    }

    #[test]
    fn test_restore_round_trip_into_store() {
        let storage = MemoryStorage::new();
        storage
            .set_item(
                STORAGE_KEY,
                r#"{"host":"https://k.example","username":"ada","apiKey":"t0k","language":"de","loading":true}"#,
            )
            .unwrap();

        let snapshot = StatePersister::restore(&storage).unwrap().unwrap();
        let store = MemoryStore::new();
        store.commit(Mutation::Initialize(snapshot));

        let state = store.state();
        assert_eq!(state.host, "https://k.example");
        assert_eq!(state.api_key, "t0k");
        assert_eq!(state.language, "de");
        assert!(!state.loading);
    }

    #[test]
    fn test_restore_partial_blob_keeps_defaults() {
        let storage = MemoryStorage::new();
        storage
            .set_item(STORAGE_KEY, r#"{"host":"https://k.example"}"#)
            .unwrap();

        let snapshot = StatePersister::restore(&storage).unwrap().unwrap();
        assert_eq!(snapshot.language, None);

        let store = MemoryStore::new();
        store.commit(Mutation::SetUsername("ada".into()));
        let written = Arc::new(MemoryStorage::new());
        store.subscribe(Arc::new(StatePersister::new(written.clone())));
        store.commit(Mutation::Initialize(snapshot));

        let state = store.state();
        assert_eq!(state.host, "https://k.example");
        assert_eq!(state.username, "ada");
        assert_eq!(state.language, "en");
        let rewritten = StatePersister::restore(written.as_ref()).unwrap().unwrap();
        assert_eq!(rewritten.language.as_deref(), Some("en"));
    }

    #[test]
    fn test_restore_missing_and_corrupt() {
        let storage = MemoryStorage::new();
        assert!(StatePersister::restore(&storage).unwrap().is_none());

        storage.set_item(STORAGE_KEY, "{not json").unwrap();
        assert!(matches!(
            StatePersister::restore(&storage),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn test_file_storage_overwrites() {
        let dir = std::env::temp_dir().join(format!("kimai-storage-{}", uuid::Uuid::new_v4()));
        let storage = FileStorage::new(&dir);

        assert_eq!(storage.get_item(STORAGE_KEY).unwrap(), None);
        storage.set_item(STORAGE_KEY, "first").unwrap();
        storage.set_item(STORAGE_KEY, "second").unwrap();
        assert_eq!(storage.get_item(STORAGE_KEY).unwrap().as_deref(), Some("second"));
        assert!(storage.set_item("../escape", "x").is_err());

        fs::remove_dir_all(&dir).unwrap();
    }
}
