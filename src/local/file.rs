//! File-backed shared store
//!
//! Keeps the whole store as one JSON object on disk. Contents survive
//! restarts, which is exactly the case the staleness filter guards against.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::Result;

use super::store::{lock, Observer, ObserverId, ObserverList, SharedStore, StoreEvent};

/// Store persisted to a JSON file
///
/// Change notification only reaches observers registered on the same
/// `FileStore` instance.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
    observers: ObserverList,
}

impl FileStore {
    /// Open a store, loading existing contents from `path`
    ///
    /// A missing file starts an empty store. A file that does not hold a
    /// JSON object of strings is logged and ignored; it is overwritten on
    /// the next write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let entries = match std::fs::read(&path) {
            Ok(raw) => match serde_json::from_slice::<HashMap<String, String>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Ignoring malformed store file"
                    );
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), keys = entries.len(), "Store opened");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
            observers: ObserverList::default(),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `entries` to disk
    ///
    /// Callers swap `entries` in only after this succeeds, so memory and
    /// file never diverge.
    fn persist(&self, entries: &HashMap<String, String>) -> Result<()> {
        let raw = serde_json::to_vec(entries)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl SharedStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: String, origin: Option<ObserverId>) -> Result<()> {
        {
            let mut entries = lock(&self.entries);
            let mut updated = entries.clone();
            updated.insert(key.to_owned(), value.clone());
            self.persist(&updated)?;
            *entries = updated;
        }

        let event = StoreEvent {
            key: key.to_owned(),
            value: Some(value),
        };
        self.observers.notify(&event, origin);
        Ok(())
    }

    fn remove(&self, key: &str, origin: Option<ObserverId>) -> Result<()> {
        {
            let mut entries = lock(&self.entries);
            if !entries.contains_key(key) {
                return Ok(());
            }
            let mut updated = entries.clone();
            updated.remove(key);
            self.persist(&updated)?;
            *entries = updated;
        }

        let event = StoreEvent {
            key: key.to_owned(),
            value: None,
        };
        self.observers.notify(&event, origin);
        Ok(())
    }

    fn observe(&self, observer: Observer) -> ObserverId {
        self.observers.add(observer)
    }

    fn unobserve(&self, id: ObserverId) {
        self.observers.remove(id);
    }
}
