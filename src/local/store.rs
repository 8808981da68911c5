//! Shared key-value stores with change notification
//!
//! Views on the same device share one store. Every write notifies all other
//! registered observers synchronously; the writer itself is skipped when it
//! passes its own [`ObserverId`] as the origin.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::Result;

/// Handle returned by [`SharedStore::observe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// A change to one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEvent {
    pub key: String,
    /// New value, or `None` if the key was removed
    pub value: Option<String>,
}

/// Change notification callback
pub type Observer = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

/// A key-value store visible to every view on the device
pub trait SharedStore: Send + Sync {
    /// Read the current value of a key
    fn get(&self, key: &str) -> Option<String>;

    /// Write a key and notify every observer except `origin`
    fn set(&self, key: &str, value: String, origin: Option<ObserverId>) -> Result<()>;

    /// Remove a key and notify every observer except `origin`
    ///
    /// Removing a missing key does not notify.
    fn remove(&self, key: &str, origin: Option<ObserverId>) -> Result<()>;

    /// Register a change observer
    fn observe(&self, observer: Observer) -> ObserverId;

    /// Unregister an observer; unknown ids are ignored
    fn unobserve(&self, id: ObserverId);
}

/// Registered observers of one store
#[derive(Default)]
pub(crate) struct ObserverList {
    next_id: AtomicU64,
    observers: Mutex<Vec<(ObserverId, Observer)>>,
}

impl ObserverList {
    pub(crate) fn add(&self, observer: Observer) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.observers).push((id, observer));
        id
    }

    pub(crate) fn remove(&self, id: ObserverId) {
        lock(&self.observers).retain(|(existing, _)| *existing != id);
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.observers).len()
    }

    /// Call every observer except `origin`
    ///
    /// Callbacks run after the list lock is released, so they may read the
    /// store or register further observers.
    pub(crate) fn notify(&self, event: &StoreEvent, origin: Option<ObserverId>) {
        let targets: Vec<Observer> = lock(&self.observers)
            .iter()
            .filter(|(id, _)| Some(*id) != origin)
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        for observer in targets {
            observer(event);
        }
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process store
///
/// Contents live as long as the store. Share it between views with `Arc`.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    observers: ObserverList,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered observers
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

impl SharedStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: String, origin: Option<ObserverId>) -> Result<()> {
        lock(&self.entries).insert(key.to_owned(), value.clone());

        let event = StoreEvent {
            key: key.to_owned(),
            value: Some(value),
        };
        self.observers.notify(&event, origin);
        Ok(())
    }

    fn remove(&self, key: &str, origin: Option<ObserverId>) -> Result<()> {
        let removed = lock(&self.entries).remove(key).is_some();

        if removed {
            let event = StoreEvent {
                key: key.to_owned(),
                value: None,
            };
            self.observers.notify(&event, origin);
        }
        Ok(())
    }

    fn observe(&self, observer: Observer) -> ObserverId {
        self.observers.add(observer)
    }

    fn unobserve(&self, id: ObserverId) {
        self.observers.remove(id);
    }
}
