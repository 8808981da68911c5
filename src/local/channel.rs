//! Same-device roll channel
//!
//! Publishes the current roll under one fixed key of a [`SharedStore`].
//! Other views on the device observe the key: a set value is a live roll,
//! a removed key means no roll.

use std::sync::Arc;

use crate::error::Result;
use crate::roll::{epoch_millis, RollEvent};

use super::staleness::{StalenessFilter, StoredRoll};
use super::store::{Observer, ObserverId, SharedStore, StoreEvent};

/// Key the current roll is stored under unless configured otherwise
pub const DEFAULT_STORAGE_KEY: &str = "roll-broadcast:current";

/// A change observed on the local channel
#[derive(Debug, Clone, PartialEq)]
pub enum LocalUpdate {
    /// Another view published a fresh roll
    Roll(RollEvent),
    /// Another view cleared the roll
    Cleared,
}

/// One view's handle on the shared roll key
pub struct LocalChannel {
    store: Arc<dyn SharedStore>,
    key: String,
    filter: StalenessFilter,
    observer: Option<ObserverId>,
}

impl LocalChannel {
    pub fn new(store: Arc<dyn SharedStore>, key: impl Into<String>, filter: StalenessFilter) -> Self {
        Self {
            store,
            key: key.into(),
            filter,
            observer: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Write a roll, stamped with the current time
    ///
    /// This view's own observer is not notified.
    pub fn publish(&self, event: &RollEvent) -> Result<()> {
        let stored = StoredRoll::new(event.clone(), epoch_millis());
        let raw = serde_json::to_string(&stored)?;
        self.store.set(&self.key, raw, self.observer)
    }

    /// Remove the roll key
    pub fn clear(&self) -> Result<()> {
        self.store.remove(&self.key, self.observer)
    }

    /// Read the roll currently in the store, if it is fresh
    ///
    /// Used once when a view starts: no notification fires for state that
    /// was written before the view subscribed.
    pub fn load(&self) -> Option<RollEvent> {
        self.load_at(epoch_millis())
    }

    pub(crate) fn load_at(&self, now: u64) -> Option<RollEvent> {
        let raw = self.store.get(&self.key)?;
        decode(&raw, &self.filter, now)
    }

    /// Register `on_update` for changes made by other views
    ///
    /// Replaces any previous subscription of this channel. Stale and
    /// malformed values are logged and never reach `on_update`.
    pub fn subscribe<F>(&mut self, on_update: F)
    where
        F: Fn(LocalUpdate) + Send + Sync + 'static,
    {
        self.unsubscribe();

        let key = self.key.clone();
        let filter = self.filter;
        let observer: Observer = Arc::new(move |event: &StoreEvent| {
            if event.key != key {
                return;
            }
            match &event.value {
                None => on_update(LocalUpdate::Cleared),
                Some(raw) => {
                    if let Some(roll) = decode(raw, &filter, epoch_millis()) {
                        on_update(LocalUpdate::Roll(roll));
                    }
                }
            }
        });

        self.observer = Some(self.store.observe(observer));
        tracing::debug!(key = %self.key, "Local channel subscribed");
    }

    /// Stop observing the store
    pub fn unsubscribe(&mut self) {
        if let Some(id) = self.observer.take() {
            self.store.unobserve(id);
            tracing::debug!(key = %self.key, "Local channel unsubscribed");
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.observer.is_some()
    }
}

impl Drop for LocalChannel {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

fn decode(raw: &str, filter: &StalenessFilter, now: u64) -> Option<RollEvent> {
    match serde_json::from_str::<StoredRoll>(raw) {
        Ok(stored) => filter.admit(stored, now),
        Err(e) => {
            tracing::warn!(error = %e, "Dropping malformed stored roll");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::local::MemoryStore;
    use crate::roll::RollPayload;

    fn channel(store: &Arc<MemoryStore>) -> LocalChannel {
        LocalChannel::new(
            Arc::clone(store) as Arc<dyn SharedStore>,
            DEFAULT_STORAGE_KEY,
            StalenessFilter::default(),
        )
    }

    fn collect(channel: &mut LocalChannel) -> Arc<Mutex<Vec<LocalUpdate>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        channel.subscribe(move |update| sink.lock().unwrap().push(update));
        seen
    }

    fn stored_at(event: &RollEvent, ts: u64) -> String {
        serde_json::to_string(&StoredRoll::new(event.clone(), ts)).unwrap()
    }

    #[test]
    fn test_publish_reaches_other_view() {
        let store = Arc::new(MemoryStore::new());
        let mut master = channel(&store);
        let mut player = channel(&store);
        let master_seen = collect(&mut master);
        let player_seen = collect(&mut player);

        let event = RollEvent::rolling(&RollPayload::new().player_name("Aria"));
        master.publish(&event).unwrap();

        assert!(master_seen.lock().unwrap().is_empty());
        assert_eq!(
            *player_seen.lock().unwrap(),
            vec![LocalUpdate::Roll(event.clone())]
        );
        assert_eq!(player.load(), Some(event));
    }

    #[test]
    fn test_clear_removes_key() {
        let store = Arc::new(MemoryStore::new());
        let master = channel(&store);
        let mut player = channel(&store);
        let seen = collect(&mut player);

        master.publish(&RollEvent::rolling(&RollPayload::new())).unwrap();
        master.clear().unwrap();

        assert_eq!(store.get(DEFAULT_STORAGE_KEY), None);
        assert_eq!(player.load(), None);
        assert_eq!(seen.lock().unwrap().last(), Some(&LocalUpdate::Cleared));
    }

    #[test]
    fn test_load_rejects_stale() {
        let store = Arc::new(MemoryStore::new());
        let player = channel(&store);
        let event = RollEvent::rolling(&RollPayload::new());
        let now = epoch_millis();

        store
            .set(DEFAULT_STORAGE_KEY, stored_at(&event, now - 61_000), None)
            .unwrap();
        assert_eq!(player.load_at(now), None);

        store
            .set(DEFAULT_STORAGE_KEY, stored_at(&event, now - 59_000), None)
            .unwrap();
        assert_eq!(player.load_at(now), Some(event));
    }

    #[test]
    fn test_stale_notification_is_dropped() {
        let store = Arc::new(MemoryStore::new());
        let mut player = channel(&store);
        let seen = collect(&mut player);
        let event = RollEvent::rolling(&RollPayload::new());

        store
            .set(
                DEFAULT_STORAGE_KEY,
                stored_at(&event, epoch_millis() - 120_000),
                None,
            )
            .unwrap();

        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_value_is_dropped() {
        let store = Arc::new(MemoryStore::new());
        let mut player = channel(&store);
        let seen = collect(&mut player);

        store.set(DEFAULT_STORAGE_KEY, "{oops".into(), None).unwrap();

        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(player.load(), None);
    }

    #[test]
    fn test_other_keys_are_ignored() {
        let store = Arc::new(MemoryStore::new());
        let mut player = channel(&store);
        let seen = collect(&mut player);

        store.set("dice-tower-list", "[]".into(), None).unwrap();
        store.remove("dice-tower-list", None).unwrap();

        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let store = Arc::new(MemoryStore::new());
        {
            let mut player = channel(&store);
            collect(&mut player);
            assert!(player.is_subscribed());
            assert_eq!(store.observer_count(), 1);
        }
        assert_eq!(store.observer_count(), 0);
    }
}
