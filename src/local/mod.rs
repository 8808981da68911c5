//! Same-device transport
//!
//! Views running on one device share a [`SharedStore`]. The master writes
//! the current roll under a fixed key and every other view is notified
//! synchronously.
//!
//! ```text
//!    [Master view]                          [Player screen]
//!    LocalChannel::publish()                LocalChannel::subscribe()
//!         │                                        ▲
//!         ▼                                        │
//!    SharedStore::set(key, {...roll, _ts}) ──► observers (except origin)
//!                                                  │
//!                                          StalenessFilter::admit()
//! ```
//!
//! Delivery only happens while both views are alive. Nothing is queued and
//! no error is reported when nobody is listening.

pub mod channel;
pub mod file;
pub mod staleness;
pub mod store;

pub use channel::{LocalChannel, LocalUpdate, DEFAULT_STORAGE_KEY};
pub use file::FileStore;
pub use staleness::{StalenessFilter, StoredRoll, FRESHNESS_WINDOW};
pub use store::{MemoryStore, Observer, ObserverId, SharedStore, StoreEvent};
