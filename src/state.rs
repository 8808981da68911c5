//! Observable broadcast state
//!
//! One `RollState` backs one view. Transports write to it from callbacks and
//! background tasks; the UI watches it through `watch::Receiver`s.

use tokio::sync::watch;

use crate::roll::RollSlot;

/// Connection error shown when no server URL is configured
pub const NO_SERVER_URL: &str = "No server URL";

/// Connection error shown when the stream could not be opened or broke
pub const CONNECTION_FAILED: &str = "Connection failed";

/// Current roll plus subscription status
#[derive(Debug)]
pub struct RollState {
    roll: watch::Sender<RollSlot>,
    connected: watch::Sender<bool>,
    connection_error: watch::Sender<Option<String>>,
}

impl RollState {
    pub fn new() -> Self {
        Self::with_roll(RollSlot::Empty)
    }

    pub fn with_roll(initial: RollSlot) -> Self {
        Self {
            roll: watch::Sender::new(initial),
            connected: watch::Sender::new(false),
            connection_error: watch::Sender::new(None),
        }
    }

    /// Replace the current roll
    ///
    /// Never fails, even when nobody is watching.
    pub fn set_roll(&self, slot: RollSlot) {
        self.roll.send_replace(slot);
    }

    /// Set the roll unless one has been observed already
    ///
    /// Used for the initial load, which may race a live update.
    pub fn seed_roll(&self, slot: RollSlot) {
        self.roll.send_if_modified(|current| {
            if *current != RollSlot::Empty {
                return false;
            }
            *current = slot;
            true
        });
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.send_if_modified(|current| {
            let changed = *current != connected;
            *current = connected;
            changed
        });
    }

    pub fn set_connection_error(&self, error: Option<&str>) {
        let error = error.map(str::to_owned);
        self.connection_error.send_if_modified(|current| {
            let changed = *current != error;
            *current = error;
            changed
        });
    }

    /// Snapshot of the current roll
    pub fn roll(&self) -> RollSlot {
        self.roll.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    pub fn connection_error(&self) -> Option<String> {
        self.connection_error.borrow().clone()
    }

    pub fn watch_roll(&self) -> watch::Receiver<RollSlot> {
        self.roll.subscribe()
    }

    pub fn watch_connected(&self) -> watch::Receiver<bool> {
        self.connected.subscribe()
    }

    pub fn watch_connection_error(&self) -> watch::Receiver<Option<String>> {
        self.connection_error.subscribe()
    }
}

impl Default for RollState {
    fn default() -> Self {
        Self::new()
    }
}
