//! Broadcast facade

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use url::Url;

use crate::local::store::lock;
use crate::local::{LocalChannel, LocalUpdate, SharedStore, StalenessFilter};
use crate::network::{Endpoints, PushCommand, RollPusher, RollSubscriber, ServerTarget};
use crate::roll::{RollEvent, RollPayload, RollSlot};
use crate::state::RollState;
use crate::stats::{BroadcastCounters, BroadcastStats};

use super::config::BroadcastConfig;

/// Publishes and observes the current roll of one channel
///
/// All methods are synchronous and never fail: transport problems are
/// logged, and surface only through [`connection_error`](Self::connection_error)
/// and [`is_connected`](Self::is_connected).
pub struct RollBroadcaster {
    state: Arc<RollState>,
    target: ServerTarget,
    local: LocalChannel,
    pusher: RollPusher,
    subscriber: RollSubscriber,
    counters: Arc<BroadcastCounters>,
    /// Keeps read-modify-write of the slot and the transport writes in call order
    mutation: Mutex<()>,
}

impl RollBroadcaster {
    /// Create a broadcaster over `store`
    ///
    /// Reads the roll left in the store (if still fresh) and starts observing
    /// changes from other views. Must be called from within a Tokio runtime.
    pub fn new(config: BroadcastConfig, store: Arc<dyn SharedStore>) -> Self {
        let counters = Arc::new(BroadcastCounters::new());
        let target = ServerTarget::new();

        let mut local = LocalChannel::new(
            store,
            config.storage_key.clone(),
            StalenessFilter::new(config.freshness_window),
        );

        let state = Arc::new(RollState::new());

        // Subscribe before loading so a write landing in between is not lost
        let observer = Arc::clone(&state);
        local.subscribe(move |update| match update {
            LocalUpdate::Roll(event) => {
                tracing::debug!(roll_id = %event.id, "Roll from local channel");
                observer.set_roll(RollSlot::Active(event));
            }
            LocalUpdate::Cleared => {
                tracing::debug!("Clear from local channel");
                observer.set_roll(RollSlot::Cleared);
            }
        });
        if let Some(event) = local.load() {
            state.seed_roll(RollSlot::Active(event));
        }

        let pusher = RollPusher::spawn(&config.network, Arc::clone(&counters));
        let subscriber = RollSubscriber::new(
            config.network.clone(),
            target.clone(),
            Arc::clone(&state),
            Arc::clone(&counters),
        );

        Self {
            state,
            target,
            local,
            pusher,
            subscriber,
            counters,
            mutation: Mutex::new(()),
        }
    }

    /// Point the broadcaster at a relay
    ///
    /// Accepts the tower's detection URL as well as its base URL. An empty
    /// or invalid URL leaves the broadcaster without a relay.
    pub fn set_server_url(&self, url: &str) {
        match Endpoints::from_server_url(url) {
            Ok(Some(endpoints)) => {
                tracing::info!(base = %endpoints.base(), "Server URL set");
                self.target.set(Some(endpoints));
            }
            Ok(None) => {
                tracing::info!("Server URL cleared");
                self.target.set(None);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring invalid server URL");
                self.target.set(None);
            }
        }
    }

    /// Start a new roll
    pub fn start_rolling(&self, payload: RollPayload) -> RollEvent {
        let _guard = lock(&self.mutation);

        let event = RollEvent::rolling(&payload);
        tracing::info!(roll_id = %event.id, player = %event.player_name, "Roll started");

        self.publish(&event);
        event
    }

    /// Show the result of the current roll
    ///
    /// Fields missing from `payload` are inherited from the active roll as
    /// described on [`RollEvent::result`].
    pub fn show_result(&self, payload: RollPayload) -> RollEvent {
        let _guard = lock(&self.mutation);

        let previous = self.state.roll();
        let event = RollEvent::result(&payload, previous.event());
        tracing::info!(roll_id = %event.id, total = ?event.total, "Roll result");

        self.publish(&event);
        event
    }

    /// End the current roll
    pub fn clear_roll(&self) {
        let _guard = lock(&self.mutation);

        self.state.set_roll(RollSlot::Cleared);
        if let Err(e) = self.local.clear() {
            tracing::warn!(error = %e, "Local channel clear failed");
        }
        self.push(PushCommand::Delete);
        tracing::info!("Roll cleared");
    }

    /// Subscribe to the relay, optionally switching to `url` first
    pub fn connect_websocket(&self, url: Option<&str>) {
        if let Some(url) = url.filter(|u| !u.is_empty()) {
            self.set_server_url(url);
        }
        self.subscriber.connect();
    }

    /// Stop the relay subscription and any pending reconnect
    pub fn disconnect_websocket(&self) {
        self.subscriber.disconnect();
    }

    fn publish(&self, event: &RollEvent) {
        self.state.set_roll(RollSlot::Active(event.clone()));
        if let Err(e) = self.local.publish(event) {
            tracing::warn!(error = %e, "Local channel write failed");
        }
        self.push(PushCommand::Post(event.clone()));
    }

    fn push(&self, command: PushCommand) {
        match self.target.get() {
            Some(endpoints) => self.pusher.push(endpoints, command),
            None => tracing::warn!("No server URL configured, skipping push"),
        }
    }

    /// Snapshot of the current roll
    pub fn current_roll(&self) -> RollSlot {
        self.state.roll()
    }

    /// Whether the relay subscription is open
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Last subscription error, cleared when a connection opens
    pub fn connection_error(&self) -> Option<String> {
        self.state.connection_error()
    }

    pub fn watch_roll(&self) -> watch::Receiver<RollSlot> {
        self.state.watch_roll()
    }

    pub fn watch_connected(&self) -> watch::Receiver<bool> {
        self.state.watch_connected()
    }

    pub fn watch_connection_error(&self) -> watch::Receiver<Option<String>> {
        self.state.watch_connection_error()
    }

    /// Base URL of the configured relay
    pub fn base_url(&self) -> Option<String> {
        self.target.get().map(|e| e.base().to_owned())
    }

    /// WebSocket URL of the configured relay
    pub fn stream_url(&self) -> Option<Url> {
        self.target.get().map(|e| e.stream_url().clone())
    }

    /// Key of the local channel
    pub fn storage_key(&self) -> &str {
        self.local.key()
    }

    pub fn stats(&self) -> BroadcastStats {
        self.counters.snapshot()
    }
}
