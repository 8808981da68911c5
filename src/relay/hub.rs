//! Relay hub
//!
//! Holds the relay's current roll and fans frames out to every subscriber.

use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::{broadcast, RwLock};

use crate::network::RollFrame;
use crate::roll::RollEvent;

use super::config::RelayConfig;

/// Current roll plus broadcast channel of one relay
///
/// The current roll is what late joiners receive first.
pub struct RelayHub {
    current: RwLock<Option<RollEvent>>,
    tx: broadcast::Sender<RollFrame>,
    subscriber_count: AtomicU32,
}

impl RelayHub {
    pub fn new(config: &RelayConfig) -> Self {
        let (tx, _) = broadcast::channel(config.broadcast_capacity);

        Self {
            current: RwLock::new(None),
            tx,
            subscriber_count: AtomicU32::new(0),
        }
    }

    /// Replace the current roll and broadcast it
    ///
    /// Returns the number of subscribers the frame reached.
    pub async fn publish(&self, event: RollEvent) -> usize {
        let mut current = self.current.write().await;

        tracing::info!(
            roll_id = %event.id,
            status = ?event.status,
            subscribers = self.subscriber_count(),
            "Relaying roll"
        );
        *current = Some(event.clone());
        self.tx.send(RollFrame::Roll(event)).unwrap_or(0)
    }

    /// Clear the current roll and broadcast the clear
    pub async fn clear(&self) -> usize {
        let mut current = self.current.write().await;

        tracing::info!(subscribers = self.subscriber_count(), "Relaying clear");
        *current = None;
        self.tx.send(RollFrame::Clear).unwrap_or(0)
    }

    pub async fn current(&self) -> Option<RollEvent> {
        self.current.read().await.clone()
    }

    /// Frame describing the current state, for catch-up after lag
    pub async fn current_frame(&self) -> RollFrame {
        match self.current().await {
            Some(event) => RollFrame::Roll(event),
            None => RollFrame::Clear,
        }
    }

    /// Subscribe to frames
    ///
    /// Returns the receiver and the current roll. The receiver is created
    /// before the roll is read, so no frame published in between is lost.
    pub async fn subscribe(&self) -> (broadcast::Receiver<RollFrame>, Option<RollEvent>) {
        let rx = self.tx.subscribe();
        let current = self.current().await;

        let count = self.subscriber_count.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(subscribers = count, catchup = current.is_some(), "Subscriber added");

        (rx, current)
    }

    pub fn unsubscribe(&self) {
        let prev = self.subscriber_count.fetch_sub(1, Ordering::Relaxed);
        tracing::debug!(subscribers = prev.saturating_sub(1), "Subscriber removed");
    }

    pub fn subscriber_count(&self) -> u32 {
        self.subscriber_count.load(Ordering::Relaxed)
    }
}

impl Default for RelayHub {
    fn default() -> Self {
        Self::new(&RelayConfig::default())
    }
}
