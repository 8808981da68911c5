//! Broadcaster configuration

use std::time::Duration;

use crate::local::{DEFAULT_STORAGE_KEY, FRESHNESS_WINDOW};
use crate::network::NetworkConfig;

/// Options for one [`RollBroadcaster`](super::RollBroadcaster)
#[derive(Debug, Clone)]
pub struct BroadcastConfig {
    /// Shared-store key holding the current roll
    pub storage_key: String,

    /// Maximum age of a stored roll before it is ignored
    pub freshness_window: Duration,

    /// Push and subscription options
    pub network: NetworkConfig,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_owned(),
            freshness_window: FRESHNESS_WINDOW,
            network: NetworkConfig::default(),
        }
    }
}

impl BroadcastConfig {
    /// Set the storage key, e.g. one key per tower
    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Set the freshness window
    pub fn freshness_window(mut self, window: Duration) -> Self {
        self.freshness_window = window;
        self
    }

    /// Set the network options
    pub fn network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    /// Set the reconnect delay of the subscription
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.network.reconnect_delay = delay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BroadcastConfig::default();

        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.freshness_window, Duration::from_secs(60));
        assert_eq!(config.network.reconnect_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_builder_chaining() {
        let config = BroadcastConfig::default()
            .storage_key("roll:tower-2")
            .freshness_window(Duration::from_secs(5))
            .reconnect_delay(Duration::from_millis(100));

        assert_eq!(config.storage_key, "roll:tower-2");
        assert_eq!(config.freshness_window, Duration::from_secs(5));
        assert_eq!(config.network.reconnect_delay, Duration::from_millis(100));
    }
}
