//! Live dice-roll broadcasting for tabletop sessions
//!
//! A game master view publishes the lifecycle of a roll (rolling, result,
//! clear) and any number of player screens observe it. Two transports carry
//! the events:
//!
//! - [`local`]: a shared key-value store with change notification, for views
//!   running on the same device
//! - [`network`]: HTTP pushes to a relay ("tower") and a WebSocket
//!   subscription back from it, with automatic reconnect
//!
//! [`RollBroadcaster`] ties both together behind one API and exposes the
//! current roll as a `tokio::sync::watch` observable.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use roll_broadcast::local::MemoryStore;
//! use roll_broadcast::{BroadcastConfig, RollBroadcaster, RollPayload};
//!
//! # async fn example() {
//! let store = Arc::new(MemoryStore::new());
//! let master = RollBroadcaster::new(BroadcastConfig::default(), store);
//! master.set_server_url("http://192.168.4.1/detect");
//!
//! master.start_rolling(RollPayload::new().player_name("Aria").modifier(2));
//! master.show_result(RollPayload::new().value(14).total(16));
//! master.clear_roll();
//! # }
//! ```

pub mod broadcaster;
pub mod error;
pub mod local;
pub mod network;
pub mod relay;
pub mod roll;
pub mod state;
pub mod stats;

pub use broadcaster::{BroadcastConfig, RollBroadcaster};
pub use error::{Error, Result};
pub use network::NetworkConfig;
pub use relay::{RelayConfig, RollRelay};
pub use roll::{RollEvent, RollId, RollPayload, RollSlot, RollStatus};
pub use stats::BroadcastStats;
