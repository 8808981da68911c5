//! Cross-device transport through a relay
//!
//! ```text
//!   [Master view]                 [Relay / tower]               [Player screen]
//!   RollPusher ──POST /roll────►  current roll  ──/ws/roll──►  RollSubscriber
//!              ──DELETE /roll──►  broadcast     ──frames────►  RollState
//! ```
//!
//! The push path is best-effort: failures are logged and the master keeps
//! its local state. The subscribe path reconnects on its own after any close
//! that was not a manual disconnect.

pub mod config;
pub mod endpoint;
pub mod frame;
pub mod push;
pub mod subscriber;

pub use config::{NetworkConfig, MANUAL_CLOSE_CODE, MANUAL_CLOSE_REASON, RECONNECT_DELAY};
pub use endpoint::{base_url, Endpoints, ServerTarget};
pub use frame::RollFrame;
pub use push::{PushCommand, RollPusher};
pub use subscriber::RollSubscriber;
