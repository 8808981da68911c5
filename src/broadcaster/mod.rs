//! One publish API over both transports
//!
//! Every view (master or player screen) owns a [`RollBroadcaster`]. Roll
//! mutations update the view's own state first, then the local channel,
//! then queue a push to the relay:
//!
//! ```text
//!   start_rolling / show_result / clear_roll
//!        │
//!        ├─1─► RollState (watch)         observed by this view's UI
//!        ├─2─► LocalChannel::publish     observed by other views on the device
//!        └─3─► RollPusher (if URL set)   relayed to remote player screens
//! ```

pub mod config;
pub mod facade;

pub use config::BroadcastConfig;
pub use facade::RollBroadcaster;
