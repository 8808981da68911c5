//! Roll relay
//!
//! A small server that keeps the latest roll and forwards it from the
//! master screen's pushes to every subscribed player screen. Late joiners
//! receive the current roll as their first frame.

pub mod config;
pub mod hub;
pub mod server;

pub use config::RelayConfig;
pub use hub::RelayHub;
pub use server::RollRelay;
