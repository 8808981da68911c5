//! Network transport configuration

use std::time::Duration;

/// Delay before reconnecting after an abnormal close
pub const RECONNECT_DELAY: Duration = Duration::from_millis(2_000);

/// Close code sent on manual disconnect; suppresses auto-reconnect
pub const MANUAL_CLOSE_CODE: u16 = 1000;

/// Close reason sent on manual disconnect
pub const MANUAL_CLOSE_REASON: &str = "Manual disconnect";

/// Network transport options
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Wait between an abnormal close and the next connection attempt
    pub reconnect_delay: Duration,

    /// Timeout for each push request
    pub request_timeout: Duration,

    /// Reason string sent with the manual close frame
    pub manual_close_reason: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: RECONNECT_DELAY,
            request_timeout: Duration::from_secs(5),
            manual_close_reason: MANUAL_CLOSE_REASON.to_owned(),
        }
    }
}

impl NetworkConfig {
    /// Set the reconnect delay
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set the push request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the manual close reason
    pub fn manual_close_reason(mut self, reason: impl Into<String>) -> Self {
        self.manual_close_reason = reason.into();
        self
    }
}
