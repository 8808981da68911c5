//! Error types
//!
//! Most failures in this crate are logged and swallowed at the
//! [`RollBroadcaster`](crate::RollBroadcaster) boundary. The types here are
//! what the internal operations return before that happens.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for broadcast operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request could not be sent or completed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("server returned status {0}")]
    Status(u16),

    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Payload could not be encoded or decoded
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Store or socket I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Server URL could not be parsed
    #[error("invalid server URL: {0}")]
    InvalidUrl(String),

    /// A network operation was attempted without a server URL
    #[error("no server URL configured")]
    NotConfigured,
}

impl Error {
    /// Whether this error came from the transport rather than the payload
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Status(_) | Error::WebSocket(_) | Error::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Error::Status(503).to_string(), "server returned status 503");
        assert_eq!(Error::NotConfigured.to_string(), "no server URL configured");
        assert_eq!(
            Error::InvalidUrl("nope".into()).to_string(),
            "invalid server URL: nope"
        );
    }

    #[test]
    fn test_is_transport() {
        assert!(Error::Status(500).is_transport());
        assert!(!Error::NotConfigured.is_transport());

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!Error::from(json_err).is_transport());
    }
}
