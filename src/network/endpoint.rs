//! Relay endpoint derivation
//!
//! Towers are usually configured with the URL of their detection route
//! (`http://tower.local/detect`). The roll endpoints hang off the same base:
//!
//! ```text
//!   http://tower.local:8000/detect/best
//!     base   = http://tower.local:8000
//!     push   = http://tower.local:8000/roll
//!     stream =   ws://tower.local:8000/ws/roll
//! ```

use std::sync::{Arc, RwLock};

use url::Url;

use crate::error::{Error, Result};

/// Detection routes stripped from a configured server URL, longest first
const DETECT_SUFFIXES: [&str; 2] = ["/detect/best", "/detect"];

/// Base URL with any detection route and trailing slashes removed
pub fn base_url(server_url: &str) -> String {
    let mut url = server_url.trim().trim_end_matches('/');
    for suffix in DETECT_SUFFIXES {
        if let Some(stripped) = url.strip_suffix(suffix) {
            url = stripped;
            break;
        }
    }
    url.trim_end_matches('/').to_owned()
}

/// Push and stream endpoints of one relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: String,
    roll: Url,
    stream: Url,
}

impl Endpoints {
    /// Derive endpoints from a configured server URL
    ///
    /// Returns `Ok(None)` for an empty URL. The base must use `http` or
    /// `https`; the stream endpoint uses `ws` or `wss` respectively.
    pub fn from_server_url(server_url: &str) -> Result<Option<Self>> {
        let base = base_url(server_url);
        if base.is_empty() {
            return Ok(None);
        }

        let stream_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            return Err(Error::InvalidUrl(format!(
                "{}: expected an http or https URL",
                server_url
            )));
        };

        let roll = parse(&format!("{}/roll", base), server_url)?;
        let stream = parse(&format!("{}/ws/roll", stream_base), server_url)?;

        Ok(Some(Self { base, roll, stream }))
    }

    /// Base URL the endpoints were derived from
    pub fn base(&self) -> &str {
        &self.base
    }

    /// `POST`/`DELETE` target
    pub fn roll_url(&self) -> &Url {
        &self.roll
    }

    /// WebSocket subscription target
    pub fn stream_url(&self) -> &Url {
        &self.stream
    }
}

fn parse(candidate: &str, server_url: &str) -> Result<Url> {
    Url::parse(candidate).map_err(|e| Error::InvalidUrl(format!("{}: {}", server_url, e)))
}

/// The relay a broadcaster currently talks to
///
/// Shared between the facade, the push worker and the subscription task,
/// so a URL change is seen by the next push and the next reconnect.
#[derive(Debug, Clone, Default)]
pub struct ServerTarget {
    inner: Arc<RwLock<Option<Endpoints>>>,
}

impl ServerTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point at a new relay, or at none
    pub fn set(&self, endpoints: Option<Endpoints>) {
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = endpoints;
    }

    /// Current endpoints, if a relay is configured
    pub fn get(&self) -> Option<Endpoints> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_configured(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_strips_detect_routes() {
        assert_eq!(base_url("http://tower.local/detect"), "http://tower.local");
        assert_eq!(base_url("http://tower.local/detect/best"), "http://tower.local");
        assert_eq!(base_url("http://tower.local/detect/"), "http://tower.local");
        assert_eq!(base_url("http://tower.local/"), "http://tower.local");
        assert_eq!(base_url("  http://tower.local:8000  "), "http://tower.local:8000");
        assert_eq!(base_url("http://tower.local/api/detect"), "http://tower.local/api");
        assert_eq!(base_url("http://tower.local/detector"), "http://tower.local/detector");
        assert_eq!(base_url(""), "");
    }

    #[test]
    fn test_endpoints_http() {
        let endpoints = Endpoints::from_server_url("http://192.168.4.1:8000/detect")
            .unwrap()
            .unwrap();

        assert_eq!(endpoints.base(), "http://192.168.4.1:8000");
        assert_eq!(endpoints.roll_url().as_str(), "http://192.168.4.1:8000/roll");
        assert_eq!(endpoints.stream_url().as_str(), "ws://192.168.4.1:8000/ws/roll");
    }

    #[test]
    fn test_endpoints_https() {
        let endpoints = Endpoints::from_server_url("https://tower.example/")
            .unwrap()
            .unwrap();

        assert_eq!(endpoints.roll_url().as_str(), "https://tower.example/roll");
        assert_eq!(endpoints.stream_url().as_str(), "wss://tower.example/ws/roll");
    }

    #[test]
    fn test_endpoints_empty_is_unconfigured() {
        assert!(Endpoints::from_server_url("").unwrap().is_none());
        assert!(Endpoints::from_server_url("/detect").unwrap().is_none());
    }

    #[test]
    fn test_endpoints_invalid() {
        assert!(matches!(
            Endpoints::from_server_url("ftp://tower.local"),
            Err(Error::InvalidUrl(_))
        ));
        assert!(matches!(
            Endpoints::from_server_url("http://"),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_server_target_is_shared() {
        let target = ServerTarget::new();
        let view = target.clone();
        assert!(!view.is_configured());

        let endpoints = Endpoints::from_server_url("http://tower.local").unwrap();
        target.set(endpoints.clone());
        assert_eq!(view.get(), endpoints);

        target.set(None);
        assert!(!view.is_configured());
    }
}
