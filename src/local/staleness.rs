//! Staleness filter for persisted rolls
//!
//! The local store outlives the views that write to it, so a roll left
//! behind by an earlier session would otherwise come back as live on the
//! next load. Stored payloads carry their write time in `_ts` and anything
//! older than the freshness window is treated as absent.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::roll::RollEvent;

/// Maximum age of a persisted roll
pub const FRESHNESS_WINDOW: Duration = Duration::from_millis(60_000);

/// A roll as written to the shared store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRoll {
    #[serde(flatten)]
    pub event: RollEvent,
    /// Write time in epoch millis
    #[serde(rename = "_ts")]
    pub written_at: u64,
}

impl StoredRoll {
    pub fn new(event: RollEvent, written_at: u64) -> Self {
        Self { event, written_at }
    }
}

/// Rejects stored payloads older than a fixed window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessFilter {
    window: Duration,
}

impl StalenessFilter {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Check if a payload written at `written_at` is still fresh at `now`
    ///
    /// Both are epoch millis. Write times ahead of `now` count as fresh.
    pub fn accepts(&self, written_at: u64, now: u64) -> bool {
        let age = now.saturating_sub(written_at);
        u128::from(age) <= self.window.as_millis()
    }

    /// Unwrap a stored roll if it is still fresh
    pub fn admit(&self, stored: StoredRoll, now: u64) -> Option<RollEvent> {
        if self.accepts(stored.written_at, now) {
            Some(stored.event)
        } else {
            tracing::debug!(
                roll_id = %stored.event.id,
                age_ms = now.saturating_sub(stored.written_at),
                "Rejected stale roll"
            );
            None
        }
    }
}

impl Default for StalenessFilter {
    fn default() -> Self {
        Self::new(FRESHNESS_WINDOW)
    }
}
