//! Statistics for roll broadcasting

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared between a broadcaster and its background tasks
#[derive(Debug, Default)]
pub struct BroadcastCounters {
    pushes_sent: AtomicU64,
    pushes_failed: AtomicU64,
    connect_attempts: AtomicU64,
    reconnects_scheduled: AtomicU64,
    frames_received: AtomicU64,
    malformed_frames: AtomicU64,
}

impl BroadcastCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_sent(&self) {
        self.pushes_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn push_failed(&self) {
        self.pushes_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn connect_attempt(&self) {
        self.connect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn reconnect_scheduled(&self) {
        self.reconnects_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn malformed_frame(&self) {
        self.malformed_frames.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of every counter
    pub fn snapshot(&self) -> BroadcastStats {
        BroadcastStats {
            pushes_sent: self.pushes_sent.load(Ordering::Relaxed),
            pushes_failed: self.pushes_failed.load(Ordering::Relaxed),
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            reconnects_scheduled: self.reconnects_scheduled.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            malformed_frames: self.malformed_frames.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of broadcast activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastStats {
    /// Pushes the relay accepted
    pub pushes_sent: u64,
    /// Pushes that failed in transport or got a non-success status
    pub pushes_failed: u64,
    /// WebSocket connection attempts, including reconnects
    pub connect_attempts: u64,
    /// Reconnects scheduled after an abnormal close
    pub reconnects_scheduled: u64,
    /// Text or binary frames read from the subscription
    pub frames_received: u64,
    /// Frames dropped because they did not parse
    pub malformed_frames: u64,
}

impl BroadcastStats {
    /// Fraction of pushes that succeeded, if any were attempted
    pub fn push_success_rate(&self) -> Option<f64> {
        let total = self.pushes_sent + self.pushes_failed;
        if total > 0 {
            Some(self.pushes_sent as f64 / total as f64)
        } else {
            None
        }
    }
}
