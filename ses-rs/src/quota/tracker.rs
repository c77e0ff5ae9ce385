use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::storage::ScoredSetStore;

/// Store key holding one member per tracked send
const SENDS_KEY: &str = "email_sends";

/// Read side of the tracker, as seen by the quota validator
#[async_trait]
pub trait WindowCounter: Send + Sync {
    /// Number of sends within the trailing window
    async fn count_in_window(&self) -> Result<u64>;
}

/// Tracks sends in a timestamp-scored set and counts the trailing window
pub struct QuotaTracker {
    store: Arc<dyn ScoredSetStore>,
    window_secs: i64,
    clock: Arc<dyn Clock>,
}

impl QuotaTracker {
    /// Create a tracker using the wall clock
    pub fn new(store: Arc<dyn ScoredSetStore>, window: Duration) -> Self {
        Self::with_clock(store, window, Arc::new(SystemClock))
    }

    /// Create a tracker with a custom clock
    pub fn with_clock(store: Arc<dyn ScoredSetStore>, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            window_secs: i64::try_from(window.as_secs()).unwrap_or(i64::MAX),
            clock,
        }
    }

    /// Lower edge of the window for the given instant
    fn window_floor(&self, now: i64) -> i64 {
        now.saturating_sub(self.window_secs)
    }

    /// Record one send, then prune entries that fell out of the window
    ///
    /// `member` must be unique per (message, recipient); re-using a member
    /// only moves its timestamp.
    pub async fn track_send(&self, member: &str) -> Result<()> {
        let now = self.clock.now();
        self.store.add(SENDS_KEY, now, member).await?;
        self.cleanup().await?;
        Ok(())
    }

    /// Count sends with `now - window <= score <= now`
    pub async fn count_in_window(&self) -> Result<u64> {
        let now = self.clock.now();
        self.store
            .count_between(SENDS_KEY, self.window_floor(now), now)
            .await
    }

    /// Remove sends older than the window floor
    pub async fn cleanup(&self) -> Result<u64> {
        let floor = self.window_floor(self.clock.now());
        let removed = self.store.remove_below(SENDS_KEY, floor).await?;
        if removed > 0 {
            debug!("Pruned {} quota entries older than {}", removed, floor);
        }
        Ok(removed)
    }
}

#[async_trait]
impl WindowCounter for QuotaTracker {
    async fn count_in_window(&self) -> Result<u64> {
        QuotaTracker::count_in_window(self).await
    }
}
