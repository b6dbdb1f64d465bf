//! Periodic eviction of aged-out records.
//!
//! Once per period the loop computes `threshold = now - alignment_offset`
//! and evicts every record whose `origin_time + retention` falls before it.
//! The loop runs for the lifetime of the process; a tick that evicts
//! nothing is a no-op.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::registry::EventRegistry;

/// Drives eviction on the shared registry.
#[derive(Debug, Clone)]
pub struct Maintenance {
    registry: Arc<EventRegistry>,
    alignment_offset_secs: i64,
    period: Duration,
}

impl Maintenance {
    /// Create a maintenance loop over `registry`.
    ///
    /// The retention window itself belongs to the registry; the loop only
    /// supplies the clock offset and the tick period.
    pub fn new(
        registry: Arc<EventRegistry>,
        alignment_offset_secs: i64,
        interval_ms: u64,
    ) -> Self {
        Self {
            registry,
            alignment_offset_secs,
            period: Duration::from_millis(interval_ms.max(1)),
        }
    }

    /// The eviction threshold for wall-clock time `now` (epoch seconds).
    pub const fn threshold_at(&self, now: i64) -> i64 {
        now.saturating_sub(self.alignment_offset_secs)
    }

    /// Run one eviction pass as if the wall clock read `now`.
    ///
    /// Returns the number of records evicted.
    pub async fn tick_at(&self, now: i64) -> usize {
        let threshold = self.threshold_at(now);
        let evicted = self.registry.evict_older_than(threshold).await;
        if evicted > 0 {
            info!(evicted, threshold, "Expired EEW records evicted");
        }
        evicted
    }

    /// Run forever, ticking once per period against the UTC wall clock.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(period_ms = self.period.as_millis(), "Maintenance loop started");
        loop {
            interval.tick().await;
            self.tick_at(Utc::now().timestamp()).await;
        }
    }

    /// Spawn [`run`](Self::run) on a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use eew2sock_types::{EewEvent, EewRecord, MapCoordinates};

    use super::*;

    fn record(event_id: i64, origin_time: i64) -> EewRecord {
        let event = EewEvent {
            event_id,
            origin_time,
            latitude: 23.5,
            longitude: 121.0,
            magnitude: 5.2,
        };
        EewRecord::new(&event, MapCoordinates::default())
    }

    #[tokio::test]
    async fn tick_evicts_only_after_window() {
        let registry = Arc::new(EventRegistry::new(600));
        registry.upsert(record(101, 1_000)).await;
        let maintenance = Maintenance::new(Arc::clone(&registry), 0, 1_000);

        assert_eq!(maintenance.tick_at(1_500).await, 0);
        assert_eq!(registry.len().await, 1);

        assert_eq!(maintenance.tick_at(1_700).await, 1);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn alignment_offset_delays_eviction() {
        let registry = Arc::new(EventRegistry::new(600));
        registry.upsert(record(101, 1_000)).await;
        let maintenance = Maintenance::new(Arc::clone(&registry), 150, 1_000);

        // 1700 - 150 = 1550, still within 1000 + 600.
        assert_eq!(maintenance.tick_at(1_700).await, 0);
        // 1760 - 150 = 1610, past the window.
        assert_eq!(maintenance.tick_at(1_760).await, 1);
    }

    #[tokio::test]
    async fn presence_matches_retention_condition() {
        // Present iff now - offset <= origin + retention.
        let offset = 30;
        let window = 100;
        for now in [1_100, 1_129, 1_130, 1_131, 1_200] {
            let registry = Arc::new(EventRegistry::new(window));
            registry.upsert(record(1, 1_000)).await;
            Maintenance::new(Arc::clone(&registry), offset, 1_000)
                .tick_at(now)
                .await;
            let expected = now - offset <= 1_000 + window;
            assert_eq!(!registry.is_empty().await, expected, "now = {now}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_loop_evicts_stale_records() {
        let registry = Arc::new(EventRegistry::new(600));
        // Origin far in the past relative to the real wall clock.
        registry.upsert(record(1, 0)).await;
        let handle = Maintenance::new(Arc::clone(&registry), 0, 1_000).spawn();

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert!(registry.is_empty().await);
        handle.abort();
    }

    #[tokio::test]
    async fn window_comes_from_registry() {
        let registry = Arc::new(EventRegistry::new(100));
        registry.upsert(record(1, 1_000)).await;
        let maintenance = Maintenance::new(Arc::clone(&registry), 0, 1_000);

        assert_eq!(maintenance.tick_at(1_100).await, 0);
        assert_eq!(maintenance.tick_at(1_101).await, 1);
    }

    #[test]
    fn zero_interval_is_clamped() {
        let maintenance = Maintenance::new(Arc::new(EventRegistry::new(600)), 0, 0);
        assert_eq!(maintenance.period, Duration::from_millis(1));
    }
}
