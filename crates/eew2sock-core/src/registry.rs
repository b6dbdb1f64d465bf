//! Shared registry of active EEW records.
//!
//! The registry is the only mutable state shared between the ingestion
//! task, the maintenance loop, and every WebSocket connection handler. All
//! access goes through one [`RwLock`]: upserts and evictions take the write
//! half, snapshots take the read half so concurrent readers never block each
//! other. No lock is held across I/O; callers project before inserting and
//! serialize after snapshotting.
//!
//! # Invariants
//!
//! - At most one record per `event_id`.
//! - Iteration order is first-seen order; replacing a record keeps its slot.
//! - Records are only removed by [`EventRegistry::evict_older_than`].

use eew2sock_types::EewRecord;
use tokio::sync::RwLock;

/// Whether an upsert created a new entry or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The event id was not present; the record was appended.
    Inserted,
    /// The event id was present; the record was replaced in place.
    Updated,
}

/// Time-bounded, insertion-ordered collection of active EEW records.
#[derive(Debug)]
pub struct EventRegistry {
    records: RwLock<Vec<EewRecord>>,
    retention_secs: i64,
}

impl EventRegistry {
    /// Create an empty registry that keeps records for `retention_secs`
    /// after their origin time.
    pub fn new(retention_secs: i64) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            retention_secs,
        }
    }

    /// Insert a new record or replace the stored record with the same
    /// `event_id`, keeping its position.
    pub async fn upsert(&self, record: EewRecord) -> UpsertOutcome {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.event_id == record.event_id) {
            Some(existing) => {
                *existing = record;
                UpsertOutcome::Updated
            }
            None => {
                records.push(record);
                UpsertOutcome::Inserted
            }
        }
    }

    /// Remove every record whose `origin_time + retention` is earlier than
    /// `threshold` (epoch seconds). Returns the number of records removed.
    pub async fn evict_older_than(&self, threshold: i64) -> usize {
        let retention = self.retention_secs;
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| !r.is_expired(threshold, retention));
        before.saturating_sub(records.len())
    }

    /// Copy of all records in first-seen order, consistent as of one
    /// instant.
    pub async fn snapshot(&self) -> Vec<EewRecord> {
        self.records.read().await.clone()
    }

    /// Number of records currently held.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the registry holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}
