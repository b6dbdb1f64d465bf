//! Ingestion path: upstream event -> projection -> registry.
//!
//! Each decoded event is validated, projected onto both maps, and only then
//! turned into an [`EewRecord`], so the registry never sees a record without
//! coordinates. Projection happens before the registry lock is taken.

use std::sync::Arc;

use eew2sock_types::{EewEvent, EewRecord};
use tracing::info;

use crate::projection::Projector;
use crate::registry::{EventRegistry, UpsertOutcome};

/// Errors raised while applying a single upstream event.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The event failed validation and was skipped.
    #[error("rejected event {event_id}: {reason}")]
    Rejected {
        /// The upstream event identifier.
        event_id: i64,
        /// Which field was invalid.
        reason: &'static str,
    },
}

/// Applies upstream events to the shared registry.
#[derive(Clone)]
pub struct Ingestor {
    registry: Arc<EventRegistry>,
    projector: Arc<dyn Projector>,
}

impl Ingestor {
    /// Create an ingestor writing into `registry` using `projector`.
    pub fn new(registry: Arc<EventRegistry>, projector: Arc<dyn Projector>) -> Self {
        Self {
            registry,
            projector,
        }
    }

    /// Validate, project, and upsert one event.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Rejected`] if the event has out-of-range or
    /// non-finite values. The registry is left unchanged in that case.
    pub async fn apply(&self, event: &EewEvent) -> Result<UpsertOutcome, IngestError> {
        if let Some(reason) = event.validate() {
            return Err(IngestError::Rejected {
                event_id: event.event_id,
                reason,
            });
        }

        let coordinates = self.projector.project(event.longitude, event.latitude);
        let record = EewRecord::new(event, coordinates);
        let outcome = self.registry.upsert(record).await;

        let label = match outcome {
            UpsertOutcome::Inserted => "New EEW received",
            UpsertOutcome::Updated => "Duplicated EEW received",
        };
        info!(
            event_id = event.event_id,
            origin_time = event.origin_time,
            latitude = %format!("{:.4}", event.latitude),
            longitude = %format!("{:.4}", event.longitude),
            magnitude = %format!("{:.1}", event.magnitude),
            "{label}"
        );

        Ok(outcome)
    }
}

impl std::fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use eew2sock_types::{MapCoordinates, MapPoint};

    use super::*;

    /// Returns the same coordinates for every input.
    struct FixedProjector(MapCoordinates);

    impl Projector for FixedProjector {
        fn project(&self, _longitude: f64, _latitude: f64) -> MapCoordinates {
            self.0
        }
    }

    fn fixed() -> Arc<dyn Projector> {
        Arc::new(FixedProjector(MapCoordinates {
            small: MapPoint { x: 10.0, y: 20.0 },
            large: MapPoint { x: 100.0, y: 200.0 },
        }))
    }

    fn event(event_id: i64, magnitude: f64) -> EewEvent {
        EewEvent {
            event_id,
            origin_time: 1_000,
            latitude: 23.5,
            longitude: 121.0,
            magnitude,
        }
    }

    #[tokio::test]
    async fn applied_event_carries_projected_coordinates() {
        let registry = Arc::new(EventRegistry::new(600));
        let ingestor = Ingestor::new(Arc::clone(&registry), fixed());

        let outcome = ingestor.apply(&event(101, 5.2)).await;
        assert!(matches!(outcome, Ok(UpsertOutcome::Inserted)));

        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        let expected = EewRecord {
            event_id: 101,
            origin_time: 1_000,
            latitude: 23.5,
            longitude: 121.0,
            magnitude: 5.2,
            coordinates: MapCoordinates {
                small: MapPoint { x: 10.0, y: 20.0 },
                large: MapPoint { x: 100.0, y: 200.0 },
            },
        };
        assert_eq!(snapshot.first(), Some(&expected));
    }

    #[tokio::test]
    async fn repeated_event_updates_magnitude() {
        let registry = Arc::new(EventRegistry::new(600));
        let ingestor = Ingestor::new(Arc::clone(&registry), fixed());

        assert!(matches!(ingestor.apply(&event(101, 5.2)).await, Ok(UpsertOutcome::Inserted)));
        assert!(matches!(ingestor.apply(&event(101, 6.0)).await, Ok(UpsertOutcome::Updated)));

        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            snapshot.first().map(|r| r.magnitude.to_bits()),
            Some(6.0_f64.to_bits())
        );
    }

    #[tokio::test]
    async fn invalid_event_leaves_registry_unchanged() {
        let registry = Arc::new(EventRegistry::new(600));
        let ingestor = Ingestor::new(Arc::clone(&registry), fixed());
        ingestor.apply(&event(1, 4.0)).await.ok();

        let mut bad = event(1, 9.9);
        bad.latitude = 123.0;
        let result = ingestor.apply(&bad).await;
        assert!(matches!(result, Err(IngestError::Rejected { event_id: 1, .. })));

        let snapshot = registry.snapshot().await;
        assert_eq!(
            snapshot.first().map(|r| r.magnitude.to_bits()),
            Some(4.0_f64.to_bits())
        );
    }
}
