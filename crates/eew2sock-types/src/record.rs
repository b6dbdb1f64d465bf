//! Registry record and projected map coordinates.

use serde::{Deserialize, Serialize};

use crate::event::EewEvent;

/// A point on a rendered map, in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    /// Horizontal pixel offset (grows east).
    pub x: f64,
    /// Vertical pixel offset (grows south).
    pub y: f64,
}

/// Epicenter position on both client maps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MapCoordinates {
    /// Position on the small-scale (wide area) map.
    pub small: MapPoint,
    /// Position on the large-scale (detail) map.
    pub large: MapPoint,
}

/// A fully-populated EEW record as held by the registry and sent to clients.
///
/// Records are only ever constructed from an event together with its
/// projected coordinates, so a half-populated record cannot exist.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EewRecord {
    /// Upstream event identifier; primary key of the registry.
    pub event_id: i64,
    /// Origin time in UTC epoch seconds.
    pub origin_time: i64,
    /// Epicenter latitude in degrees.
    pub latitude: f64,
    /// Epicenter longitude in degrees.
    pub longitude: f64,
    /// Estimated magnitude.
    pub magnitude: f64,
    /// Projected epicenter on both maps.
    pub coordinates: MapCoordinates,
}

impl EewRecord {
    /// Build a record from an upstream event and its projected coordinates.
    pub const fn new(event: &EewEvent, coordinates: MapCoordinates) -> Self {
        Self {
            event_id: event.event_id,
            origin_time: event.origin_time,
            latitude: event.latitude,
            longitude: event.longitude,
            magnitude: event.magnitude,
            coordinates,
        }
    }

    /// Whether this record has aged out of the retention window at
    /// `threshold` (both in epoch seconds).
    ///
    /// A record stays visible while `origin_time + retention_secs >= threshold`.
    pub const fn is_expired(&self, threshold: i64, retention_secs: i64) -> bool {
        self.origin_time.saturating_add(retention_secs) < threshold
    }
}
