//! Upstream earthquake early-warning event.
//!
//! The message bus delivers one JSON object per event revision. Only the
//! fields the bridge needs are decoded; unknown fields are ignored so that
//! upstream producers can add metadata without breaking ingestion.

use serde::{Deserialize, Serialize};

/// Valid latitude range in degrees.
const LATITUDE_RANGE: core::ops::RangeInclusive<f64> = -90.0..=90.0;

/// Valid longitude range in degrees.
const LONGITUDE_RANGE: core::ops::RangeInclusive<f64> = -180.0..=180.0;

/// A decoded EEW event as received from the message bus.
///
/// Repeated deliveries with the same [`event_id`](Self::event_id) are
/// revisions of the same earthquake (e.g. a magnitude update).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EewEvent {
    /// Upstream event identifier.
    pub event_id: i64,
    /// Origin time in UTC epoch seconds.
    pub origin_time: i64,
    /// Epicenter latitude in degrees.
    pub latitude: f64,
    /// Epicenter longitude in degrees.
    pub longitude: f64,
    /// Estimated magnitude.
    pub magnitude: f64,
}

impl EewEvent {
    /// Returns a description of the first invalid field, or `None` if the
    /// event can be projected and stored.
    pub fn validate(&self) -> Option<&'static str> {
        if !self.latitude.is_finite() || !LATITUDE_RANGE.contains(&self.latitude) {
            return Some("latitude out of range");
        }
        if !self.longitude.is_finite() || !LONGITUDE_RANGE.contains(&self.longitude) {
            return Some("longitude out of range");
        }
        if !self.magnitude.is_finite() {
            return Some("magnitude is not finite");
        }
        None
    }
}
