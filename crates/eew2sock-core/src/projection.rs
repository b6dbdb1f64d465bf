//! Projection of epicenter coordinates onto the two client maps.
//!
//! Geographic coordinates are first projected with the WGS84 equidistant
//! cylindrical projection (`+proj=eqc`), then each map's projected extent is
//! fitted linearly onto its pixel grid. Pixel `x` grows east and pixel `y`
//! grows south, matching the client's screen coordinates.
//!
//! The [`Projector`] trait is the seam used by the ingestion path, so tests
//! and alternative geodesy backends can supply their own implementation.

use eew2sock_types::{MapCoordinates, MapPoint};

use crate::config::{MapExtent, ProjectionConfig};

/// WGS84 semi-major axis in metres.
const WGS84_SEMI_MAJOR_AXIS: f64 = 6_378_137.0;

/// Errors raised while initializing a map projection.
#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    /// A map extent is unusable.
    #[error("invalid {map} map extent: {reason}")]
    InvalidExtent {
        /// Which map (`small` or `large`).
        map: &'static str,
        /// Explanation of what is wrong with the extent.
        reason: String,
    },
}

/// Converts a geographic position into positions on both client maps.
pub trait Projector: Send + Sync {
    /// Project `(longitude, latitude)` in degrees.
    fn project(&self, longitude: f64, latitude: f64) -> MapCoordinates;
}

/// Equidistant cylindrical projection fitted onto two pixel grids.
#[derive(Debug, Clone)]
pub struct EquirectangularProjector {
    small: MapTransform,
    large: MapTransform,
}

impl EquirectangularProjector {
    /// Initialize both map coordinate systems from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::InvalidExtent`] if either map has an
    /// inverted, out-of-range, or zero-sized extent.
    pub fn new(config: &ProjectionConfig) -> Result<Self, ProjectionError> {
        Ok(Self {
            small: MapTransform::new("small", &config.small_map)?,
            large: MapTransform::new("large", &config.large_map)?,
        })
    }
}

impl Projector for EquirectangularProjector {
    fn project(&self, longitude: f64, latitude: f64) -> MapCoordinates {
        let (x, y) = eqc_forward(longitude, latitude);
        MapCoordinates {
            small: self.small.to_pixels(x, y),
            large: self.large.to_pixels(x, y),
        }
    }
}

/// Linear fit from projected metres onto one map's pixel grid.
#[derive(Debug, Clone, Copy)]
struct MapTransform {
    origin_x: f64,
    origin_y: f64,
    pixels_per_metre_x: f64,
    pixels_per_metre_y: f64,
}

impl MapTransform {
    fn new(map: &'static str, extent: &MapExtent) -> Result<Self, ProjectionError> {
        let invalid = |reason: &str| ProjectionError::InvalidExtent {
            map,
            reason: reason.to_owned(),
        };

        let bounds = [extent.min_lon, extent.max_lon, extent.min_lat, extent.max_lat];
        if bounds.iter().any(|v| !v.is_finite()) {
            return Err(invalid("bounds must be finite"));
        }
        if extent.min_lon < -180.0 || extent.max_lon > 180.0 {
            return Err(invalid("longitude bounds outside [-180, 180]"));
        }
        if extent.min_lat < -90.0 || extent.max_lat > 90.0 {
            return Err(invalid("latitude bounds outside [-90, 90]"));
        }
        if extent.min_lon >= extent.max_lon || extent.min_lat >= extent.max_lat {
            return Err(invalid("minimum bound must be below maximum bound"));
        }
        if extent.width == 0 || extent.height == 0 {
            return Err(invalid("pixel size must be non-zero"));
        }

        let (west, south) = eqc_forward(extent.min_lon, extent.min_lat);
        let (east, north) = eqc_forward(extent.max_lon, extent.max_lat);

        Ok(Self {
            origin_x: west,
            origin_y: north,
            pixels_per_metre_x: f64::from(extent.width) / (east - west),
            pixels_per_metre_y: f64::from(extent.height) / (north - south),
        })
    }

    fn to_pixels(self, x: f64, y: f64) -> MapPoint {
        MapPoint {
            x: (x - self.origin_x) * self.pixels_per_metre_x,
            y: (self.origin_y - y) * self.pixels_per_metre_y,
        }
    }
}

/// Forward equidistant cylindrical projection (standard parallel at the
/// equator, central meridian at Greenwich). Returns metres.
fn eqc_forward(longitude: f64, latitude: f64) -> (f64, f64) {
    (
        WGS84_SEMI_MAJOR_AXIS * longitude.to_radians(),
        WGS84_SEMI_MAJOR_AXIS * latitude.to_radians(),
    )
}
