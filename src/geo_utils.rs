//! # Geographic Utilities
//!
//! Core geographic computation for GPS run tracks.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two points |
//! | [`track_length`] | Total length of a GPS track in meters |
//! | [`compute_bounds`] | Bounding box of a track |
//! | [`fit_region`] | Padded map viewport around a track |
//!
//! ## Algorithm Notes
//!
//! Distance uses the haversine formula on a spherical Earth (mean radius
//! 6,371 km), the standard for GPS trajectories and accurate to within 0.3%.
//! Ellipsoidal correction is deliberately not applied; run-length distances
//! do not need it.
//!
//! All functions expect WGS84 coordinates (latitude/longitude in degrees),
//! which is what GPS receivers deliver.

use crate::{Coordinate, Region};
use geo::{Distance, Haversine, Point};

/// Floor applied to fitted region deltas.
///
/// Prevents a degenerate zero-size viewport when a track has a single point
/// or all points coincide.
pub const MIN_REGION_DELTA: f64 = 0.01;

/// Padding factor applied by [`fit_region_default`].
pub const DEFAULT_PADDING_FACTOR: f64 = 1.5;

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two points using the Haversine formula.
///
/// Returns the distance in meters along the Earth's surface.
///
/// # Example
///
/// ```rust
/// use run_tracker::{Coordinate, geo_utils};
///
/// let london = Coordinate::new(51.5074, -0.1278);
/// let paris = Coordinate::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0); // ~344 km
/// ```
#[inline]
pub fn haversine_distance(p1: &Coordinate, p2: &Coordinate) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Calculate the total length of a GPS track in meters.
///
/// Sums the haversine distance between consecutive points. Empty or
/// single-point tracks return 0.0.
pub fn track_length(points: &[Coordinate]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

// =============================================================================
// Bounding Box / Region Functions
// =============================================================================

/// Bounding box of a track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Get the center point of the bounds.
    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    /// Latitude span of the bounds.
    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Longitude span of the bounds.
    pub fn lng_span(&self) -> f64 {
        self.max_lng - self.min_lng
    }
}

/// Compute the bounding box of a track.
///
/// Returns `None` for empty input.
pub fn compute_bounds(points: &[Coordinate]) -> Option<Bounds> {
    if points.is_empty() {
        return None;
    }

    let mut min_lat = f64::MAX;
    let mut max_lat = f64::MIN;
    let mut min_lng = f64::MAX;
    let mut max_lng = f64::MIN;

    for p in points {
        min_lat = min_lat.min(p.latitude);
        max_lat = max_lat.max(p.latitude);
        min_lng = min_lng.min(p.longitude);
        max_lng = max_lng.max(p.longitude);
    }

    Some(Bounds { min_lat, max_lat, min_lng, max_lng })
}

/// Fit a map viewport around a track.
///
/// Centers the region on the bounding-box midpoint and pads each span by
/// `padding_factor` so the route does not touch the viewport edges. Deltas
/// are floored at [`MIN_REGION_DELTA`] so single-point and coincident-point
/// tracks still produce a usable viewport.
///
/// Empty input returns [`Region::DEFAULT`]. That is the documented fallback
/// for routes with no geometry, not an error.
///
/// # Example
///
/// ```rust
/// use run_tracker::{Coordinate, geo_utils};
///
/// let track = vec![
///     Coordinate::new(51.500, -0.130),
///     Coordinate::new(51.510, -0.120),
/// ];
///
/// let region = geo_utils::fit_region(&track, 1.5);
/// assert!((region.latitude - 51.505).abs() < 1e-9);
/// assert!((region.latitude_delta - 0.015).abs() < 1e-9);
/// ```
pub fn fit_region(points: &[Coordinate], padding_factor: f64) -> Region {
    let Some(bounds) = compute_bounds(points) else {
        return Region::DEFAULT;
    };

    let center = bounds.center();
    Region {
        latitude: center.latitude,
        longitude: center.longitude,
        latitude_delta: (bounds.lat_span() * padding_factor).max(MIN_REGION_DELTA),
        longitude_delta: (bounds.lng_span() * padding_factor).max(MIN_REGION_DELTA),
    }
}

/// [`fit_region`] with the standard padding factor of 1.5.
#[inline]
pub fn fit_region_default(points: &[Coordinate]) -> Region {
    fit_region(points, DEFAULT_PADDING_FACTOR)
}

// =============================================================================
// Unit Tests
// =============================================================================
