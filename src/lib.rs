//! # Run Tracker
//!
//! GPS run tracking, route geometry, and route privacy core for mobile fitness apps.
//!
//! This library provides:
//! - The run lifecycle state machine (countdown, running, paused, ended) with
//!   live distance/pace/speed derived from raw GPS fixes
//! - Google polyline encoding/decoding and map-region fitting for route display
//! - The route visibility policy (owner / follower / stranger) and the
//!   schematic re-projection shown to followers
//!
//! ## Features
//!
//! - **`runtime`** (default) - Async session controller: tick timer, serialized
//!   fix dispatch, and the persistence handoff
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use run_tracker::{ActivityType, LocationFix, RunSession};
//!
//! let mut session = RunSession::new(ActivityType::Run);
//! session.start().unwrap();
//!
//! assert!(session.on_location_update(LocationFix::new(51.5074, -0.1278, 0)).is_accepted());
//! assert!(session.on_location_update(LocationFix::new(51.5080, -0.1278, 10_000)).is_accepted());
//!
//! let finished = session.end().unwrap();
//! println!("{:.3} km in {} s", finished.distance_km, finished.duration_seconds);
//! println!("route: {}", finished.encoded_polyline);
//! ```

use serde::{Deserialize, Serialize};

pub mod format;
pub mod geo_utils;
pub mod polyline;
pub mod session;
pub mod visibility;

pub use polyline::{decode_route, encode_route, PolylineError, PRECISION};
pub use session::{
    ActivityType, FinishedRun, FixOutcome, RejectReason, RunSession, RunStatus, SessionError,
};
pub use visibility::{
    render_plan, schematic_points, visibility_for, FramePoint, RouteRenderPlan, RouteVisibility,
};

// Async session controller and persistence contract
#[cfg(feature = "runtime")]
pub mod controller;
#[cfg(feature = "runtime")]
pub mod persist;

#[cfg(feature = "runtime")]
pub use controller::{ControllerConfig, PostError, SessionController, SessionSnapshot};
#[cfg(feature = "runtime")]
pub use persist::{NewRunPost, PostId, PostVisibility, RunStore, StoreError};

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("RunTrackerRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A geographic coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use run_tracker::Coordinate;
/// let point = Coordinate::new(51.5074, -0.1278); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Create a new coordinate.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// A single raw GPS sample as delivered by the platform location feed.
///
/// Fixes arrive in delivery order, which is not guaranteed to match
/// `timestamp_ms` order; the session filters late and duplicated samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Sample time in milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    /// Reported horizontal accuracy in meters, when the platform provides it.
    pub accuracy_m: Option<f64>,
    /// Reported ground speed in meters per second, when the platform provides it.
    pub speed_mps: Option<f64>,
}

impl LocationFix {
    /// Create a fix without accuracy or speed readings.
    pub fn new(latitude: f64, longitude: f64, timestamp_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp_ms,
            accuracy_m: None,
            speed_mps: None,
        }
    }

    /// Create a fix carrying the platform's accuracy and speed readings.
    pub fn with_readings(
        latitude: f64,
        longitude: f64,
        timestamp_ms: i64,
        accuracy_m: Option<f64>,
        speed_mps: Option<f64>,
    ) -> Self {
        Self {
            latitude,
            longitude,
            timestamp_ms,
            accuracy_m,
            speed_mps,
        }
    }

    /// The position of this fix, without time or quality readings.
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// Check if the fix position is a valid coordinate.
    pub fn is_valid(&self) -> bool {
        self.coordinate().is_valid()
    }
}

/// A map viewport: center plus latitude/longitude span.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Region {
    pub latitude: f64,
    pub longitude: f64,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl Region {
    /// Fallback viewport used when there are no coordinates to fit.
    pub const DEFAULT: Region = Region {
        latitude: 0.0,
        longitude: 0.0,
        latitude_delta: 0.05,
        longitude_delta: 0.05,
    };
}

impl Default for Region {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ============================================================================
// FFI Exports (only when feature enabled)
// ============================================================================

#[cfg(feature = "ffi")]
mod ffi {
    use super::*;
    use log::{info, warn};

    /// Encode a route as a precision-5 polyline string.
    #[uniffi::export]
    pub fn ffi_encode_route(points: Vec<Coordinate>) -> String {
        init_logging();
        info!("[RunTrackerRust] encode_route called with {} points", points.len());
        encode_route(&points)
    }

    /// Decode a precision-5 polyline string.
    ///
    /// Malformed input decodes to an empty route on the binding side; use
    /// [`ffi_try_decode_route`] when the failure reason matters.
    #[uniffi::export]
    pub fn ffi_decode_route(encoded: String) -> Vec<Coordinate> {
        init_logging();
        match decode_route(&encoded) {
            Ok(points) => points,
            Err(e) => {
                warn!("[RunTrackerRust] decode_route failed: {e}");
                Vec::new()
            }
        }
    }

    /// Decode a precision-5 polyline string, surfacing malformed input as a
    /// thrown error on the binding side.
    #[uniffi::export]
    pub fn ffi_try_decode_route(encoded: String) -> Result<Vec<Coordinate>, PolylineError> {
        init_logging();
        decode_route(&encoded)
    }

    /// Fit a padded map region around a route.
    #[uniffi::export]
    pub fn ffi_fit_region(points: Vec<Coordinate>) -> Region {
        geo_utils::fit_region_default(&points)
    }

    /// Resolve what route geometry a viewer may see.
    #[uniffi::export]
    pub fn ffi_visibility_for(
        viewer_id: String,
        owner_id: String,
        is_follower: bool,
    ) -> RouteVisibility {
        visibility_for(&viewer_id, &owner_id, is_follower)
    }

    /// Project a route into a width x height pixel frame for schematic rendering.
    #[uniffi::export]
    pub fn ffi_schematic_points(points: Vec<Coordinate>, width: f64, height: f64) -> Vec<FramePoint> {
        schematic_points(&points, width, height)
    }

    /// Format a distance in kilometers for display.
    #[uniffi::export]
    pub fn ffi_format_distance(km: f64) -> String {
        format::format_distance_km(km)
    }

    /// Format an elapsed duration in seconds for display.
    #[uniffi::export]
    pub fn ffi_format_duration(seconds: u64) -> String {
        format::format_duration(seconds)
    }

    /// Format a pace in minutes per kilometer for display.
    #[uniffi::export]
    pub fn ffi_format_pace(min_per_km: Option<f64>) -> String {
        format::format_pace(min_per_km)
    }

    /// Format a speed in kilometers per hour for display.
    #[uniffi::export]
    pub fn ffi_format_speed(kmh: f64) -> String {
        format::format_speed_kmh(kmh)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_try_decode_surfaces_the_error() {
            // A latitude with no longitude throws instead of decoding to empty
            assert!(matches!(
                ffi_try_decode_route("_p~iF".to_string()),
                Err(PolylineError::OddTermination)
            ));
            assert_eq!(ffi_decode_route("_p~iF".to_string()), Vec::new());
        }

        #[test]
        fn test_format_speed_passes_through() {
            assert_eq!(ffi_format_speed(10.44), "10.4 km/h");
        }
    }
}
