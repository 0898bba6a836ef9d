//! # Display Formatting
//!
//! Presentation helpers for the tracking screens: distance, duration, pace,
//! and speed strings, plus the unit conversions between them.
//!
//! All pace math in the library is minutes per kilometer; the mile
//! conversion here exists for presentation layers that prefer imperial
//! units and is not used by the core accumulation.

/// Meters in one mile, for pace conversion.
const METERS_PER_MILE: f64 = 1609.344;

// =============================================================================
// Conversions
// =============================================================================

/// Meters per second to kilometers per hour.
#[inline]
pub fn mps_to_kmh(mps: f64) -> f64 {
    mps * 3.6
}

/// Pace (min/km) from a speed in km/h. `None` for zero or negative speed.
pub fn pace_from_speed_kmh(kmh: f64) -> Option<f64> {
    if kmh > 0.0 {
        Some(60.0 / kmh)
    } else {
        None
    }
}

/// Speed in km/h from a pace in min/km. `None` for zero or negative pace.
pub fn speed_from_pace(min_per_km: f64) -> Option<f64> {
    if min_per_km > 0.0 {
        Some(60.0 / min_per_km)
    } else {
        None
    }
}

/// Convert a pace from minutes per kilometer to minutes per mile.
#[inline]
pub fn min_per_km_to_min_per_mile(min_per_km: f64) -> f64 {
    min_per_km * METERS_PER_MILE / 1000.0
}

// =============================================================================
// Display Strings
// =============================================================================

/// Format a distance for display: `"5.24 km"`, or `"320 m"` under one
/// kilometer.
pub fn format_distance_km(km: f64) -> String {
    if km < 1.0 {
        format!("{:.0} m", km * 1000.0)
    } else {
        format!("{km:.2} km")
    }
}

/// Format an elapsed duration as `"12:03"`, or `"1:02:03"` from one hour.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// Format a pace as `"5'30\"/km"`. `None` and non-finite paces render as
/// the placeholder `"-'--\"/km"` (a run with no distance has no pace).
pub fn format_pace(min_per_km: Option<f64>) -> String {
    match min_per_km {
        Some(pace) if pace.is_finite() && pace > 0.0 => {
            let total_seconds = (pace * 60.0).round() as u64;
            let minutes = total_seconds / 60;
            let seconds = total_seconds % 60;
            format!("{minutes}'{seconds:02}\"/km")
        }
        _ => "-'--\"/km".to_string(),
    }
}

/// Format a speed as `"10.4 km/h"`.
pub fn format_speed_kmh(kmh: f64) -> String {
    format!("{kmh:.1} km/h")
}

// =============================================================================
// Unit Tests
// =============================================================================
