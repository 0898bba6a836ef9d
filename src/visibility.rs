//! # Route Rendering Policy
//!
//! Who may see how much of a stored route.
//!
//! The policy is a total, side-effect-free function over the viewer, the
//! run's owner, and their follow relationship. It holds no state, so callers
//! must re-evaluate it whenever any of the three inputs changes:
//!
//! - the owner sees the exact polyline on a real map ([`RouteVisibility::Full`])
//! - a follower sees the route's shape only, re-projected into a local pixel
//!   frame with no underlying map or absolute coordinates
//!   ([`RouteVisibility::Schematic`])
//! - anyone else sees nothing; the screen shows a "followers only" notice
//!   ([`RouteVisibility::Hidden`])
//!
//! [`schematic_points`] is the single shared re-projection helper - screens
//! must not reimplement the pixel math.

use crate::geo_utils::{compute_bounds, fit_region_default};
use crate::{polyline, Coordinate, PolylineError, Region};
use serde::{Deserialize, Serialize};

/// How much route geometry a viewer is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum RouteVisibility {
    /// Exact polyline on a real map (the owner).
    Full,
    /// Shape-only rendering in a local frame (a follower).
    Schematic,
    /// No geometry at all (a stranger).
    Hidden,
}

/// A point in a local pixel frame, stripped of geographic context.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct FramePoint {
    pub x: f64,
    pub y: f64,
}

/// Resolve what route geometry a viewer may see.
///
/// # Example
///
/// ```rust
/// use run_tracker::{visibility_for, RouteVisibility};
///
/// assert_eq!(visibility_for("ana", "ana", false), RouteVisibility::Full);
/// assert_eq!(visibility_for("ben", "ana", true), RouteVisibility::Schematic);
/// assert_eq!(visibility_for("ben", "ana", false), RouteVisibility::Hidden);
/// ```
pub fn visibility_for(viewer_id: &str, owner_id: &str, is_follower: bool) -> RouteVisibility {
    if viewer_id == owner_id {
        RouteVisibility::Full
    } else if is_follower {
        RouteVisibility::Schematic
    } else {
        RouteVisibility::Hidden
    }
}

/// Re-project a route into a `width` x `height` pixel frame.
///
/// Positions are scaled from the route's fitted region into frame
/// coordinates, with y inverted so north points up. The output carries no
/// absolute geographic information - only the shape survives, which is the
/// point of the schematic rendering.
///
/// Empty input produces an empty frame.
pub fn schematic_points(points: &[Coordinate], width: f64, height: f64) -> Vec<FramePoint> {
    let Some(bounds) = compute_bounds(points) else {
        return Vec::new();
    };

    // Degenerate spans (single point, straight vertical/horizontal line)
    // still need a nonzero divisor; the point then centers on that axis.
    let lat_span = bounds.lat_span();
    let lng_span = bounds.lng_span();

    points
        .iter()
        .map(|p| {
            let fx = if lng_span > 0.0 {
                (p.longitude - bounds.min_lng) / lng_span
            } else {
                0.5
            };
            let fy = if lat_span > 0.0 {
                (p.latitude - bounds.min_lat) / lat_span
            } else {
                0.5
            };
            FramePoint {
                x: fx * width,
                // Screen y grows downward; latitude grows northward
                y: (1.0 - fy) * height,
            }
        })
        .collect()
}

/// Geometry a screen should render for one viewer, decoded and projected once.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteRenderPlan {
    /// Exact route plus the fitted map viewport.
    FullRoute(Vec<Coordinate>, Region),
    /// Shape-only frame points; no map, no coordinates.
    SchematicRoute(Vec<FramePoint>),
    /// Render nothing; show the "followers only" notice instead.
    Hidden,
}

/// Decode a stored route and apply the visibility policy in one step.
///
/// This is the composition screens use: one decode, one projection, no
/// per-screen duplication of the pixel math. Decode failures propagate; a
/// hidden route never decodes at all.
pub fn render_plan(
    viewer_id: &str,
    owner_id: &str,
    is_follower: bool,
    encoded_polyline: &str,
    width: f64,
    height: f64,
) -> Result<RouteRenderPlan, PolylineError> {
    match visibility_for(viewer_id, owner_id, is_follower) {
        RouteVisibility::Hidden => Ok(RouteRenderPlan::Hidden),
        RouteVisibility::Full => {
            let route = polyline::decode_route(encoded_polyline)?;
            let region = fit_region_default(&route);
            Ok(RouteRenderPlan::FullRoute(route, region))
        }
        RouteVisibility::Schematic => {
            let route = polyline::decode_route(encoded_polyline)?;
            Ok(RouteRenderPlan::SchematicRoute(schematic_points(
                &route, width, height,
            )))
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polyline::encode_route;

    fn sample_route() -> Vec<Coordinate> {
        vec![
            Coordinate::new(51.50, -0.13),
            Coordinate::new(51.51, -0.12),
            Coordinate::new(51.52, -0.11),
        ]
    }

    #[test]
    fn test_owner_sees_full() {
        assert_eq!(visibility_for("u1", "u1", false), RouteVisibility::Full);
        // Follow flag is irrelevant for the owner
        assert_eq!(visibility_for("u1", "u1", true), RouteVisibility::Full);
    }

    #[test]
    fn test_follower_sees_schematic() {
        assert_eq!(visibility_for("u2", "u1", true), RouteVisibility::Schematic);
    }

    #[test]
    fn test_stranger_sees_nothing() {
        assert_eq!(visibility_for("u2", "u1", false), RouteVisibility::Hidden);
    }

    #[test]
    fn test_schematic_points_fill_frame() {
        let frame = schematic_points(&sample_route(), 300.0, 200.0);
        assert_eq!(frame.len(), 3);
        for p in &frame {
            assert!(p.x >= 0.0 && p.x <= 300.0);
            assert!(p.y >= 0.0 && p.y <= 200.0);
        }
        // South-western start maps to the bottom-left corner
        assert_eq!(frame[0].x, 0.0);
        assert_eq!(frame[0].y, 200.0);
        // North-eastern end maps to the top-right corner
        assert_eq!(frame[2].x, 300.0);
        assert_eq!(frame[2].y, 0.0);
    }

    #[test]
    fn test_schematic_points_y_inverted() {
        // Northernmost point should have the smallest y
        let frame = schematic_points(&sample_route(), 100.0, 100.0);
        assert!(frame[2].y < frame[0].y);
    }

    #[test]
    fn test_schematic_points_empty() {
        assert!(schematic_points(&[], 300.0, 200.0).is_empty());
    }

    #[test]
    fn test_schematic_points_single_point_centers() {
        let frame = schematic_points(&[Coordinate::new(51.5, -0.12)], 300.0, 200.0);
        assert_eq!(frame.len(), 1);
        assert_eq!(frame[0].x, 150.0);
        assert_eq!(frame[0].y, 100.0);
    }

    #[test]
    fn test_render_plan_full_for_owner() {
        let encoded = encode_route(&sample_route());
        let plan = render_plan("u1", "u1", false, &encoded, 300.0, 200.0).unwrap();
        match plan {
            RouteRenderPlan::FullRoute(route, region) => {
                assert_eq!(route.len(), 3);
                assert!((region.latitude - 51.51).abs() < 1e-4);
            }
            other => panic!("expected FullRoute, got {other:?}"),
        }
    }

    #[test]
    fn test_render_plan_schematic_for_follower() {
        let encoded = encode_route(&sample_route());
        let plan = render_plan("u2", "u1", true, &encoded, 300.0, 200.0).unwrap();
        assert!(matches!(plan, RouteRenderPlan::SchematicRoute(points) if points.len() == 3));
    }

    #[test]
    fn test_render_plan_hidden_renders_nothing() {
        let encoded = encode_route(&sample_route());
        let plan = render_plan("u2", "u1", false, &encoded, 300.0, 200.0).unwrap();
        assert_eq!(plan, RouteRenderPlan::Hidden);
    }

    #[test]
    fn test_render_plan_hidden_ignores_malformed_polyline() {
        // A stranger's request never decodes the route
        let plan = render_plan("u2", "u1", false, "_", 300.0, 200.0).unwrap();
        assert_eq!(plan, RouteRenderPlan::Hidden);
    }

    #[test]
    fn test_render_plan_fails_closed_on_malformed_polyline() {
        assert!(render_plan("u1", "u1", false, "_", 300.0, 200.0).is_err());
    }
}
