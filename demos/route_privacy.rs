//! Example of the route visibility policy and schematic rendering.
//!
//! Run with: cargo run --example route_privacy

use run_tracker::{polyline, render_plan, Coordinate, RouteRenderPlan};

fn main() {
    // A short loop in Lyon, stored in polyline wire format
    let route = vec![
        Coordinate::new(45.7640, 4.8357),
        Coordinate::new(45.7652, 4.8371),
        Coordinate::new(45.7665, 4.8360),
        Coordinate::new(45.7659, 4.8338),
        Coordinate::new(45.7640, 4.8357),
    ];
    let encoded = polyline::encode_route(&route);
    println!("stored route: {encoded}\n");

    let owner = "runner-42";
    let viewers = [
        ("runner-42", false, "the owner"),
        ("friend-7", true, "a follower"),
        ("stranger-9", false, "a stranger"),
    ];

    for (viewer, is_follower, label) in viewers {
        println!("{viewer} ({label}):");
        match render_plan(viewer, owner, is_follower, &encoded, 320.0, 240.0).unwrap() {
            RouteRenderPlan::FullRoute(points, region) => {
                println!("  exact polyline, {} points", points.len());
                println!(
                    "  map viewport: ({:.4}, {:.4}) +/- ({:.4}, {:.4})",
                    region.latitude, region.longitude,
                    region.latitude_delta / 2.0, region.longitude_delta / 2.0
                );
            }
            RouteRenderPlan::SchematicRoute(points) => {
                println!("  shape only, {} frame points, no map:", points.len());
                for p in &points {
                    println!("    ({:6.1}, {:6.1})", p.x, p.y);
                }
            }
            RouteRenderPlan::Hidden => {
                println!("  nothing - show the \"followers only\" notice");
            }
        }
        println!();
    }
}
