//! Basic example of tracking a run end to end.
//!
//! Run with: cargo run --example basic_tracking

use std::time::Duration;

use run_tracker::{
    format, ActivityType, ControllerConfig, LocationFix, PostVisibility, SessionController,
};
use tokio::sync::mpsc;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config = ControllerConfig {
        countdown_secs: 0,
        tick_interval: Duration::from_millis(100),
    };
    let controller = SessionController::new(ActivityType::Run, config);

    let (tx, rx) = mpsc::channel(32);
    controller.start(rx).await.expect("fresh session starts");

    // Simulate a GPS feed: ~3 m/s northward through central London,
    // one fix per second, with one deliberately bad sample
    println!("Tracking...\n");
    for i in 0..30i64 {
        let fix = LocationFix::new(51.5074 + i as f64 * 2.7e-5, -0.1278, i * 1000);
        tx.send(fix).await.unwrap();

        if i == 15 {
            // A GPS jump the session should filter out
            let jump = LocationFix::new(51.54, -0.1278, i * 1000 + 500);
            tx.send(jump).await.unwrap();
        }
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    let snapshot = controller.snapshot().await;
    println!(
        "live: {} | {} | {}",
        format::format_distance_km(snapshot.distance_km),
        format::format_pace(snapshot.current_pace_min_per_km),
        format::format_speed_kmh(snapshot.current_speed_kmh),
    );

    let finished = controller.end().await.expect("running session ends");
    println!("\nFinished run:");
    println!("  distance: {}", format::format_distance_km(finished.distance_km));
    println!("  duration: {}", format::format_duration(finished.duration_seconds));
    println!("  avg pace: {}", format::format_pace(finished.avg_pace_min_per_km));
    println!("  route:    {}", finished.encoded_polyline);

    // What would be written to the backend
    let post = run_tracker::NewRunPost::from_finished_run(
        &finished,
        Some("morning 10x100".to_string()),
        PostVisibility::FollowersOnly,
    );
    println!("\npost payload: {}", serde_json::to_string_pretty(&post).unwrap());
}
