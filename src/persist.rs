//! # Run Persistence Contract
//!
//! The seam between the tracking core and whatever backend stores finished
//! runs. The core produces a [`NewRunPost`] and hands it to a [`RunStore`];
//! transport, schema, retries, and auth all live behind the trait.
//!
//! Store failures surface to callers exactly once per handoff - the core
//! never retries on the store's behalf.

use crate::session::FinishedRun;
use crate::ActivityType;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a stored run post, assigned by the backend.
pub type PostId = String;

/// Who may see a posted run in the social timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostVisibility {
    Public,
    FollowersOnly,
}

/// The write payload for one finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRunPost {
    pub distance_km: f64,
    pub duration_min: f64,
    pub avg_pace_min_per_km: Option<f64>,
    pub activity_type: ActivityType,
    /// The route in polyline wire format, precision 5; stored opaque.
    pub encoded_polyline: String,
    pub caption: Option<String>,
    pub visibility: PostVisibility,
}

impl NewRunPost {
    /// Build the payload from a finished run plus the user's post settings.
    pub fn from_finished_run(
        run: &FinishedRun,
        caption: Option<String>,
        visibility: PostVisibility,
    ) -> Self {
        Self {
            distance_km: run.distance_km,
            duration_min: run.duration_seconds as f64 / 60.0,
            avg_pace_min_per_km: run.avg_pace_min_per_km,
            activity_type: run.activity_type,
            encoded_polyline: run.encoded_polyline.clone(),
            caption,
            visibility,
        }
    }
}

/// Errors a run store may report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("network failure: {0}")]
    Network(String),

    #[error("not authorized to post")]
    Unauthorized,

    #[error("post rejected: {0}")]
    Rejected(String),
}

/// A sink that persists finished runs as stored posts.
///
/// Implemented outside the core by the app's database layer; the crate only
/// ships test doubles.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Persist one run post, returning the stored post's identifier.
    async fn create_run_post(&self, post: NewRunPost) -> Result<PostId, StoreError>;
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ActivityType, RunSession};

    #[test]
    fn test_payload_from_finished_run() {
        let mut session = RunSession::new(ActivityType::Walk);
        session.start().unwrap();
        let finished = session.end().unwrap();

        let post = NewRunPost::from_finished_run(
            &finished,
            Some("morning walk".to_string()),
            PostVisibility::FollowersOnly,
        );

        assert_eq!(post.activity_type, ActivityType::Walk);
        assert_eq!(post.caption.as_deref(), Some("morning walk"));
        assert_eq!(post.visibility, PostVisibility::FollowersOnly);
        assert_eq!(post.encoded_polyline, finished.encoded_polyline);
        assert_eq!(post.duration_min, finished.duration_seconds as f64 / 60.0);
    }

    #[test]
    fn test_payload_serializes_for_the_wire() {
        let mut session = RunSession::new(ActivityType::Run);
        session.start().unwrap();
        let finished = session.end().unwrap();

        let post = NewRunPost::from_finished_run(&finished, None, PostVisibility::Public);
        let json = serde_json::to_value(&post).unwrap();

        assert_eq!(json["activity_type"], "run");
        assert_eq!(json["visibility"], "public");
        assert!(json["avg_pace_min_per_km"].is_null());
    }
}
