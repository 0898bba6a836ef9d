//! # Session Controller
//!
//! Async ownership of one [`RunSession`]: the tick timer, the location feed,
//! and their cancellation.
//!
//! GPS callbacks and timer ticks arrive on different threads, so the
//! controller wraps the session in a `tokio::sync::Mutex` and funnels all
//! fixes through a single feed task reading an in-order channel - one
//! logical writer, fixes applied in delivery order, never two at once.
//!
//! Resource rules:
//! - at most one feed task and one ticker per controller; `start` aborts and
//!   replaces any previous pair
//! - the ticker stops whenever the session leaves `Running` (pause, end,
//!   discard); a straggling tick is additionally a session-level no-op
//! - `end` and `discard` abort both tasks before the session becomes
//!   terminal, so no fix can land after `Ended`

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time;

use crate::persist::{NewRunPost, PostId, PostVisibility, RunStore, StoreError};
use crate::session::{ActivityType, FinishedRun, RunSession, RunStatus, SessionError};
use crate::LocationFix;

/// Tuning for the controller's timers.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Pre-start countdown in seconds; 0 starts immediately.
    pub countdown_secs: u32,
    /// Cadence of the elapsed-time tick.
    pub tick_interval: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            countdown_secs: 3,
            tick_interval: Duration::from_secs(1),
        }
    }
}

/// Read-only view of the session for UI polling.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub status: RunStatus,
    pub distance_km: f64,
    pub elapsed_seconds: f64,
    pub current_pace_min_per_km: Option<f64>,
    pub current_speed_kmh: f64,
}

/// Errors from the end-and-post handoff.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PostError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Owns a [`RunSession`] plus its feed task and tick timer.
///
/// Cheap to clone; clones share the same session and tasks, so a screen and
/// a background callback can hold the same controller.
#[derive(Clone)]
pub struct SessionController {
    session: Arc<Mutex<RunSession>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    feed_task: Arc<Mutex<Option<JoinHandle<()>>>>,
    /// Run generation. `end` and `discard` bump it, so a `start` still
    /// awaiting its countdown notices the run is gone and never promotes the
    /// session or spawns tasks.
    run_epoch: Arc<AtomicU64>,
    config: ControllerConfig,
}

impl SessionController {
    /// Create a controller around a fresh idle session.
    pub fn new(activity_type: ActivityType, config: ControllerConfig) -> Self {
        Self {
            session: Arc::new(Mutex::new(RunSession::new(activity_type))),
            ticker: Arc::new(Mutex::new(None)),
            feed_task: Arc::new(Mutex::new(None)),
            run_epoch: Arc::new(AtomicU64::new(0)),
            config,
        }
    }

    /// Run the countdown (if configured), start the session, and begin
    /// consuming `feed`.
    ///
    /// Replaces any previous feed task and ticker, so starting twice can
    /// never leave an orphaned timer or a second subscription running.
    pub async fn start(&self, feed: mpsc::Receiver<LocationFix>) -> Result<(), SessionError> {
        self.abort_tasks().await;
        let epoch = self.run_epoch.load(Ordering::SeqCst);

        if self.config.countdown_secs > 0 {
            self.session.lock().await.begin_countdown()?;
            debug!("countdown: {} s", self.config.countdown_secs);
            time::sleep(Duration::from_secs(self.config.countdown_secs as u64)).await;
        }

        let mut session = self.session.lock().await;
        // An end or discard during the countdown cancels the run; do not
        // promote the session or spawn anything
        if self.run_epoch.load(Ordering::SeqCst) != epoch {
            debug!("start cancelled during countdown");
            return Err(SessionError::InvalidStateTransition {
                from: session.status(),
                operation: "start",
            });
        }
        session.start()?;
        drop(session);

        self.spawn_feed_task(feed).await;
        self.spawn_ticker().await;
        Ok(())
    }

    /// Pause the session and stop the ticker.
    pub async fn pause(&self) -> Result<(), SessionError> {
        self.session.lock().await.pause()?;
        Self::abort(&self.ticker).await;
        Ok(())
    }

    /// Resume the session and restart the ticker.
    pub async fn resume(&self) -> Result<(), SessionError> {
        self.session.lock().await.resume()?;
        self.spawn_ticker().await;
        Ok(())
    }

    /// Stop the feed and ticker, then end the session.
    ///
    /// Both tasks are aborted before the session transitions, so nothing can
    /// be accepted once the snapshot is taken.
    pub async fn end(&self) -> Result<FinishedRun, SessionError> {
        self.abort_tasks().await;
        self.run_epoch.fetch_add(1, Ordering::SeqCst);
        self.session.lock().await.end()
    }

    /// Throw the run away: stop everything and mark the session terminal
    /// without producing a post payload.
    ///
    /// Works from any state - discarding mid-countdown cancels the pending
    /// start as well.
    pub async fn discard(&self) {
        self.abort_tasks().await;
        self.run_epoch.fetch_add(1, Ordering::SeqCst);
        self.session.lock().await.discard();
    }

    /// End the run and hand the post payload to the store.
    ///
    /// Store failures are surfaced as-is; the core does not retry.
    pub async fn end_and_post(
        &self,
        store: &dyn RunStore,
        caption: Option<String>,
        visibility: PostVisibility,
    ) -> Result<PostId, PostError> {
        let finished = self.end().await?;
        let post = NewRunPost::from_finished_run(&finished, caption, visibility);
        let post_id = store.create_run_post(post).await?;
        info!("run posted as {post_id}");
        Ok(post_id)
    }

    /// Current session metrics for UI polling.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let session = self.session.lock().await;
        SessionSnapshot {
            status: session.status(),
            distance_km: session.distance_km(),
            elapsed_seconds: session.elapsed_seconds(),
            current_pace_min_per_km: session.current_pace_min_per_km(),
            current_speed_kmh: session.current_speed_kmh(),
        }
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    /// Single consumer of the location feed: fixes are applied one at a
    /// time, in delivery order, under the session lock.
    async fn spawn_feed_task(&self, mut feed: mpsc::Receiver<LocationFix>) {
        let session = Arc::clone(&self.session);
        let handle = tokio::spawn(async move {
            while let Some(fix) = feed.recv().await {
                session.lock().await.on_location_update(fix);
            }
            debug!("location feed closed");
        });
        Self::replace(&self.feed_task, handle).await;
    }

    async fn spawn_ticker(&self) {
        let session = Arc::clone(&self.session);
        let tick_interval = self.config.tick_interval;
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            // The first tick fires immediately; skip it
            interval.tick().await;
            loop {
                interval.tick().await;
                session.lock().await.tick();
            }
        });
        Self::replace(&self.ticker, handle).await;
    }

    async fn abort_tasks(&self) {
        Self::abort(&self.ticker).await;
        Self::abort(&self.feed_task).await;
    }

    async fn abort(slot: &Mutex<Option<JoinHandle<()>>>) {
        if let Some(handle) = slot.lock().await.take() {
            handle.abort();
        }
    }

    async fn replace(slot: &Mutex<Option<JoinHandle<()>>>, handle: JoinHandle<()>) {
        if let Some(previous) = slot.lock().await.replace(handle) {
            previous.abort();
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    fn test_config() -> ControllerConfig {
        ControllerConfig {
            countdown_secs: 0,
            tick_interval: Duration::from_millis(10),
        }
    }

    fn track(fixes: usize) -> Vec<LocationFix> {
        (0..fixes)
            .map(|i| LocationFix::new(51.5074 + i as f64 * 2.7e-5, -0.1278, i as i64 * 1000))
            .collect()
    }

    /// Records every payload it is handed.
    #[derive(Default)]
    struct RecordingStore {
        posts: StdMutex<Vec<NewRunPost>>,
    }

    #[async_trait]
    impl RunStore for RecordingStore {
        async fn create_run_post(&self, post: NewRunPost) -> Result<PostId, StoreError> {
            self.posts.lock().unwrap().push(post);
            Ok("post-1".to_string())
        }
    }

    struct FailingStore;

    #[async_trait]
    impl RunStore for FailingStore {
        async fn create_run_post(&self, _post: NewRunPost) -> Result<PostId, StoreError> {
            Err(StoreError::Network("socket closed".to_string()))
        }
    }

    #[tokio::test]
    async fn test_fixes_applied_in_delivery_order() {
        let controller = SessionController::new(ActivityType::Run, test_config());
        let (tx, rx) = mpsc::channel(16);
        controller.start(rx).await.unwrap();

        let fixes = track(10);
        for fix in &fixes {
            tx.send(*fix).await.unwrap();
        }
        time::sleep(Duration::from_millis(50)).await;

        let finished = controller.end().await.unwrap();
        let decoded = crate::polyline::decode_route(&finished.encoded_polyline).unwrap();
        assert_eq!(decoded.len(), fixes.len());
        for (c, fix) in decoded.iter().zip(&fixes) {
            assert!((c.latitude - fix.latitude).abs() < 1e-5);
        }
    }

    #[tokio::test]
    async fn test_no_fix_lands_after_end() {
        let controller = SessionController::new(ActivityType::Run, test_config());
        let (tx, rx) = mpsc::channel(16);
        controller.start(rx).await.unwrap();

        tx.send(LocationFix::new(51.5074, -0.1278, 0)).await.unwrap();
        time::sleep(Duration::from_millis(30)).await;

        let finished = controller.end().await.unwrap();

        // The feed task is gone; late sends change nothing
        let _ = tx.send(LocationFix::new(51.6, -0.1278, 1000)).await;
        time::sleep(Duration::from_millis(30)).await;

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.status, RunStatus::Ended);
        assert_eq!(snapshot.distance_km, finished.distance_km);
    }

    #[tokio::test]
    async fn test_pause_stops_the_ticker() {
        let controller = SessionController::new(ActivityType::Run, test_config());
        let (_tx, rx) = mpsc::channel(16);
        controller.start(rx).await.unwrap();

        time::sleep(Duration::from_millis(30)).await;
        controller.pause().await.unwrap();

        let frozen = controller.snapshot().await.elapsed_seconds;
        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(controller.snapshot().await.elapsed_seconds, frozen);

        controller.resume().await.unwrap();
        time::sleep(Duration::from_millis(30)).await;
        assert!(controller.snapshot().await.elapsed_seconds > frozen);
    }

    #[tokio::test]
    async fn test_starting_again_replaces_the_feed() {
        let controller = SessionController::new(ActivityType::Run, test_config());

        let (tx1, rx1) = mpsc::channel(16);
        controller.start(rx1).await.unwrap();
        let err = controller.start(mpsc::channel(16).1).await.unwrap_err();
        // The session itself refuses a second start
        assert!(matches!(err, SessionError::InvalidStateTransition { .. }));

        // The first feed was aborted by the replace; sends go nowhere
        tx1.send(LocationFix::new(51.5074, -0.1278, 0)).await.ok();
        time::sleep(Duration::from_millis(30)).await;
        assert_eq!(controller.snapshot().await.distance_km, 0.0);
    }

    #[tokio::test]
    async fn test_countdown_delays_the_start() {
        let config = ControllerConfig {
            countdown_secs: 1,
            tick_interval: Duration::from_millis(10),
        };
        let controller = SessionController::new(ActivityType::Walk, config);
        let (_tx, rx) = mpsc::channel(16);

        let started = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.start(rx).await })
        };
        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(controller.snapshot().await.status, RunStatus::CountingDown);

        started.await.unwrap().unwrap();
        assert_eq!(controller.snapshot().await.status, RunStatus::Running);
    }

    #[tokio::test]
    async fn test_discard_during_countdown_cancels_the_run() {
        let config = ControllerConfig {
            countdown_secs: 1,
            tick_interval: Duration::from_millis(10),
        };
        let controller = SessionController::new(ActivityType::Run, config);
        let (_tx, rx) = mpsc::channel(16);

        let started = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.start(rx).await })
        };
        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(controller.snapshot().await.status, RunStatus::CountingDown);

        controller.discard().await;
        assert_eq!(controller.snapshot().await.status, RunStatus::Ended);

        // The pending start notices the run is gone instead of promoting it
        let err = started.await.unwrap().unwrap_err();
        assert!(matches!(err, SessionError::InvalidStateTransition { .. }));

        time::sleep(Duration::from_millis(50)).await;
        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.status, RunStatus::Ended);
        assert_eq!(snapshot.elapsed_seconds, 0.0);
    }

    #[tokio::test]
    async fn test_discard_is_terminal_and_quiet() {
        let controller = SessionController::new(ActivityType::Run, test_config());
        let (_tx, rx) = mpsc::channel(16);
        controller.start(rx).await.unwrap();

        controller.discard().await;
        assert_eq!(controller.snapshot().await.status, RunStatus::Ended);
        // A second discard is a no-op, not an error
        controller.discard().await;
    }

    #[tokio::test]
    async fn test_end_and_post_hands_over_the_payload() {
        let controller = SessionController::new(ActivityType::Run, test_config());
        let (tx, rx) = mpsc::channel(16);
        controller.start(rx).await.unwrap();

        for fix in track(5) {
            tx.send(fix).await.unwrap();
        }
        time::sleep(Duration::from_millis(50)).await;

        let store = RecordingStore::default();
        let post_id = controller
            .end_and_post(&store, Some("tempo day".to_string()), PostVisibility::Public)
            .await
            .unwrap();

        assert_eq!(post_id, "post-1");
        let posts = store.posts.lock().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].caption.as_deref(), Some("tempo day"));
        assert_eq!(posts[0].activity_type, ActivityType::Run);
        assert!(!posts[0].encoded_polyline.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_unretried() {
        let controller = SessionController::new(ActivityType::Run, test_config());
        let (_tx, rx) = mpsc::channel(16);
        controller.start(rx).await.unwrap();

        let err = controller
            .end_and_post(&FailingStore, None, PostVisibility::Public)
            .await
            .unwrap_err();
        assert!(matches!(err, PostError::Store(StoreError::Network(_))));
    }
}
