//! # Run Session
//!
//! The run lifecycle state machine.
//!
//! A [`RunSession`] owns one run attempt from the starting countdown to the
//! finished snapshot. It ingests raw GPS fixes, filters implausible samples,
//! and accumulates distance, pace, and speed:
//!
//! ```text
//! Idle -> CountingDown -> Running <-> Paused -> Ended
//! ```
//!
//! `Ended` is terminal; a new session must be constructed to run again. The
//! session is a plain single-writer object with no interior locking - callers
//! with real threads (GPS callbacks, timer ticks) serialize access around it,
//! which is what [`SessionController`](crate::controller::SessionController)
//! does with the `runtime` feature.
//!
//! Elapsed time uses a monotonic anchor: while running, a baseline of
//! accumulated seconds combines with an [`Instant`] taken at the last
//! start/resume/tick, so pausing freezes time exactly and resuming never
//! re-counts the paused gap.

use crate::geo_utils::haversine_distance;
use crate::{polyline, LocationFix};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use thiserror::Error;

/// Maximum plausible sustained speed for a tracked run or walk, in m/s.
///
/// 12.5 m/s is a 4:48 min/km sprint held between two fixes - faster than any
/// casual run sample, so a segment implying more than this is treated as a
/// GPS jump and the fix is dropped.
pub const MAX_PLAUSIBLE_SPEED_MPS: f64 = 12.5;

/// Fixes reporting worse horizontal accuracy than this are dropped, in meters.
pub const MAX_ACCURACY_M: f64 = 50.0;

/// Lifecycle state of a run session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum RunStatus {
    Idle,
    CountingDown,
    Running,
    Paused,
    Ended,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Idle => "idle",
            RunStatus::CountingDown => "counting_down",
            RunStatus::Running => "running",
            RunStatus::Paused => "paused",
            RunStatus::Ended => "ended",
        };
        f.write_str(s)
    }
}

/// What kind of activity a session tracks. Set once, immutable for the
/// session's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum ActivityType {
    Run,
    Walk,
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActivityType::Run => "run",
            ActivityType::Walk => "walk",
        })
    }
}

/// Why a delivered fix was not applied to the session.
///
/// Rejections are filtered samples, not errors; they are observable for
/// diagnostics through the [`FixOutcome`] return value and a `debug!` log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Latitude/longitude outside the valid range or non-finite.
    InvalidCoordinate,
    /// Reported accuracy worse than [`MAX_ACCURACY_M`].
    PoorAccuracy,
    /// Timestamp did not advance past the last accepted fix (late or
    /// duplicated delivery).
    OutOfOrder,
    /// Implied speed above [`MAX_PLAUSIBLE_SPEED_MPS`] - a GPS jump.
    ImplausibleSpeed,
    /// The session is not running (e.g. a fix raced a pause).
    NotRunning,
}

/// Result of offering one fix to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixOutcome {
    Accepted,
    Rejected(RejectReason),
}

impl FixOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, FixOutcome::Accepted)
    }
}

/// Errors from invalid lifecycle transitions.
///
/// These indicate a caller bug (e.g. `pause()` while idle). The session logs
/// a `warn!` and returns the error; it never silently diverges. Callers may
/// deliberately ignore the `Err` in production builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("invalid state transition: {operation}() while {from}")]
    InvalidStateTransition {
        from: RunStatus,
        operation: &'static str,
    },
}

/// Immutable snapshot of a completed run, produced exactly once per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishedRun {
    pub distance_km: f64,
    pub duration_seconds: u64,
    /// `None` when no distance was covered; never an infinity sentinel.
    pub avg_pace_min_per_km: Option<f64>,
    pub activity_type: ActivityType,
    /// The route in polyline wire format, precision 5.
    pub encoded_polyline: String,
    pub started_at: DateTime<Utc>,
}

/// The run lifecycle aggregate: status, path, and derived metrics.
///
/// Constructed fresh per run attempt; see the module docs for the state
/// diagram and the single-writer contract.
#[derive(Debug)]
pub struct RunSession {
    activity_type: ActivityType,
    status: RunStatus,
    started_at: Option<DateTime<Utc>>,
    /// Accepted fixes in arrival order; append-only.
    path: Vec<LocationFix>,
    /// Monotonically non-decreasing while running.
    distance_km: f64,
    current_pace_min_per_km: Option<f64>,
    current_speed_kmh: f64,
    /// Running time accumulated before the current anchor window.
    accumulated_seconds: f64,
    /// Set while running; `elapsed - anchor` extends the baseline.
    running_anchor: Option<Instant>,
}

impl RunSession {
    /// Create an idle session for the given activity type.
    pub fn new(activity_type: ActivityType) -> Self {
        Self {
            activity_type,
            status: RunStatus::Idle,
            started_at: None,
            path: Vec::new(),
            distance_km: 0.0,
            current_pace_min_per_km: None,
            current_speed_kmh: 0.0,
            accumulated_seconds: 0.0,
            running_anchor: None,
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle transitions
    // ------------------------------------------------------------------

    /// Enter the pre-start countdown. Valid only from `Idle`.
    pub fn begin_countdown(&mut self) -> Result<(), SessionError> {
        if self.status != RunStatus::Idle {
            return Err(self.invalid("begin_countdown"));
        }
        self.status = RunStatus::CountingDown;
        Ok(())
    }

    /// Start running. Valid from `Idle` or once the countdown completes.
    ///
    /// Resets the path and all metrics; the caller is expected to begin
    /// feeding location fixes.
    pub fn start(&mut self) -> Result<(), SessionError> {
        match self.status {
            RunStatus::Idle | RunStatus::CountingDown => {}
            _ => return Err(self.invalid("start")),
        }

        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
        self.path.clear();
        self.distance_km = 0.0;
        self.current_pace_min_per_km = None;
        self.current_speed_kmh = 0.0;
        self.accumulated_seconds = 0.0;
        self.running_anchor = Some(Instant::now());

        info!("run session started ({})", self.activity_type);
        Ok(())
    }

    /// Pause. Valid only from `Running`; freezes elapsed time and metrics.
    pub fn pause(&mut self) -> Result<(), SessionError> {
        if self.status != RunStatus::Running {
            return Err(self.invalid("pause"));
        }

        self.fold_anchor();
        self.running_anchor = None;
        self.status = RunStatus::Paused;

        info!(
            "run session paused at {:.3} km / {:.0} s",
            self.distance_km, self.accumulated_seconds
        );
        Ok(())
    }

    /// Resume from a pause. Keeps all accumulated metrics.
    pub fn resume(&mut self) -> Result<(), SessionError> {
        if self.status != RunStatus::Paused {
            return Err(self.invalid("resume"));
        }

        self.running_anchor = Some(Instant::now());
        self.status = RunStatus::Running;

        info!("run session resumed");
        Ok(())
    }

    /// Advance the elapsed-time accumulator by the wall-clock delta since the
    /// last tick. No-op unless running, so a straggling timer after a pause
    /// cannot accumulate time.
    pub fn tick(&mut self) {
        if self.status == RunStatus::Running {
            self.fold_anchor();
        }
    }

    /// End the run and take the immutable [`FinishedRun`] snapshot.
    ///
    /// Valid from `Running` or `Paused`; `Ended` is terminal, so a second
    /// `end()` (or one from `Idle`/`CountingDown`) fails with
    /// [`SessionError::InvalidStateTransition`].
    pub fn end(&mut self) -> Result<FinishedRun, SessionError> {
        match self.status {
            RunStatus::Running | RunStatus::Paused => {}
            _ => return Err(self.invalid("end")),
        }

        self.fold_anchor();
        self.running_anchor = None;
        self.status = RunStatus::Ended;

        let duration_seconds = self.accumulated_seconds.round().max(0.0) as u64;
        let avg_pace_min_per_km = if self.distance_km > 0.0 {
            Some(self.accumulated_seconds / 60.0 / self.distance_km)
        } else {
            None
        };

        let route: Vec<_> = self.path.iter().map(LocationFix::coordinate).collect();
        let finished = FinishedRun {
            distance_km: self.distance_km,
            duration_seconds,
            avg_pace_min_per_km,
            activity_type: self.activity_type,
            encoded_polyline: polyline::encode_route(&route),
            started_at: self.started_at.unwrap_or_else(Utc::now),
        };

        info!(
            "run session ended: {:.3} km, {} s, {} fixes",
            finished.distance_km,
            finished.duration_seconds,
            self.path.len()
        );
        Ok(finished)
    }

    /// Abandon the run without taking a snapshot.
    ///
    /// Terminal like [`end`](Self::end) but valid from any state, including
    /// `Idle` and `CountingDown`, so a discard can always make the session
    /// refuse further accumulation. Discarding an already-ended session is a
    /// no-op.
    pub fn discard(&mut self) {
        if self.status != RunStatus::Ended {
            self.fold_anchor();
            self.running_anchor = None;
            self.status = RunStatus::Ended;
            info!("run session discarded");
        }
    }

    // ------------------------------------------------------------------
    // Fix ingestion
    // ------------------------------------------------------------------

    /// Offer one GPS fix to the session.
    ///
    /// Only a running session accumulates; a fix that arrives while paused
    /// (or after the end) is reported as [`RejectReason::NotRunning`] and
    /// leaves the path, distance, and elapsed time untouched - that race with
    /// a pause is expected, not a caller bug.
    ///
    /// An accepted fix is appended to the path; the haversine distance from
    /// the previous fix extends `distance_km`, speed comes from the fix's
    /// reported reading when present (otherwise derived from the segment),
    /// and pace is recomputed as elapsed minutes over distance once distance
    /// is positive.
    ///
    /// Filtered samples ([`RejectReason`]) are observable outcomes, never
    /// errors.
    pub fn on_location_update(&mut self, fix: LocationFix) -> FixOutcome {
        if self.status != RunStatus::Running {
            debug!("fix dropped: session is {}", self.status);
            return FixOutcome::Rejected(RejectReason::NotRunning);
        }

        if !fix.is_valid() {
            debug!(
                "fix rejected: invalid coordinate ({}, {})",
                fix.latitude, fix.longitude
            );
            return FixOutcome::Rejected(RejectReason::InvalidCoordinate);
        }

        if let Some(accuracy) = fix.accuracy_m {
            if accuracy > MAX_ACCURACY_M {
                debug!("fix rejected: accuracy {accuracy:.0} m");
                return FixOutcome::Rejected(RejectReason::PoorAccuracy);
            }
        }

        let mut segment_kmh = None;
        if let Some(last) = self.path.last() {
            let dt_s = (fix.timestamp_ms - last.timestamp_ms) as f64 / 1000.0;
            if dt_s <= 0.0 {
                debug!("fix rejected: timestamp did not advance ({dt_s:.3} s)");
                return FixOutcome::Rejected(RejectReason::OutOfOrder);
            }

            let dist_m = haversine_distance(&last.coordinate(), &fix.coordinate());
            let implied_mps = dist_m / dt_s;
            if implied_mps > MAX_PLAUSIBLE_SPEED_MPS {
                debug!(
                    "fix rejected: implied speed {implied_mps:.1} m/s over {dist_m:.0} m segment"
                );
                return FixOutcome::Rejected(RejectReason::ImplausibleSpeed);
            }

            self.distance_km += dist_m / 1000.0;
            segment_kmh = Some(implied_mps * 3.6);
        }

        self.path.push(fix);

        // Prefer the receiver's speed reading; fall back to the segment
        if let Some(mps) = fix.speed_mps {
            self.current_speed_kmh = mps * 3.6;
        } else if let Some(kmh) = segment_kmh {
            self.current_speed_kmh = kmh;
        }

        if self.distance_km > 0.0 {
            let elapsed_min = self.elapsed_seconds() / 60.0;
            self.current_pace_min_per_km = Some(elapsed_min / self.distance_km);
        }

        FixOutcome::Accepted
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn activity_type(&self) -> ActivityType {
        self.activity_type
    }

    /// Distance covered so far in kilometers.
    pub fn distance_km(&self) -> f64 {
        self.distance_km
    }

    /// Paused-time-excluded elapsed seconds, live (includes the time since
    /// the last tick while running).
    pub fn elapsed_seconds(&self) -> f64 {
        match self.running_anchor {
            Some(anchor) if self.status == RunStatus::Running => {
                self.accumulated_seconds + anchor.elapsed().as_secs_f64()
            }
            _ => self.accumulated_seconds,
        }
    }

    /// Live pace in minutes per kilometer; `None` until distance is positive.
    pub fn current_pace_min_per_km(&self) -> Option<f64> {
        self.current_pace_min_per_km
    }

    /// Live speed in km/h.
    pub fn current_speed_kmh(&self) -> f64 {
        self.current_speed_kmh
    }

    /// Accepted fixes in arrival order.
    pub fn path(&self) -> &[LocationFix] {
        &self.path
    }

    /// The most recently accepted fix.
    pub fn last_location(&self) -> Option<&LocationFix> {
        self.path.last()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Move the time since the anchor into the baseline and re-anchor.
    fn fold_anchor(&mut self) {
        if let Some(anchor) = self.running_anchor.take() {
            self.accumulated_seconds += anchor.elapsed().as_secs_f64();
            self.running_anchor = Some(Instant::now());
        }
    }

    fn invalid(&self, operation: &'static str) -> SessionError {
        warn!("invalid transition: {operation}() while {}", self.status);
        SessionError::InvalidStateTransition {
            from: self.status,
            operation,
        }
    }

    /// Force the accumulated running time, for deterministic pace assertions.
    #[cfg(test)]
    pub(crate) fn force_elapsed_seconds(&mut self, seconds: f64) {
        self.accumulated_seconds = seconds;
        if self.running_anchor.is_some() {
            self.running_anchor = Some(Instant::now());
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
