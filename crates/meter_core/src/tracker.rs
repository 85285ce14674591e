//! Position tracker: filters noisy fixes into a monotonic distance total.
//!
//! Each accepted fix is compared against the previous accepted fix with the
//! haversine formula. Fixes whose accuracy radius exceeds
//! [`ACCURACY_THRESHOLD_M`] are dropped before they touch any state; jumps at
//! or below [`MIN_JUMP_KM`] still move the baseline but add no distance.

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::error::{ObservationError, TrackingError};
use crate::position::{FixOutcome, PositionFix, PositionSource, SourceEvent, WatchId};

/// Fixes with a larger accuracy radius (metres) are discarded.
pub const ACCURACY_THRESHOLD_M: f64 = 30.0;

/// Jumps must exceed this many kilometres (5 m) to count as movement.
pub const MIN_JUMP_KM: f64 = 0.005;

/// Read-only view of the tracker for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerReading {
    pub total_distance_km: f64,
    pub speed_kmh: f64,
    pub is_tracking: bool,
    pub last_error: Option<String>,
}

pub struct PositionTracker {
    source: Box<dyn PositionSource>,
    watch: Option<WatchId>,
    last_fix: Option<PositionFix>,
    total_distance_km: f64,
    is_tracking: bool,
    last_error: Option<String>,
}

impl PositionTracker {
    pub fn new(source: Box<dyn PositionSource>) -> Self {
        Self {
            source,
            watch: None,
            last_fix: None,
            total_distance_km: 0.0,
            is_tracking: false,
            last_error: None,
        }
    }

    /// Open a watch on the source and begin accepting fixes.
    ///
    /// On failure the error is recorded as `last_error` and tracking stays off.
    /// Starting while already tracking keeps the open watch and only clears
    /// `last_error`.
    pub fn start(&mut self) -> Result<(), TrackingError> {
        if self.is_tracking {
            self.last_error = None;
            return Ok(());
        }
        match self.source.watch() {
            Ok(id) => {
                self.watch = Some(id);
                self.is_tracking = true;
                self.last_error = None;
                info!(watch_id = id.0, "tracking started");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "tracking could not start");
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Release the watch and stop accepting fixes. Distance and last fix are kept.
    pub fn stop(&mut self) {
        self.release();
        if self.is_tracking {
            info!(total_distance_km = self.total_distance_km, "tracking stopped");
        }
        self.is_tracking = false;
    }

    /// Zero the distance and forget the baseline fix.
    pub fn reset(&mut self) {
        self.total_distance_km = 0.0;
        self.last_fix = None;
        debug!("distance reset");
    }

    /// Route a source notification to [`Self::on_fix`] or [`Self::on_error`].
    pub fn handle_event(&mut self, event: SourceEvent) -> Option<FixOutcome> {
        match event {
            SourceEvent::Fix(fix) => Some(self.on_fix(fix)),
            SourceEvent::Error(err) => {
                self.on_error(err);
                None
            }
        }
    }

    /// Apply the accuracy filter, then the accumulation rule.
    pub fn on_fix(&mut self, fix: PositionFix) -> FixOutcome {
        if !self.is_tracking {
            return FixOutcome::Ignored;
        }
        if fix.accuracy_m > ACCURACY_THRESHOLD_M {
            debug!(accuracy_m = fix.accuracy_m, "fix rejected for low accuracy");
            return FixOutcome::LowAccuracyDiscarded;
        }

        let outcome = match self.last_fix {
            None => FixOutcome::Baseline,
            Some(previous) => {
                let km = previous.coordinates().distance_km(&fix.coordinates());
                if km > MIN_JUMP_KM {
                    self.total_distance_km += km;
                    FixOutcome::Accumulated { km }
                } else {
                    trace!(km, "jump below noise threshold");
                    FixOutcome::NoiseJumpDiscarded
                }
            }
        };
        self.last_fix = Some(fix);
        outcome
    }

    /// Record a source failure. Tracking is left as-is.
    pub fn on_error(&mut self, err: ObservationError) {
        warn!(error = %err, is_tracking = self.is_tracking, "position source reported an error");
        self.last_error = Some(err.to_string());
    }

    pub fn total_distance_km(&self) -> f64 {
        self.total_distance_km
    }

    /// Speed of the most recent accepted fix in km/h; 0 without one.
    pub fn speed_kmh(&self) -> f64 {
        self.last_fix.map_or(0.0, |fix| fix.speed_kmh())
    }

    pub fn is_tracking(&self) -> bool {
        self.is_tracking
    }

    pub fn last_fix(&self) -> Option<&PositionFix> {
        self.last_fix.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn reading(&self) -> TrackerReading {
        TrackerReading {
            total_distance_km: self.total_distance_km,
            speed_kmh: self.speed_kmh(),
            is_tracking: self.is_tracking,
            last_error: self.last_error.clone(),
        }
    }

    fn release(&mut self) {
        if let Some(id) = self.watch.take() {
            self.source.clear_watch(id);
            debug!(watch_id = id.0, "position watch released");
        }
    }
}

impl Drop for PositionTracker {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for PositionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionTracker")
            .field("watch", &self.watch)
            .field("last_fix", &self.last_fix)
            .field("total_distance_km", &self.total_distance_km)
            .field("is_tracking", &self.is_tracking)
            .field("last_error", &self.last_error)
            .finish()
    }
}
