//! Position fixes and the seam to whatever produces them.
//!
//! A [`PositionSource`] is a continuous-positioning subscription provider
//! (device GPS, a recorded trace, a test double). The tracker opens one watch
//! when tracking starts and clears it exactly once when tracking stops.

use serde::{Deserialize, Serialize};

use crate::error::{ObservationError, TrackingError};
use crate::geo::Coordinates;

/// Conversion factor from metres/second to kilometres/hour.
pub const MPS_TO_KMH: f64 = 3.6;

/// One instantaneous position observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Instantaneous speed in m/s. `None` when the source does not know.
    #[serde(default)]
    pub speed_mps: Option<f64>,
    /// Horizontal accuracy radius in metres.
    pub accuracy_m: f64,
    /// Source-defined timestamp in milliseconds.
    #[serde(default)]
    pub timestamp_ms: u64,
}

impl PositionFix {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    /// Reported speed in km/h, or 0 when the source gave none.
    pub fn speed_kmh(&self) -> f64 {
        self.speed_mps.map_or(0.0, |mps| mps * MPS_TO_KMH)
    }
}

/// Notification delivered by a position source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    Fix(PositionFix),
    Error(ObservationError),
}

/// What the tracker did with a fix. Filtering is silent; this exists so
/// callers and tests can observe the decision without it being an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixOutcome {
    /// First accepted fix; becomes the distance baseline.
    Baseline,
    /// Accepted and added to the running distance.
    Accumulated { km: f64 },
    /// Accepted, but the jump was below the noise threshold.
    NoiseJumpDiscarded,
    /// Rejected outright: accuracy radius too large.
    LowAccuracyDiscarded,
    /// Tracking was not active; nothing changed.
    Ignored,
}

/// Handle for an open watch on a position source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(pub u64);

/// A continuous-positioning subscription provider.
pub trait PositionSource: Send {
    /// Open a watch. Fails with [`TrackingError::SourceUnavailable`] when the
    /// positioning capability is absent.
    fn watch(&mut self) -> Result<WatchId, TrackingError>;

    /// Close a watch previously returned by [`PositionSource::watch`].
    fn clear_watch(&mut self, id: WatchId);
}

/// Source for hosts that deliver fixes by pushing [`SourceEvent`]s directly
/// (channels, trace replay). Watching always succeeds.
#[derive(Debug, Default)]
pub struct PushSource {
    next_id: u64,
}

impl PositionSource for PushSource {
    fn watch(&mut self) -> Result<WatchId, TrackingError> {
        self.next_id += 1;
        Ok(WatchId(self.next_id))
    }

    fn clear_watch(&mut self, _id: WatchId) {}
}

/// Source for hosts with no positioning capability at all.
#[derive(Debug, Default)]
pub struct NoSource;

impl PositionSource for NoSource {
    fn watch(&mut self) -> Result<WatchId, TrackingError> {
        Err(TrackingError::SourceUnavailable(
            "geolocation is not supported on this host".to_string(),
        ))
    }

    fn clear_watch(&mut self, _id: WatchId) {}
}
