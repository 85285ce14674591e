//! Error types for tracking, tariff loading and trace replay.
//!
//! Fix filtering outcomes (low accuracy, noise jumps) are not errors; see
//! [`crate::position::FixOutcome`].

use thiserror::Error;

/// Failures raised by the position tracker's command surface.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum TrackingError {
    /// No positioning capability at start time. Tracking does not begin.
    #[error("position source unavailable: {0}")]
    SourceUnavailable(String),
}

/// Advisory failure reported by the position source after tracking started.
///
/// Non-fatal: the tracker records it as `last_error` and keeps its tracking
/// flag as-is. The caller decides whether to stop.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ObservationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("position unavailable")]
    PositionUnavailable,

    #[error("timed out waiting for a position fix")]
    Timeout,

    #[error("position source fault: {0}")]
    Internal(String),
}

/// Tariff configuration could not be loaded or failed validation.
#[derive(Error, Debug)]
pub enum TariffError {
    #[error("invalid clock time {0:?}, expected HH:MM")]
    InvalidClockTime(String),

    #[error("tariff for {mode} has no distance tiers")]
    EmptyTiers { mode: String },

    #[error("tariff for {mode} has tier boundaries out of order at {km} km")]
    UnsortedTiers { mode: String, km: f64 },

    #[error("tariff for {mode} has a negative {field}")]
    NegativeRate { mode: String, field: &'static str },

    #[error("tariff for {mode} has commission rate {rate} outside [0, 1]")]
    CommissionOutOfRange { mode: String, rate: f64 },

    #[error("unknown fare mode {0:?}")]
    UnknownMode(String),

    #[error("tariff matrix has no entry for {0}")]
    MissingMode(String),

    #[error("failed to read tariff file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed tariff JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A recorded ride trace could not be loaded.
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("failed to read trace: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed trace JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Tariff(#[from] TariffError),
}

/// Failures reported through an async [`crate::runner::SessionHandle`].
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("ride session has shut down")]
    Closed,

    #[error(transparent)]
    Tracking(#[from] TrackingError),

    #[error(transparent)]
    Tariff(#[from] TariffError),
}
