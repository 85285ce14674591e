//! Ride session: the command surface the presentation layer drives.
//!
//! A [`RideSession`] owns one [`PositionTracker`] and one [`FareMeter`] and
//! serialises every command, fix and tick through `&mut self`. Distance and
//! time buckets are only mutated by their owners; the session exposes them
//! outward as read-only values.

use serde::Serialize;
use tracing::info;

use crate::clock::{SystemClock, WallClock};
use crate::error::{TariffError, TrackingError};
use crate::meter::{FareMeter, MotionState, TimeBuckets};
use crate::position::{FixOutcome, PositionSource, SourceEvent};
use crate::pricing::{FareBreakdown, FareOptions};
use crate::tariff::{ClockTime, FareMode, TariffConfiguration, TariffMatrix};
use crate::tracker::{PositionTracker, TrackerReading};

/// Everything the presentation layer renders, captured at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeterSnapshot {
    pub mode: FareMode,
    pub tracker: TrackerReading,
    pub buckets: TimeBuckets,
    pub fare: FareBreakdown,
}

pub struct RideSession {
    tracker: PositionTracker,
    meter: FareMeter,
    matrix: TariffMatrix,
    mode: FareMode,
    tariff: TariffConfiguration,
    options: FareOptions,
    clock: Box<dyn WallClock>,
}

impl RideSession {
    /// Session on the host's local clock with default options.
    pub fn new(
        source: Box<dyn PositionSource>,
        matrix: TariffMatrix,
        mode: FareMode,
    ) -> Result<Self, TariffError> {
        Self::with_clock(source, matrix, mode, Box::new(SystemClock))
    }

    pub fn with_clock(
        source: Box<dyn PositionSource>,
        matrix: TariffMatrix,
        mode: FareMode,
        clock: Box<dyn WallClock>,
    ) -> Result<Self, TariffError> {
        let tariff = matrix.get(mode)?.clone();
        Ok(Self {
            tracker: PositionTracker::new(source),
            meter: FareMeter::new(),
            matrix,
            mode,
            tariff,
            options: FareOptions::default(),
            clock,
        })
    }

    pub fn start_tracking(&mut self) -> Result<(), TrackingError> {
        self.tracker.start()?;
        self.meter.mark_started();
        Ok(())
    }

    pub fn stop_tracking(&mut self) {
        self.tracker.stop();
    }

    pub fn reset_distance(&mut self) {
        self.tracker.reset();
    }

    pub fn reset_meter(&mut self) {
        self.meter.reset_meter();
    }

    /// Switch tariffs. Accumulated distance and time carry over; the caller
    /// is expected to block this mid-ride.
    pub fn select_mode(&mut self, mode: FareMode) -> Result<(), TariffError> {
        self.tariff = self.matrix.get(mode)?.clone();
        if mode != self.mode {
            info!(
                from = %self.mode,
                to = %mode,
                is_tracking = self.tracker.is_tracking(),
                "fare mode changed"
            );
        }
        self.mode = mode;
        Ok(())
    }

    pub fn set_options(&mut self, options: FareOptions) {
        self.options = options;
    }

    pub fn handle_event(&mut self, event: SourceEvent) -> Option<FixOutcome> {
        self.tracker.handle_event(event)
    }

    /// One sampling period elapsed. Accrues a bucket only while tracking.
    pub fn tick(&mut self) -> Option<MotionState> {
        self.tracker
            .is_tracking()
            .then(|| self.meter.tick(self.tracker.speed_kmh()))
    }

    pub fn is_tracking(&self) -> bool {
        self.tracker.is_tracking()
    }

    pub fn mode(&self) -> FareMode {
        self.mode
    }

    pub fn options(&self) -> FareOptions {
        self.options
    }

    pub fn tracker(&self) -> &PositionTracker {
        &self.tracker
    }

    pub fn reading(&self) -> TrackerReading {
        self.tracker.reading()
    }

    pub fn buckets(&self) -> TimeBuckets {
        self.meter.buckets()
    }

    /// Fare at the wall clock's current time of day.
    pub fn fare(&self) -> FareBreakdown {
        self.fare_at(self.clock.now())
    }

    pub fn fare_at(&self, now: ClockTime) -> FareBreakdown {
        self.meter.breakdown(
            &self.tariff,
            self.tracker.total_distance_km(),
            self.tracker.speed_kmh(),
            self.options,
            now,
        )
    }

    pub fn snapshot(&self) -> MeterSnapshot {
        self.snapshot_at(self.clock.now())
    }

    pub fn snapshot_at(&self, now: ClockTime) -> MeterSnapshot {
        MeterSnapshot {
            mode: self.mode,
            tracker: self.reading(),
            buckets: self.buckets(),
            fare: self.fare_at(now),
        }
    }
}

impl std::fmt::Debug for RideSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RideSession")
            .field("tracker", &self.tracker)
            .field("meter", &self.meter)
            .field("mode", &self.mode)
            .field("options", &self.options)
            .finish()
    }
}
