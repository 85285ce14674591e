//! Fare meter: splits elapsed tracking time into moving and waiting seconds.
//!
//! The host calls [`FareMeter::tick`] once per second while tracking is
//! active. Each tick is classified on its own against
//! [`MOVING_SPEED_THRESHOLD_KMH`]; there is no hysteresis.

use serde::Serialize;
use tracing::debug;

use crate::pricing::{compute_fare, FareBreakdown, FareInputs, FareOptions};
use crate::tariff::{ClockTime, TariffConfiguration};

/// Speeds strictly above this (km/h, about 0.5 m/s) count as moving.
pub const MOVING_SPEED_THRESHOLD_KMH: f64 = 1.8;

/// Sampling period of the meter tick.
pub const TICK_PERIOD_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MotionState {
    Moving,
    Waiting,
}

impl MotionState {
    pub fn classify(speed_kmh: f64) -> Self {
        if speed_kmh > MOVING_SPEED_THRESHOLD_KMH {
            MotionState::Moving
        } else {
            MotionState::Waiting
        }
    }
}

/// Seconds accrued to each bucket since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimeBuckets {
    pub moving_secs: u64,
    pub waiting_secs: u64,
}

#[derive(Debug, Default)]
pub struct FareMeter {
    buckets: TimeBuckets,
    has_started: bool,
}

impl FareMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that tracking has been switched on at least once.
    pub fn mark_started(&mut self) {
        self.has_started = true;
    }

    /// Add one second to whichever bucket `speed_kmh` selects.
    pub fn tick(&mut self, speed_kmh: f64) -> MotionState {
        let state = MotionState::classify(speed_kmh);
        match state {
            MotionState::Moving => self.buckets.moving_secs += 1,
            MotionState::Waiting => self.buckets.waiting_secs += 1,
        }
        state
    }

    /// Zero both buckets and forget that the ride started.
    pub fn reset_meter(&mut self) {
        self.buckets = TimeBuckets::default();
        self.has_started = false;
        debug!("meter reset");
    }

    pub fn buckets(&self) -> TimeBuckets {
        self.buckets
    }

    pub fn has_started(&self) -> bool {
        self.has_started
    }

    /// A ride that never started, with nothing accrued, prices to zero.
    pub fn is_pristine(&self, distance_km: f64) -> bool {
        !self.has_started
            && distance_km == 0.0
            && self.buckets.moving_secs == 0
            && self.buckets.waiting_secs == 0
    }

    /// Current breakdown under `tariff`, honouring the zero-state gate.
    pub fn breakdown(
        &self,
        tariff: &TariffConfiguration,
        distance_km: f64,
        speed_kmh: f64,
        options: FareOptions,
        now: ClockTime,
    ) -> FareBreakdown {
        if self.is_pristine(distance_km) {
            return FareBreakdown::default();
        }
        compute_fare(
            tariff,
            FareInputs {
                distance_km,
                moving_secs: self.buckets.moving_secs,
                waiting_secs: self.buckets.waiting_secs,
                speed_kmh,
            },
            options,
            now,
        )
    }
}
