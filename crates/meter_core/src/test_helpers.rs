//! Test helpers for common test setup and utilities.
//!
//! This module provides shared fixtures (fixes, clock times, a recording
//! position source, seeded noisy routes) used by unit tests, integration
//! tests and benchmarks.

use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::TrackingError;
use crate::geo::EARTH_RADIUS_KM;
use crate::position::{PositionFix, PositionSource, WatchId};
use crate::tariff::ClockTime;

/// Absolute tolerance for comparing money and distance values.
pub const EPSILON: f64 = 1e-9;

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

/// Parse an `"HH:MM"` literal.
///
/// # Panics
///
/// Panics if the literal is not a valid clock time.
pub fn clock(hhmm: &str) -> ClockTime {
    hhmm.parse().expect("test clock literal should be HH:MM")
}

/// A stationary, high-accuracy fix.
pub fn fix_at(latitude: f64, longitude: f64) -> PositionFix {
    fix_with(latitude, longitude, None, 5.0)
}

pub fn fix_with(
    latitude: f64,
    longitude: f64,
    speed_mps: Option<f64>,
    accuracy_m: f64,
) -> PositionFix {
    PositionFix {
        latitude,
        longitude,
        speed_mps,
        accuracy_m,
        timestamp_ms: 0,
    }
}

/// `fix` moved due north by `meters`. The haversine distance between the two
/// is exactly `meters` (up to rounding) because only latitude changes.
pub fn offset_north_m(fix: &PositionFix, meters: f64) -> PositionFix {
    let dlat = (meters / 1000.0 / EARTH_RADIUS_KM).to_degrees();
    PositionFix {
        latitude: fix.latitude + dlat,
        timestamp_ms: fix.timestamp_ms + 1000,
        ..*fix
    }
}

/// Calls observed by a [`RecordingSource`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SourceLog {
    pub watches: u32,
    pub clears: u32,
}

/// Position source that counts watch/clear calls.
#[derive(Debug, Clone)]
pub struct RecordingSource {
    available: bool,
    log: Arc<Mutex<SourceLog>>,
}

impl RecordingSource {
    pub fn available() -> Self {
        Self {
            available: true,
            log: Arc::default(),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            log: Arc::default(),
        }
    }

    /// Shared view of the call counts, usable after the source is moved.
    pub fn log(&self) -> Arc<Mutex<SourceLog>> {
        Arc::clone(&self.log)
    }
}

impl PositionSource for RecordingSource {
    fn watch(&mut self) -> Result<WatchId, TrackingError> {
        if !self.available {
            return Err(TrackingError::SourceUnavailable(
                "recording source configured as unavailable".to_string(),
            ));
        }
        let mut log = self.log.lock().expect("source log poisoned");
        log.watches += 1;
        Ok(WatchId(u64::from(log.watches)))
    }

    fn clear_watch(&mut self, _id: WatchId) {
        self.log.lock().expect("source log poisoned").clears += 1;
    }
}

/// A northbound route of `count` fixes roughly `step_m` apart, each displaced
/// by up to `jitter_m` of noise, with some fixes reporting poor accuracy.
/// Deterministic for a given seed.
pub fn jittered_route(seed: u64, count: usize, step_m: f64, jitter_m: f64) -> Vec<PositionFix> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut along = fix_with(12.9716, 77.5946, Some(step_m), 5.0);
    let mut fixes = Vec::with_capacity(count);
    for i in 0..count {
        let noise = rng.gen_range(-jitter_m..=jitter_m);
        let mut fix = offset_north_m(&along, noise);
        fix.accuracy_m = if rng.gen_bool(0.1) {
            rng.gen_range(31.0..150.0)
        } else {
            rng.gen_range(3.0..25.0)
        };
        fix.timestamp_ms = i as u64 * 1000;
        fixes.push(fix);
        along = offset_north_m(&along, step_m);
    }
    fixes
}
