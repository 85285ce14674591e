//! Offline replay of a recorded ride trace.
//!
//! Trace events are placed on a [`ReplayClock`] at their recorded offsets.
//! While tracking is active a meter tick is scheduled every
//! [`TICK_PERIOD_MS`]; ticks due at the same instant as a trace event fire
//! first, so a ride stopped at `t = 3000` has accrued three full seconds.
//! The replay ends at the last trace event or `end_ms`, whichever is later.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::{ReplayClock, SystemClock, WallClock};
use crate::error::{ObservationError, ReplayError};
use crate::meter::TICK_PERIOD_MS;
use crate::position::{FixOutcome, PositionFix, PushSource, SourceEvent};
use crate::pricing::FareOptions;
use crate::session::{MeterSnapshot, RideSession};
use crate::tariff::{ClockTime, FareMode, TariffMatrix};

const MS_PER_MINUTE: u64 = 60_000;

/// A recorded ride: initial mode/options plus timestamped events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideTrace {
    #[serde(default)]
    pub mode: FareMode,
    #[serde(default)]
    pub options: FareOptions,
    /// Local time of day at `t = 0`. Defaults to the host clock.
    #[serde(default)]
    pub start_clock: Option<ClockTime>,
    /// Keep the clock running until this offset even after the last event.
    #[serde(default)]
    pub end_ms: Option<u64>,
    pub events: Vec<TraceEntry>,
}

impl RideTrace {
    pub fn from_json_str(json: &str) -> Result<Self, ReplayError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub at_ms: u64,
    pub event: TraceEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceEvent {
    Start,
    Stop,
    Fix(PositionFix),
    Error { reason: String },
    ResetMeter,
    ResetDistance,
    SelectMode { mode: FareMode },
    SetOptions(FareOptions),
}

/// How many fixes fell into each filter outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FixTally {
    pub baseline: u32,
    pub accumulated: u32,
    pub noise_jump_discarded: u32,
    pub low_accuracy_discarded: u32,
    pub ignored: u32,
}

impl FixTally {
    fn record(&mut self, outcome: FixOutcome) {
        match outcome {
            FixOutcome::Baseline => self.baseline += 1,
            FixOutcome::Accumulated { .. } => self.accumulated += 1,
            FixOutcome::NoiseJumpDiscarded => self.noise_jump_discarded += 1,
            FixOutcome::LowAccuracyDiscarded => self.low_accuracy_discarded += 1,
            FixOutcome::Ignored => self.ignored += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayOutcome {
    pub elapsed_ms: u64,
    pub clock_at_end: ClockTime,
    pub fixes: FixTally,
    /// Start commands refused by the source, and source errors, in order.
    pub errors: Vec<String>,
    pub snapshot: MeterSnapshot,
}

/// Queue entries. Variant order is the tie-break at equal timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Step {
    Tick { generation: u64 },
    Event(usize),
    End,
}

/// Replay `trace` against `matrix`.
pub fn replay(trace: &RideTrace, matrix: TariffMatrix) -> Result<ReplayOutcome, ReplayError> {
    let start_clock = trace.start_clock.unwrap_or_else(|| SystemClock.now());
    let mut session = RideSession::new(Box::new(PushSource::default()), matrix, trace.mode)?;
    session.set_options(trace.options);

    let mut clock = ReplayClock::default();
    let mut end_ms = trace.end_ms.unwrap_or(0);
    for (index, entry) in trace.events.iter().enumerate() {
        clock.schedule_at(entry.at_ms, Step::Event(index));
        end_ms = end_ms.max(entry.at_ms);
    }
    clock.schedule_at(end_ms, Step::End);

    let mut generation = 0_u64;
    let mut fixes = FixTally::default();
    let mut errors = Vec::new();

    while let Some(scheduled) = clock.pop_next() {
        match scheduled.payload {
            Step::Tick { generation: due } => {
                if due == generation && session.is_tracking() {
                    session.tick();
                    clock.schedule_in(TICK_PERIOD_MS, Step::Tick { generation });
                }
            }
            Step::Event(index) => {
                let was_tracking = session.is_tracking();
                apply_event(&mut session, &trace.events[index].event, &mut fixes, &mut errors)?;
                match (was_tracking, session.is_tracking()) {
                    (false, true) => {
                        generation += 1;
                        clock.schedule_in(TICK_PERIOD_MS, Step::Tick { generation });
                    }
                    (true, false) => generation += 1,
                    _ => {}
                }
            }
            Step::End => break,
        }
    }

    let elapsed_ms = clock.now();
    let clock_at_end = start_clock.plus_minutes(elapsed_ms / MS_PER_MINUTE);
    let snapshot = session.snapshot_at(clock_at_end);
    info!(
        elapsed_ms,
        distance_km = snapshot.tracker.total_distance_km,
        total = snapshot.fare.total_customer_fare,
        "replay finished"
    );
    Ok(ReplayOutcome {
        elapsed_ms,
        clock_at_end,
        fixes,
        errors,
        snapshot,
    })
}

fn apply_event(
    session: &mut RideSession,
    event: &TraceEvent,
    fixes: &mut FixTally,
    errors: &mut Vec<String>,
) -> Result<(), ReplayError> {
    debug!(?event, "replaying event");
    match event {
        TraceEvent::Start => {
            if let Err(err) = session.start_tracking() {
                errors.push(err.to_string());
            }
        }
        TraceEvent::Stop => session.stop_tracking(),
        TraceEvent::Fix(fix) => {
            if let Some(outcome) = session.handle_event(SourceEvent::Fix(*fix)) {
                fixes.record(outcome);
            }
        }
        TraceEvent::Error { reason } => {
            let err = observation_error(reason);
            errors.push(err.to_string());
            session.handle_event(SourceEvent::Error(err));
        }
        TraceEvent::ResetMeter => session.reset_meter(),
        TraceEvent::ResetDistance => session.reset_distance(),
        TraceEvent::SelectMode { mode } => session.select_mode(*mode)?,
        TraceEvent::SetOptions(options) => session.set_options(*options),
    }
    Ok(())
}

fn observation_error(reason: &str) -> ObservationError {
    match reason {
        "permission_denied" => ObservationError::PermissionDenied,
        "position_unavailable" => ObservationError::PositionUnavailable,
        "timeout" => ObservationError::Timeout,
        other => ObservationError::Internal(other.to_string()),
    }
}
