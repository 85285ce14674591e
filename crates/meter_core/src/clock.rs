use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::tariff::ClockTime;

/// Source of the local time of day used for the night-window check.
pub trait WallClock: Send {
    fn now(&self) -> ClockTime;
}

/// Reads the host's local time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> ClockTime {
        ClockTime::from_time(&chrono::Local::now())
    }
}

/// Always reports the same time of day.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedClock(pub ClockTime);

impl WallClock for FixedClock {
    fn now(&self) -> ClockTime {
        self.0
    }
}

/// An entry on the [`ReplayClock`] queue.
#[derive(Debug, Clone)]
pub struct Scheduled<T> {
    pub timestamp: u64,
    seq: u64,
    pub payload: T,
}

impl<T: Ord> PartialEq for Scheduled<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: Ord> Eq for Scheduled<T> {}

impl<T: Ord> Ord for Scheduled<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap a min-heap by timestamp, then
        // payload, then insertion order.
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| other.payload.cmp(&self.payload))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T: Ord> PartialOrd for Scheduled<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Discrete-time event queue in milliseconds since the start of a replay.
///
/// Events with equal timestamps pop in payload order, then insertion order.
#[derive(Debug)]
pub struct ReplayClock<T> {
    now: u64,
    next_seq: u64,
    events: BinaryHeap<Scheduled<T>>,
}

impl<T> Default for ReplayClock<T> {
    fn default() -> Self {
        Self {
            now: 0,
            next_seq: 0,
            events: BinaryHeap::new(),
        }
    }
}

impl<T: Ord> ReplayClock<T> {
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn schedule_at(&mut self, timestamp: u64, payload: T) {
        debug_assert!(
            timestamp >= self.now,
            "event timestamp must be >= current time"
        );
        self.events.push(Scheduled {
            timestamp,
            seq: self.next_seq,
            payload,
        });
        self.next_seq += 1;
    }

    pub fn schedule_in(&mut self, delay_ms: u64, payload: T) {
        self.schedule_at(self.now + delay_ms, payload);
    }

    pub fn pop_next(&mut self) -> Option<Scheduled<T>> {
        let event = self.events.pop()?;
        self.now = event.timestamp;
        Some(event)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
