use meter_core::clock::FixedClock;
use meter_core::position::{FixOutcome, PositionFix, PushSource, SourceEvent};
use meter_core::pricing::FareOptions;
use meter_core::session::RideSession;
use meter_core::tariff::{FareMode, TariffMatrix};
use meter_core::test_helpers::clock;

/// Builder for ride sessions on a fixed wall clock.
#[derive(Clone, Debug)]
pub struct RideBuilder {
    mode: FareMode,
    clock: &'static str,
    options: FareOptions,
    matrix: TariffMatrix,
}

impl Default for RideBuilder {
    fn default() -> Self {
        Self {
            mode: FareMode::BikeTaxi,
            clock: "12:00",
            options: FareOptions::default(),
            matrix: TariffMatrix::builtin(),
        }
    }
}

impl RideBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: FareMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn at_clock(mut self, hhmm: &'static str) -> Self {
        self.clock = hhmm;
        self
    }

    pub fn with_options(mut self, options: FareOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_matrix(mut self, matrix: TariffMatrix) -> Self {
        self.matrix = matrix;
        self
    }

    /// Build an idle session.
    pub fn build(self) -> RideSession {
        let mut session = RideSession::with_clock(
            Box::new(PushSource::default()),
            self.matrix,
            self.mode,
            Box::new(FixedClock(clock(self.clock))),
        )
        .expect("builder matrix covers the selected mode");
        session.set_options(self.options);
        session
    }

    /// Build a session that is already tracking.
    pub fn started(self) -> RideSession {
        let mut session = self.build();
        session.start_tracking().expect("push source always starts");
        session
    }
}

/// Feed fixes in order, collecting the filter outcome of each.
pub fn feed(session: &mut RideSession, fixes: &[PositionFix]) -> Vec<FixOutcome> {
    fixes
        .iter()
        .filter_map(|fix| session.handle_event(SourceEvent::Fix(*fix)))
        .collect()
}

/// Run `secs` meter ticks.
pub fn tick_for(session: &mut RideSession, secs: u64) {
    for _ in 0..secs {
        session.tick();
    }
}
