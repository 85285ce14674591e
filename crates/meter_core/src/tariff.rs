//! Tariff configuration: per-mode rates, distance tiers and night windows.
//!
//! A [`TariffMatrix`] maps each [`FareMode`] to a [`TariffConfiguration`].
//! The built-in matrix carries the stock two-wheeler modes; a JSON file with
//! the same shape can replace it. Loaded matrices are validated so the fare
//! engine can assume well-formed tiers and non-negative rates.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::TariffError;

const MINUTES_PER_DAY: u16 = 24 * 60;

/// Time of day at minute resolution, written `"HH:MM"`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime {
    minutes: u16,
}

impl ClockTime {
    /// Build from hour and minute. Returns `None` when out of range.
    pub fn from_hm(hour: u16, minute: u16) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self {
            minutes: hour * 60 + minute,
        })
    }

    /// Start of `hour`. Out-of-range hours fail const evaluation.
    pub const fn on_the_hour(hour: u16) -> Self {
        assert!(hour < 24, "hour out of range");
        Self { minutes: hour * 60 }
    }

    /// Truncate any chrono time value to its hour and minute.
    pub fn from_time<T: Timelike>(time: &T) -> Self {
        Self {
            minutes: (time.hour() * 60 + time.minute()) as u16,
        }
    }

    pub fn minutes_since_midnight(&self) -> u16 {
        self.minutes
    }

    /// Advance by whole minutes, wrapping past midnight.
    pub fn plus_minutes(&self, minutes: u64) -> Self {
        let wrapped = (u64::from(self.minutes) + minutes) % u64::from(MINUTES_PER_DAY);
        Self {
            minutes: wrapped as u16,
        }
    }
}

impl FromStr for ClockTime {
    type Err = TariffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(|time| Self::from_time(&time))
            .map_err(|_| TariffError::InvalidClockTime(s.to_string()))
    }
}

impl TryFrom<String> for ClockTime {
    type Error = TariffError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes / 60, self.minutes % 60)
    }
}

/// Clock window during which the night surcharge applies.
///
/// `start < end` is a same-day window `[start, end)`. Otherwise the window
/// crosses midnight and covers `now >= start || now < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightWindow {
    pub start: ClockTime,
    pub end: ClockTime,
}

impl NightWindow {
    pub const fn new(start: ClockTime, end: ClockTime) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, now: ClockTime) -> bool {
        if self.start < self.end {
            now >= self.start && now < self.end
        } else {
            now >= self.start || now < self.end
        }
    }
}

/// A distance band ending at `km` (cumulative), charged at `rate` per km.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceTier {
    pub km: f64,
    pub rate: f64,
}

/// Static tariff for one service mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffConfiguration {
    pub base_fare: f64,
    pub platform_fee: f64,
    /// Fraction in [0, 1] (0.18 = 18%).
    pub commission_rate: f64,
    pub distance_tiers: Vec<DistanceTier>,
    pub time_rate_per_min: f64,
    /// Free waiting minutes before the waiting rate applies.
    pub wait_threshold_min: f64,
    pub wait_rate_per_min: f64,
    /// Maximum chargeable waiting amount.
    pub wait_max_cap: f64,
    pub night_window: NightWindow,
}

impl TariffConfiguration {
    /// Check the invariants the fare engine relies on.
    pub fn validate(&self, mode: &str) -> Result<(), TariffError> {
        if self.distance_tiers.is_empty() {
            return Err(TariffError::EmptyTiers {
                mode: mode.to_string(),
            });
        }

        let mut previous_km = 0.0;
        for tier in &self.distance_tiers {
            if !(tier.km > previous_km) {
                return Err(TariffError::UnsortedTiers {
                    mode: mode.to_string(),
                    km: tier.km,
                });
            }
            previous_km = tier.km;
        }

        let rates = [
            ("base fare", self.base_fare),
            ("platform fee", self.platform_fee),
            ("time rate", self.time_rate_per_min),
            ("waiting threshold", self.wait_threshold_min),
            ("waiting rate", self.wait_rate_per_min),
            ("waiting cap", self.wait_max_cap),
        ];
        for (field, value) in rates {
            if !(value >= 0.0) {
                return Err(TariffError::NegativeRate {
                    mode: mode.to_string(),
                    field,
                });
            }
        }
        if self.distance_tiers.iter().any(|tier| !(tier.rate >= 0.0)) {
            return Err(TariffError::NegativeRate {
                mode: mode.to_string(),
                field: "distance tier rate",
            });
        }

        if !(0.0..=1.0).contains(&self.commission_rate) {
            return Err(TariffError::CommissionOutOfRange {
                mode: mode.to_string(),
                rate: self.commission_rate,
            });
        }
        Ok(())
    }
}

/// Selectable service mode.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum FareMode {
    #[default]
    BikeTaxi,
    BikeBoost,
    BikeMetro,
}

impl FareMode {
    pub const ALL: [FareMode; 3] = [
        FareMode::BikeTaxi,
        FareMode::BikeBoost,
        FareMode::BikeMetro,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FareMode::BikeTaxi => "BikeTaxi",
            FareMode::BikeBoost => "BikeBoost",
            FareMode::BikeMetro => "BikeMetro",
        }
    }
}

impl fmt::Display for FareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FareMode {
    type Err = TariffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FareMode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TariffError::UnknownMode(s.to_string()))
    }
}

/// Tariff per service mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TariffMatrix {
    tariffs: BTreeMap<FareMode, TariffConfiguration>,
}

impl TariffMatrix {
    /// The stock tariffs for all three modes.
    pub fn builtin() -> Self {
        let mut tariffs = BTreeMap::new();
        tariffs.insert(
            FareMode::BikeTaxi,
            stock_tariff(
                19.0,
                0.18,
                [(2.0, 0.0), (4.0, 4.0), (100.0, 6.5)],
                0.5,
                (3.0, 1.0),
                TAXI_NIGHT,
            ),
        );
        tariffs.insert(
            FareMode::BikeBoost,
            stock_tariff(
                13.0,
                0.09,
                [(2.0, 0.0), (4.0, 5.5), (100.0, 5.5)],
                0.35,
                (3.0, 1.5),
                BIKE_NIGHT,
            ),
        );
        tariffs.insert(
            FareMode::BikeMetro,
            stock_tariff(
                17.0,
                0.09,
                [(3.0, 0.0), (4.0, 7.0), (100.0, 6.0)],
                0.35,
                (5.0, 1.0),
                BIKE_NIGHT,
            ),
        );
        Self { tariffs }
    }

    /// Parse and validate a JSON matrix keyed by mode name.
    pub fn from_json_str(json: &str) -> Result<Self, TariffError> {
        let matrix: TariffMatrix = serde_json::from_str(json)?;
        matrix.validate()?;
        Ok(matrix)
    }

    /// Read, parse and validate a JSON matrix from disk.
    pub fn load(path: &Path) -> Result<Self, TariffError> {
        let json = std::fs::read_to_string(path)?;
        let matrix = Self::from_json_str(&json)?;
        info!(path = %path.display(), modes = matrix.tariffs.len(), "tariff matrix loaded");
        Ok(matrix)
    }

    pub fn validate(&self) -> Result<(), TariffError> {
        for (mode, tariff) in &self.tariffs {
            tariff.validate(mode.as_str())?;
        }
        Ok(())
    }

    pub fn get(&self, mode: FareMode) -> Result<&TariffConfiguration, TariffError> {
        self.tariffs
            .get(&mode)
            .ok_or_else(|| TariffError::MissingMode(mode.to_string()))
    }

    pub fn insert(&mut self, mode: FareMode, tariff: TariffConfiguration) {
        self.tariffs.insert(mode, tariff);
    }

    pub fn modes(&self) -> impl Iterator<Item = FareMode> + '_ {
        self.tariffs.keys().copied()
    }
}

impl Default for TariffMatrix {
    fn default() -> Self {
        Self::builtin()
    }
}

const TAXI_NIGHT: NightWindow =
    NightWindow::new(ClockTime::on_the_hour(23), ClockTime::on_the_hour(6));
const BIKE_NIGHT: NightWindow =
    NightWindow::new(ClockTime::on_the_hour(22), ClockTime::on_the_hour(5));

/// Stock tariffs share the platform fee and waiting cap. `waiting` is
/// (free minutes, rate per minute).
fn stock_tariff(
    base_fare: f64,
    commission_rate: f64,
    tiers: [(f64, f64); 3],
    time_rate_per_min: f64,
    waiting: (f64, f64),
    night_window: NightWindow,
) -> TariffConfiguration {
    let (wait_threshold_min, wait_rate_per_min) = waiting;
    TariffConfiguration {
        base_fare,
        platform_fee: 2.5,
        commission_rate,
        distance_tiers: tiers
            .into_iter()
            .map(|(km, rate)| DistanceTier { km, rate })
            .collect(),
        time_rate_per_min,
        wait_threshold_min,
        wait_rate_per_min,
        wait_max_cap: 15.0,
        night_window,
    }
}
