//! Fare computation: tiered distance pricing, moving/waiting time charges,
//! night surcharge and the commission/payout split.
//!
//! [`compute_fare`] is a pure projection of its inputs. It has no hidden state
//! and may be called on every input change.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::meter::MOVING_SPEED_THRESHOLD_KMH;
use crate::tariff::{ClockTime, DistanceTier, TariffConfiguration};

/// Night surcharge as a fraction of base + distance + time fares.
pub const NIGHT_SURCHARGE_RATE: f64 = 0.20;

/// Caller-owned switches. Both default to enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FareOptions {
    pub night_surcharge_enabled: bool,
    pub waiting_charges_enabled: bool,
}

impl Default for FareOptions {
    fn default() -> Self {
        Self {
            night_surcharge_enabled: true,
            waiting_charges_enabled: true,
        }
    }
}

/// Accumulated ride quantities the fare is computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FareInputs {
    pub distance_km: f64,
    pub moving_secs: u64,
    pub waiting_secs: u64,
    pub speed_kmh: f64,
}

/// Status snapshot reported alongside the amounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FareStatus {
    pub is_moving: bool,
    pub is_night_time: bool,
    pub total_distance_km: f64,
    pub total_moving_min: f64,
    pub total_waiting_min: f64,
}

/// Itemised fare. `Default` is the all-zero breakdown of a ride not yet begun.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FareBreakdown {
    pub base_fare: f64,
    pub distance_fare: f64,
    pub time_fare: f64,
    pub waiting_fare: f64,
    pub night_surcharge: f64,
    pub platform_fee: f64,
    pub commission: f64,
    pub total_customer_fare: f64,
    pub net_driver_payout: f64,
    pub status: FareStatus,
}

/// Tiered distance fare.
///
/// Each tier covers the span from the previous boundary (0 for the first) to
/// its own `km`. Distance beyond the last boundary is charged at the last
/// tier's rate.
pub fn distance_fare(tiers: &[DistanceTier], distance_km: f64) -> f64 {
    let mut sorted: Vec<&DistanceTier> = tiers.iter().collect();
    sorted.sort_by(|a, b| a.km.total_cmp(&b.km));

    let mut remaining = distance_km;
    let mut fare = 0.0;
    let mut previous_km = 0.0;
    for tier in &sorted {
        if remaining <= 0.0 {
            break;
        }
        let in_tier = remaining.min(tier.km - previous_km);
        if in_tier > 0.0 {
            fare += in_tier * tier.rate;
            remaining -= in_tier;
        }
        previous_km = tier.km;
    }
    if remaining > 0.0 {
        if let Some(last) = sorted.last() {
            fare += remaining * last.rate;
        }
    }
    fare
}

/// Moving-time fare: minutes in motion times the per-minute rate.
pub fn time_fare(tariff: &TariffConfiguration, moving_secs: u64) -> f64 {
    secs_to_min(moving_secs) * tariff.time_rate_per_min
}

/// Waiting fare after the free threshold, capped. Zero when disabled.
pub fn waiting_fare(tariff: &TariffConfiguration, waiting_secs: u64, enabled: bool) -> f64 {
    if !enabled {
        return 0.0;
    }
    let chargeable_min = (secs_to_min(waiting_secs) - tariff.wait_threshold_min).max(0.0);
    (chargeable_min * tariff.wait_rate_per_min).min(tariff.wait_max_cap)
}

/// Compute the full breakdown for the given tariff and inputs at clock time `now`.
pub fn compute_fare(
    tariff: &TariffConfiguration,
    inputs: FareInputs,
    options: FareOptions,
    now: ClockTime,
) -> FareBreakdown {
    let base_fare = tariff.base_fare;
    let distance_fare = distance_fare(&tariff.distance_tiers, inputs.distance_km);
    let time_fare = time_fare(tariff, inputs.moving_secs);
    let waiting_fare = waiting_fare(tariff, inputs.waiting_secs, options.waiting_charges_enabled);

    let is_night_time = tariff.night_window.contains(now);
    let night_surcharge = if options.night_surcharge_enabled && is_night_time {
        (base_fare + distance_fare + time_fare) * NIGHT_SURCHARGE_RATE
    } else {
        0.0
    };

    let subject_to_commission =
        base_fare + distance_fare + time_fare + waiting_fare + night_surcharge;
    let total_customer_fare = subject_to_commission + tariff.platform_fee;
    let commission = subject_to_commission * tariff.commission_rate;
    let net_driver_payout = total_customer_fare - commission - tariff.platform_fee;

    FareBreakdown {
        base_fare,
        distance_fare,
        time_fare,
        waiting_fare,
        night_surcharge,
        platform_fee: tariff.platform_fee,
        commission,
        total_customer_fare,
        net_driver_payout,
        status: FareStatus {
            is_moving: inputs.speed_kmh > MOVING_SPEED_THRESHOLD_KMH,
            is_night_time,
            total_distance_km: inputs.distance_km,
            total_moving_min: secs_to_min(inputs.moving_secs),
            total_waiting_min: secs_to_min(inputs.waiting_secs),
        },
    }
}

fn secs_to_min(secs: u64) -> f64 {
    secs as f64 / 60.0
}

impl fmt::Display for FareBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines = [
            ("Base fare", self.base_fare),
            ("Distance fare", self.distance_fare),
            ("Time fare", self.time_fare),
            ("Waiting fare", self.waiting_fare),
            ("Night surcharge", self.night_surcharge),
            ("Platform fee", self.platform_fee),
        ];
        for (label, amount) in lines {
            writeln!(f, "{label:<18}{amount:>10.2}")?;
        }
        writeln!(f, "{:<18}{:>10.2}", "Total", self.total_customer_fare)?;
        writeln!(f, "{:<18}{:>10.2}", "Commission", self.commission)?;
        writeln!(f, "{:<18}{:>10.2}", "Driver payout", self.net_driver_payout)?;
        write!(
            f,
            "{:.2} km, {:.1} min moving, {:.1} min waiting{}",
            self.status.total_distance_km,
            self.status.total_moving_min,
            self.status.total_waiting_min,
            if self.status.is_night_time { ", night" } else { "" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tariff::{FareMode, NightWindow, TariffMatrix};
    use crate::test_helpers::{approx_eq, clock};

    fn taxi() -> TariffConfiguration {
        TariffMatrix::builtin()
            .get(FareMode::BikeTaxi)
            .expect("taxi")
            .clone()
    }

    const NOON: &str = "12:00";

    #[test]
    fn worked_example_five_km_ten_minutes() {
        let breakdown = compute_fare(
            &taxi(),
            FareInputs {
                distance_km: 5.0,
                moving_secs: 600,
                waiting_secs: 0,
                speed_kmh: 20.0,
            },
            FareOptions::default(),
            clock(NOON),
        );
        assert!(approx_eq(breakdown.distance_fare, 14.5));
        assert!(approx_eq(breakdown.time_fare, 5.0));
        assert_eq!(breakdown.waiting_fare, 0.0);
        assert_eq!(breakdown.night_surcharge, 0.0);
        assert!(approx_eq(breakdown.total_customer_fare, 41.0));
        assert!(approx_eq(breakdown.commission, 6.93));
        assert!(approx_eq(breakdown.net_driver_payout, 31.57));
        assert!(breakdown.status.is_moving);
        assert!(approx_eq(breakdown.status.total_moving_min, 10.0));
    }

    #[test]
    fn distance_inside_free_tier_costs_nothing() {
        assert_eq!(distance_fare(&taxi().distance_tiers, 1.5), 0.0);
        assert_eq!(distance_fare(&taxi().distance_tiers, 0.0), 0.0);
    }

    #[test]
    fn distance_beyond_last_tier_uses_last_rate() {
        let fare = distance_fare(&taxi().distance_tiers, 110.0);
        // 2*0 + 2*4 + 96*6.5 + 10*6.5
        assert!(approx_eq(fare, 8.0 + 106.0 * 6.5));
    }

    #[test]
    fn single_unbounded_tier_is_linear() {
        let tiers = [DistanceTier {
            km: f64::INFINITY,
            rate: 3.25,
        }];
        for km in [0.0, 0.7, 12.0, 250.5] {
            assert_eq!(distance_fare(&tiers, km), km * 3.25);
        }
    }

    #[test]
    fn unsorted_tiers_are_walked_in_boundary_order() {
        let mut tiers = taxi().distance_tiers;
        tiers.reverse();
        assert!(approx_eq(distance_fare(&tiers, 5.0), 14.5));
    }

    #[test]
    fn distance_fare_is_continuous_across_boundaries() {
        let tiers = taxi().distance_tiers;
        for boundary in [2.0, 4.0, 100.0] {
            let below = distance_fare(&tiers, boundary - 1e-9);
            let above = distance_fare(&tiers, boundary + 1e-9);
            assert!((above - below).abs() < 1e-6, "jump at {boundary}");
            assert!(above >= below);
        }
    }

    #[test]
    fn waiting_fare_has_free_threshold_and_cap() {
        let tariff = taxi();
        assert_eq!(waiting_fare(&tariff, 3 * 60, true), 0.0);
        assert!(approx_eq(waiting_fare(&tariff, 5 * 60, true), 2.0));
        assert!(approx_eq(waiting_fare(&tariff, 18 * 60, true), 15.0));
        assert!(approx_eq(waiting_fare(&tariff, 120 * 60, true), 15.0));
        assert_eq!(waiting_fare(&tariff, 120 * 60, false), 0.0);
    }

    #[test]
    fn waiting_fare_is_monotone_until_cap() {
        let tariff = taxi();
        let mut previous = 0.0;
        for secs in (0..=30 * 60).step_by(15) {
            let fare = waiting_fare(&tariff, secs, true);
            assert!(fare >= previous);
            assert!(fare <= tariff.wait_max_cap);
            previous = fare;
        }
    }

    #[test]
    fn night_surcharge_excludes_waiting_and_platform_fee() {
        let inputs = FareInputs {
            distance_km: 5.0,
            moving_secs: 600,
            waiting_secs: 10 * 60,
            speed_kmh: 0.0,
        };
        let breakdown = compute_fare(&taxi(), inputs, FareOptions::default(), clock("23:30"));
        assert!(breakdown.status.is_night_time);
        assert!(approx_eq(breakdown.night_surcharge, 0.2 * (19.0 + 14.5 + 5.0)));
        assert!(approx_eq(breakdown.waiting_fare, 7.0));
        let expected_total = 19.0 + 14.5 + 5.0 + 7.0 + 7.7 + 2.5;
        assert!(approx_eq(breakdown.total_customer_fare, expected_total));
        assert!(approx_eq(
            breakdown.commission,
            0.18 * (expected_total - 2.5)
        ));
        assert!(!breakdown.status.is_moving);
    }

    #[test]
    fn disabled_night_surcharge_still_reports_night_time() {
        let options = FareOptions {
            night_surcharge_enabled: false,
            ..FareOptions::default()
        };
        let breakdown = compute_fare(&taxi(), FareInputs::default(), options, clock("02:00"));
        assert!(breakdown.status.is_night_time);
        assert_eq!(breakdown.night_surcharge, 0.0);
    }

    #[test]
    fn same_day_window_applies_surcharge_inside_only() {
        let mut tariff = taxi();
        tariff.night_window = NightWindow::new(clock("09:00"), clock("17:00"));
        let at = |hhmm| {
            compute_fare(&tariff, FareInputs::default(), FareOptions::default(), clock(hhmm))
        };
        let inside = at("10:00");
        let outside = at("08:00");
        assert!(approx_eq(inside.night_surcharge, 19.0 * 0.2));
        assert_eq!(outside.night_surcharge, 0.0);
    }

    #[test]
    fn payout_is_total_minus_commission_and_fee() {
        let inputs = FareInputs {
            distance_km: 7.3,
            moving_secs: 1234,
            waiting_secs: 400,
            speed_kmh: 25.0,
        };
        let b = compute_fare(&taxi(), inputs, FareOptions::default(), clock(NOON));
        assert!(approx_eq(
            b.net_driver_payout,
            b.total_customer_fare - b.commission - b.platform_fee
        ));
    }

    #[test]
    fn moving_threshold_is_strict() {
        let at_threshold = FareInputs {
            speed_kmh: MOVING_SPEED_THRESHOLD_KMH,
            ..FareInputs::default()
        };
        let b = compute_fare(&taxi(), at_threshold, FareOptions::default(), clock(NOON));
        assert!(!b.status.is_moving);
    }

    #[test]
    fn options_default_when_fields_are_absent() {
        let options: FareOptions =
            serde_json::from_str(r#"{"waiting_charges_enabled":false}"#).expect("options");
        assert!(options.night_surcharge_enabled);
        assert!(!options.waiting_charges_enabled);
    }

    #[test]
    fn receipt_formats_two_decimals() {
        let b = compute_fare(
            &taxi(),
            FareInputs {
                distance_km: 5.0,
                moving_secs: 600,
                waiting_secs: 0,
                speed_kmh: 0.0,
            },
            FareOptions::default(),
            clock(NOON),
        );
        let receipt = b.to_string();
        assert!(receipt.contains("Total                  41.00"));
        assert!(receipt.contains("Commission              6.93"));
        assert!(receipt.contains("Driver payout          31.57"));
    }
}
