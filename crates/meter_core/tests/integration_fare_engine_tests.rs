mod support;

use meter_core::meter::MotionState;
use meter_core::position::SourceEvent;
use meter_core::pricing::{compute_fare, FareBreakdown, FareInputs, FareOptions};
use meter_core::tariff::{DistanceTier, FareMode, NightWindow, TariffConfiguration};
use meter_core::test_helpers::{approx_eq, clock, fix_with, offset_north_m};
use support::ride::{feed, tick_for, RideBuilder};

fn worked_example_tariff() -> TariffConfiguration {
    TariffConfiguration {
        base_fare: 19.0,
        platform_fee: 2.5,
        commission_rate: 0.18,
        distance_tiers: vec![
            DistanceTier { km: 2.0, rate: 0.0 },
            DistanceTier { km: 4.0, rate: 4.0 },
            DistanceTier {
                km: 100.0,
                rate: 6.5,
            },
        ],
        time_rate_per_min: 0.5,
        wait_threshold_min: 3.0,
        wait_rate_per_min: 1.0,
        wait_max_cap: 15.0,
        night_window: NightWindow::new(clock("23:00"), clock("06:00")),
    }
}

#[test]
fn worked_example_breakdown() {
    let b = compute_fare(
        &worked_example_tariff(),
        FareInputs {
            distance_km: 5.0,
            moving_secs: 10 * 60,
            waiting_secs: 0,
            speed_kmh: 0.0,
        },
        FareOptions::default(),
        clock("12:00"),
    );
    assert!(approx_eq(b.base_fare, 19.0));
    assert!(approx_eq(b.distance_fare, 14.5));
    assert!(approx_eq(b.time_fare, 5.0));
    assert_eq!(b.waiting_fare, 0.0);
    assert_eq!(b.night_surcharge, 0.0);
    assert!(approx_eq(b.platform_fee, 2.5));
    assert!(approx_eq(b.total_customer_fare, 41.0));
    assert!(approx_eq(b.commission, 6.93));
    assert!(approx_eq(b.net_driver_payout, 31.57));
}

#[test]
fn computation_is_pure_and_repeatable() {
    let tariff = worked_example_tariff();
    let inputs = FareInputs {
        distance_km: 8.25,
        moving_secs: 733,
        waiting_secs: 421,
        speed_kmh: 14.0,
    };
    let first = compute_fare(&tariff, inputs, FareOptions::default(), clock("23:45"));
    for _ in 0..10 {
        assert_eq!(
            compute_fare(&tariff, inputs, FareOptions::default(), clock("23:45")),
            first
        );
    }
}

#[test]
fn distance_fare_is_non_decreasing() {
    let tariff = worked_example_tariff();
    let mut previous = 0.0;
    for step in 0..=1200 {
        let km = f64::from(step) * 0.1;
        let b = compute_fare(
            &tariff,
            FareInputs {
                distance_km: km,
                ..FareInputs::default()
            },
            FareOptions::default(),
            clock("12:00"),
        );
        assert!(b.distance_fare >= previous, "decreased at {km} km");
        previous = b.distance_fare;
    }
}

#[test]
fn waiting_charges_toggle_forces_zero() {
    let options = FareOptions {
        waiting_charges_enabled: false,
        ..FareOptions::default()
    };
    for minutes in [0, 3, 10, 60, 600] {
        let b = compute_fare(
            &worked_example_tariff(),
            FareInputs {
                waiting_secs: minutes * 60,
                ..FareInputs::default()
            },
            options,
            clock("12:00"),
        );
        assert_eq!(b.waiting_fare, 0.0);
        assert!(approx_eq(b.status.total_waiting_min, minutes as f64));
    }
}

#[test]
fn night_window_edges() {
    let tariff = worked_example_tariff();
    let night = |hhmm: &str| {
        compute_fare(&tariff, FareInputs::default(), FareOptions::default(), clock(hhmm))
            .status
            .is_night_time
    };
    assert!(night("23:30"));
    assert!(night("02:00"));
    assert!(night("23:00"));
    assert!(night("05:59"));
    assert!(!night("12:00"));
    assert!(!night("06:00"));
    assert!(!night("22:59"));
}

#[test]
fn zero_state_before_any_tracking_in_every_mode() {
    for mode in FareMode::ALL {
        for hhmm in ["03:00", "12:00"] {
            let session = RideBuilder::new().with_mode(mode).at_clock(hhmm).build();
            assert_eq!(session.fare(), FareBreakdown::default(), "{mode} at {hhmm}");
        }
    }
}

#[test]
fn full_ride_through_session() {
    let mut session = RideBuilder::new().at_clock("12:00").started();

    // Two minutes waiting at the pickup.
    let pickup = fix_with(12.9716, 77.5946, Some(0.0), 6.0);
    feed(&mut session, &[pickup]);
    tick_for(&mut session, 120);

    // Ride 3 km north at 10 m/s over 5 minutes, one fix every 10 s.
    let mut current = pickup;
    for _ in 0..30 {
        current = offset_north_m(&current, 100.0);
        current.speed_mps = Some(10.0);
        session.handle_event(SourceEvent::Fix(current));
        for _ in 0..10 {
            assert_eq!(session.tick(), Some(MotionState::Moving));
        }
    }

    // Stopped at the drop-off for another two minutes.
    let dropoff = fix_with(current.latitude, current.longitude, Some(0.0), 6.0);
    feed(&mut session, &[dropoff]);
    tick_for(&mut session, 120);
    session.stop_tracking();

    let b = session.fare();
    assert!((b.status.total_distance_km - 3.0).abs() < 1e-6);
    assert!(approx_eq(b.status.total_moving_min, 5.0));
    assert!(approx_eq(b.status.total_waiting_min, 4.0));
    // 1 km at 4.0 after the free 2 km.
    assert!((b.distance_fare - 4.0).abs() < 1e-5);
    assert!(approx_eq(b.time_fare, 2.5));
    // One chargeable waiting minute.
    assert!(approx_eq(b.waiting_fare, 1.0));
    assert!(!b.status.is_moving);
    assert!((b.total_customer_fare - (19.0 + 4.0 + 2.5 + 1.0 + 2.5)).abs() < 1e-5);
}

#[test]
fn disabling_night_surcharge_through_session() {
    let mut session = RideBuilder::new()
        .at_clock("01:30")
        .with_options(FareOptions {
            night_surcharge_enabled: false,
            waiting_charges_enabled: true,
        })
        .started();
    tick_for(&mut session, 60);
    let b = session.fare();
    assert!(b.status.is_night_time);
    assert_eq!(b.night_surcharge, 0.0);

    session.set_options(FareOptions::default());
    assert!(approx_eq(session.fare().night_surcharge, 19.0 * 0.2));
}

#[test]
fn reset_meter_twice_matches_once() {
    let mut session = RideBuilder::new().started();
    tick_for(&mut session, 42);
    session.stop_tracking();

    session.reset_meter();
    let once = (session.buckets(), session.fare());
    session.reset_meter();
    assert_eq!((session.buckets(), session.fare()), once);
    assert_eq!(once.0.moving_secs + once.0.waiting_secs, 0);
}
