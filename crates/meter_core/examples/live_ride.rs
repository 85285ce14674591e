//! Drive a session on the async runner with a simulated GPS feed and print the fare.
//!
//! Time is paused and auto-advanced, so the two-minute ride finishes instantly.
//!
//! Run with: cargo run -p meter_core --example live_ride

use std::time::Duration;

use meter_core::position::{PushSource, SourceEvent};
use meter_core::runner::spawn_session;
use meter_core::session::RideSession;
use meter_core::tariff::{FareMode, TariffMatrix};
use meter_core::test_helpers::jittered_route;
use tokio::sync::mpsc;

#[tokio::main(flavor = "current_thread", start_paused = true)]
async fn main() {
    const RIDE_SECS: usize = 120;

    let session = RideSession::new(
        Box::new(PushSource::default()),
        TariffMatrix::builtin(),
        FareMode::BikeBoost,
    )
    .expect("builtin matrix has every mode");
    let (event_tx, event_rx) = mpsc::channel(32);
    let (handle, task) = spawn_session(session, event_rx);

    handle.start_tracking().await.expect("push source starts");

    // One fix per second, ~9 m apart with a few metres of noise.
    let feed = tokio::spawn(async move {
        for fix in jittered_route(2024, RIDE_SECS, 9.0, 3.0) {
            if event_tx.send(SourceEvent::Fix(fix)).await.is_err() {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    });
    feed.await.expect("feed task");

    handle.stop_tracking().await.expect("stop");
    let mut updates = handle.subscribe();
    updates
        .wait_for(|snapshot| !snapshot.tracker.is_tracking)
        .await
        .expect("session still running");

    let snapshot = handle.snapshot();
    println!("--- Live ride ({}, {} s of fixes) ---", snapshot.mode, RIDE_SECS);
    println!(
        "Moving: {} s, waiting: {} s",
        snapshot.buckets.moving_secs, snapshot.buckets.waiting_secs
    );
    println!("{}", snapshot.fare);

    drop(updates);
    drop(handle);
    task.await.expect("runner task");
}
