//! Async session runner: drives a [`RideSession`] on tokio.
//!
//! One task owns the session. Commands, source events and the 1 Hz meter
//! tick are multiplexed with `select!`, so they never run concurrently. The
//! tick branch is only polled while tracking is active and the interval is
//! reset on every start, so a paused ride accrues nothing and a stopped ride
//! never sees a late tick. Every handled message publishes a fresh
//! [`MeterSnapshot`] on a watch channel.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::error::{SessionError, TariffError, TrackingError};
use crate::meter::TICK_PERIOD_MS;
use crate::position::SourceEvent;
use crate::pricing::FareOptions;
use crate::session::{MeterSnapshot, RideSession};
use crate::tariff::FareMode;

const COMMAND_BUFFER: usize = 16;

/// Commands accepted by a running session.
#[derive(Debug)]
pub enum SessionCommand {
    StartTracking {
        reply: oneshot::Sender<Result<(), TrackingError>>,
    },
    StopTracking,
    ResetDistance,
    ResetMeter,
    SelectMode {
        mode: FareMode,
        reply: oneshot::Sender<Result<(), TariffError>>,
    },
    SetOptions(FareOptions),
}

/// Caller-side handle to a spawned session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    snapshots: watch::Receiver<MeterSnapshot>,
}

impl SessionHandle {
    pub async fn start_tracking(&self) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::StartTracking { reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)??;
        Ok(())
    }

    pub async fn stop_tracking(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::StopTracking).await
    }

    pub async fn reset_distance(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::ResetDistance).await
    }

    pub async fn reset_meter(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::ResetMeter).await
    }

    pub async fn select_mode(&self, mode: FareMode) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::SelectMode { mode, reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)??;
        Ok(())
    }

    pub async fn set_options(&self, options: FareOptions) -> Result<(), SessionError> {
        self.send(SessionCommand::SetOptions(options)).await
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> MeterSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that is notified on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<MeterSnapshot> {
        self.snapshots.clone()
    }

    async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }
}

/// Spawn `session` onto the current tokio runtime, fed by `events`.
///
/// The session ends, releasing its position watch, once every
/// [`SessionHandle`] clone has been dropped.
pub fn spawn_session(
    session: RideSession,
    events: mpsc::Receiver<SourceEvent>,
) -> (SessionHandle, JoinHandle<RideSession>) {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot());
    let task = tokio::spawn(run_session(session, command_rx, events, snapshot_tx));
    (
        SessionHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
        },
        task,
    )
}

/// Run the session loop until the command channel closes.
pub async fn run_session(
    mut session: RideSession,
    mut commands: mpsc::Receiver<SessionCommand>,
    mut events: mpsc::Receiver<SourceEvent>,
    snapshots: watch::Sender<MeterSnapshot>,
) -> RideSession {
    let period = Duration::from_millis(TICK_PERIOD_MS);
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                let was_tracking = session.is_tracking();
                apply_command(&mut session, command);
                if !was_tracking && session.is_tracking() {
                    ticker.reset();
                }
            }
            Some(event) = events.recv() => {
                session.handle_event(event);
            }
            _ = ticker.tick(), if session.is_tracking() => {
                session.tick();
            }
        }
        snapshots.send_replace(session.snapshot());
    }

    session.stop_tracking();
    snapshots.send_replace(session.snapshot());
    info!("ride session closed");
    session
}

fn apply_command(session: &mut RideSession, command: SessionCommand) {
    debug!(?command, "session command");
    match command {
        SessionCommand::StartTracking { reply } => {
            let _ = reply.send(session.start_tracking());
        }
        SessionCommand::StopTracking => session.stop_tracking(),
        SessionCommand::ResetDistance => session.reset_distance(),
        SessionCommand::ResetMeter => session.reset_meter(),
        SessionCommand::SelectMode { mode, reply } => {
            let _ = reply.send(session.select_mode(mode));
        }
        SessionCommand::SetOptions(options) => session.set_options(options),
    }
}
