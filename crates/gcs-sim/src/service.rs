//! The simulated vehicle service.
//!
//! One tokio task owns the `Simulator`; commands arrive over an mpsc
//! channel and are interleaved with fixed-rate ticks, so no other
//! synchronization is needed. Subscribers get events over a broadcast
//! channel; a lagged receiver skips ahead and never stalls the loop.

use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant};

use gcs_core::models::{
    CinematicShotType, ConfigPatch, ConnectionStatus, DroneConfig, FlightMode, LogLevel,
    LogMessage, Waypoint,
};
use gcs_core::sim::{Simulator, TICK_INTERVAL};
use gcs_core::{DroneEvent, DroneService};

/// The simulated link "comes up" this long after a connect command.
const CONNECT_DELAY: Duration = Duration::from_millis(500);

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug)]
enum SimCommand {
    Connect,
    Disconnect,
    UpdateConfig(ConfigPatch),
    SetArmed(bool),
    SetFlightMode(FlightMode),
    SetCinematicShot(CinematicShotType),
    SetTrackedObject(Option<u32>),
    SetWaypoints(Vec<Waypoint>),
    SetGimbalPitch(f64),
}

struct Worker {
    /// Simulator and command receiver, parked here until `start`.
    pending: Option<(Simulator, mpsc::UnboundedReceiver<SimCommand>)>,
    handle: Option<JoinHandle<()>>,
}

/// Simulated implementation of the facade. Construct with `new`, then
/// call `start` inside a tokio runtime; nothing runs until then.
pub struct SimDroneService {
    commands: mpsc::UnboundedSender<SimCommand>,
    events: broadcast::Sender<DroneEvent>,
    shutdown: broadcast::Sender<()>,
    worker: Mutex<Worker>,
}

impl SimDroneService {
    pub fn new(config: DroneConfig) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (shutdown, _) = broadcast::channel(1);
        Self {
            commands,
            events,
            shutdown,
            worker: Mutex::new(Worker {
                pending: Some((Simulator::new(config), command_rx)),
                handle: None,
            }),
        }
    }

    /// Spawn the vehicle loop. Idempotent; commands issued before this
    /// point are queued and applied once the loop is running.
    pub fn start(&self) {
        if let Ok(mut worker) = self.worker.lock() {
            if let Some((sim, commands)) = worker.pending.take() {
                let events = self.events.clone();
                let shutdown = self.shutdown.subscribe();
                worker.handle = Some(tokio::spawn(run_vehicle_loop(
                    sim, commands, events, shutdown,
                )));
                tracing::info!("Simulated vehicle loop started");
            }
        }
    }

    /// Signal the vehicle loop to exit. Idempotent.
    pub fn stop(&self) {
        let _ = self.shutdown.send(());
        if let Ok(mut worker) = self.worker.lock() {
            worker.handle.take();
        }
    }

    fn send(&self, command: SimCommand) {
        // A stopped loop turns commands into no-ops, never errors.
        let _ = self.commands.send(command);
    }
}

impl DroneService for SimDroneService {
    fn connect(&self) {
        self.send(SimCommand::Connect);
    }

    fn disconnect(&self) {
        self.send(SimCommand::Disconnect);
    }

    fn subscribe(&self) -> broadcast::Receiver<DroneEvent> {
        self.events.subscribe()
    }

    fn update_config(&self, patch: ConfigPatch) {
        self.send(SimCommand::UpdateConfig(patch));
    }

    fn set_armed(&self, armed: bool) {
        self.send(SimCommand::SetArmed(armed));
    }

    fn set_flight_mode(&self, mode: FlightMode) {
        self.send(SimCommand::SetFlightMode(mode));
    }

    fn set_cinematic_shot(&self, shot: CinematicShotType) {
        self.send(SimCommand::SetCinematicShot(shot));
    }

    fn set_tracked_object(&self, id: Option<u32>) {
        self.send(SimCommand::SetTrackedObject(id));
    }

    fn set_waypoints(&self, waypoints: Vec<Waypoint>) {
        self.send(SimCommand::SetWaypoints(waypoints));
    }

    fn set_gimbal_pitch(&self, degrees: f64) {
        self.send(SimCommand::SetGimbalPitch(degrees));
    }
}

async fn run_vehicle_loop(
    mut sim: Simulator,
    mut commands: mpsc::UnboundedReceiver<SimCommand>,
    events: broadcast::Sender<DroneEvent>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(TICK_INTERVAL);
    // Whether snapshots are being emitted. Physics keeps evolving while
    // the link is down; log and status signals still go out.
    let mut link_up = false;
    let mut connect_at: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Vehicle loop shutting down");
                break;
            }
            command = commands.recv() => {
                match command {
                    Some(command) => {
                        apply_command(&mut sim, command, &events, &mut link_up, &mut connect_at);
                    }
                    // Service dropped; nothing can command us anymore.
                    None => break,
                }
            }
            _ = ticker.tick() => {
                if let Some(at) = connect_at {
                    if Instant::now() >= at {
                        connect_at = None;
                        link_up = true;
                        emit(&events, DroneEvent::Status(ConnectionStatus::Connected));
                        emit(&events, DroneEvent::Log(LogMessage::new(
                            LogLevel::Success,
                            "Connected to simulation engine",
                        )));
                    }
                }

                let out = sim.tick();
                for log in out.logs {
                    emit(&events, DroneEvent::Log(log));
                }
                if link_up {
                    emit(&events, DroneEvent::Telemetry(out.telemetry));
                    emit(&events, DroneEvent::Objects(out.objects));
                }
            }
        }
    }
}

fn apply_command(
    sim: &mut Simulator,
    command: SimCommand,
    events: &broadcast::Sender<DroneEvent>,
    link_up: &mut bool,
    connect_at: &mut Option<Instant>,
) {
    let logs = match command {
        SimCommand::Connect => {
            if !*link_up && connect_at.is_none() {
                *connect_at = Some(Instant::now() + CONNECT_DELAY);
            }
            Vec::new()
        }
        SimCommand::Disconnect => {
            *link_up = false;
            *connect_at = None;
            emit(events, DroneEvent::Status(ConnectionStatus::Disconnected));
            Vec::new()
        }
        SimCommand::UpdateConfig(patch) => sim.update_config(patch),
        SimCommand::SetArmed(armed) => sim.set_armed(armed),
        SimCommand::SetFlightMode(mode) => sim.set_flight_mode(mode),
        SimCommand::SetCinematicShot(shot) => sim.set_cinematic_shot(shot),
        SimCommand::SetTrackedObject(id) => sim.set_tracked_object(id),
        SimCommand::SetWaypoints(waypoints) => sim.set_waypoints(waypoints),
        SimCommand::SetGimbalPitch(degrees) => {
            sim.set_gimbal_pitch(degrees);
            Vec::new()
        }
    };

    for log in logs {
        emit(events, DroneEvent::Log(log));
    }
}

fn emit(events: &broadcast::Sender<DroneEvent>, event: DroneEvent) {
    // Err just means nobody is listening right now.
    let _ = events.send(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    async fn next_matching<F>(
        rx: &mut broadcast::Receiver<DroneEvent>,
        mut predicate: F,
    ) -> DroneEvent
    where
        F: FnMut(&DroneEvent) -> bool,
    {
        timeout(WAIT, async {
            loop {
                match rx.recv().await {
                    Ok(event) if predicate(&event) => return event,
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
                }
            }
        })
        .await
        .expect("timed out waiting for event")
    }

    #[tokio::test]
    async fn connect_reports_status_then_streams_telemetry() {
        let service = SimDroneService::new(DroneConfig::default());
        let mut rx = service.subscribe();
        service.start();
        service.connect();

        let status = next_matching(&mut rx, |e| matches!(e, DroneEvent::Status(_))).await;
        match status {
            DroneEvent::Status(s) => assert_eq!(s, ConnectionStatus::Connected),
            _ => unreachable!(),
        }

        service.set_armed(true);
        let telemetry =
            next_matching(&mut rx, |e| {
                matches!(e, DroneEvent::Telemetry(t) if t.altitude > 0.0)
            })
            .await;
        match telemetry {
            DroneEvent::Telemetry(t) => assert!(t.altitude > 0.0),
            _ => unreachable!(),
        }

        service.stop();
    }

    #[tokio::test]
    async fn starting_an_empty_mission_signals_a_warning() {
        let service = SimDroneService::new(DroneConfig::default());
        let mut rx = service.subscribe();
        service.start();
        service.connect();
        service.set_armed(true);
        service.set_flight_mode(FlightMode::AutoMission);

        let event = next_matching(&mut rx, |e| {
            matches!(e, DroneEvent::Log(l) if l.level == LogLevel::Warn)
        })
        .await;
        match event {
            DroneEvent::Log(log) => assert!(log.message.contains("No mission")),
            _ => unreachable!(),
        }

        service.stop();
    }

    #[tokio::test]
    async fn disconnect_gates_snapshots_but_not_command_logs() {
        let service = SimDroneService::new(DroneConfig::default());
        let mut rx = service.subscribe();
        service.start();
        service.connect();
        next_matching(&mut rx, |e| matches!(e, DroneEvent::Status(_))).await;
        next_matching(&mut rx, |e| matches!(e, DroneEvent::Telemetry(_))).await;

        service.disconnect();
        let status = next_matching(&mut rx, |e| matches!(e, DroneEvent::Status(_))).await;
        match status {
            DroneEvent::Status(s) => assert_eq!(s, ConnectionStatus::Disconnected),
            _ => unreachable!(),
        }

        // Drain what was already in flight, then expect command logs only.
        while rx.try_recv().is_ok() {}
        service.set_waypoints(vec![]);
        let event = next_matching(&mut rx, |e| {
            matches!(e, DroneEvent::Log(_) | DroneEvent::Telemetry(_))
        })
        .await;
        assert!(matches!(event, DroneEvent::Log(_)));

        service.stop();
    }
}
