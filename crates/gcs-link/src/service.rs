//! Facade implementation that relays commands and updates over a
//! WebSocket to a real vehicle bridge.
//!
//! Transport failures never surface as errors to the caller: they become
//! connection-status events, and the link retries on a fixed interval
//! until told to disconnect.

use std::sync::Mutex;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use gcs_core::models::{
    CinematicShotType, ConfigPatch, ConnectionStatus, FlightMode, LogLevel, LogMessage, Waypoint,
};
use gcs_core::{DroneEvent, DroneService};

use crate::wire::{CommandFrame, UpdateFrame};

/// Fixed delay between reconnection attempts.
const RECONNECT_INTERVAL: Duration = Duration::from_secs(3);

const EVENT_CHANNEL_CAPACITY: usize = 256;

type BridgeSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("bridge handshake failed: {0}")]
    Handshake(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("command frame could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug)]
enum LinkCommand {
    Connect,
    Disconnect,
    Send(CommandFrame),
}

struct Worker {
    pending: Option<mpsc::UnboundedReceiver<LinkCommand>>,
    handle: Option<JoinHandle<()>>,
}

/// Live-bridge implementation of the facade. Construct with `new`, then
/// call `start` inside a tokio runtime.
pub struct LinkDroneService {
    url: String,
    commands: mpsc::UnboundedSender<LinkCommand>,
    events: broadcast::Sender<DroneEvent>,
    shutdown: broadcast::Sender<()>,
    worker: Mutex<Worker>,
}

impl LinkDroneService {
    /// `url` is the bridge endpoint, e.g. `ws://localhost:8000/ws`.
    pub fn new(url: impl Into<String>) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (shutdown, _) = broadcast::channel(1);
        Self {
            url: url.into(),
            commands,
            events,
            shutdown,
            worker: Mutex::new(Worker {
                pending: Some(command_rx),
                handle: None,
            }),
        }
    }

    /// Spawn the link loop. Idempotent.
    pub fn start(&self) {
        if let Ok(mut worker) = self.worker.lock() {
            if let Some(commands) = worker.pending.take() {
                let url = self.url.clone();
                let events = self.events.clone();
                let shutdown = self.shutdown.subscribe();
                worker.handle = Some(tokio::spawn(run_link_loop(url, commands, events, shutdown)));
                tracing::info!("Bridge link loop started");
            }
        }
    }

    /// Signal the link loop to exit. Idempotent.
    pub fn stop(&self) {
        let _ = self.shutdown.send(());
        if let Ok(mut worker) = self.worker.lock() {
            worker.handle.take();
        }
    }

    fn send(&self, command: LinkCommand) {
        let _ = self.commands.send(command);
    }
}

impl DroneService for LinkDroneService {
    fn connect(&self) {
        self.send(LinkCommand::Connect);
    }

    fn disconnect(&self) {
        self.send(LinkCommand::Disconnect);
    }

    fn subscribe(&self) -> broadcast::Receiver<DroneEvent> {
        self.events.subscribe()
    }

    fn update_config(&self, patch: ConfigPatch) {
        self.send(LinkCommand::Send(CommandFrame::SetConfig(patch)));
    }

    fn set_armed(&self, armed: bool) {
        self.send(LinkCommand::Send(CommandFrame::SetArmed { armed }));
    }

    fn set_flight_mode(&self, mode: FlightMode) {
        self.send(LinkCommand::Send(CommandFrame::SetMode { mode }));
    }

    fn set_cinematic_shot(&self, shot: CinematicShotType) {
        self.send(LinkCommand::Send(CommandFrame::SetShot { shot }));
    }

    fn set_tracked_object(&self, id: Option<u32>) {
        self.send(LinkCommand::Send(CommandFrame::SetTrackTarget { id }));
    }

    fn set_waypoints(&self, waypoints: Vec<Waypoint>) {
        self.send(LinkCommand::Send(CommandFrame::UploadMission { waypoints }));
    }

    fn set_gimbal_pitch(&self, degrees: f64) {
        self.send(LinkCommand::Send(CommandFrame::GimbalPitch { pitch: degrees }));
    }
}

/// Why the socket-driving loop returned.
enum Outcome {
    /// Service is shutting down.
    Shutdown,
    /// Operator asked for disconnect; do not retry.
    Stopped,
    /// Transport dropped; retry after the fixed interval.
    Lost,
}

async fn run_link_loop(
    url: String,
    mut commands: mpsc::UnboundedReceiver<LinkCommand>,
    events: broadcast::Sender<DroneEvent>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut want_link = false;

    loop {
        if !want_link {
            tokio::select! {
                _ = shutdown.recv() => break,
                command = commands.recv() => match command {
                    Some(LinkCommand::Connect) => want_link = true,
                    Some(LinkCommand::Disconnect) => {}
                    Some(LinkCommand::Send(frame)) => {
                        tracing::warn!(?frame, "Dropping command: bridge not connected");
                    }
                    None => break,
                },
            }
            continue;
        }

        emit(&events, DroneEvent::Status(ConnectionStatus::Connecting));
        let outcome = match open_socket(&url).await {
            Ok(socket) => {
                emit(&events, DroneEvent::Status(ConnectionStatus::Connected));
                emit(
                    &events,
                    DroneEvent::Log(LogMessage::new(LogLevel::Success, "Live bridge connected")),
                );
                drive_socket(socket, &mut commands, &events, &mut shutdown).await
            }
            Err(err) => {
                tracing::warn!("Bridge connection failed: {err}");
                Outcome::Lost
            }
        };

        match outcome {
            Outcome::Shutdown => break,
            Outcome::Stopped => {
                want_link = false;
                emit(&events, DroneEvent::Status(ConnectionStatus::Disconnected));
            }
            Outcome::Lost => {
                emit(&events, DroneEvent::Status(ConnectionStatus::Disconnected));
                emit(
                    &events,
                    DroneEvent::Log(LogMessage::new(
                        LogLevel::Error,
                        "Bridge disconnected; retrying",
                    )),
                );
                tokio::select! {
                    _ = shutdown.recv() => break,
                    _ = tokio::time::sleep(RECONNECT_INTERVAL) => {}
                    command = commands.recv() => match command {
                        Some(LinkCommand::Disconnect) => want_link = false,
                        Some(LinkCommand::Connect) => {}
                        Some(LinkCommand::Send(frame)) => {
                            tracing::warn!(?frame, "Dropping command: bridge not connected");
                        }
                        None => break,
                    },
                }
            }
        }
    }
}

async fn open_socket(url: &str) -> Result<BridgeSocket, LinkError> {
    let (socket, _) = connect_async(url).await?;
    Ok(socket)
}

async fn drive_socket(
    mut socket: BridgeSocket,
    commands: &mut mpsc::UnboundedReceiver<LinkCommand>,
    events: &broadcast::Sender<DroneEvent>,
    shutdown: &mut broadcast::Receiver<()>,
) -> Outcome {
    loop {
        tokio::select! {
            _ = shutdown.recv() => return Outcome::Shutdown,
            command = commands.recv() => match command {
                Some(LinkCommand::Send(frame)) => {
                    match serde_json::to_string(&frame) {
                        Ok(text) => {
                            if socket.send(Message::Text(text)).await.is_err() {
                                return Outcome::Lost;
                            }
                        }
                        Err(err) => tracing::error!("Unencodable command frame: {err}"),
                    }
                }
                Some(LinkCommand::Disconnect) => {
                    let _ = socket.close(None).await;
                    return Outcome::Stopped;
                }
                Some(LinkCommand::Connect) => {}
                None => return Outcome::Shutdown,
            },
            message = socket.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<UpdateFrame>(&text) {
                        Ok(update) => {
                            for event in update.into_events() {
                                emit(events, event);
                            }
                        }
                        Err(err) => tracing::debug!("Ignoring unparseable bridge frame: {err}"),
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return Outcome::Lost,
                Some(Ok(_)) => {}
            },
        }
    }
}

fn emit(events: &broadcast::Sender<DroneEvent>, event: DroneEvent) {
    let _ = events.send(event);
}
