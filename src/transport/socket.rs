use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::channel::{RealtimeChannel, RealtimeConnector, WsConnector};
use super::messages::Message;
use super::state::{SocketAction, SocketInput, SocketState};
use crate::error::SocketError;

/// `interval_at` rejects a zero period
const MIN_PING_INTERVAL: Duration = Duration::from_millis(1);

/// Configuration for a session socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketConfig {
    /// Base WebSocket URL, e.g. `ws://localhost:8000`
    pub ws_url: String,

    /// Reconnects attempted after an unexpected close before giving up
    /// Default: 3
    pub max_reconnect_attempts: u32,

    /// Fixed delay before each reconnect
    /// Default: 1 second
    pub reconnect_delay: Duration,

    /// Keepalive ping interval while open
    /// Default: 30 seconds
    pub ping_interval: Duration,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            ws_url: "ws://localhost:8000".to_string(),
            max_reconnect_attempts: 3,
            reconnect_delay: Duration::from_millis(1000),
            ping_interval: Duration::from_secs(30),
        }
    }
}

impl SocketConfig {
    pub fn session_url(&self, session_id: &str) -> String {
        format!(
            "{}/ws/interview/{}",
            self.ws_url.trim_end_matches('/'),
            session_id
        )
    }
}

/// Everything a socket reports to its owner, in order
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    /// The channel opened (initially or after a reconnect)
    Connected,
    /// A well-formed server message
    Message(Message),
    /// A non-terminal failure (channel error, send while not connected)
    Error(SocketError),
    /// A reconnect will be dialed after `delay`
    Reconnecting { attempt: u32, delay: Duration },
    /// Reconnects are exhausted. Sent at most once per connect.
    Closed(SocketError),
}

enum Command {
    Send(Message),
    Disconnect,
}

struct DriverHandle {
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

/// Persistent channel to the server for a single interview session
pub struct SessionSocket {
    session_id: String,
    config: SocketConfig,
    connector: Arc<dyn RealtimeConnector>,
    state: Arc<watch::Sender<SocketState>>,
    events: mpsc::UnboundedSender<SocketEvent>,
    driver: Mutex<Option<DriverHandle>>,
}

impl SessionSocket {
    /// Create a socket for `session_id` using the tungstenite connector.
    ///
    /// Returns the socket and the receiving end of its event stream.
    pub fn new(
        session_id: impl Into<String>,
        config: SocketConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SocketEvent>) {
        Self::with_connector(session_id, config, Arc::new(WsConnector))
    }

    pub fn with_connector(
        session_id: impl Into<String>,
        config: SocketConfig,
        connector: Arc<dyn RealtimeConnector>,
    ) -> (Self, mpsc::UnboundedReceiver<SocketEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(SocketState::Disconnected);

        let socket = Self {
            session_id: session_id.into(),
            config,
            connector,
            state: Arc::new(state),
            events,
            driver: Mutex::new(None),
        };

        (socket, events_rx)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> SocketState {
        *self.state.borrow()
    }

    /// Watch state changes
    pub fn subscribe_state(&self) -> watch::Receiver<SocketState> {
        self.state.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_open()
    }

    /// Open the socket. No-op while connecting or open.
    ///
    /// Fails with `ReconnectExhausted` once the socket has given up; call
    /// `disconnect` first to reset it.
    pub async fn connect(&self) -> Result<(), SocketError> {
        let mut driver = self.driver.lock().await;

        match apply(&self.state, SocketInput::Connect, self.config.max_reconnect_attempts) {
            SocketAction::Dial => {}
            _ if self.state() == SocketState::Closed => {
                return Err(SocketError::ReconnectExhausted {
                    attempts: self.config.max_reconnect_attempts,
                });
            }
            _ => {
                debug!("Socket for {} already active", self.session_id);
                return Ok(());
            }
        }

        // A previous driver may have given up; reap it before starting over
        if let Some(previous) = driver.take() {
            let _ = previous.task.await;
        }

        let (commands, commands_rx) = mpsc::unbounded_channel();
        let task = Driver {
            url: self.config.session_url(&self.session_id),
            config: self.config.clone(),
            connector: Arc::clone(&self.connector),
            state: Arc::clone(&self.state),
            events: self.events.clone(),
            commands: commands_rx,
        }
        .spawn();

        *driver = Some(DriverHandle { commands, task });
        Ok(())
    }

    /// Send an answer for the current question.
    ///
    /// Failures, including not being connected, are reported on the event
    /// stream as `SocketEvent::Error`.
    pub async fn send_answer(&self, answer: &str) {
        let driver = self.driver.lock().await;

        let queued = match driver.as_ref() {
            Some(handle) if self.is_connected() => handle
                .commands
                .send(Command::Send(Message::answer(answer)))
                .is_ok(),
            _ => false,
        };

        if !queued {
            warn!("Cannot send answer: socket for {} not connected", self.session_id);
            let _ = self.events.send(SocketEvent::Error(SocketError::NotConnected));
        }
    }

    /// Stop keepalive and reconnection, close the channel and return to
    /// `Disconnected`. Not treated as a failure.
    pub async fn disconnect(&self) {
        let mut driver = self.driver.lock().await;

        apply(&self.state, SocketInput::Disconnect, self.config.max_reconnect_attempts);

        if let Some(handle) = driver.take() {
            let _ = handle.commands.send(Command::Disconnect);
            drop(handle.commands);
            if let Err(e) = handle.task.await {
                error!("Socket driver panicked: {}", e);
            }
        }

        info!("Socket for {} disconnected", self.session_id);
    }
}

/// Apply `input` to the shared state and return the resulting action.
fn apply(state: &watch::Sender<SocketState>, input: SocketInput, max_attempts: u32) -> SocketAction {
    let mut action = SocketAction::None;
    state.send_if_modified(|current| {
        let (next, next_action) = current.transition(input, max_attempts);
        action = next_action;
        let changed = next != *current;
        *current = next;
        changed
    });
    action
}

// ============================================================================
// Driver task
// ============================================================================

struct Driver {
    url: String,
    config: SocketConfig,
    connector: Arc<dyn RealtimeConnector>,
    state: Arc<watch::Sender<SocketState>>,
    events: mpsc::UnboundedSender<SocketEvent>,
    commands: mpsc::UnboundedReceiver<Command>,
}

enum DialExit {
    Open(Box<dyn RealtimeChannel>),
    Failed(SocketError),
    Shutdown,
}

enum PumpExit {
    Dropped,
    Shutdown,
}

enum Step {
    Inbound(Option<Result<String, SocketError>>),
    Command(Option<Command>),
    Ping,
}

impl Driver {
    fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        loop {
            let mut channel = match self.dial().await {
                DialExit::Open(channel) => channel,
                DialExit::Failed(e) => {
                    warn!("Failed to open {}: {}", self.url, e);
                    self.emit(SocketEvent::Error(e));
                    if self.recover().await {
                        continue;
                    }
                    return;
                }
                DialExit::Shutdown => return,
            };

            if self.apply(SocketInput::Opened) != SocketAction::Activate {
                // Disconnected while the handshake was in flight
                channel.close().await;
                return;
            }

            info!("WebSocket connected: {}", self.url);
            self.emit(SocketEvent::Connected);

            match self.pump(channel.as_mut()).await {
                PumpExit::Shutdown => {
                    channel.close().await;
                    return;
                }
                PumpExit::Dropped => {
                    info!("WebSocket closed: {}", self.url);
                    if !self.recover().await {
                        return;
                    }
                }
            }
        }
    }

    async fn dial(&mut self) -> DialExit {
        let connector = Arc::clone(&self.connector);
        let url = self.url.clone();
        let connect = connector.connect(&url);
        tokio::pin!(connect);

        loop {
            let result = tokio::select! {
                result = &mut connect => Some(result),
                command = self.commands.recv() => match command {
                    Some(Command::Send(_)) => None,
                    Some(Command::Disconnect) | None => return DialExit::Shutdown,
                },
            };

            match result {
                Some(Ok(channel)) => return DialExit::Open(channel),
                Some(Err(e)) => return DialExit::Failed(e),
                None => self.emit(SocketEvent::Error(SocketError::NotConnected)),
            }
        }
    }

    /// Deliver messages, write commands and ping until the channel drops or
    /// the owner shuts us down. The keepalive only exists inside this call.
    async fn pump(&mut self, channel: &mut dyn RealtimeChannel) -> PumpExit {
        let period = self.config.ping_interval.max(MIN_PING_INTERVAL);
        let mut keepalive = tokio::time::interval_at(Instant::now() + period, period);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let step = tokio::select! {
                frame = channel.recv() => Step::Inbound(frame),
                command = self.commands.recv() => Step::Command(command),
                _ = keepalive.tick() => Step::Ping,
            };

            match step {
                Step::Inbound(Some(Ok(text))) => self.deliver(&text),
                Step::Inbound(Some(Err(e))) => {
                    error!("WebSocket error: {}", e);
                    self.emit(SocketEvent::Error(e));
                }
                Step::Inbound(None) => return PumpExit::Dropped,
                Step::Command(Some(Command::Send(message))) => {
                    write(&self.events, channel, &message).await
                }
                Step::Command(Some(Command::Disconnect)) | Step::Command(None) => {
                    return PumpExit::Shutdown
                }
                Step::Ping => {
                    debug!("Sending keepalive ping");
                    write(&self.events, channel, &Message::ping()).await;
                }
            }
        }
    }

    /// Handle a drop. Returns true when a reconnect should be dialed.
    async fn recover(&mut self) -> bool {
        match self.apply(SocketInput::Dropped) {
            SocketAction::Retry { attempt } => {
                let delay = self.config.reconnect_delay;
                info!("Reconnecting... Attempt {}", attempt);
                self.emit(SocketEvent::Reconnecting { attempt, delay });
                self.wait(delay).await
            }
            SocketAction::GiveUp { attempts } => {
                warn!("Giving up on {} after {} reconnect attempts", self.url, attempts);
                self.emit(SocketEvent::Closed(SocketError::ReconnectExhausted { attempts }));
                false
            }
            _ => false,
        }
    }

    /// Sleep for `delay` unless shut down first.
    async fn wait(&mut self, delay: Duration) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            let woke = tokio::select! {
                _ = &mut sleep => true,
                command = self.commands.recv() => match command {
                    Some(Command::Send(_)) => false,
                    Some(Command::Disconnect) | None => return false,
                },
            };

            if woke {
                return true;
            }
            self.emit(SocketEvent::Error(SocketError::NotConnected));
        }
    }

    fn deliver(&self, text: &str) {
        match Message::parse_inbound(text) {
            Ok(message) => self.emit(SocketEvent::Message(message)),
            Err(e) => warn!("Failed to parse WebSocket message: {}", e),
        }
    }

    fn apply(&self, input: SocketInput) -> SocketAction {
        apply(&self.state, input, self.config.max_reconnect_attempts)
    }

    fn emit(&self, event: SocketEvent) {
        // The owner may have stopped listening; the socket keeps running regardless
        let _ = self.events.send(event);
    }
}

async fn write(
    events: &mpsc::UnboundedSender<SocketEvent>,
    channel: &mut dyn RealtimeChannel,
    message: &Message,
) {
    let text = match message.to_json() {
        Ok(text) => text,
        Err(e) => {
            error!("Failed to encode {:?} message: {}", message.kind(), e);
            return;
        }
    };

    if let Err(e) = channel.send(text).await {
        error!("Failed to send {:?} message: {}", message.kind(), e);
        let _ = events.send(SocketEvent::Error(e));
    }
}
