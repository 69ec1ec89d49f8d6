//! WebSocket connection manager and event loop.
//!
//! The manager owns exactly one socket at a time. It runs as a single
//! tokio task that multiplexes four inputs in one `select!` loop:
//!
//! - commands from client handles (connect, disconnect, send, shutdown)
//! - the in-flight connection attempt, if any
//! - inbound frames from the open socket, if any
//! - the scheduled reconnect timer, if any
//! - the close handshake deadline, if the server started closing
//!
//! Everything the loop mutates (socket, correlator, close flag, retry
//! timer) is owned by the task, so no locking is involved. Hooks and reply
//! handlers run inline on the task; re-entrant calls from them are queued
//! as commands.
//!
//! # States
//!
//! ```text
//!               connect                 open ok
//! Disconnected ─────────► Connecting ─────────────► Connected
//!      ▲  ▲                   │ fail / timeout          │ close / error
//!      │  └───────────────────┴─────────────────────────┤
//!      │                                                 │ disconnect
//!      └──────────────────── Closing ◄───────────────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::{Sleep, sleep, timeout};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};

use crate::client::{ClientOptions, EndpointSource, LifecycleHooks, MrcClient};
use crate::error::{Error, Result};
use crate::protocol::{Call, Inbound, Outbound, codec};

use super::correlator::{Correlator, ReplySink};
use super::subscription::Listeners;

// ============================================================================
// Types
// ============================================================================

/// Client-side WebSocket stream.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// In-flight connection attempt.
type ConnectFuture = BoxFuture<'static, Result<WsStream>>;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No socket, no attempt in flight.
    #[default]
    Disconnected,
    /// Attempt in flight.
    Connecting,
    /// Socket open; calls are transmitted.
    Connected,
    /// Close handshake in progress.
    Closing,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closing => "closing",
        })
    }
}

// ============================================================================
// ManagerCommand
// ============================================================================

/// Commands sent from client handles to the event loop.
pub(crate) enum ManagerCommand {
    /// Start connecting (or replace hooks when already active).
    Connect(Arc<LifecycleHooks>),
    /// Close and stop reconnecting.
    Disconnect,
    /// Transmit a call if the socket is open.
    Send {
        call: Call,
        sink: Option<ReplySink>,
    },
    /// Stop the event loop.
    Shutdown,
}

// ============================================================================
// ConnectionManager
// ============================================================================

/// State machine owning the socket lifecycle.
pub(crate) struct ConnectionManager {
    /// Endpoint for each attempt.
    endpoint: EndpointSource,
    /// Timeouts and reconnect policy.
    options: ClientOptions,
    /// Pending replies.
    correlator: Correlator,
    /// Push listeners (shared with client handles).
    listeners: Arc<Listeners>,
    /// Published state.
    state_tx: watch::Sender<ConnectionState>,
    /// Used to hand a client handle to hooks without keeping the loop alive.
    command_tx: mpsc::WeakUnboundedSender<ManagerCommand>,
    /// Open/close hooks from the last `connect`.
    hooks: Arc<LifecycleHooks>,
    /// Set by `disconnect`, cleared by `connect`.
    close_requested: bool,
    /// Scheduled reconnect.
    retry: Option<Pin<Box<Sleep>>>,
    /// Bounds a server-initiated close handshake.
    close_deadline: Option<Pin<Box<Sleep>>>,
    /// Consecutive failed attempts since the last successful open.
    failed_attempts: u32,
    /// Attempt in flight.
    connecting: Option<ConnectFuture>,
    /// Open socket.
    socket: Option<WsStream>,
}

impl ConnectionManager {
    /// Creates a manager in the `Disconnected` state.
    pub(crate) fn new(
        endpoint: EndpointSource,
        options: ClientOptions,
        listeners: Arc<Listeners>,
        state_tx: watch::Sender<ConnectionState>,
        command_tx: mpsc::WeakUnboundedSender<ManagerCommand>,
    ) -> Self {
        Self {
            endpoint,
            options,
            correlator: Correlator::new(),
            listeners,
            state_tx,
            command_tx,
            hooks: Arc::new(LifecycleHooks::new()),
            close_requested: false,
            retry: None,
            close_deadline: None,
            failed_attempts: 0,
            connecting: None,
            socket: None,
        }
    }

    /// Event loop. Returns on `Shutdown` or when every sender is dropped.
    ///
    /// Hooks and push listeners that captured a client clone hold a sender,
    /// so in that case only `Shutdown` ends the loop.
    pub(crate) async fn run(mut self, mut command_rx: mpsc::UnboundedReceiver<ManagerCommand>) {
        debug!(endpoint = ?self.endpoint, "Connection manager started");

        loop {
            tokio::select! {
                command = command_rx.recv() => {
                    match command {
                        Some(ManagerCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            break;
                        }
                        Some(command) => self.handle_command(command).await,
                        None => {
                            debug!("All client handles dropped");
                            break;
                        }
                    }
                }

                result = poll_attempt(&mut self.connecting) => {
                    self.connecting = None;
                    self.handle_attempt(result);
                }

                message = read_socket(&mut self.socket) => {
                    self.handle_message(message);
                }

                () = wait_timer(&mut self.retry) => {
                    self.retry = None;
                    self.handle_retry();
                }

                () = wait_timer(&mut self.close_deadline) => {
                    self.close_deadline = None;
                    self.handle_close_deadline();
                }
            }
        }

        self.teardown().await;
        debug!("Connection manager terminated");
    }

    // ========================================================================
    // Commands
    // ========================================================================

    async fn handle_command(&mut self, command: ManagerCommand) {
        match command {
            ManagerCommand::Connect(hooks) => self.connect(hooks),
            ManagerCommand::Disconnect => self.disconnect().await,
            ManagerCommand::Send { call, sink } => self.send(call, sink).await,
            ManagerCommand::Shutdown => {}
        }
    }

    fn connect(&mut self, hooks: Arc<LifecycleHooks>) {
        self.hooks = hooks;
        self.close_requested = false;

        if self.socket.is_some() || self.connecting.is_some() {
            debug!(state = %self.state(), "Already connecting or connected; hooks replaced");
            return;
        }

        self.retry = None;
        self.failed_attempts = 0;
        self.start_attempt();
    }

    async fn disconnect(&mut self) {
        self.close_requested = true;

        if self.retry.take().is_some() {
            debug!("Scheduled reconnect cancelled");
        }

        if self.connecting.take().is_some() {
            debug!("Connection attempt aborted");
            self.handle_closed();
            return;
        }

        let Some(mut socket) = self.socket.take() else {
            trace!("Disconnect while already disconnected");
            return;
        };

        self.set_state(ConnectionState::Closing);
        match timeout(self.options.close_timeout, socket.close(None)).await {
            Ok(Ok(())) => debug!("WebSocket closed"),
            Ok(Err(e)) => debug!(error = %e, "WebSocket close failed"),
            Err(_) => debug!("WebSocket close handshake timed out"),
        }
        self.handle_closed();
    }

    async fn send(&mut self, call: Call, sink: Option<ReplySink>) {
        if self.state() != ConnectionState::Connected {
            trace!(action = %call.action, state = %self.state(), "Dropping call: not connected");
            return;
        }
        let Some(socket) = self.socket.as_mut() else {
            trace!(action = %call.action, "Dropping call: no socket");
            return;
        };

        let outbound = match sink {
            Some(sink) => self.correlator.tag(call, sink),
            None => Outbound::untagged(call),
        };

        let text = match codec::encode(&outbound) {
            Ok(text) => text,
            Err(e) => {
                warn!(action = %outbound.action, error = %e, "Failed to encode call");
                if let Some(id) = outbound.id {
                    self.correlator.forget(id);
                }
                return;
            }
        };

        trace!(action = %outbound.action, id = ?outbound.id, "Sending call");

        let written = socket.send(Message::Text(text.into())).await;
        if let Err(e) = written {
            warn!(error = %e, "Failed to write to WebSocket");
            self.socket = None;
            self.handle_closed();
        }
    }

    // ========================================================================
    // Attempts
    // ========================================================================

    fn start_attempt(&mut self) {
        self.set_state(ConnectionState::Connecting);

        self.connecting = Some(Box::pin(open_socket(
            self.endpoint.clone(),
            self.options.connect_timeout,
        )));
    }

    fn handle_attempt(&mut self, result: Result<WsStream>) {
        match result {
            Ok(socket) => {
                self.socket = Some(socket);
                self.failed_attempts = 0;
                self.set_state(ConnectionState::Connected);
                info!("MRC connection established");

                let hooks = Arc::clone(&self.hooks);
                if let Some(client) = self.client_handle() {
                    hooks.open(&client);
                }
            }
            Err(e) => {
                warn!(error = %e, attempt = self.failed_attempts + 1, "Connection attempt failed");
                self.handle_closed();
            }
        }
    }

    fn handle_retry(&mut self) {
        if self.close_requested {
            trace!("Stale reconnect timer ignored");
            return;
        }
        debug!(attempt = self.failed_attempts, "Reconnecting");
        self.start_attempt();
    }

    // ========================================================================
    // Inbound
    // ========================================================================

    fn handle_message(&mut self, message: Option<std::result::Result<Message, WsError>>) {
        match message {
            Some(Ok(Message::Text(text))) => self.dispatch(codec::decode(&text)),

            Some(Ok(Message::Binary(bytes))) => self.dispatch(codec::decode_bytes(&bytes)),

            // Keep reading so tungstenite flushes the close reply; the
            // stream then ends and takes the `None` arm.
            Some(Ok(Message::Close(frame))) => {
                debug!(?frame, "WebSocket closed by server");
                self.begin_remote_close();
            }

            Some(Err(e)) => {
                warn!(error = %e, "WebSocket error");
                self.socket = None;
                self.handle_closed();
            }

            None => {
                debug!("WebSocket stream ended");
                self.socket = None;
                self.handle_closed();
            }

            // Ping/Pong are answered by tungstenite
            Some(Ok(_)) => {}
        }
    }

    fn dispatch(&mut self, inbound: Result<Inbound>) {
        match inbound {
            Ok(Inbound::Reply(reply)) => {
                self.correlator.resolve(reply);
            }
            Ok(Inbound::Push(push)) => self.listeners.dispatch(&push),
            Err(e) => warn!(error = %e, "Discarding malformed frame"),
        }
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Server sent a close frame. Pending replies can no longer arrive and
    /// new calls are dropped while the handshake finishes.
    fn begin_remote_close(&mut self) {
        self.correlator.drop_all();
        self.set_state(ConnectionState::Closing);
        self.close_deadline = Some(Box::pin(sleep(self.options.close_timeout)));
    }

    fn handle_close_deadline(&mut self) {
        debug!(timeout = ?self.options.close_timeout, "Close handshake timed out");
        self.socket = None;
        self.handle_closed();
    }

    /// Common close path: drop pending replies, publish `Disconnected`,
    /// run the close hook, and schedule a retry unless closing was asked for.
    fn handle_closed(&mut self) {
        self.close_deadline = None;
        self.correlator.drop_all();
        self.set_state(ConnectionState::Disconnected);
        self.hooks.close();

        if self.close_requested {
            return;
        }

        self.failed_attempts = self.failed_attempts.saturating_add(1);
        match self.options.reconnect.delay_for(self.failed_attempts) {
            Some(delay) => {
                debug!(?delay, attempt = self.failed_attempts, "Reconnect scheduled");
                self.retry = Some(Box::pin(sleep(delay)));
            }
            None => {
                warn!(
                    attempts = self.failed_attempts,
                    "Reconnect policy exhausted; staying disconnected"
                );
            }
        }
    }

    async fn teardown(&mut self) {
        self.retry = None;
        self.close_deadline = None;
        self.connecting = None;

        if let Some(mut socket) = self.socket.take() {
            let _ = timeout(self.options.close_timeout, socket.close(None)).await;
        }

        self.correlator.drop_all();
        self.set_state(ConnectionState::Disconnected);
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            trace!(from = %previous, to = %state, "State changed");
        }
    }

    fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Builds a client handle for hooks, if any handle is still alive.
    fn client_handle(&self) -> Option<MrcClient> {
        self.command_tx.upgrade().map(|command_tx| {
            MrcClient::from_parts(
                command_tx,
                self.state_tx.subscribe(),
                Arc::clone(&self.listeners),
            )
        })
    }
}

// ============================================================================
// Select Helpers
// ============================================================================

/// Resolves the endpoint and performs the WebSocket handshake.
async fn open_socket(endpoint: EndpointSource, connect_timeout: Duration) -> Result<WsStream> {
    let url = endpoint.resolve().await?;
    debug!(%url, "Connecting");

    let (socket, _response) = timeout(connect_timeout, connect_async(url.as_str()))
        .await
        .map_err(|_| Error::connection_timeout(connect_timeout.as_millis() as u64))??;

    Ok(socket)
}

/// Completes with the attempt result, or never when no attempt is in flight.
async fn poll_attempt(connecting: &mut Option<ConnectFuture>) -> Result<WsStream> {
    match connecting {
        Some(attempt) => attempt.await,
        None => pending().await,
    }
}

/// Reads the next socket message, or never when there is no socket.
async fn read_socket(
    socket: &mut Option<WsStream>,
) -> Option<std::result::Result<Message, WsError>> {
    match socket {
        Some(socket) => socket.next().await,
        None => pending().await,
    }
}

/// Completes when the timer fires, or never when none is set.
async fn wait_timer(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(timer) => timer.as_mut().await,
        None => pending().await,
    }
}

// ============================================================================
// Tests
// ============================================================================
