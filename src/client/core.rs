//! Client handle.
//!
//! [`MrcClient`] is the public face of a connection manager task. Handles
//! are cheap to clone; all clones drive the same socket. The task stops on
//! [`MrcClient::shutdown`] or once every handle is dropped.
//!
//! A clone captured by a push listener, reply handler or close hook is a
//! handle too. While such a callback is registered, dropping the outside
//! handles does not stop the task; call [`MrcClient::shutdown`]. Open hooks
//! receive a temporary handle and need not capture one.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::trace;

use crate::error::{Error, Result};
use crate::identifiers::SubscriptionId;
use crate::protocol::{Call, Push, Reply};
use crate::transport::{
    ConnectionManager, ConnectionState, Listeners, ManagerCommand, ReplySink, Subscription,
};

use super::builder::ClientBuilder;
use super::endpoint::EndpointSource;
use super::options::ClientOptions;

// ============================================================================
// Types
// ============================================================================

/// Hook run after the socket opens.
pub type OpenHook = Box<dyn Fn(&MrcClient) + Send + Sync>;

/// Hook run after the socket closes or an attempt fails.
pub type CloseHook = Box<dyn Fn() + Send + Sync>;

// ============================================================================
// LifecycleHooks
// ============================================================================

/// Callbacks passed to [`MrcClient::connect_with`].
///
/// `on_open` receives a client handle so it can re-issue state queries;
/// nothing sent before a close is replayed after reconnecting. A hook that
/// captures its own clone keeps the task alive until
/// [`MrcClient::shutdown`].
///
/// # Example
///
/// ```ignore
/// let hooks = LifecycleHooks::new()
///     .on_open(|client| {
///         client.send(Call::bt_status());
///         client.send(Call::upnp_status());
///     })
///     .on_close(|| println!("disconnected"));
/// ```
#[derive(Default)]
pub struct LifecycleHooks {
    on_open: Option<OpenHook>,
    on_close: Option<CloseHook>,
}

impl LifecycleHooks {
    /// Creates empty hooks.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the open hook.
    #[must_use]
    pub fn on_open<F>(mut self, hook: F) -> Self
    where
        F: Fn(&MrcClient) + Send + Sync + 'static,
    {
        self.on_open = Some(Box::new(hook));
        self
    }

    /// Sets the close hook.
    #[must_use]
    pub fn on_close<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_close = Some(Box::new(hook));
        self
    }

    pub(crate) fn open(&self, client: &MrcClient) {
        if let Some(hook) = &self.on_open {
            hook(client);
        }
    }

    pub(crate) fn close(&self) {
        if let Some(hook) = &self.on_close {
            hook();
        }
    }
}

impl fmt::Debug for LifecycleHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleHooks")
            .field("on_open", &self.on_open.is_some())
            .field("on_close", &self.on_close.is_some())
            .finish()
    }
}

// ============================================================================
// MrcClient
// ============================================================================

/// Persistent connection to an MRC server.
///
/// # Example
///
/// ```ignore
/// use mrc_client::{Call, LifecycleHooks, MrcClient};
///
/// let client = MrcClient::builder()
///     .endpoint("ws://localhost:8883/ws")
///     .build()?;
///
/// client.connect_with(LifecycleHooks::new().on_open(|c| c.send(Call::bt_status())));
///
/// let link = client.request(Call::search("https://video.example/page")).await?;
/// ```
#[derive(Clone)]
pub struct MrcClient {
    /// Channel to the connection task.
    command_tx: mpsc::UnboundedSender<ManagerCommand>,
    /// Published connection state.
    state_rx: watch::Receiver<ConnectionState>,
    /// Push listeners (shared with the connection task).
    listeners: Arc<Listeners>,
}

// ============================================================================
// MrcClient - Constructor
// ============================================================================

impl MrcClient {
    /// Returns a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Spawns the connection task. Must be called within a tokio runtime.
    pub(crate) fn spawn(
        endpoint: EndpointSource,
        options: ClientOptions,
        listeners: Arc<Listeners>,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let manager = ConnectionManager::new(
            endpoint,
            options,
            Arc::clone(&listeners),
            state_tx,
            command_tx.downgrade(),
        );
        tokio::spawn(manager.run(command_rx));

        Self {
            command_tx,
            state_rx,
            listeners,
        }
    }

    pub(crate) fn from_parts(
        command_tx: mpsc::UnboundedSender<ManagerCommand>,
        state_rx: watch::Receiver<ConnectionState>,
        listeners: Arc<Listeners>,
    ) -> Self {
        Self {
            command_tx,
            state_rx,
            listeners,
        }
    }
}

// ============================================================================
// MrcClient - Lifecycle
// ============================================================================

impl MrcClient {
    /// Starts connecting, reconnecting after every unrequested close.
    #[inline]
    pub fn connect(&self) {
        self.connect_with(LifecycleHooks::new());
    }

    /// Starts connecting with open/close hooks.
    ///
    /// If already connected or connecting, only the hooks are replaced.
    pub fn connect_with(&self, hooks: LifecycleHooks) {
        self.command(ManagerCommand::Connect(Arc::new(hooks)));
    }

    /// Closes the socket and stops reconnecting. Idempotent.
    ///
    /// Pending replies are dropped without being invoked.
    pub fn disconnect(&self) {
        self.command(ManagerCommand::Disconnect);
    }

    /// Stops the connection task.
    ///
    /// Every clone of this handle becomes inert, including clones held by
    /// registered callbacks.
    pub fn shutdown(&self) {
        self.command(ManagerCommand::Shutdown);
    }

    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Returns `true` while the socket is open.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Waits until the connection reaches `state`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the task stops first.
    pub async fn wait_for_state(&self, state: ConnectionState) -> Result<()> {
        let mut state_rx = self.state_rx.clone();
        state_rx
            .wait_for(|current| *current == state)
            .await
            .map(|_| ())
            .map_err(|_| Error::ConnectionClosed)
    }
}

// ============================================================================
// MrcClient - Calls
// ============================================================================

impl MrcClient {
    /// Sends a call that expects no reply.
    ///
    /// Best effort: dropped silently when the socket is not open.
    pub fn send(&self, call: Call) {
        self.command(ManagerCommand::Send { call, sink: None });
    }

    /// Sends a call and runs `handler` with its reply.
    ///
    /// `handler` runs at most once, on the connection task. It never runs
    /// if the call was dropped or the connection closed first. It may send
    /// further calls through a captured clone.
    pub fn send_with<F>(&self, call: Call, handler: F)
    where
        F: FnOnce(Reply) + Send + 'static,
    {
        self.command(ManagerCommand::Send {
            call,
            sink: Some(ReplySink::handler(handler)),
        });
    }

    /// Sends a call and waits for its reply.
    ///
    /// There is no per-call timeout; wrap in [`tokio::time::timeout`] if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReplyDropped`] if the socket was not open or left
    /// the connected state before the reply arrived.
    pub async fn request(&self, call: Call) -> Result<Reply> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command(ManagerCommand::Send {
            call,
            sink: Some(ReplySink::Channel(reply_tx)),
        });
        Ok(reply_rx.await?)
    }

    fn command(&self, command: ManagerCommand) {
        if self.command_tx.send(command).is_err() {
            trace!("Connection task stopped; command ignored");
        }
    }
}

// ============================================================================
// MrcClient - Push
// ============================================================================

impl MrcClient {
    /// Returns a stream of push notifications.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        self.listeners.subscribe()
    }

    /// Registers a push callback. It runs on the connection task.
    ///
    /// A callback that captures a clone of this client keeps the task
    /// running until [`MrcClient::shutdown`] is called.
    pub fn on_push<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Push) + Send + Sync + 'static,
    {
        self.listeners.add(Arc::new(handler))
    }

    /// Removes a push callback. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.remove(id)
    }

    /// Returns the number of registered push listeners.
    #[inline]
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl fmt::Debug for MrcClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MrcClient")
            .field("state", &self.state())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
