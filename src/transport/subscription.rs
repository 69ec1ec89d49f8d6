//! Push listener registry.
//!
//! Any number of independent listeners may observe push notifications.
//! A listener is either a callback registered with
//! [`MrcClient::on_push`](crate::MrcClient::on_push) or a
//! [`Subscription`] stream.
//!
//! Listeners run on the connection task in registration order. Dispatch
//! snapshots the list first, so a listener may subscribe or unsubscribe
//! while it runs.

// ============================================================================
// Imports
// ============================================================================

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures_util::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::trace;

use crate::identifiers::SubscriptionId;
use crate::protocol::Push;

// ============================================================================
// Types
// ============================================================================

/// Push listener callback.
pub type PushHandler = Arc<dyn Fn(&Push) + Send + Sync>;

// ============================================================================
// Listeners
// ============================================================================

/// Registry of push listeners, shared by client handles and the
/// connection task.
#[derive(Default)]
pub struct Listeners {
    /// Next subscription id.
    next_id: AtomicU64,
    /// Listeners in registration order.
    handlers: Mutex<Vec<(SubscriptionId, PushHandler)>>,
}

impl Listeners {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener.
    pub fn add(&self, handler: PushHandler) -> SubscriptionId {
        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.handlers.lock().push((id, handler));
        trace!(%id, "Push listener added");
        id
    }

    /// Unregisters a listener. Returns `false` if it was not registered.
    pub fn remove(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.lock();
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        before != handlers.len()
    }

    /// Returns the number of registered listeners.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.lock().len()
    }

    /// Returns `true` if no listener is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.lock().is_empty()
    }

    /// Invokes every listener with `push`.
    pub fn dispatch(&self, push: &Push) {
        let snapshot: Vec<PushHandler> = self
            .handlers
            .lock()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        trace!(listeners = snapshot.len(), action = ?push.action(), "Dispatching push");

        for handler in snapshot {
            handler(push);
        }
    }

    /// Registers a channel-backed listener and returns its stream.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.add(Arc::new(move |push: &Push| {
            let _ = tx.send(push.clone());
        }));

        Subscription {
            id,
            rx,
            listeners: Arc::downgrade(self),
        }
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// Stream of push notifications.
///
/// Unregisters itself when dropped. Yields `None` once the client has
/// been torn down.
///
/// # Example
///
/// ```ignore
/// let mut pushes = client.subscribe();
/// while let Some(push) = pushes.recv().await {
///     if let Some(torrents) = push.torrents() {
///         println!("{} torrents", torrents.len());
///     }
/// }
/// ```
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    rx: mpsc::UnboundedReceiver<Push>,
    listeners: Weak<Listeners>,
}

impl Subscription {
    /// Returns the listener id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Receives the next push.
    pub async fn recv(&mut self) -> Option<Push> {
        self.rx.recv().await
    }

    /// Returns a buffered push without waiting.
    pub fn try_recv(&mut self) -> Option<Push> {
        self.rx.try_recv().ok()
    }
}

impl Stream for Subscription {
    type Item = Push;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Push>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.remove(self.id);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
