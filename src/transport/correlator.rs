//! Request/reply correlation.
//!
//! The correlator stamps outbound calls with a fresh [`CorrelationId`] and
//! holds one [`ReplySink`] per id until a reply resolves it or the
//! connection drops. It owns no transport state.
//!
//! # Invariants
//!
//! - Ids start at 1 and only grow; they are not reset when the socket
//!   reconnects, so a late reply from an old socket can never hit a new
//!   call.
//! - An entry is removed before its sink is invoked, so a handler may
//!   re-enter `send` without seeing its own entry.
//! - [`Correlator::drop_all`] never invokes a sink.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use rustc_hash::FxHashMap;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::identifiers::CorrelationId;
use crate::protocol::{Call, Outbound, Reply};

// ============================================================================
// Types
// ============================================================================

/// Callback invoked at most once with a reply.
pub type ReplyHandler = Box<dyn FnOnce(Reply) + Send>;

/// Destination of a correlated reply.
pub enum ReplySink {
    /// Invoke a callback.
    Handler(ReplyHandler),
    /// Complete an awaiting future.
    Channel(oneshot::Sender<Reply>),
}

impl ReplySink {
    /// Wraps a callback.
    #[inline]
    pub fn handler<F>(handler: F) -> Self
    where
        F: FnOnce(Reply) + Send + 'static,
    {
        Self::Handler(Box::new(handler))
    }

    fn deliver(self, reply: Reply) {
        match self {
            Self::Handler(handler) => handler(reply),
            Self::Channel(tx) => {
                if tx.send(reply).is_err() {
                    trace!("Reply receiver already gone");
                }
            }
        }
    }
}

impl fmt::Debug for ReplySink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handler(_) => f.write_str("ReplySink::Handler"),
            Self::Channel(_) => f.write_str("ReplySink::Channel"),
        }
    }
}

// ============================================================================
// Correlator
// ============================================================================

/// Table of pending replies keyed by correlation id.
#[derive(Debug)]
pub struct Correlator {
    /// Next id to hand out.
    next_id: CorrelationId,
    /// Pending sinks.
    pending: FxHashMap<CorrelationId, ReplySink>,
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}

impl Correlator {
    /// Creates an empty correlator whose first id is 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: CorrelationId::FIRST,
            pending: FxHashMap::default(),
        }
    }

    /// Allocates an id, stores the sink, and returns the stamped frame.
    pub fn tag(&mut self, call: Call, sink: ReplySink) -> Outbound {
        let id = self.next_id;
        self.next_id = id.next();
        self.pending.insert(id, sink);

        trace!(%id, action = %call.action, "Call tagged");
        Outbound::tagged(call, id)
    }

    /// Delivers a reply to its pending sink.
    ///
    /// Returns `false` if no entry matched (late, duplicate or unexpected
    /// reply); the reply is discarded.
    pub fn resolve(&mut self, reply: Reply) -> bool {
        match self.pending.remove(&reply.id) {
            Some(sink) => {
                trace!(id = %reply.id, "Reply resolved");
                sink.deliver(reply);
                true
            }
            None => {
                debug!(id = %reply.id, "Discarding reply with no pending call");
                false
            }
        }
    }

    /// Removes one entry without invoking it.
    pub fn forget(&mut self, id: CorrelationId) -> bool {
        self.pending.remove(&id).is_some()
    }

    /// Clears every pending entry without invoking any of them.
    ///
    /// Returns how many were dropped.
    pub fn drop_all(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();

        if count > 0 {
            debug!(count, "Dropped pending replies");
        }
        count
    }

    /// Returns the number of pending replies.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if `id` is pending.
    #[inline]
    #[must_use]
    pub fn is_pending(&self, id: CorrelationId) -> bool {
        self.pending.contains_key(&id)
    }
}

// ============================================================================
// Tests
// ============================================================================
