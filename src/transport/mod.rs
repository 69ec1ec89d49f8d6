//! WebSocket transport layer.
//!
//! This module owns the socket to the MRC server and everything that
//! depends on its lifetime.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  MrcClient      │                              │  MRC server     │
//! │  (handles)      │         WebSocket            │                 │
//! │       │         │◄────────────────────────────►│  /ws            │
//! │  ConnectionMgr  │      host:8883               │                 │
//! │  (task)         │                              │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `connect` - Resolve endpoint and open the socket
//! 2. `Connected` - Tagged calls register a reply sink in the `Correlator`
//! 3. Inbound frames - Replies go to their sink, pushes to `Listeners`
//! 4. Close - Pending sinks are dropped, a retry is scheduled
//! 5. `disconnect` - Close without retry
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Connection manager and event loop |
//! | `correlator` | Pending reply table |
//! | `subscription` | Push listener registry |

// ============================================================================
// Submodules
// ============================================================================

/// Connection manager and event loop.
pub mod connection;

/// Pending reply table.
pub mod correlator;

/// Push listener registry.
pub mod subscription;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::ConnectionState;
pub(crate) use connection::{ConnectionManager, ManagerCommand};
pub use correlator::{Correlator, ReplyHandler, ReplySink};
pub use subscription::{Listeners, PushHandler, Subscription};
