//! MRC client - persistent WebSocket client for a media remote control server.
//!
//! This library keeps one long-lived WebSocket open to an MRC server and
//! multiplexes two traffic classes over it: correlated request/reply calls
//! and unsolicited push notifications.
//!
//! # Architecture
//!
//! The client follows an actor model:
//!
//! - **Handles ([`MrcClient`])**: Cheap clones that queue commands
//! - **Connection task**: Owns the socket, pending replies and retry timer
//!
//! Key design principles:
//!
//! - Calls expecting a reply carry a `_uid`; frames without one are pushes
//! - Pending replies are dropped, never invoked, when the socket closes
//! - Unrequested closes reconnect after a delay (2 seconds by default)
//! - Sending while disconnected is a silent no-op
//!
//! # Quick Start
//!
//! ```no_run
//! use mrc_client::{Call, LifecycleHooks, MrcClient, Push, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = MrcClient::builder()
//!         .endpoint("ws://localhost:8883/ws")
//!         .build()?;
//!
//!     // Query state on every (re)connect
//!     client.connect_with(LifecycleHooks::new().on_open(|client| {
//!         client.send(Call::bt_status());
//!         client.send(Call::upnp_status());
//!     }));
//!
//!     // Watch pushes
//!     client.on_push(|push: &Push| {
//!         if let Some(torrents) = push.torrents() {
//!             println!("{} torrents", torrents.len());
//!         }
//!     });
//!
//!     // Correlated call
//!     let reply = client.request(Call::search("https://video.example/watch")).await?;
//!     println!("search: {}", reply.payload);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`MrcClient`] handle, builder and options |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Wire frames, typed payloads and codec |
//! | [`transport`] | Connection manager, correlator and push listeners |

// ============================================================================
// Modules
// ============================================================================

/// Client handle and configuration.
///
/// Use [`MrcClient::builder()`] to create a configured client.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing correlation and subscription IDs.
pub mod identifiers;

/// WebSocket protocol message types.
///
/// Frame structures and the pure encode/decode functions.
pub mod protocol;

/// WebSocket transport layer.
///
/// Connection lifecycle, reply correlation and push dispatch.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{
    ClientBuilder, ClientOptions, DEFAULT_ENDPOINT, EndpointResolver, EndpointSource, FnResolver,
    LifecycleHooks, MrcClient, ReconnectPolicy, endpoint_from_origin,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{CorrelationId, SubscriptionId};

// Protocol types
pub use protocol::{
    Action, Call, MediaLink, PlayRequest, Push, Rendition, Reply, Torrent, TorrentFile, UpnpItem,
    UpnpStatus,
};

// Transport types
pub use transport::{ConnectionState, Subscription};
