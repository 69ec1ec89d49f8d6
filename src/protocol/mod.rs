//! WebSocket protocol message types.
//!
//! This module defines the JSON frames exchanged with the MRC server and
//! the pure codec between frames and typed messages.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | [`Outbound`] | Local → Server | Call, tagged with `_uid` when a reply is expected |
//! | [`Reply`] | Server → Local | Correlated reply (`_uid` present) |
//! | [`Push`] | Server → Local | Unsolicited state (no `_uid`) |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | [`Action`], [`Call`] and request builders |
//! | `request` | [`Outbound`] frames and [`Reply`] |
//! | `event` | [`Push`] notifications |
//! | `payload` | Typed payload structs |
//! | `codec` | [`encode`] / [`decode`] |

// ============================================================================
// Submodules
// ============================================================================

/// Frame encoding and decoding.
pub mod codec;

/// Actions and outbound calls.
pub mod command;

/// Push notification types.
pub mod event;

/// Typed reply and push payloads.
pub mod payload;

/// Outbound frames and correlated replies.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use codec::{Inbound, decode, decode_bytes, encode};
pub use command::{Action, Call, PlayRequest};
pub use event::Push;
pub use payload::{MediaLink, Rendition, Torrent, TorrentFile, UpnpItem, UpnpStatus};
pub use request::{Outbound, Reply};
