//! Push notifications.
//!
//! A push is any inbound frame without `_uid`. It is decoded once, at the
//! codec boundary, into a typed [`Push`] variant.
//!
//! # Format
//!
//! ```json
//! { "action": "btstatus", "response": [ ... ] }
//! ```
//!
//! Older servers key the payload by the action name instead:
//!
//! ```json
//! { "action": "btupdate", "btupdate": [ ... ] }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::{Action, Torrent, UpnpStatus};

// ============================================================================
// Push
// ============================================================================

/// An unsolicited message from the server.
#[derive(Debug, Clone, PartialEq)]
pub enum Push {
    /// Full torrent list.
    BtStatus(Vec<Torrent>),

    /// Torrent list changed.
    BtUpdate(Vec<Torrent>),

    /// Renderer status; `None` when no renderer is attached.
    UpnpStatus(Option<UpnpStatus>),

    /// Renderer status changed.
    UpnpUpdate(Option<UpnpStatus>),

    /// Unmodelled action, or a payload that did not match its shape.
    Unknown {
        /// Action name, if the frame had one.
        action: Option<Action>,
        /// Raw payload.
        payload: Value,
    },
}

impl Push {
    /// Builds a typed push from a decoded action and payload.
    #[must_use]
    pub fn from_parts(action: Option<Action>, payload: Value) -> Self {
        match action {
            Some(Action::BtStatus) => typed(Action::BtStatus, payload, Self::BtStatus),
            Some(Action::BtUpdate) => typed(Action::BtUpdate, payload, Self::BtUpdate),
            Some(Action::UpnpStatus) => typed(Action::UpnpStatus, payload, Self::UpnpStatus),
            Some(Action::UpnpUpdate) => typed(Action::UpnpUpdate, payload, Self::UpnpUpdate),
            action => Self::Unknown { action, payload },
        }
    }

    /// Returns the action this push was decoded from.
    #[must_use]
    pub fn action(&self) -> Option<Action> {
        match self {
            Self::BtStatus(_) => Some(Action::BtStatus),
            Self::BtUpdate(_) => Some(Action::BtUpdate),
            Self::UpnpStatus(_) => Some(Action::UpnpStatus),
            Self::UpnpUpdate(_) => Some(Action::UpnpUpdate),
            Self::Unknown { action, .. } => action.clone(),
        }
    }

    /// Returns the torrent list for `btstatus`/`btupdate` pushes.
    #[inline]
    #[must_use]
    pub fn torrents(&self) -> Option<&[Torrent]> {
        match self {
            Self::BtStatus(list) | Self::BtUpdate(list) => Some(list),
            _ => None,
        }
    }

    /// Returns the renderer status for `upnpstatus`/`upnpupdate` pushes.
    #[inline]
    #[must_use]
    pub fn upnp(&self) -> Option<Option<&UpnpStatus>> {
        match self {
            Self::UpnpStatus(status) | Self::UpnpUpdate(status) => Some(status.as_ref()),
            _ => None,
        }
    }
}

/// Deserializes `payload`, degrading to [`Push::Unknown`] on mismatch.
fn typed<T, F>(action: Action, payload: Value, wrap: F) -> Push
where
    T: DeserializeOwned,
    F: FnOnce(T) -> Push,
{
    match T::deserialize(&payload) {
        Ok(value) => wrap(value),
        Err(e) => {
            debug!(%action, error = %e, "Push payload did not match its shape");
            Push::Unknown {
                action: Some(action),
                payload,
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
