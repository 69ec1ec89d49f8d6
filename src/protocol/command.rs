//! Actions and outbound calls.
//!
//! Every frame on the wire names an `action`. The set the server speaks is
//! small and closed, so it is modelled as [`Action`] with an
//! [`Action::Unknown`] fallback for anything else.
//!
//! # Actions
//!
//! | Action | Direction | Purpose |
//! |--------|-----------|---------|
//! | `btstatus` | both | Torrent list (query or push) |
//! | `upnpstatus` | both | Media renderer status (query or push) |
//! | `btupdate` | push | Torrent list change |
//! | `upnpupdate` | push | Renderer status change |
//! | `play` | call | Play a URL on the renderer |
//! | `add` | call | Add a link to the torrent engine |
//! | `rm` | call | Remove a torrent by info hash |
//! | `search` | call | Resolve media links for a page URL |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

// ============================================================================
// Action
// ============================================================================

/// Action name carried by every frame.
///
/// Serialized as its wire string; unrecognized names round-trip through
/// [`Action::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Action {
    /// `btstatus`
    BtStatus,
    /// `upnpstatus`
    UpnpStatus,
    /// `btupdate`
    BtUpdate,
    /// `upnpupdate`
    UpnpUpdate,
    /// `play`
    Play,
    /// `add`
    Add,
    /// `rm`
    Remove,
    /// `search`
    Search,
    /// Any other action name.
    Unknown(String),
}

impl Action {
    /// Returns the wire name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::BtStatus => "btstatus",
            Self::UpnpStatus => "upnpstatus",
            Self::BtUpdate => "btupdate",
            Self::UpnpUpdate => "upnpupdate",
            Self::Play => "play",
            Self::Add => "add",
            Self::Remove => "rm",
            Self::Search => "search",
            Self::Unknown(name) => name,
        }
    }

    /// Returns `true` for actions the client does not model.
    #[inline]
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}

impl From<&str> for Action {
    fn from(name: &str) -> Self {
        match name {
            "btstatus" => Self::BtStatus,
            "upnpstatus" => Self::UpnpStatus,
            "btupdate" => Self::BtUpdate,
            "upnpupdate" => Self::UpnpUpdate,
            "play" => Self::Play,
            "add" => Self::Add,
            "rm" => Self::Remove,
            "search" => Self::Search,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl From<String> for Action {
    #[inline]
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        match action {
            Action::Unknown(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Call
// ============================================================================

/// An outbound call: an action plus an optional request payload.
///
/// Calls are built by the caller and consumed by
/// [`MrcClient::send`](crate::MrcClient::send).
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Action to invoke.
    pub action: Action,
    /// Request payload, sent as `request`.
    pub request: Option<Value>,
}

impl Call {
    /// Creates a call with no request payload.
    #[inline]
    #[must_use]
    pub fn new(action: impl Into<Action>) -> Self {
        Self {
            action: action.into(),
            request: None,
        }
    }

    /// Sets the request payload.
    #[inline]
    #[must_use]
    pub fn with_request(mut self, request: Value) -> Self {
        self.request = Some(request);
        self
    }

    /// Queries the torrent list.
    #[inline]
    #[must_use]
    pub fn bt_status() -> Self {
        Self::new(Action::BtStatus)
    }

    /// Queries the media renderer status.
    #[inline]
    #[must_use]
    pub fn upnp_status() -> Self {
        Self::new(Action::UpnpStatus)
    }

    /// Asks the server to play a URL.
    #[must_use]
    pub fn play(request: PlayRequest) -> Self {
        Self::new(Action::Play).with_request(json!({
            "url": request.url,
            "title": request.title,
            "cookie": request.cookie,
        }))
    }

    /// Adds a link (torrent or magnet) to the server.
    #[must_use]
    pub fn add(url: impl Into<String>) -> Self {
        Self::new(Action::Add).with_request(json!({ "url": url.into() }))
    }

    /// Removes a torrent by info hash.
    ///
    /// The server reads the hash from the `url` field.
    #[must_use]
    pub fn remove(info_hash: impl Into<String>) -> Self {
        Self::new(Action::Remove).with_request(json!({ "url": info_hash.into() }))
    }

    /// Asks the server to resolve media links for a page URL.
    #[must_use]
    pub fn search(url: impl Into<String>) -> Self {
        Self::new(Action::Search).with_request(json!({ "url": url.into() }))
    }
}

// ============================================================================
// PlayRequest
// ============================================================================

/// Parameters for [`Call::play`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlayRequest {
    /// Media URL.
    pub url: String,
    /// Display title.
    pub title: String,
    /// Cookie header value the server should send when fetching.
    pub cookie: Option<String>,
}

impl PlayRequest {
    /// Creates a play request titled after the URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            title: url.clone(),
            url,
            cookie: None,
        }
    }

    /// Sets the title.
    #[inline]
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the cookie.
    #[inline]
    #[must_use]
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
