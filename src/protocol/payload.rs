//! Typed payloads carried by replies and pushes.
//!
//! All fields default when absent; the server omits empty fields freely.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ============================================================================
// Torrent Engine
// ============================================================================

/// A torrent known to the server's streaming engine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Torrent {
    /// Display title.
    pub title: String,
    /// Info hash, used to remove the torrent.
    pub info_hash: String,
    /// Streamable files.
    pub files: Vec<TorrentFile>,
}

/// A streamable file inside a torrent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TorrentFile {
    /// File name.
    pub title: String,
    /// HTTP URL the server streams the file from.
    pub url: String,
}

// ============================================================================
// Media Renderer
// ============================================================================

/// Status of the UPnP media renderer the server drives.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpnpStatus {
    /// Renderer name.
    pub device: String,
    /// Transport state (e.g. `PLAYING`).
    pub state: Option<String>,
    /// Queue, current item first.
    pub item: Vec<UpnpItem>,
}

impl UpnpStatus {
    /// Returns the title of the current item.
    #[inline]
    #[must_use]
    pub fn current_title(&self) -> Option<&str> {
        self.item.first().map(|item| item.title.as_str())
    }
}

/// An item in the renderer queue.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpnpItem {
    /// Item title.
    pub title: String,
}

// ============================================================================
// Media Links
// ============================================================================

/// A media link resolved by `search` or `add`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaLink {
    /// Source classifier (`common`, `hds`, `f4m`, ...).
    pub src: String,
    /// Media URL.
    pub url: String,
    /// Page title.
    pub title: String,
    /// Cookie needed to fetch the media.
    pub cookie: Option<String>,
    /// Alternative renditions.
    pub bitrate: Vec<Rendition>,
}

/// One rendition of a [`MediaLink`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Rendition {
    /// Rendition URL.
    pub url: String,
    /// Bitrate label; servers send either a string or a number.
    #[serde(deserialize_with = "string_or_number")]
    pub bitrate: Option<String>,
    /// Cookie needed to fetch this rendition.
    pub cookie: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

// ============================================================================
// Tests
// ============================================================================
