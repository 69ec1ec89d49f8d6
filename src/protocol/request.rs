//! Outbound frames and correlated replies.
//!
//! # Format
//!
//! Outbound:
//! ```json
//! { "action": "search", "request": { "url": "..." }, "_uid": 3 }
//! ```
//!
//! Reply:
//! ```json
//! { "_uid": 3, "response": { ... } }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::CorrelationId;

use super::{Action, Call};

// ============================================================================
// Outbound
// ============================================================================

/// A call ready for the wire, optionally stamped with a correlation id.
///
/// `_uid` is present iff a reply is expected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outbound {
    /// Action to invoke.
    pub action: Action,

    /// Request payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<Value>,

    /// Correlation id.
    #[serde(rename = "_uid", skip_serializing_if = "Option::is_none")]
    pub id: Option<CorrelationId>,
}

impl Outbound {
    /// Wraps a call that expects no reply.
    #[inline]
    #[must_use]
    pub fn untagged(call: Call) -> Self {
        Self {
            action: call.action,
            request: call.request,
            id: None,
        }
    }

    /// Wraps a call stamped with a correlation id.
    #[inline]
    #[must_use]
    pub fn tagged(call: Call, id: CorrelationId) -> Self {
        Self {
            action: call.action,
            request: call.request,
            id: Some(id),
        }
    }
}

// ============================================================================
// Reply
// ============================================================================

/// A correlated reply.
///
/// `payload` is the frame's `response` field when present, otherwise an
/// object holding the remaining action-specific fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Correlation id copied from `_uid`.
    pub id: CorrelationId,
    /// Action echoed by the server, if any.
    pub action: Option<Action>,
    /// Reply payload.
    pub payload: Value,
}

impl Reply {
    /// Deserializes the payload into a typed value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the payload does not match `T`.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        T::deserialize(&self.payload).map_err(|e| {
            Error::protocol(format!("reply {} has unexpected payload: {e}", self.id))
        })
    }

    /// Gets a string field from the payload.
    ///
    /// Returns empty string if key not found or not a string.
    #[inline]
    #[must_use]
    pub fn get_string(&self, key: &str) -> String {
        self.payload
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    }

    /// Gets a boolean field from the payload.
    ///
    /// Returns false if key not found or not a boolean.
    #[inline]
    #[must_use]
    pub fn get_bool(&self, key: &str) -> bool {
        self.payload
            .get(key)
            .and_then(|v| v.as_bool())
            .unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================
