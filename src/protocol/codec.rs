//! Wire codec.
//!
//! Pure functions between [`Outbound`]/[`Inbound`] and JSON text frames.
//! No I/O happens here; the connection manager logs and discards any
//! [`Error::Protocol`] returned by [`decode`].

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identifiers::CorrelationId;

use super::{Action, Outbound, Push, Reply};

// ============================================================================
// Inbound
// ============================================================================

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Frame carried `_uid`; belongs to the correlator.
    Reply(Reply),
    /// Frame had no `_uid`; belongs to push listeners.
    Push(Push),
}

/// Raw inbound frame, before routing.
#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(default)]
    action: Option<Action>,

    #[serde(rename = "_uid", default)]
    uid: Option<CorrelationId>,

    #[serde(default, deserialize_with = "present")]
    response: Option<Value>,

    #[serde(flatten)]
    rest: Map<String, Value>,
}

/// Keeps an explicit `null` as `Some(Value::Null)`; only a missing field
/// is `None`.
fn present<'de, D>(deserializer: D) -> StdResult<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

// ============================================================================
// Encode / Decode
// ============================================================================

/// Serializes an outbound frame to JSON text.
///
/// # Errors
///
/// Returns [`Error::Json`] if the request payload cannot be serialized.
pub fn encode(outbound: &Outbound) -> Result<String> {
    Ok(serde_json::to_string(outbound)?)
}

/// Parses a JSON text frame.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if the text is not a JSON object or `_uid`
/// is not an unsigned integer.
pub fn decode(text: &str) -> Result<Inbound> {
    let raw: RawFrame = serde_json::from_str(text)
        .map_err(|e| Error::protocol(format!("malformed frame: {e}")))?;

    Ok(match raw.uid {
        Some(id) => Inbound::Reply(Reply {
            id,
            payload: raw.response.unwrap_or(Value::Object(raw.rest)),
            action: raw.action,
        }),
        None => {
            let payload = match (raw.response, &raw.action) {
                (Some(response), _) => response,
                (None, Some(action)) => {
                    let mut rest = raw.rest;
                    rest.remove(action.as_str()).unwrap_or(Value::Null)
                }
                (None, None) => Value::Object(raw.rest),
            };
            Inbound::Push(Push::from_parts(raw.action, payload))
        }
    })
}

/// Parses a binary frame as UTF-8 JSON text.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if the bytes are not UTF-8 or not a frame.
pub fn decode_bytes(bytes: &[u8]) -> Result<Inbound> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::protocol(format!("binary frame is not UTF-8: {e}")))?;
    decode(text)
}

// ============================================================================
// Tests
// ============================================================================
