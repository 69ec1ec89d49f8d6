//! Type-safe identifiers.
//!
//! Newtype wrappers prevent mixing correlation ids (which travel on the
//! wire as `_uid`) with local subscription handles.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// CorrelationId
// ============================================================================

/// Correlation id linking an outbound call to its reply.
///
/// Serialized as a bare integer in the `_uid` field. Ids are allocated by
/// the correlator starting at [`CorrelationId::FIRST`] and only ever grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(u64);

impl CorrelationId {
    /// The first id handed out by a fresh client.
    pub const FIRST: Self = Self(1);

    /// Wraps a raw id.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the id following this one.
    #[inline]
    #[must_use]
    pub(crate) const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CorrelationId {
    #[inline]
    fn from(value: u64) -> Self {
        Self(value)
    }
}

// ============================================================================
// SubscriptionId
// ============================================================================

/// Handle for a registered push listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    #[inline]
    pub(crate) const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
