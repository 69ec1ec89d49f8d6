//! Client configuration options.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use mrc_client::{ClientOptions, ReconnectPolicy};
//!
//! let options = ClientOptions::new()
//!     .with_reconnect(
//!         ReconnectPolicy::fixed(Duration::from_secs(2)).with_max_attempts(30),
//!     )
//!     .with_connect_timeout(Duration::from_secs(5));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Delay before reconnecting after the socket closes.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(2000);

/// Upper bound for backoff delays.
pub const DEFAULT_MAX_RECONNECT_DELAY: Duration = Duration::from_secs(60);

/// Time allowed for one connection attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Time allowed for the close handshake on disconnect.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// When and how often to reconnect after an unrequested close.
///
/// The default retries forever every 2 seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry.
    pub delay: Duration,

    /// Multiplier applied per consecutive failure (1 = fixed interval).
    pub backoff_factor: u32,

    /// Cap for grown delays. Only applies when `backoff_factor > 1`.
    pub max_delay: Duration,

    /// Consecutive retries allowed before giving up (`None` = unbounded).
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_RECONNECT_DELAY)
    }
}

impl ReconnectPolicy {
    /// Retries forever at a fixed interval.
    #[inline]
    #[must_use]
    pub const fn fixed(delay: Duration) -> Self {
        Self {
            delay,
            backoff_factor: 1,
            max_delay: DEFAULT_MAX_RECONNECT_DELAY,
            max_attempts: None,
        }
    }

    /// Never reconnects.
    #[inline]
    #[must_use]
    pub const fn never() -> Self {
        Self {
            delay: DEFAULT_RECONNECT_DELAY,
            backoff_factor: 1,
            max_delay: DEFAULT_MAX_RECONNECT_DELAY,
            max_attempts: Some(0),
        }
    }

    /// Grows the delay by `factor` per consecutive failure, up to `max_delay`.
    #[inline]
    #[must_use]
    pub const fn with_backoff(mut self, factor: u32, max_delay: Duration) -> Self {
        self.backoff_factor = factor;
        self.max_delay = max_delay;
        self
    }

    /// Gives up after `attempts` consecutive failed retries.
    #[inline]
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Returns the delay before retry number `attempt` (1-based), or `None`
    /// when the policy gives up.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 {
            return Some(Duration::ZERO);
        }
        if let Some(max) = self.max_attempts
            && attempt > max
        {
            return None;
        }

        if self.backoff_factor <= 1 {
            return Some(self.delay);
        }

        let growth = self.backoff_factor.saturating_pow(attempt - 1);
        Some(self.delay.saturating_mul(growth).min(self.max_delay))
    }

    /// Checks the policy for impossible settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `backoff_factor` is zero or `max_delay`
    /// is below `delay` while backoff is enabled.
    pub fn validate(&self) -> Result<()> {
        if self.backoff_factor == 0 {
            return Err(Error::config("reconnect backoff factor must be at least 1"));
        }
        if self.backoff_factor > 1 && self.max_delay < self.delay {
            return Err(Error::config(format!(
                "reconnect max delay {:?} is shorter than the base delay {:?}",
                self.max_delay, self.delay
            )));
        }
        Ok(())
    }
}

// ============================================================================
// ClientOptions
// ============================================================================

/// Connection behaviour of an [`MrcClient`](crate::MrcClient).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// Reconnect policy.
    pub reconnect: ReconnectPolicy,

    /// Time allowed for one connection attempt.
    pub connect_timeout: Duration,

    /// Time allowed for the close handshake on disconnect.
    pub close_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientOptions {
    /// Creates options with the default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            reconnect: ReconnectPolicy::fixed(DEFAULT_RECONNECT_DELAY),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }

    /// Sets the reconnect policy.
    #[inline]
    #[must_use]
    pub const fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Sets the per-attempt connect timeout.
    #[inline]
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the close handshake timeout.
    #[inline]
    #[must_use]
    pub const fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Checks the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a zero connect timeout or an invalid
    /// reconnect policy.
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout.is_zero() {
            return Err(Error::config("connect timeout must be non-zero"));
        }
        self.reconnect.validate()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_fixed_two_seconds_forever() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(1), Some(Duration::from_millis(2000)));
        assert_eq!(policy.delay_for(1000), Some(Duration::from_millis(2000)));
        assert_eq!(policy.max_attempts, None);
    }

    #[test]
    fn test_never_gives_up_immediately() {
        assert_eq!(ReconnectPolicy::never().delay_for(1), None);
    }

    #[test]
    fn test_max_attempts() {
        let policy = ReconnectPolicy::fixed(Duration::from_millis(10)).with_max_attempts(2);
        assert!(policy.delay_for(2).is_some());
        assert!(policy.delay_for(3).is_none());
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = ReconnectPolicy::fixed(Duration::from_millis(100))
            .with_backoff(2, Duration::from_millis(500));

        assert_eq!(policy.delay_for(1), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_for(2), Some(Duration::from_millis(200)));
        assert_eq!(policy.delay_for(3), Some(Duration::from_millis(400)));
        assert_eq!(policy.delay_for(4), Some(Duration::from_millis(500)));
        assert_eq!(policy.delay_for(60), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_fixed_delay_ignores_cap() {
        let policy = ReconnectPolicy::fixed(Duration::from_secs(120));
        assert_eq!(policy.delay_for(3), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_validate() {
        assert!(ClientOptions::new().validate().is_ok());

        let zero_factor = ReconnectPolicy::default().with_backoff(0, Duration::from_secs(1));
        assert!(zero_factor.validate().is_err());

        let inverted = ReconnectPolicy::fixed(Duration::from_secs(5))
            .with_backoff(2, Duration::from_secs(1));
        assert!(inverted.validate().is_err());

        let no_timeout = ClientOptions::new().with_connect_timeout(Duration::ZERO);
        assert!(no_timeout.validate().is_err());
    }
}
