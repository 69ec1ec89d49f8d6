//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`MrcClient`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use mrc_client::{MrcClient, ReconnectPolicy};
//!
//! # async fn example() -> mrc_client::Result<()> {
//! let client = MrcClient::builder()
//!     .endpoint("ws://192.168.1.20:8883/ws")
//!     .reconnect(ReconnectPolicy::fixed(Duration::from_secs(2)))
//!     .build()?;
//! client.connect();
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use crate::error::{Error, Result};
use crate::protocol::Push;
use crate::transport::{Listeners, PushHandler};

use super::core::MrcClient;
use super::endpoint::{DEFAULT_ENDPOINT, EndpointResolver, EndpointSource};
use super::options::{ClientOptions, ReconnectPolicy};

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring an [`MrcClient`].
///
/// Use [`MrcClient::builder()`] to create a new builder.
#[derive(Default)]
pub struct ClientBuilder {
    /// Fixed endpoint, parsed on build.
    endpoint: Option<String>,
    /// Resolver consulted before each attempt.
    resolver: Option<Arc<dyn EndpointResolver>>,
    /// Connection behaviour.
    options: ClientOptions,
    /// Push listeners registered before the task starts.
    push_handlers: Vec<PushHandler>,
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a builder with the default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a fixed endpoint (e.g. `ws://localhost:8883/ws`).
    ///
    /// Replaces any resolver set earlier.
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self.resolver = None;
        self
    }

    /// Looks the endpoint up before every connection attempt.
    ///
    /// Replaces any fixed endpoint set earlier.
    #[inline]
    #[must_use]
    pub fn resolver(mut self, resolver: impl EndpointResolver) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self.endpoint = None;
        self
    }

    /// Replaces all connection options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the reconnect policy.
    #[inline]
    #[must_use]
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.options.reconnect = policy;
        self
    }

    /// Sets the per-attempt connect timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    /// Registers a push listener before the client starts.
    #[must_use]
    pub fn on_push<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Push) + Send + Sync + 'static,
    {
        self.push_handlers.push(Arc::new(handler));
        self
    }

    /// Builds the client and spawns its connection task.
    ///
    /// The client starts disconnected; call [`MrcClient::connect`].
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidEndpoint`] if the endpoint is not a `ws` URL
    /// - [`Error::Config`] if the options are invalid or no tokio runtime
    ///   is running
    pub fn build(self) -> Result<MrcClient> {
        self.options.validate()?;
        let endpoint = self.endpoint_source()?;

        if Handle::try_current().is_err() {
            return Err(Error::config(
                "MrcClient must be built inside a tokio runtime.\n\
                 Example: call build() from a #[tokio::main] function",
            ));
        }

        let listeners = Arc::new(Listeners::new());
        for handler in self.push_handlers {
            listeners.add(handler);
        }

        Ok(MrcClient::spawn(endpoint, self.options, listeners))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    fn endpoint_source(&self) -> Result<EndpointSource> {
        if let Some(resolver) = &self.resolver {
            return Ok(EndpointSource::Resolver(Arc::clone(resolver)));
        }

        EndpointSource::fixed(self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT))
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("endpoint", &self.endpoint)
            .field("resolver", &self.resolver.is_some())
            .field("options", &self.options)
            .field("push_handlers", &self.push_handlers.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
