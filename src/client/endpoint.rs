//! Endpoint resolution.
//!
//! The server address is either fixed at build time or looked up before
//! every connection attempt by an [`EndpointResolver`] (a settings store,
//! the current page origin, ...).

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8883/ws";

/// Path the server mounts its WebSocket on.
const WS_PATH: &str = "/ws";

// ============================================================================
// EndpointResolver
// ============================================================================

/// Supplies the endpoint for a connection attempt.
///
/// Called once per attempt; an error counts as a failed attempt and is
/// retried according to the reconnect policy.
#[async_trait]
pub trait EndpointResolver: Send + Sync + 'static {
    /// Returns the WebSocket URL to connect to.
    async fn resolve(&self) -> Result<Url>;
}

/// Adapts an async closure into an [`EndpointResolver`].
pub struct FnResolver<F>(F);

impl<F> FnResolver<F> {
    /// Wraps `f`.
    #[inline]
    pub const fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> EndpointResolver for FnResolver<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Url>> + Send + 'static,
{
    async fn resolve(&self) -> Result<Url> {
        (self.0)().await
    }
}

// ============================================================================
// EndpointSource
// ============================================================================

/// Where the client gets its endpoint from.
#[derive(Clone)]
pub enum EndpointSource {
    /// Fixed URL.
    Fixed(Url),
    /// Resolved before every attempt.
    Resolver(Arc<dyn EndpointResolver>),
}

impl EndpointSource {
    /// Parses and validates a fixed endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if the string is not a `ws://` URL.
    pub fn fixed(endpoint: &str) -> Result<Self> {
        parse_endpoint(endpoint).map(Self::Fixed)
    }

    /// Wraps a resolver.
    #[inline]
    pub fn resolver(resolver: impl EndpointResolver) -> Self {
        Self::Resolver(Arc::new(resolver))
    }

    /// Produces the URL for the next attempt.
    ///
    /// # Errors
    ///
    /// Propagates resolver errors; resolved URLs are validated like fixed
    /// ones.
    pub async fn resolve(&self) -> Result<Url> {
        match self {
            Self::Fixed(url) => Ok(url.clone()),
            Self::Resolver(resolver) => {
                let url = resolver.resolve().await?;
                check_scheme(url)
            }
        }
    }
}

impl fmt::Debug for EndpointSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(url) => f.debug_tuple("Fixed").field(&url.as_str()).finish(),
            Self::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Parses a WebSocket endpoint.
///
/// # Errors
///
/// Returns [`Error::InvalidEndpoint`] for unparsable URLs or schemes other
/// than `ws`. The transport is built without TLS, so `wss` is rejected.
pub fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint).map_err(|e| Error::invalid_endpoint(endpoint, e.to_string()))?;
    check_scheme(url)
}

fn check_scheme(url: Url) -> Result<Url> {
    match url.scheme() {
        "ws" => Ok(url),
        "wss" => Err(Error::invalid_endpoint(
            url.as_str(),
            "wss is not supported: the transport is built without TLS",
        )),
        other => Err(Error::invalid_endpoint(
            url.as_str(),
            format!("scheme must be ws, got {other}"),
        )),
    }
}

/// Derives the server endpoint from the origin of a page it serves.
///
/// `http://host:port/anything` becomes `ws://host:port/ws`.
///
/// # Errors
///
/// Returns [`Error::InvalidEndpoint`] if the page URL has no host or is
/// not served over plain `http`.
pub fn endpoint_from_origin(page: &Url) -> Result<Url> {
    if page.scheme() != "http" {
        return Err(Error::invalid_endpoint(
            page.as_str(),
            format!("cannot derive a ws endpoint from a {} origin", page.scheme()),
        ));
    }

    let host = page
        .host_str()
        .ok_or_else(|| Error::invalid_endpoint(page.as_str(), "page URL has no host"))?;

    let authority = match page.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    parse_endpoint(&format!("ws://{authority}{WS_PATH}"))
}

// ============================================================================
// Tests
// ============================================================================
