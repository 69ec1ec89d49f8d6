//! Client handle and configuration.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | Fluent [`ClientBuilder`] |
//! | `core` | [`MrcClient`] handle and [`LifecycleHooks`] |
//! | `endpoint` | Endpoint parsing and resolution |
//! | `options` | [`ClientOptions`] and [`ReconnectPolicy`] |

// ============================================================================
// Submodules
// ============================================================================

/// Builder pattern for client configuration.
pub mod builder;

/// Client handle.
pub mod core;

/// Endpoint resolution.
pub mod endpoint;

/// Client configuration options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use core::{CloseHook, LifecycleHooks, MrcClient, OpenHook};
pub use endpoint::{
    DEFAULT_ENDPOINT, EndpointResolver, EndpointSource, FnResolver, endpoint_from_origin,
    parse_endpoint,
};
pub use options::{
    ClientOptions, DEFAULT_CLOSE_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_RECONNECT_DELAY,
    DEFAULT_RECONNECT_DELAY, ReconnectPolicy,
};
