//! # Utilities Module
//!
//! Internal utility modules for the core-logic crate.
//! These modules are marked as `pub(crate)` to enforce API boundaries.

// Internal modules - not part of public API
pub(crate) mod account_loader;
pub(crate) mod logger;
pub(crate) mod proxy_connector;
pub(crate) mod proxy_manager;
pub(crate) mod retry;
pub(crate) mod runner;

// Selective exports - only public utilities
pub use account_loader::AccountLoader;
pub use logger::{setup_logger, BOT_TARGET};
pub use proxy_connector::{ProxyConnector, Transport, TransportSettings, TunnelDialer};
pub use proxy_manager::{
    normalize_proxy, ProxyEndpoint, ProxyManager, ProxyPool, ProxyScheme, RECOGNIZED_SCHEMES,
};
pub use retry::{retry_with_backoff, LinearBackoff, ReconnectBackoff, RetryError};
pub use runner::{RunSummary, WorkerRunner};
