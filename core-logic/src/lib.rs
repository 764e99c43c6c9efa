//! # Core Logic - Shared Utilities for Testnet Framework
//!
//! This crate provides shared utilities used across all bot implementations:
//! proxy rotation and tunnelling, retry pacing, account loading, logging and
//! the worker runner that fans work out per account.
//!
//! ## Modules
//!
//! - [`config`] - Shared configuration value types
//! - [`error`] - Typed error handling with thiserror
//! - [`traits`] - Core trait definitions
//! - [`utils`] - Utility modules (proxy, retry, logger, runner)

// Module declarations - internal modules marked pub(crate)
pub mod config;
pub mod error;
pub mod traits;
pub(crate) mod utils;

// Selective exports - only public API types
pub use config::{ProxyMode, ProxySource};
pub use error::{ConfigError, CoreError, NetworkError, ProxyError};
pub use traits::{Worker, WorkerReport};

// Utils are pub(crate) - only export specific public utilities
pub use utils::{
    normalize_proxy, setup_logger, AccountLoader, ProxyConnector, ProxyEndpoint, ProxyManager,
    ProxyPool, ProxyScheme, RunSummary, Transport, TransportSettings, TunnelDialer, WorkerRunner,
    BOT_TARGET, RECOGNIZED_SCHEMES,
};

// Export retry utilities for testing
pub use utils::{retry_with_backoff, LinearBackoff, ReconnectBackoff, RetryError};
