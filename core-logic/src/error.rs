//! # Core Error Types
//!
//! Centralized error definitions for the core-logic crate.
//! All errors implement `std::error::Error` and `std::fmt::Display`.

use thiserror::Error;

/// Unified error type for core-logic operations.
///
/// This enum wraps all specific error types and provides a unified
/// error interface for the application layer.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Config(ConfigError),

    #[error(transparent)]
    Network(NetworkError),

    #[error(transparent)]
    Proxy(ProxyError),
}

impl From<ConfigError> for CoreError {
    fn from(e: ConfigError) -> Self {
        CoreError::Config(e)
    }
}

impl From<NetworkError> for CoreError {
    fn from(e: NetworkError) -> Self {
        CoreError::Network(e)
    }
}

impl From<ProxyError> for CoreError {
    fn from(e: ProxyError) -> Self {
        CoreError::Proxy(e)
    }
}

/// Configuration-related errors
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("I/O error reading {path}: {msg}")]
    IoError { path: String, msg: String },

    #[error("No entries found in {path}")]
    Empty { path: String },
}

/// Network and transport errors
#[derive(Error, Debug, Clone)]
pub enum NetworkError {
    #[error("Timeout after {timeout_ms}ms while {stage} {endpoint}")]
    Timeout {
        timeout_ms: u64,
        stage: &'static str,
        endpoint: String,
    },

    #[error("Connection refused to {endpoint}: {reason}")]
    ConnectionRefused { endpoint: String, reason: String },
}

/// Proxy configuration and tunnelling errors
#[derive(Error, Debug, Clone)]
pub enum ProxyError {
    #[error("Unsupported proxy scheme: '{scheme}'")]
    UnsupportedProxyScheme { scheme: String },

    #[error("Malformed proxy endpoint '{endpoint}': {reason}")]
    MalformedEndpoint { endpoint: String, reason: String },

    #[error("Failed to build transport for {endpoint}: {reason}")]
    DialerConstruction { endpoint: String, reason: String },

    #[error("Proxy {endpoint} refused tunnel to {target}: {reason}")]
    TunnelRefused {
        endpoint: String,
        target: String,
        reason: String,
    },
}
