//! Error taxonomy for the bot's pollers and session.

use core_logic::{CoreError, ProxyError};
use thiserror::Error;

pub type BotResult<T> = Result<T, BotError>;

#[derive(Error, Debug)]
pub enum BotError {
    /// Dial or request failure, including unexpected HTTP statuses
    #[error("transport error: {0}")]
    Transport(String),

    /// Body that is not the JSON shape we expect
    #[error("decode error: {0}")]
    Decode(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Proxy(#[from] ProxyError),

    /// Unexpected WebSocket close or read failure
    #[error("protocol error: {0}")]
    Protocol(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("token rejected by {endpoint} after renewal")]
    TokenInvalid { endpoint: String },

    #[error("received empty token")]
    EmptyToken,

    #[error("failed to generate token after {attempts} attempts: {last}")]
    TokenAcquisitionFailed { attempts: u32, last: String },
}

impl BotError {
    pub fn transport(context: &str, err: impl std::fmt::Display) -> Self {
        BotError::Transport(format!("{}: {}", context, err))
    }

    pub fn decode(context: &str, err: impl std::fmt::Display) -> Self {
        BotError::Decode(format!("{}: {}", context, err))
    }
}

impl From<reqwest::Error> for BotError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            BotError::Decode(e.to_string())
        } else {
            BotError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for BotError {
    fn from(e: serde_json::Error) -> Self {
        BotError::Decode(e.to_string())
    }
}

impl From<CoreError> for BotError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Proxy(p) => BotError::Proxy(p),
            other => BotError::Transport(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_logic::NetworkError;

    #[test]
    fn test_core_errors_keep_their_kind() {
        let proxy: BotError = CoreError::from(ProxyError::UnsupportedProxyScheme {
            scheme: "ftp".to_string(),
        })
        .into();
        assert!(matches!(proxy, BotError::Proxy(_)));

        let dial: BotError = CoreError::from(NetworkError::ConnectionRefused {
            endpoint: "1.2.3.4:80".to_string(),
            reason: "refused".to_string(),
        })
        .into();
        assert!(matches!(dial, BotError::Transport(_)));
    }

    #[test]
    fn test_acquisition_failure_message() {
        let err = BotError::from(AuthError::TokenAcquisitionFailed {
            attempts: 5,
            last: "received empty token".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "failed to generate token after 5 attempts: received empty token"
        );
    }
}
