//! Configuration loader for the OpenLedger bot

use anyhow::{Context, Result};
use core_logic::{ProxyMode, ProxySource, TransportSettings};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
const WORKSPACE_CONFIG_PATH: &str = "chains/openledger/config/config.toml";

/// Bot configuration. Every field has a default, so a partial file (or no
/// file at all) still yields a runnable setup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenLedgerConfig {
    /// Host of the auth and WebSocket API
    pub api_base_url: String,
    /// Host of the reward endpoints
    pub rewards_base_url: String,
    /// Orchestrator WebSocket endpoint, without the token query
    pub ws_url: String,
    /// Origin presented by the simulated browser extension
    pub extension_id: String,
    /// Origin/Referer used for token acquisition
    pub dashboard_origin: String,
    pub user_agent: String,
    pub accounts_file: String,
    pub manual_proxy_file: String,
    pub auto_proxy_url: String,
    pub auto_proxy_file: String,
    pub intervals: IntervalConfig,
    pub token: TokenConfig,
    pub session: SessionConfig,
}

impl Default for OpenLedgerConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://apitn.openledger.xyz".to_string(),
            rewards_base_url: "https://rewardstn.openledger.xyz".to_string(),
            ws_url: "wss://apitn.openledger.xyz/ws/v1/orch".to_string(),
            extension_id: "chrome-extension://ekbbplmjjgoobhdlffmgeokalelnmjjc".to_string(),
            dashboard_origin: "https://testnet.openledger.xyz".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
                .to_string(),
            accounts_file: "accounts.txt".to_string(),
            manual_proxy_file: "manual_proxy.txt".to_string(),
            auto_proxy_url:
                "https://raw.githubusercontent.com/monosans/proxy-list/main/proxies/all.txt"
                    .to_string(),
            auto_proxy_file: "proxy.txt".to_string(),
            intervals: IntervalConfig::default(),
            token: TokenConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IntervalConfig {
    pub earning_secs: u64,
    pub checkin_secs: u64,
    pub tier_secs: u64,
    /// Pause after a failed poll before trying again
    pub error_penalty_secs: u64,
    pub tier_claim_spacing_secs: u64,
    pub heartbeat_secs: u64,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            earning_secs: 600,
            checkin_secs: 86_400,
            tier_secs: 86_400,
            error_penalty_secs: 60,
            tier_claim_spacing_secs: 1,
            heartbeat_secs: 30,
        }
    }
}

impl IntervalConfig {
    pub fn earning(&self) -> Duration {
        Duration::from_secs(self.earning_secs)
    }

    pub fn checkin(&self) -> Duration {
        Duration::from_secs(self.checkin_secs)
    }

    pub fn tier(&self) -> Duration {
        Duration::from_secs(self.tier_secs)
    }

    pub fn error_penalty(&self) -> Duration {
        Duration::from_secs(self.error_penalty_secs)
    }

    pub fn tier_claim_spacing(&self) -> Duration {
        Duration::from_secs(self.tier_claim_spacing_secs)
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    pub max_attempts: u32,
    pub backoff_step_secs: u64,
    pub timeout_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_step_secs: 2,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub initial_backoff_secs: u64,
    pub max_backoff_secs: u64,
    /// Quick re-dials before falling back to `dial_failure_pause_secs`
    pub dial_retries: u32,
    pub dial_retry_step_secs: u64,
    pub dial_failure_pause_secs: u64,
    pub register_failure_pause_secs: u64,
    pub handshake_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_backoff_secs: 5,
            max_backoff_secs: 30,
            dial_retries: 3,
            dial_retry_step_secs: 5,
            dial_failure_pause_secs: 30,
            register_failure_pause_secs: 5,
            handshake_timeout_secs: 45,
        }
    }
}

impl OpenLedgerConfig {
    /// Load configuration from a TOML file
    ///
    /// # Example
    /// ```ignore
    /// let config = OpenLedgerConfig::from_path("config/config.toml")?;
    /// ```
    pub fn from_path(path: &str) -> Result<Self> {
        let content =
            fs::read_to_string(path).context(format!("Failed to read config from {}", path))?;
        toml::from_str(&content).context("Failed to parse config TOML")
    }

    /// Picks the config file: the given path, or the crate's copy when run
    /// from the workspace root with the default path.
    pub fn resolve_path(path: &str) -> String {
        if Path::new(path).exists() {
            path.to_string()
        } else if path == DEFAULT_CONFIG_PATH && Path::new(WORKSPACE_CONFIG_PATH).exists() {
            WORKSPACE_CONFIG_PATH.to_string()
        } else {
            path.to_string()
        }
    }

    /// Like [`from_path`](Self::from_path) but a missing file yields the
    /// defaults. A file that exists and does not parse is still an error.
    pub fn load(path: &str) -> Result<Self> {
        let resolved = Self::resolve_path(path);
        if !Path::new(&resolved).exists() {
            warn!("Config file {} not found, using defaults", resolved);
            return Ok(Self::default());
        }
        Self::from_path(&resolved)
    }

    pub fn proxy_source(&self, mode: ProxyMode) -> ProxySource {
        match mode {
            ProxyMode::Auto => ProxySource::Auto {
                url: self.auto_proxy_url.clone(),
                path: self.auto_proxy_file.clone(),
            },
            ProxyMode::Manual => ProxySource::Manual {
                path: self.manual_proxy_file.clone(),
            },
            ProxyMode::None => ProxySource::Disabled,
        }
    }

    pub fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            request_timeout: Duration::from_secs(self.token.timeout_secs),
            ..TransportSettings::default()
        }
    }

    pub fn token_endpoint(&self) -> String {
        format!(
            "{}/api/v1/auth/generate_token",
            self.api_base_url.trim_end_matches('/')
        )
    }
}
