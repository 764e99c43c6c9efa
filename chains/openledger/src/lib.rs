//! OpenLedger Bot - keeps many rewards-service accounts alive at once
//!
//! Each account gets its own supervisor that acquires a bearer token, polls
//! the reward endpoints on independent schedules and holds a persistent
//! orchestrator WebSocket session, optionally through a rotating proxy.
//!
//! # Architecture
//!
//! - **[`BotController`]**: loads accounts and proxies, one supervisor per account
//! - **[`AccountSupervisor`]**: proxy assignment, initial token, sub-task fan-out
//! - **[`TokenManager`]**: token acquisition with bounded retries and renewal
//! - **[`ApiClient`]**: reward endpoints, renewing the token once on HTTP 401
//! - **Pollers**: earnings, daily check-in and tier claims via [`tasks::RewardTask`]
//! - **[`SessionManager`]**: register, heartbeat, job replies, reconnect backoff
//!
//! # Quick Start
//!
//! ```bash
//! # accounts.txt holds one wallet address per line
//! cargo run -p openledger-bot -- --proxy-mode none
//! ```
//!
//! Configuration is loaded from `config/config.toml`; see [`config`].

pub mod account;
pub mod api;
pub mod bot;
pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod supervisor;
pub mod tasks;
pub mod token;

pub use account::{mask_account, Account, WorkerIdentity};
pub use bot::BotController;
pub use client::ApiClient;
pub use config::OpenLedgerConfig;
pub use error::{AuthError, BotError, BotResult};
pub use session::{SessionManager, SessionSettings, SessionState};
pub use supervisor::AccountSupervisor;
pub use token::{TokenCell, TokenManager};
