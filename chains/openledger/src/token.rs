//! Bearer token lifecycle for one account.

use crate::account::Account;
use crate::api::{ApiResponse, TokenData, TokenRequest};
use crate::error::{AuthError, BotError, BotResult};
use core_logic::{retry_with_backoff, LinearBackoff, RetryError, BOT_TARGET};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, ORIGIN, REFERER, USER_AGENT};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

const ACCEPT_VALUE: &str = "application/json, text/plain, */*";
pub(crate) const ACCEPT_LANGUAGE_VALUE: &str = "id-ID,id;q=0.9,en-US;q=0.8,en;q=0.7";

/// The account's current token. Shared by the account's sub-tasks only;
/// renewal replaces the value for all of them.
#[derive(Debug, Clone)]
pub struct TokenCell(Arc<RwLock<String>>);

impl TokenCell {
    pub fn new(token: String) -> Self {
        Self(Arc::new(RwLock::new(token)))
    }

    pub async fn get(&self) -> String {
        self.0.read().await.clone()
    }

    pub async fn replace(&self, token: String) {
        *self.0.write().await = token;
    }
}

/// Acquires and renews tokens through the account's own HTTP client.
#[derive(Debug, Clone)]
pub struct TokenManager {
    http: reqwest::Client,
    account: Account,
    endpoint: String,
    dashboard_origin: String,
    user_agent: String,
    policy: LinearBackoff,
    timeout: Duration,
}

impl TokenManager {
    pub fn new(
        http: reqwest::Client,
        account: Account,
        endpoint: String,
        dashboard_origin: String,
        user_agent: String,
    ) -> Self {
        Self {
            http,
            account,
            endpoint,
            dashboard_origin,
            user_agent,
            policy: LinearBackoff::default(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_policy(mut self, policy: LinearBackoff, timeout: Duration) -> Self {
        self.policy = policy;
        self.timeout = timeout;
        self
    }

    /// Requests a fresh token, retrying transport failures, malformed bodies
    /// and empty tokens with linear backoff.
    pub async fn acquire(&self) -> Result<String, AuthError> {
        let max_attempts = self.policy.max_attempts;
        let result = retry_with_backoff(
            self.policy,
            "generate_token",
            |attempt| async move {
                let outcome = self.request_token().await;
                if let Err(e) = &outcome {
                    if attempt < max_attempts {
                        warn!(
                            target: BOT_TARGET,
                            "Account {} - Retrying token generation (attempt {}/{}): {}",
                            self.account.masked(),
                            attempt,
                            max_attempts,
                            e
                        );
                    }
                }
                outcome
            },
            |_: &BotError| true,
        )
        .await;

        result.map_err(|e: RetryError<BotError>| {
            let attempts = e.attempts();
            AuthError::TokenAcquisitionFailed {
                attempts,
                last: e.into_inner().to_string(),
            }
        })
    }

    /// Acquires a new token and stores it in `cell`.
    pub async fn renew(&self, cell: &TokenCell) -> Result<String, AuthError> {
        match self.acquire().await {
            Ok(token) => {
                cell.replace(token.clone()).await;
                info!(target: BOT_TARGET, "Account {} - Access Token Has Been Renewed", self.account.masked());
                Ok(token)
            }
            Err(e) => {
                error!(target: BOT_TARGET, "Account {} - Failed to Renew Access Token", self.account.masked());
                Err(e)
            }
        }
    }

    async fn request_token(&self) -> BotResult<String> {
        let response = self
            .http
            .post(&self.endpoint)
            .timeout(self.timeout)
            .header(ACCEPT, ACCEPT_VALUE)
            .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGE_VALUE)
            .header(CONTENT_TYPE, "application/json")
            .header(ORIGIN, &self.dashboard_origin)
            .header(REFERER, format!("{}/", self.dashboard_origin))
            .header(USER_AGENT, &self.user_agent)
            .json(&TokenRequest {
                address: self.account.id(),
            })
            .send()
            .await
            .map_err(|e| BotError::transport("token request", e))?;

        let body = response
            .text()
            .await
            .map_err(|e| BotError::transport("token body", e))?;
        let parsed: ApiResponse<TokenData> =
            serde_json::from_str(&body).map_err(|e| BotError::decode("token response", e))?;

        if parsed.data.token.is_empty() {
            return Err(AuthError::EmptyToken.into());
        }
        Ok(parsed.data.token)
    }
}
