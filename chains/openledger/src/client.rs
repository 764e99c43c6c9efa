//! REST client for the reward endpoints.
//!
//! All calls carry the account's current bearer token. A 401 triggers one
//! renewal through [`TokenManager`] and one re-issue of the same request; a
//! second 401 is surfaced as [`AuthError::TokenInvalid`].

use crate::api::*;
use crate::error::{AuthError, BotError, BotResult};
use crate::token::{TokenCell, TokenManager};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Status the tier endpoint uses for "not eligible".
const NOT_ELIGIBLE: u16 = 420;

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenManager,
    cell: TokenCell,
}

impl ApiClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        tokens: TokenManager,
        cell: TokenCell,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
            cell,
        }
    }

    pub fn token_cell(&self) -> &TokenCell {
        &self.cell
    }

    /// Cumulative points (`data.totalPoint`).
    pub async fn user_reward(&self) -> BotResult<f64> {
        let reward: ApiResponse<RewardData> = self.get_json(REWARD_PATH).await?;
        reward.data.total_point.value()
    }

    /// Heartbeat count credited to the worker; missing data reads as zero.
    pub async fn worker_reward(&self) -> BotResult<f64> {
        let reward: ApiResponse<Vec<WorkerRewardEntry>> =
            self.get_json(WORKER_REWARD_PATH).await?;
        match reward.data.first() {
            Some(entry) => entry.heartbeat_count.value(),
            None => Ok(0.0),
        }
    }

    /// Today's points. This endpoint sometimes answers with a body that is not
    /// JSON, or JSON without usable data, whatever the status; all of that
    /// reads as zero rather than an error.
    pub async fn realtime_reward(&self) -> BotResult<f64> {
        let response = self
            .send_authorized(Method::GET, REWARD_REALTIME_PATH, None::<&()>)
            .await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BotError::transport(REWARD_REALTIME_PATH, e))?;

        let today = serde_json::from_str::<RealtimeRewardData>(&body)
            .map_err(|e| BotError::decode(REWARD_REALTIME_PATH, e))
            .and_then(|parsed| parsed.today());
        match today {
            Ok(value) => Ok(value),
            Err(e) => {
                debug!("Realtime reward unusable (HTTP {}), counting as 0: {}", status, e);
                Ok(0.0)
            }
        }
    }

    pub async fn checkin_details(&self) -> BotResult<CheckinDetails> {
        let details: ApiResponse<CheckinDetails> = self.get_json(CLAIM_DETAILS_PATH).await?;
        Ok(details.data)
    }

    pub async fn claim_checkin(&self) -> BotResult<ClaimCheckin> {
        let claim: ApiResponse<ClaimCheckin> = self.get_json(CLAIM_REWARD_PATH).await?;
        Ok(claim.data)
    }

    pub async fn tier_details(&self) -> BotResult<Vec<TierRecord>> {
        let tiers: ApiResponse<TierDetailsData> = self.get_json(TIER_DETAILS_PATH).await?;
        Ok(tiers.data.tier_details)
    }

    pub async fn claim_tier(&self, tier_id: i64) -> BotResult<TierClaim> {
        let response = self
            .send_authorized(
                Method::PUT,
                CLAIM_TIER_PATH,
                Some(&ClaimTierRequest { tier_id }),
            )
            .await?;

        if response.status().as_u16() == NOT_ELIGIBLE {
            return Ok(TierClaim::NotEligible);
        }
        let parsed: ClaimTierResponse = decode(CLAIM_TIER_PATH, response).await?;
        Ok(if parsed.is_success() {
            TierClaim::Claimed
        } else {
            TierClaim::NotEligible
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> BotResult<T> {
        let response = self.send_authorized(Method::GET, path, None::<&()>).await?;
        decode(path, response).await
    }

    fn request<B: serde::Serialize>(
        &self,
        method: &Method,
        path: &str,
        token: &str,
        body: Option<&B>,
    ) -> RequestBuilder {
        let builder = self
            .http
            .request(method.clone(), format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json");
        match body {
            Some(body) => builder.json(body),
            None => builder,
        }
    }

    /// Sends the request with the current token, renewing it at most once.
    async fn send_authorized<B: serde::Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> BotResult<Response> {
        let token = self.cell.get().await;
        let response = self
            .request(&method, path, &token, body)
            .send()
            .await
            .map_err(|e| BotError::transport(path, e))?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        // Another sub-task may already have renewed it.
        let current = self.cell.get().await;
        let fresh = if current != token {
            current
        } else {
            self.tokens.renew(&self.cell).await?
        };

        let response = self
            .request(&method, path, &fresh, body)
            .send()
            .await
            .map_err(|e| BotError::transport(path, e))?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(AuthError::TokenInvalid {
                endpoint: path.to_string(),
            }
            .into());
        }
        Ok(response)
    }
}

async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> BotResult<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| BotError::transport(path, e))?;
    if !status.is_success() {
        return Err(BotError::Transport(format!("HTTP {} from {}", status, path)));
    }
    serde_json::from_str(&body).map_err(|e| BotError::decode(path, e))
}
