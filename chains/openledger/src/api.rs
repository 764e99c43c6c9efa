//! Wire types for the OpenLedger REST endpoints.
//!
//! Only the fields that drive the bot's control flow are modelled; the
//! service returns plenty more that is ignored.

use crate::error::{BotError, BotResult};
use serde::{Deserialize, Serialize};

pub const GENERATE_TOKEN_PATH: &str = "/api/v1/auth/generate_token";
pub const REWARD_PATH: &str = "/api/v1/reward";
pub const WORKER_REWARD_PATH: &str = "/api/v1/worker_reward";
pub const REWARD_REALTIME_PATH: &str = "/api/v1/reward_realtime";
pub const CLAIM_DETAILS_PATH: &str = "/api/v1/claim_details";
pub const CLAIM_REWARD_PATH: &str = "/api/v1/claim_reward";
pub const TIER_DETAILS_PATH: &str = "/api/v1/tier_details";
pub const CLAIM_TIER_PATH: &str = "/api/v1/claim_tier";

/// Every endpoint wraps its payload in `{"data": ...}`.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct TokenRequest<'a> {
    pub address: &'a str,
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenData {
    #[serde(default)]
    pub token: String,
}

/// Points arrive as strings (`"12.5"`), occasionally as numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Points {
    Number(f64),
    Text(String),
}

impl Points {
    /// Empty strings count as zero.
    pub fn value(&self) -> BotResult<f64> {
        match self {
            Points::Number(n) => Ok(*n),
            Points::Text(s) if s.trim().is_empty() => Ok(0.0),
            Points::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| BotError::decode("points", format!("'{}': {}", s, e))),
        }
    }
}

impl Default for Points {
    fn default() -> Self {
        Points::Number(0.0)
    }
}

#[derive(Debug, Deserialize)]
pub struct RewardData {
    #[serde(rename = "totalPoint", default)]
    pub total_point: Points,
}

#[derive(Debug, Deserialize)]
pub struct WorkerRewardEntry {
    #[serde(default)]
    pub heartbeat_count: Points,
}

/// The realtime endpoint may omit `data`, send it as `null`, or answer an
/// error status with some other JSON object; all of those read as no entries.
#[derive(Debug, Default, Deserialize)]
pub struct RealtimeRewardData {
    #[serde(default)]
    pub data: Option<Vec<RealtimeRewardEntry>>,
}

#[derive(Debug, Deserialize)]
pub struct RealtimeRewardEntry {
    #[serde(default)]
    pub total_heartbeats: Option<Points>,
}

impl RealtimeRewardData {
    /// Today's points from the first entry; anything missing counts as zero.
    pub fn today(&self) -> BotResult<f64> {
        match self
            .data
            .as_deref()
            .and_then(|entries| entries.first())
            .and_then(|entry| entry.total_heartbeats.as_ref())
        {
            Some(points) => points.value(),
            None => Ok(0.0),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckinDetails {
    #[serde(default)]
    pub claimed: bool,
    #[serde(rename = "dailyPoint", default)]
    pub daily_point: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClaimCheckin {
    #[serde(default)]
    pub claimed: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct TierDetailsData {
    #[serde(rename = "tierDetails", default)]
    pub tier_details: Vec<TierRecord>,
}

/// Snapshot of one tier; re-fetched every cycle.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TierRecord {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: f64,
    #[serde(rename = "claimStatus", default)]
    pub claimed: bool,
}

#[derive(Debug, Serialize)]
pub struct ClaimTierRequest {
    #[serde(rename = "tierId")]
    pub tier_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ClaimTierResponse {
    #[serde(default)]
    pub status: String,
}

impl ClaimTierResponse {
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("SUCCESS")
    }
}

/// Result of a single tier claim call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierClaim {
    Claimed,
    /// HTTP 420, or any non-success status in the body
    NotEligible,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_accept_strings_and_numbers() {
        let reward: ApiResponse<RewardData> =
            serde_json::from_str(r#"{"data":{"totalPoint":"1523.75"}}"#).expect("parses");
        assert_eq!(reward.data.total_point.value().expect("number"), 1523.75);

        let reward: ApiResponse<RewardData> =
            serde_json::from_str(r#"{"data":{"totalPoint":42}}"#).expect("parses");
        assert_eq!(reward.data.total_point.value().expect("number"), 42.0);

        assert_eq!(Points::Text(String::new()).value().expect("empty"), 0.0);
        assert!(Points::Text("abc".to_string()).value().is_err());
    }

    #[test]
    fn test_tier_records_tolerate_missing_fields() {
        let tiers: ApiResponse<TierDetailsData> = serde_json::from_str(
            r#"{"data":{"tierDetails":[{"id":1,"claimStatus":true},{"id":2,"name":"Bronze","value":5,"claimStatus":false}]}}"#,
        )
        .expect("parses");
        assert_eq!(tiers.data.tier_details.len(), 2);
        assert!(tiers.data.tier_details[0].claimed);
        assert_eq!(tiers.data.tier_details[1].name, "Bronze");
    }

    #[test]
    fn test_claim_tier_request_shape() {
        let body = serde_json::to_string(&ClaimTierRequest { tier_id: 7 }).expect("serializes");
        assert_eq!(body, r#"{"tierId":7}"#);
    }
}
