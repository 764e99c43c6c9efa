use super::{RewardTask, Stage, TaskContext};
use crate::client::ApiClient;
use crate::error::BotResult;
use async_trait::async_trait;
use core_logic::BOT_TARGET;
use std::fmt;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub enum CheckinOutcome {
    Claimed { reward: f64 },
    NotClaimed,
    AlreadyClaimed,
}

impl fmt::Display for CheckinOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckinOutcome::Claimed { reward } => {
                write!(f, "Check-In: Is Claimed - Reward: {:.2} PTS", reward)
            }
            CheckinOutcome::NotClaimed => f.write_str("Check-In: Isn't Claimed"),
            CheckinOutcome::AlreadyClaimed => f.write_str("Check-In: Is Already Claimed"),
        }
    }
}

/// Daily check-in. The 24h cadence is the loop interval itself.
pub struct CheckinTask {
    interval: Duration,
}

impl CheckinTask {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub async fn check_in(&self, client: &ApiClient) -> BotResult<CheckinOutcome> {
        let details = client.checkin_details().await?;
        if details.claimed {
            return Ok(CheckinOutcome::AlreadyClaimed);
        }

        let claim = client.claim_checkin().await?;
        Ok(if claim.claimed {
            CheckinOutcome::Claimed {
                reward: details.daily_point,
            }
        } else {
            CheckinOutcome::NotClaimed
        })
    }
}

#[async_trait]
impl RewardTask for CheckinTask {
    fn stage(&self) -> Stage {
        Stage::CheckIn
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run_cycle(&self, ctx: &TaskContext) -> BotResult<()> {
        let outcome = self.check_in(&ctx.client).await?;
        info!(target: BOT_TARGET, "Account: {} - {}", ctx.account.masked(), outcome);
        Ok(())
    }
}
