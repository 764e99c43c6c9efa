use super::{RewardTask, Stage, TaskContext};
use crate::error::BotResult;
use async_trait::async_trait;
use core_logic::BOT_TARGET;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

/// Points as shown to the operator: `total` already includes `today`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EarningSnapshot {
    pub total: f64,
    pub today: f64,
}

impl fmt::Display for EarningSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Earning: Total {:.2} PTS - Today {:.2} PTS",
            self.total, self.today
        )
    }
}

pub struct EarningTask {
    interval: Duration,
}

impl EarningTask {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub async fn snapshot(&self, ctx: &TaskContext) -> BotResult<EarningSnapshot> {
        let cumulative = ctx.client.user_reward().await?;
        let today = match ctx.client.realtime_reward().await {
            Ok(today) => today,
            Err(e) => {
                debug!("Realtime reward unavailable, counting as 0: {}", e);
                0.0
            }
        };

        match ctx.client.worker_reward().await {
            Ok(heartbeats) => debug!("Worker heartbeat count: {}", heartbeats),
            Err(e) => debug!("Worker reward unavailable: {}", e),
        }

        Ok(EarningSnapshot {
            total: cumulative + today,
            today,
        })
    }
}

#[async_trait]
impl RewardTask for EarningTask {
    fn stage(&self) -> Stage {
        Stage::Earning
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run_cycle(&self, ctx: &TaskContext) -> BotResult<()> {
        let snapshot = self.snapshot(ctx).await?;
        info!(target: BOT_TARGET, "Account: {} - {}", ctx.account.masked(), snapshot);
        Ok(())
    }
}
