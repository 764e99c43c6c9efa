use super::{RewardTask, Stage, TaskContext};
use crate::api::TierClaim;
use crate::error::BotResult;
use async_trait::async_trait;
use core_logic::BOT_TARGET;
use std::fmt;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub enum TierOutcome {
    Claimed { name: String, value: f64 },
    NotEligible { name: String },
}

impl fmt::Display for TierOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TierOutcome::Claimed { name, value } => write!(
                f,
                "Tier: {} - Status: Is Claimed - Reward: {:.2} PTS",
                name, value
            ),
            TierOutcome::NotEligible { name } => {
                write!(f, "Tier: {} - Status: Not Eligible to Claim", name)
            }
        }
    }
}

/// What one tier cycle did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TierReport {
    /// Tier details came back empty; nothing was attempted
    pub fetch_failed: bool,
    /// Every tier was already claimed before this cycle
    pub completed: bool,
    pub claims: Vec<TierOutcome>,
}

impl TierReport {
    /// Summary line for cycles that did not claim anything.
    pub fn summary(&self) -> Option<&'static str> {
        if self.fetch_failed {
            Some("Tier: GET Data Failed")
        } else if self.completed {
            Some("Tier: All Available Tier Is Completed")
        } else {
            None
        }
    }
}

pub struct TierTask {
    interval: Duration,
    claim_spacing: Duration,
}

impl TierTask {
    pub fn new(interval: Duration, claim_spacing: Duration) -> Self {
        Self {
            interval,
            claim_spacing,
        }
    }

    /// Claims every tier not yet claimed, one at a time. A failing claim is
    /// reported and the remaining tiers are still attempted.
    pub async fn claim_pending(&self, ctx: &TaskContext) -> BotResult<TierReport> {
        let tiers = ctx.client.tier_details().await?;
        if tiers.is_empty() {
            return Ok(TierReport {
                fetch_failed: true,
                ..TierReport::default()
            });
        }

        let mut report = TierReport {
            completed: true,
            ..TierReport::default()
        };

        for tier in tiers.iter().filter(|t| !t.claimed) {
            report.completed = false;

            match ctx.client.claim_tier(tier.id).await {
                Ok(TierClaim::Claimed) => {
                    let outcome = TierOutcome::Claimed {
                        name: tier.name.clone(),
                        value: tier.value,
                    };
                    info!(target: BOT_TARGET, "Account: {} - {}", ctx.account.masked(), outcome);
                    report.claims.push(outcome);
                }
                Ok(TierClaim::NotEligible) => {
                    let outcome = TierOutcome::NotEligible {
                        name: tier.name.clone(),
                    };
                    info!(target: BOT_TARGET, "Account: {} - {}", ctx.account.masked(), outcome);
                    report.claims.push(outcome);
                }
                Err(e) => {
                    ctx.report(Stage::Tier, e).await;
                    continue;
                }
            }

            if !ctx.sleep(self.claim_spacing).await {
                break;
            }
        }

        Ok(report)
    }
}

#[async_trait]
impl RewardTask for TierTask {
    fn stage(&self) -> Stage {
        Stage::Tier
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run_cycle(&self, ctx: &TaskContext) -> BotResult<()> {
        let report = self.claim_pending(ctx).await?;
        if let Some(line) = report.summary() {
            info!(target: BOT_TARGET, "Account: {} - {}", ctx.account.masked(), line);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_lines() {
        let claimed = TierOutcome::Claimed {
            name: "Bronze".to_string(),
            value: 5.0,
        };
        assert_eq!(
            claimed.to_string(),
            "Tier: Bronze - Status: Is Claimed - Reward: 5.00 PTS"
        );
        let skipped = TierOutcome::NotEligible {
            name: "Gold".to_string(),
        };
        assert_eq!(
            skipped.to_string(),
            "Tier: Gold - Status: Not Eligible to Claim"
        );
    }

    #[test]
    fn test_summary_only_for_idle_cycles() {
        let pending = TierReport::default();
        assert_eq!(pending.summary(), None);

        let done = TierReport {
            completed: true,
            ..TierReport::default()
        };
        assert_eq!(
            done.summary(),
            Some("Tier: All Available Tier Is Completed")
        );
    }
}
