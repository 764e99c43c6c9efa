//! Tasks Module - periodic reward pollers
//!
//! Every poller follows the same loop, implemented once in [`run_poller`]:
//!
//! 1. Stop if the account's cancellation token has fired.
//! 2. Run one cycle of the task (read, maybe claim, log).
//! 3. On error, report an [`ErrorEvent`] and wait the penalty interval.
//! 4. Otherwise wait the task's own interval.
//!
//! Tasks implement [`RewardTask`]:
//!
//! ```rust,ignore
//! #[async_trait]
//! impl RewardTask for MyTask {
//!     fn stage(&self) -> Stage { Stage::Earning }
//!     fn interval(&self) -> Duration { Duration::from_secs(600) }
//!     async fn run_cycle(&self, ctx: &TaskContext) -> BotResult<()> {
//!         let total = ctx.client.user_reward().await?;
//!         Ok(())
//!     }
//! }
//! ```

pub mod checkin;
pub mod earning;
pub mod tier;

pub use checkin::{CheckinOutcome, CheckinTask};
pub use earning::{EarningSnapshot, EarningTask};
pub use tier::{TierOutcome, TierReport, TierTask};

use crate::account::Account;
use crate::client::ApiClient;
use crate::error::{BotError, BotResult};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Sub-task an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Earning,
    CheckIn,
    Tier,
    Session,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Earning => "earning",
            Stage::CheckIn => "check-in",
            Stage::Tier => "tier",
            Stage::Session => "websocket",
        };
        f.write_str(name)
    }
}

/// A failure reported by one of an account's sub-tasks. Never leaves the
/// account's own channel.
#[derive(Debug)]
pub struct ErrorEvent {
    pub account: String,
    pub stage: Stage,
    pub cause: BotError,
}

impl fmt::Display for ErrorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.cause)
    }
}

/// Sender half of an account's error channel.
#[derive(Debug, Clone)]
pub struct ErrorSink {
    account: String,
    tx: mpsc::Sender<ErrorEvent>,
}

impl ErrorSink {
    pub fn new(account: &Account, tx: mpsc::Sender<ErrorEvent>) -> Self {
        Self {
            account: account.masked().to_string(),
            tx,
        }
    }

    pub async fn report(&self, stage: Stage, cause: BotError) {
        let event = ErrorEvent {
            account: self.account.clone(),
            stage,
            cause,
        };
        if self.tx.send(event).await.is_err() {
            debug!("Error channel closed, dropping {} error", stage);
        }
    }
}

/// Execution context shared by an account's pollers.
#[derive(Clone)]
pub struct TaskContext {
    pub account: Account,
    pub client: Arc<ApiClient>,
    pub errors: ErrorSink,
    pub cancel: CancellationToken,
    /// Wait after a failed cycle
    pub error_penalty: Duration,
}

impl TaskContext {
    /// Sleeps for `duration`. Returns `false` if cancelled first.
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    pub async fn report(&self, stage: Stage, cause: BotError) {
        self.errors.report(stage, cause).await;
    }
}

#[async_trait]
pub trait RewardTask: Send + Sync {
    fn stage(&self) -> Stage;

    /// Wait between successful cycles
    fn interval(&self) -> Duration;

    /// One read/claim/log pass. Errors returned here are reported and
    /// followed by the penalty wait; they never end the loop.
    async fn run_cycle(&self, ctx: &TaskContext) -> BotResult<()>;
}

/// Drives `task` until the context is cancelled. Returns the number of
/// cycles that completed without error.
pub async fn run_poller(task: &dyn RewardTask, ctx: &TaskContext) -> u64 {
    let mut completed = 0;
    while !ctx.cancel.is_cancelled() {
        let pause = match task.run_cycle(ctx).await {
            Ok(()) => {
                completed += 1;
                task.interval()
            }
            Err(e) => {
                ctx.report(task.stage(), e).await;
                ctx.error_penalty
            }
        };
        if !ctx.sleep(pause).await {
            break;
        }
    }
    debug!("{} poller stopped after {} cycles", task.stage(), completed);
    completed
}
