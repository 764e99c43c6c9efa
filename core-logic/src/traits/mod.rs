use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Summary a worker hands back to the runner once it has stopped.
#[derive(Debug, Default, Clone)]
pub struct WorkerReport {
    /// Child tasks that ran to completion.
    pub tasks_finished: u64,
    /// Errors observed (and survived) while running.
    pub errors_seen: u64,
}

#[async_trait]
pub trait Worker: Send + Sync {
    /// Short label used for the worker's tracing span
    fn label(&self) -> String;

    /// Run until the work is done or `cancellation_token` fires.
    ///
    /// Returning `Err` marks the worker as failed at startup; errors that
    /// happen while running are expected to be handled inside.
    async fn run(&self, cancellation_token: CancellationToken) -> Result<WorkerReport>;
}
