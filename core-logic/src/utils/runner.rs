use crate::traits::Worker;
use anyhow::Result;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Instrument};

/// Totals gathered once every worker has stopped.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: usize,
    pub failed: usize,
    pub panicked: usize,
    pub errors_seen: u64,
}

pub struct WorkerRunner;

impl WorkerRunner {
    /// Spawns a list of workers as concurrent tasks and waits for them.
    ///
    /// Ctrl+C (and SIGTERM on unix) cancels `token`; workers observe it
    /// cooperatively.
    pub async fn run_workers(
        workers: Vec<Arc<dyn Worker>>,
        token: CancellationToken,
    ) -> Result<RunSummary> {
        let signal_token = token.clone();
        let signal_task = tokio::spawn(async move {
            tokio::select! {
                _ = wait_for_shutdown_signal() => {
                    info!(target: "bot", "🛑 Received stop signal. Initiating graceful shutdown...");
                    signal_token.cancel();
                }
                _ = signal_token.cancelled() => {}
            }
        });

        let summary = Self::run_until_done(workers, token).await;
        signal_task.abort();
        Ok(summary)
    }

    /// Same as [`run_workers`](Self::run_workers) without installing signal
    /// handlers; the caller owns cancellation.
    pub async fn run_until_done(
        workers: Vec<Arc<dyn Worker>>,
        token: CancellationToken,
    ) -> RunSummary {
        let mut set = JoinSet::new();
        let start_time = std::time::Instant::now();
        info!("Starting {} workers...", workers.len());

        for worker in workers {
            let span = tracing::info_span!("worker", account = %worker.label());
            let child_token = token.child_token();

            set.spawn(
                async move {
                    match worker.run(child_token).await {
                        Ok(report) => Ok(report),
                        Err(e) => {
                            error!(target: "bot", "Worker {} failed: {:#}", worker.label(), e);
                            Err(e)
                        }
                    }
                }
                .instrument(span),
            );
        }

        let mut summary = RunSummary::default();

        while let Some(res) = set.join_next().await {
            match res {
                Ok(Ok(report)) => {
                    summary.completed += 1;
                    summary.errors_seen += report.errors_seen;
                }
                Ok(Err(_)) => {
                    // Already logged in task
                    summary.failed += 1;
                }
                Err(e) => {
                    error!("A worker task panicked or failed to join: {:?}", e);
                    summary.panicked += 1;
                }
            }
        }

        info!(target: "bot", "🛑 Shutdown Complete.");
        info!(
            target: "bot",
            "Total Time: {:.1}s | Stopped: {} | Failed: {} | Errors Survived: {}",
            start_time.elapsed().as_secs_f64(),
            summary.completed,
            summary.failed + summary.panicked,
            summary.errors_seen
        );

        summary
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(err) => {
            error!("Unable to listen for SIGTERM: {}", err);
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(err) = res {
                error!("Unable to listen for shutdown signal: {}", err);
            }
        }
        _ = term.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Unable to listen for shutdown signal: {}", err);
    }
}
