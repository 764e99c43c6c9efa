use crate::account::Account;
use crate::config::OpenLedgerConfig;
use crate::supervisor::AccountSupervisor;
use anyhow::{Context, Result};
use core_logic::{AccountLoader, ProxyManager, ProxyMode, RunSummary, Worker, WorkerRunner, BOT_TARGET};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Loads accounts and proxies, then runs one supervisor per account until
/// every supervisor has stopped.
pub struct BotController {
    config: Arc<OpenLedgerConfig>,
    mode: ProxyMode,
}

impl BotController {
    pub fn new(config: OpenLedgerConfig, mode: ProxyMode) -> Self {
        Self {
            config: Arc::new(config),
            mode,
        }
    }

    /// Builds the supervisors. A missing or empty accounts file is fatal.
    pub async fn prepare(&self) -> Result<Vec<Arc<dyn Worker>>> {
        info!(target: BOT_TARGET, "Loading configuration...");

        let source = self.config.proxy_source(self.mode);
        let proxies = Arc::new(ProxyManager::load_pool(&source).await);

        let accounts = AccountLoader::load(&self.config.accounts_file)
            .with_context(|| format!("Failed to load accounts from {}", self.config.accounts_file))?;
        info!(target: BOT_TARGET, "Account's Total: {}", accounts.len());

        let use_proxy = source.is_enabled();
        Ok(accounts
            .into_iter()
            .map(|id| {
                Arc::new(AccountSupervisor::new(
                    Account::new(id),
                    self.config.clone(),
                    proxies.clone(),
                    use_proxy,
                )) as Arc<dyn Worker>
            })
            .collect())
    }

    /// Runs until all accounts stop. Ctrl+C cancels `token`.
    pub async fn run(self, token: CancellationToken) -> Result<RunSummary> {
        let workers = self.prepare().await?;
        info!(target: BOT_TARGET, "Starting all processes...");
        WorkerRunner::run_workers(workers, token).await
    }
}
