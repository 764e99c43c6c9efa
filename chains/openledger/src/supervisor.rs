use crate::account::Account;
use crate::client::ApiClient;
use crate::config::OpenLedgerConfig;
use crate::session::{SessionManager, SessionSettings};
use crate::tasks::{
    run_poller, CheckinTask, EarningTask, ErrorEvent, ErrorSink, RewardTask, TaskContext, TierTask,
};
use crate::token::{TokenCell, TokenManager};
use anyhow::{Context, Result};
use async_trait::async_trait;
use core_logic::{
    LinearBackoff, ProxyConnector, ProxyPool, Transport, Worker, WorkerReport, BOT_TARGET,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Errors buffered per account before sub-tasks wait on the supervisor.
pub const ERROR_CHANNEL_CAPACITY: usize = 4;

/// Runs everything for one account: proxy assignment, initial token, the
/// three pollers and the session, then drains their errors until they stop.
pub struct AccountSupervisor {
    account: Account,
    config: Arc<OpenLedgerConfig>,
    proxies: Arc<ProxyPool>,
    use_proxy: bool,
}

impl AccountSupervisor {
    pub fn new(
        account: Account,
        config: Arc<OpenLedgerConfig>,
        proxies: Arc<ProxyPool>,
        use_proxy: bool,
    ) -> Self {
        Self {
            account,
            config,
            proxies,
            use_proxy,
        }
    }

    fn token_manager(&self, transport: &Transport) -> TokenManager {
        let token = &self.config.token;
        TokenManager::new(
            transport.http.clone(),
            self.account.clone(),
            self.config.token_endpoint(),
            self.config.dashboard_origin.clone(),
            self.config.user_agent.clone(),
        )
        .with_policy(
            LinearBackoff::new(token.max_attempts, Duration::from_secs(token.backoff_step_secs)),
            Duration::from_secs(token.timeout_secs),
        )
    }
}

#[async_trait]
impl Worker for AccountSupervisor {
    fn label(&self) -> String {
        self.account.masked().to_string()
    }

    async fn run(&self, cancellation_token: CancellationToken) -> Result<WorkerReport> {
        let masked = self.account.masked().to_string();
        info!(target: BOT_TARGET, "Starting process for account: {}", masked);

        // One proxy for the account's whole run, reused on every reconnect.
        let proxy = if self.use_proxy {
            self.proxies.next()
        } else {
            None
        };
        let proxy_label = match &proxy {
            Some(endpoint) => {
                info!(target: BOT_TARGET, "Using proxy: {} for account: {}", endpoint, masked);
                endpoint.to_string()
            }
            None => "Direct".to_string(),
        };

        let transport = ProxyConnector::build(proxy.as_ref(), &self.config.transport_settings())
            .with_context(|| format!("Account {} - Failed to build transport", masked))?;

        let tokens = self.token_manager(&transport);
        let token = match tokens.acquire().await {
            Ok(token) => token,
            Err(e) => {
                error!(target: BOT_TARGET, "Account {} - Failed to generate initial token: {}", masked, e);
                return Err(e).context(format!("Account {} - initial token", masked));
            }
        };
        info!(target: BOT_TARGET, "Account {} - Token generated successfully", masked);

        let cell = TokenCell::new(token);
        let client = Arc::new(ApiClient::new(
            transport.http.clone(),
            &self.config.rewards_base_url,
            tokens,
            cell.clone(),
        ));

        let (tx, mut rx) = mpsc::channel::<ErrorEvent>(ERROR_CHANNEL_CAPACITY);
        let errors = ErrorSink::new(&self.account, tx);
        let intervals = &self.config.intervals;

        let ctx = TaskContext {
            account: self.account.clone(),
            client,
            errors: errors.clone(),
            cancel: cancellation_token.clone(),
            error_penalty: intervals.error_penalty(),
        };

        let pollers: Vec<Arc<dyn RewardTask>> = vec![
            Arc::new(EarningTask::new(intervals.earning())),
            Arc::new(CheckinTask::new(intervals.checkin())),
            Arc::new(TierTask::new(intervals.tier(), intervals.tier_claim_spacing())),
        ];

        let mut set = JoinSet::new();
        for poller in pollers {
            let ctx = ctx.clone();
            set.spawn(async move { run_poller(poller.as_ref(), &ctx).await });
        }

        let session = SessionManager::new(
            self.account.clone(),
            proxy_label,
            transport.dialer.clone(),
            cell,
            SessionSettings::from_config(&self.config),
            errors,
        );
        let session_token = cancellation_token.clone();
        set.spawn(async move { session.run(session_token).await.connections });

        // Only the sub-tasks hold senders now; the channel closes with them.
        drop(ctx);
        info!(target: BOT_TARGET, "Account {} - All processes started", masked);

        let mut report = WorkerReport::default();
        loop {
            tokio::select! {
                biased;
                Some(event) = rx.recv() => {
                    report.errors_seen += 1;
                    warn!(target: BOT_TARGET, "Account {} - Error: {}", event.account, event);
                }
                Some(joined) = set.join_next() => {
                    match joined {
                        Ok(_) => report.tasks_finished += 1,
                        Err(e) => error!("Account {} - sub-task panicked: {:?}", masked, e),
                    }
                }
                else => break,
            }
        }

        info!(target: BOT_TARGET, "Account {} - All processes stopped", masked);
        Ok(report)
    }
}
