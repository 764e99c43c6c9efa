use anyhow::{Context, Result};
use clap::Parser;
use core_logic::{setup_logger, ProxyMode, BOT_TARGET};
use dialoguer::{theme::ColorfulTheme, Select};
use dotenv::dotenv;
use openledger_bot::config::{OpenLedgerConfig, DEFAULT_CONFIG_PATH};
use openledger_bot::BotController;
use std::io::IsTerminal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// auto, manual or none; prompts when omitted on a terminal
    #[arg(short, long)]
    proxy_mode: Option<ProxyMode>,
}

fn choose_proxy_mode(cli: Option<ProxyMode>) -> Result<ProxyMode> {
    if let Some(mode) = cli {
        return Ok(mode);
    }
    if !std::io::stdin().is_terminal() {
        warn!("No terminal to prompt on, running without proxy.");
        return Ok(ProxyMode::None);
    }

    let labels: Vec<&str> = ProxyMode::ALL.iter().map(|m| m.label()).collect();
    let choice = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Choose proxy mode")
        .items(&labels)
        .default(0)
        .interact()
        .context("Failed to read proxy choice")?;
    Ok(ProxyMode::ALL[choice])
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    // Keep guard alive for file logging
    let _log_guard = setup_logger("openledger")?;

    println!(
        r#"
        ╔════════════════════════════════════════════════════════════╗
        ║               AUTO PING OPEN LEDGER - BOT                  ║
        ╚════════════════════════════════════════════════════════════╝
        "#
    );

    let config = OpenLedgerConfig::load(&args.config).context("Failed to load config")?;
    let mode = choose_proxy_mode(args.proxy_mode)?;
    info!(target: BOT_TARGET, "Starting OpenLedger Bot... ({})", mode.label());

    let token = CancellationToken::new();
    let summary = BotController::new(config, mode).run(token).await?;

    if summary.completed == 0 && summary.failed > 0 {
        warn!(target: BOT_TARGET, "No account could be started.");
    }
    Ok(())
}
