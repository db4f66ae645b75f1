use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use trendbot::api::{AlpacaClient, MarketDataProvider};
use trendbot::config::{AlpacaConfig, AppConfig, BotSettings};
use trendbot::execution::CsvTradeLog;
use trendbot::strategy::Strategy;
use trendbot::trader::Trader;
use trendbot::Result;

#[derive(Parser, Debug)]
#[command(name = "trendbot")]
#[command(about = "EMA/RSI rule-table crypto trader for Alpaca", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file (defaults to ./trendbot.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the trading loop
    Run {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,

        /// Only trade these symbols (repeatable), e.g. --asset BTC/USD
        #[arg(long = "asset", value_name = "SYMBOL")]
        assets: Vec<String>,

        /// Log orders instead of submitting them
        #[arg(long)]
        dry_run: bool,
    },

    /// Show account status, cash, buying power and open positions
    Status,

    /// Print the active rule table
    Rules,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            once,
            assets,
            dry_run,
        } => run(cli.config, once, assets, dry_run).await,
        Commands::Status => status().await,
        Commands::Rules => rules(cli.config),
    }
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trendbot=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(config_path: Option<PathBuf>, once: bool, assets: Vec<String>, dry_run: bool) -> Result<()> {
    let mut config = AppConfig::load(config_path.as_deref())?;
    config.bot.dry_run |= dry_run;

    tracing::info!("🚀 trendbot starting");
    tracing::info!("  Broker: {}", config.alpaca.api_base_url);
    tracing::info!("  Cycle: every {}s", config.bot.cycle_interval_secs);
    tracing::info!("  Trade log: {}", config.bot.trade_log_path.display());
    if config.bot.dry_run {
        tracing::info!("  🧪 Dry run: orders will be logged, not submitted");
    }

    let provider: Arc<dyn MarketDataProvider> = Arc::new(AlpacaClient::new(&config.alpaca)?);
    let trade_log = Arc::new(CsvTradeLog::new(&config.bot.trade_log_path));

    let mut trader = Trader::new(provider, trade_log, &config.bot);
    trader.retain_symbols(&assets);
    if trader.assets().is_empty() {
        return Err(format!("No configured asset matches {:?}", assets).into());
    }
    for asset in trader.assets() {
        tracing::info!("    - {} ({}, {})", asset.symbol, asset.strategy_tag, asset.rule.name());
    }

    if once {
        trader.run_cycle().await;
        return Ok(());
    }

    tracing::info!("\nPress Ctrl+C to stop...\n");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("\n⚠️  Received Ctrl+C, shutting down...");
        }
        _ = trader.run(Duration::from_secs(config.bot.cycle_interval_secs)) => {}
    }

    tracing::info!("👋 trendbot stopped");
    Ok(())
}

async fn status() -> Result<()> {
    let alpaca = AlpacaConfig::from_env()?;
    let client = AlpacaClient::new(&alpaca)?;

    let account = client.get_account().await?;
    tracing::info!("🏦 Account status: {}", account.status);
    tracing::info!("  Cash: ${}", account.cash);
    tracing::info!("  Buying power: ${}", account.buying_power);

    let positions = client.list_positions().await?;
    if positions.is_empty() {
        tracing::info!("  No open positions");
    }
    for position in &positions {
        tracing::info!("    - {} {}", position.qty, position.symbol);
    }

    Ok(())
}

fn rules(config_path: Option<PathBuf>) -> Result<()> {
    let settings = BotSettings::load(config_path.as_deref())?;
    for (i, asset) in settings.assets.iter().enumerate() {
        println!(
            "{}. {:<10} {:<20} {:<18} min ${} allocation {} rule {}",
            i + 1,
            asset.symbol,
            asset.strategy_tag,
            asset.rule.name(),
            asset.min_notional,
            serde_json::to_string(&asset.allocation)?,
            serde_json::to_string(&asset.rule)?
        );
    }

    Ok(())
}
