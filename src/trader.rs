// Trading cycle: fetch, resample, evaluate and execute each asset in turn
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::time::{interval, MissedTickBehavior};

use crate::api::MarketDataProvider;
use crate::config::BotSettings;
use crate::execution::{ExecutionOutcome, Executor, TradeLog};
use crate::market::BarResampler;
use crate::models::{normalize_symbol, Timeframe};
use crate::strategy::{AssetConfig, Evaluation, SignalError, Strategy};

/// Reasons an asset's evaluation is abandoned for the current cycle
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("Failed to fetch bars: {0:#}")]
    MarketData(anyhow::Error),

    #[error(transparent)]
    Signal(#[from] SignalError),
}

/// Rule result for one asset at the latest bar
#[derive(Debug, Clone)]
pub struct AssetSignal {
    pub price: f64,
    pub bars: usize,
    pub evaluation: Evaluation,
}

#[derive(Debug, Clone)]
pub enum AssetOutcome {
    Executed {
        signal: AssetSignal,
        execution: ExecutionOutcome,
    },
    Aborted {
        error: String,
    },
}

/// Per-asset line of a cycle report
#[derive(Debug, Clone)]
pub struct AssetReport {
    pub symbol: String,
    pub strategy_tag: String,
    pub outcome: AssetOutcome,
}

impl AssetReport {
    pub fn execution(&self) -> Option<&ExecutionOutcome> {
        match &self.outcome {
            AssetOutcome::Executed { execution, .. } => Some(execution),
            AssetOutcome::Aborted { .. } => None,
        }
    }
}

pub struct Trader {
    provider: Arc<dyn MarketDataProvider>,
    executor: Executor,
    resampler: BarResampler,
    assets: Vec<AssetConfig>,
    bar_limit: usize,
}

impl Trader {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        trade_log: Arc<dyn TradeLog>,
        settings: &BotSettings,
    ) -> Self {
        Self {
            executor: Executor::new(provider.clone(), trade_log).with_dry_run(settings.dry_run),
            provider,
            resampler: BarResampler::with_minutes(settings.resample_minutes),
            assets: settings.assets.clone(),
            bar_limit: settings.bar_limit,
        }
    }

    /// Keep only assets whose symbol is in `symbols` (separator and case ignored)
    pub fn retain_symbols(&mut self, symbols: &[String]) {
        if symbols.is_empty() {
            return;
        }
        let wanted: Vec<String> = symbols.iter().map(|s| normalize_symbol(s)).collect();
        self.assets
            .retain(|asset| wanted.contains(&normalize_symbol(&asset.symbol)));
    }

    pub fn assets(&self) -> &[AssetConfig] {
        &self.assets
    }

    /// Fetch 1-minute bars, resample, and run the asset's rule on the result
    pub async fn evaluate_asset(&self, asset: &AssetConfig) -> Result<AssetSignal, EvaluationError> {
        let source = self
            .provider
            .get_bars(&asset.symbol, Timeframe::Minute, self.bar_limit)
            .await
            .map_err(EvaluationError::MarketData)?;

        let bars = self.resampler.resample(&source);
        let Some(latest) = bars.last() else {
            return Err(SignalError::InsufficientData {
                got: 0,
                needed: asset.rule.min_bars_required(),
            }
            .into());
        };

        let evaluation = asset.rule.evaluate(&bars)?;

        Ok(AssetSignal {
            price: latest.close,
            bars: bars.len(),
            evaluation,
        })
    }

    /// Evaluate and execute one asset; every failure ends up in the report
    pub async fn run_asset(&self, asset: &AssetConfig) -> AssetReport {
        let outcome = match self.evaluate_asset(asset).await {
            Ok(signal) => {
                tracing::info!(
                    "📊 {} [{}] @ ${:.6} ({} bars): {}",
                    asset.symbol,
                    asset.strategy_tag,
                    signal.price,
                    signal.bars,
                    signal.evaluation
                );
                let execution = self
                    .executor
                    .execute(signal.evaluation.signal, asset, signal.price)
                    .await;
                AssetOutcome::Executed { signal, execution }
            }
            Err(e) => {
                tracing::error!("✗ {} [{}] evaluation aborted: {}", asset.symbol, asset.strategy_tag, e);
                AssetOutcome::Aborted {
                    error: e.to_string(),
                }
            }
        };

        AssetReport {
            symbol: asset.symbol.clone(),
            strategy_tag: asset.strategy_tag.clone(),
            outcome,
        }
    }

    /// One pass over the rule table, in order
    pub async fn run_cycle(&self) -> Vec<AssetReport> {
        tracing::info!("💹 [TRADING] Cycle at {}", Utc::now().format("%H:%M:%S"));

        let mut reports = Vec::with_capacity(self.assets.len());
        for asset in &self.assets {
            reports.push(self.run_asset(asset).await);
        }

        let orders = reports
            .iter()
            .filter(|r| r.execution().is_some_and(ExecutionOutcome::is_order))
            .count();
        let aborted = reports
            .iter()
            .filter(|r| matches!(r.outcome, AssetOutcome::Aborted { .. }))
            .count();
        tracing::info!(
            "Cycle complete: {} assets, {} orders, {} aborted",
            reports.len(),
            orders,
            aborted
        );

        reports
    }

    /// Run cycles every `period`, first one immediately. Never returns.
    pub async fn run(&self, period: Duration) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            self.run_cycle().await;
        }
    }
}
