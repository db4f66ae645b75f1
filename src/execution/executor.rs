use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::api::MarketDataProvider;
use crate::execution::TradeLog;
use crate::models::{Account, OrderRequest, OrderSide, Position, Signal, TradeLogEntry};
use crate::strategy::AssetConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionAction {
    Buy { notional: Decimal },
    Sell { qty: Decimal },
    Skip,
}

#[derive(Debug, Clone)]
pub struct ExecutionDecision {
    pub action: ExecutionAction,
    pub reason: String,
}

impl ExecutionDecision {
    fn skip(reason: impl Into<String>) -> Self {
        Self {
            action: ExecutionAction::Skip,
            reason: reason.into(),
        }
    }
}

/// What happened to a signal once it reached the broker boundary
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Submitted {
        order_id: String,
        side: OrderSide,
        amount: Decimal,
    },
    /// Order built but not sent
    DryRun { side: OrderSide, amount: Decimal },
    Skipped { reason: String },
    Failed { error: String },
}

impl ExecutionOutcome {
    pub fn is_order(&self) -> bool {
        matches!(
            self,
            ExecutionOutcome::Submitted { .. } | ExecutionOutcome::DryRun { .. }
        )
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionOutcome::Submitted {
                order_id,
                side,
                amount,
            } => write!(f, "submitted {} {} (order {})", side.as_str(), amount, order_id),
            ExecutionOutcome::DryRun { side, amount } => {
                write!(f, "dry run {} {}", side.as_str(), amount)
            }
            ExecutionOutcome::Skipped { reason } => write!(f, "skipped: {}", reason),
            ExecutionOutcome::Failed { error } => write!(f, "failed: {}", error),
        }
    }
}

/// Turns signals into at most one market order per asset per cycle
pub struct Executor {
    provider: Arc<dyn MarketDataProvider>,
    trade_log: Arc<dyn TradeLog>,
    dry_run: bool,
}

impl Executor {
    pub fn new(provider: Arc<dyn MarketDataProvider>, trade_log: Arc<dyn TradeLog>) -> Self {
        Self {
            provider,
            trade_log,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Decide what to do with a signal given the current holding and account
    pub fn process_signal(
        &self,
        signal: Signal,
        asset: &AssetConfig,
        holding: Option<&Position>,
        account: Option<&Account>,
    ) -> ExecutionDecision {
        let holding = holding.filter(|p| p.is_open());

        match signal {
            Signal::Buy => {
                // Check 1: Do we already hold this symbol?
                if let Some(position) = holding {
                    return ExecutionDecision::skip(format!(
                        "Already have open position ({} {})",
                        position.qty, position.symbol
                    ));
                }

                // Check 2: Size the order from the allocation
                let Some(amount) = asset.allocation.amount(account) else {
                    return ExecutionDecision::skip("Account unavailable for sizing");
                };

                // Check 3: Broker minimum, on the unrounded amount
                if amount < asset.min_notional {
                    return ExecutionDecision::skip(format!(
                        "Notional ${} below minimum ${}",
                        amount.round_dp(4),
                        asset.min_notional
                    ));
                }

                let notional = amount.round_dp(2);

                ExecutionDecision {
                    action: ExecutionAction::Buy { notional },
                    reason: format!("Buy signal, ${} notional", notional),
                }
            }

            Signal::Sell => match holding {
                Some(position) => ExecutionDecision {
                    action: ExecutionAction::Sell { qty: position.qty },
                    reason: format!("Sell signal, closing {} {}", position.qty, asset.symbol),
                },
                None => ExecutionDecision::skip("No position to sell"),
            },

            Signal::Hold => ExecutionDecision::skip("Hold signal"),
        }
    }

    /// Look up positions (and the account when sizing needs it), decide,
    /// then submit and log. Errors are reported in the outcome, never raised.
    pub async fn execute(&self, signal: Signal, asset: &AssetConfig, price: f64) -> ExecutionOutcome {
        if signal == Signal::Hold {
            return ExecutionOutcome::Skipped {
                reason: "Hold signal".to_string(),
            };
        }

        let positions = match self.provider.list_positions().await {
            Ok(positions) => positions,
            Err(e) => return Self::failed(asset, "Position lookup failed", e),
        };
        let holding = positions
            .iter()
            .find(|p| p.matches(&asset.symbol) && p.is_open());

        let account = if signal == Signal::Buy && holding.is_none() && asset.allocation.needs_account() {
            match self.provider.get_account().await {
                Ok(account) => Some(account),
                Err(e) => return Self::failed(asset, "Account lookup failed", e),
            }
        } else {
            None
        };

        let decision = self.process_signal(signal, asset, holding, account.as_ref());

        let order = match decision.action {
            ExecutionAction::Buy { notional } => OrderRequest::market_buy(&asset.symbol, notional),
            ExecutionAction::Sell { qty } => OrderRequest::market_sell(&asset.symbol, qty),
            ExecutionAction::Skip => {
                tracing::info!("⏭️  {} [{}]: {}", asset.symbol, asset.strategy_tag, decision.reason);
                return ExecutionOutcome::Skipped {
                    reason: decision.reason,
                };
            }
        };
        let amount = order.size.amount();

        if self.dry_run {
            tracing::info!(
                "🧪 DRY RUN {} {} {} @ ${:.6} [{}]",
                order.side.as_str().to_uppercase(),
                amount,
                asset.symbol,
                price,
                asset.strategy_tag
            );
            return ExecutionOutcome::DryRun {
                side: order.side,
                amount,
            };
        }

        let ack = match self.provider.submit_order(&order).await {
            Ok(ack) => ack,
            Err(e) => return Self::failed(asset, "Order submission failed", e),
        };

        tracing::info!(
            "✅ {} {} {} @ ${:.6} [{}] order {} ({})",
            order.side.as_str().to_uppercase(),
            amount,
            asset.symbol,
            price,
            asset.strategy_tag,
            ack.id,
            ack.status
        );

        let entry = TradeLogEntry::pending(&asset.symbol, order.side, &asset.strategy_tag, price, amount);
        if let Err(e) = self.trade_log.append(&entry) {
            tracing::warn!("⚠️  Failed to record {} trade: {}", asset.symbol, e);
        }

        ExecutionOutcome::Submitted {
            order_id: ack.id,
            side: order.side,
            amount,
        }
    }

    fn failed(asset: &AssetConfig, context: &str, error: anyhow::Error) -> ExecutionOutcome {
        tracing::warn!("❌ {} [{}]: {}: {:#}", asset.symbol, asset.strategy_tag, context, error);
        ExecutionOutcome::Failed {
            error: format!("{}: {:#}", context, error),
        }
    }
}
