use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::rules::{CandleStreak, MeanReversion, OversoldCrossover, Rule, TrendAlignment};
use super::Strategy;
use crate::models::Account;

/// How much to spend on a buy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Allocation {
    /// Fraction of account cash
    CashFraction { fraction: Decimal },
    /// Fraction of buying power
    BuyingPowerFraction { fraction: Decimal },
    /// Fixed dollar amount
    Fixed { amount: Decimal },
}

impl Allocation {
    /// Whether sizing needs an account snapshot
    pub fn needs_account(&self) -> bool {
        !matches!(self, Allocation::Fixed { .. })
    }

    /// Dollar amount to spend, unrounded
    ///
    /// `None` when the allocation depends on an account that was not given.
    pub fn amount(&self, account: Option<&Account>) -> Option<Decimal> {
        match self {
            Allocation::CashFraction { fraction } => Some(account?.cash * *fraction),
            Allocation::BuyingPowerFraction { fraction } => Some(account?.buying_power * *fraction),
            Allocation::Fixed { amount } => Some(*amount),
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Allocation::CashFraction { fraction } | Allocation::BuyingPowerFraction { fraction } => {
                if *fraction <= Decimal::ZERO || *fraction > Decimal::ONE {
                    return Err(format!("allocation fraction {} must be in (0, 1]", fraction));
                }
            }
            Allocation::Fixed { amount } => {
                if *amount <= Decimal::ZERO {
                    return Err(format!("fixed allocation {} must be positive", amount));
                }
            }
        }
        Ok(())
    }
}

fn default_min_notional() -> Decimal {
    dec!(1.00)
}

/// One row of the rule table: which rule trades which symbol, and how big
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetConfig {
    /// Pair symbol as used for market data and orders, e.g. `BTC/USD`
    pub symbol: String,
    /// Tag written to the trade log
    pub strategy_tag: String,
    pub rule: Rule,
    pub allocation: Allocation,
    /// Buys below this notional are skipped
    #[serde(default = "default_min_notional")]
    pub min_notional: Decimal,
}

impl AssetConfig {
    pub fn new(symbol: &str, strategy_tag: &str, rule: Rule, allocation: Allocation) -> Self {
        Self {
            symbol: symbol.to_string(),
            strategy_tag: strategy_tag.to_string(),
            rule,
            allocation,
            min_notional: default_min_notional(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.symbol.trim().is_empty() {
            return Err("asset symbol must not be empty".to_string());
        }
        if self.strategy_tag.trim().is_empty() {
            return Err(format!("{}: strategy_tag must not be empty", self.symbol));
        }
        if self.min_notional < Decimal::ZERO {
            return Err(format!("{}: min_notional must not be negative", self.symbol));
        }

        let periods: Vec<usize> = match &self.rule {
            Rule::MeanReversion(r) => vec![r.fast_period, r.slow_period, r.rsi_period],
            Rule::TrendAlignment(r) => vec![r.fast_period, r.mid_period, r.slow_period],
            Rule::OversoldCrossover(r) => vec![r.fast_period, r.slow_period, r.rsi_period],
            Rule::CandleStreak(r) => vec![r.ema_period, r.streak_len],
        };
        if periods.contains(&0) {
            return Err(format!(
                "{}: {} windows and streak length must be positive",
                self.symbol,
                self.rule.name()
            ));
        }

        self.allocation
            .validate()
            .map_err(|e| format!("{}: {}", self.symbol, e))
    }
}

/// Built-in rule table, in evaluation order
pub fn default_asset_table() -> Vec<AssetConfig> {
    vec![
        AssetConfig::new(
            "BTC/USD",
            "btc_high_risk",
            Rule::MeanReversion(MeanReversion::default()),
            Allocation::CashFraction { fraction: dec!(0.10) },
        ),
        AssetConfig::new(
            "ETH/USD",
            "eth_semi_risky",
            Rule::TrendAlignment(TrendAlignment::default()),
            Allocation::CashFraction { fraction: dec!(0.10) },
        ),
        AssetConfig::new(
            "SHIB/USD",
            "shib_daytrade",
            Rule::OversoldCrossover(OversoldCrossover::default()),
            Allocation::CashFraction { fraction: dec!(0.05) },
        ),
        AssetConfig::new(
            "SOL/USD",
            "sol_daytrade",
            Rule::CandleStreak(CandleStreak::exit_first()),
            Allocation::BuyingPowerFraction { fraction: dec!(0.05) },
        ),
        AssetConfig::new(
            "SOL/USD",
            "sol_momentum_trend",
            Rule::CandleStreak(CandleStreak::default()),
            Allocation::Fixed { amount: dec!(10) },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(cash: Decimal, buying_power: Decimal) -> Account {
        Account {
            status: "ACTIVE".to_string(),
            cash,
            buying_power,
        }
    }

    #[test]
    fn test_default_table_is_valid() {
        let table = default_asset_table();
        assert_eq!(table.len(), 5);
        for asset in &table {
            assert!(asset.validate().is_ok(), "{:?}", asset.validate());
            assert_eq!(asset.min_notional, dec!(1.00));
        }

        let tags: Vec<&str> = table.iter().map(|a| a.strategy_tag.as_str()).collect();
        assert_eq!(
            tags,
            vec![
                "btc_high_risk",
                "eth_semi_risky",
                "shib_daytrade",
                "sol_daytrade",
                "sol_momentum_trend"
            ]
        );
    }

    #[test]
    fn test_allocation_amounts() {
        let acct = account(dec!(1234.567), dec!(2000));

        let cash = Allocation::CashFraction { fraction: dec!(0.10) };
        assert_eq!(cash.amount(Some(&acct)), Some(dec!(123.4567)));

        let bp = Allocation::BuyingPowerFraction { fraction: dec!(0.05) };
        assert_eq!(bp.amount(Some(&acct)), Some(dec!(100)));

        let fixed = Allocation::Fixed { amount: dec!(10) };
        assert_eq!(fixed.amount(None), Some(dec!(10)));
        assert!(!fixed.needs_account());
    }

    #[test]
    fn test_amount_without_account() {
        let cash = Allocation::CashFraction { fraction: dec!(0.10) };
        assert!(cash.needs_account());
        assert_eq!(cash.amount(None), None);
    }

    #[test]
    fn test_validate_rejects_bad_fraction() {
        let mut asset = default_asset_table().remove(0);
        asset.allocation = Allocation::CashFraction { fraction: dec!(1.5) };
        assert!(asset.validate().unwrap_err().contains("(0, 1]"));

        asset.allocation = Allocation::Fixed { amount: dec!(0) };
        assert!(asset.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let mut asset = default_asset_table().remove(1);
        asset.rule = Rule::TrendAlignment(TrendAlignment {
            slow_period: 0,
            ..TrendAlignment::default()
        });
        assert!(asset.validate().unwrap_err().contains("trend_alignment"));
    }

    #[test]
    fn test_asset_config_from_json() {
        let asset: AssetConfig = serde_json::from_str(
            r#"{
                "symbol": "DOGE/USD",
                "strategy_tag": "doge_scalp",
                "rule": {"kind": "oversold_crossover"},
                "allocation": {"kind": "cash_fraction", "fraction": "0.02"}
            }"#,
        )
        .unwrap();

        assert_eq!(asset.min_notional, dec!(1.00));
        assert_eq!(
            asset.allocation,
            Allocation::CashFraction { fraction: dec!(0.02) }
        );
        assert!(asset.validate().is_ok());
    }
}
