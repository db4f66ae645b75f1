use serde::{Deserialize, Serialize};

use super::{Evaluation, SignalError, Strategy};
use crate::indicators::{calculate_ema, calculate_ema_series, calculate_rsi, closes, latest, previous};
use crate::models::{Bar, Signal};

/// Threshold rule evaluated against the latest bar
///
/// Each variant checks its buy and sell conditions in a fixed order and
/// falls through to `Hold`. The order is part of the rule: when both could
/// fire, the first checked wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rule {
    MeanReversion(MeanReversion),
    TrendAlignment(TrendAlignment),
    OversoldCrossover(OversoldCrossover),
    CandleStreak(CandleStreak),
}

/// Fast/slow EMA cross filtered by RSI
///
/// Buy: fast > slow and RSI below `rsi_buy_below`.
/// Sell: fast < slow and RSI above `rsi_sell_above`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MeanReversion {
    pub fast_period: usize,
    pub slow_period: usize,
    pub rsi_period: usize,
    pub rsi_buy_below: f64,
    pub rsi_sell_above: f64,
}

impl Default for MeanReversion {
    fn default() -> Self {
        Self {
            fast_period: 9,
            slow_period: 21,
            rsi_period: 14,
            rsi_buy_below: 40.0,
            rsi_sell_above: 70.0,
        }
    }
}

impl MeanReversion {
    pub fn buy_condition(&self, fast: f64, slow: f64, rsi: f64) -> bool {
        fast > slow && rsi < self.rsi_buy_below
    }

    pub fn sell_condition(&self, fast: f64, slow: f64, rsi: f64) -> bool {
        fast < slow && rsi > self.rsi_sell_above
    }

    pub fn decide(&self, fast: f64, slow: f64, rsi: f64) -> Signal {
        if self.buy_condition(fast, slow, rsi) {
            Signal::Buy
        } else if self.sell_condition(fast, slow, rsi) {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}

/// Three stacked EMAs
///
/// Buy: fast > mid > slow. Sell: fast < mid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrendAlignment {
    pub fast_period: usize,
    pub mid_period: usize,
    pub slow_period: usize,
}

impl Default for TrendAlignment {
    fn default() -> Self {
        Self {
            fast_period: 9,
            mid_period: 21,
            slow_period: 50,
        }
    }
}

impl TrendAlignment {
    pub fn buy_condition(&self, fast: f64, mid: f64, slow: f64) -> bool {
        fast > mid && mid > slow
    }

    pub fn sell_condition(&self, fast: f64, mid: f64, _slow: f64) -> bool {
        fast < mid
    }

    pub fn decide(&self, fast: f64, mid: f64, slow: f64) -> Signal {
        if self.buy_condition(fast, mid, slow) {
            Signal::Buy
        } else if self.sell_condition(fast, mid, slow) {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}

/// Bullish EMA cross while oversold; exits on either a bearish cross or
/// overbought RSI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OversoldCrossover {
    pub fast_period: usize,
    pub slow_period: usize,
    pub rsi_period: usize,
    pub rsi_buy_below: f64,
    pub rsi_sell_above: f64,
}

impl Default for OversoldCrossover {
    fn default() -> Self {
        Self {
            fast_period: 5,
            slow_period: 20,
            rsi_period: 14,
            rsi_buy_below: 35.0,
            rsi_sell_above: 70.0,
        }
    }
}

impl OversoldCrossover {
    pub fn buy_condition(&self, fast: f64, slow: f64, rsi: f64) -> bool {
        fast > slow && rsi < self.rsi_buy_below
    }

    pub fn sell_condition(&self, fast: f64, slow: f64, rsi: f64) -> bool {
        fast < slow || rsi > self.rsi_sell_above
    }

    pub fn decide(&self, fast: f64, slow: f64, rsi: f64) -> Signal {
        if self.buy_condition(fast, slow, rsi) {
            Signal::Buy
        } else if self.sell_condition(fast, slow, rsi) {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}

/// Which side a candle-streak rule checks first, and what counts as an exit
/// candle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StreakOrder {
    /// Buy checked first; exit needs a red latest candle (close < open)
    EntryFirst,
    /// Sell checked first; exit on any latest candle that is not green
    ExitFirst,
}

/// Run of green candles with a rising EMA
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CandleStreak {
    pub ema_period: usize,
    pub streak_len: usize,
    pub order: StreakOrder,
}

impl Default for CandleStreak {
    fn default() -> Self {
        Self {
            ema_period: 9,
            streak_len: 3,
            order: StreakOrder::EntryFirst,
        }
    }
}

impl CandleStreak {
    pub fn exit_first() -> Self {
        Self {
            order: StreakOrder::ExitFirst,
            ..Self::default()
        }
    }

    /// `streak` holds the most recent `streak_len` bars, oldest first
    pub fn buy_condition(&self, streak: &[Bar], ema_now: f64, ema_prev: f64) -> bool {
        !streak.is_empty() && streak.iter().all(Bar::is_green) && ema_now > ema_prev
    }

    pub fn sell_condition(&self, streak: &[Bar], ema_now: f64, ema_prev: f64) -> bool {
        let exit_candle = match (streak.last(), self.order) {
            (Some(bar), StreakOrder::EntryFirst) => bar.is_red(),
            (Some(bar), StreakOrder::ExitFirst) => !bar.is_green(),
            (None, _) => false,
        };
        exit_candle || ema_now < ema_prev
    }

    pub fn decide(&self, streak: &[Bar], ema_now: f64, ema_prev: f64) -> Signal {
        let buy = || self.buy_condition(streak, ema_now, ema_prev);
        let sell = || self.sell_condition(streak, ema_now, ema_prev);

        match self.order {
            StreakOrder::EntryFirst if buy() => Signal::Buy,
            StreakOrder::EntryFirst if sell() => Signal::Sell,
            StreakOrder::ExitFirst if sell() => Signal::Sell,
            StreakOrder::ExitFirst if buy() => Signal::Buy,
            _ => Signal::Hold,
        }
    }
}

fn ema_label(period: usize) -> String {
    format!("EMA{}", period)
}

fn require(value: Option<f64>, label: String) -> Result<f64, SignalError> {
    value.ok_or(SignalError::IndicatorUnavailable { indicator: label })
}

fn latest_ema(prices: &[f64], period: usize) -> Result<f64, SignalError> {
    require(calculate_ema(prices, period), ema_label(period))
}

fn latest_rsi(prices: &[f64], period: usize) -> Result<f64, SignalError> {
    require(calculate_rsi(prices, period), format!("RSI{}", period))
}

impl Rule {
    fn evaluate_bars(&self, bars: &[Bar]) -> Result<Evaluation, SignalError> {
        let prices = closes(bars);

        match self {
            Rule::MeanReversion(rule) => {
                let fast = latest_ema(&prices, rule.fast_period)?;
                let slow = latest_ema(&prices, rule.slow_period)?;
                let rsi = latest_rsi(&prices, rule.rsi_period)?;

                let signal = rule.decide(fast, slow, rsi);
                let reason = match signal {
                    Signal::Buy => format!(
                        "EMA{} above EMA{} and RSI {:.2} under {}",
                        rule.fast_period, rule.slow_period, rsi, rule.rsi_buy_below
                    ),
                    Signal::Sell => format!(
                        "EMA{} below EMA{} and RSI {:.2} over {}",
                        rule.fast_period, rule.slow_period, rsi, rule.rsi_sell_above
                    ),
                    Signal::Hold => "No entry or exit conditions met".to_string(),
                };

                Ok(Evaluation::new(signal, reason)
                    .reading(ema_label(rule.fast_period), fast)
                    .reading(ema_label(rule.slow_period), slow)
                    .reading(format!("RSI{}", rule.rsi_period), rsi))
            }

            Rule::TrendAlignment(rule) => {
                let fast = latest_ema(&prices, rule.fast_period)?;
                let mid = latest_ema(&prices, rule.mid_period)?;
                let slow = latest_ema(&prices, rule.slow_period)?;

                let signal = rule.decide(fast, mid, slow);
                let reason = match signal {
                    Signal::Buy => format!(
                        "EMA{} > EMA{} > EMA{}, strong uptrend",
                        rule.fast_period, rule.mid_period, rule.slow_period
                    ),
                    Signal::Sell => format!(
                        "EMA{} dropped below EMA{}, trend may be reversing",
                        rule.fast_period, rule.mid_period
                    ),
                    Signal::Hold => "EMA alignment not strong enough to buy or weak enough to sell"
                        .to_string(),
                };

                Ok(Evaluation::new(signal, reason)
                    .reading(ema_label(rule.fast_period), fast)
                    .reading(ema_label(rule.mid_period), mid)
                    .reading(ema_label(rule.slow_period), slow))
            }

            Rule::OversoldCrossover(rule) => {
                let fast = latest_ema(&prices, rule.fast_period)?;
                let slow = latest_ema(&prices, rule.slow_period)?;
                let rsi = latest_rsi(&prices, rule.rsi_period)?;

                let signal = rule.decide(fast, slow, rsi);
                let reason = match signal {
                    Signal::Buy => format!(
                        "EMA{} > EMA{} and RSI {:.2} < {} (oversold with bullish crossover)",
                        rule.fast_period, rule.slow_period, rsi, rule.rsi_buy_below
                    ),
                    Signal::Sell => format!(
                        "EMA{} < EMA{} or RSI {:.2} > {} (bearish crossover or overbought)",
                        rule.fast_period, rule.slow_period, rsi, rule.rsi_sell_above
                    ),
                    Signal::Hold => "Waiting for crossover or reversal".to_string(),
                };

                Ok(Evaluation::new(signal, reason)
                    .reading(ema_label(rule.fast_period), fast)
                    .reading(ema_label(rule.slow_period), slow)
                    .reading(format!("RSI{}", rule.rsi_period), rsi))
            }

            Rule::CandleStreak(rule) => {
                let series = calculate_ema_series(&prices, rule.ema_period);
                let label = ema_label(rule.ema_period);
                let ema_now = require(latest(&series), label.clone())?;
                let ema_prev = require(previous(&series), format!("previous {}", label))?;
                let streak = &bars[bars.len() - rule.streak_len..];

                let signal = rule.decide(streak, ema_now, ema_prev);
                let reason = match signal {
                    Signal::Buy => format!(
                        "{} green candles and {} rising (momentum confirmed)",
                        rule.streak_len, label
                    ),
                    Signal::Sell => format!(
                        "Exit candle or {} turning downward (momentum fading)",
                        label
                    ),
                    Signal::Hold => "Waiting for momentum or trend confirmation".to_string(),
                };

                Ok(Evaluation::new(signal, reason)
                    .reading(label.clone(), ema_now)
                    .reading(format!("previous {}", label), ema_prev))
            }
        }
    }
}

impl Strategy for Rule {
    fn name(&self) -> &str {
        match self {
            Rule::MeanReversion(_) => "mean_reversion",
            Rule::TrendAlignment(_) => "trend_alignment",
            Rule::OversoldCrossover(_) => "oversold_crossover",
            Rule::CandleStreak(_) => "candle_streak",
        }
    }

    fn min_bars_required(&self) -> usize {
        match self {
            Rule::MeanReversion(r) => r.fast_period.max(r.slow_period).max(r.rsi_period + 1),
            Rule::TrendAlignment(r) => r.fast_period.max(r.mid_period).max(r.slow_period),
            Rule::OversoldCrossover(r) => r.fast_period.max(r.slow_period).max(r.rsi_period + 1),
            Rule::CandleStreak(r) => r.streak_len.max(r.ema_period + 1),
        }
    }

    fn evaluate(&self, bars: &[Bar]) -> Result<Evaluation, SignalError> {
        let needed = self.min_bars_required();
        if bars.len() < needed {
            return Err(SignalError::InsufficientData {
                got: bars.len(),
                needed,
            });
        }

        self.evaluate_bars(bars)
    }
}
