// Trading strategy module
pub mod assets;
pub mod rules;

pub use assets::{default_asset_table, Allocation, AssetConfig};
pub use rules::{CandleStreak, MeanReversion, OversoldCrossover, Rule, StreakOrder, TrendAlignment};

use std::fmt;

use thiserror::Error;

use crate::models::{Bar, Signal};

/// Reasons a rule cannot produce a signal from the data it was given
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SignalError {
    #[error("Insufficient data: {got} bars, need {needed}")]
    InsufficientData { got: usize, needed: usize },

    #[error("{indicator} is undefined at the latest bar")]
    IndicatorUnavailable { indicator: String },
}

/// Outcome of evaluating a rule against the latest bars
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub signal: Signal,
    pub reason: String,
    /// Indicator values at the latest bar, for reporting
    pub readings: Vec<(String, f64)>,
}

impl Evaluation {
    pub fn new(signal: Signal, reason: impl Into<String>) -> Self {
        Self {
            signal,
            reason: reason.into(),
            readings: Vec::new(),
        }
    }

    pub fn reading(mut self, label: impl Into<String>, value: f64) -> Self {
        self.readings.push((label.into(), value));
        self
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let readings: Vec<String> = self
            .readings
            .iter()
            .map(|(label, value)| format!("{}={:.4}", label, value))
            .collect();
        write!(f, "{:?} [{}] {}", self.signal, readings.join(" "), self.reason)
    }
}

/// Base trait for all trading strategies
pub trait Strategy: Send + Sync {
    /// Get strategy name
    fn name(&self) -> &str;

    /// Minimum bars required before the latest indicator values are defined
    fn min_bars_required(&self) -> usize;

    /// Evaluate the rule against bars (oldest first)
    fn evaluate(&self, bars: &[Bar]) -> Result<Evaluation, SignalError>;

    /// Generate a trading signal based on market data
    fn generate_signal(&self, bars: &[Bar]) -> Result<Signal, SignalError> {
        self.evaluate(bars).map(|e| e.signal)
    }
}
