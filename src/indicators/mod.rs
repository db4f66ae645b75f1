// Technical indicators module
// EMA and RSI over close-price series, oldest first

pub mod moving_average;
pub mod rsi;

pub use moving_average::{calculate_ema, calculate_ema_series};
pub use rsi::{calculate_rsi, calculate_rsi_series};

/// Closing prices of a bar series, oldest first
pub fn closes(bars: &[crate::models::Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Last value of an aligned indicator series, if defined
pub fn latest(series: &[Option<f64>]) -> Option<f64> {
    series.last().copied().flatten()
}

/// Value one step before the last, if defined
pub fn previous(series: &[Option<f64>]) -> Option<f64> {
    if series.len() < 2 {
        return None;
    }
    series[series.len() - 2]
}
