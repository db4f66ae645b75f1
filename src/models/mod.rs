use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// OHLCV bar for one interval
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Close above open
    pub fn is_green(&self) -> bool {
        self.close > self.open
    }

    /// Close below open
    pub fn is_red(&self) -> bool {
        self.close < self.open
    }
}

/// Bar granularity requested from the data provider. Wider bars are
/// built locally by the resampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    Minute,
}

impl Timeframe {
    pub fn minutes(&self) -> i64 {
        match self {
            Timeframe::Minute => 1,
        }
    }

    /// Alpaca's wire form
    pub fn as_query(&self) -> &'static str {
        match self {
            Timeframe::Minute => "1Min",
        }
    }
}

/// Account snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub status: String,
    pub cash: Decimal,
    pub buying_power: Decimal,
}

/// Open position as reported by the broker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub qty: Decimal,
}

impl Position {
    /// Broker position symbols drop the pair separator (`BTCUSD` for `BTC/USD`)
    pub fn matches(&self, symbol: &str) -> bool {
        normalize_symbol(&self.symbol) == normalize_symbol(symbol)
    }

    /// A non-positive quantity is treated as no holding
    pub fn is_open(&self) -> bool {
        self.qty > Decimal::ZERO
    }
}

pub fn normalize_symbol(symbol: &str) -> String {
    symbol
        .chars()
        .filter(|c| *c != '/')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Trading signal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

/// Dollar amount or unit quantity
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderSize {
    Notional(Decimal),
    Quantity(Decimal),
}

impl OrderSize {
    pub fn amount(&self) -> Decimal {
        match self {
            OrderSize::Notional(v) | OrderSize::Quantity(v) => *v,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    Gtc,
}

/// Market order to submit
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub client_order_id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    pub size: OrderSize,
    pub time_in_force: TimeInForce,
}

impl OrderRequest {
    pub fn market_buy(symbol: &str, notional: Decimal) -> Self {
        Self {
            client_order_id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            side: OrderSide::Buy,
            size: OrderSize::Notional(notional),
            time_in_force: TimeInForce::Gtc,
        }
    }

    pub fn market_sell(symbol: &str, qty: Decimal) -> Self {
        Self {
            client_order_id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            side: OrderSide::Sell,
            size: OrderSize::Quantity(qty),
            time_in_force: TimeInForce::Gtc,
        }
    }
}

/// Broker acknowledgement of a submitted order. Never polled afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderAck {
    pub id: String,
    pub status: String,
}

/// One row of the trade log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeLogEntry {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub side: OrderSide,
    pub strategy: String,
    pub price: f64,
    pub amount: Decimal,
    pub outcome: String,
}

impl TradeLogEntry {
    pub fn pending(symbol: &str, side: OrderSide, strategy: &str, price: f64, amount: Decimal) -> Self {
        Self {
            timestamp: Utc::now(),
            symbol: symbol.to_string(),
            side,
            strategy: strategy.to_string(),
            price,
            amount,
            outcome: "pending".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bar(open: f64, close: f64) -> Bar {
        Bar {
            timestamp: Utc::now(),
            open,
            high: open.max(close),
            low: open.min(close),
            close,
            volume: 1.0,
        }
    }

    #[test]
    fn test_candle_colour() {
        assert!(bar(100.0, 101.0).is_green());
        assert!(bar(101.0, 100.0).is_red());

        let doji = bar(100.0, 100.0);
        assert!(!doji.is_green());
        assert!(!doji.is_red());
    }

    #[test]
    fn test_position_matches_pair_and_compact_symbols() {
        let position = Position {
            symbol: "BTCUSD".to_string(),
            qty: dec!(0.5),
        };

        assert!(position.matches("BTC/USD"));
        assert!(position.matches("btc/usd"));
        assert!(!position.matches("ETH/USD"));
    }

    #[test]
    fn test_timeframe_query() {
        assert_eq!(Timeframe::Minute.as_query(), "1Min");
        assert_eq!(Timeframe::Minute.minutes(), 1);
    }

    #[test]
    fn test_order_constructors() {
        let buy = OrderRequest::market_buy("SOL/USD", dec!(10));
        assert_eq!(buy.side, OrderSide::Buy);
        assert_eq!(buy.size, OrderSize::Notional(dec!(10)));
        assert_eq!(buy.time_in_force, TimeInForce::Gtc);

        let sell = OrderRequest::market_sell("SOL/USD", dec!(1.25));
        assert_eq!(sell.side, OrderSide::Sell);
        assert_eq!(sell.size.amount(), dec!(1.25));
        assert_ne!(buy.client_order_id, sell.client_order_id);
    }
}
