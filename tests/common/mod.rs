// Shared fixtures for integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use trendbot::api::MarketDataProvider;
use trendbot::config::BotSettings;
use trendbot::execution::{TradeLog, TradeLogError};
use trendbot::models::{Account, Bar, OrderAck, OrderRequest, Position, Timeframe, TradeLogEntry};
use trendbot::strategy::AssetConfig;

/// 22:15:00 UTC, on a 15-minute boundary
pub const BASE_TS: i64 = 1_700_000_100;

/// In-memory broker: canned bars per symbol, records every order
pub struct FakeBroker {
    pub account: Account,
    pub positions: Vec<Position>,
    pub bars: HashMap<String, Vec<Bar>>,
    pub orders: Mutex<Vec<OrderRequest>>,
    pub bar_requests: Mutex<Vec<(String, usize)>>,
    pub account_calls: Mutex<usize>,
}

impl FakeBroker {
    pub fn new(cash: Decimal, buying_power: Decimal) -> Self {
        Self {
            account: Account {
                status: "ACTIVE".to_string(),
                cash,
                buying_power,
            },
            positions: Vec::new(),
            bars: HashMap::new(),
            orders: Mutex::new(Vec::new()),
            bar_requests: Mutex::new(Vec::new()),
            account_calls: Mutex::new(0),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.bars.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_position(mut self, symbol: &str, qty: Decimal) -> Self {
        self.positions.push(Position {
            symbol: symbol.to_string(),
            qty,
        });
        self
    }

    pub fn orders(&self) -> Vec<OrderRequest> {
        self.orders.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketDataProvider for FakeBroker {
    async fn get_account(&self) -> anyhow::Result<Account> {
        *self.account_calls.lock().unwrap() += 1;
        Ok(self.account.clone())
    }

    async fn get_bars(&self, symbol: &str, _timeframe: Timeframe, limit: usize) -> anyhow::Result<Vec<Bar>> {
        self.bar_requests
            .lock()
            .unwrap()
            .push((symbol.to_string(), limit));

        let Some(bars) = self.bars.get(symbol) else {
            anyhow::bail!("Alpaca API error (404 Not Found): unknown symbol {}", symbol);
        };
        let start = bars.len().saturating_sub(limit);
        Ok(bars[start..].to_vec())
    }

    async fn list_positions(&self) -> anyhow::Result<Vec<Position>> {
        Ok(self.positions.clone())
    }

    async fn submit_order(&self, order: &OrderRequest) -> anyhow::Result<OrderAck> {
        let mut orders = self.orders.lock().unwrap();
        orders.push(order.clone());
        Ok(OrderAck {
            id: format!("fake-{}", orders.len()),
            status: "accepted".to_string(),
        })
    }
}

#[derive(Default)]
pub struct MemoryTradeLog {
    pub entries: Mutex<Vec<TradeLogEntry>>,
}

impl MemoryTradeLog {
    pub fn entries(&self) -> Vec<TradeLogEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl TradeLog for MemoryTradeLog {
    fn append(&self, entry: &TradeLogEntry) -> Result<(), TradeLogError> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

fn ts(index: usize, minutes: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(BASE_TS, 0).unwrap() + Duration::minutes(minutes * index as i64)
}

/// 15-minute bars from (open, close) pairs
pub fn candles(pairs: &[(f64, f64)]) -> Vec<Bar> {
    pairs
        .iter()
        .enumerate()
        .map(|(i, (open, close))| Bar {
            timestamp: ts(i, 15),
            open: *open,
            high: open.max(*close) + 0.1,
            low: open.min(*close) - 0.1,
            close: *close,
            volume: 10.0,
        })
        .collect()
}

/// Steady climb of green candles
pub fn rising_green(count: usize) -> Vec<Bar> {
    let pairs: Vec<(f64, f64)> = (0..count)
        .map(|i| {
            let close = 100.0 + i as f64;
            (close - 0.5, close)
        })
        .collect();
    candles(&pairs)
}

/// Steady slide of red candles
pub fn falling_red(count: usize) -> Vec<Bar> {
    let pairs: Vec<(f64, f64)> = (0..count)
        .map(|i| {
            let close = 200.0 - i as f64;
            (close + 0.5, close)
        })
        .collect();
    candles(&pairs)
}

pub fn settings(assets: Vec<AssetConfig>, trade_log_path: PathBuf) -> BotSettings {
    BotSettings {
        cycle_interval_secs: 900,
        trade_log_path,
        bar_limit: 1000,
        resample_minutes: 15,
        dry_run: false,
        assets,
    }
}
