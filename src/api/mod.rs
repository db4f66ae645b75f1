pub mod alpaca;

pub use alpaca::AlpacaClient;

use async_trait::async_trait;

use crate::models::{Account, Bar, OrderAck, OrderRequest, Position, Timeframe};

/// Brokerage seam: market data, account state and order entry
///
/// Calls are made one at a time by the trading cycle. Orders are
/// fire-and-forget; nothing polls their status.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn get_account(&self) -> anyhow::Result<Account>;

    /// Up to `limit` most recent bars, oldest first
    async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> anyhow::Result<Vec<Bar>>;

    async fn list_positions(&self) -> anyhow::Result<Vec<Position>>;

    async fn submit_order(&self, order: &OrderRequest) -> anyhow::Result<OrderAck>;
}
