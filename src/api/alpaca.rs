use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use governor::{Quota, RateLimiter};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;

use super::MarketDataProvider;
use crate::config::AlpacaConfig;
use crate::models::{
    Account, Bar, OrderAck, OrderRequest, OrderSide, OrderSize, Position, TimeInForce, Timeframe,
};

const RATE_LIMIT_RPM: u32 = 200; // Alpaca trading API: 200 requests per minute
const REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_BARS_PER_PAGE: usize = 10_000;

type AlpacaRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Alpaca REST client (trading API + crypto market data)
///
/// Cloneable; clones share the HTTP connection pool and rate limiter.
#[derive(Clone)]
pub struct AlpacaClient {
    client: Client,
    api_base_url: String,
    data_base_url: String,
    rate_limiter: Arc<AlpacaRateLimiter>,
}

/// Response from /v2/account
#[derive(Debug, Deserialize)]
struct AccountResponse {
    status: String,
    cash: Decimal,
    buying_power: Decimal,
}

/// Entry of /v2/positions
#[derive(Debug, Deserialize)]
struct PositionResponse {
    symbol: String,
    qty: Decimal,
}

/// Response from /v1beta3/crypto/us/bars
#[derive(Debug, Deserialize)]
struct BarsResponse {
    #[serde(default)]
    bars: HashMap<String, Vec<BarResponse>>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BarResponse {
    t: DateTime<Utc>,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
}

impl From<BarResponse> for Bar {
    fn from(bar: BarResponse) -> Self {
        Bar {
            timestamp: bar.t,
            open: bar.o,
            high: bar.h,
            low: bar.l,
            close: bar.c,
            volume: bar.v,
        }
    }
}

/// Body of POST /v2/orders
#[derive(Debug, Serialize)]
struct OrderBody<'a> {
    symbol: &'a str,
    side: OrderSide,
    #[serde(rename = "type")]
    order_type: &'static str,
    time_in_force: TimeInForce,
    #[serde(skip_serializing_if = "Option::is_none")]
    notional: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    qty: Option<Decimal>,
    client_order_id: String,
}

impl<'a> From<&'a OrderRequest> for OrderBody<'a> {
    fn from(order: &'a OrderRequest) -> Self {
        let (notional, qty) = match order.size {
            OrderSize::Notional(amount) => (Some(amount), None),
            OrderSize::Quantity(amount) => (None, Some(amount)),
        };

        Self {
            symbol: &order.symbol,
            side: order.side,
            order_type: "market",
            time_in_force: order.time_in_force,
            notional,
            qty,
            client_order_id: order.client_order_id.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    status: String,
}

impl AlpacaClient {
    /// Build a client from explicit credentials and endpoints
    pub fn new(config: &AlpacaConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apca-api-key-id",
            HeaderValue::from_str(&config.api_key_id).context("Invalid API key id")?,
        );
        let mut secret =
            HeaderValue::from_str(&config.api_secret_key).context("Invalid API secret key")?;
        secret.set_sensitive(true);
        headers.insert("apca-api-secret-key", secret);

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        let rpm = NonZeroU32::new(RATE_LIMIT_RPM).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(rpm)));

        Ok(Self {
            client,
            api_base_url: config.api_base_url.clone(),
            data_base_url: config.data_base_url.clone(),
            rate_limiter,
        })
    }

    /// Rate-limited request; non-2xx responses become errors carrying the body
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        self.rate_limiter.until_ready().await;

        let response = request.send().await.context("Alpaca request failed")?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        anyhow::bail!("Alpaca API error ({}): {}", status, error_text)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        tracing::debug!("GET {} {:?}", url, query);

        let response = self.send(self.client.get(url).query(query)).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }
}

#[async_trait]
impl MarketDataProvider for AlpacaClient {
    async fn get_account(&self) -> Result<Account> {
        let url = format!("{}/v2/account", self.api_base_url);
        let account: AccountResponse = self.get_json(&url, &[]).await?;

        Ok(Account {
            status: account.status,
            cash: account.cash,
            buying_power: account.buying_power,
        })
    }

    /// Crypto bars for one symbol, paging until `limit` bars are collected
    ///
    /// The window starts `limit` intervals ago so the newest bars are
    /// returned; illiquid pairs may yield fewer bars than requested.
    async fn get_bars(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<Vec<Bar>> {
        let url = format!("{}/v1beta3/crypto/us/bars", self.data_base_url);
        let lookback_minutes = timeframe.minutes() * limit as i64;
        let start = (Utc::now() - Duration::minutes(lookback_minutes))
            .to_rfc3339_opts(SecondsFormat::Secs, true);

        let mut bars: Vec<Bar> = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page_limit = (limit - bars.len()).min(MAX_BARS_PER_PAGE);
            let mut query = vec![
                ("symbols", symbol.to_string()),
                ("timeframe", timeframe.as_query().to_string()),
                ("limit", page_limit.to_string()),
                ("start", start.clone()),
                ("sort", "asc".to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("page_token", token.clone()));
            }

            let mut page: BarsResponse = self.get_json(&url, &query).await?;
            if let Some(symbol_bars) = page.bars.remove(symbol) {
                bars.extend(symbol_bars.into_iter().map(Bar::from));
            }

            page_token = page.next_page_token.filter(|t| !t.is_empty());
            if page_token.is_none() || bars.len() >= limit {
                break;
            }
        }

        bars.truncate(limit);
        tracing::debug!("Fetched {} {} bars for {}", bars.len(), timeframe.as_query(), symbol);

        Ok(bars)
    }

    async fn list_positions(&self) -> Result<Vec<Position>> {
        let url = format!("{}/v2/positions", self.api_base_url);
        let positions: Vec<PositionResponse> = self.get_json(&url, &[]).await?;

        Ok(positions
            .into_iter()
            .map(|p| Position {
                symbol: p.symbol,
                qty: p.qty,
            })
            .collect())
    }

    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderAck> {
        let url = format!("{}/v2/orders", self.api_base_url);
        let body = OrderBody::from(order);
        tracing::debug!("POST {} {:?}", url, body);

        let response = self.send(self.client.post(&url).json(&body)).await?;
        let ack: OrderResponse = response
            .json()
            .await
            .context("Failed to parse order response")?;

        Ok(OrderAck {
            id: ack.id,
            status: ack.status,
        })
    }
}
