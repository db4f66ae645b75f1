// Core modules
pub mod api;
pub mod config;
pub mod execution;
pub mod indicators;
pub mod market;
pub mod models;
pub mod strategy;
pub mod trader;

// Re-export commonly used types
pub use api::{AlpacaClient, MarketDataProvider};
pub use models::*;
pub use strategy::Strategy;
pub use trader::Trader;

// Error handling
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
