// Order execution and trade recording
pub mod executor;
pub mod trade_log;

pub use executor::{ExecutionAction, ExecutionDecision, ExecutionOutcome, Executor};
pub use trade_log::{CsvTradeLog, TradeLog, TradeLogError};
