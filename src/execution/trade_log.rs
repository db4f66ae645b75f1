use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::TradeLogEntry;

#[derive(Debug, Error)]
pub enum TradeLogError {
    #[error("Trade log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Trade log CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Sink for executed trades. Append-only; entries are never read back.
pub trait TradeLog: Send + Sync {
    fn append(&self, entry: &TradeLogEntry) -> Result<(), TradeLogError>;
}

/// Headerless CSV file, one row per trade:
/// `timestamp,symbol,side,strategy,price,amount,outcome`
#[derive(Debug, Clone)]
pub struct CsvTradeLog {
    path: PathBuf,
}

impl CsvTradeLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TradeLog for CsvTradeLog {
    fn append(&self, entry: &TradeLogEntry) -> Result<(), TradeLogError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.serialize(entry)?;
        writer.flush()?;

        Ok(())
    }
}
