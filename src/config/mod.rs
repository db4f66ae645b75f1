// Runtime configuration
//
// Credentials come from the environment (`APCA_*`, the names Alpaca's own
// tooling uses). Bot settings come from an optional TOML file overlaid with
// `TRENDBOT_*` environment variables.

use std::fmt;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

use crate::strategy::{default_asset_table, AssetConfig};

pub const DEFAULT_API_BASE_URL: &str = "https://paper-api.alpaca.markets";
pub const DEFAULT_DATA_BASE_URL: &str = "https://data.alpaca.markets";
pub const DEFAULT_CONFIG_FILE: &str = "trendbot.toml";

/// Alpaca credentials and endpoints
#[derive(Clone, Deserialize)]
pub struct AlpacaConfig {
    pub api_key_id: String,
    pub api_secret_key: String,
    pub api_base_url: String,
    pub data_base_url: String,
}

impl fmt::Debug for AlpacaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlpacaConfig")
            .field("api_key_id", &self.api_key_id)
            .field("api_secret_key", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .field("data_base_url", &self.data_base_url)
            .finish()
    }
}

impl AlpacaConfig {
    /// Read `APCA_API_KEY_ID`, `APCA_API_SECRET_KEY`, `APCA_API_BASE_URL`
    /// and `APCA_DATA_BASE_URL`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(Environment::with_prefix("APCA"))
    }

    fn from_source(env: Environment) -> Result<Self, ConfigError> {
        let mut config: Self = Config::builder()
            .set_default("api_base_url", DEFAULT_API_BASE_URL)?
            .set_default("data_base_url", DEFAULT_DATA_BASE_URL)?
            .add_source(env)
            .build()?
            .try_deserialize()?;

        if config.api_key_id.trim().is_empty() || config.api_secret_key.trim().is_empty() {
            return Err(ConfigError::Message(
                "APCA_API_KEY_ID and APCA_API_SECRET_KEY must be set".to_string(),
            ));
        }

        config.api_base_url = trim_base_url(&config.api_base_url);
        config.data_base_url = trim_base_url(&config.data_base_url);
        Ok(config)
    }
}

fn trim_base_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    // The trading URL is sometimes configured with the API version attached
    url.strip_suffix("/v2").unwrap_or(url).to_string()
}

/// Loop and trading settings
#[derive(Debug, Clone, Deserialize)]
pub struct BotSettings {
    /// Seconds between evaluation cycles
    pub cycle_interval_secs: u64,
    /// Append-only CSV of executed trades
    pub trade_log_path: PathBuf,
    /// Source (1-minute) bars requested per asset
    pub bar_limit: usize,
    /// Width of the bars the rules see
    pub resample_minutes: u32,
    /// Log orders instead of submitting them
    pub dry_run: bool,
    /// Rule table, in evaluation order
    #[serde(default = "default_asset_table")]
    pub assets: Vec<AssetConfig>,
}

impl BotSettings {
    /// Load from `path` (required) or `trendbot.toml` (optional), then
    /// `TRENDBOT_*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let builder = match path {
            Some(path) => Config::builder().add_source(File::from(path).required(true)),
            None => Config::builder()
                .add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        Self::from_builder(
            builder.add_source(Environment::with_prefix("TRENDBOT").try_parsing(true)),
        )
    }

    /// Parse settings from TOML text
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Self::from_builder(Config::builder().add_source(File::from_str(text, FileFormat::Toml)))
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let settings: Self = builder
            .set_default("cycle_interval_secs", 900_i64)?
            .set_default("trade_log_path", "trade_log.csv")?
            .set_default("bar_limit", 1000_i64)?
            .set_default("resample_minutes", 15_i64)?
            .set_default("dry_run", false)?
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cycle_interval_secs == 0 {
            return Err(ConfigError::Message(
                "cycle_interval_secs must be positive".to_string(),
            ));
        }
        if self.bar_limit == 0 || self.resample_minutes == 0 {
            return Err(ConfigError::Message(
                "bar_limit and resample_minutes must be positive".to_string(),
            ));
        }
        if self.assets.is_empty() {
            return Err(ConfigError::Message("asset table is empty".to_string()));
        }

        for asset in &self.assets {
            asset.validate().map_err(ConfigError::Message)?;
        }

        Ok(())
    }
}

/// Everything the binary needs
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub alpaca: AlpacaConfig,
    pub bot: BotSettings,
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Ok(Self {
            alpaca: AlpacaConfig::from_env()?,
            bot: BotSettings::load(path)?,
        })
    }
}
