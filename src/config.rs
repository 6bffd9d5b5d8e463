//! Configuration management
//!
//! Settings come from the environment (a `.env` file is loaded by the binary
//! before this runs) or from a JSON file whose credentials can be overridden
//! by the same environment variables. Missing credentials are not an error
//! here: the affected section stays `None` and the pipeline reports it as
//! "not configured" when it is needed.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::indicators::WarmUp;
use crate::screener::ScanScope;

pub const ENV_TWELVE_DATA_API_KEY: &str = "TWELVE_DATA_API_KEY";
pub const ENV_TWELVE_DATA_BASE_URL: &str = "TWELVE_DATA_BASE_URL";
pub const ENV_TWELVE_DATA_OUTPUT_SIZE: &str = "TWELVE_DATA_OUTPUT_SIZE";
pub const ENV_TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
pub const ENV_TELEGRAM_API_BASE_URL: &str = "TELEGRAM_API_BASE_URL";

pub const DEFAULT_TWELVE_DATA_URL: &str = "https://api.twelvedata.com";
pub const DEFAULT_TELEGRAM_URL: &str = "https://api.telegram.org";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_provider: Option<DataProviderConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<TelegramConfig>,
    #[serde(default)]
    pub indicators: IndicatorConfig,
    #[serde(default)]
    pub screener: ScreenerConfig,
}

impl Config {
    /// Build configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env();
        config
    }

    /// Load configuration from a JSON file, then apply environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    /// Overlay values from `lookup`; blank values count as unset
    pub fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(api_key) = get(ENV_TWELVE_DATA_API_KEY) {
            self.data_provider
                .get_or_insert_with(DataProviderConfig::default)
                .api_key = api_key;
        }
        if let Some(provider) = self.data_provider.as_mut() {
            if let Some(base_url) = get(ENV_TWELVE_DATA_BASE_URL) {
                provider.base_url = base_url;
            }
            if let Some(raw) = get(ENV_TWELVE_DATA_OUTPUT_SIZE) {
                match raw.trim().parse() {
                    Ok(size) => provider.output_size = size,
                    Err(_) => warn!(
                        "Ignoring {}={:?}: not a bar count, keeping {}",
                        ENV_TWELVE_DATA_OUTPUT_SIZE, raw, provider.output_size
                    ),
                }
            }
        }

        let token = get(ENV_TELEGRAM_BOT_TOKEN);
        let chat_id = get(ENV_TELEGRAM_CHAT_ID);
        if let Some(telegram) = self.telegram.as_mut() {
            if let Some(token) = token {
                telegram.bot_token = token;
            }
            if let Some(chat_id) = chat_id {
                telegram.chat_id = chat_id;
            }
        } else if let (Some(bot_token), Some(chat_id)) = (token, chat_id) {
            self.telegram = Some(TelegramConfig {
                bot_token,
                chat_id,
                base_url: DEFAULT_TELEGRAM_URL.to_string(),
            });
        }
        if let Some(telegram) = self.telegram.as_mut() {
            if let Some(base_url) = get(ENV_TELEGRAM_API_BASE_URL) {
                telegram.base_url = base_url;
            }
        }
    }

    /// Market-data settings, if a usable API key is present
    pub fn data_provider(&self) -> Option<&DataProviderConfig> {
        self.data_provider
            .as_ref()
            .filter(|p| !p.api_key.trim().is_empty())
    }

    /// Telegram settings, if both token and chat are present
    pub fn telegram(&self) -> Option<&TelegramConfig> {
        self.telegram
            .as_ref()
            .filter(|t| !t.bot_token.trim().is_empty() && !t.chat_id.trim().is_empty())
    }
}

/// Twelve Data connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_twelve_data_url")]
    pub base_url: String,
    /// Number of bars requested per load
    #[serde(default = "default_output_size")]
    pub output_size: u32,
}

impl Default for DataProviderConfig {
    fn default() -> Self {
        DataProviderConfig {
            api_key: String::new(),
            base_url: default_twelve_data_url(),
            output_size: default_output_size(),
        }
    }
}

fn default_twelve_data_url() -> String {
    DEFAULT_TWELVE_DATA_URL.to_string()
}

fn default_output_size() -> u32 {
    200
}

/// Telegram bot settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    #[serde(default = "default_telegram_url")]
    pub base_url: String,
}

fn default_telegram_url() -> String {
    DEFAULT_TELEGRAM_URL.to_string()
}

/// EMA windows and warm-up policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorConfig {
    pub fast_period: usize,
    pub slow_period: usize,
    #[serde(default)]
    pub warm_up: WarmUp,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        IndicatorConfig {
            fast_period: 20,
            slow_period: 50,
            warm_up: WarmUp::ExpandingMean,
        }
    }
}

/// Screener settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreenerConfig {
    #[serde(default)]
    pub scope: ScanScope,
}
