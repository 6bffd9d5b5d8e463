//! Load, annotate, screen, alert, notify
//!
//! [`Session`] is what a front end talks to. It takes plain values and
//! returns plain values, and every run method borrows the session mutably
//! so a session never has two runs in flight.

use thiserror::Error;
use tracing::{info, warn};

use crate::alerts::{self, AlertSignal};
use crate::config::{Config, DataProviderConfig, IndicatorConfig, ScreenerConfig};
use crate::data::{DataError, TwelveDataClient};
use crate::indicators::{self, AnnotatedSeries};
use crate::notifier::{NotifyError, TelegramNotifier};
use crate::screener::{self, ScreenerResult};
use crate::{Instrument, Timeframe};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("no data returned for {instrument} {timeframe}; check the API key and asset symbol")]
    NoData {
        instrument: Instrument,
        timeframe: Timeframe,
    },

    #[error("failed to set up {service} client: {reason}")]
    Client {
        service: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

pub const MARKET_DATA: &str = "Market data (TWELVE_DATA_API_KEY)";
pub const TELEGRAM: &str = "Telegram (TELEGRAM_BOT_TOKEN, TELEGRAM_CHAT_ID)";

struct Loader {
    client: TwelveDataClient,
    api_key: String,
}

/// One user's view of the pipeline
pub struct Session {
    loader: Option<Loader>,
    notifier: Option<TelegramNotifier>,
    indicators: IndicatorConfig,
    screener: ScreenerConfig,
}

impl Session {
    /// Build clients for whatever `config` has credentials for
    pub fn new(config: &Config) -> Result<Self, PipelineError> {
        let loader = match config.data_provider() {
            Some(provider) => Some(Self::loader(provider)?),
            None => {
                warn!("{} is not configured", MARKET_DATA);
                None
            }
        };

        let notifier = match config.telegram() {
            Some(telegram) => Some(TelegramNotifier::new(telegram).map_err(|e| {
                PipelineError::Client {
                    service: "Telegram",
                    reason: e.to_string(),
                }
            })?),
            None => None,
        };

        Ok(Session {
            loader,
            notifier,
            indicators: config.indicators.clone(),
            screener: config.screener.clone(),
        })
    }

    fn loader(provider: &DataProviderConfig) -> Result<Loader, PipelineError> {
        let client = TwelveDataClient::new(provider).map_err(|e: DataError| PipelineError::Client {
            service: "market data",
            reason: e.to_string(),
        })?;
        Ok(Loader {
            client,
            api_key: provider.api_key.clone(),
        })
    }

    pub fn is_data_configured(&self) -> bool {
        self.loader.is_some()
    }

    pub fn is_notifier_configured(&self) -> bool {
        self.notifier.is_some()
    }

    /// Fetch bars and attach the EMA columns
    pub async fn load(
        &mut self,
        instrument: Instrument,
        timeframe: Timeframe,
    ) -> Result<AnnotatedSeries, PipelineError> {
        let loader = self
            .loader
            .as_ref()
            .ok_or(PipelineError::NotConfigured(MARKET_DATA))?;

        let series = loader
            .client
            .load(instrument, timeframe, &loader.api_key)
            .await
            .ok_or(PipelineError::NoData {
                instrument,
                timeframe,
            })?;

        Ok(indicators::annotate(series, &self.indicators))
    }

    /// Screen an already loaded series
    pub fn scan(&self, annotated: &AnnotatedSeries) -> ScreenerResult {
        let instrument = annotated.series().instrument();
        let result = screener::scan(annotated, instrument, &self.screener);
        info!(
            "Screener found {} signal(s) for {} {}",
            result.len(),
            instrument,
            result.timeframe
        );
        result
    }

    /// Load and screen
    pub async fn screen(
        &mut self,
        instrument: Instrument,
        timeframe: Timeframe,
    ) -> Result<ScreenerResult, PipelineError> {
        let annotated = self.load(instrument, timeframe).await?;
        Ok(self.scan(&annotated))
    }

    /// Load and check the latest bar
    pub async fn alerts(
        &mut self,
        instrument: Instrument,
        timeframe: Timeframe,
    ) -> Result<Option<AlertSignal>, PipelineError> {
        let annotated = self.load(instrument, timeframe).await?;
        Ok(alerts::check(&annotated))
    }

    /// Forward a message to the configured chat
    pub async fn notify(&mut self, message: &str) -> Result<(), PipelineError> {
        let notifier = self
            .notifier
            .as_ref()
            .ok_or(PipelineError::NotConfigured(TELEGRAM))?;
        notifier.send(message).await?;
        Ok(())
    }
}

/// Text sent for a non-empty screener result
pub fn screener_message(result: &ScreenerResult) -> String {
    format!(
        "Screener Signal for {} - {}\n{}",
        result.instrument,
        result.timeframe,
        result.to_table()
    )
}

/// Text sent for a triggered alert
pub fn alert_message(instrument: Instrument, timeframe: Timeframe, signal: &AlertSignal) -> String {
    format!("⚠️ Alert for {} - {}: {}", instrument, timeframe, signal.description())
}
