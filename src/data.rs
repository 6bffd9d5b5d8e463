//! Market data loading
//!
//! Fetches OHLC bars from the Twelve Data `time_series` endpoint and turns
//! them into an oldest-first [`PriceSeries`]. [`TwelveDataClient::load`] is
//! the boundary the rest of the pipeline uses: every expected failure is
//! logged and collapses into `None`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::DataProviderConfig;
use crate::{Candle, Instrument, PriceSeries, Timeframe};

const TIME_SERIES_PATH: &str = "/time_series";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_LOGGED_ISSUES: usize = 5;

/// Why a load produced no series
#[derive(Debug, Error)]
pub enum DataError {
    #[error("no API key configured for the data provider")]
    MissingCredential,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("data provider returned HTTP {status}")]
    Http { status: u16 },

    #[error("data provider error {code}: {message}")]
    Upstream { code: u16, message: String },

    #[error("unexpected response payload: {0}")]
    Payload(String),

    #[error("bar {index}: cannot parse {field} from {value:?}")]
    InvalidField {
        index: usize,
        field: &'static str,
        value: String,
    },

    #[error("no bars returned for {instrument} {timeframe}")]
    Empty {
        instrument: Instrument,
        timeframe: Timeframe,
    },
}

#[derive(Debug, Deserialize)]
struct TimeSeriesResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    values: Vec<BarRecord>,
}

#[derive(Debug, Deserialize)]
struct BarRecord {
    datetime: String,
    open: String,
    high: String,
    low: String,
    close: String,
    #[serde(default)]
    volume: Option<String>,
}

impl BarRecord {
    fn into_candle(self, index: usize) -> Result<Candle, DataError> {
        let invalid = |field: &'static str, value: &str| DataError::InvalidField {
            index,
            field,
            value: value.to_string(),
        };
        let price = |field: &'static str, value: &str| {
            value.trim().parse::<f64>().map_err(|_| invalid(field, value))
        };

        let datetime =
            parse_datetime(&self.datetime).ok_or_else(|| invalid("datetime", &self.datetime))?;
        let volume = match self.volume.as_deref() {
            Some(v) if !v.trim().is_empty() => price("volume", v)?,
            _ => 0.0,
        };

        Ok(Candle::new_unchecked(
            datetime,
            price("open", &self.open)?,
            price("high", &self.high)?,
            price("low", &self.low)?,
            price("close", &self.close)?,
            volume,
        ))
    }
}

/// Parse `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD`, taken as UTC
fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
}

/// Client for the Twelve Data REST API
#[derive(Debug, Clone)]
pub struct TwelveDataClient {
    client: reqwest::Client,
    base_url: String,
    output_size: u32,
}

impl TwelveDataClient {
    pub fn new(config: &DataProviderConfig) -> Result<Self, DataError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self::with_client(
            config.base_url.clone(),
            config.output_size,
            client,
        ))
    }

    pub fn with_client(
        base_url: impl Into<String>,
        output_size: u32,
        client: reqwest::Client,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            output_size,
        }
    }

    /// Load a series, or `None` when nothing usable came back
    pub async fn load(
        &self,
        instrument: Instrument,
        timeframe: Timeframe,
        credential: &str,
    ) -> Option<PriceSeries> {
        match self.fetch(instrument, timeframe, credential).await {
            Ok(series) => {
                let report = validate_candles(series.candles());
                for issue in report.errors.iter().chain(&report.warnings).take(MAX_LOGGED_ISSUES) {
                    warn!("{} {}: {}", instrument, timeframe, issue);
                }
                info!("Loaded {} candles for {} {}", series.len(), instrument, timeframe);
                Some(series)
            }
            Err(e) => {
                warn!("No data for {} {}: {}", instrument, timeframe, e);
                None
            }
        }
    }

    /// Fetch a series, reporting why it failed
    pub async fn fetch(
        &self,
        instrument: Instrument,
        timeframe: Timeframe,
        credential: &str,
    ) -> Result<PriceSeries, DataError> {
        if credential.trim().is_empty() {
            return Err(DataError::MissingCredential);
        }

        let url = format!("{}{}", self.base_url, TIME_SERIES_PATH);
        let output_size = self.output_size.to_string();
        debug!(
            "GET {} symbol={} interval={} outputsize={}",
            url, instrument, timeframe, output_size
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", instrument.symbol()),
                ("interval", timeframe.interval()),
                ("outputsize", output_size.as_str()),
                ("apikey", credential),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        let payload: TimeSeriesResponse = match serde_json::from_str(&body) {
            Ok(payload) => payload,
            Err(_) if !status.is_success() => {
                return Err(DataError::Http {
                    status: status.as_u16(),
                })
            }
            Err(e) => return Err(DataError::Payload(e.to_string())),
        };

        if payload.status.as_deref() == Some("error") {
            return Err(DataError::Upstream {
                code: payload.code.unwrap_or(status.as_u16()),
                message: payload.message.unwrap_or_default(),
            });
        }
        if !status.is_success() {
            return Err(DataError::Http {
                status: status.as_u16(),
            });
        }

        let candles = payload
            .values
            .into_iter()
            .enumerate()
            .map(|(i, bar)| bar.into_candle(i))
            .collect::<Result<Vec<_>, _>>()?;

        if candles.is_empty() {
            return Err(DataError::Empty {
                instrument,
                timeframe,
            });
        }

        // Upstream lists newest first; the series constructor restores time order
        Ok(PriceSeries::new(instrument, timeframe, candles))
    }
}

// =============================================================================
// Data Validation
// =============================================================================

/// Validate candle data for consistency
pub fn validate_candles(candles: &[Candle]) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if candles.is_empty() {
        errors.push("No candles provided".to_string());
        return ValidationResult { errors, warnings };
    }

    for (i, candle) in candles.iter().enumerate() {
        if let Err(e) = candle.validate() {
            errors.push(format!("Candle {} ({}): {}", i, candle.datetime, e));
        }
        if i > 0 && candle.datetime <= candles[i - 1].datetime {
            warnings.push(format!("Candle {}: not chronological", i));
        }
    }

    ValidationResult { errors, warnings }
}

/// Result of data validation
#[derive(Debug)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}
