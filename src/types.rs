//! Core data types shared by the loader, indicators, screener and alerts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Validation errors for candle data
#[derive(Debug, Error, PartialEq)]
pub enum CandleValidationError {
    #[error("high ({high}) must be >= low ({low})")]
    HighLessThanLow { high: f64, low: f64 },

    #[error("volume ({0}) must be >= 0")]
    NegativeVolume(f64),

    #[error("open ({open}) must be between low ({low}) and high ({high})")]
    OpenOutOfRange { open: f64, low: f64, high: f64 },

    #[error("close ({close}) must be between low ({low}) and high ({high})")]
    CloseOutOfRange { close: f64, low: f64, high: f64 },

    #[error("prices must be positive: open={open}, high={high}, low={low}, close={close}")]
    NonPositivePrice {
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },
}

/// Errors for user-supplied instrument and timeframe names
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unsupported instrument: {0}")]
    UnsupportedInstrument(String),

    #[error("unsupported timeframe: {0}")]
    UnsupportedTimeframe(String),
}

/// OHLCV candlestick data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub datetime: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Zero when the provider does not report volume (forex, metals)
    pub volume: f64,
}

impl Candle {
    /// Create a new candle with validation
    pub fn new(
        datetime: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, CandleValidationError> {
        let candle = Self::new_unchecked(datetime, open, high, low, close, volume);
        candle.validate()?;
        Ok(candle)
    }

    /// Create a candle without validation (upstream data is checked separately)
    pub fn new_unchecked(
        datetime: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            datetime,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn validate(&self) -> Result<(), CandleValidationError> {
        if self.open <= 0.0 || self.high <= 0.0 || self.low <= 0.0 || self.close <= 0.0 {
            return Err(CandleValidationError::NonPositivePrice {
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
            });
        }

        if self.high < self.low {
            return Err(CandleValidationError::HighLessThanLow {
                high: self.high,
                low: self.low,
            });
        }

        if self.volume < 0.0 {
            return Err(CandleValidationError::NegativeVolume(self.volume));
        }

        if self.open < self.low || self.open > self.high {
            return Err(CandleValidationError::OpenOutOfRange {
                open: self.open,
                low: self.low,
                high: self.high,
            });
        }

        if self.close < self.low || self.close > self.high {
            return Err(CandleValidationError::CloseOutOfRange {
                close: self.close,
                low: self.low,
                high: self.high,
            });
        }

        Ok(())
    }

    /// Close at or above open
    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }
}

/// Instruments offered for selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instrument {
    #[serde(rename = "BTC/USD")]
    BtcUsd,
    #[serde(rename = "ETH/USD")]
    EthUsd,
    #[serde(rename = "XAU/USD")]
    XauUsd,
    #[serde(rename = "EUR/USD")]
    EurUsd,
    #[serde(rename = "AAPL")]
    Aapl,
    #[serde(rename = "TSLA")]
    Tsla,
}

impl Instrument {
    pub const ALL: [Instrument; 6] = [
        Instrument::BtcUsd,
        Instrument::EthUsd,
        Instrument::XauUsd,
        Instrument::EurUsd,
        Instrument::Aapl,
        Instrument::Tsla,
    ];

    /// Symbol as the market-data provider expects it
    pub fn symbol(&self) -> &'static str {
        match self {
            Instrument::BtcUsd => "BTC/USD",
            Instrument::EthUsd => "ETH/USD",
            Instrument::XauUsd => "XAU/USD",
            Instrument::EurUsd => "EUR/USD",
            Instrument::Aapl => "AAPL",
            Instrument::Tsla => "TSLA",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.symbol())
    }
}

impl FromStr for Instrument {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Instrument::ALL
            .into_iter()
            .find(|i| i.symbol().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseError::UnsupportedInstrument(s.to_string()))
    }
}

/// Bar intervals offered for selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1min")]
    OneMinute,
    #[serde(rename = "5min")]
    FiveMinutes,
    #[serde(rename = "15min")]
    FifteenMinutes,
    #[serde(rename = "30min")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "1day")]
    OneDay,
}

impl Timeframe {
    pub const ALL: [Timeframe; 6] = [
        Timeframe::OneMinute,
        Timeframe::FiveMinutes,
        Timeframe::FifteenMinutes,
        Timeframe::ThirtyMinutes,
        Timeframe::OneHour,
        Timeframe::OneDay,
    ];

    /// Interval name used in the `interval` query parameter
    pub fn interval(&self) -> &'static str {
        match self {
            Timeframe::OneMinute => "1min",
            Timeframe::FiveMinutes => "5min",
            Timeframe::FifteenMinutes => "15min",
            Timeframe::ThirtyMinutes => "30min",
            Timeframe::OneHour => "1h",
            Timeframe::OneDay => "1day",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.interval())
    }
}

impl FromStr for Timeframe {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Timeframe::ALL
            .into_iter()
            .find(|t| t.interval().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseError::UnsupportedTimeframe(s.to_string()))
    }
}

/// Candles for one instrument and timeframe, strictly increasing by datetime
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    instrument: Instrument,
    timeframe: Timeframe,
    candles: Vec<Candle>,
}

impl PriceSeries {
    /// Build a series, ordering candles oldest first and dropping repeated datetimes
    pub fn new(instrument: Instrument, timeframe: Timeframe, mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.datetime);
        candles.dedup_by_key(|c| c.datetime);

        Self {
            instrument,
            timeframe,
            candles,
        }
    }

    pub fn instrument(&self) -> Instrument {
        self.instrument
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }
}
