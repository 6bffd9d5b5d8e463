//! Chart Screener
//!
//! Loads OHLC bars from Twelve Data, annotates them with fast and slow EMAs,
//! renders a terminal candlestick chart, screens for EMA crossovers, checks
//! the latest bar for alerts and forwards results to a Telegram chat.

pub mod alerts;
pub mod chart;
pub mod config;
pub mod data;
pub mod indicators;
pub mod notifier;
pub mod pipeline;
pub mod screener;
pub mod types;

pub use config::Config;
pub use types::*;
