//! Technical indicators
//!
//! Moving averages over closing prices and the annotation step that attaches
//! them to a [`PriceSeries`]. Every output is aligned 1:1 with its input;
//! `None` marks a bar where the indicator is undefined.

use serde::{Deserialize, Serialize};

use crate::config::IndicatorConfig;
use crate::{Candle, PriceSeries};

/// How an EMA fills the bars before its window is complete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarmUp {
    /// Bars before the window is full hold the mean of all closes so far.
    /// Bar `period - 1` therefore holds the SMA seed.
    #[default]
    ExpandingMean,
    /// Bars before the window is full are undefined.
    Undefined,
}

/// Calculate Simple Moving Average
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = Vec::with_capacity(values.len());

    for i in 0..values.len() {
        if period == 0 || i + 1 < period {
            result.push(None);
        } else {
            let sum: f64 = values[i + 1 - period..=i].iter().sum();
            result.push(Some(sum / period as f64));
        }
    }

    result
}

/// Calculate Exponential Moving Average
///
/// `alpha = 2 / (period + 1)` and `ema[t] = value[t] * alpha + ema[t-1] * (1 - alpha)`
/// once the window is full. Fewer than two values, or a zero period, yield
/// an all-undefined line.
pub fn ema(values: &[f64], period: usize, warm_up: WarmUp) -> Vec<Option<f64>> {
    if values.len() < 2 || period == 0 {
        return vec![None; values.len()];
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut result = Vec::with_capacity(values.len());
    let mut running_sum = 0.0;
    let mut prev: Option<f64> = None;

    for (i, &value) in values.iter().enumerate() {
        let current = if i < period {
            running_sum += value;
            let mean = running_sum / (i + 1) as f64;
            match warm_up {
                WarmUp::ExpandingMean => Some(mean),
                WarmUp::Undefined if i + 1 == period => Some(mean),
                WarmUp::Undefined => None,
            }
        } else {
            prev.map(|p| value * alpha + p * (1.0 - alpha))
        };

        prev = current;
        result.push(current);
    }

    result
}

/// Direction of a line crossing another between two consecutive bars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Crossover {
    Above,
    Below,
}

/// Detect `a` crossing `b` between the previous and current bar
///
/// Touching is not a cross: `a` must end strictly on the other side.
pub fn crossover(prev_a: f64, prev_b: f64, a: f64, b: f64) -> Option<Crossover> {
    if prev_a <= prev_b && a > b {
        Some(Crossover::Above)
    } else if prev_a >= prev_b && a < b {
        Some(Crossover::Below)
    } else {
        None
    }
}

/// One indicator column aligned with a price series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorLine {
    pub period: usize,
    pub values: Vec<Option<f64>>,
}

impl IndicatorLine {
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied().flatten()
    }

    pub fn label(&self) -> String {
        format!("EMA {}", self.period)
    }

    pub fn is_undefined(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }
}

/// A price series with its fast and slow EMA columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedSeries {
    series: PriceSeries,
    fast: IndicatorLine,
    slow: IndicatorLine,
}

impl AnnotatedSeries {
    pub fn series(&self) -> &PriceSeries {
        &self.series
    }

    pub fn candles(&self) -> &[Candle] {
        self.series.candles()
    }

    pub fn fast(&self) -> &IndicatorLine {
        &self.fast
    }

    pub fn slow(&self) -> &IndicatorLine {
        &self.slow
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// First bar where both lines have left their warm-up
    ///
    /// Before this bar the lines may share the same running mean, so a
    /// comparison between them says nothing about the market.
    pub fn settled_from(&self) -> usize {
        self.fast.period.max(self.slow.period).saturating_sub(1)
    }
}

/// Attach fast and slow EMAs of the closing price to `series`
///
/// Takes ownership: the annotated copy is the only one left, so nothing can
/// mutate the candles behind a caller's back.
pub fn annotate(series: PriceSeries, config: &IndicatorConfig) -> AnnotatedSeries {
    let closes = series.closes();

    let fast = IndicatorLine {
        period: config.fast_period,
        values: ema(&closes, config.fast_period, config.warm_up),
    };
    let slow = IndicatorLine {
        period: config.slow_period,
        values: ema(&closes, config.slow_period, config.warm_up),
    };

    AnnotatedSeries { series, fast, slow }
}
