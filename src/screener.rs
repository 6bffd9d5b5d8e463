//! EMA crossover screener
//!
//! Rules:
//! - `GoldenCross`: the fast EMA closes a bar strictly above the slow EMA
//!   after being at or below it on the previous bar.
//! - `DeathCross`: the mirror image.
//!
//! Bars where either EMA is undefined, on either side of the pair, are
//! skipped. The default scope walks the whole history, so one scan can
//! report several historical crossings, oldest first.

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ScreenerConfig;
use crate::indicators::{crossover, AnnotatedSeries, Crossover};
use crate::{Instrument, Timeframe};

/// Which bars a scan evaluates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanScope {
    /// Every adjacent pair of bars
    #[default]
    FullHistory,
    /// Only the final pair, yielding at most one hit
    LatestBar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenerRule {
    GoldenCross,
    DeathCross,
}

impl ScreenerRule {
    pub fn name(&self) -> &'static str {
        match self {
            ScreenerRule::GoldenCross => "Golden Cross",
            ScreenerRule::DeathCross => "Death Cross",
        }
    }
}

impl fmt::Display for ScreenerRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// One bar that matched a rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenerHit {
    pub datetime: DateTime<Utc>,
    pub instrument: Instrument,
    pub rule: ScreenerRule,
    pub close: f64,
    pub description: String,
}

/// Output of one scan; empty when the scan ran and nothing matched
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenerResult {
    pub instrument: Instrument,
    pub timeframe: Timeframe,
    pub hits: Vec<ScreenerHit>,
}

impl ScreenerResult {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Plain-text table, one row per hit
    pub fn to_table(&self) -> String {
        let header = format!(
            "{:<19}  {:<10}  {:<12}  {:>12}  {}",
            "datetime", "instrument", "rule", "close", "description"
        );
        let rows = self.hits.iter().map(|hit| {
            format!(
                "{:<19}  {:<10}  {:<12}  {:>12.4}  {}",
                hit.datetime.format("%Y-%m-%d %H:%M:%S"),
                hit.instrument,
                hit.rule,
                hit.close,
                hit.description
            )
        });

        std::iter::once(header).chain(rows).join("\n")
    }
}

/// Evaluate the crossover rules over `annotated`
pub fn scan(
    annotated: &AnnotatedSeries,
    instrument: Instrument,
    config: &ScreenerConfig,
) -> ScreenerResult {
    let fast = annotated.fast();
    let slow = annotated.slow();
    let skip = match config.scope {
        ScanScope::FullHistory => 0,
        ScanScope::LatestBar => annotated.len().saturating_sub(2),
    }
    .max(annotated.settled_from());

    let hits = annotated
        .candles()
        .iter()
        .enumerate()
        .skip(skip)
        .tuple_windows()
        .filter_map(|((prev, _), (i, candle))| {
            let (prev_fast, prev_slow) = (fast.get(prev)?, slow.get(prev)?);
            let (cur_fast, cur_slow) = (fast.get(i)?, slow.get(i)?);

            let (rule, verb) = match crossover(prev_fast, prev_slow, cur_fast, cur_slow)? {
                Crossover::Above => (ScreenerRule::GoldenCross, "above"),
                Crossover::Below => (ScreenerRule::DeathCross, "below"),
            };

            Some(ScreenerHit {
                datetime: candle.datetime,
                instrument,
                rule,
                close: candle.close,
                description: format!(
                    "{} crossed {} {} ({:.4} vs {:.4})",
                    fast.label(),
                    verb,
                    slow.label(),
                    cur_fast,
                    cur_slow
                ),
            })
        })
        .collect();

    ScreenerResult {
        instrument,
        timeframe: annotated.series().timeframe(),
        hits,
    }
}
