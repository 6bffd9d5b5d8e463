//! Latest-bar alert checks
//!
//! Only the final bar is compared against the one before it. An alert is
//! raised when, on that bar, the fast EMA crosses the slow EMA, or the close
//! crosses the slow EMA. Nothing is remembered between calls.

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::Serialize;
use std::fmt;

use crate::indicators::{crossover, AnnotatedSeries, Crossover};

/// A condition that held on the latest bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlertCondition {
    EmaCross {
        direction: Crossover,
        fast_period: usize,
        slow_period: usize,
    },
    PriceCross {
        direction: Crossover,
        period: usize,
    },
}

impl fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = |d: &Crossover| match d {
            Crossover::Above => "above",
            Crossover::Below => "below",
        };
        match self {
            AlertCondition::EmaCross {
                direction,
                fast_period,
                slow_period,
            } => write!(
                f,
                "EMA {} crossed {} EMA {}",
                fast_period,
                verb(direction),
                slow_period
            ),
            AlertCondition::PriceCross { direction, period } => {
                write!(f, "price crossed {} EMA {}", verb(direction), period)
            }
        }
    }
}

/// Alert raised by one check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertSignal {
    pub datetime: DateTime<Utc>,
    pub close: f64,
    pub conditions: Vec<AlertCondition>,
}

impl AlertSignal {
    pub fn description(&self) -> String {
        format!(
            "{} at {:.4} ({})",
            self.conditions.iter().join("; "),
            self.close,
            self.datetime.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

impl fmt::Display for AlertSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

/// Check the latest bar of `annotated` for alert conditions
pub fn check(annotated: &AnnotatedSeries) -> Option<AlertSignal> {
    let candles = annotated.candles();
    let (prev, last) = match candles {
        [.., prev, last] => (prev, last),
        _ => return None,
    };
    let (i, j) = (candles.len() - 2, candles.len() - 1);
    let fast = annotated.fast();
    let slow = annotated.slow();

    let mut conditions = Vec::new();

    // Pairs inside the warm-up compare running means, not EMAs
    let ema_settled = i >= annotated.settled_from();
    let slow_settled = i + 1 >= slow.period;

    if let (true, Some(pf), Some(ps), Some(cf), Some(cs)) =
        (ema_settled, fast.get(i), slow.get(i), fast.get(j), slow.get(j))
    {
        if let Some(direction) = crossover(pf, ps, cf, cs) {
            conditions.push(AlertCondition::EmaCross {
                direction,
                fast_period: fast.period,
                slow_period: slow.period,
            });
        }
    }

    if let (true, Some(ps), Some(cs)) = (slow_settled, slow.get(i), slow.get(j)) {
        if let Some(direction) = crossover(prev.close, ps, last.close, cs) {
            conditions.push(AlertCondition::PriceCross {
                direction,
                period: slow.period,
            });
        }
    }

    if conditions.is_empty() {
        return None;
    }

    Some(AlertSignal {
        datetime: last.datetime,
        close: last.close,
        conditions,
    })
}
