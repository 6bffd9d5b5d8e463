//! Terminal candlestick chart and CSV export of an annotated series

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::indicators::AnnotatedSeries;

const WICK: char = '│';
const BULL_BODY: char = '█';
const BEAR_BODY: char = '░';
const FAST_MARK: char = '•';
const SLOW_MARK: char = '∘';

/// Chart dimensions
#[derive(Debug, Clone, Copy)]
pub struct ChartOptions {
    /// Rows used for the price axis
    pub height: usize,
    /// Most recent bars shown, one column each
    pub max_bars: usize,
}

impl Default for ChartOptions {
    fn default() -> Self {
        ChartOptions {
            height: 20,
            max_bars: 80,
        }
    }
}

/// Render the last `max_bars` candles with both EMA lines
pub fn render(annotated: &AnnotatedSeries, options: &ChartOptions) -> String {
    let series = annotated.series();
    let title = format!("{} - {}", series.instrument(), series.timeframe());

    let candles = annotated.candles();
    let shown = candles.len().min(options.max_bars);
    let height = options.height.max(2);
    if shown == 0 {
        return format!("{}\n(no data)\n", title);
    }
    let offset = candles.len() - shown;
    let window = &candles[offset..];

    let fast: Vec<Option<f64>> = (offset..candles.len()).map(|i| annotated.fast().get(i)).collect();
    let slow: Vec<Option<f64>> = (offset..candles.len()).map(|i| annotated.slow().get(i)).collect();

    let (mut lo, mut hi) = window
        .iter()
        .flat_map(|c| [c.low, c.high])
        .chain(fast.iter().chain(&slow).flatten().copied())
        .fold((f64::MAX, f64::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if hi - lo <= f64::EPSILON {
        lo -= 0.5;
        hi += 0.5;
    }

    let row_of = |price: f64| -> usize {
        let scaled = (hi - price) / (hi - lo) * (height - 1) as f64;
        (scaled.round().max(0.0) as usize).min(height - 1)
    };

    let mut grid = vec![vec![' '; shown]; height];
    for (col, candle) in window.iter().enumerate() {
        for row in grid.iter_mut().take(row_of(candle.low) + 1).skip(row_of(candle.high)) {
            row[col] = WICK;
        }
        let body = if candle.is_bullish() { BULL_BODY } else { BEAR_BODY };
        let top = row_of(candle.open.max(candle.close));
        let bottom = row_of(candle.open.min(candle.close));
        for row in grid.iter_mut().take(bottom + 1).skip(top) {
            row[col] = body;
        }
    }
    for (line, mark) in [(&fast, FAST_MARK), (&slow, SLOW_MARK)] {
        for (col, value) in line.iter().enumerate() {
            if let Some(v) = value {
                let cell = &mut grid[row_of(*v)][col];
                if *cell == ' ' {
                    *cell = mark;
                }
            }
        }
    }

    let mut out = String::new();
    out.push_str(&title);
    out.push('\n');
    for (i, row) in grid.iter().enumerate() {
        let label = match i {
            0 => format!("{:>12.4}", hi),
            _ if i == height - 1 => format!("{:>12.4}", lo),
            _ => " ".repeat(12),
        };
        out.push_str(&label);
        out.push_str(" ┤");
        out.extend(row.iter());
        out.push('\n');
    }
    out.push_str(&format!(
        "{} {} → {}\n",
        " ".repeat(13),
        window[0].datetime.format("%Y-%m-%d %H:%M"),
        window[shown - 1].datetime.format("%Y-%m-%d %H:%M"),
    ));
    out.push_str(&format!(
        "{} {} {}  {} {}\n",
        " ".repeat(13),
        FAST_MARK,
        annotated.fast().label(),
        SLOW_MARK,
        annotated.slow().label()
    ));
    out
}

#[derive(Debug, Serialize)]
struct CsvRow {
    datetime: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    ema_fast: Option<f64>,
    ema_slow: Option<f64>,
}

/// Write one row per bar; undefined EMA cells are left empty
pub fn write_csv_to<W: Write>(annotated: &AnnotatedSeries, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    for (i, candle) in annotated.candles().iter().enumerate() {
        wtr.serialize(CsvRow {
            datetime: candle.datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
            open: candle.open,
            high: candle.high,
            low: candle.low,
            close: candle.close,
            volume: candle.volume,
            ema_fast: annotated.fast().get(i),
            ema_slow: annotated.slow().get(i),
        })
        .context("Failed to write CSV row")?;
    }

    wtr.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Save the annotated series as CSV at `path`
pub fn write_csv(annotated: &AnnotatedSeries, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create output file {}", path.display()))?;
    write_csv_to(annotated, file)?;

    info!("Saved {} rows to {}", annotated.len(), path.display());
    Ok(())
}
