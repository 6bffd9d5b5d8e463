//! Chart command implementation

use anyhow::Result;
use chart_screener::alerts::AlertSignal;
use chart_screener::chart::{self, ChartOptions};
use chart_screener::indicators::AnnotatedSeries;
use chart_screener::pipeline::{alert_message, Session};
use chart_screener::{alerts, Config, Instrument, Timeframe};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{forward, report};

#[allow(clippy::too_many_arguments)]
pub async fn run(
    config: &Config,
    asset: Instrument,
    timeframe: Timeframe,
    alerts_only: bool,
    send_alert: bool,
    bars: usize,
    height: usize,
    export: Option<PathBuf>,
) -> Result<()> {
    let mut session = match Session::new(config) {
        Ok(session) => session,
        Err(e) => {
            report(&e);
            return Ok(());
        }
    };

    info!("Loading {} {}", asset, timeframe);
    let annotated = match session.load(asset, timeframe).await {
        Ok(annotated) => annotated,
        Err(e) => {
            report(&e);
            return Ok(());
        }
    };

    let options = ChartOptions {
        height,
        max_bars: bars,
    };
    println!("{}", chart::render(&annotated, &options));

    if let Some(path) = export {
        println!("{}", export_csv(&annotated, &path));
    }

    let signal = alerts::check(&annotated);
    if let Some(notice) = alert_notice(signal.as_ref(), alerts_only) {
        println!("{}", notice);
    }
    if let (true, Some(signal)) = (send_alert, &signal) {
        forward(&mut session, &alert_message(asset, timeframe, signal)).await;
    }

    Ok(())
}

/// Write the CSV and describe the outcome; a failure is only a notice
fn export_csv(annotated: &AnnotatedSeries, path: &Path) -> String {
    match chart::write_csv(annotated, path) {
        Ok(()) => format!("Saved {} rows to {}", annotated.len(), path.display()),
        Err(e) => {
            warn!("CSV export to {} failed: {:#}", path.display(), e);
            format!("✗ Failed to export CSV to {}: {:#}", path.display(), e)
        }
    }
}

/// Line printed under the chart, if any
///
/// The alert status is always shown unless `alerts_only` asks to stay quiet
/// when nothing triggered.
fn alert_notice(signal: Option<&AlertSignal>, alerts_only: bool) -> Option<String> {
    match signal {
        Some(signal) => Some(format!("⚠️ Alert Triggered: {}", signal)),
        None if alerts_only => None,
        None => Some("No alert on the latest bar.".to_string()),
    }
}
