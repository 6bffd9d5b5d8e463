//! Alerts command implementation

use anyhow::Result;
use chart_screener::pipeline::{alert_message, Session};
use chart_screener::{Config, Instrument, Timeframe};

use super::{forward, report};

pub async fn run(
    config: &Config,
    asset: Instrument,
    timeframe: Timeframe,
    send: bool,
) -> Result<()> {
    let mut session = match Session::new(config) {
        Ok(session) => session,
        Err(e) => {
            report(&e);
            return Ok(());
        }
    };

    match session.alerts(asset, timeframe).await {
        Ok(Some(signal)) => {
            println!("⚠️ Alert Triggered: {}", signal);
            if send {
                forward(&mut session, &alert_message(asset, timeframe, &signal)).await;
            }
        }
        Ok(None) => println!("No alert on the latest bar."),
        Err(e) => report(&e),
    }

    Ok(())
}
