//! Screen command implementation

use anyhow::Result;
use chart_screener::pipeline::{screener_message, Session};
use chart_screener::screener::ScanScope;
use chart_screener::{Config, Instrument, Timeframe};
use tracing::info;

use super::{forward, report};

pub async fn run(
    mut config: Config,
    asset: Instrument,
    timeframe: Timeframe,
    latest_only: bool,
    send: bool,
    json: bool,
) -> Result<()> {
    if latest_only {
        info!("Overriding screener scope to: latest bar");
        config.screener.scope = ScanScope::LatestBar;
    }

    let mut session = match Session::new(&config) {
        Ok(session) => session,
        Err(e) => {
            report(&e);
            return Ok(());
        }
    };

    let result = match session.screen(asset, timeframe).await {
        Ok(result) => result,
        Err(e) => {
            report(&e);
            return Ok(());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if result.is_empty() {
        println!("No matching conditions found.");
    } else {
        println!("Screener found signals:");
        println!("{}", result.to_table());
    }

    if send && !result.is_empty() {
        forward(&mut session, &screener_message(&result)).await;
    }

    Ok(())
}
