//! Subcommand implementations
//!
//! Every pipeline failure ends here as a printed notice; none of them makes
//! the process exit with an error.

pub mod alerts;
pub mod assets;
pub mod chart;
pub mod screen;

use chart_screener::pipeline::{PipelineError, Session};
use tracing::warn;

/// Print a pipeline failure the way the user should see it
pub fn report(err: &PipelineError) {
    warn!("{}", err);
    match err {
        PipelineError::NotConfigured(what) => {
            println!("⚠ {} is not configured. Set it in the .env file.", what)
        }
        PipelineError::NoData { .. } => println!("⚠ {}", err),
        PipelineError::Notify(e) => println!("✗ Telegram delivery failed: {}", e),
        PipelineError::Client { .. } => println!("✗ {}", err),
    }
}

/// Send `message` and tell the user how it went
pub async fn forward(session: &mut Session, message: &str) {
    match session.notify(message).await {
        Ok(()) => println!("✓ Sent to Telegram"),
        Err(e) => report(&e),
    }
}
