//! Chart screener - main entry point
//!
//! This binary provides four subcommands:
//! - chart: Render a candlestick chart with EMA lines
//! - screen: Run the EMA crossover screener
//! - alerts: Check the latest bar for alert conditions
//! - assets: List supported instruments and timeframes

use anyhow::Result;
use chart_screener::{Config, Instrument, Timeframe};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "chart-screener")]
#[command(about = "Candlestick charts, EMA screener and Telegram alerts", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON configuration file (credentials still come from the environment when set)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a candlestick chart with both EMA lines
    Chart {
        /// Instrument, e.g. "BTC/USD", "AAPL"
        #[arg(short, long, default_value = "BTC/USD")]
        asset: Instrument,

        /// Bar interval, e.g. "1min", "5min", "15min"
        #[arg(short, long, default_value = "1min")]
        timeframe: Timeframe,

        /// Only print the alert line when an alert triggered
        #[arg(long)]
        alerts_only: bool,

        /// Forward a triggered alert to Telegram
        #[arg(long)]
        send_alert: bool,

        /// Number of most recent bars to draw
        #[arg(long, default_value = "80")]
        bars: usize,

        /// Chart height in rows
        #[arg(long, default_value = "20")]
        height: usize,

        /// Also save the annotated series as CSV
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Run the EMA crossover screener
    Screen {
        #[arg(short, long, default_value = "BTC/USD")]
        asset: Instrument,

        #[arg(short, long, default_value = "1min")]
        timeframe: Timeframe,

        /// Only evaluate the most recent bar
        #[arg(long)]
        latest_only: bool,

        /// Forward signals to Telegram
        #[arg(long)]
        send: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check the latest bar for alert conditions
    Alerts {
        #[arg(short, long, default_value = "BTC/USD")]
        asset: Instrument,

        #[arg(short, long, default_value = "1min")]
        timeframe: Timeframe,

        /// Forward a triggered alert to Telegram
        #[arg(long)]
        send: bool,
    },

    /// List supported instruments and timeframes
    Assets,
}

fn setup_logging(verbose: bool, command_name: &str, file_only: bool) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    // Create log file with naming pattern: {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // Set log level - filter out noisy external crates
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    if file_only {
        // Machine-readable stdout: keep logs in the file only
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    } else {
        // Console goes to stderr so chart and tables own stdout
        let console_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(true);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        info!("Logging initialized");
        info!("Log file: {}", log_path.display());
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let (command_name, file_only) = match &cli.command {
        Commands::Chart { .. } => ("chart", false),
        Commands::Screen { json, .. } => ("screen", *json),
        Commands::Alerts { .. } => ("alerts", false),
        Commands::Assets => ("assets", true),
    };

    setup_logging(cli.verbose, command_name, file_only)?;

    let config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Config::from_file(path)?
        }
        None => Config::from_env(),
    };

    match cli.command {
        Commands::Chart {
            asset,
            timeframe,
            alerts_only,
            send_alert,
            bars,
            height,
            export,
        } => {
            commands::chart::run(
                &config,
                asset,
                timeframe,
                alerts_only,
                send_alert,
                bars,
                height,
                export,
            )
            .await
        }

        Commands::Screen {
            asset,
            timeframe,
            latest_only,
            send,
            json,
        } => commands::screen::run(config, asset, timeframe, latest_only, send, json).await,

        Commands::Alerts {
            asset,
            timeframe,
            send,
        } => commands::alerts::run(&config, asset, timeframe, send).await,

        Commands::Assets => commands::assets::run(),
    }
}
