//! Assets command implementation

use anyhow::Result;
use chart_screener::{Instrument, Timeframe};
use itertools::Itertools;

pub fn run() -> Result<()> {
    println!("Instruments: {}", Instrument::ALL.iter().join(", "));
    println!("Timeframes:  {}", Timeframe::ALL.iter().join(", "));
    Ok(())
}
