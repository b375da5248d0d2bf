//! Stability ledger replay
//!
//! Loads a TOML scenario of deposits, position changes and liquidations,
//! drives the stability pool and the redistribution ledger through it, and
//! prints the resulting state as JSON.

mod config;
mod replay;

use anyhow::{Context, Result};
use config::Scenario;
use replay::Replay;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting stability ledger replay");

    let scenario = Scenario::load()?;
    log::info!(
        "Loaded {} assets and {} events",
        scenario.assets.len(),
        scenario.events.len()
    );

    let mut replay = Replay::new(&scenario)?;
    log::debug!("Ledger params: {:?}", replay.params());

    replay.run(&scenario.events)?;

    let summary = replay.summary()?;
    let json = serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
    println!("{}", json);

    log::info!("Replay finished");
    Ok(())
}
