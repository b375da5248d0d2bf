//! Scenario file format
//!
//! ```toml
//! [params]
//! scale_factor = 1000000000
//!
//! [[assets]]
//! id = 1
//! name = "ETH"
//! price = 2000
//!
//! [[events]]
//! kind = "deposit"
//! account = 1
//! amount = 1000
//!
//! [[events]]
//! kind = "open_position"
//! account = 10
//! debt = 1500
//! collateral = [{ asset = 1, amount = 1 }]
//!
//! [[events]]
//! kind = "liquidate"
//! account = 10
//! ```
//!
//! Amounts and prices are whole tokens; they are scaled to 18 decimals on
//! load.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use stability_ledger::{AccountId, AssetId, LedgerParams, DECIMAL_PRECISION};
use std::path::PathBuf;

/// Environment variable consulted when no path is given on the command line
pub const SCENARIO_ENV: &str = "LEDGER_SCENARIO";

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub params: LedgerParams,

    pub assets: Vec<AssetConfig>,

    #[serde(default)]
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetConfig {
    pub id: AssetId,
    pub name: String,

    /// Debt units per whole token
    pub price: u64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CollateralAmount {
    pub asset: AssetId,
    pub amount: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// Add principal to the stability pool
    Deposit { account: AccountId, amount: u64 },

    /// Take principal out of the stability pool
    Withdraw { account: AccountId, amount: u64 },

    /// Open a debt position
    OpenPosition {
        account: AccountId,
        debt: u64,
        collateral: Vec<CollateralAmount>,
    },

    /// Replace a position's collateral and debt
    AdjustPosition {
        account: AccountId,
        debt: u64,
        collateral: Vec<CollateralAmount>,
    },

    ClosePosition { account: AccountId },

    /// Liquidate a position: the pool absorbs what it can, the rest is
    /// redistributed to remaining positions
    Liquidate { account: AccountId },
}

impl Scenario {
    /// Load the scenario named by argv[1] or `LEDGER_SCENARIO`
    pub fn load() -> Result<Self> {
        let path = scenario_path()?;
        Self::from_path(&path)
    }

    pub fn from_path(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario from {}", path.display()))?;
        let scenario = Self::parse(&contents)
            .with_context(|| format!("Invalid scenario {}", path.display()))?;
        Ok(scenario)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(contents).context("Failed to parse TOML")?;
        scenario.params.validate()?;
        if scenario.assets.is_empty() {
            bail!("scenario declares no assets");
        }
        Ok(scenario)
    }

    pub fn price_of(&self, asset: AssetId) -> Option<u128> {
        self.assets
            .iter()
            .find(|a| a.id == asset)
            .map(|a| a.price as u128)
    }
}

fn scenario_path() -> Result<PathBuf> {
    let raw = match std::env::args().nth(1) {
        Some(arg) => arg,
        None => std::env::var(SCENARIO_ENV).with_context(|| {
            format!("No scenario path given; pass one or set {}", SCENARIO_ENV)
        })?,
    };
    let expanded = shellexpand::tilde(&raw);
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Whole tokens to 18-decimal units
pub fn units(tokens: u64) -> u128 {
    tokens as u128 * DECIMAL_PRECISION
}
