//! Ledger parameters

use crate::{LedgerError, Result, DUST_DIVISOR, MAX_ASSETS, SCALE_FACTOR};
use serde::{Deserialize, Serialize};

/// Square root of 1.0 in 18-decimal fixed point
const MAX_SCALE_FACTOR: u128 = 1_000_000_000;

/// Tunable constants shared by both ledgers
///
/// Every field has a default, so a scenario file may omit the whole table or
/// override individual entries.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerParams {
    /// Lower bound for `P`; crossing it multiplies `P` by this factor and
    /// bumps the scale counter
    pub scale_factor: u128,

    /// Compounded principal below `principal / dust_divisor` reads as zero
    pub dust_divisor: u128,

    /// Maximum number of distinct collateral assets
    pub max_assets: usize,
}

impl Default for LedgerParams {
    fn default() -> Self {
        LedgerParams {
            scale_factor: SCALE_FACTOR,
            dust_divisor: DUST_DIVISOR,
            max_assets: MAX_ASSETS,
        }
    }
}

impl LedgerParams {
    pub fn validate(&self) -> Result<()> {
        // A re-based P is below scale_factor^2, which must stay within 1.0
        if self.scale_factor <= 1 || self.scale_factor > MAX_SCALE_FACTOR {
            return Err(LedgerError::InvalidParams(
                "scale_factor must lie in (1, 10^9]",
            ));
        }
        if self.dust_divisor == 0 {
            return Err(LedgerError::InvalidParams("dust_divisor must be non-zero"));
        }
        if self.max_assets == 0 {
            return Err(LedgerError::InvalidParams("max_assets must be non-zero"));
        }
        Ok(())
    }
}
