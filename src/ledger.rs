//! Stability pool and redistribution ledger with O(1) liquidation accounting
//!
//! When a debt position is liquidated its debt and collateral have to be
//! shared out among many accounts. Iterating over those accounts is not an
//! option, so both ledgers here keep running accumulators plus a per-account
//! snapshot, and every account computes its own entitlement from the
//! difference.
//!
//! - [`DistributionAccumulator`]: the stability pool. Depositors absorb debt
//!   (their principal shrinks by the product `P`) and receive the liquidated
//!   collateral (gains accrue through the sums `S[asset][epoch][scale]`).
//! - [`RedistributionLedger`]: debt and collateral that the pool could not
//!   absorb are spread over the remaining active positions, weighted by stake,
//!   through the running sums `L_coll[asset]` and `L_debt[asset]`.
//!
//! ## Event flow
//!
//! ```text
//! Liquidation (external trigger):
//! 1. offset(debt_to_offset, assets, amounts)        -> stability pool
//! 2. redistribute(debt_remaining, shares)           -> active positions
//! 3. take_system_snapshot(active_pool, remainders)  -> stake basis
//! [O(assets) per event, independent of account count]
//!
//! Account touch:
//! 1. gains / compounded_principal / pending_rewards (pure reads)
//! 2. pay out, then update_and_snapshot / apply_pending_rewards + update_stake
//! ```
//!
//! All mutating entry points take `&mut self` and either complete or return
//! an error with the ledger unchanged.

mod accumulator;
mod params;
mod redistribution;

#[cfg(test)]
mod tests;

#[cfg(kani)]
mod kani_proofs;

use core::fmt;
use serde::{Deserialize, Serialize};

pub use accumulator::{
    AssetGain, Deposit, DepositOutcome, DepositSnapshot, DistributionAccumulator, OffsetOutcome,
    WithdrawOutcome,
};
pub use ledger_math::{mul_div_floor, to_u128, wide, MathError, DECIMAL_PRECISION, U256};
pub use params::LedgerParams;
pub use redistribution::{
    ActivePool, AssetPortion, CollateralShare, PendingReward, RedistributionLedger,
    RedistributionOutcome, StakeEntry,
};

// ============================================================================
// Constants
// ============================================================================

/// Re-basing multiplier applied to `P` when it would drop below this value
pub const SCALE_FACTOR: u128 = 1_000_000_000;

/// Compounded principal below `principal / DUST_DIVISOR` is reported as 0
pub const DUST_DIVISOR: u128 = 1_000_000_000;

/// Default number of distinct collateral assets a ledger will track
pub const MAX_ASSETS: usize = 32;

// ============================================================================
// Identifiers
// ============================================================================

/// Collateral asset identifier
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub u32);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset#{}", self.0)
    }
}

/// Depositor or position owner identifier
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "account#{}", self.0)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Ledger errors
///
/// Two families: invariant violations, which must never happen under correct
/// callers and abort the enclosing transaction, and precondition failures,
/// which report a caller mistake. Benign no-ops (zero amounts, assets without
/// stake) are `Ok` results, never errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Debt handed to the pool exceeds what depositors hold
    #[error("debt to offset {debt} exceeds total principal {total}")]
    OffsetExceedsPrincipal { debt: u128, total: u128 },

    /// Product P would be stored as zero
    #[error("product P would reach zero")]
    ProductUnderflow,

    /// Loss per unit of principal above 100%
    #[error("loss ratio {ratio} exceeds 100%")]
    LossRatioAboveUnit { ratio: u128 },

    /// Arithmetic failure inside an accumulator update
    #[error("ledger arithmetic failed: {0}")]
    Math(#[from] MathError),

    /// Parallel asset/amount lists differ in length
    #[error("{assets} assets but {amounts} amounts")]
    LengthMismatch { assets: usize, amounts: usize },

    /// No assets given where at least one is required
    #[error("asset list is empty")]
    EmptyAssetList,

    /// Asset id appears twice in one call
    #[error("{0} listed more than once")]
    DuplicateAsset(AssetId),

    /// Asset id never seen by this ledger
    #[error("{0} is not registered")]
    UnknownAsset(AssetId),

    /// Account has no principal
    #[error("{0} has no principal")]
    ZeroPrincipal(AccountId),

    /// Account has no state in this ledger
    #[error("{0} not found")]
    UnknownAccount(AccountId),

    /// Deposit or withdrawal of nothing
    #[error("amount must be non-zero")]
    ZeroAmount,

    /// Stake change attempted while redistribution rewards are still pending
    #[error("{0} has unapplied redistribution rewards")]
    UnappliedRewards(AccountId),

    /// Redistributed collateral carries no value to prorate debt by
    #[error("redistributed collateral has zero total value")]
    ZeroCollateralValue,

    /// Asset registry is full
    #[error("asset capacity {0} exhausted")]
    TooManyAssets(usize),

    /// Parameter outside its valid range
    #[error("invalid ledger parameter: {0}")]
    InvalidParams(&'static str),
}

impl LedgerError {
    /// True for errors that indicate a broken ledger invariant rather than a
    /// caller mistake
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            LedgerError::OffsetExceedsPrincipal { .. }
                | LedgerError::ProductUnderflow
                | LedgerError::LossRatioAboveUnit { .. }
                | LedgerError::Math(_)
        )
    }
}

pub type Result<T> = core::result::Result<T, LedgerError>;

/// Validate a parallel asset/amount input: equal lengths, non-empty, unique ids
pub(crate) fn check_asset_list(assets: &[AssetId], amounts: usize) -> Result<()> {
    if assets.len() != amounts {
        return Err(LedgerError::LengthMismatch {
            assets: assets.len(),
            amounts,
        });
    }
    if assets.is_empty() {
        return Err(LedgerError::EmptyAssetList);
    }
    check_unique(assets.iter().copied())
}

pub(crate) fn check_unique(assets: impl Iterator<Item = AssetId> + Clone) -> Result<()> {
    for (i, asset) in assets.clone().enumerate() {
        if assets.clone().take(i).any(|seen| seen == asset) {
            return Err(LedgerError::DuplicateAsset(asset));
        }
    }
    Ok(())
}
