//! Stake-weighted redistribution ledger
//!
//! Debt and collateral that the stability pool could not absorb are spread
//! across every active position holding the same collateral asset, in
//! proportion to stake. Per asset the ledger keeps two running sums:
//!
//! ```text
//! L_coll[asset] += coll * SCALE / total_stake[asset]   (error-corrected)
//! L_debt[asset] += debt * SCALE / total_stake[asset]   (error-corrected)
//!
//! pending_coll(account) = stake * (L_coll - snapshot.L_coll) / SCALE
//! pending_debt(account) = stake * (L_debt - snapshot.L_debt) / SCALE
//! ```
//!
//! ## Stakes
//!
//! Stake is not raw collateral. After each liquidation batch the ledger
//! records `total_stake_snapshot` and `total_collateral_snapshot`; later
//! positions get `stake = coll * total_stake_snapshot / total_collateral_snapshot`
//! so that collateral already enlarged by past redistributions does not earn
//! a second share of them. Before the first liquidation, `stake = coll`.
//!
//! Stakes are always recomputed from the position's current collateral and
//! totals are adjusted by the delta. Pending rewards must be applied before a
//! stake changes; `update_stake` refuses otherwise.

use crate::{check_unique, AccountId, AssetId, LedgerError, LedgerParams, Result};
use ledger_math::{mul_div_floor, to_u128, wide, CorrectedRatio, MathError, DECIMAL_PRECISION, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Read access to the collateral held by active positions
///
/// Implemented by the position registry; the ledger only needs the per-asset
/// balance when it takes a system snapshot.
pub trait ActivePool {
    fn active_collateral(&self, asset: AssetId) -> u128;
}

impl ActivePool for BTreeMap<AssetId, u128> {
    fn active_collateral(&self, asset: AssetId) -> u128 {
        self.get(&asset).copied().unwrap_or(0)
    }
}

/// One collateral asset of a liquidated position handed to `redistribute`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralShare {
    pub asset: AssetId,

    /// Collateral amount to redistribute
    pub amount: u128,

    /// Value of `amount` in debt units, used to prorate the debt
    pub value: u128,
}

/// How much of a redistribution landed on one asset
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AssetPortion {
    pub asset: AssetId,
    pub collateral: u128,
    pub debt: u128,

    /// False when the asset had no stake and nothing was distributed
    pub distributed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedistributionOutcome {
    /// True when the call was a no-op (zero debt)
    pub skipped: bool,
    pub portions: Vec<AssetPortion>,
}

impl RedistributionOutcome {
    /// Portions left with the caller because no position could receive them
    pub fn undistributed(&self) -> impl Iterator<Item = &AssetPortion> {
        self.portions.iter().filter(|p| !p.distributed)
    }
}

/// Redistributed collateral and debt owed to a position for one asset
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PendingReward {
    pub asset: AssetId,
    pub collateral: u128,
    pub debt: u128,
}

/// A position's stake in one asset and its `L` snapshot
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StakeEntry {
    pub asset: AssetId,
    pub stake: u128,
    pub l_coll_snapshot: U256,
    pub l_debt_snapshot: U256,
}

#[derive(Clone, Debug)]
struct AssetStakes {
    asset: AssetId,
    l_coll: U256,
    l_debt: U256,
    last_coll_error: U256,
    last_debt_error: U256,
    total_stake: u128,
    total_stake_snapshot: u128,
    total_collateral_snapshot: u128,

    /// Redistributed to positions but not yet applied to them
    pending_coll: u128,
    pending_debt: u128,
}

impl AssetStakes {
    fn new(asset: AssetId) -> Self {
        AssetStakes {
            asset,
            l_coll: U256::zero(),
            l_debt: U256::zero(),
            last_coll_error: U256::zero(),
            last_debt_error: U256::zero(),
            total_stake: 0,
            total_stake_snapshot: 0,
            total_collateral_snapshot: 0,
            pending_coll: 0,
            pending_debt: 0,
        }
    }

    /// Stake for `coll` under the latest system snapshot
    ///
    /// A snapshot with no stakes (every holder closed while rounding dust
    /// sat in `pending_coll`) carries no ratio, so the stake restarts at `coll`.
    fn stake_for(&self, coll: u128) -> Result<u128> {
        if self.total_stake_snapshot == 0 || self.total_collateral_snapshot == 0 {
            return Ok(coll);
        }
        Ok(to_u128(mul_div_floor(
            wide(coll),
            wide(self.total_stake_snapshot),
            wide(self.total_collateral_snapshot),
        )?)?)
    }
}

/// Redistribution computed ahead of commit
struct StagedSums {
    index: usize,
    l_coll: U256,
    l_debt: U256,
    coll_error: U256,
    debt_error: U256,
    pending_coll: u128,
    pending_debt: u128,
}

/// The redistribution ledger
#[derive(Clone, Debug)]
pub struct RedistributionLedger {
    params: LedgerParams,
    assets: Vec<AssetStakes>,
    accounts: BTreeMap<AccountId, Vec<StakeEntry>>,
}

impl RedistributionLedger {
    pub fn new(params: LedgerParams) -> Result<Self> {
        params.validate()?;
        Ok(RedistributionLedger {
            params,
            assets: Vec::new(),
            accounts: BTreeMap::new(),
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    fn asset_index(&self, asset: AssetId) -> Option<usize> {
        self.assets.iter().position(|a| a.asset == asset)
    }

    fn asset(&self, asset: AssetId) -> Option<&AssetStakes> {
        self.asset_index(asset).map(|i| &self.assets[i])
    }

    pub fn assets(&self) -> impl Iterator<Item = AssetId> + '_ {
        self.assets.iter().map(|a| a.asset)
    }

    pub fn l_coll(&self, asset: AssetId) -> U256 {
        self.asset(asset).map(|a| a.l_coll).unwrap_or_default()
    }

    pub fn l_debt(&self, asset: AssetId) -> U256 {
        self.asset(asset).map(|a| a.l_debt).unwrap_or_default()
    }

    pub fn total_stake(&self, asset: AssetId) -> u128 {
        self.asset(asset).map(|a| a.total_stake).unwrap_or(0)
    }

    pub fn total_stake_snapshot(&self, asset: AssetId) -> u128 {
        self.asset(asset).map(|a| a.total_stake_snapshot).unwrap_or(0)
    }

    pub fn total_collateral_snapshot(&self, asset: AssetId) -> u128 {
        self.asset(asset)
            .map(|a| a.total_collateral_snapshot)
            .unwrap_or(0)
    }

    /// Redistributed collateral not yet applied to any position
    pub fn pending_collateral(&self, asset: AssetId) -> u128 {
        self.asset(asset).map(|a| a.pending_coll).unwrap_or(0)
    }

    /// Redistributed debt not yet applied to any position
    pub fn pending_debt(&self, asset: AssetId) -> u128 {
        self.asset(asset).map(|a| a.pending_debt).unwrap_or(0)
    }

    pub fn stakes_of(&self, account: AccountId) -> &[StakeEntry] {
        self.accounts
            .get(&account)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn stake_of(&self, account: AccountId, asset: AssetId) -> u128 {
        self.stakes_of(account)
            .iter()
            .find(|e| e.asset == asset)
            .map(|e| e.stake)
            .unwrap_or(0)
    }

    pub fn register_asset(&mut self, asset: AssetId) -> Result<()> {
        if self.asset_index(asset).is_some() {
            return Ok(());
        }
        if self.assets.len() >= self.params.max_assets {
            return Err(LedgerError::TooManyAssets(self.params.max_assets));
        }
        self.assets.push(AssetStakes::new(asset));
        Ok(())
    }

    // ========================================================================
    // Redistribution
    // ========================================================================

    /// Spread `debt` and the given collateral over all active stakes
    ///
    /// The debt is prorated across assets by `value / total_value`; the last
    /// share takes the rounding remainder so the portions sum to `debt`. An
    /// asset with zero total stake is skipped and reported back as
    /// undistributed.
    ///
    /// # Errors
    /// - Precondition: empty or duplicated shares, zero total value
    pub fn redistribute(
        &mut self,
        debt: u128,
        shares: &[CollateralShare],
    ) -> Result<RedistributionOutcome> {
        if debt == 0 {
            log::debug!("redistribution skipped: zero debt");
            return Ok(RedistributionOutcome {
                skipped: true,
                portions: Vec::new(),
            });
        }
        if shares.is_empty() {
            return Err(LedgerError::EmptyAssetList);
        }
        check_unique(shares.iter().map(|s| s.asset))?;

        let total_value = shares
            .iter()
            .try_fold(0u128, |acc, s| acc.checked_add(s.value))
            .ok_or(MathError::Overflow)?;
        if total_value == 0 {
            return Err(LedgerError::ZeroCollateralValue);
        }

        let mut assigned = 0u128;
        let mut staged = Vec::with_capacity(shares.len());
        let mut portions = Vec::with_capacity(shares.len());

        for (n, share) in shares.iter().enumerate() {
            let portion = if n + 1 == shares.len() {
                debt - assigned
            } else {
                to_u128(mul_div_floor(
                    wide(debt),
                    wide(share.value),
                    wide(total_value),
                )?)?
            };
            assigned += portion;

            let target = self
                .asset_index(share.asset)
                .filter(|&i| self.assets[i].total_stake > 0);
            let Some(index) = target else {
                log::warn!(
                    "{} has no active stake; {} collateral and {} debt left undistributed",
                    share.asset,
                    share.amount,
                    portion
                );
                portions.push(AssetPortion {
                    asset: share.asset,
                    collateral: share.amount,
                    debt: portion,
                    distributed: false,
                });
                continue;
            };

            let a = &self.assets[index];
            let coll = CorrectedRatio::compute(share.amount, a.last_coll_error, wide(1), a.total_stake)?;
            let owed = CorrectedRatio::compute(portion, a.last_debt_error, wide(1), a.total_stake)?;

            staged.push(StagedSums {
                index,
                l_coll: a.l_coll.checked_add(coll.per_unit).ok_or(MathError::Overflow)?,
                l_debt: a.l_debt.checked_add(owed.per_unit).ok_or(MathError::Overflow)?,
                coll_error: coll.error,
                debt_error: owed.error,
                pending_coll: a.pending_coll.checked_add(share.amount).ok_or(MathError::Overflow)?,
                pending_debt: a.pending_debt.checked_add(portion).ok_or(MathError::Overflow)?,
            });
            portions.push(AssetPortion {
                asset: share.asset,
                collateral: share.amount,
                debt: portion,
                distributed: true,
            });
        }

        for s in staged {
            let a = &mut self.assets[s.index];
            log::debug!(
                "redistributed to {}: L_coll {} -> {}, L_debt {} -> {}",
                a.asset,
                a.l_coll,
                s.l_coll,
                a.l_debt,
                s.l_debt
            );
            a.l_coll = s.l_coll;
            a.l_debt = s.l_debt;
            a.last_coll_error = s.coll_error;
            a.last_debt_error = s.debt_error;
            a.pending_coll = s.pending_coll;
            a.pending_debt = s.pending_debt;
        }

        Ok(RedistributionOutcome {
            skipped: false,
            portions,
        })
    }

    // ========================================================================
    // Position rewards and stakes
    // ========================================================================

    /// Redistributed collateral and debt owed to a position since its last
    /// snapshot; assets with no `L` movement are omitted
    pub fn pending_rewards(&self, account: AccountId) -> Result<Vec<PendingReward>> {
        let mut rewards = Vec::new();
        for entry in self.stakes_of(account) {
            if let Some(reward) = self.reward_for(entry)? {
                rewards.push(reward);
            }
        }
        Ok(rewards)
    }

    fn reward_for(&self, entry: &StakeEntry) -> Result<Option<PendingReward>> {
        let a = self
            .asset(entry.asset)
            .ok_or(LedgerError::UnknownAsset(entry.asset))?;
        let coll_delta = a
            .l_coll
            .checked_sub(entry.l_coll_snapshot)
            .ok_or(MathError::Underflow)?;
        let debt_delta = a
            .l_debt
            .checked_sub(entry.l_debt_snapshot)
            .ok_or(MathError::Underflow)?;
        if coll_delta.is_zero() && debt_delta.is_zero() {
            return Ok(None);
        }

        let scale = wide(DECIMAL_PRECISION);
        Ok(Some(PendingReward {
            asset: entry.asset,
            collateral: to_u128(mul_div_floor(wide(entry.stake), coll_delta, scale)?)?,
            debt: to_u128(mul_div_floor(wide(entry.stake), debt_delta, scale)?)?,
        }))
    }

    /// Hand a position its pending rewards and re-snapshot `L`
    ///
    /// The returned amounts must be merged into the position's recorded
    /// collateral and debt by the caller.
    pub fn apply_pending_rewards(&mut self, account: AccountId) -> Result<Vec<PendingReward>> {
        let rewards = self.pending_rewards(account)?;

        let mut pending = Vec::with_capacity(rewards.len());
        for r in &rewards {
            let i = self
                .asset_index(r.asset)
                .ok_or(LedgerError::UnknownAsset(r.asset))?;
            let a = &self.assets[i];
            pending.push((
                i,
                a.pending_coll.saturating_sub(r.collateral),
                a.pending_debt.saturating_sub(r.debt),
            ));
        }

        for (i, coll, debt) in pending {
            self.assets[i].pending_coll = coll;
            self.assets[i].pending_debt = debt;
        }
        self.refresh_snapshots(account);

        if !rewards.is_empty() {
            log::debug!("{} applied {} pending rewards", account, rewards.len());
        }
        Ok(rewards)
    }

    fn refresh_snapshots(&mut self, account: AccountId) {
        let Some(entries) = self.accounts.get_mut(&account) else {
            return;
        };
        for entry in entries.iter_mut() {
            if let Some(a) = self.assets.iter().find(|a| a.asset == entry.asset) {
                entry.l_coll_snapshot = a.l_coll;
                entry.l_debt_snapshot = a.l_debt;
            }
        }
    }

    fn has_unapplied(&self, entries: &[StakeEntry]) -> bool {
        entries.iter().any(|e| {
            e.stake > 0
                && self
                    .asset(e.asset)
                    .is_some_and(|a| a.l_coll != e.l_coll_snapshot || a.l_debt != e.l_debt_snapshot)
        })
    }

    /// Recompute a position's stakes from its current collateral
    ///
    /// # Arguments
    /// * `collateral` - `(asset, amount)` for every asset the position holds;
    ///   assets left out (or with zero amount) drop to zero stake
    ///
    /// # Errors
    /// - `UnappliedRewards` if the position still has pending rewards
    /// - `DuplicateAsset`, `TooManyAssets`
    pub fn update_stake(&mut self, account: AccountId, collateral: &[(AssetId, u128)]) -> Result<()> {
        check_unique(collateral.iter().map(|(asset, _)| *asset))?;

        let old = self.stakes_of(account);
        if self.has_unapplied(old) {
            return Err(LedgerError::UnappliedRewards(account));
        }

        let mut new_assets: Vec<AssetId> = Vec::new();
        for &(asset, amount) in collateral {
            if amount > 0 && self.asset_index(asset).is_none() {
                new_assets.push(asset);
            }
        }
        if self.assets.len() + new_assets.len() > self.params.max_assets {
            return Err(LedgerError::TooManyAssets(self.params.max_assets));
        }

        let index_of = |asset: AssetId| {
            self.asset_index(asset)
                .or_else(|| {
                    new_assets
                        .iter()
                        .position(|a| *a == asset)
                        .map(|p| self.assets.len() + p)
                })
                .ok_or(LedgerError::UnknownAsset(asset))
        };

        let mut totals: Vec<u128> = self.assets.iter().map(|a| a.total_stake).collect();
        totals.resize(self.assets.len() + new_assets.len(), 0);

        for e in old {
            let i = index_of(e.asset)?;
            totals[i] = totals[i].checked_sub(e.stake).ok_or(MathError::Underflow)?;
        }

        let mut entries = Vec::with_capacity(collateral.len());
        for &(asset, amount) in collateral {
            if amount == 0 {
                continue;
            }
            let i = index_of(asset)?;
            let (stake, l_coll, l_debt) = match self.assets.get(i) {
                Some(a) => (a.stake_for(amount)?, a.l_coll, a.l_debt),
                None => (amount, U256::zero(), U256::zero()),
            };
            totals[i] = totals[i].checked_add(stake).ok_or(MathError::Overflow)?;
            entries.push(StakeEntry {
                asset,
                stake,
                l_coll_snapshot: l_coll,
                l_debt_snapshot: l_debt,
            });
        }

        for asset in new_assets {
            self.assets.push(AssetStakes::new(asset));
        }
        for (a, total) in self.assets.iter_mut().zip(totals) {
            a.total_stake = total;
        }
        log::trace!("{} stakes updated: {:?}", account, entries);
        if entries.is_empty() {
            self.accounts.remove(&account);
        } else {
            self.accounts.insert(account, entries);
        }
        Ok(())
    }

    /// Drop every stake of a closed position
    pub fn remove_stake(&mut self, account: AccountId) -> Result<()> {
        if !self.accounts.contains_key(&account) {
            return Err(LedgerError::UnknownAccount(account));
        }
        self.update_stake(account, &[])
    }

    /// Record the stake basis after a liquidation batch
    ///
    /// For every registered asset:
    /// `total_stake_snapshot = total_stake` and
    /// `total_collateral_snapshot = active - excluded_remainder + pending_coll`.
    ///
    /// # Arguments
    /// * `pool` - Active collateral per asset, from the position registry
    /// * `excluded` - `(asset, remainder)` still held in the active pool but
    ///   not backing any position (e.g. surplus awaiting a claim)
    pub fn take_system_snapshot<P: ActivePool>(
        &mut self,
        pool: &P,
        excluded: &[(AssetId, u128)],
    ) -> Result<()> {
        check_unique(excluded.iter().map(|(asset, _)| *asset))?;
        if let Some((asset, _)) = excluded.iter().find(|(a, _)| self.asset_index(*a).is_none()) {
            return Err(LedgerError::UnknownAsset(*asset));
        }

        let mut staged = Vec::with_capacity(self.assets.len());
        for a in &self.assets {
            let remainder = excluded
                .iter()
                .find(|(asset, _)| *asset == a.asset)
                .map(|(_, r)| *r)
                .unwrap_or(0);
            let collateral = pool
                .active_collateral(a.asset)
                .checked_sub(remainder)
                .ok_or(MathError::Underflow)?
                .checked_add(a.pending_coll)
                .ok_or(MathError::Overflow)?;
            staged.push((a.total_stake, collateral));
        }

        for (a, (stakes, collateral)) in self.assets.iter_mut().zip(staged) {
            a.total_stake_snapshot = stakes;
            a.total_collateral_snapshot = collateral;
            log::debug!(
                "{} system snapshot: stakes={} collateral={}",
                a.asset,
                stakes,
                collateral
            );
        }
        Ok(())
    }
}
