//! Stability pool accumulator: product `P`, sums `S`, epochs and scales
//!
//! Depositors pool principal that absorbs liquidated debt. Instead of touching
//! every deposit on each liquidation, the pool keeps:
//!
//! - `P`: the running product of `(1 - loss)` factors. A deposit snapshotted
//!   at `P0` is now worth `principal * P / P0`.
//! - `S[asset][epoch][scale]`: the running sum of collateral gained per unit
//!   of principal, already multiplied by the `P` in force at each event. A
//!   deposit's gain is `principal * (S - S0) / P0`.
//!
//! ## Epochs and scales
//!
//! ```text
//! factor = 1 - loss
//! factor == 0             -> epoch += 1, scale = 0, P = 1.0   (pool emptied)
//! P * factor < SCALE_FACTOR -> P = P * factor * SCALE_FACTOR, scale += 1
//! otherwise               -> P = P * factor
//! ```
//!
//! A full depletion is the only point where `P` is reset; everything
//! deposited before it is worth zero afterwards. The scale shift keeps `P`
//! away from zero; a deposit that has lived through two or more shifts has
//! decayed below the precision floor and also reads as zero.
//!
//! ## Invariants
//!
//! 1. `0 < P <= 1.0` at all times
//! 2. `S` within one (epoch, scale) never decreases
//! 3. Entries of `S` for an older (epoch, scale) are never written again
//! 4. `sum(compounded principal) <= total_principal` up to one principal-scaled
//!    rounding unit per offset

use crate::{check_asset_list, AccountId, AssetId, LedgerError, LedgerParams, Result};
use ledger_math::{
    min, mul_div_floor, to_u128, wide, CorrectedRatio, LossRatio, MathError, DECIMAL_PRECISION,
    U256,
};
use std::collections::BTreeMap;

/// Append-only sum log for one collateral asset
///
/// `sums[epoch][scale]` holds `S` for that (epoch, scale). Rows are created
/// lazily; a missing entry reads as zero.
#[derive(Clone, Debug)]
struct AssetSums {
    asset: AssetId,
    sums: Vec<Vec<U256>>,
    last_error: U256,
    balance: u128,
}

impl AssetSums {
    fn new(asset: AssetId) -> Self {
        AssetSums {
            asset,
            sums: Vec::new(),
            last_error: U256::zero(),
            balance: 0,
        }
    }

    fn get(&self, epoch: u64, scale: u64) -> U256 {
        self.sums
            .get(epoch as usize)
            .and_then(|row| row.get(scale as usize))
            .copied()
            .unwrap_or_default()
    }

    fn set(&mut self, epoch: u64, scale: u64, value: U256) {
        let (e, s) = (epoch as usize, scale as usize);
        if self.sums.len() <= e {
            self.sums.resize_with(e + 1, Vec::new);
        }
        let row = &mut self.sums[e];
        if row.len() <= s {
            row.resize(s + 1, U256::zero());
        }
        row[s] = value;
    }
}

/// Global values captured when a deposit was last written
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DepositSnapshot {
    /// `P` at snapshot time
    pub product: u128,

    /// `S[asset][epoch][scale]` per registered asset, in registry order
    pub sums: Vec<U256>,

    pub epoch: u64,
    pub scale: u64,
}

/// A depositor's recorded principal and snapshot
///
/// A zero principal is stored with an all-zero snapshot (tombstone).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Deposit {
    pub principal: u128,
    pub snapshot: DepositSnapshot,
}

/// Collateral gain for one asset
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AssetGain {
    pub asset: AssetId,
    pub amount: u128,
}

/// Result of an `offset` call
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OffsetOutcome {
    /// True when the call was a no-op (zero debt or empty pool)
    pub skipped: bool,

    /// Loss per unit of principal applied (SCALE = 100%)
    pub loss_ratio: u128,

    /// `P` after the update
    pub product: u128,

    pub epoch: u64,
    pub scale: u64,
    pub epoch_advanced: bool,
    pub scale_advanced: bool,
}

/// Result of a deposit
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositOutcome {
    /// Collateral gains paid out before the new snapshot
    pub gains: Vec<AssetGain>,

    /// Compounded principal before this deposit
    pub compounded_before: u128,

    /// Recorded principal after this deposit
    pub principal: u128,
}

/// Result of a withdrawal
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithdrawOutcome {
    pub gains: Vec<AssetGain>,

    /// Principal actually withdrawn (capped at the compounded principal)
    pub withdrawn: u128,

    /// Recorded principal left behind
    pub principal: u128,
}

/// Collateral gain computed ahead of an offset commit
struct StagedGain {
    asset: AssetId,
    index: Option<usize>,
    ratio: CorrectedRatio,
    sum: U256,
    balance: u128,
}

/// The stability pool ledger
#[derive(Clone, Debug)]
pub struct DistributionAccumulator {
    params: LedgerParams,

    /// Running product, `0 < product <= DECIMAL_PRECISION`
    product: u128,

    current_epoch: u64,
    current_scale: u64,

    /// Recorded principal across all deposits
    total_principal: u128,

    last_principal_loss_error: u128,

    /// Registered assets, in first-seen order
    assets: Vec<AssetSums>,

    deposits: BTreeMap<AccountId, Deposit>,
}

impl DistributionAccumulator {
    pub fn new(params: LedgerParams) -> Result<Self> {
        params.validate()?;
        Ok(DistributionAccumulator {
            params,
            product: DECIMAL_PRECISION,
            current_epoch: 0,
            current_scale: 0,
            total_principal: 0,
            last_principal_loss_error: 0,
            assets: Vec::new(),
            deposits: BTreeMap::new(),
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn params(&self) -> &LedgerParams {
        &self.params
    }

    pub fn product(&self) -> u128 {
        self.product
    }

    pub fn epoch(&self) -> u64 {
        self.current_epoch
    }

    pub fn scale(&self) -> u64 {
        self.current_scale
    }

    pub fn total_principal(&self) -> u128 {
        self.total_principal
    }

    pub fn last_principal_loss_error(&self) -> u128 {
        self.last_principal_loss_error
    }

    /// Registered assets in registry order
    pub fn assets(&self) -> impl Iterator<Item = AssetId> + '_ {
        self.assets.iter().map(|a| a.asset)
    }

    /// `S[asset][epoch][scale]`, zero if never written
    pub fn sum_at(&self, asset: AssetId, epoch: u64, scale: u64) -> U256 {
        self.asset_index(asset)
            .map(|i| self.assets[i].get(epoch, scale))
            .unwrap_or_default()
    }

    /// Carried gain remainder for `asset`
    pub fn asset_error(&self, asset: AssetId) -> U256 {
        self.asset_index(asset)
            .map(|i| self.assets[i].last_error)
            .unwrap_or_default()
    }

    /// Collateral received by the pool and not yet paid out
    pub fn asset_balance(&self, asset: AssetId) -> u128 {
        self.asset_index(asset)
            .map(|i| self.assets[i].balance)
            .unwrap_or(0)
    }

    pub fn deposit_of(&self, account: AccountId) -> Option<&Deposit> {
        self.deposits.get(&account)
    }

    pub fn accounts(&self) -> impl Iterator<Item = AccountId> + '_ {
        self.deposits.keys().copied()
    }

    fn asset_index(&self, asset: AssetId) -> Option<usize> {
        self.assets.iter().position(|a| a.asset == asset)
    }

    /// Register `asset` ahead of its first offset
    pub fn register_asset(&mut self, asset: AssetId) -> Result<()> {
        if self.asset_index(asset).is_some() {
            return Ok(());
        }
        if self.assets.len() >= self.params.max_assets {
            return Err(LedgerError::TooManyAssets(self.params.max_assets));
        }
        self.assets.push(AssetSums::new(asset));
        Ok(())
    }

    // ========================================================================
    // Liquidation offset
    // ========================================================================

    /// Absorb `debt` into the pool and distribute the liquidated collateral
    ///
    /// # Arguments
    /// * `debt` - Debt cancelled against depositor principal (`<= total_principal`)
    /// * `assets` - Collateral asset ids, unique within the call
    /// * `amounts` - Collateral amounts, parallel to `assets`
    ///
    /// # Returns
    /// The applied loss ratio and the new `P`/epoch/scale. A zero `debt` or an
    /// empty pool is a no-op and returns `skipped = true`.
    ///
    /// # Errors
    /// - Precondition: mismatched, empty or duplicated asset lists
    /// - Invariant: `debt > total_principal`, loss above 100%, `P` reaching zero
    pub fn offset(
        &mut self,
        debt: u128,
        assets: &[AssetId],
        amounts: &[u128],
    ) -> Result<OffsetOutcome> {
        check_asset_list(assets, amounts.len())?;

        if self.total_principal == 0 || debt == 0 {
            log::debug!(
                "offset skipped: debt={} total_principal={}",
                debt,
                self.total_principal
            );
            return Ok(self.outcome(true, 0, false, false));
        }

        if debt > self.total_principal {
            return Err(LedgerError::OffsetExceedsPrincipal {
                debt,
                total: self.total_principal,
            });
        }

        let new_assets = assets
            .iter()
            .filter(|a| self.asset_index(**a).is_none())
            .count();
        if self.assets.len() + new_assets > self.params.max_assets {
            return Err(LedgerError::TooManyAssets(self.params.max_assets));
        }

        // Gains use the P in force before this event's depletion
        let weight = wide(self.product);
        let mut staged = Vec::with_capacity(assets.len());
        for (&asset, &amount) in assets.iter().zip(amounts) {
            let index = self.asset_index(asset);
            let (carried, current, balance) = match index {
                Some(i) => {
                    let a = &self.assets[i];
                    (a.last_error, a.get(self.current_epoch, self.current_scale), a.balance)
                }
                None => (U256::zero(), U256::zero(), 0),
            };
            let ratio = CorrectedRatio::compute(amount, carried, weight, self.total_principal)?;
            staged.push(StagedGain {
                asset,
                index,
                ratio,
                sum: current.checked_add(ratio.per_unit).ok_or(MathError::Overflow)?,
                balance: balance.checked_add(amount).ok_or(MathError::Overflow)?,
            });
        }

        let loss = LossRatio::compute(debt, self.total_principal, self.last_principal_loss_error)?;
        if loss.ratio > DECIMAL_PRECISION {
            return Err(LedgerError::LossRatioAboveUnit { ratio: loss.ratio });
        }

        let (product, epoch, scale) = self.next_product(DECIMAL_PRECISION - loss.ratio)?;
        if product == 0 {
            return Err(LedgerError::ProductUnderflow);
        }

        // Commit: S first at the pre-event (epoch, scale), then P
        for gain in staged {
            let i = match gain.index {
                Some(i) => i,
                None => {
                    self.assets.push(AssetSums::new(gain.asset));
                    self.assets.len() - 1
                }
            };
            let entry = &mut self.assets[i];
            entry.set(self.current_epoch, self.current_scale, gain.sum);
            entry.last_error = gain.ratio.error;
            entry.balance = gain.balance;
        }

        let epoch_advanced = epoch != self.current_epoch;
        let scale_advanced = !epoch_advanced && scale != self.current_scale;

        log::debug!(
            "offset debt={} total_principal={} loss_ratio={} P {} -> {}",
            debt,
            self.total_principal,
            loss.ratio,
            self.product,
            product
        );
        if epoch_advanced {
            log::info!("stability pool emptied, starting epoch {}", epoch);
        } else if scale_advanced {
            log::info!("product re-based, scale {} -> {}", self.current_scale, scale);
        }

        self.product = product;
        self.current_epoch = epoch;
        self.current_scale = scale;
        self.last_principal_loss_error = loss.error;
        self.total_principal -= debt;

        Ok(self.outcome(false, loss.ratio, epoch_advanced, scale_advanced))
    }

    /// New (P, epoch, scale) for a product factor, without committing
    fn next_product(&self, factor: u128) -> Result<(u128, u64, u64)> {
        if factor == 0 {
            let epoch = self
                .current_epoch
                .checked_add(1)
                .ok_or(MathError::Overflow)?;
            return Ok((DECIMAL_PRECISION, epoch, 0));
        }

        let scaled = wide(self.product)
            .checked_mul(wide(factor))
            .ok_or(MathError::Overflow)?;
        let shrunk = scaled / wide(DECIMAL_PRECISION);

        if shrunk < wide(self.params.scale_factor) {
            let rescaled = mul_div_floor(
                scaled,
                wide(self.params.scale_factor),
                wide(DECIMAL_PRECISION),
            )?;
            let scale = self
                .current_scale
                .checked_add(1)
                .ok_or(MathError::Overflow)?;
            Ok((to_u128(rescaled)?, self.current_epoch, scale))
        } else {
            Ok((to_u128(shrunk)?, self.current_epoch, self.current_scale))
        }
    }

    fn outcome(
        &self,
        skipped: bool,
        loss_ratio: u128,
        epoch_advanced: bool,
        scale_advanced: bool,
    ) -> OffsetOutcome {
        OffsetOutcome {
            skipped,
            loss_ratio,
            product: self.product,
            epoch: self.current_epoch,
            scale: self.current_scale,
            epoch_advanced,
            scale_advanced,
        }
    }

    // ========================================================================
    // Account queries
    // ========================================================================

    /// Current value of an account's principal after all absorbed debt
    ///
    /// Zero for unknown or tombstoned accounts, for deposits from an earlier
    /// epoch, for deposits that have seen two or more scale shifts, and for
    /// anything below `principal / dust_divisor`.
    pub fn compounded_principal(&self, account: AccountId) -> Result<u128> {
        match self.deposits.get(&account) {
            Some(d) if d.principal > 0 => self.compound(d),
            _ => Ok(0),
        }
    }

    fn compound(&self, deposit: &Deposit) -> Result<u128> {
        let snap = &deposit.snapshot;
        if snap.epoch < self.current_epoch {
            return Ok(0);
        }

        let divisor = match self.current_scale.saturating_sub(snap.scale) {
            0 => wide(snap.product),
            1 => wide(snap.product)
                .checked_mul(wide(self.params.scale_factor))
                .ok_or(MathError::Overflow)?,
            _ => return Ok(0),
        };

        let compounded = to_u128(mul_div_floor(
            wide(deposit.principal),
            wide(self.product),
            divisor,
        )?)?;

        // Dust floor: kept as policy even though the loss rounding already
        // favors the pool
        if compounded < deposit.principal / self.params.dust_divisor {
            return Ok(0);
        }
        Ok(compounded)
    }

    /// Collateral gains accrued since the account's snapshot, one entry per
    /// registered asset in registry order
    ///
    /// Accrual is followed across at most one scale shift after the snapshot,
    /// matching the span in which the principal itself is non-dust.
    pub fn gains(&self, account: AccountId) -> Result<Vec<AssetGain>> {
        let deposit = match self.deposits.get(&account) {
            Some(d) if d.principal > 0 => d,
            _ => {
                return Ok(self
                    .assets
                    .iter()
                    .map(|a| AssetGain {
                        asset: a.asset,
                        amount: 0,
                    })
                    .collect())
            }
        };

        let snap = &deposit.snapshot;
        self.assets
            .iter()
            .enumerate()
            .map(|(i, sums)| -> Result<AssetGain> {
                let at_snapshot = snap.sums.get(i).copied().unwrap_or_default();
                let first = sums
                    .get(snap.epoch, snap.scale)
                    .checked_sub(at_snapshot)
                    .ok_or(MathError::Underflow)?;
                let second =
                    sums.get(snap.epoch, snap.scale + 1) / wide(self.params.scale_factor);
                let per_unit = first.checked_add(second).ok_or(MathError::Overflow)?;

                let gain = mul_div_floor(wide(deposit.principal), per_unit, wide(snap.product))?
                    / wide(DECIMAL_PRECISION);
                Ok(AssetGain {
                    asset: sums.asset,
                    amount: to_u128(gain)?,
                })
            })
            .collect()
    }

    /// Gain for a single asset (zero if the asset is unknown)
    pub fn gain_of(&self, account: AccountId, asset: AssetId) -> Result<u128> {
        Ok(self
            .gains(account)?
            .into_iter()
            .find(|g| g.asset == asset)
            .map(|g| g.amount)
            .unwrap_or(0))
    }

    // ========================================================================
    // Account updates
    // ========================================================================

    /// Overwrite an account's principal and take a fresh snapshot
    ///
    /// Gains must be paid by the caller beforehand; they are forfeited
    /// otherwise. `total_principal` moves by `new_principal - compounded`.
    /// A zero `new_principal` writes a tombstone.
    pub fn update_and_snapshot(&mut self, account: AccountId, new_principal: u128) -> Result<()> {
        let old = self.compounded_principal(account)?;
        let total = self
            .total_principal
            .checked_add(new_principal)
            .ok_or(MathError::Overflow)?
            .checked_sub(old)
            .ok_or(MathError::Underflow)?;

        self.total_principal = total;
        self.write_snapshot(account, new_principal);
        Ok(())
    }

    /// Add `amount` to an account's compounded principal, paying out gains
    pub fn deposit(&mut self, account: AccountId, amount: u128) -> Result<DepositOutcome> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        let gains = self.gains(account)?;
        let compounded = self.compounded_principal(account)?;
        let principal = compounded.checked_add(amount).ok_or(MathError::Overflow)?;
        let total = self
            .total_principal
            .checked_add(amount)
            .ok_or(MathError::Overflow)?;
        let (paid, balances) = self.settle(&gains);

        self.commit_balances(balances);
        self.total_principal = total;
        self.write_snapshot(account, principal);

        log::debug!(
            "{} deposited {} (compounded {} -> principal {})",
            account,
            amount,
            compounded,
            principal
        );
        Ok(DepositOutcome {
            gains: paid,
            compounded_before: compounded,
            principal,
        })
    }

    /// Withdraw up to `amount` of an account's compounded principal, paying
    /// out gains
    ///
    /// The withdrawal is capped at the compounded principal, so a depleted
    /// deposit can still be withdrawn to collect its gains.
    pub fn withdraw(&mut self, account: AccountId, amount: u128) -> Result<WithdrawOutcome> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let recorded = self
            .deposits
            .get(&account)
            .ok_or(LedgerError::UnknownAccount(account))?
            .principal;
        if recorded == 0 {
            return Err(LedgerError::ZeroPrincipal(account));
        }

        let gains = self.gains(account)?;
        let compounded = self.compounded_principal(account)?;
        let withdrawn = min(min(amount, compounded), self.total_principal);
        let principal = compounded - withdrawn;
        let (paid, balances) = self.settle(&gains);

        self.commit_balances(balances);
        self.total_principal -= withdrawn;
        self.write_snapshot(account, principal);

        log::debug!(
            "{} withdrew {} (compounded {} -> principal {})",
            account,
            withdrawn,
            compounded,
            principal
        );
        Ok(WithdrawOutcome {
            gains: paid,
            withdrawn,
            principal,
        })
    }

    /// Gains capped at the pool's balance, and the balances left afterwards
    fn settle(&self, gains: &[AssetGain]) -> (Vec<AssetGain>, Vec<u128>) {
        let mut balances: Vec<u128> = self.assets.iter().map(|a| a.balance).collect();
        let paid = gains
            .iter()
            .zip(balances.iter_mut())
            .map(|(gain, balance)| {
                let amount = min(gain.amount, *balance);
                *balance -= amount;
                AssetGain {
                    asset: gain.asset,
                    amount,
                }
            })
            .collect();
        (paid, balances)
    }

    fn commit_balances(&mut self, balances: Vec<u128>) {
        for (entry, balance) in self.assets.iter_mut().zip(balances) {
            entry.balance = balance;
        }
    }

    fn write_snapshot(&mut self, account: AccountId, principal: u128) {
        let deposit = if principal == 0 {
            log::trace!("{} tombstoned", account);
            Deposit::default()
        } else {
            Deposit {
                principal,
                snapshot: self.current_snapshot(),
            }
        };
        self.deposits.insert(account, deposit);
    }

    fn current_snapshot(&self) -> DepositSnapshot {
        DepositSnapshot {
            product: self.product,
            sums: self
                .assets
                .iter()
                .map(|a| a.get(self.current_epoch, self.current_scale))
                .collect(),
            epoch: self.current_epoch,
            scale: self.current_scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE: u128 = DECIMAL_PRECISION;
    const ETH: AssetId = AssetId(1);
    const ALICE: AccountId = AccountId(1);

    #[test]
    fn test_sum_log_grows_lazily() {
        let mut s = AssetSums::new(ETH);
        assert!(s.get(3, 7).is_zero());

        s.set(2, 1, wide(5));
        assert_eq!(s.sums.len(), 3);
        assert_eq!(s.get(2, 1), wide(5));
        assert!(s.get(2, 0).is_zero());
        assert!(s.get(0, 0).is_zero());
    }

    #[test]
    fn test_offset_on_empty_pool_is_noop() {
        let mut pool = DistributionAccumulator::new(LedgerParams::default()).unwrap();
        let outcome = pool.offset(100 * ONE, &[ETH], &[10 * ONE]).unwrap();
        assert!(outcome.skipped);
        assert_eq!(pool.product(), ONE);
        assert_eq!(pool.asset_balance(ETH), 0);
    }

    #[test]
    fn test_offset_zero_debt_is_noop() {
        let mut pool = DistributionAccumulator::new(LedgerParams::default()).unwrap();
        pool.deposit(ALICE, 1000 * ONE).unwrap();
        let outcome = pool.offset(0, &[ETH], &[10 * ONE]).unwrap();
        assert!(outcome.skipped);
        assert_eq!(pool.total_principal(), 1000 * ONE);
        assert!(pool.sum_at(ETH, 0, 0).is_zero());
    }

    #[test]
    fn test_offset_rejects_bad_asset_lists() {
        let mut pool = DistributionAccumulator::new(LedgerParams::default()).unwrap();
        pool.deposit(ALICE, 1000 * ONE).unwrap();

        assert_eq!(
            pool.offset(1, &[ETH], &[]),
            Err(LedgerError::LengthMismatch { assets: 1, amounts: 0 })
        );
        assert_eq!(pool.offset(1, &[], &[]), Err(LedgerError::EmptyAssetList));
        assert_eq!(
            pool.offset(1, &[ETH, ETH], &[1, 2]),
            Err(LedgerError::DuplicateAsset(ETH))
        );
    }

    #[test]
    fn test_offset_exceeding_principal_leaves_state_unchanged() {
        let mut pool = DistributionAccumulator::new(LedgerParams::default()).unwrap();
        pool.deposit(ALICE, 1000 * ONE).unwrap();

        let err = pool.offset(1001 * ONE, &[ETH], &[10 * ONE]).unwrap_err();
        assert!(err.is_invariant_violation());
        assert_eq!(pool.product(), ONE);
        assert_eq!(pool.total_principal(), 1000 * ONE);
        assert_eq!(pool.asset_balance(ETH), 0);
        assert_eq!(pool.assets().count(), 0);
    }

    #[test]
    fn test_asset_capacity() {
        let params = LedgerParams {
            max_assets: 1,
            ..LedgerParams::default()
        };
        let mut pool = DistributionAccumulator::new(params).unwrap();
        pool.deposit(ALICE, 1000 * ONE).unwrap();
        pool.register_asset(ETH).unwrap();

        assert_eq!(
            pool.offset(ONE, &[AssetId(2)], &[ONE]),
            Err(LedgerError::TooManyAssets(1))
        );
        assert!(pool.offset(ONE, &[ETH], &[ONE]).is_ok());
    }

    #[test]
    fn test_gain_remainder_is_carried() {
        let mut pool = DistributionAccumulator::new(LedgerParams::default()).unwrap();
        pool.deposit(ALICE, 3 * ONE).unwrap();
        pool.offset(ONE, &[ETH], &[1]).unwrap();

        // 1e18 * P / 3e18 floors to 333..3; one unit of the numerator is left over
        assert_eq!(pool.sum_at(ETH, 0, 0), wide(333_333_333_333_333_333));
        assert_eq!(pool.asset_error(ETH), wide(1));
        assert!(pool.asset_error(AssetId(9)).is_zero());
    }

    #[test]
    fn test_withdraw_preconditions() {
        let mut pool = DistributionAccumulator::new(LedgerParams::default()).unwrap();
        assert_eq!(pool.withdraw(ALICE, 1), Err(LedgerError::UnknownAccount(ALICE)));
        assert_eq!(pool.deposit(ALICE, 0), Err(LedgerError::ZeroAmount));

        pool.deposit(ALICE, 10 * ONE).unwrap();
        pool.withdraw(ALICE, 10 * ONE).unwrap();
        assert_eq!(pool.withdraw(ALICE, 1), Err(LedgerError::ZeroPrincipal(ALICE)));
    }

    #[test]
    fn test_zero_principal_writes_tombstone() {
        let mut pool = DistributionAccumulator::new(LedgerParams::default()).unwrap();
        pool.deposit(ALICE, 10 * ONE).unwrap();
        pool.update_and_snapshot(ALICE, 0).unwrap();

        assert_eq!(pool.deposit_of(ALICE), Some(&Deposit::default()));
        assert_eq!(pool.total_principal(), 0);
        assert_eq!(pool.compounded_principal(ALICE).unwrap(), 0);
    }
}
