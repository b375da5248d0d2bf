//! Drive both ledgers through a scenario
//!
//! The replay plays the parts the ledgers leave to their callers: it keeps the
//! position registry (recorded collateral and debt per position), merges
//! pending redistribution rewards into positions before touching them, and
//! splits each liquidation between the stability pool and redistribution.

use crate::config::{units, CollateralAmount, Event, Scenario};
use anyhow::{Context, Result};
use serde::Serialize;
use stability_ledger::{
    mul_div_floor, to_u128, wide, AccountId, AssetGain, AssetId, CollateralShare,
    DistributionAccumulator, LedgerParams, MathError, RedistributionLedger, DECIMAL_PRECISION,
};
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("position {0} already open")]
    PositionExists(AccountId),

    #[error("no open position for {0}")]
    NoPosition(AccountId),

    #[error("no price configured for {0}")]
    NoPrice(AssetId),
}

/// A position as recorded by the registry, excluding pending rewards
#[derive(Debug, Clone, Default, Serialize)]
pub struct Position {
    pub collateral: BTreeMap<AssetId, u128>,
    pub debt: u128,
}

impl Position {
    fn from_event(debt: u64, collateral: &[CollateralAmount]) -> Self {
        Position {
            collateral: collateral
                .iter()
                .map(|c| (c.asset, units(c.amount)))
                .collect(),
            debt: units(debt),
        }
    }

    fn stake_input(&self) -> Vec<(AssetId, u128)> {
        self.collateral.iter().map(|(a, c)| (*a, *c)).collect()
    }
}

#[derive(Debug, Default, Serialize)]
pub struct Totals {
    pub events: usize,
    pub liquidations: usize,
    pub debt_offset: u128,
    pub debt_redistributed: u128,

    /// Debt and collateral no position could receive
    pub debt_unallocated: u128,
    pub collateral_unallocated: BTreeMap<AssetId, u128>,
}

pub struct Replay {
    prices: BTreeMap<AssetId, u128>,
    pool: DistributionAccumulator,
    ledger: RedistributionLedger,
    positions: BTreeMap<AccountId, Position>,
    depositors: Vec<AccountId>,
    totals: Totals,
}

impl Replay {
    pub fn new(scenario: &Scenario) -> Result<Self> {
        let mut pool = DistributionAccumulator::new(scenario.params)?;
        let mut ledger = RedistributionLedger::new(scenario.params)?;
        for asset in &scenario.assets {
            pool.register_asset(asset.id)?;
            ledger.register_asset(asset.id)?;
        }
        Ok(Replay {
            prices: scenario
                .assets
                .iter()
                .map(|a| (a.id, units(a.price)))
                .collect(),
            pool,
            ledger,
            positions: BTreeMap::new(),
            depositors: Vec::new(),
            totals: Totals::default(),
        })
    }

    pub fn params(&self) -> &LedgerParams {
        self.pool.params()
    }

    pub fn run(&mut self, events: &[Event]) -> Result<()> {
        for (n, event) in events.iter().enumerate() {
            self.apply(event)
                .with_context(|| format!("event #{} ({:?}) failed", n, event))?;
            self.totals.events += 1;
        }
        Ok(())
    }

    pub fn apply(&mut self, event: &Event) -> Result<()> {
        match event {
            Event::Deposit { account, amount } => {
                let out = self.pool.deposit(*account, units(*amount))?;
                self.log_gains(*account, &out.gains);
                if !self.depositors.contains(account) {
                    self.depositors.push(*account);
                }
            }
            Event::Withdraw { account, amount } => {
                let out = self.pool.withdraw(*account, units(*amount))?;
                self.log_gains(*account, &out.gains);
                log::info!("{} withdrew {} from the pool", account, out.withdrawn);
            }
            Event::OpenPosition {
                account,
                debt,
                collateral,
            } => {
                if self.positions.contains_key(account) {
                    return Err(ReplayError::PositionExists(*account).into());
                }
                let position = Position::from_event(*debt, collateral);
                self.ledger.update_stake(*account, &position.stake_input())?;
                log::info!("{} opened with debt {}", account, position.debt);
                self.positions.insert(*account, position);
            }
            Event::AdjustPosition {
                account,
                debt,
                collateral,
            } => {
                self.apply_rewards(*account)?;
                let position = Position::from_event(*debt, collateral);
                self.ledger.update_stake(*account, &position.stake_input())?;
                self.positions.insert(*account, position);
            }
            Event::ClosePosition { account } => {
                self.apply_rewards(*account)?;
                self.drop_stakes(*account)?;
                let position = self
                    .positions
                    .remove(account)
                    .ok_or(ReplayError::NoPosition(*account))?;
                log::info!("{} closed, repaying {}", account, position.debt);
            }
            Event::Liquidate { account } => self.liquidate(*account)?,
        }
        Ok(())
    }

    /// Merge pending redistribution rewards into a position's record
    fn apply_rewards(&mut self, account: AccountId) -> Result<()> {
        if !self.positions.contains_key(&account) {
            return Err(ReplayError::NoPosition(account).into());
        }
        let rewards = self.ledger.apply_pending_rewards(account)?;
        let position = self
            .positions
            .get_mut(&account)
            .ok_or(ReplayError::NoPosition(account))?;
        for r in rewards {
            *position.collateral.entry(r.asset).or_insert(0) += r.collateral;
            position.debt += r.debt;
            log::debug!(
                "{} received {} collateral and {} debt in {}",
                account,
                r.collateral,
                r.debt,
                r.asset
            );
        }
        Ok(())
    }

    /// Positions opened without collateral never got a stake entry
    fn drop_stakes(&mut self, account: AccountId) -> Result<()> {
        if !self.ledger.stakes_of(account).is_empty() {
            self.ledger.remove_stake(account)?;
        }
        Ok(())
    }

    fn liquidate(&mut self, account: AccountId) -> Result<()> {
        self.apply_rewards(account)?;
        self.drop_stakes(account)?;
        let position = self
            .positions
            .remove(&account)
            .ok_or(ReplayError::NoPosition(account))?;

        let debt = position.debt;
        // Without collateral there is nothing to hand the pool for its debt
        let absorbed = if position.collateral.is_empty() {
            0
        } else {
            debt.min(self.pool.total_principal())
        };
        log::info!(
            "Liquidating {}: debt {}, pool absorbs {}",
            account,
            debt,
            absorbed
        );

        // Collateral follows debt pro rata
        let mut to_pool = Vec::with_capacity(position.collateral.len());
        let mut shares = Vec::with_capacity(position.collateral.len());
        for (&asset, &amount) in &position.collateral {
            let pooled = if debt == 0 {
                0
            } else {
                mul_div(amount, absorbed, debt)?
            };
            let rest = amount - pooled;
            to_pool.push((asset, pooled));
            let price = *self.prices.get(&asset).ok_or(ReplayError::NoPrice(asset))?;
            shares.push(CollateralShare {
                asset,
                amount: rest,
                value: mul_div(rest, price, DECIMAL_PRECISION)?,
            });
        }

        if absorbed > 0 {
            let (assets, amounts): (Vec<AssetId>, Vec<u128>) = to_pool.into_iter().unzip();
            let outcome = self.pool.offset(absorbed, &assets, &amounts)?;
            log::debug!("offset outcome: {:?}", outcome);
            self.totals.debt_offset += absorbed;
        }

        let remaining = debt - absorbed;
        if remaining > 0 {
            if shares.iter().all(|s| s.value == 0) {
                log::warn!(
                    "{} has no collateral value left; debt {} unallocated",
                    account,
                    remaining
                );
                self.totals.debt_unallocated += remaining;
            } else {
                let outcome = self.ledger.redistribute(remaining, &shares)?;
                for p in outcome.portions.iter() {
                    if p.distributed {
                        self.totals.debt_redistributed += p.debt;
                    } else {
                        self.totals.debt_unallocated += p.debt;
                        *self.totals.collateral_unallocated.entry(p.asset).or_insert(0) +=
                            p.collateral;
                    }
                }
            }
        }

        self.ledger.take_system_snapshot(&self.active_pool(), &[])?;
        self.totals.liquidations += 1;
        Ok(())
    }

    /// Recorded collateral of all open positions, per asset
    pub fn active_pool(&self) -> BTreeMap<AssetId, u128> {
        let mut pool = BTreeMap::new();
        for position in self.positions.values() {
            for (asset, amount) in &position.collateral {
                *pool.entry(*asset).or_insert(0) += amount;
            }
        }
        pool
    }

    fn log_gains(&self, account: AccountId, gains: &[AssetGain]) {
        for g in gains.iter().filter(|g| g.amount > 0) {
            log::info!("{} collected {} of {}", account, g.amount, g.asset);
        }
    }

    pub fn summary(&self) -> Result<Summary> {
        let mut depositors = Vec::with_capacity(self.depositors.len());
        for &account in &self.depositors {
            depositors.push(DepositorSummary {
                account,
                compounded: self.pool.compounded_principal(account)?,
                gains: self
                    .pool
                    .gains(account)?
                    .into_iter()
                    .map(|g| (g.asset, g.amount))
                    .collect(),
            });
        }

        let mut positions = Vec::with_capacity(self.positions.len());
        for (&account, position) in &self.positions {
            positions.push(PositionSummary {
                account,
                recorded: position.clone(),
                pending: self
                    .ledger
                    .pending_rewards(account)?
                    .into_iter()
                    .map(|r| (r.asset, (r.collateral, r.debt)))
                    .collect(),
            });
        }

        Ok(Summary {
            pool: PoolSummary {
                product: self.pool.product(),
                epoch: self.pool.epoch(),
                scale: self.pool.scale(),
                total_principal: self.pool.total_principal(),
                balances: self
                    .pool
                    .assets()
                    .map(|a| (a, self.pool.asset_balance(a)))
                    .collect(),
            },
            depositors,
            positions,
            totals: &self.totals,
        })
    }
}

fn mul_div(a: u128, b: u128, d: u128) -> Result<u128, MathError> {
    to_u128(mul_div_floor(wide(a), wide(b), wide(d))?)
}

#[derive(Serialize)]
pub struct Summary<'a> {
    pub pool: PoolSummary,
    pub depositors: Vec<DepositorSummary>,
    pub positions: Vec<PositionSummary>,
    pub totals: &'a Totals,
}

#[derive(Serialize)]
pub struct PoolSummary {
    pub product: u128,
    pub epoch: u64,
    pub scale: u64,
    pub total_principal: u128,
    pub balances: BTreeMap<AssetId, u128>,
}

#[derive(Serialize)]
pub struct DepositorSummary {
    pub account: AccountId,
    pub compounded: u128,
    pub gains: BTreeMap<AssetId, u128>,
}

#[derive(Serialize)]
pub struct PositionSummary {
    pub account: AccountId,
    pub recorded: Position,

    /// `(collateral, debt)` not yet merged into the record
    pub pending: BTreeMap<AssetId, (u128, u128)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
        [[assets]]
        id = 1
        name = "ETH"
        price = 2000

        [[events]]
        kind = "deposit"
        account = 1
        amount = 600

        [[events]]
        kind = "open_position"
        account = 10
        debt = 1000
        collateral = [{ asset = 1, amount = 1 }]

        [[events]]
        kind = "open_position"
        account = 11
        debt = 3000
        collateral = [{ asset = 1, amount = 3 }]

        [[events]]
        kind = "open_position"
        account = 12
        debt = 1000
        collateral = [{ asset = 1, amount = 1 }]

        [[events]]
        kind = "liquidate"
        account = 10
    "#;

    const ONE: u128 = DECIMAL_PRECISION;

    fn replay() -> Replay {
        let scenario = Scenario::parse(SCENARIO).unwrap();
        let mut replay = Replay::new(&scenario).unwrap();
        replay.run(&scenario.events).unwrap();
        replay
    }

    #[test]
    fn test_liquidation_splits_between_pool_and_positions() {
        let r = replay();
        assert_eq!(r.totals.liquidations, 1);
        assert_eq!(r.totals.debt_offset, 600 * ONE);
        assert_eq!(r.totals.debt_redistributed, 400 * ONE);
        assert_eq!(r.pool.total_principal(), 0);

        // 3:1 stake split of the remaining 400 debt and 0.4 ETH
        let pending = r.ledger.pending_rewards(AccountId(11)).unwrap();
        assert_eq!(pending[0].debt, 300 * ONE);
        assert_eq!(pending[0].collateral, 3 * ONE / 10);
    }

    #[test]
    fn test_close_position_merges_rewards() {
        let mut r = replay();
        r.apply(&Event::ClosePosition {
            account: AccountId(12),
        })
        .unwrap();
        assert!(r.ledger.stakes_of(AccountId(12)).is_empty());
        assert_eq!(r.active_pool().get(&AssetId(1)), Some(&(3 * ONE)));
    }

    #[test]
    fn test_unknown_position_is_rejected() {
        let mut r = replay();
        let err = r
            .apply(&Event::Liquidate {
                account: AccountId(99),
            })
            .unwrap_err();
        assert!(err.to_string().contains("no open position"));
    }

    #[test]
    fn test_liquidation_without_collateral_is_unallocated() {
        let mut r = replay();
        r.apply(&Event::Deposit {
            account: AccountId(2),
            amount: 500,
        })
        .unwrap();
        r.apply(&Event::OpenPosition {
            account: AccountId(20),
            debt: 200,
            collateral: vec![],
        })
        .unwrap();
        r.apply(&Event::Liquidate {
            account: AccountId(20),
        })
        .unwrap();

        assert_eq!(r.totals.debt_offset, 600 * ONE);
        assert_eq!(r.totals.debt_unallocated, 200 * ONE);
        assert_eq!(r.pool.total_principal(), 500 * ONE);
    }

    #[test]
    fn test_mul_div_reports_errors() {
        assert_eq!(mul_div(6, 7, 2), Ok(21));
        assert_eq!(mul_div(1, 1, 0), Err(MathError::DivisionByZero));
        assert_eq!(mul_div(u128::MAX, 2, 1), Err(MathError::Overflow));
    }

    #[test]
    fn test_summary_serializes() {
        let r = replay();
        // Amounts exceed u64, so go through text rather than to_value
        let text = serde_json::to_string(&r.summary().unwrap()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["totals"]["liquidations"], 1);
        assert_eq!(json["pool"]["epoch"], 1);
    }
}
