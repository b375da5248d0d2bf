use super::*;
use ledger_math::LossRatio;

const ONE: u128 = DECIMAL_PRECISION;
const ETH: AssetId = AssetId(1);
const BTC: AssetId = AssetId(2);
const ALICE: AccountId = AccountId(1);
const BOB: AccountId = AccountId(2);

fn params_for_kani() -> LedgerParams {
    LedgerParams {
        max_assets: 2,
        ..LedgerParams::default()
    }
}

// ============================================================================
// Loss ratio
// ============================================================================

#[kani::proof]
#[kani::unwind(2)]
fn kani_loss_ratio_bounded_by_unit() {
    let debt: u128 = kani::any();
    let total: u128 = kani::any();
    let carried: u128 = kani::any();
    kani::assume(total > 0 && total < 1_000_000 * ONE);
    kani::assume(debt <= total);

    let loss = LossRatio::compute(debt, total, carried).unwrap();
    assert!(loss.ratio <= ONE);
    assert!(loss.error <= total);
    if debt == total {
        assert!(loss.ratio == ONE && loss.error == 0);
    }
}

// ============================================================================
// Product and compounded principal
// ============================================================================

#[kani::proof]
#[kani::unwind(4)]
fn kani_offset_keeps_product_in_range() {
    let mut pool = DistributionAccumulator::new(params_for_kani()).unwrap();
    let principal: u128 = kani::any();
    let debt: u128 = kani::any();
    kani::assume(principal > 0 && principal < 1_000_000 * ONE);
    kani::assume(debt <= principal);

    pool.deposit(ALICE, principal).unwrap();
    if pool.offset(debt, &[ETH], &[0]).is_ok() {
        assert!(pool.product() > 0);
        assert!(pool.product() <= ONE);
        assert!(pool.total_principal() == principal - debt);
    }
}

#[kani::proof]
#[kani::unwind(4)]
fn kani_compounded_never_exceeds_principal() {
    let mut pool = DistributionAccumulator::new(params_for_kani()).unwrap();
    let principal: u128 = kani::any();
    let debt: u128 = kani::any();
    kani::assume(principal > 0 && principal < 1_000 * ONE);
    kani::assume(debt < principal);

    pool.deposit(ALICE, principal).unwrap();
    pool.offset(debt, &[ETH], &[0]).unwrap();

    let compounded = pool.compounded_principal(ALICE).unwrap();
    assert!(compounded <= principal - debt);
}

#[kani::proof]
#[kani::unwind(4)]
fn kani_failed_offset_leaves_pool_unchanged() {
    let mut pool = DistributionAccumulator::new(params_for_kani()).unwrap();
    let principal: u128 = kani::any();
    let debt: u128 = kani::any();
    kani::assume(principal > 0 && principal < 1_000 * ONE);
    kani::assume(debt > principal);

    pool.deposit(ALICE, principal).unwrap();
    assert!(pool.offset(debt, &[ETH], &[ONE]).is_err());
    assert!(pool.product() == ONE);
    assert!(pool.total_principal() == principal);
    assert!(pool.asset_balance(ETH) == 0);
}

// ============================================================================
// Redistribution
// ============================================================================

#[kani::proof]
#[kani::unwind(4)]
fn kani_redistributed_portions_sum_to_debt() {
    let mut ledger = RedistributionLedger::new(params_for_kani()).unwrap();
    ledger.update_stake(ALICE, &[(ETH, ONE), (BTC, ONE)]).unwrap();

    let debt: u128 = kani::any();
    let eth_value: u128 = kani::any();
    let btc_value: u128 = kani::any();
    kani::assume(debt > 0 && debt < 1_000 * ONE);
    kani::assume(eth_value < 1_000_000 && btc_value < 1_000_000);
    kani::assume(eth_value + btc_value > 0);

    let shares = [
        CollateralShare { asset: ETH, amount: 1, value: eth_value },
        CollateralShare { asset: BTC, amount: 1, value: btc_value },
    ];
    let outcome = ledger.redistribute(debt, &shares).unwrap();
    let total: u128 = outcome.portions.iter().map(|p| p.debt).sum();
    assert!(total == debt);
}

#[kani::proof]
#[kani::unwind(4)]
fn kani_stake_change_requires_applied_rewards() {
    let mut ledger = RedistributionLedger::new(params_for_kani()).unwrap();
    ledger.update_stake(ALICE, &[(ETH, ONE)]).unwrap();
    ledger.update_stake(BOB, &[(ETH, ONE)]).unwrap();

    let debt: u128 = kani::any();
    kani::assume(debt > 0 && debt < 1_000 * ONE);
    ledger
        .redistribute(debt, &[CollateralShare { asset: ETH, amount: 0, value: 1 }])
        .unwrap();

    assert!(ledger.update_stake(ALICE, &[(ETH, 2 * ONE)]) == Err(LedgerError::UnappliedRewards(ALICE)));
    ledger.apply_pending_rewards(ALICE).unwrap();
    assert!(ledger.update_stake(ALICE, &[(ETH, 2 * ONE)]).is_ok());
}
