//! Error-corrected per-unit ratios
//!
//! Distributing `amount` over `denominator` units with a floor division throws
//! away up to one unit of precision per event. Over thousands of events that
//! loss would grow without bound, so both ratios here compute the quotient,
//! multiply it back, and return the discarded remainder. The caller stores
//! that remainder and feeds it into the next call:
//!
//! ```text
//! numerator  = amount * SCALE + carried_error
//! per_unit   = numerator * weight / denominator
//! new_error  = numerator - per_unit * denominator / weight
//! ```
//!
//! The cumulative drift is then bounded by a single call's remainder.

use crate::fixed::{mul_div_floor, to_u128, wide, DECIMAL_PRECISION};
use crate::{MathError, MathResult};
use primitive_types::U256;

/// A per-unit ratio together with the remainder to carry forward
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CorrectedRatio {
    /// Amount per unit of denominator, scaled by `SCALE * weight`
    pub per_unit: U256,

    /// Part of the numerator not represented in `per_unit`
    pub error: U256,
}

impl CorrectedRatio {
    /// Compute `(amount * SCALE + carried_error) * weight / denominator`
    ///
    /// # Arguments
    /// * `amount` - Quantity being distributed (18-decimal units)
    /// * `carried_error` - Remainder returned by the previous call for the same quantity
    /// * `weight` - Multiplier folded into the ratio (the product `P` for the
    ///   stability pool, `1` for plain stake-weighted distribution)
    /// * `denominator` - Total units sharing the amount (must be > 0)
    ///
    /// # Returns
    /// The floored ratio and the new remainder. The remainder never favors the
    /// claimant: `per_unit * denominator / weight <= numerator` always holds.
    pub fn compute(
        amount: u128,
        carried_error: U256,
        weight: U256,
        denominator: u128,
    ) -> MathResult<Self> {
        if denominator == 0 || weight.is_zero() {
            return Err(MathError::DivisionByZero);
        }

        let numerator = wide(amount)
            .checked_mul(wide(DECIMAL_PRECISION))
            .and_then(|n| n.checked_add(carried_error))
            .ok_or(MathError::Overflow)?;

        let per_unit = mul_div_floor(numerator, weight, wide(denominator))?;
        let represented = mul_div_floor(per_unit, wide(denominator), weight)?;
        let error = numerator
            .checked_sub(represented)
            .ok_or(MathError::Underflow)?;

        Ok(CorrectedRatio { per_unit, error })
    }
}

/// Fraction of principal consumed by an absorbed debt, rounded up
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LossRatio {
    /// Loss per unit of principal, `SCALE` meaning full depletion
    pub ratio: u128,

    /// Over-estimate carried into the next loss computation
    pub error: u128,
}

impl LossRatio {
    /// Compute the loss per unit of principal for absorbing `debt`
    ///
    /// Full depletion (`debt == total`) is exact: ratio `SCALE`, error reset
    /// to 0. Otherwise the floored quotient is bumped by one so that the
    /// depletion applied to depositors is never less than the debt absorbed;
    /// the over-estimate is returned as `error` and subtracted next time.
    ///
    /// # Arguments
    /// * `debt` - Debt absorbed by the pool
    /// * `total` - Total principal before absorption (must be > 0)
    /// * `carried_error` - Over-estimate from the previous call
    pub fn compute(debt: u128, total: u128, carried_error: u128) -> MathResult<Self> {
        if total == 0 {
            return Err(MathError::DivisionByZero);
        }

        if debt == total {
            return Ok(LossRatio {
                ratio: DECIMAL_PRECISION,
                error: 0,
            });
        }

        // A carried error larger than the new loss saturates at zero: the
        // ratio becomes one unit and the error is recomputed from there
        let numerator = wide(debt)
            .checked_mul(wide(DECIMAL_PRECISION))
            .ok_or(MathError::Overflow)?
            .saturating_sub(wide(carried_error));

        let ratio = numerator / wide(total) + wide(1);
        let error = ratio
            .checked_mul(wide(total))
            .ok_or(MathError::Overflow)?
            .checked_sub(numerator)
            .ok_or(MathError::Underflow)?;

        Ok(LossRatio {
            ratio: to_u128(ratio)?,
            error: to_u128(error)?,
        })
    }
}
