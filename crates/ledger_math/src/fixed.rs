//! Fixed-point decimal arithmetic
//!
//! Values are unsigned integers scaled by [`DECIMAL_PRECISION`] (10^18), so
//! `1.0 == 10^18`. Token amounts are `u128`; products of two scaled values
//! are formed in [`U256`] and narrowed back with [`to_u128`].

use crate::{MathError, MathResult};
use primitive_types::U256;

/// One whole unit (1.0) in 18-decimal fixed point
pub const DECIMAL_PRECISION: u128 = 1_000_000_000_000_000_000;

/// Widen a `u128` into the 256-bit working type
#[inline]
pub fn wide(x: u128) -> U256 {
    U256::from(x)
}

/// Compute `a * b / d`, rounding toward zero
///
/// # Arguments
/// * `a`, `b` - Factors (any scale)
/// * `d` - Divisor (must be > 0)
///
/// # Returns
/// The floored quotient, or an error if `d == 0` or `a * b` exceeds 256 bits
#[inline]
pub fn mul_div_floor(a: U256, b: U256, d: U256) -> MathResult<U256> {
    if d.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let product = a.checked_mul(b).ok_or(MathError::Overflow)?;
    Ok(product / d)
}

/// Multiply two 18-decimal values: `x * y / 10^18` (floor)
#[inline]
pub fn dec_mul(x: u128, y: u128) -> MathResult<u128> {
    to_u128(mul_div_floor(wide(x), wide(y), wide(DECIMAL_PRECISION))?)
}

/// Narrow a 256-bit intermediate back to `u128`
#[inline]
pub fn to_u128(x: U256) -> MathResult<u128> {
    if x > wide(u128::MAX) {
        return Err(MathError::Overflow);
    }
    Ok(x.low_u128())
}

#[inline]
pub fn min(a: u128, b: u128) -> u128 {
    if a < b {
        a
    } else {
        b
    }
}

/// Absolute difference `|a - b|`
#[inline]
pub fn abs_diff(a: u128, b: u128) -> u128 {
    if a >= b {
        a - b
    } else {
        b - a
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dec_mul_identity() {
        let x = 123_456_789_000_000_000_000u128;
        assert_eq!(dec_mul(x, DECIMAL_PRECISION).unwrap(), x);
    }

    #[test]
    fn test_dec_mul_half() {
        let half = DECIMAL_PRECISION / 2;
        assert_eq!(dec_mul(1_000 * DECIMAL_PRECISION, half).unwrap(), 500 * DECIMAL_PRECISION);
    }

    #[test]
    fn test_dec_mul_floors() {
        // 3 wei * 0.5 = 1.5 wei -> 1
        assert_eq!(dec_mul(3, DECIMAL_PRECISION / 2).unwrap(), 1);
    }

    #[test]
    fn test_mul_div_floor_wide_intermediate() {
        // (10^30 * 10^30) / 10^30 does not fit in u128 mid-way
        let e30 = wide(1_000_000_000_000_000_000_000_000_000_000u128);
        assert_eq!(mul_div_floor(e30, e30, e30).unwrap(), e30);
    }

    #[test]
    fn test_mul_div_zero_denominator() {
        assert_eq!(
            mul_div_floor(wide(1), wide(1), U256::zero()),
            Err(MathError::DivisionByZero)
        );
    }

    #[test]
    fn test_mul_div_overflow() {
        assert_eq!(
            mul_div_floor(U256::MAX, wide(2), wide(1)),
            Err(MathError::Overflow)
        );
    }

    #[test]
    fn test_to_u128_bounds() {
        assert_eq!(to_u128(wide(u128::MAX)).unwrap(), u128::MAX);
        assert_eq!(to_u128(wide(u128::MAX) + wide(1)), Err(MathError::Overflow));
    }

    #[test]
    fn test_min_abs_diff() {
        assert_eq!(min(3, 7), 3);
        assert_eq!(min(7, 3), 3);
        assert_eq!(abs_diff(3, 7), 4);
        assert_eq!(abs_diff(7, 3), 4);
        assert_eq!(abs_diff(5, 5), 0);
    }
}
