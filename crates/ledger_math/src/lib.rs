//! Decimal math for O(1) liquidation accounting
//!
//! This crate holds the two numeric building blocks shared by the stability
//! pool accumulator and the redistribution ledger:
//!
//! - **Fixed-point arithmetic** ([`fixed`]): 10^18-scaled decimals with floor
//!   rounding, computed through 256-bit intermediates so that
//!   `amount · SCALE · P` never overflows.
//! - **Error-corrected ratios** ([`ratio`]): per-unit ratios that carry the
//!   floor-division remainder into the next call, keeping cumulative drift
//!   below one unit per call instead of growing with the number of events.
//!
//! ## Rounding direction
//!
//! Every division floors. The only place that rounds up is the loss ratio,
//! which adds one unit so that the computed depletion of depositor principal
//! is never smaller than the debt actually absorbed.
//!
//! ## Usage Example
//!
//! ```rust
//! use ledger_math::{CorrectedRatio, DECIMAL_PRECISION, U256};
//!
//! // 40 units of collateral shared by 1000 units of principal at P = 1.0
//! let r = CorrectedRatio::compute(
//!     40 * DECIMAL_PRECISION,
//!     U256::zero(),
//!     U256::from(DECIMAL_PRECISION),
//!     1000 * DECIMAL_PRECISION,
//! )
//! .unwrap();
//! assert_eq!(r.per_unit, U256::from(4u128 * DECIMAL_PRECISION / 100) * U256::from(DECIMAL_PRECISION));
//! assert!(r.error.is_zero());
//! ```

pub mod fixed;
pub mod ratio;

pub use fixed::{abs_diff, dec_mul, min, mul_div_floor, to_u128, wide, DECIMAL_PRECISION};
pub use primitive_types::U256;
pub use ratio::{CorrectedRatio, LossRatio};

/// Arithmetic failure inside the ledger math
///
/// None of these should surface under correct caller discipline; callers
/// treat them as invariant violations of the enclosing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    /// Result does not fit in the target width
    #[error("arithmetic overflow")]
    Overflow,

    /// Subtraction would go below zero
    #[error("arithmetic underflow")]
    Underflow,

    /// Denominator was zero
    #[error("division by zero")]
    DivisionByZero,
}

pub type MathResult<T> = core::result::Result<T, MathError>;
