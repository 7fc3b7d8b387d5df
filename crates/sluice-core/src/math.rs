//! Fixed-point helpers.
//!
//! Reward accounting multiplies 18-decimal amounts by 1e12-scaled ratios,
//! which overflows `u128` long before the quotient does. [`mul_div`] keeps the
//! full 256-bit product and divides it exactly, flooring the result.

use crate::constants::BPS_PRECISION;
use crate::error::InvariantError;
use crate::types::Amount;

/// Full 256-bit product of two `u128` values as `(high, low)`.
fn widening_mul(a: u128, b: u128) -> (u128, u128) {
    const MASK: u128 = u64::MAX as u128;
    let (a1, a0) = (a >> 64, a & MASK);
    let (b1, b0) = (b >> 64, b & MASK);

    let p00 = a0 * b0;
    let p01 = a0 * b1;
    let p10 = a1 * b0;
    let p11 = a1 * b1;

    // Each addend is below 2^64, so the sum fits.
    let mid = (p00 >> 64) + (p01 & MASK) + (p10 & MASK);
    let low = (p00 & MASK) | (mid << 64);
    let high = p11 + (p01 >> 64) + (p10 >> 64) + (mid >> 64);
    (high, low)
}

/// `floor(a * b / denominator)` without intermediate overflow.
///
/// Fails with [`InvariantError::ArithmeticOverflow`] when `denominator` is
/// zero or the quotient does not fit in `u128`.
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128, InvariantError> {
    if denominator == 0 {
        return Err(InvariantError::ArithmeticOverflow);
    }
    let (high, low) = widening_mul(a, b);
    if high == 0 {
        return Ok(low / denominator);
    }
    if high >= denominator {
        return Err(InvariantError::ArithmeticOverflow);
    }

    // Restoring long division of (high:low) by denominator; `rem < denominator` holds throughout.
    let mut rem = high;
    let mut quotient: u128 = 0;
    for bit in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((low >> bit) & 1);
        if carry == 1 || rem >= denominator {
            rem = rem.wrapping_sub(denominator);
            quotient |= 1u128 << bit;
        }
    }
    Ok(quotient)
}

/// `amount * bps / 10_000`, floored.
pub fn apply_bps(amount: Amount, bps: u32) -> Result<Amount, InvariantError> {
    mul_div(amount, bps as u128, BPS_PRECISION as u128)
}

pub fn checked_add(a: Amount, b: Amount) -> Result<Amount, InvariantError> {
    a.checked_add(b).ok_or(InvariantError::ArithmeticOverflow)
}

pub fn checked_sub(a: Amount, b: Amount) -> Result<Amount, InvariantError> {
    a.checked_sub(b).ok_or(InvariantError::ArithmeticOverflow)
}
