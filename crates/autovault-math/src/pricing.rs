//! Share pricing.
//!
//! The exchange rate between shares and the underlying asset is
//!
//! ```text
//! price = managed_balance / total_shares      (total_shares > 0)
//! price = 1                                   (total_shares == 0)
//! ```
//!
//! expressed as a fixed-point number scaled by [`PRICE_PRECISION`].
//!
//! ## Rounding
//!
//! Every conversion rounds in favour of the pool. Deposits mint
//! `floor(amount * total_shares / managed)` shares; withdrawals burn
//! `ceil(amount * total_shares / managed)` shares. Redeeming shares always
//! yields `floor(shares * managed / total_shares)` assets, so the sum of all
//! redemptions can never exceed the managed balance.

use crate::{MathError, Result};

// The macro expands to unqualified `Result<Self, _>`, so it cannot share a
// scope with the crate's one-parameter alias.
mod wide {
    use uint::construct_uint;

    construct_uint! {
        /// 256-bit unsigned integer for overflow-free `x * y / d`.
        pub struct U256(4);
    }
}

pub use wide::U256;

/// Fixed-point scale of [`price_per_full_share`]; one share at par.
pub const PRICE_PRECISION: u128 = 1_000_000_000_000_000_000;

/// Rounding direction for [`mul_div`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Toward zero.
    Down,
    /// Away from zero when there is a remainder.
    Up,
}

/// Compute `x * y / denominator` with a 256-bit intermediate product.
///
/// # Errors
///
/// - [`MathError::DivisionByZero`] if `denominator` is zero
/// - [`MathError::Overflow`] if the quotient does not fit in a `u128`
pub fn mul_div(x: u128, y: u128, denominator: u128, rounding: Rounding) -> Result<u128> {
    if denominator == 0 {
        return Err(MathError::DivisionByZero);
    }
    let product = U256::from(x) * U256::from(y);
    let denominator = U256::from(denominator);
    let mut quotient = product / denominator;
    if rounding == Rounding::Up && !(product % denominator).is_zero() {
        quotient = quotient + U256::one();
    }
    if quotient > U256::from(u128::MAX) {
        return Err(MathError::Overflow);
    }
    Ok(quotient.low_u128())
}

/// Price of one full share in asset units, scaled by [`PRICE_PRECISION`].
pub fn price_per_full_share(managed_balance: u128, total_shares: u128) -> Result<u128> {
    if total_shares == 0 {
        return Ok(PRICE_PRECISION);
    }
    mul_div(managed_balance, PRICE_PRECISION, total_shares, Rounding::Down)
}

/// Shares minted for a deposit of `amount`.
///
/// `managed_before` must be the managed balance *before* the deposit is
/// added, so the depositor is not diluted by their own funds.
///
/// # Errors
///
/// - [`MathError::EmptyPool`] if shares exist but the pool holds nothing
/// - [`MathError::Overflow`] on arithmetic overflow
pub fn shares_for_deposit(amount: u128, total_shares: u128, managed_before: u128) -> Result<u128> {
    if total_shares == 0 {
        return Ok(amount);
    }
    if managed_before == 0 {
        return Err(MathError::EmptyPool { total_shares });
    }
    let shares = mul_div(amount, total_shares, managed_before, Rounding::Down)?;
    tracing::debug!(amount, shares, total_shares, managed_before, "pricing: deposit quote");
    Ok(shares)
}

/// Asset value of `shares`, rounded down. Zero when no shares exist.
pub fn assets_for_shares(shares: u128, total_shares: u128, managed_balance: u128) -> Result<u128> {
    if total_shares == 0 {
        return Ok(0);
    }
    mul_div(shares, managed_balance, total_shares, Rounding::Down)
}

/// Shares burned to withdraw `amount` of the asset, rounded up.
///
/// # Errors
///
/// - [`MathError::EmptyPool`] if the pool holds no assets
/// - [`MathError::Overflow`] on arithmetic overflow
pub fn shares_for_withdrawal(amount: u128, total_shares: u128, managed_balance: u128) -> Result<u128> {
    if managed_balance == 0 {
        return Err(MathError::EmptyPool { total_shares });
    }
    mul_div(amount, total_shares, managed_balance, Rounding::Up)
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIT: u128 = PRICE_PRECISION;

    #[test]
    fn test_mul_div_rounding() {
        assert_eq!(mul_div(10, 10, 3, Rounding::Down).expect("down"), 33);
        assert_eq!(mul_div(10, 10, 3, Rounding::Up).expect("up"), 34);
        assert_eq!(mul_div(10, 9, 3, Rounding::Up).expect("exact"), 30);
    }

    #[test]
    fn test_mul_div_wide_intermediate() {
        // 1e20 * 1e20 overflows u128 but the quotient fits.
        let big = 100 * UNIT;
        assert_eq!(mul_div(big, big, big, Rounding::Down).expect("wide"), big);
    }

    #[test]
    fn test_wide_type_alongside_result_alias() {
        let parsed = U256::from_dec_str("340282366920938463463374607431768211456").expect("parse");
        assert_eq!(parsed, U256::from(u128::MAX) + U256::one());
        let squared = U256::from(u128::MAX) * U256::from(u128::MAX);
        assert_eq!(squared / U256::from(u128::MAX), U256::from(u128::MAX));
    }

    #[test]
    fn test_mul_div_errors() {
        assert_eq!(mul_div(1, 1, 0, Rounding::Down), Err(MathError::DivisionByZero));
        assert_eq!(mul_div(u128::MAX, 2, 1, Rounding::Down), Err(MathError::Overflow));
    }

    #[test]
    fn test_price_empty_pool_is_unit() {
        assert_eq!(price_per_full_share(0, 0).expect("price"), UNIT);
        assert_eq!(price_per_full_share(123, 0).expect("price"), UNIT);
    }

    #[test]
    fn test_price_after_yield() {
        // 130 assets backing 100 shares
        assert_eq!(
            price_per_full_share(130 * UNIT, 100 * UNIT).expect("price"),
            1_300_000_000_000_000_000
        );
    }

    #[test]
    fn test_first_deposit_mints_one_to_one() {
        assert_eq!(shares_for_deposit(10 * UNIT, 0, 0).expect("mint"), 10 * UNIT);
    }

    #[test]
    fn test_deposit_rounds_down() {
        // 3 shares backed by 10 assets; depositing 1 asset buys 0.3 shares
        assert_eq!(shares_for_deposit(1, 3, 10).expect("mint"), 0);
        assert_eq!(shares_for_deposit(7, 3, 10).expect("mint"), 2);
    }

    #[test]
    fn test_deposit_into_emptied_pool_rejected() {
        assert_eq!(
            shares_for_deposit(10, 5, 0),
            Err(MathError::EmptyPool { total_shares: 5 })
        );
    }

    #[test]
    fn test_withdrawal_rounds_up() {
        // 3 shares backed by 10 assets; withdrawing 1 asset costs 0.3 -> 1 share
        assert_eq!(shares_for_withdrawal(1, 3, 10).expect("burn"), 1);
        assert_eq!(shares_for_withdrawal(10, 3, 10).expect("burn"), 3);
    }

    #[test]
    fn test_assets_for_shares() {
        assert_eq!(assets_for_shares(1, 3, 10).expect("redeem"), 3);
        assert_eq!(assets_for_shares(3, 3, 10).expect("redeem"), 10);
        assert_eq!(assets_for_shares(5, 0, 0).expect("redeem"), 0);
    }

    #[test]
    fn test_redeemable_never_exceeds_pool() {
        let total = 7u128;
        let managed = 100u128;
        let sum: u128 = [1u128, 2, 4]
            .iter()
            .map(|s| assets_for_shares(*s, total, managed).expect("redeem"))
            .sum();
        assert!(sum <= managed);
    }

    #[test]
    fn test_burn_covers_value() {
        // Burning ceil-rounded shares always removes at least `amount` worth.
        let (total, managed) = (3u128, 10u128);
        for amount in 1..=10u128 {
            let burned = shares_for_withdrawal(amount, total, managed).expect("burn");
            assert!(burned * managed >= amount * total, "amount {amount}");
        }
    }
}
