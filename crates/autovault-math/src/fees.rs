//! Fee policy.
//!
//! Three independent rates, each in basis points (1 bps = 0.01%):
//!
//! - **Performance** — on harvest, to the treasury. Default 2%, ceiling 5%.
//! - **Call** — on harvest, to the caller. Default 0.25%, ceiling 1%.
//! - **Withdraw** — on withdrawal inside the fee window (default 72 hours)
//!   after the depositor's last deposit, to the treasury. Default 0.1%,
//!   ceiling 1%.
//!
//! Both harvest fees are taken from the same base amount; neither is
//! deducted before computing the other. All fees round down.

use autovault_types::{FeeKind, Timestamp, SECONDS_PER_HOUR};
use serde::{Deserialize, Serialize};

use crate::pricing::{mul_div, Rounding};
use crate::{FeeError, MathError};

/// Basis points in 100%.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Ceiling for the performance fee (5%).
pub const MAX_PERFORMANCE_FEE_BPS: u64 = 500;

/// Ceiling for the call fee (1%).
pub const MAX_CALL_FEE_BPS: u64 = 100;

/// Ceiling for the withdrawal fee (1%).
pub const MAX_WITHDRAW_FEE_BPS: u64 = 100;

/// Ceiling for the withdrawal fee window (72 hours).
pub const MAX_WITHDRAW_FEE_PERIOD: u64 = 72 * SECONDS_PER_HOUR;

/// Default performance fee (2%).
pub const DEFAULT_PERFORMANCE_FEE_BPS: u64 = 200;

/// Default call fee (0.25%).
pub const DEFAULT_CALL_FEE_BPS: u64 = 25;

/// Default withdrawal fee (0.1%).
pub const DEFAULT_WITHDRAW_FEE_BPS: u64 = 10;

/// Default withdrawal fee window (72 hours).
pub const DEFAULT_WITHDRAW_FEE_PERIOD: u64 = 72 * SECONDS_PER_HOUR;

/// Ceiling for a fee kind, in basis points.
pub fn max_fee_bps(kind: FeeKind) -> u64 {
    match kind {
        FeeKind::Performance => MAX_PERFORMANCE_FEE_BPS,
        FeeKind::Call => MAX_CALL_FEE_BPS,
        FeeKind::Withdraw => MAX_WITHDRAW_FEE_BPS,
    }
}

/// `amount * bps / 10_000`, rounded down.
pub fn bps_of(amount: u128, bps: u64) -> Result<u128, MathError> {
    mul_div(amount, u128::from(bps), u128::from(BPS_DENOMINATOR), Rounding::Down)
}

/// How a harvested base amount is divided.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestSplit {
    /// Paid to the treasury.
    pub performance_fee: u128,
    /// Paid to the harvest caller.
    pub call_fee: u128,
    /// Returned to the yield source on behalf of depositors.
    pub reinvested: u128,
}

/// Current fee rates and withdrawal window.
///
/// Every value is kept at or below its ceiling: the constructor and the
/// setters reject anything larger and leave the schedule unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    performance_fee_bps: u64,
    call_fee_bps: u64,
    withdraw_fee_bps: u64,
    withdraw_fee_period: u64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            performance_fee_bps: DEFAULT_PERFORMANCE_FEE_BPS,
            call_fee_bps: DEFAULT_CALL_FEE_BPS,
            withdraw_fee_bps: DEFAULT_WITHDRAW_FEE_BPS,
            withdraw_fee_period: DEFAULT_WITHDRAW_FEE_PERIOD,
        }
    }
}

impl FeeSchedule {
    /// Build a schedule, validating every value against its ceiling.
    ///
    /// # Errors
    ///
    /// - [`FeeError::AboveMaximum`] if any rate exceeds its ceiling
    /// - [`FeeError::PeriodAboveMaximum`] if the window exceeds 72 hours
    pub fn new(
        performance_fee_bps: u64,
        call_fee_bps: u64,
        withdraw_fee_bps: u64,
        withdraw_fee_period: u64,
    ) -> Result<Self, FeeError> {
        check_rate(FeeKind::Performance, performance_fee_bps)?;
        check_rate(FeeKind::Call, call_fee_bps)?;
        check_rate(FeeKind::Withdraw, withdraw_fee_bps)?;
        check_period(withdraw_fee_period)?;
        Ok(Self {
            performance_fee_bps,
            call_fee_bps,
            withdraw_fee_bps,
            withdraw_fee_period,
        })
    }

    /// A schedule with every fee at zero.
    pub fn zero() -> Self {
        Self {
            performance_fee_bps: 0,
            call_fee_bps: 0,
            withdraw_fee_bps: 0,
            withdraw_fee_period: 0,
        }
    }

    pub fn performance_fee_bps(&self) -> u64 {
        self.performance_fee_bps
    }

    pub fn call_fee_bps(&self) -> u64 {
        self.call_fee_bps
    }

    pub fn withdraw_fee_bps(&self) -> u64 {
        self.withdraw_fee_bps
    }

    /// Withdrawal fee window in seconds.
    pub fn withdraw_fee_period(&self) -> u64 {
        self.withdraw_fee_period
    }

    /// Rate of the given fee kind.
    pub fn rate(&self, kind: FeeKind) -> u64 {
        match kind {
            FeeKind::Performance => self.performance_fee_bps,
            FeeKind::Call => self.call_fee_bps,
            FeeKind::Withdraw => self.withdraw_fee_bps,
        }
    }

    /// Set one fee rate. Returns the previous rate.
    ///
    /// # Errors
    ///
    /// - [`FeeError::AboveMaximum`] if `bps` exceeds the ceiling for `kind`
    pub fn set_rate(&mut self, kind: FeeKind, bps: u64) -> Result<u64, FeeError> {
        check_rate(kind, bps)?;
        let slot = match kind {
            FeeKind::Performance => &mut self.performance_fee_bps,
            FeeKind::Call => &mut self.call_fee_bps,
            FeeKind::Withdraw => &mut self.withdraw_fee_bps,
        };
        Ok(std::mem::replace(slot, bps))
    }

    /// Set the withdrawal fee window. Returns the previous window.
    ///
    /// # Errors
    ///
    /// - [`FeeError::PeriodAboveMaximum`] if `seconds` exceeds 72 hours
    pub fn set_withdraw_fee_period(&mut self, seconds: u64) -> Result<u64, FeeError> {
        check_period(seconds)?;
        Ok(std::mem::replace(&mut self.withdraw_fee_period, seconds))
    }

    /// Split a harvested base amount into fees and the reinvested remainder.
    pub fn harvest_split(&self, base: u128) -> Result<HarvestSplit, MathError> {
        let performance_fee = bps_of(base, self.performance_fee_bps)?;
        let call_fee = bps_of(base, self.call_fee_bps)?;
        let reinvested = base
            .checked_sub(performance_fee)
            .and_then(|rest| rest.checked_sub(call_fee))
            .ok_or(MathError::Overflow)?;
        Ok(HarvestSplit {
            performance_fee,
            call_fee,
            reinvested,
        })
    }

    /// Call fee a harvest would pay right now on `base`.
    pub fn pending_call_fee(&self, base: u128) -> Result<u128, MathError> {
        bps_of(base, self.call_fee_bps)
    }

    /// Whether `now` is still inside the withdrawal fee window.
    pub fn in_withdraw_fee_window(&self, last_deposited_time: Timestamp, now: Timestamp) -> bool {
        now < last_deposited_time.saturating_add(self.withdraw_fee_period)
    }

    /// Withdrawal fee on `amount`. Exactly zero once the window has elapsed.
    pub fn withdraw_fee(
        &self,
        amount: u128,
        last_deposited_time: Timestamp,
        now: Timestamp,
    ) -> Result<u128, MathError> {
        if !self.in_withdraw_fee_window(last_deposited_time, now) {
            return Ok(0);
        }
        bps_of(amount, self.withdraw_fee_bps)
    }
}

fn check_rate(kind: FeeKind, bps: u64) -> Result<(), FeeError> {
    let max = max_fee_bps(kind);
    if bps > max {
        return Err(FeeError::AboveMaximum {
            kind,
            value: bps,
            max,
        });
    }
    Ok(())
}

fn check_period(seconds: u64) -> Result<(), FeeError> {
    if seconds > MAX_WITHDRAW_FEE_PERIOD {
        return Err(FeeError::PeriodAboveMaximum {
            value: seconds,
            max: MAX_WITHDRAW_FEE_PERIOD,
        });
    }
    Ok(())
}
