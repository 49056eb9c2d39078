//! Micro-unit fixed-point helpers
//!
//! All monetary and share quantities cross the wire as base-10 integers
//! scaled by 10^6. Display-facing conversions round to nearest; "use all
//! available balance" conversions floor so we never request more than is
//! held. Amounts whose scaled value does not fit in u64 are rejected, not
//! truncated.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::{CoreError, CoreResult};

/// Fixed-point scale for all on-wire amounts (10^6)
pub const MICRO_UNIT: u64 = 1_000_000;

fn out_of_range(amount: Decimal) -> CoreError {
    CoreError::validation(format!(
        "Amount {} is outside the representable micro-unit range",
        amount
    ))
}

/// Convert a human amount to micro-units, rounding to nearest
///
/// Used for display-derived amounts (order legs), where the nearest
/// representable value is wanted.
pub fn round_to_micro(amount: Decimal) -> CoreResult<u64> {
    amount
        .checked_mul(Decimal::from(MICRO_UNIT))
        .map(|scaled| scaled.round())
        .and_then(|scaled| scaled.to_u64())
        .ok_or_else(|| out_of_range(amount))
}

/// Convert a human amount to micro-units, truncating
///
/// Used for "spend everything" amounts where rounding up would exceed the
/// available balance.
pub fn floor_to_micro(amount: Decimal) -> CoreResult<u64> {
    amount
        .checked_mul(Decimal::from(MICRO_UNIT))
        .map(|scaled| scaled.floor())
        .and_then(|scaled| scaled.to_u64())
        .ok_or_else(|| out_of_range(amount))
}

/// Format a micro-unit amount as a human-readable decimal string
pub fn format_micro(raw_amount: u128) -> String {
    let divisor = MICRO_UNIT as u128;
    let whole = raw_amount / divisor;
    let fraction = raw_amount % divisor;

    if fraction == 0 {
        format!("{}.00", whole)
    } else {
        format!("{}.{:0>6}", whole, fraction)
    }
}
