//! Division helpers shared by every strategy.
//!
//! A zero denominator is a policy decision, never an arithmetic fault: the
//! caller names the value to use instead.

use rust_decimal::Decimal;

/// `numerator / denominator`, or `on_zero` when the denominator is zero
/// (or the quotient does not fit in a `Decimal`).
pub fn safe_ratio(numerator: Decimal, denominator: Decimal, on_zero: Decimal) -> Decimal {
    if denominator.is_zero() {
        return on_zero;
    }
    numerator.checked_div(denominator).unwrap_or(on_zero)
}

/// `value / max` clamped to `[0, 1]`, with a zero maximum yielding zero.
pub fn normalized(value: Decimal, max: Decimal) -> Decimal {
    safe_ratio(value, max, Decimal::ZERO).clamp(Decimal::ZERO, Decimal::ONE)
}
