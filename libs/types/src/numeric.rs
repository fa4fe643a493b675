//! Tick rounding and fixed-precision helpers
//!
//! Uses rust_decimal for deterministic arithmetic. Every derived price in
//! the engine routes through `round_to_precision` so that repeated
//! mid-price arithmetic never accumulates drift.
//!
//! Midpoints round toward positive infinity (half-up), matching the
//! rounding a browser-side renderer applies to the same numbers.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round to `dp` fractional digits, midpoints toward positive infinity.
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    let strategy = if value.is_sign_negative() {
        RoundingStrategy::MidpointTowardZero
    } else {
        RoundingStrategy::MidpointAwayFromZero
    };
    value.round_dp_with_strategy(dp, strategy)
}

/// `tick_size · floor(price / tick_size)`
///
/// A non-positive tick size leaves the price untouched.
pub fn round_down_to_tick(tick_size: Decimal, price: Decimal) -> Decimal {
    if tick_size <= Decimal::ZERO {
        return price;
    }
    match price.checked_div(tick_size) {
        Some(ticks) => tick_size * ticks.floor(),
        None => price,
    }
}

/// `tick_size · round(price / tick_size)`
///
/// A non-positive tick size leaves the price untouched.
pub fn round_to_tick(tick_size: Decimal, price: Decimal) -> Decimal {
    if tick_size <= Decimal::ZERO {
        return price;
    }
    match price.checked_div(tick_size) {
        Some(ticks) => tick_size * round_half_up(ticks, 0),
        None => price,
    }
}

/// Number of significant fractional digits in `tick_size`.
///
/// `0.000001` → 6, `0.5` → 1, `0.25` → 2, `1` → 0, `10` → 0.
/// Trailing zeros do not count: `0.50` → 1.
pub fn infer_precision(tick_size: Decimal) -> u32 {
    tick_size.normalize().scale()
}

/// Round `value` to `precision` fractional digits.
pub fn round_to_precision(value: Decimal, precision: u32) -> Decimal {
    round_half_up(value, precision)
}


// ── Property-Based Tests ────────────────────────────────────────────
