//! Fixed-point arithmetic and mathematical utilities.
//!
//! All USD values and synthetic debt are 18-decimal integers (`u128`).
//! Products such as `collateral_usd * 1e18` exceed 128 bits for realistic
//! balances, so multiply-then-divide goes through a 256-bit intermediate.

use num_traits::ToPrimitive;
use ruint::aliases::U256;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::utils::constants::{
    ADDITIONAL_FEED_PRECISION, LIQUIDATION_PRECISION, MAX_HEALTH_FACTOR, PRECISION,
    SYNTH_DECIMALS,
};

// ═══════════════════════════════════════════════════════════════════════════════
// WIDE ARITHMETIC
// ═══════════════════════════════════════════════════════════════════════════════

/// Computes `floor(a * b / c)` without intermediate overflow
pub fn mul_div(a: u128, b: u128, c: u128) -> Result<u128> {
    if c == 0 {
        return Err(Error::InvalidParameter {
            name: "divisor".into(),
            reason: "division by zero".into(),
        });
    }
    let quotient = (U256::from(a) * U256::from(b)) / U256::from(c);
    u128::try_from(quotient).map_err(|_| Error::Overflow {
        operation: format!("({} * {}) / {}", a, b, c),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// SAFE ARITHMETIC OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Safe addition with overflow check
pub fn safe_add(a: u128, b: u128) -> Result<u128> {
    a.checked_add(b).ok_or(Error::Overflow {
        operation: format!("{} + {}", a, b),
    })
}

/// Safe subtraction with underflow check
pub fn safe_sub(a: u128, b: u128) -> Result<u128> {
    a.checked_sub(b).ok_or(Error::Underflow {
        operation: format!("{} - {}", a, b),
    })
}

/// Safe multiplication with overflow check
pub fn safe_mul(a: u128, b: u128) -> Result<u128> {
    a.checked_mul(b).ok_or(Error::Overflow {
        operation: format!("{} * {}", a, b),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// VALUATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Up-scale an 8-decimal feed answer to 18-decimal fixed point
pub fn feed_price_to_wad(answer: u128) -> Result<u128> {
    safe_mul(answer, ADDITIONAL_FEED_PRECISION)
}

/// USD value (18 decimals) of `quantity` base units at an 8-decimal feed answer.
///
/// `quantity * answer * 1e10 / 1e18`, floored.
pub fn calculate_usd_value(quantity: u128, answer: u128) -> Result<u128> {
    mul_div(feed_price_to_wad(answer)?, quantity, PRECISION)
}

/// Quantity of base units worth `usd_amount` at an 8-decimal feed answer.
///
/// `usd_amount * 1e18 / (answer * 1e10)`, floored.
pub fn calculate_quantity_from_usd(usd_amount: u128, answer: u128) -> Result<u128> {
    let price = feed_price_to_wad(answer)?;
    if price == 0 {
        return Err(Error::InvalidParameter {
            name: "price".into(),
            reason: "price must be positive".into(),
        });
    }
    mul_div(usd_amount, PRECISION, price)
}

/// Health factor for a position.
///
/// `floor(floor(collateral_usd * threshold / 100) * 1e18 / debt)`.
/// Zero debt yields [`MAX_HEALTH_FACTOR`]; results beyond 128 bits saturate.
pub fn calculate_health_factor(
    collateral_usd: u128,
    debt: u128,
    liquidation_threshold: u128,
) -> Result<u128> {
    if debt == 0 {
        return Ok(MAX_HEALTH_FACTOR);
    }

    let adjusted = mul_div(collateral_usd, liquidation_threshold, LIQUIDATION_PRECISION)?;
    match mul_div(adjusted, PRECISION, debt) {
        Ok(hf) => Ok(hf),
        Err(Error::Overflow { .. }) => Ok(MAX_HEALTH_FACTOR),
        Err(e) => Err(e),
    }
}

/// Percentage share of `amount` (`amount * pct / 100`, floored)
pub fn calculate_percentage(amount: u128, pct: u128) -> Result<u128> {
    mul_div(amount, pct, LIQUIDATION_PRECISION)
}

// ═══════════════════════════════════════════════════════════════════════════════
// DECIMAL CONVERSION
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse a human decimal string ("4.95") into an 18-decimal integer.
///
/// Digits beyond the 18th decimal place are truncated.
pub fn parse_wad(s: &str) -> Result<u128> {
    let value = Decimal::from_str(s.trim()).map_err(|e| Error::InvalidParameter {
        name: "amount".into(),
        reason: format!("{}: {}", s, e),
    })?;
    if value.is_sign_negative() {
        return Err(Error::InvalidParameter {
            name: "amount".into(),
            reason: format!("{} is negative", s),
        });
    }

    let int_part = value.trunc();
    let frac_part = value - int_part;

    let int_units = int_part.to_u128().ok_or_else(|| Error::Overflow {
        operation: format!("parse {}", s),
    })?;
    let frac_units = (frac_part * Decimal::from(PRECISION as u64))
        .trunc()
        .to_u128()
        .unwrap_or(0);

    safe_add(safe_mul(int_units, PRECISION)?, frac_units)
}

/// Parse a USD price ("2000.5") into an 8-decimal feed answer
pub fn parse_price(s: &str) -> Result<i128> {
    let answer = parse_wad(s)? / ADDITIONAL_FEED_PRECISION;
    i128::try_from(answer).map_err(|_| Error::Overflow {
        operation: format!("parse price {}", s),
    })
}

/// Render an 18-decimal integer as a trimmed decimal string
pub fn format_wad(value: u128) -> String {
    if value == MAX_HEALTH_FACTOR {
        return "∞".to_string();
    }
    if let Ok(signed) = i128::try_from(value) {
        if let Ok(d) = Decimal::try_from_i128_with_scale(signed, SYNTH_DECIMALS) {
            return d.normalize().to_string();
        }
    }

    let int_part = value / PRECISION;
    let frac = format!("{:018}", value % PRECISION);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, frac)
    }
}
