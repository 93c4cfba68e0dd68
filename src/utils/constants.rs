//! Protocol constants and magic numbers.
//!
//! All engine-wide constants are defined here for easy auditing and modification.

// ═══════════════════════════════════════════════════════════════════════════════
// FIXED-POINT CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// 18-decimal fixed-point scale (1.0 == 1e18)
pub const PRECISION: u128 = 1_000_000_000_000_000_000;

/// Decimals used by the synthetic token and all USD-denominated values
pub const SYNTH_DECIMALS: u32 = 18;

/// Decimals reported by the reference price feed format
pub const FEED_DECIMALS: u8 = 8;

/// Up-scale factor from an 8-decimal feed answer to 18-decimal fixed point
pub const ADDITIONAL_FEED_PRECISION: u128 = 10_000_000_000;

// ═══════════════════════════════════════════════════════════════════════════════
// RISK CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Share of collateral value counted toward solvency (50 / 100 = 50%)
pub const LIQUIDATION_THRESHOLD: u128 = 50;

/// Denominator for threshold and bonus percentages
pub const LIQUIDATION_PRECISION: u128 = 100;

/// Extra collateral awarded to liquidators (10 / 100 = 10%)
pub const LIQUIDATION_BONUS: u128 = 10;

/// Health factor at or above which a position is solvent (1.0)
pub const MIN_HEALTH_FACTOR: u128 = PRECISION;

/// Health factor reported for positions without debt
pub const MAX_HEALTH_FACTOR: u128 = u128::MAX;

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTIFIER CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Length of an account or asset address in bytes
pub const ADDRESS_LENGTH: usize = 20;

/// Maximum events retained in the engine's in-memory log
pub const MAX_EVENT_LOG: usize = 10_000;
