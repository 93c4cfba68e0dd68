//! Engine configuration and risk parameters.
//!
//! A single set of parameters applies to every collateral asset. They are
//! fixed at construction; there is no governance path to change them.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::constants::*;

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Risk parameters (set at construction)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineParams {
    /// Engine version
    pub version: String,

    /// Percentage of collateral value counted toward solvency
    pub liquidation_threshold: u128,

    /// Percentage of seized collateral paid to liquidators as a bonus
    pub liquidation_bonus: u128,

    /// Health factor below which a position is liquidatable (18 decimals)
    pub min_health_factor: u128,

    /// Maximum number of events kept in memory
    pub max_events: usize,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            liquidation_threshold: LIQUIDATION_THRESHOLD,
            liquidation_bonus: LIQUIDATION_BONUS,
            min_health_factor: MIN_HEALTH_FACTOR,
            max_events: MAX_EVENT_LOG,
        }
    }
}

impl EngineParams {
    /// Override the liquidation threshold (for testing)
    pub fn with_threshold(mut self, threshold: u128) -> Self {
        self.liquidation_threshold = threshold;
        self
    }

    /// Override the liquidation bonus (for testing)
    pub fn with_bonus(mut self, bonus: u128) -> Self {
        self.liquidation_bonus = bonus;
        self
    }

    /// Validate parameters are consistent
    pub fn validate(&self) -> Result<()> {
        if self.liquidation_threshold == 0 || self.liquidation_threshold > LIQUIDATION_PRECISION {
            return Err(Error::ConfigurationError(format!(
                "liquidation threshold {} outside 1..={}",
                self.liquidation_threshold, LIQUIDATION_PRECISION
            )));
        }
        if self.liquidation_bonus >= LIQUIDATION_PRECISION {
            return Err(Error::ConfigurationError(format!(
                "liquidation bonus {} must be below {}",
                self.liquidation_bonus, LIQUIDATION_PRECISION
            )));
        }
        if self.min_health_factor == 0 {
            return Err(Error::ConfigurationError(
                "minimum health factor must be positive".into(),
            ));
        }
        if self.max_events == 0 {
            return Err(Error::ConfigurationError("event log size must be positive".into()));
        }
        Ok(())
    }

    /// Collateralization ratio implied by the threshold, in percent (200 = 200%)
    pub fn min_collateral_ratio_pct(&self) -> u128 {
        LIQUIDATION_PRECISION * LIQUIDATION_PRECISION / self.liquidation_threshold.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_valid() {
        let params = EngineParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.liquidation_threshold, 50);
        assert_eq!(params.liquidation_bonus, 10);
        assert_eq!(params.min_health_factor, PRECISION);
        assert_eq!(params.min_collateral_ratio_pct(), 200);
    }

    #[test]
    fn test_invalid_params_rejected() {
        assert!(EngineParams::default().with_threshold(0).validate().is_err());
        assert!(EngineParams::default().with_threshold(101).validate().is_err());
        assert!(EngineParams::default().with_bonus(100).validate().is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let params = EngineParams::default().with_bonus(5);
        let json = serde_json::to_string(&params).unwrap();
        let back: EngineParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }
}
