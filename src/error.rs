//! Error types for the synthUSD engine.
//!
//! Every failure is surfaced to the caller; a failed operation never leaves
//! partial state behind.

use thiserror::Error;

use crate::utils::address::AssetId;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the synthUSD engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ═══════════════════════════════════════════════════════════════════
    // Configuration Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Bad construction inputs (fatal, construction aborts)
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    // ═══════════════════════════════════════════════════════════════════
    // Caller Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Amount is zero
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    /// Asset is not registered as collateral
    #[error("Asset {0} is not allowed as collateral")]
    AssetNotAllowed(AssetId),

    /// Not enough deposited collateral for the requested operation
    #[error("Insufficient collateral: required {required}, available {available}")]
    InsufficientCollateral {
        /// Requested quantity
        required: u128,
        /// Deposited quantity
        available: u128,
    },

    /// Burn exceeds the account's minted debt
    #[error("Insufficient debt: required {required}, available {available}")]
    InsufficientDebt {
        /// Requested burn amount
        required: u128,
        /// Outstanding debt
        available: u128,
    },

    /// Wallet balance too small for a token movement
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Requested amount
        required: u128,
        /// Wallet balance
        available: u128,
    },

    /// Invalid input parameter
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Reason for invalidity
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Solvency Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Post-condition solvency violated
    #[error("Health factor broken: {0}")]
    HealthFactorBroken(u128),

    /// Liquidation target is solvent
    #[error("Health factor {0} is okay, position cannot be liquidated")]
    HealthFactorOkay(u128),

    /// Liquidation did not improve the target's health factor
    #[error("Health factor not improved: starting {starting}, ending {ending}")]
    HealthFactorNotImproved {
        /// Health factor before liquidation
        starting: u128,
        /// Health factor after liquidation
        ending: u128,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Collaborator Errors
    // ═══════════════════════════════════════════════════════════════════

    /// External transfer collaborator declined
    #[error("Transfer failed: {operation} of {asset}")]
    TransferFailed {
        /// Collaborator call that failed
        operation: String,
        /// Asset being moved
        asset: AssetId,
    },

    /// Price feed cannot answer
    #[error("Oracle unavailable for {asset}: {reason}")]
    OracleUnavailable {
        /// Asset being priced
        asset: AssetId,
        /// Reason reported by the adapter
        reason: String,
    },

    /// A mutating operation was entered while another was in progress
    #[error("Re-entrant call rejected")]
    ReentrantCall,

    /// Compensating an external effect failed during rollback
    #[error("Rollback incomplete after {original}: {failed}")]
    RollbackIncomplete {
        /// The error that triggered the rollback
        original: String,
        /// The compensation that failed
        failed: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Arithmetic Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Overflow in calculation
    #[error("Arithmetic overflow in {operation}")]
    Overflow {
        /// Operation that overflowed
        operation: String,
    },

    /// Underflow in calculation
    #[error("Arithmetic underflow in {operation}")]
    Underflow {
        /// Operation that underflowed
        operation: String,
    },

    /// Invariant violation detected
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    // ═══════════════════════════════════════════════════════════════════
    // Serialization Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ═══════════════════════════════════════════════════════════════════
    // Internal Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Lock acquisition failed
    #[error("Failed to acquire lock")]
    Lock,
}

impl Error {
    /// Returns true if the caller can fix the request and retry
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InvalidAmount
                | Error::AssetNotAllowed(_)
                | Error::InsufficientCollateral { .. }
                | Error::InsufficientDebt { .. }
                | Error::InsufficientBalance { .. }
                | Error::HealthFactorBroken(_)
                | Error::HealthFactorOkay(_)
                | Error::HealthFactorNotImproved { .. }
                | Error::OracleUnavailable { .. }
                | Error::TransferFailed { .. }
        )
    }

    /// Returns true if this is a critical error requiring immediate attention
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Error::InvariantViolation(_)
                | Error::RollbackIncomplete { .. }
                | Error::Overflow { .. }
                | Error::Underflow { .. }
                | Error::Lock
        )
    }

    /// Returns the error code for external systems
    pub fn code(&self) -> u32 {
        match self {
            // Configuration errors: 1xxx
            Error::ConfigurationError(_) => 1001,

            // Caller errors: 2xxx
            Error::InvalidAmount => 2001,
            Error::AssetNotAllowed(_) => 2002,
            Error::InsufficientCollateral { .. } => 2003,
            Error::InsufficientDebt { .. } => 2004,
            Error::InvalidParameter { .. } => 2005,
            Error::InsufficientBalance { .. } => 2006,

            // Solvency errors: 3xxx
            Error::HealthFactorBroken(_) => 3001,
            Error::HealthFactorOkay(_) => 3002,
            Error::HealthFactorNotImproved { .. } => 3003,

            // Collaborator errors: 4xxx
            Error::TransferFailed { .. } => 4001,
            Error::OracleUnavailable { .. } => 4002,
            Error::ReentrantCall => 4003,
            Error::RollbackIncomplete { .. } => 4004,

            // Arithmetic errors: 5xxx
            Error::Overflow { .. } => 5001,
            Error::Underflow { .. } => 5002,
            Error::InvariantViolation(_) => 5003,

            // Serialization errors: 7xxx
            Error::Serialization(_) => 7001,
            Error::Deserialization(_) => 7002,

            // Internal errors: 9xxx
            Error::Lock => 9001,
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Error::Lock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_unique() {
        let asset = AssetId::from_label("weth");
        let codes = vec![
            Error::ConfigurationError("".into()).code(),
            Error::InvalidAmount.code(),
            Error::AssetNotAllowed(asset).code(),
            Error::InsufficientCollateral { required: 0, available: 0 }.code(),
            Error::InsufficientDebt { required: 0, available: 0 }.code(),
            Error::InsufficientBalance { required: 0, available: 0 }.code(),
            Error::HealthFactorBroken(0).code(),
            Error::HealthFactorOkay(0).code(),
            Error::HealthFactorNotImproved { starting: 0, ending: 0 }.code(),
            Error::TransferFailed { operation: "".into(), asset }.code(),
            Error::OracleUnavailable { asset, reason: "".into() }.code(),
            Error::ReentrantCall.code(),
            Error::Lock.code(),
        ];

        let mut unique_codes = codes.clone();
        unique_codes.sort();
        unique_codes.dedup();

        assert_eq!(codes.len(), unique_codes.len(), "Error codes must be unique");
    }

    #[test]
    fn test_error_display() {
        let err = Error::InsufficientCollateral {
            required: 1000,
            available: 500,
        };
        assert!(err.to_string().contains("1000"));
        assert!(err.to_string().contains("500"));

        let err = Error::HealthFactorBroken(42);
        assert_eq!(err.to_string(), "Health factor broken: 42");
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::HealthFactorBroken(0).is_recoverable());
        assert!(!Error::ReentrantCall.is_recoverable());
    }

    #[test]
    fn test_is_critical() {
        assert!(Error::RollbackIncomplete { original: "a".into(), failed: "b".into() }.is_critical());
        assert!(Error::Overflow { operation: "test".into() }.is_critical());
        assert!(!Error::InvalidAmount.is_critical());
    }

    #[test]
    fn test_poison_maps_to_lock() {
        let lock = std::sync::Mutex::new(0u8);
        let _ = std::panic::catch_unwind(|| {
            let _guard = lock.lock().unwrap();
            panic!("poison");
        });
        let err: Error = lock.lock().unwrap_err().into();
        assert_eq!(err, Error::Lock);
    }
}
