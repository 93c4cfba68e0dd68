//! Engine operations as data.
//!
//! Each variant describes one atomic call on the engine, so scenarios and
//! other drivers can queue, serialize and replay them.

use serde::{Deserialize, Serialize};

use crate::liquidation::engine::LiquidationOutcome;
use crate::utils::address::{AccountId, AssetId};

/// A mutating engine call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    /// Lock collateral
    Deposit {
        /// Position owner
        account: AccountId,
        /// Collateral asset
        asset: AssetId,
        /// Collateral quantity
        quantity: u128,
    },
    /// Mint synthetic against locked collateral
    Mint {
        /// Position owner
        account: AccountId,
        /// Synthetic amount
        amount: u128,
    },
    /// Withdraw collateral to a recipient
    Redeem {
        /// Position owner
        account: AccountId,
        /// Collateral asset
        asset: AssetId,
        /// Collateral quantity
        quantity: u128,
        /// Wallet receiving the collateral
        recipient: AccountId,
    },
    /// Pay off debt with synthetic supplied by `payer`
    Burn {
        /// Position owner
        account: AccountId,
        /// Synthetic amount
        amount: u128,
        /// Wallet supplying the synthetic
        payer: AccountId,
    },
    /// Deposit then mint
    DepositAndMint {
        /// Position owner
        account: AccountId,
        /// Collateral asset
        asset: AssetId,
        /// Collateral quantity
        quantity: u128,
        /// Synthetic amount
        amount: u128,
    },
    /// Burn then redeem
    RedeemAndBurn {
        /// Position owner
        account: AccountId,
        /// Collateral asset
        asset: AssetId,
        /// Collateral quantity
        quantity: u128,
        /// Synthetic amount
        amount: u128,
    },
    /// Liquidate an undercollateralized position
    Liquidate {
        /// Caller covering the debt
        liquidator: AccountId,
        /// Position being liquidated
        target: AccountId,
        /// Collateral asset
        asset: AssetId,
        /// Debt repaid by the liquidator
        debt_to_cover: u128,
    },
}

impl Operation {
    /// Get the operation type name
    pub fn operation_type(&self) -> &'static str {
        match self {
            Operation::Deposit { .. } => "Deposit",
            Operation::Mint { .. } => "Mint",
            Operation::Redeem { .. } => "Redeem",
            Operation::Burn { .. } => "Burn",
            Operation::DepositAndMint { .. } => "DepositAndMint",
            Operation::RedeemAndBurn { .. } => "RedeemAndBurn",
            Operation::Liquidate { .. } => "Liquidate",
        }
    }

    /// Account issuing the call
    pub fn caller(&self) -> &AccountId {
        match self {
            Operation::Deposit { account, .. }
            | Operation::Mint { account, .. }
            | Operation::Redeem { account, .. }
            | Operation::Burn { account, .. }
            | Operation::DepositAndMint { account, .. }
            | Operation::RedeemAndBurn { account, .. } => account,
            Operation::Liquidate { liquidator, .. } => liquidator,
        }
    }
}

/// What a committed operation produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationResult {
    /// New deposited balance
    Collateral {
        /// Position owner
        account: AccountId,
        /// Collateral asset
        asset: AssetId,
        /// Deposited balance after the call
        balance: u128,
    },
    /// New debt
    Debt {
        /// Position owner
        account: AccountId,
        /// Debt after the call
        debt: u128,
    },
    /// Composite operation committed
    Completed,
    /// Liquidation details
    Liquidation(LiquidationOutcome),
}
