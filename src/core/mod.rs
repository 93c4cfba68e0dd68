//! Core modules for the synthUSD engine.
//!
//! This module contains the fundamental building blocks:
//! - Risk parameters
//! - Collateral asset registry
//! - Collateral and debt ledger
//! - Valuation and solvency checks
//! - Token books and the transfer interface

pub mod config;
pub mod ledger;
pub mod registry;
pub mod risk;
pub mod token;
pub mod vault;

pub use config::*;
pub use ledger::*;
pub use registry::*;
pub use risk::*;
pub use token::*;
pub use vault::*;
