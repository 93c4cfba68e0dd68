//! # synthUSD
//!
//! An overcollateralized synthetic-asset issuance engine. Accounts lock
//! collateral in whitelisted assets, mint a USD-pegged synthetic against it
//! and must keep a health factor of at least 1.0. Positions that fall below
//! it can be partially liquidated by anyone for a 10% collateral bonus.
//!
//! ## Architecture
//!
//! - **Core**: Collateral ledger, asset registry, risk engine, token books
//! - **Oracle**: Price feed interface and a settable in-memory feed
//! - **Liquidation**: Seizure sizing, health checks and statistics
//! - **Protocol**: The engine, atomic transactions, re-entrancy guard, events
//! - **CLI**: Configuration, output and scripted scenarios
//!
//! ## Example
//!
//! ```rust,ignore
//! use synthusd::prelude::*;
//!
//! let engine = SynthEngine::new(registry, synthetic, custody, vault, EngineParams::default())?;
//! engine.deposit_and_mint(alice, weth, 10 * PRECISION, 9_000 * PRECISION)?;
//! assert!(engine.health_factor(&alice)? >= MIN_HEALTH_FACTOR);
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    unused_lifetimes,
    unused_qualifications
)]

pub mod cli;
pub mod core;
pub mod error;
pub mod liquidation;
pub mod oracle;
pub mod protocol;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        config::EngineParams,
        ledger::{Account, CollateralLedger},
        registry::AssetRegistry,
        risk::{AccountSnapshot, AccountStatus},
        vault::{InMemoryVault, TransferCollaborator},
    };
    pub use crate::error::{Error, Result};
    pub use crate::liquidation::engine::{LiquidationEngine, LiquidationOutcome};
    pub use crate::oracle::price_feed::{PriceData, PriceFeed, PriceOracle};
    pub use crate::protocol::{
        engine::SynthEngine,
        events::ProtocolEvent,
        operations::{Operation, OperationResult},
    };
    pub use crate::utils::{
        address::{AccountId, Address, AssetId},
        constants::{MIN_HEALTH_FACTOR, PRECISION},
    };
}

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name
pub const PROTOCOL_NAME: &str = "synthUSD";
