//! Liquidation module for the synthUSD engine.
//!
//! Sizes seizures of undercollateralized positions, checks that they restore
//! health, and keeps running statistics.

pub mod engine;

pub use engine::*;
