//! Utility modules for the synthUSD engine.
//!
//! This module contains shared utilities used across the engine:
//! - Account and asset addresses
//! - Fixed-point arithmetic
//! - Constants

pub mod address;
pub mod constants;
pub mod math;

pub use address::*;
pub use constants::*;
pub use math::*;
