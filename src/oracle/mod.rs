//! Oracle module for price feeds.
//!
//! The engine only ever pulls prices through [`PriceOracle`]; how a feed is
//! updated is the adapter's business. [`PriceFeed`] is the in-memory adapter
//! used by scenarios and tests.

pub mod price_feed;

pub use price_feed::*;
