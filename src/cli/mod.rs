//! synthUSD Command Line Interface.
//!
//! Operator tooling around an in-memory engine: configuration, output
//! formatting and scripted scenarios.

pub mod config;
pub mod output;
pub mod scenario;

pub use config::*;
pub use output::*;
pub use scenario::*;
