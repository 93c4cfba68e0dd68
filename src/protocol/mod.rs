//! Engine orchestration.
//!
//! - Position operations and their atomic execution
//! - Transactions with compensating rollback
//! - Re-entrancy guard
//! - Events

pub mod engine;
pub mod events;
pub mod guard;
pub mod operations;
pub mod transaction;

pub use engine::*;
pub use events::*;
pub use guard::*;
pub use operations::*;
pub use transaction::*;
