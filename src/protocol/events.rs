//! Engine events for state change notifications.
//!
//! Events are buffered inside a transaction and appended to the engine's
//! log only when the operation commits, so a rolled-back operation leaves
//! no trace.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::utils::address::{AccountId, AssetId};

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// All engine event types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolEvent {
    /// Collateral was deposited
    CollateralDeposited(CollateralDepositedEvent),
    /// Collateral was redeemed
    CollateralRedeemed(CollateralRedeemedEvent),
    /// Synthetic was minted against collateral
    DebtMinted(DebtMintedEvent),
    /// Synthetic debt was burned
    DebtBurned(DebtBurnedEvent),
    /// A position was liquidated
    Liquidated(LiquidatedEvent),
}

impl ProtocolEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::CollateralDeposited(_) => "CollateralDeposited",
            Self::CollateralRedeemed(_) => "CollateralRedeemed",
            Self::DebtMinted(_) => "DebtMinted",
            Self::DebtBurned(_) => "DebtBurned",
            Self::Liquidated(_) => "Liquidated",
        }
    }

    /// Accounts whose balances the event touched
    pub fn involves(&self, account: &AccountId) -> bool {
        match self {
            Self::CollateralDeposited(e) => e.account == *account,
            Self::CollateralRedeemed(e) => e.from == *account || e.to == *account,
            Self::DebtMinted(e) => e.account == *account,
            Self::DebtBurned(e) => e.account == *account || e.payer == *account,
            Self::Liquidated(e) => e.target == *account || e.liquidator == *account,
        }
    }

    /// sha256 of the bincode encoding
    pub fn hash(&self) -> Result<[u8; 32]> {
        let data = bincode::serialize(self).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(Sha256::digest(&data).into())
    }
}

/// Collateral credited to an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralDepositedEvent {
    /// Depositor
    pub account: AccountId,
    /// Collateral asset
    pub asset: AssetId,
    /// Quantity deposited
    pub quantity: u128,
}

/// Collateral debited from an account and sent to a recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralRedeemedEvent {
    /// Account the collateral was taken from
    pub from: AccountId,
    /// Recipient of the tokens
    pub to: AccountId,
    /// Collateral asset
    pub asset: AssetId,
    /// Quantity redeemed
    pub quantity: u128,
}

/// Debt recorded against an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtMintedEvent {
    /// Minter
    pub account: AccountId,
    /// Synthetic minted
    pub amount: u128,
    /// Debt after the mint
    pub new_debt: u128,
}

/// Debt paid off
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtBurnedEvent {
    /// Account whose debt shrank
    pub account: AccountId,
    /// Account that supplied the synthetic
    pub payer: AccountId,
    /// Synthetic burned
    pub amount: u128,
    /// Debt after the burn
    pub new_debt: u128,
}

/// Liquidation of an undercollateralized position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidatedEvent {
    /// Liquidated account
    pub target: AccountId,
    /// Account that covered the debt
    pub liquidator: AccountId,
    /// Collateral asset seized
    pub asset: AssetId,
    /// Debt covered
    pub debt_covered: u128,
    /// Collateral seized including bonus
    pub collateral_seized: u128,
    /// Bonus part of the seizure
    pub bonus: u128,
    /// Target health factor before
    pub starting_health_factor: u128,
    /// Target health factor after
    pub ending_health_factor: u128,
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// Bounded, append-only event history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<ProtocolEvent>,
    max_events: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    /// Create an unbounded event log
    pub fn new() -> Self {
        Self::with_capacity(usize::MAX)
    }

    /// Create a log that keeps only the newest `max_events` entries
    pub fn with_capacity(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            max_events,
        }
    }

    /// Add an event to the log
    pub fn push(&mut self, event: ProtocolEvent) {
        self.events.push(event);
        self.prune();
    }

    /// Get all events, oldest first
    pub fn events(&self) -> &[ProtocolEvent] {
        &self.events
    }

    /// Get events of a specific type
    pub fn filter_by_type(&self, event_type: &str) -> Vec<&ProtocolEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Events touching `account`
    pub fn for_account(&self, account: &AccountId) -> Vec<&ProtocolEvent> {
        self.events.iter().filter(|e| e.involves(account)).collect()
    }

    /// Get the number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Merge another event log into this one
    pub fn merge(&mut self, other: EventLog) {
        self.events.extend(other.events);
        self.prune();
    }

    /// Clear all events
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Running sha256 over event hashes; zero for an empty log
    pub fn digest(&self) -> Result<[u8; 32]> {
        if self.events.is_empty() {
            return Ok([0u8; 32]);
        }
        let mut hasher = Sha256::new();
        for event in &self.events {
            hasher.update(event.hash()?);
        }
        Ok(hasher.finalize().into())
    }

    fn prune(&mut self) {
        if self.events.len() > self.max_events {
            self.events.drain(0..self.events.len() - self.max_events);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn deposit(quantity: u128) -> ProtocolEvent {
        ProtocolEvent::CollateralDeposited(CollateralDepositedEvent {
            account: AccountId::from_label("alice"),
            asset: AssetId::from_label("weth"),
            quantity,
        })
    }

    #[test]
    fn test_event_types() {
        assert_eq!(deposit(1).event_type(), "CollateralDeposited");

        let burned = ProtocolEvent::DebtBurned(DebtBurnedEvent {
            account: AccountId::from_label("alice"),
            payer: AccountId::from_label("bob"),
            amount: 5,
            new_debt: 0,
        });
        assert_eq!(burned.event_type(), "DebtBurned");
        assert!(burned.involves(&AccountId::from_label("bob")));
        assert!(!burned.involves(&AccountId::from_label("carol")));
    }

    #[test]
    fn test_event_log() {
        let mut log = EventLog::new();
        assert!(log.is_empty());

        log.push(deposit(1));
        log.push(ProtocolEvent::DebtMinted(DebtMintedEvent {
            account: AccountId::from_label("alice"),
            amount: 10,
            new_debt: 10,
        }));

        assert_eq!(log.len(), 2);
        assert_eq!(log.filter_by_type("DebtMinted").len(), 1);
        assert_eq!(log.for_account(&AccountId::from_label("alice")).len(), 2);
    }

    #[test]
    fn test_bounded_log_keeps_newest() {
        let mut log = EventLog::with_capacity(2);
        log.push(deposit(1));
        log.push(deposit(2));

        let mut buffered = EventLog::new();
        buffered.push(deposit(3));
        log.merge(buffered);

        assert_eq!(log.len(), 2);
        assert_eq!(log.events()[0], deposit(2));
        assert_eq!(log.events()[1], deposit(3));
    }

    #[test]
    fn test_digest() {
        let mut log = EventLog::new();
        let empty = log.digest().unwrap();
        assert_eq!(empty, [0u8; 32]);

        log.push(deposit(1));
        let one = log.digest().unwrap();
        assert_ne!(one, empty);
        assert_eq!(deposit(1).hash().unwrap(), deposit(1).hash().unwrap());
        assert_ne!(deposit(1).hash().unwrap(), deposit(2).hash().unwrap());
    }
}
