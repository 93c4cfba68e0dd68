//! In-memory fungible token book.
//!
//! Tracks per-holder balances and total supply for one asset. Used by the
//! in-memory vault to stand in for external token contracts.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::utils::address::{AccountId, AssetId};
use crate::utils::math::*;

// ═══════════════════════════════════════════════════════════════════════════════
// TOKEN MOVEMENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Kind of balance change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenOperation {
    /// New supply created
    Mint,
    /// Supply destroyed
    Burn,
    /// Balance moved between holders
    Transfer,
}

/// Record of a balance change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMovement {
    /// Kind of change
    pub operation: TokenOperation,
    /// Sender (None for mint)
    pub from: Option<AccountId>,
    /// Recipient (None for burn)
    pub to: Option<AccountId>,
    /// Amount moved
    pub amount: u128,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TOKEN LEDGER
// ═══════════════════════════════════════════════════════════════════════════════

/// Balances and supply of one token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLedger {
    /// Token being tracked
    pub asset: AssetId,
    total_supply: u128,
    balances: HashMap<AccountId, u128>,
    movements: Vec<TokenMovement>,
    max_movements: usize,
}

impl TokenLedger {
    /// Create an empty book for `asset`
    pub fn new(asset: AssetId) -> Self {
        Self {
            asset,
            total_supply: 0,
            balances: HashMap::new(),
            movements: Vec::new(),
            max_movements: 1000,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SUPPLY MANAGEMENT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Total supply
    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Balance of `owner`
    pub fn balance_of(&self, owner: &AccountId) -> u128 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    /// Create `amount` new tokens for `to`
    pub fn mint(&mut self, to: AccountId, amount: u128) -> Result<()> {
        if amount == 0 {
            return Err(Error::InvalidAmount);
        }

        let new_supply = safe_add(self.total_supply, amount)?;
        let new_balance = safe_add(self.balance_of(&to), amount)?;

        self.balances.insert(to, new_balance);
        self.total_supply = new_supply;

        self.record(TokenMovement {
            operation: TokenOperation::Mint,
            from: None,
            to: Some(to),
            amount,
        });
        Ok(())
    }

    /// Destroy `amount` tokens held by `from`
    pub fn burn(&mut self, from: AccountId, amount: u128) -> Result<()> {
        if amount == 0 {
            return Err(Error::InvalidAmount);
        }

        self.debit(from, amount)?;
        self.total_supply = safe_sub(self.total_supply, amount)?;

        self.record(TokenMovement {
            operation: TokenOperation::Burn,
            from: Some(from),
            to: None,
            amount,
        });
        Ok(())
    }

    /// Move `amount` from `from` to `to`
    pub fn transfer(&mut self, from: AccountId, to: AccountId, amount: u128) -> Result<()> {
        if amount == 0 {
            return Err(Error::InvalidAmount);
        }

        let available = self.balance_of(&from);
        if available < amount {
            return Err(Error::InsufficientBalance {
                required: amount,
                available,
            });
        }
        if from != to {
            let to_balance = safe_add(self.balance_of(&to), amount)?;
            self.debit(from, amount)?;
            self.balances.insert(to, to_balance);
        }

        self.record(TokenMovement {
            operation: TokenOperation::Transfer,
            from: Some(from),
            to: Some(to),
            amount,
        });
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Number of non-zero holders
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    /// Supply equals the sum of all balances
    pub fn verify_supply_invariant(&self) -> bool {
        let mut sum = 0u128;
        for balance in self.balances.values() {
            match sum.checked_add(*balance) {
                Some(s) => sum = s,
                None => return false,
            }
        }
        sum == self.total_supply
    }

    /// Recent balance changes, oldest first
    pub fn recent_movements(&self) -> &[TokenMovement] {
        &self.movements
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL
    // ═══════════════════════════════════════════════════════════════════════════

    fn debit(&mut self, from: AccountId, amount: u128) -> Result<()> {
        let available = self.balance_of(&from);
        if available < amount {
            return Err(Error::InsufficientBalance {
                required: amount,
                available,
            });
        }
        let remaining = available - amount;
        if remaining == 0 {
            self.balances.remove(&from);
        } else {
            self.balances.insert(from, remaining);
        }
        Ok(())
    }

    fn record(&mut self, movement: TokenMovement) {
        self.movements.push(movement);
        if self.movements.len() > self.max_movements {
            self.movements.drain(0..self.movements.len() - self.max_movements);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> TokenLedger {
        TokenLedger::new(AssetId::from_label("weth"))
    }

    #[test]
    fn test_mint_and_burn() {
        let mut t = token();
        let alice = AccountId::from_label("alice");

        t.mint(alice, 1_000).unwrap();
        assert_eq!(t.balance_of(&alice), 1_000);
        assert_eq!(t.total_supply(), 1_000);

        t.burn(alice, 400).unwrap();
        assert_eq!(t.balance_of(&alice), 600);
        assert_eq!(t.total_supply(), 600);
        assert!(t.verify_supply_invariant());
    }

    #[test]
    fn test_burn_insufficient() {
        let mut t = token();
        let alice = AccountId::from_label("alice");
        t.mint(alice, 10).unwrap();

        assert_eq!(
            t.burn(alice, 11),
            Err(Error::InsufficientBalance { required: 11, available: 10 })
        );
        assert_eq!(t.total_supply(), 10);
    }

    #[test]
    fn test_transfer() {
        let mut t = token();
        let alice = AccountId::from_label("alice");
        let bob = AccountId::from_label("bob");
        t.mint(alice, 100).unwrap();

        t.transfer(alice, bob, 100).unwrap();
        assert_eq!(t.balance_of(&alice), 0);
        assert_eq!(t.balance_of(&bob), 100);
        assert_eq!(t.holder_count(), 1);
        assert!(t.verify_supply_invariant());
    }

    #[test]
    fn test_self_transfer_and_zero_amount() {
        let mut t = token();
        let alice = AccountId::from_label("alice");
        t.mint(alice, 5).unwrap();

        t.transfer(alice, alice, 5).unwrap();
        assert_eq!(t.balance_of(&alice), 5);
        assert_eq!(t.transfer(alice, alice, 0), Err(Error::InvalidAmount));
        assert_eq!(t.recent_movements().len(), 2);
    }
}
