//! Collateral ledger.
//!
//! Owns every mutable balance of the engine:
//! - per-account, per-asset deposited collateral (base units)
//! - per-account minted debt (18-decimal fixed point)
//! - running totals, checked by `verify_invariant`
//!
//! Zeroed entries are pruned, so an emptied account is indistinguishable
//! from one that never existed.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::utils::address::{AccountId, AssetId};
use crate::utils::math::{safe_add, safe_sub};

// ═══════════════════════════════════════════════════════════════════════════════
// ACCOUNT
// ═══════════════════════════════════════════════════════════════════════════════

/// Balances of a single account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Deposited quantity per asset
    pub collateral: HashMap<AssetId, u128>,
    /// Minted synthetic debt
    pub debt: u128,
}

impl Account {
    /// Deposited quantity of `asset`
    pub fn collateral_of(&self, asset: &AssetId) -> u128 {
        self.collateral.get(asset).copied().unwrap_or(0)
    }

    /// Check if the account holds any collateral
    pub fn has_collateral(&self) -> bool {
        self.collateral.values().any(|&q| q > 0)
    }

    /// Check if the account has debt
    pub fn has_debt(&self) -> bool {
        self.debt > 0
    }

    /// No collateral and no debt
    pub fn is_empty(&self) -> bool {
        !self.has_collateral() && !self.has_debt()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LEDGER
// ═══════════════════════════════════════════════════════════════════════════════

/// All accounts plus running totals
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralLedger {
    accounts: HashMap<AccountId, Account>,
    total_collateral: HashMap<AssetId, u128>,
    total_debt: u128,
}

impl CollateralLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // COLLATERAL
    // ═══════════════════════════════════════════════════════════════════════════

    /// Add `quantity` of `asset` to `account`; returns the new balance
    pub fn credit_collateral(
        &mut self,
        account: AccountId,
        asset: AssetId,
        quantity: u128,
    ) -> Result<u128> {
        let new_total = safe_add(self.total_collateral(&asset), quantity)?;
        let new_balance = safe_add(self.collateral_of(&account, &asset), quantity)?;

        if new_balance > 0 {
            self.accounts
                .entry(account)
                .or_default()
                .collateral
                .insert(asset, new_balance);
        }
        self.set_total_collateral(asset, new_total);

        Ok(new_balance)
    }

    /// Remove `quantity` of `asset` from `account`; returns the new balance.
    ///
    /// Fails with `InsufficientCollateral` instead of wrapping.
    pub fn debit_collateral(
        &mut self,
        account: AccountId,
        asset: AssetId,
        quantity: u128,
    ) -> Result<u128> {
        let available = self.collateral_of(&account, &asset);
        if quantity > available {
            return Err(Error::InsufficientCollateral {
                required: quantity,
                available,
            });
        }

        let new_balance = available - quantity;
        let new_total = safe_sub(self.total_collateral(&asset), quantity)?;

        if let Some(entry) = self.accounts.get_mut(&account) {
            if new_balance == 0 {
                entry.collateral.remove(&asset);
            } else {
                entry.collateral.insert(asset, new_balance);
            }
        }
        self.set_total_collateral(asset, new_total);
        self.prune(&account);

        Ok(new_balance)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // DEBT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Increase `account`'s debt; returns the new debt
    pub fn add_debt(&mut self, account: AccountId, amount: u128) -> Result<u128> {
        let new_total = safe_add(self.total_debt, amount)?;
        let new_debt = safe_add(self.debt_of(&account), amount)?;

        if new_debt > 0 {
            self.accounts.entry(account).or_default().debt = new_debt;
        }
        self.total_debt = new_total;

        Ok(new_debt)
    }

    /// Decrease `account`'s debt; returns the new debt.
    ///
    /// Fails with `InsufficientDebt` when `amount` exceeds the debt.
    pub fn sub_debt(&mut self, account: AccountId, amount: u128) -> Result<u128> {
        let available = self.debt_of(&account);
        if amount > available {
            return Err(Error::InsufficientDebt {
                required: amount,
                available,
            });
        }

        let new_debt = available - amount;
        self.total_debt = safe_sub(self.total_debt, amount)?;
        if let Some(entry) = self.accounts.get_mut(&account) {
            entry.debt = new_debt;
        }
        self.prune(&account);

        Ok(new_debt)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Deposited quantity of `asset` held by `account`
    pub fn collateral_of(&self, account: &AccountId, asset: &AssetId) -> u128 {
        self.accounts
            .get(account)
            .map(|a| a.collateral_of(asset))
            .unwrap_or(0)
    }

    /// Minted debt of `account`
    pub fn debt_of(&self, account: &AccountId) -> u128 {
        self.accounts.get(account).map(|a| a.debt).unwrap_or(0)
    }

    /// Account balances, if any
    pub fn account(&self, account: &AccountId) -> Option<&Account> {
        self.accounts.get(account)
    }

    /// Copy of the account's balances; empty when unknown
    pub fn account_or_default(&self, account: &AccountId) -> Account {
        self.accounts.get(account).cloned().unwrap_or_default()
    }

    /// Identifiers of all non-empty accounts
    pub fn account_ids(&self) -> impl Iterator<Item = &AccountId> + '_ {
        self.accounts.keys()
    }

    /// Number of non-empty accounts
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Total deposited quantity of `asset` across all accounts
    pub fn total_collateral(&self, asset: &AssetId) -> u128 {
        self.total_collateral.get(asset).copied().unwrap_or(0)
    }

    /// Total minted debt across all accounts
    pub fn total_debt(&self) -> u128 {
        self.total_debt
    }

    /// Verify totals equal the sum of account balances
    pub fn verify_invariant(&self) -> Result<()> {
        let mut sums: HashMap<AssetId, u128> = HashMap::new();
        let mut debt_sum = 0u128;

        for account in self.accounts.values() {
            for (asset, qty) in &account.collateral {
                let entry = sums.entry(*asset).or_default();
                *entry = safe_add(*entry, *qty)?;
            }
            debt_sum = safe_add(debt_sum, account.debt)?;
        }

        if debt_sum != self.total_debt {
            return Err(Error::InvariantViolation(format!(
                "debt sum {} != total debt {}",
                debt_sum, self.total_debt
            )));
        }

        let stored: HashMap<AssetId, u128> = self
            .total_collateral
            .iter()
            .filter(|(_, &q)| q > 0)
            .map(|(a, q)| (*a, *q))
            .collect();
        if sums != stored {
            return Err(Error::InvariantViolation(
                "collateral totals diverge from account balances".into(),
            ));
        }

        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Deterministic sha256 over sorted balances
    pub fn state_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.total_debt.to_be_bytes());

        let mut accounts: Vec<_> = self.accounts.iter().collect();
        accounts.sort_by_key(|(id, _)| **id);

        for (id, account) in accounts {
            hasher.update(id.as_bytes());
            hasher.update(account.debt.to_be_bytes());

            let mut collateral: Vec<_> = account.collateral.iter().collect();
            collateral.sort_by_key(|(asset, _)| **asset);
            for (asset, qty) in collateral {
                hasher.update(asset.as_bytes());
                hasher.update(qty.to_be_bytes());
            }
        }

        hasher.finalize().into()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL
    // ═══════════════════════════════════════════════════════════════════════════

    fn set_total_collateral(&mut self, asset: AssetId, total: u128) {
        if total == 0 {
            self.total_collateral.remove(&asset);
        } else {
            self.total_collateral.insert(asset, total);
        }
    }

    fn prune(&mut self, account: &AccountId) {
        if self.accounts.get(account).is_some_and(Account::is_empty) {
            self.accounts.remove(account);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAD: u128 = 1_000_000_000_000_000_000;

    fn alice() -> AccountId {
        AccountId::from_label("alice")
    }

    fn bob() -> AccountId {
        AccountId::from_label("bob")
    }

    fn weth() -> AssetId {
        AssetId::from_label("weth")
    }

    #[test]
    fn test_credit_collateral() {
        let mut ledger = CollateralLedger::new();
        assert_eq!(ledger.credit_collateral(alice(), weth(), 10 * WAD).unwrap(), 10 * WAD);
        assert_eq!(ledger.credit_collateral(alice(), weth(), 5 * WAD).unwrap(), 15 * WAD);

        assert_eq!(ledger.collateral_of(&alice(), &weth()), 15 * WAD);
        assert_eq!(ledger.total_collateral(&weth()), 15 * WAD);
        assert_eq!(ledger.account_count(), 1);
    }

    #[test]
    fn test_debit_insufficient_fails_without_change() {
        let mut ledger = CollateralLedger::new();
        ledger.credit_collateral(alice(), weth(), WAD).unwrap();

        let err = ledger.debit_collateral(alice(), weth(), 2 * WAD).unwrap_err();
        assert_eq!(
            err,
            Error::InsufficientCollateral { required: 2 * WAD, available: WAD }
        );
        assert_eq!(ledger.collateral_of(&alice(), &weth()), WAD);
    }

    #[test]
    fn test_round_trip_prunes_account() {
        let before = CollateralLedger::new();
        let mut ledger = before.clone();

        ledger.credit_collateral(alice(), weth(), 3 * WAD).unwrap();
        ledger.debit_collateral(alice(), weth(), 3 * WAD).unwrap();

        assert_eq!(ledger, before);
        assert!(ledger.account(&alice()).is_none());
    }

    #[test]
    fn test_debt_accounting() {
        let mut ledger = CollateralLedger::new();
        ledger.add_debt(alice(), 9_000 * WAD).unwrap();
        ledger.add_debt(bob(), 1_000 * WAD).unwrap();
        assert_eq!(ledger.total_debt(), 10_000 * WAD);

        assert_eq!(ledger.sub_debt(alice(), 4_500 * WAD).unwrap(), 4_500 * WAD);
        assert!(matches!(
            ledger.sub_debt(bob(), 2_000 * WAD),
            Err(Error::InsufficientDebt { .. })
        ));
        assert_eq!(ledger.total_debt(), 5_500 * WAD);
    }

    #[test]
    fn test_invariant_holds() {
        let mut ledger = CollateralLedger::new();
        ledger.credit_collateral(alice(), weth(), 10 * WAD).unwrap();
        ledger.credit_collateral(bob(), weth(), 2 * WAD).unwrap();
        ledger.add_debt(alice(), 100).unwrap();
        ledger.debit_collateral(alice(), weth(), 4 * WAD).unwrap();

        assert!(ledger.verify_invariant().is_ok());
    }

    #[test]
    fn test_bytes_round_trip() {
        let mut ledger = CollateralLedger::new();
        ledger.credit_collateral(alice(), weth(), 7).unwrap();
        ledger.add_debt(alice(), 3).unwrap();

        let restored = CollateralLedger::from_bytes(&ledger.to_bytes().unwrap()).unwrap();
        assert_eq!(restored, ledger);
        assert_eq!(restored.state_hash(), ledger.state_hash());
    }

    #[test]
    fn test_state_hash_changes_with_balances() {
        let mut a = CollateralLedger::new();
        let mut b = CollateralLedger::new();
        a.credit_collateral(alice(), weth(), 1).unwrap();
        b.credit_collateral(alice(), weth(), 2).unwrap();
        assert_ne!(a.state_hash(), b.state_hash());
    }
}
