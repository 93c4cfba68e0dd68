//! External token movements.
//!
//! The engine never holds tokens itself. It asks a [`TransferCollaborator`]
//! to pull collateral in, push it out, and mint or burn the synthetic.
//! [`InMemoryVault`] implements that interface over in-memory token books
//! and can be told to fail specific calls.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::core::token::TokenLedger;
use crate::error::{Error, Result};
use crate::utils::address::{AccountId, AssetId};

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSFER INTERFACE
// ═══════════════════════════════════════════════════════════════════════════════

/// Token movements the engine delegates to the outside world.
///
/// Every call returns `Ok(true)` on success. `Ok(false)` or an error aborts
/// the enclosing engine operation and triggers its rollback.
pub trait TransferCollaborator {
    /// Pull `amount` of `asset` from `from` into custody
    fn transfer_in(&mut self, asset: &AssetId, from: &AccountId, amount: u128) -> Result<bool>;

    /// Push `amount` of `asset` from custody to `to`
    fn transfer_out(&mut self, asset: &AssetId, to: &AccountId, amount: u128) -> Result<bool>;

    /// Create `amount` synthetic for `to`
    fn mint_synthetic(&mut self, to: &AccountId, amount: u128) -> Result<bool>;

    /// Destroy `amount` synthetic held in custody
    fn burn_synthetic(&mut self, amount: u128) -> Result<bool>;
}

/// Collaborator call kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallKind {
    /// `transfer_in`
    TransferIn,
    /// `transfer_out`
    TransferOut,
    /// `mint_synthetic`
    MintSynthetic,
    /// `burn_synthetic`
    BurnSynthetic,
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallKind::TransferIn => "transfer_in",
            CallKind::TransferOut => "transfer_out",
            CallKind::MintSynthetic => "mint_synthetic",
            CallKind::BurnSynthetic => "burn_synthetic",
        };
        f.write_str(name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FAULT INJECTION
// ═══════════════════════════════════════════════════════════════════════════════

/// How an injected fault surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FaultMode {
    /// Call returns `Ok(false)`
    Decline,
    /// Call returns an error
    Error,
}

#[derive(Debug, Clone)]
struct Fault {
    kind: CallKind,
    skip: usize,
    mode: FaultMode,
}

/// One collaborator call as observed by the vault
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Call kind
    pub kind: CallKind,
    /// Asset moved
    pub asset: AssetId,
    /// Counterparty wallet (None for burns)
    pub account: Option<AccountId>,
    /// Amount requested
    pub amount: u128,
    /// Whether the movement happened
    pub succeeded: bool,
}

// ═══════════════════════════════════════════════════════════════════════════════
// IN-MEMORY VAULT
// ═══════════════════════════════════════════════════════════════════════════════

/// Token books for every asset plus the engine's custody wallet
#[derive(Debug, Clone)]
pub struct InMemoryVault {
    custody: AccountId,
    synthetic: AssetId,
    tokens: HashMap<AssetId, TokenLedger>,
    faults: Vec<Fault>,
    calls: Vec<CallRecord>,
}

impl InMemoryVault {
    /// Create a vault whose engine custody wallet is `custody`
    pub fn new(synthetic: AssetId, custody: AccountId) -> Self {
        let mut tokens = HashMap::new();
        tokens.insert(synthetic, TokenLedger::new(synthetic));
        Self {
            custody,
            synthetic,
            tokens,
            faults: Vec::new(),
            calls: Vec::new(),
        }
    }

    /// Custody wallet
    pub fn custody(&self) -> AccountId {
        self.custody
    }

    /// Synthetic asset id
    pub fn synthetic(&self) -> AssetId {
        self.synthetic
    }

    /// Credit a wallet out of thin air (test and scenario setup)
    pub fn fund(&mut self, asset: AssetId, owner: AccountId, amount: u128) -> Result<()> {
        self.token_mut(asset).mint(owner, amount)
    }

    /// Wallet balance of `owner` in `asset`
    pub fn balance_of(&self, asset: &AssetId, owner: &AccountId) -> u128 {
        self.tokens.get(asset).map(|t| t.balance_of(owner)).unwrap_or(0)
    }

    /// Total supply of `asset`
    pub fn total_supply(&self, asset: &AssetId) -> u128 {
        self.tokens.get(asset).map(|t| t.total_supply()).unwrap_or(0)
    }

    /// Token book for `asset`, if any movement touched it
    pub fn token(&self, asset: &AssetId) -> Option<&TokenLedger> {
        self.tokens.get(asset)
    }

    /// Make the `nth` upcoming call of `kind` fail (1 = the next one)
    pub fn fail_on(&mut self, kind: CallKind, nth: usize, mode: FaultMode) {
        self.faults.push(Fault {
            kind,
            skip: nth.saturating_sub(1),
            mode,
        });
    }

    /// Drop all pending faults
    pub fn clear_faults(&mut self) {
        self.faults.clear();
    }

    /// Every call received so far, oldest first
    pub fn calls(&self) -> &[CallRecord] {
        &self.calls
    }

    fn token_mut(&mut self, asset: AssetId) -> &mut TokenLedger {
        self.tokens
            .entry(asset)
            .or_insert_with(|| TokenLedger::new(asset))
    }

    fn take_fault(&mut self, kind: CallKind) -> Option<FaultMode> {
        let mut triggered = None;
        self.faults.retain_mut(|fault| {
            if fault.kind != kind {
                return true;
            }
            if fault.skip == 0 {
                if triggered.is_none() {
                    triggered = Some(fault.mode);
                    return false;
                }
                return true;
            }
            fault.skip -= 1;
            true
        });
        triggered
    }

    fn execute(
        &mut self,
        kind: CallKind,
        asset: AssetId,
        account: Option<AccountId>,
        amount: u128,
    ) -> Result<bool> {
        if let Some(mode) = self.take_fault(kind) {
            debug!(call = %kind, asset = %asset, ?mode, "injected fault");
            self.calls.push(CallRecord {
                kind,
                asset,
                account,
                amount,
                succeeded: false,
            });
            return match mode {
                FaultMode::Decline => Ok(false),
                FaultMode::Error => Err(Error::TransferFailed {
                    operation: format!("{} (injected)", kind),
                    asset,
                }),
            };
        }

        let custody = self.custody;
        let token = self.token_mut(asset);
        let moved = match (kind, account) {
            (CallKind::TransferIn, Some(from)) => token.transfer(from, custody, amount),
            (CallKind::TransferOut, Some(to)) => token.transfer(custody, to, amount),
            (CallKind::MintSynthetic, Some(to)) => token.mint(to, amount),
            (CallKind::BurnSynthetic, _) => token.burn(custody, amount),
            (_, None) => Err(Error::InvalidParameter {
                name: "account".into(),
                reason: format!("{} needs a counterparty", kind),
            }),
        };

        // Balance shortfalls are declines, like a token contract returning false
        let succeeded = match moved {
            Ok(()) => true,
            Err(Error::InsufficientBalance { .. }) | Err(Error::InvalidAmount) => false,
            Err(e) => return Err(e),
        };
        self.calls.push(CallRecord {
            kind,
            asset,
            account,
            amount,
            succeeded,
        });
        Ok(succeeded)
    }
}

impl TransferCollaborator for InMemoryVault {
    fn transfer_in(&mut self, asset: &AssetId, from: &AccountId, amount: u128) -> Result<bool> {
        self.execute(CallKind::TransferIn, *asset, Some(*from), amount)
    }

    fn transfer_out(&mut self, asset: &AssetId, to: &AccountId, amount: u128) -> Result<bool> {
        self.execute(CallKind::TransferOut, *asset, Some(*to), amount)
    }

    fn mint_synthetic(&mut self, to: &AccountId, amount: u128) -> Result<bool> {
        let synthetic = self.synthetic;
        self.execute(CallKind::MintSynthetic, synthetic, Some(*to), amount)
    }

    fn burn_synthetic(&mut self, amount: u128) -> Result<bool> {
        let synthetic = self.synthetic;
        self.execute(CallKind::BurnSynthetic, synthetic, None, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> (InMemoryVault, AssetId, AccountId) {
        let synth = AssetId::from_label("synthusd");
        let custody = AccountId::from_label("engine");
        let mut v = InMemoryVault::new(synth, custody);
        let weth = AssetId::from_label("weth");
        let alice = AccountId::from_label("alice");
        v.fund(weth, alice, 100).unwrap();
        (v, weth, alice)
    }

    #[test]
    fn test_transfer_in_and_out() {
        let (mut v, weth, alice) = vault();
        let custody = v.custody();

        assert!(v.transfer_in(&weth, &alice, 60).unwrap());
        assert_eq!(v.balance_of(&weth, &alice), 40);
        assert_eq!(v.balance_of(&weth, &custody), 60);

        assert!(v.transfer_out(&weth, &alice, 10).unwrap());
        assert_eq!(v.balance_of(&weth, &alice), 50);
        assert_eq!(v.total_supply(&weth), 100);
    }

    #[test]
    fn test_shortfall_declines() {
        let (mut v, weth, alice) = vault();
        assert!(!v.transfer_in(&weth, &alice, 101).unwrap());
        assert_eq!(v.balance_of(&weth, &alice), 100);
        assert!(!v.calls()[0].succeeded);
    }

    #[test]
    fn test_mint_and_burn_synthetic() {
        let (mut v, _, alice) = vault();
        let synth = v.synthetic();
        let custody = v.custody();

        assert!(v.mint_synthetic(&alice, 500).unwrap());
        assert!(v.transfer_in(&synth, &alice, 200).unwrap());
        assert!(v.burn_synthetic(200).unwrap());
        assert_eq!(v.balance_of(&synth, &alice), 300);
        assert_eq!(v.balance_of(&synth, &custody), 0);
        assert_eq!(v.total_supply(&synth), 300);
    }

    #[test]
    fn test_fault_on_nth_call() {
        let (mut v, weth, alice) = vault();
        v.fail_on(CallKind::TransferIn, 2, FaultMode::Decline);

        assert!(v.transfer_in(&weth, &alice, 1).unwrap());
        assert!(!v.transfer_in(&weth, &alice, 1).unwrap());
        assert!(v.transfer_in(&weth, &alice, 1).unwrap());
        assert_eq!(v.balance_of(&weth, &alice), 98);
    }

    #[test]
    fn test_fault_error_mode() {
        let (mut v, weth, alice) = vault();
        v.fail_on(CallKind::TransferOut, 1, FaultMode::Error);

        let err = v.transfer_out(&weth, &alice, 1).unwrap_err();
        assert!(matches!(err, Error::TransferFailed { .. }));

        v.fail_on(CallKind::BurnSynthetic, 1, FaultMode::Decline);
        v.clear_faults();
        assert!(!v.burn_synthetic(1).unwrap());
    }
}
