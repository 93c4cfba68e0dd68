//! Atomic operation scope.
//!
//! A [`Transaction`] works on a private copy of the ledger, buffers events
//! and queues external token movements. Checks and ledger effects run
//! first; the queued movements are settled against the collaborator last.
//! If a movement fails, the ones already performed are compensated in
//! reverse order and the copy is dropped, so the committed state is never
//! touched.

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::core::ledger::CollateralLedger;
use crate::core::vault::{CallKind, TransferCollaborator};
use crate::error::{Error, Result};
use crate::liquidation::engine::LiquidationOutcome;
use crate::protocol::events::{EventLog, ProtocolEvent};
use crate::utils::address::{AccountId, AssetId};

// ═══════════════════════════════════════════════════════════════════════════════
// EXTERNAL EFFECTS
// ═══════════════════════════════════════════════════════════════════════════════

/// A token movement requested from the collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Pull collateral or synthetic into custody
    TransferIn {
        /// Token pulled
        asset: AssetId,
        /// Wallet debited
        from: AccountId,
        /// Base units
        amount: u128,
    },
    /// Push collateral out of custody
    TransferOut {
        /// Token pushed
        asset: AssetId,
        /// Wallet credited
        to: AccountId,
        /// Base units
        amount: u128,
    },
    /// Create synthetic for an account
    MintSynthetic {
        /// Wallet credited
        to: AccountId,
        /// Synthetic units
        amount: u128,
    },
    /// Destroy synthetic held in custody
    BurnSynthetic {
        /// Synthetic units
        amount: u128,
    },
}

impl Effect {
    /// Collaborator call this effect maps to
    pub fn kind(&self) -> CallKind {
        match self {
            Effect::TransferIn { .. } => CallKind::TransferIn,
            Effect::TransferOut { .. } => CallKind::TransferOut,
            Effect::MintSynthetic { .. } => CallKind::MintSynthetic,
            Effect::BurnSynthetic { .. } => CallKind::BurnSynthetic,
        }
    }

    /// Asset moved by this effect
    pub fn asset(&self, synthetic: &AssetId) -> AssetId {
        match self {
            Effect::TransferIn { asset, .. } | Effect::TransferOut { asset, .. } => *asset,
            Effect::MintSynthetic { .. } | Effect::BurnSynthetic { .. } => *synthetic,
        }
    }

    fn apply<C: TransferCollaborator>(&self, collaborator: &mut C) -> Result<bool> {
        match self {
            Effect::TransferIn { asset, from, amount } => {
                collaborator.transfer_in(asset, from, *amount)
            }
            Effect::TransferOut { asset, to, amount } => {
                collaborator.transfer_out(asset, to, *amount)
            }
            Effect::MintSynthetic { to, amount } => collaborator.mint_synthetic(to, *amount),
            Effect::BurnSynthetic { amount } => collaborator.burn_synthetic(*amount),
        }
    }

    /// Effects that undo this one
    fn inverse(&self, synthetic: &AssetId, custody: &AccountId) -> Vec<Effect> {
        match self {
            Effect::TransferIn { asset, from, amount } => vec![Effect::TransferOut {
                asset: *asset,
                to: *from,
                amount: *amount,
            }],
            Effect::TransferOut { asset, to, amount } => vec![Effect::TransferIn {
                asset: *asset,
                from: *to,
                amount: *amount,
            }],
            Effect::MintSynthetic { to, amount } => vec![
                Effect::TransferIn {
                    asset: *synthetic,
                    from: *to,
                    amount: *amount,
                },
                Effect::BurnSynthetic { amount: *amount },
            ],
            Effect::BurnSynthetic { amount } => vec![Effect::MintSynthetic {
                to: *custody,
                amount: *amount,
            }],
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSACTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Working state of one engine operation
#[derive(Debug, Clone)]
pub struct Transaction {
    ledger: CollateralLedger,
    events: EventLog,
    effects: Vec<Effect>,
    liquidation: Option<LiquidationOutcome>,
}

/// A settled transaction split for commit
#[derive(Debug)]
pub struct SettledParts {
    /// Working ledger to install
    pub ledger: CollateralLedger,
    /// Events to append
    pub events: EventLog,
    /// Liquidation to add to the statistics
    pub liquidation: Option<LiquidationOutcome>,
    /// Movements performed, kept for [`Transaction::unwind`]
    pub effects: Vec<Effect>,
}

impl Transaction {
    /// Start from a copy of the committed ledger
    pub fn begin(snapshot: CollateralLedger) -> Self {
        Self {
            ledger: snapshot,
            events: EventLog::new(),
            effects: Vec::new(),
            liquidation: None,
        }
    }

    /// Working ledger
    pub fn ledger(&self) -> &CollateralLedger {
        &self.ledger
    }

    /// Working ledger, mutable
    pub fn ledger_mut(&mut self) -> &mut CollateralLedger {
        &mut self.ledger
    }

    /// Buffer an event until commit
    pub fn emit(&mut self, event: ProtocolEvent) {
        self.events.push(event);
    }

    /// Queue a token movement for settlement
    pub fn queue(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    /// Stage a liquidation for the statistics
    pub fn record_liquidation(&mut self, outcome: LiquidationOutcome) {
        self.liquidation = Some(outcome);
    }

    /// Queued movements, in settlement order
    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    /// Buffered events
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Perform the queued movements in order.
    ///
    /// A declined or failed movement yields `TransferFailed` after every
    /// earlier movement has been compensated. If a compensation itself fails
    /// the result is `RollbackIncomplete`.
    pub fn settle<C: TransferCollaborator>(
        &self,
        collaborator: &mut C,
        synthetic: &AssetId,
        custody: &AccountId,
    ) -> Result<()> {
        for (index, effect) in self.effects.iter().enumerate() {
            let failure = match effect.apply(collaborator) {
                Ok(true) => continue,
                Ok(false) => None,
                Err(e) => Some(e),
            };

            let asset = effect.asset(synthetic);
            if let Some(cause) = &failure {
                warn!(call = %effect.kind(), asset = %asset, error = %cause, "collaborator error");
            }
            let original = Error::TransferFailed {
                operation: effect.kind().to_string(),
                asset,
            };
            return Err(Self::compensate(
                &self.effects[..index],
                collaborator,
                synthetic,
                custody,
                original,
            ));
        }
        Ok(())
    }

    /// Undo movements performed by a successful `settle`
    pub fn unwind<C: TransferCollaborator>(
        effects: &[Effect],
        collaborator: &mut C,
        synthetic: &AssetId,
        custody: &AccountId,
        cause: Error,
    ) -> Error {
        Self::compensate(effects, collaborator, synthetic, custody, cause)
    }

    /// Split into the state to commit and the performed movements
    pub fn into_parts(self) -> SettledParts {
        SettledParts {
            ledger: self.ledger,
            events: self.events,
            liquidation: self.liquidation,
            effects: self.effects,
        }
    }

    fn compensate<C: TransferCollaborator>(
        performed: &[Effect],
        collaborator: &mut C,
        synthetic: &AssetId,
        custody: &AccountId,
        original: Error,
    ) -> Error {
        let mut failed = Vec::new();
        for effect in performed.iter().rev() {
            for inverse in effect.inverse(synthetic, custody) {
                match inverse.apply(collaborator) {
                    Ok(true) => {}
                    Ok(false) => failed.push(format!("{} declined", inverse.kind())),
                    Err(e) => failed.push(format!("{}: {}", inverse.kind(), e)),
                }
            }
        }

        if failed.is_empty() {
            return original;
        }
        let failed = failed.join("; ");
        error!(original = %original, failed = %failed, "rollback incomplete");
        Error::RollbackIncomplete {
            original: original.to_string(),
            failed,
        }
    }
}
