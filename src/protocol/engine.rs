//! Synthetic engine - core orchestration.
//!
//! The engine is the central coordinator for all position operations. Every
//! mutating call:
//! 1. takes the engine-wide re-entrancy guard,
//! 2. copies the committed ledger into a [`Transaction`],
//! 3. validates and applies ledger effects, running solvency checks against
//!    live oracle prices,
//! 4. settles the queued token movements with the collaborator,
//! 5. commits the working ledger and buffered events, or drops them.
//!
//! Queries never take the guard and may be called from inside a collaborator
//! callback.

use std::sync::{Mutex, RwLock};

use tracing::{info, warn};

use crate::core::config::EngineParams;
use crate::core::ledger::CollateralLedger;
use crate::core::registry::AssetRegistry;
use crate::core::risk::{AccountSnapshot, RiskEngine};
use crate::core::vault::TransferCollaborator;
use crate::error::{Error, Result};
use crate::liquidation::engine::{LiquidationEngine, LiquidationOutcome, LiquidationStats};
use crate::protocol::events::*;
use crate::protocol::guard::ReentrancyLock;
use crate::protocol::operations::{Operation, OperationResult};
use crate::protocol::transaction::{Effect, Transaction};
use crate::utils::address::{AccountId, AssetId};

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Overcollateralized synthetic issuance engine
pub struct SynthEngine<C: TransferCollaborator> {
    /// Collateral assets and their oracles
    registry: AssetRegistry,
    /// Risk parameters
    params: EngineParams,
    /// Synthetic token id
    synthetic: AssetId,
    /// Wallet holding deposited collateral and synthetic awaiting burn
    custody: AccountId,
    /// Committed balances
    ledger: RwLock<CollateralLedger>,
    /// Committed events
    events: RwLock<EventLog>,
    /// Liquidation statistics
    liquidations: RwLock<LiquidationEngine>,
    /// External token movements
    collaborator: Mutex<C>,
    /// Engine-wide "operation in progress" flag
    guard: ReentrancyLock,
}

impl<C: TransferCollaborator> SynthEngine<C> {
    /// Create an engine.
    ///
    /// Fails with `ConfigurationError` when the parameters are invalid or the
    /// synthetic is itself registered as collateral.
    pub fn new(
        registry: AssetRegistry,
        synthetic: AssetId,
        custody: AccountId,
        collaborator: C,
        params: EngineParams,
    ) -> Result<Self> {
        params.validate()?;
        if registry.is_allowed(&synthetic) {
            return Err(Error::ConfigurationError(format!(
                "synthetic {} cannot back itself",
                synthetic
            )));
        }

        info!(
            assets = registry.len(),
            synthetic = %synthetic,
            threshold = params.liquidation_threshold,
            bonus = params.liquidation_bonus,
            "engine created"
        );

        Ok(Self {
            events: RwLock::new(EventLog::with_capacity(params.max_events)),
            liquidations: RwLock::new(LiquidationEngine::new(params.max_events)),
            registry,
            params,
            synthetic,
            custody,
            ledger: RwLock::new(CollateralLedger::new()),
            collaborator: Mutex::new(collaborator),
            guard: ReentrancyLock::new(),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // POSITION OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Deposit `quantity` of `asset`; returns the new deposited balance
    pub fn deposit_collateral(
        &self,
        account: AccountId,
        asset: AssetId,
        quantity: u128,
    ) -> Result<u128> {
        let balance = self.execute("deposit_collateral", |tx, _| {
            self.apply_deposit(tx, account, asset, quantity)
        })?;
        info!(account = %account, asset = %asset, quantity, "collateral deposited");
        Ok(balance)
    }

    /// Mint `amount` synthetic against existing collateral; returns the new debt
    pub fn mint(&self, account: AccountId, amount: u128) -> Result<u128> {
        let debt = self.execute("mint", |tx, risk| self.apply_mint(tx, risk, account, amount))?;
        info!(account = %account, amount, debt, "synthetic minted");
        Ok(debt)
    }

    /// Withdraw `quantity` of `asset` to `recipient`; returns the remaining balance
    pub fn redeem_collateral(
        &self,
        account: AccountId,
        asset: AssetId,
        quantity: u128,
        recipient: AccountId,
    ) -> Result<u128> {
        let balance = self.execute("redeem_collateral", |tx, risk| {
            self.apply_redeem(tx, risk, account, asset, quantity, recipient)
        })?;
        info!(account = %account, asset = %asset, quantity, "collateral redeemed");
        Ok(balance)
    }

    /// Burn `amount` synthetic supplied by `payer` against `account`'s debt;
    /// returns the new debt
    pub fn burn(&self, account: AccountId, amount: u128, payer: AccountId) -> Result<u128> {
        let debt = self.execute("burn", |tx, risk| {
            self.apply_burn(tx, risk, account, amount, payer)
        })?;
        info!(account = %account, payer = %payer, amount, debt, "debt burned");
        Ok(debt)
    }

    /// Deposit then mint, as one atomic unit
    pub fn deposit_and_mint(
        &self,
        account: AccountId,
        asset: AssetId,
        quantity: u128,
        amount: u128,
    ) -> Result<()> {
        self.execute("deposit_and_mint", |tx, risk| {
            self.apply_deposit(tx, account, asset, quantity)?;
            self.apply_mint(tx, risk, account, amount)?;
            Ok(())
        })?;
        info!(account = %account, asset = %asset, quantity, amount, "deposited and minted");
        Ok(())
    }

    /// Burn then redeem to `account`, as one atomic unit
    pub fn redeem_and_burn(
        &self,
        account: AccountId,
        asset: AssetId,
        quantity: u128,
        amount: u128,
    ) -> Result<()> {
        self.execute("redeem_and_burn", |tx, risk| {
            self.apply_burn(tx, risk, account, amount, account)?;
            self.apply_redeem(tx, risk, account, asset, quantity, account)?;
            Ok(())
        })?;
        info!(account = %account, asset = %asset, quantity, amount, "burned and redeemed");
        Ok(())
    }

    /// Cover `debt_to_cover` of `target`'s debt and seize its collateral plus
    /// the liquidation bonus
    pub fn liquidate(
        &self,
        liquidator: AccountId,
        target: AccountId,
        asset: AssetId,
        debt_to_cover: u128,
    ) -> Result<LiquidationOutcome> {
        let outcome = self.execute("liquidate", |tx, risk| {
            let outcome = LiquidationEngine::apply(
                tx.ledger_mut(),
                risk,
                &target,
                &liquidator,
                &asset,
                debt_to_cover,
            )?;
            let plan = &outcome.plan;
            let new_debt = tx.ledger().debt_of(&target);

            tx.queue(Effect::TransferOut {
                asset,
                to: liquidator,
                amount: plan.total_seized,
            });
            tx.queue(Effect::TransferIn {
                asset: self.synthetic,
                from: liquidator,
                amount: debt_to_cover,
            });
            tx.queue(Effect::BurnSynthetic {
                amount: debt_to_cover,
            });

            tx.emit(ProtocolEvent::CollateralRedeemed(CollateralRedeemedEvent {
                from: target,
                to: liquidator,
                asset,
                quantity: plan.total_seized,
            }));
            tx.emit(ProtocolEvent::DebtBurned(DebtBurnedEvent {
                account: target,
                payer: liquidator,
                amount: debt_to_cover,
                new_debt,
            }));
            tx.emit(ProtocolEvent::Liquidated(LiquidatedEvent {
                target,
                liquidator,
                asset,
                debt_covered: debt_to_cover,
                collateral_seized: plan.total_seized,
                bonus: plan.bonus,
                starting_health_factor: outcome.starting_health_factor,
                ending_health_factor: outcome.ending_health_factor,
            }));
            tx.record_liquidation(outcome.clone());
            Ok(outcome)
        })?;

        info!(
            liquidator = %liquidator,
            target = %target,
            asset = %asset,
            debt_covered = debt_to_cover,
            seized = outcome.plan.total_seized,
            "position liquidated"
        );
        Ok(outcome)
    }

    /// Run a described operation
    pub fn execute_operation(&self, op: Operation) -> Result<OperationResult> {
        match op {
            Operation::Deposit {
                account,
                asset,
                quantity,
            } => {
                let balance = self.deposit_collateral(account, asset, quantity)?;
                Ok(OperationResult::Collateral {
                    account,
                    asset,
                    balance,
                })
            }
            Operation::Mint { account, amount } => {
                let debt = self.mint(account, amount)?;
                Ok(OperationResult::Debt { account, debt })
            }
            Operation::Redeem {
                account,
                asset,
                quantity,
                recipient,
            } => {
                let balance = self.redeem_collateral(account, asset, quantity, recipient)?;
                Ok(OperationResult::Collateral {
                    account,
                    asset,
                    balance,
                })
            }
            Operation::Burn {
                account,
                amount,
                payer,
            } => {
                let debt = self.burn(account, amount, payer)?;
                Ok(OperationResult::Debt { account, debt })
            }
            Operation::DepositAndMint {
                account,
                asset,
                quantity,
                amount,
            } => {
                self.deposit_and_mint(account, asset, quantity, amount)?;
                Ok(OperationResult::Completed)
            }
            Operation::RedeemAndBurn {
                account,
                asset,
                quantity,
                amount,
            } => {
                self.redeem_and_burn(account, asset, quantity, amount)?;
                Ok(OperationResult::Completed)
            }
            Operation::Liquidate {
                liquidator,
                target,
                asset,
                debt_to_cover,
            } => {
                let outcome = self.liquidate(liquidator, target, asset, debt_to_cover)?;
                Ok(OperationResult::Liquidation(outcome))
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// USD value (18 decimals) of `quantity` of `asset`
    pub fn usd_value(&self, asset: &AssetId, quantity: u128) -> Result<u128> {
        self.risk().usd_value(asset, quantity)
    }

    /// Quantity of `asset` worth `usd_amount`
    pub fn quantity_from_usd(&self, asset: &AssetId, usd_amount: u128) -> Result<u128> {
        self.risk().quantity_from_usd(asset, usd_amount)
    }

    /// USD value of everything `account` has deposited
    pub fn total_collateral_value(&self, account: &AccountId) -> Result<u128> {
        let snapshot = self.ledger.read()?.account_or_default(account);
        self.risk().total_collateral_value(&snapshot)
    }

    /// Current health factor; `u128::MAX` without debt
    pub fn health_factor(&self, account: &AccountId) -> Result<u128> {
        let snapshot = self.ledger.read()?.account_or_default(account);
        self.risk().health_factor(&snapshot)
    }

    /// Health factor after hypothetically removing `collateral_removed_usd`
    /// of collateral value and adding `debt_added` debt
    pub fn health_factor_after(
        &self,
        account: &AccountId,
        collateral_removed_usd: u128,
        debt_added: u128,
    ) -> Result<u128> {
        let snapshot = self.ledger.read()?.account_or_default(account);
        self.risk()
            .health_factor_after(&snapshot, collateral_removed_usd, debt_added)
    }

    /// Debt, collateral value, health factor and status of `account`
    pub fn account_information(&self, account: &AccountId) -> Result<AccountSnapshot> {
        let snapshot = self.ledger.read()?.account_or_default(account);
        self.risk().account_information(&snapshot)
    }

    /// Deposited quantity of `asset` held by `account`
    pub fn collateral_balance(&self, account: &AccountId, asset: &AssetId) -> Result<u128> {
        Ok(self.ledger.read()?.collateral_of(account, asset))
    }

    /// Minted debt of `account`
    pub fn debt_of(&self, account: &AccountId) -> Result<u128> {
        Ok(self.ledger.read()?.debt_of(account))
    }

    /// Committed events, oldest first
    pub fn events(&self) -> Result<Vec<ProtocolEvent>> {
        Ok(self.events.read()?.events().to_vec())
    }

    /// Liquidatable accounts among `candidates`, lowest health factor first
    pub fn find_liquidatable(&self, candidates: &[AccountId]) -> Result<Vec<(AccountId, u128)>> {
        let ledger = self.ledger.read()?.clone();
        LiquidationEngine::find_liquidatable(&ledger, &self.risk(), candidates)
    }

    /// Every liquidatable account, lowest health factor first
    pub fn liquidatable_accounts(&self) -> Result<Vec<(AccountId, u128)>> {
        let ledger = self.ledger.read()?.clone();
        let candidates: Vec<AccountId> = ledger.account_ids().copied().collect();
        LiquidationEngine::find_liquidatable(&ledger, &self.risk(), &candidates)
    }

    /// Liquidation statistics
    pub fn liquidation_stats(&self) -> Result<LiquidationStats> {
        Ok(self.liquidations.read()?.statistics())
    }

    /// Copy of the committed ledger
    pub fn ledger_snapshot(&self) -> Result<CollateralLedger> {
        Ok(self.ledger.read()?.clone())
    }

    /// Run `f` with exclusive access to the collaborator
    pub fn with_collaborator<R>(&self, f: impl FnOnce(&mut C) -> R) -> Result<R> {
        let mut collaborator = self.collaborator.lock()?;
        Ok(f(&mut collaborator))
    }

    /// Asset registry
    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    /// Risk parameters
    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    /// Synthetic token id
    pub fn synthetic(&self) -> AssetId {
        self.synthetic
    }

    /// Custody wallet
    pub fn custody(&self) -> AccountId {
        self.custody
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // STEPS
    // ═══════════════════════════════════════════════════════════════════════════

    fn apply_deposit(
        &self,
        tx: &mut Transaction,
        account: AccountId,
        asset: AssetId,
        quantity: u128,
    ) -> Result<u128> {
        if quantity == 0 {
            return Err(Error::InvalidAmount);
        }
        self.registry.ensure_allowed(&asset)?;

        let balance = tx.ledger_mut().credit_collateral(account, asset, quantity)?;
        tx.emit(ProtocolEvent::CollateralDeposited(CollateralDepositedEvent {
            account,
            asset,
            quantity,
        }));
        tx.queue(Effect::TransferIn {
            asset,
            from: account,
            amount: quantity,
        });
        Ok(balance)
    }

    fn apply_mint(
        &self,
        tx: &mut Transaction,
        risk: &RiskEngine<'_>,
        account: AccountId,
        amount: u128,
    ) -> Result<u128> {
        if amount == 0 {
            return Err(Error::InvalidAmount);
        }

        let new_debt = tx.ledger_mut().add_debt(account, amount)?;
        risk.assert_solvent(&tx.ledger().account_or_default(&account))?;

        tx.emit(ProtocolEvent::DebtMinted(DebtMintedEvent {
            account,
            amount,
            new_debt,
        }));
        tx.queue(Effect::MintSynthetic {
            to: account,
            amount,
        });
        Ok(new_debt)
    }

    fn apply_redeem(
        &self,
        tx: &mut Transaction,
        risk: &RiskEngine<'_>,
        account: AccountId,
        asset: AssetId,
        quantity: u128,
        recipient: AccountId,
    ) -> Result<u128> {
        if quantity == 0 {
            return Err(Error::InvalidAmount);
        }

        let balance = tx.ledger_mut().debit_collateral(account, asset, quantity)?;
        tx.emit(ProtocolEvent::CollateralRedeemed(CollateralRedeemedEvent {
            from: account,
            to: recipient,
            asset,
            quantity,
        }));
        tx.queue(Effect::TransferOut {
            asset,
            to: recipient,
            amount: quantity,
        });
        risk.assert_solvent(&tx.ledger().account_or_default(&account))?;
        Ok(balance)
    }

    fn apply_burn(
        &self,
        tx: &mut Transaction,
        risk: &RiskEngine<'_>,
        account: AccountId,
        amount: u128,
        payer: AccountId,
    ) -> Result<u128> {
        if amount == 0 {
            return Err(Error::InvalidAmount);
        }

        let new_debt = tx.ledger_mut().sub_debt(account, amount)?;
        tx.queue(Effect::TransferIn {
            asset: self.synthetic,
            from: payer,
            amount,
        });
        tx.queue(Effect::BurnSynthetic { amount });
        tx.emit(ProtocolEvent::DebtBurned(DebtBurnedEvent {
            account,
            payer,
            amount,
            new_debt,
        }));
        risk.assert_solvent(&tx.ledger().account_or_default(&account))?;
        Ok(new_debt)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL
    // ═══════════════════════════════════════════════════════════════════════════

    fn risk(&self) -> RiskEngine<'_> {
        RiskEngine::new(&self.registry, &self.params)
    }

    /// Run `op` atomically under the re-entrancy guard
    fn execute<T>(
        &self,
        operation: &'static str,
        op: impl FnOnce(&mut Transaction, &RiskEngine<'_>) -> Result<T>,
    ) -> Result<T> {
        let result = self.guard.enter().and_then(|_guard| {
            let snapshot = self.ledger.read()?.clone();
            let mut tx = Transaction::begin(snapshot);
            let value = op(&mut tx, &self.risk())?;

            let mut collaborator = self.collaborator.lock()?;
            tx.settle(&mut *collaborator, &self.synthetic, &self.custody)?;
            let parts = tx.into_parts();
            if let Err(e) = self.commit(parts.ledger, parts.events, parts.liquidation) {
                return Err(Transaction::unwind(
                    &parts.effects,
                    &mut *collaborator,
                    &self.synthetic,
                    &self.custody,
                    e,
                ));
            }
            Ok(value)
        });

        if let Err(e) = &result {
            warn!(operation, code = e.code(), error = %e, "operation rejected");
        }
        result
    }

    /// Install a settled transaction; every lock is taken before anything changes
    fn commit(
        &self,
        working: CollateralLedger,
        buffered: EventLog,
        liquidation: Option<LiquidationOutcome>,
    ) -> Result<()> {
        let mut ledger = self.ledger.write()?;
        let mut events = self.events.write()?;
        let mut liquidations = self.liquidations.write()?;
        *ledger = working;
        events.merge(buffered);
        if let Some(outcome) = &liquidation {
            liquidations.record(outcome);
        }
        Ok(())
    }
}

impl<C: TransferCollaborator> std::fmt::Debug for SynthEngine<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthEngine")
            .field("synthetic", &self.synthetic)
            .field("custody", &self.custody)
            .field("assets", &self.registry.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vault::{CallKind, FaultMode, InMemoryVault};
    use crate::oracle::{PriceFeed, PriceOracle};
    use crate::utils::constants::{MAX_HEALTH_FACTOR, PRECISION};
    use std::sync::Arc;

    const WAD: u128 = PRECISION;

    struct Fixture {
        engine: SynthEngine<InMemoryVault>,
        feed: Arc<PriceFeed>,
        weth: AssetId,
        alice: AccountId,
    }

    fn fixture() -> Fixture {
        let weth = AssetId::from_label("weth");
        let synth = AssetId::from_label("synthusd");
        let custody = AccountId::from_label("engine");
        let alice = AccountId::from_label("alice");

        let feed = Arc::new(PriceFeed::new());
        feed.set_price(weth, 2_000_00000000).unwrap();
        let oracle: Arc<dyn PriceOracle> = feed.clone();
        let registry = AssetRegistry::new(vec![weth], vec![oracle]).unwrap();

        let mut vault = InMemoryVault::new(synth, custody);
        vault.fund(weth, alice, 100 * WAD).unwrap();

        let engine =
            SynthEngine::new(registry, synth, custody, vault, EngineParams::default()).unwrap();
        Fixture {
            engine,
            feed,
            weth,
            alice,
        }
    }

    #[test]
    fn test_deposit_and_query() {
        let f = fixture();
        assert_eq!(f.engine.deposit_collateral(f.alice, f.weth, 10 * WAD).unwrap(), 10 * WAD);
        assert_eq!(f.engine.collateral_balance(&f.alice, &f.weth).unwrap(), 10 * WAD);
        assert_eq!(f.engine.total_collateral_value(&f.alice).unwrap(), 20_000 * WAD);
        assert_eq!(f.engine.health_factor(&f.alice).unwrap(), MAX_HEALTH_FACTOR);
        assert_eq!(f.engine.events().unwrap().len(), 1);
    }

    #[test]
    fn test_zero_amounts_rejected() {
        let f = fixture();
        assert_eq!(f.engine.deposit_collateral(f.alice, f.weth, 0), Err(Error::InvalidAmount));
        assert_eq!(f.engine.mint(f.alice, 0), Err(Error::InvalidAmount));
        assert_eq!(
            f.engine.liquidate(f.alice, f.alice, f.weth, 0).unwrap_err(),
            Error::InvalidAmount
        );
    }

    #[test]
    fn test_unregistered_asset_rejected() {
        let f = fixture();
        let doge = AssetId::from_label("doge");
        assert_eq!(
            f.engine.deposit_collateral(f.alice, doge, WAD),
            Err(Error::AssetNotAllowed(doge))
        );
    }

    #[test]
    fn test_mint_breaking_health_rolls_back() {
        let f = fixture();
        f.engine.deposit_collateral(f.alice, f.weth, 10 * WAD).unwrap();

        let err = f.engine.mint(f.alice, 10_001 * WAD).unwrap_err();
        assert!(matches!(err, Error::HealthFactorBroken(_)));
        assert_eq!(f.engine.debt_of(&f.alice).unwrap(), 0);
        assert_eq!(f.engine.events().unwrap().len(), 1);

        assert_eq!(f.engine.mint(f.alice, 10_000 * WAD).unwrap(), 10_000 * WAD);
        assert_eq!(f.engine.health_factor(&f.alice).unwrap(), WAD);
    }

    #[test]
    fn test_collaborator_failure_leaves_state() {
        let f = fixture();
        f.engine
            .with_collaborator(|v| v.fail_on(CallKind::MintSynthetic, 1, FaultMode::Error))
            .unwrap();

        let err = f
            .engine
            .deposit_and_mint(f.alice, f.weth, 10 * WAD, 1_000 * WAD)
            .unwrap_err();
        assert!(matches!(err, Error::TransferFailed { .. }));
        assert_eq!(f.engine.collateral_balance(&f.alice, &f.weth).unwrap(), 0);
        assert!(f.engine.events().unwrap().is_empty());

        let wallet = f
            .engine
            .with_collaborator(|v| v.balance_of(&f.weth, &f.alice))
            .unwrap();
        assert_eq!(wallet, 100 * WAD);
    }

    #[test]
    fn test_oracle_outage_blocks_mint_not_deposit() {
        let f = fixture();
        f.feed.halt(f.weth).unwrap();

        f.engine.deposit_collateral(f.alice, f.weth, WAD).unwrap();
        assert!(matches!(
            f.engine.mint(f.alice, WAD),
            Err(Error::OracleUnavailable { .. })
        ));
    }

    #[test]
    fn test_synthetic_cannot_be_collateral() {
        let weth = AssetId::from_label("weth");
        let oracle: Arc<dyn PriceOracle> = Arc::new(PriceFeed::new());
        let registry = AssetRegistry::new(vec![weth], vec![oracle]).unwrap();
        let custody = AccountId::from_label("engine");

        let err = SynthEngine::new(
            registry,
            weth,
            custody,
            InMemoryVault::new(weth, custody),
            EngineParams::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::ConfigurationError(_)));
    }

    #[test]
    fn test_execute_operation_dispatch() {
        let f = fixture();
        let result = f
            .engine
            .execute_operation(Operation::Deposit {
                account: f.alice,
                asset: f.weth,
                quantity: WAD,
            })
            .unwrap();
        assert_eq!(
            result,
            OperationResult::Collateral {
                account: f.alice,
                asset: f.weth,
                balance: WAD
            }
        );
    }
}
