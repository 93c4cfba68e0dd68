//! Liquidation of undercollateralized positions.
//!
//! This module handles the ledger side of a liquidation:
//! - Detection and ranking of liquidatable accounts
//! - Seizure sizing (collateral worth the covered debt plus a bonus)
//! - Health factor checks before and after
//! - Running statistics
//!
//! Token movements are left to the caller so they can run inside its
//! transaction.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use tracing::debug;

use crate::core::ledger::CollateralLedger;
use crate::core::risk::RiskEngine;
use crate::error::{Error, Result};
use crate::utils::address::{AccountId, AssetId};
use crate::utils::math::*;

// ═══════════════════════════════════════════════════════════════════════════════
// LIQUIDATION PLAN
// ═══════════════════════════════════════════════════════════════════════════════

/// Collateral to seize for a given amount of covered debt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationPlan {
    /// Collateral asset seized
    pub asset: AssetId,
    /// Synthetic debt the liquidator pays off
    pub debt_to_cover: u128,
    /// Collateral worth exactly `debt_to_cover`
    pub collateral_qty: u128,
    /// Extra collateral paid as incentive
    pub bonus: u128,
    /// `collateral_qty + bonus`
    pub total_seized: u128,
}

impl LiquidationPlan {
    /// Size a seizure of `asset` covering `debt_to_cover` at current prices
    pub fn compute(risk: &RiskEngine<'_>, asset: &AssetId, debt_to_cover: u128) -> Result<Self> {
        let collateral_qty = risk.quantity_from_usd(asset, debt_to_cover)?;
        let bonus = calculate_percentage(collateral_qty, risk.params().liquidation_bonus)?;
        let total_seized = safe_add(collateral_qty, bonus)?;

        Ok(Self {
            asset: *asset,
            debt_to_cover,
            collateral_qty,
            bonus,
            total_seized,
        })
    }
}

/// Result of a committed liquidation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationOutcome {
    /// Liquidated account
    pub target: AccountId,
    /// Account that covered the debt
    pub liquidator: AccountId,
    /// Seizure sizing
    pub plan: LiquidationPlan,
    /// Target health factor before
    pub starting_health_factor: u128,
    /// Target health factor after
    pub ending_health_factor: u128,
}

// ═══════════════════════════════════════════════════════════════════════════════
// LIQUIDATION ENGINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Liquidation checks, ledger effects and statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiquidationEngine {
    total_liquidations: u64,
    total_debt_covered: u128,
    seized_by_asset: HashMap<AssetId, u128>,
    recent: Vec<LiquidationOutcome>,
    max_recent: usize,
}

impl LiquidationEngine {
    /// Create an engine keeping at most `max_recent` outcomes
    pub fn new(max_recent: usize) -> Self {
        Self {
            max_recent,
            ..Self::default()
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LIQUIDATION DETECTION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Liquidatable accounts among `candidates`, lowest health factor first
    pub fn find_liquidatable(
        ledger: &CollateralLedger,
        risk: &RiskEngine<'_>,
        candidates: &[AccountId],
    ) -> Result<Vec<(AccountId, u128)>> {
        let min = risk.params().min_health_factor;
        let mut found = Vec::new();
        for id in candidates {
            let Some(account) = ledger.account(id) else {
                continue;
            };
            if account.debt == 0 {
                continue;
            }
            let hf = risk.health_factor(account)?;
            if hf < min {
                found.push((*id, hf));
            }
        }
        found.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        Ok(found)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LIQUIDATION EXECUTION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Apply a liquidation to `ledger`.
    ///
    /// Fails with `HealthFactorOkay` when the target is solvent, with
    /// `HealthFactorNotImproved` when the seizure leaves it no healthier,
    /// and with `HealthFactorBroken` when the liquidator ends up insolvent.
    /// `ledger` may be partially modified on error; callers work on a copy.
    pub fn apply(
        ledger: &mut CollateralLedger,
        risk: &RiskEngine<'_>,
        target: &AccountId,
        liquidator: &AccountId,
        asset: &AssetId,
        debt_to_cover: u128,
    ) -> Result<LiquidationOutcome> {
        if debt_to_cover == 0 {
            return Err(Error::InvalidAmount);
        }

        let starting_health_factor = risk.health_factor(&ledger.account_or_default(target))?;
        if starting_health_factor >= risk.params().min_health_factor {
            return Err(Error::HealthFactorOkay(starting_health_factor));
        }

        let plan = LiquidationPlan::compute(risk, asset, debt_to_cover)?;
        debug!(
            target = %target,
            collateral = plan.collateral_qty,
            bonus = plan.bonus,
            "liquidation sized"
        );

        ledger.debit_collateral(*target, *asset, plan.total_seized)?;
        ledger.sub_debt(*target, debt_to_cover)?;

        let ending_health_factor = risk.health_factor(&ledger.account_or_default(target))?;
        if ending_health_factor <= starting_health_factor {
            return Err(Error::HealthFactorNotImproved {
                starting: starting_health_factor,
                ending: ending_health_factor,
            });
        }

        risk.assert_solvent(&ledger.account_or_default(liquidator))?;

        Ok(LiquidationOutcome {
            target: *target,
            liquidator: *liquidator,
            plan,
            starting_health_factor,
            ending_health_factor,
        })
    }

    /// Record a committed liquidation
    pub fn record(&mut self, outcome: &LiquidationOutcome) {
        self.total_liquidations += 1;
        self.total_debt_covered = self
            .total_debt_covered
            .saturating_add(outcome.plan.debt_to_cover);
        let seized = self.seized_by_asset.entry(outcome.plan.asset).or_insert(0);
        *seized = seized.saturating_add(outcome.plan.total_seized);

        self.recent.push(outcome.clone());
        if self.recent.len() > self.max_recent {
            self.recent.drain(0..self.recent.len() - self.max_recent);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Outcomes where `target` was liquidated
    pub fn outcomes_for(&self, target: &AccountId) -> Vec<&LiquidationOutcome> {
        self.recent.iter().filter(|o| o.target == *target).collect()
    }

    /// Aggregate statistics
    pub fn statistics(&self) -> LiquidationStats {
        LiquidationStats {
            total_liquidations: self.total_liquidations,
            total_debt_covered: self.total_debt_covered,
            seized_by_asset: self.seized_by_asset.clone(),
        }
    }
}

/// Liquidation statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationStats {
    /// Committed liquidations
    pub total_liquidations: u64,
    /// Synthetic debt repaid by liquidators
    pub total_debt_covered: u128,
    /// Collateral seized per asset, bonus included
    pub seized_by_asset: HashMap<AssetId, u128>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineParams;
    use crate::core::registry::AssetRegistry;
    use crate::oracle::{PriceFeed, PriceOracle};
    use crate::utils::constants::PRECISION;
    use std::sync::Arc;

    const WAD: u128 = PRECISION;

    struct Fixture {
        registry: AssetRegistry,
        params: EngineParams,
        feed: Arc<PriceFeed>,
        weth: AssetId,
        user: AccountId,
        liquidator: AccountId,
        ledger: CollateralLedger,
    }

    fn fixture() -> Fixture {
        let weth = AssetId::from_label("weth");
        let feed = Arc::new(PriceFeed::new());
        feed.set_price(weth, 2_000_00000000).unwrap();
        let oracle: Arc<dyn PriceOracle> = feed.clone();
        let registry = AssetRegistry::new(vec![weth], vec![oracle]).unwrap();

        let user = AccountId::from_label("user");
        let liquidator = AccountId::from_label("liquidator");
        let mut ledger = CollateralLedger::new();
        ledger.credit_collateral(user, weth, 10 * WAD).unwrap();
        ledger.add_debt(user, 9_000 * WAD).unwrap();

        Fixture {
            registry,
            params: EngineParams::default(),
            feed,
            weth,
            user,
            liquidator,
            ledger,
        }
    }

    #[test]
    fn test_healthy_position_rejected() {
        let mut f = fixture();
        let risk = RiskEngine::new(&f.registry, &f.params);
        let err = LiquidationEngine::apply(
            &mut f.ledger,
            &risk,
            &f.user,
            &f.liquidator,
            &f.weth,
            4_500 * WAD,
        )
        .unwrap_err();
        assert_eq!(err, Error::HealthFactorOkay(1_111_111_111_111_111_111));
    }

    #[test]
    fn test_plan_includes_bonus() {
        let f = fixture();
        f.feed.set_price(f.weth, 1_000_00000000).unwrap();
        let risk = RiskEngine::new(&f.registry, &f.params);

        let plan = LiquidationPlan::compute(&risk, &f.weth, 4_500 * WAD).unwrap();
        assert_eq!(plan.collateral_qty, 4_500_000_000_000_000_000);
        assert_eq!(plan.bonus, 450_000_000_000_000_000);
        assert_eq!(plan.total_seized, 4_950_000_000_000_000_000);
    }

    #[test]
    fn test_apply_improves_health() {
        let mut f = fixture();
        f.feed.set_price(f.weth, 1_000_00000000).unwrap();
        let risk = RiskEngine::new(&f.registry, &f.params);

        let outcome = LiquidationEngine::apply(
            &mut f.ledger,
            &risk,
            &f.user,
            &f.liquidator,
            &f.weth,
            4_500 * WAD,
        )
        .unwrap();

        assert_eq!(outcome.starting_health_factor, 555_555_555_555_555_555);
        assert!(outcome.ending_health_factor > outcome.starting_health_factor);
        assert_eq!(f.ledger.collateral_of(&f.user, &f.weth), 5_050_000_000_000_000_000);
        assert_eq!(f.ledger.debt_of(&f.user), 4_500 * WAD);
    }

    #[test]
    fn test_seizure_beyond_collateral() {
        let mut f = fixture();
        f.feed.set_price(f.weth, 100_00000000).unwrap();
        let risk = RiskEngine::new(&f.registry, &f.params);

        let err = LiquidationEngine::apply(
            &mut f.ledger,
            &risk,
            &f.user,
            &f.liquidator,
            &f.weth,
            9_000 * WAD,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InsufficientCollateral { .. }));
    }

    #[test]
    fn test_find_liquidatable_orders_by_health() {
        let mut f = fixture();
        let other = AccountId::from_label("other");
        f.ledger.credit_collateral(other, f.weth, 10 * WAD).unwrap();
        f.ledger.add_debt(other, 8_000 * WAD).unwrap();
        let idle = AccountId::from_label("idle");
        f.ledger.credit_collateral(idle, f.weth, WAD).unwrap();

        f.feed.set_price(f.weth, 1_000_00000000).unwrap();
        let risk = RiskEngine::new(&f.registry, &f.params);
        let found =
            LiquidationEngine::find_liquidatable(&f.ledger, &risk, &[other, idle, f.user]).unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].0, f.user);
        assert_eq!(found[1].0, other);
    }

    #[test]
    fn test_statistics() {
        let mut f = fixture();
        f.feed.set_price(f.weth, 1_000_00000000).unwrap();
        let risk = RiskEngine::new(&f.registry, &f.params);
        let outcome = LiquidationEngine::apply(
            &mut f.ledger,
            &risk,
            &f.user,
            &f.liquidator,
            &f.weth,
            4_500 * WAD,
        )
        .unwrap();

        let mut engine = LiquidationEngine::new(10);
        engine.record(&outcome);
        let stats = engine.statistics();
        assert_eq!(stats.total_liquidations, 1);
        assert_eq!(stats.total_debt_covered, 4_500 * WAD);
        assert_eq!(stats.seized_by_asset[&f.weth], 4_950_000_000_000_000_000);
        assert_eq!(engine.outcomes_for(&f.user).len(), 1);
    }
}
