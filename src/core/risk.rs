//! Risk engine: valuation and solvency.
//!
//! The sole authority on whether a position is solvent. Every valuation pulls
//! a fresh oracle round; nothing is cached.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::config::EngineParams;
use crate::core::ledger::Account;
use crate::core::registry::AssetRegistry;
use crate::error::{Error, Result};
use crate::utils::address::AssetId;
use crate::utils::constants::MAX_HEALTH_FACTOR;
use crate::utils::math::*;

// ═══════════════════════════════════════════════════════════════════════════════
// ACCOUNT STATUS
// ═══════════════════════════════════════════════════════════════════════════════

/// Position state derived from balances and prices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    /// No collateral and no debt
    Empty,
    /// Collateral but no debt
    Collateralized,
    /// Debt outstanding and solvent
    Active,
    /// Debt outstanding and below the minimum health factor
    Liquidatable,
}

impl AccountStatus {
    /// Determine status from balances and health factor
    pub fn classify(has_collateral: bool, debt: u128, health_factor: u128, min_hf: u128) -> Self {
        match (has_collateral, debt) {
            (false, 0) => AccountStatus::Empty,
            (true, 0) => AccountStatus::Collateralized,
            _ if health_factor < min_hf => AccountStatus::Liquidatable,
            _ => AccountStatus::Active,
        }
    }

    /// Check if the position can be liquidated
    pub fn is_liquidatable(&self) -> bool {
        matches!(self, AccountStatus::Liquidatable)
    }
}

/// Snapshot of an account's risk at current prices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Minted debt (18 decimals)
    pub total_debt: u128,
    /// Collateral value in USD (18 decimals)
    pub collateral_value_usd: u128,
    /// Current health factor
    pub health_factor: u128,
    /// Derived status
    pub status: AccountStatus,
}

// ═══════════════════════════════════════════════════════════════════════════════
// RISK ENGINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Valuation and solvency checks over a registry and risk parameters
#[derive(Debug, Clone, Copy)]
pub struct RiskEngine<'a> {
    registry: &'a AssetRegistry,
    params: &'a EngineParams,
}

impl<'a> RiskEngine<'a> {
    /// Create a risk engine view
    pub fn new(registry: &'a AssetRegistry, params: &'a EngineParams) -> Self {
        Self { registry, params }
    }

    /// Validated 8-decimal answer for `asset`
    pub fn price_of(&self, asset: &AssetId) -> Result<u128> {
        let oracle = self.registry.price_oracle_for(asset)?;
        let round = oracle.latest_price(asset)?;
        round.validated_answer(asset)
    }

    /// USD value (18 decimals) of `quantity` of `asset`
    pub fn usd_value(&self, asset: &AssetId, quantity: u128) -> Result<u128> {
        let answer = self.price_of(asset)?;
        calculate_usd_value(quantity, answer)
    }

    /// Quantity of `asset` worth `usd_amount`
    pub fn quantity_from_usd(&self, asset: &AssetId, usd_amount: u128) -> Result<u128> {
        let answer = self.price_of(asset)?;
        calculate_quantity_from_usd(usd_amount, answer)
    }

    /// Sum of `usd_value` over every registered asset, in registry order.
    ///
    /// Assets the account does not hold are skipped without an oracle read.
    pub fn total_collateral_value(&self, account: &Account) -> Result<u128> {
        let mut total = 0u128;
        for asset in self.registry.assets() {
            let quantity = account.collateral_of(asset);
            if quantity == 0 {
                continue;
            }
            total = safe_add(total, self.usd_value(asset, quantity)?)?;
        }
        Ok(total)
    }

    /// Health factor of `account`; maximal when it has no debt
    pub fn health_factor(&self, account: &Account) -> Result<u128> {
        if account.debt == 0 {
            return Ok(MAX_HEALTH_FACTOR);
        }
        let collateral_usd = self.total_collateral_value(account)?;
        calculate_health_factor(collateral_usd, account.debt, self.params.liquidation_threshold)
    }

    /// Fail with `HealthFactorBroken` when `account` is below the minimum
    pub fn assert_solvent(&self, account: &Account) -> Result<()> {
        let hf = self.health_factor(account)?;
        if hf < self.params.min_health_factor {
            debug!(health_factor = hf, "solvency check failed");
            return Err(Error::HealthFactorBroken(hf));
        }
        Ok(())
    }

    /// Debt, collateral value, health factor and status of `account`
    pub fn account_information(&self, account: &Account) -> Result<AccountSnapshot> {
        let collateral_value_usd = self.total_collateral_value(account)?;
        let health_factor = if account.debt == 0 {
            MAX_HEALTH_FACTOR
        } else {
            calculate_health_factor(
                collateral_value_usd,
                account.debt,
                self.params.liquidation_threshold,
            )?
        };
        let status = AccountStatus::classify(
            account.has_collateral(),
            account.debt,
            health_factor,
            self.params.min_health_factor,
        );

        Ok(AccountSnapshot {
            total_debt: account.debt,
            collateral_value_usd,
            health_factor,
            status,
        })
    }

    /// Health factor `account` would have with `collateral_removed_usd` of
    /// collateral value removed and `debt_added` of extra debt
    pub fn health_factor_after(
        &self,
        account: &Account,
        collateral_removed_usd: u128,
        debt_added: u128,
    ) -> Result<u128> {
        let collateral = self
            .total_collateral_value(account)?
            .saturating_sub(collateral_removed_usd);
        let debt = safe_add(account.debt, debt_added)?;
        calculate_health_factor(collateral, debt, self.params.liquidation_threshold)
    }

    /// Risk parameters in use
    pub fn params(&self) -> &EngineParams {
        self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{PriceFeed, PriceOracle};
    use crate::utils::constants::PRECISION;
    use std::sync::Arc;

    const WAD: u128 = PRECISION;

    fn setup() -> (AssetRegistry, Arc<PriceFeed>, AssetId, AssetId) {
        let weth = AssetId::from_label("weth");
        let wbtc = AssetId::from_label("wbtc");
        let feed = Arc::new(PriceFeed::new());
        feed.set_price(weth, 2_000_00000000).unwrap();
        feed.set_price(wbtc, 30_000_00000000).unwrap();

        let oracle: Arc<dyn PriceOracle> = feed.clone();
        let registry = AssetRegistry::new(vec![weth, wbtc], vec![oracle.clone(), oracle]).unwrap();
        (registry, feed, weth, wbtc)
    }

    fn account(collateral: &[(AssetId, u128)], debt: u128) -> Account {
        Account {
            collateral: collateral.iter().copied().collect(),
            debt,
        }
    }

    #[test]
    fn test_usd_value_and_inverse() {
        let (registry, _feed, weth, _) = setup();
        let params = EngineParams::default();
        let risk = RiskEngine::new(&registry, &params);

        assert_eq!(risk.usd_value(&weth, 15 * WAD).unwrap(), 30_000 * WAD);
        assert_eq!(risk.quantity_from_usd(&weth, 100 * WAD).unwrap(), WAD / 20);
    }

    #[test]
    fn test_unknown_asset_not_allowed() {
        let (registry, _feed, _, _) = setup();
        let params = EngineParams::default();
        let risk = RiskEngine::new(&registry, &params);
        let doge = AssetId::from_label("doge");

        assert_eq!(risk.usd_value(&doge, WAD), Err(Error::AssetNotAllowed(doge)));
    }

    #[test]
    fn test_total_collateral_value_sums_assets() {
        let (registry, _feed, weth, wbtc) = setup();
        let params = EngineParams::default();
        let risk = RiskEngine::new(&registry, &params);

        let acct = account(&[(weth, 2 * WAD), (wbtc, WAD)], 0);
        assert_eq!(risk.total_collateral_value(&acct).unwrap(), 34_000 * WAD);
    }

    #[test]
    fn test_health_factor_scenario() {
        let (registry, feed, weth, _) = setup();
        let params = EngineParams::default();
        let risk = RiskEngine::new(&registry, &params);
        let acct = account(&[(weth, 10 * WAD)], 9_000 * WAD);

        let hf = risk.health_factor(&acct).unwrap();
        assert_eq!(hf, 1_111_111_111_111_111_111);
        assert!(risk.assert_solvent(&acct).is_ok());

        feed.set_price(weth, 1_000_00000000).unwrap();
        let hf = risk.health_factor(&acct).unwrap();
        assert_eq!(hf, 555_555_555_555_555_555);
        assert_eq!(risk.assert_solvent(&acct), Err(Error::HealthFactorBroken(hf)));
        assert_eq!(
            risk.account_information(&acct).unwrap().status,
            AccountStatus::Liquidatable
        );
    }

    #[test]
    fn test_zero_debt_skips_oracle() {
        let (registry, feed, weth, _) = setup();
        let params = EngineParams::default();
        let risk = RiskEngine::new(&registry, &params);
        feed.halt(weth).unwrap();

        let acct = account(&[(weth, WAD)], 0);
        assert_eq!(risk.health_factor(&acct).unwrap(), MAX_HEALTH_FACTOR);
        assert!(risk.assert_solvent(&acct).is_ok());
    }

    #[test]
    fn test_oracle_failure_propagates() {
        let (registry, feed, weth, _) = setup();
        let params = EngineParams::default();
        let risk = RiskEngine::new(&registry, &params);
        feed.halt(weth).unwrap();

        let acct = account(&[(weth, WAD)], WAD);
        assert!(matches!(
            risk.health_factor(&acct),
            Err(Error::OracleUnavailable { .. })
        ));
    }

    #[test]
    fn test_status_classification() {
        let min = PRECISION;
        assert_eq!(AccountStatus::classify(false, 0, MAX_HEALTH_FACTOR, min), AccountStatus::Empty);
        assert_eq!(
            AccountStatus::classify(true, 0, MAX_HEALTH_FACTOR, min),
            AccountStatus::Collateralized
        );
        assert_eq!(AccountStatus::classify(true, 1, 2 * min, min), AccountStatus::Active);
        assert!(AccountStatus::classify(false, 1, 0, min).is_liquidatable());
    }

    #[test]
    fn test_health_factor_after() {
        let (registry, _feed, weth, _) = setup();
        let params = EngineParams::default();
        let risk = RiskEngine::new(&registry, &params);
        let acct = account(&[(weth, 10 * WAD)], 0);

        // $20000 collateral, minting 10000 lands exactly on 1.0
        assert_eq!(risk.health_factor_after(&acct, 0, 10_000 * WAD).unwrap(), PRECISION);
    }
}
