//! Scenario files.
//!
//! A scenario describes a market (collateral assets and their prices),
//! starting wallet balances and an ordered list of steps. The runner builds
//! an in-memory engine from it, executes every step and reports what
//! happened. Failed steps are recorded, not fatal.
//!
//! Amounts and prices are decimal strings (`"4.95"`, `"2000"`). Accounts and
//! assets are labels, hashed into addresses, or `0x` hex addresses.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::core::config::EngineParams;
use crate::core::registry::AssetRegistry;
use crate::core::vault::{CallKind, FaultMode, InMemoryVault};
use crate::error::{Error, Result};
use crate::liquidation::engine::LiquidationOutcome;
use crate::oracle::price_feed::{PriceFeed, PriceOracle};
use crate::protocol::engine::SynthEngine;
use crate::protocol::operations::{Operation, OperationResult};
use crate::utils::address::{AccountId, Address, AssetId};
use crate::utils::math::{format_wad, parse_price, parse_wad};

/// Label of the engine's custody wallet
pub const CUSTODY_LABEL: &str = "synthusd-custody";

// ═══════════════════════════════════════════════════════════════════════════════
// SCENARIO
// ═══════════════════════════════════════════════════════════════════════════════

/// A scripted engine session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name
    pub name: String,
    /// Label of the synthetic token
    #[serde(default = "default_synthetic")]
    pub synthetic: String,
    /// Collateral assets
    pub assets: Vec<MarketAsset>,
    /// Starting wallet balances
    #[serde(default)]
    pub wallets: Vec<WalletFunding>,
    /// Steps, run in order
    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_synthetic() -> String {
    "synthusd".into()
}

fn default_nth() -> usize {
    1
}

/// A collateral asset and its starting USD price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketAsset {
    /// Asset label
    pub label: String,
    /// USD price, decimal
    pub price: String,
}

/// A starting wallet balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletFunding {
    /// Owner
    pub account: String,
    /// Asset label
    pub asset: String,
    /// Balance, decimal
    pub amount: String,
}

/// One scenario step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Step {
    /// Lock collateral
    Deposit {
        /// Account label
        account: String,
        /// Asset label
        asset: String,
        /// Amount, decimal
        amount: String,
    },
    /// Mint synthetic
    Mint {
        /// Account label
        account: String,
        /// Amount, decimal
        amount: String,
    },
    /// Withdraw collateral; the recipient defaults to the account
    Redeem {
        /// Account label
        account: String,
        /// Asset label
        asset: String,
        /// Amount, decimal
        amount: String,
        /// Recipient label
        #[serde(default)]
        recipient: Option<String>,
    },
    /// Repay debt; the payer defaults to the account
    Burn {
        /// Account label
        account: String,
        /// Amount, decimal
        amount: String,
        /// Payer label
        #[serde(default)]
        payer: Option<String>,
    },
    /// Deposit then mint
    DepositAndMint {
        /// Account label
        account: String,
        /// Asset label
        asset: String,
        /// Collateral quantity, decimal
        collateral: String,
        /// Synthetic to mint, decimal
        mint: String,
    },
    /// Burn then redeem
    RedeemAndBurn {
        /// Account label
        account: String,
        /// Asset label
        asset: String,
        /// Collateral quantity, decimal
        collateral: String,
        /// Synthetic to burn, decimal
        burn: String,
    },
    /// Liquidate `target`
    Liquidate {
        /// Liquidator label
        liquidator: String,
        /// Target label
        target: String,
        /// Asset label
        asset: String,
        /// Debt to cover, decimal
        debt: String,
    },
    /// Publish a new price round
    SetPrice {
        /// Asset label
        asset: String,
        /// USD price, decimal
        price: String,
    },
    /// Take an asset's oracle offline
    HaltOracle {
        /// Asset label
        asset: String,
    },
    /// Make the n-th next collaborator call of a kind fail
    InjectFault {
        /// Collaborator call to fail
        call: CallKind,
        /// Which upcoming call (1 = next)
        #[serde(default = "default_nth")]
        nth: usize,
        /// How the call fails
        mode: FaultMode,
    },
}

impl Step {
    /// Action name as written in scenario files
    pub fn action(&self) -> &'static str {
        match self {
            Step::Deposit { .. } => "deposit",
            Step::Mint { .. } => "mint",
            Step::Redeem { .. } => "redeem",
            Step::Burn { .. } => "burn",
            Step::DepositAndMint { .. } => "deposit-and-mint",
            Step::RedeemAndBurn { .. } => "redeem-and-burn",
            Step::Liquidate { .. } => "liquidate",
            Step::SetPrice { .. } => "set-price",
            Step::HaltOracle { .. } => "halt-oracle",
            Step::InjectFault { .. } => "inject-fault",
        }
    }

    /// Accounts this step names, in order
    fn accounts(&self) -> Vec<&str> {
        match self {
            Step::Deposit { account, .. }
            | Step::Mint { account, .. }
            | Step::DepositAndMint { account, .. }
            | Step::RedeemAndBurn { account, .. } => vec![account.as_str()],
            Step::Redeem {
                account, recipient, ..
            } => std::iter::once(account).chain(recipient).map(String::as_str).collect(),
            Step::Burn { account, payer, .. } => {
                std::iter::once(account).chain(payer).map(String::as_str).collect()
            }
            Step::Liquidate {
                liquidator, target, ..
            } => vec![target.as_str(), liquidator.as_str()],
            Step::SetPrice { .. } | Step::HaltOracle { .. } | Step::InjectFault { .. } => {
                Vec::new()
            }
        }
    }

    /// Engine operation for this step, if it is one
    pub fn to_operation(&self) -> Result<Option<Operation>> {
        let op = match self {
            Step::Deposit {
                account,
                asset,
                amount,
            } => Operation::Deposit {
                account: resolve(account)?,
                asset: resolve(asset)?,
                quantity: parse_wad(amount)?,
            },
            Step::Mint { account, amount } => Operation::Mint {
                account: resolve(account)?,
                amount: parse_wad(amount)?,
            },
            Step::Redeem {
                account,
                asset,
                amount,
                recipient,
            } => Operation::Redeem {
                account: resolve(account)?,
                asset: resolve(asset)?,
                quantity: parse_wad(amount)?,
                recipient: resolve(recipient.as_deref().unwrap_or(account))?,
            },
            Step::Burn {
                account,
                amount,
                payer,
            } => Operation::Burn {
                account: resolve(account)?,
                amount: parse_wad(amount)?,
                payer: resolve(payer.as_deref().unwrap_or(account))?,
            },
            Step::DepositAndMint {
                account,
                asset,
                collateral,
                mint,
            } => Operation::DepositAndMint {
                account: resolve(account)?,
                asset: resolve(asset)?,
                quantity: parse_wad(collateral)?,
                amount: parse_wad(mint)?,
            },
            Step::RedeemAndBurn {
                account,
                asset,
                collateral,
                burn,
            } => Operation::RedeemAndBurn {
                account: resolve(account)?,
                asset: resolve(asset)?,
                quantity: parse_wad(collateral)?,
                amount: parse_wad(burn)?,
            },
            Step::Liquidate {
                liquidator,
                target,
                asset,
                debt,
            } => Operation::Liquidate {
                liquidator: resolve(liquidator)?,
                target: resolve(target)?,
                asset: resolve(asset)?,
                debt_to_cover: parse_wad(debt)?,
            },
            Step::SetPrice { .. } | Step::HaltOracle { .. } | Step::InjectFault { .. } => {
                return Ok(None)
            }
        };
        Ok(Some(op))
    }
}

impl Scenario {
    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigurationError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Parse from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Pretty JSON text
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Save as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| {
            Error::ConfigurationError(format!("cannot write {}: {}", path.display(), e))
        })
    }

    /// A price crash followed by a partial liquidation
    pub fn example() -> Self {
        let wallet = |account: &str, amount: &str| WalletFunding {
            account: account.into(),
            asset: "weth".into(),
            amount: amount.into(),
        };

        Self {
            name: "weth crash".into(),
            synthetic: default_synthetic(),
            assets: vec![MarketAsset {
                label: "weth".into(),
                price: "2000".into(),
            }],
            wallets: vec![wallet("alice", "10"), wallet("bob", "20")],
            steps: vec![
                Step::DepositAndMint {
                    account: "alice".into(),
                    asset: "weth".into(),
                    collateral: "10".into(),
                    mint: "9000".into(),
                },
                Step::DepositAndMint {
                    account: "bob".into(),
                    asset: "weth".into(),
                    collateral: "20".into(),
                    mint: "4500".into(),
                },
                Step::SetPrice {
                    asset: "weth".into(),
                    price: "1000".into(),
                },
                Step::Liquidate {
                    liquidator: "bob".into(),
                    target: "alice".into(),
                    asset: "weth".into(),
                    debt: "4500".into(),
                },
            ],
        }
    }

    /// Check every label, amount and price parses
    pub fn validate(&self) -> Result<()> {
        if self.assets.is_empty() {
            return Err(Error::ConfigurationError(format!(
                "scenario '{}' has no collateral assets",
                self.name
            )));
        }
        resolve(&self.synthetic)?;
        for asset in &self.assets {
            resolve(&asset.label)?;
            parse_price(&asset.price)?;
        }
        for wallet in &self.wallets {
            resolve(&wallet.account)?;
            resolve(&wallet.asset)?;
            parse_wad(&wallet.amount)?;
        }
        for step in &self.steps {
            step.to_operation()?;
            match step {
                Step::SetPrice { asset, price } => {
                    resolve(asset)?;
                    parse_price(price)?;
                }
                Step::HaltOracle { asset } => {
                    resolve(asset)?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Resolve a label or `0x` hex string to an address
pub fn resolve(name: &str) -> Result<Address> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidParameter {
            name: "label".into(),
            reason: "empty".into(),
        });
    }
    if name.starts_with("0x") {
        Address::from_hex(name)
    } else {
        Ok(Address::from_label(name))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REPORT
// ═══════════════════════════════════════════════════════════════════════════════

/// Outcome of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    /// 1-based position in the scenario
    pub index: usize,
    /// Action name
    pub action: String,
    /// Whether the step committed
    pub ok: bool,
    /// What happened
    pub detail: String,
    /// Error code when the step failed
    pub error_code: Option<u32>,
}

/// Final state of one account; amounts are decimal strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountReport {
    /// Account label
    pub account: String,
    /// Deposited collateral by asset label
    pub collateral: BTreeMap<String, String>,
    /// Minted debt
    pub debt: String,
    /// Collateral value in USD
    pub collateral_value_usd: String,
    /// Health factor
    pub health_factor: String,
    /// Account status
    pub status: String,
    /// Wallet balances by asset label
    pub wallet: BTreeMap<String, String>,
}

/// Result of a scenario run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario name
    pub name: String,
    /// Per-step outcomes
    pub steps: Vec<StepReport>,
    /// Final account states
    pub accounts: Vec<AccountReport>,
    /// Outstanding debt across all accounts
    pub total_debt: String,
    /// Synthetic supply held by the collaborator
    pub synthetic_supply: String,
    /// Committed events
    pub events: usize,
    /// Liquidations performed
    pub liquidations: u64,
    /// Ledger state hash
    pub state_hash: String,
}

impl ScenarioReport {
    /// Number of failed steps
    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|s| !s.ok).count()
    }

    /// Report for `label`
    pub fn account(&self, label: &str) -> Option<&AccountReport> {
        self.accounts.iter().find(|a| a.account == label)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RUNNER
// ═══════════════════════════════════════════════════════════════════════════════

/// An in-memory engine built from a scenario
pub struct ScenarioRunner {
    engine: SynthEngine<InMemoryVault>,
    feed: Arc<PriceFeed>,
    names: HashMap<Address, String>,
    accounts: Vec<String>,
    assets: Vec<String>,
}

impl ScenarioRunner {
    /// Build the market, fund wallets and create the engine
    pub fn new(scenario: &Scenario, params: EngineParams) -> Result<Self> {
        scenario.validate()?;

        let mut names = HashMap::new();
        let synthetic = resolve(&scenario.synthetic)?;
        names.insert(synthetic, scenario.synthetic.clone());

        let feed = Arc::new(PriceFeed::new());
        let mut pairs: Vec<(AssetId, Arc<dyn PriceOracle>)> = Vec::new();
        for asset in &scenario.assets {
            let id = resolve(&asset.label)?;
            feed.set_price(id, parse_price(&asset.price)?)?;
            pairs.push((id, feed.clone()));
            names.insert(id, asset.label.clone());
        }
        let registry = AssetRegistry::from_pairs(pairs)?;

        let custody = AccountId::from_label(CUSTODY_LABEL);
        let mut vault = InMemoryVault::new(synthetic, custody);
        let mut accounts: Vec<String> = Vec::new();
        let mut remember = |label: &str, names: &mut HashMap<Address, String>| -> Result<()> {
            let id = resolve(label)?;
            if !names.contains_key(&id) {
                names.insert(id, label.to_string());
                accounts.push(label.to_string());
            }
            Ok(())
        };

        for wallet in &scenario.wallets {
            remember(&wallet.account, &mut names)?;
            vault.fund(
                resolve(&wallet.asset)?,
                resolve(&wallet.account)?,
                parse_wad(&wallet.amount)?,
            )?;
        }
        for step in &scenario.steps {
            for label in step.accounts() {
                remember(label, &mut names)?;
            }
        }

        let engine = SynthEngine::new(registry, synthetic, custody, vault, params)?;
        info!(scenario = %scenario.name, steps = scenario.steps.len(), "scenario loaded");

        Ok(Self {
            engine,
            feed,
            names,
            accounts,
            assets: scenario.assets.iter().map(|a| a.label.clone()).collect(),
        })
    }

    /// Build and run `scenario` to completion
    pub fn run(scenario: &Scenario, params: EngineParams) -> Result<ScenarioReport> {
        let runner = Self::new(scenario, params)?;
        let steps = scenario
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| runner.run_step(i + 1, step))
            .collect();
        runner.report(&scenario.name, steps)
    }

    /// Engine under test
    pub fn engine(&self) -> &SynthEngine<InMemoryVault> {
        &self.engine
    }

    /// Price feed backing every asset
    pub fn feed(&self) -> &PriceFeed {
        &self.feed
    }

    /// Run one step and describe its outcome
    pub fn run_step(&self, index: usize, step: &Step) -> StepReport {
        let outcome = self.apply(step);
        debug!(index, action = step.action(), ok = outcome.is_ok(), "scenario step");

        match outcome {
            Ok(detail) => StepReport {
                index,
                action: step.action().into(),
                ok: true,
                detail,
                error_code: None,
            },
            Err(e) => StepReport {
                index,
                action: step.action().into(),
                ok: false,
                detail: e.to_string(),
                error_code: Some(e.code()),
            },
        }
    }

    fn apply(&self, step: &Step) -> Result<String> {
        match step {
            Step::SetPrice { asset, price } => {
                self.feed.set_price(resolve(asset)?, parse_price(price)?)?;
                Ok(format!("{} = ${}", asset, price))
            }
            Step::HaltOracle { asset } => {
                self.feed.halt(resolve(asset)?)?;
                Ok(format!("{} oracle halted", asset))
            }
            Step::InjectFault { call, nth, mode } => {
                self.engine
                    .with_collaborator(|vault| vault.fail_on(*call, *nth, *mode))?;
                Ok(format!("{} call #{} will {:?}", call, nth, mode))
            }
            _ => match step.to_operation()? {
                Some(op) => Ok(self.describe(step, &self.engine.execute_operation(op)?)),
                None => Ok(String::new()),
            },
        }
    }

    fn describe(&self, step: &Step, result: &OperationResult) -> String {
        match result {
            OperationResult::Collateral { asset, balance, .. } => {
                let verb = match step {
                    Step::Redeem { .. } => "redeemed",
                    _ => "deposited",
                };
                format!(
                    "{} {}, {} on deposit",
                    self.name_of(asset),
                    verb,
                    format_wad(*balance)
                )
            }
            OperationResult::Debt { debt, .. } => format!("debt {}", format_wad(*debt)),
            OperationResult::Completed => "completed".into(),
            OperationResult::Liquidation(outcome) => self.describe_liquidation(outcome),
        }
    }

    fn describe_liquidation(&self, outcome: &LiquidationOutcome) -> String {
        format!(
            "covered {} of {}: seized {} {} (bonus {}), health {} -> {}",
            format_wad(outcome.plan.debt_to_cover),
            self.name_of(&outcome.target),
            format_wad(outcome.plan.total_seized),
            self.name_of(&outcome.plan.asset),
            format_wad(outcome.plan.bonus),
            format_wad(outcome.starting_health_factor),
            format_wad(outcome.ending_health_factor),
        )
    }

    fn name_of(&self, address: &Address) -> String {
        self.names
            .get(address)
            .cloned()
            .unwrap_or_else(|| address.short())
    }

    /// Summarize the engine's final state
    pub fn report(&self, name: &str, steps: Vec<StepReport>) -> Result<ScenarioReport> {
        let mut accounts = Vec::with_capacity(self.accounts.len());
        for label in &self.accounts {
            accounts.push(self.account_report(label)?);
        }

        let ledger = self.engine.ledger_snapshot()?;
        let synthetic = self.engine.synthetic();
        let supply = self
            .engine
            .with_collaborator(|vault| vault.total_supply(&synthetic))?;

        Ok(ScenarioReport {
            name: name.to_string(),
            steps,
            accounts,
            total_debt: format_wad(ledger.total_debt()),
            synthetic_supply: format_wad(supply),
            events: self.engine.events()?.len(),
            liquidations: self.engine.liquidation_stats()?.total_liquidations,
            state_hash: hex::encode(ledger.state_hash()),
        })
    }

    fn account_report(&self, label: &str) -> Result<AccountReport> {
        let account = resolve(label)?;
        let synthetic = self.engine.synthetic();

        let mut collateral = BTreeMap::new();
        let mut wallet = BTreeMap::new();
        for asset_label in &self.assets {
            let asset = resolve(asset_label)?;
            let deposited = self.engine.collateral_balance(&account, &asset)?;
            if deposited > 0 {
                collateral.insert(asset_label.clone(), format_wad(deposited));
            }
            let held = self
                .engine
                .with_collaborator(|vault| vault.balance_of(&asset, &account))?;
            if held > 0 {
                wallet.insert(asset_label.clone(), format_wad(held));
            }
        }
        let held = self
            .engine
            .with_collaborator(|vault| vault.balance_of(&synthetic, &account))?;
        if held > 0 {
            wallet.insert(self.name_of(&synthetic), format_wad(held));
        }

        // Valuation needs live prices; a halted oracle leaves them unknown
        let (value, health_factor, status) = match self.engine.account_information(&account) {
            Ok(info) => (
                format_wad(info.collateral_value_usd),
                format_wad(info.health_factor),
                format!("{:?}", info.status),
            ),
            Err(e) => ("?".into(), "?".into(), format!("unpriced ({})", e)),
        };

        Ok(AccountReport {
            account: label.to_string(),
            collateral,
            debt: format_wad(self.engine.debt_of(&account)?),
            collateral_value_usd: value,
            health_factor,
            status,
            wallet,
        })
    }
}

impl std::fmt::Debug for ScenarioRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioRunner")
            .field("engine", &self.engine)
            .field("accounts", &self.accounts)
            .finish_non_exhaustive()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_liquidation() {
        let report = ScenarioRunner::run(&Scenario::example(), EngineParams::default()).unwrap();
        assert_eq!(report.failures(), 0, "{:#?}", report.steps);
        assert_eq!(report.liquidations, 1);

        let alice = report.account("alice").unwrap();
        assert_eq!(alice.collateral["weth"], "5.05");
        assert_eq!(alice.debt, "4500");

        let bob = report.account("bob").unwrap();
        assert_eq!(bob.wallet["weth"], "4.95");
        assert!(!bob.wallet.contains_key("synthusd"));
        assert_eq!(report.synthetic_supply, "9000");
        assert_eq!(report.total_debt, "9000");
    }

    #[test]
    fn test_step_details_name_the_action() {
        let scenario = Scenario {
            name: "details".into(),
            synthetic: default_synthetic(),
            assets: vec![MarketAsset {
                label: "weth".into(),
                price: "2000".into(),
            }],
            wallets: vec![WalletFunding {
                account: "dave".into(),
                asset: "weth".into(),
                amount: "3".into(),
            }],
            steps: vec![
                Step::Deposit {
                    account: "dave".into(),
                    asset: "weth".into(),
                    amount: "3".into(),
                },
                Step::Redeem {
                    account: "dave".into(),
                    asset: "weth".into(),
                    amount: "1".into(),
                    recipient: None,
                },
            ],
        };

        let report = ScenarioRunner::run(&scenario, EngineParams::default()).unwrap();
        assert_eq!(report.failures(), 0, "{:#?}", report.steps);
        assert_eq!(report.steps[0].detail, "weth deposited, 3 on deposit");
        assert_eq!(report.steps[1].detail, "weth redeemed, 2 on deposit");
    }

    #[test]
    fn test_failed_step_is_recorded() {
        let mut scenario = Scenario::example();
        scenario.steps.push(Step::Mint {
            account: "alice".into(),
            amount: "1".into(),
        });

        let report = ScenarioRunner::run(&scenario, EngineParams::default()).unwrap();
        assert_eq!(report.failures(), 1);
        let last = report.steps.last().unwrap();
        assert!(!last.ok);
        assert_eq!(last.error_code, Some(Error::HealthFactorBroken(0).code()));
    }

    #[test]
    fn test_injected_fault_rolls_back() {
        let scenario = Scenario {
            name: "fault".into(),
            synthetic: default_synthetic(),
            assets: vec![MarketAsset {
                label: "weth".into(),
                price: "2000".into(),
            }],
            wallets: vec![WalletFunding {
                account: "carol".into(),
                asset: "weth".into(),
                amount: "1".into(),
            }],
            steps: vec![
                Step::InjectFault {
                    call: CallKind::MintSynthetic,
                    nth: 1,
                    mode: FaultMode::Decline,
                },
                Step::DepositAndMint {
                    account: "carol".into(),
                    asset: "weth".into(),
                    collateral: "1".into(),
                    mint: "100".into(),
                },
            ],
        };

        let report = ScenarioRunner::run(&scenario, EngineParams::default()).unwrap();
        assert!(report.steps[0].ok);
        assert!(!report.steps[1].ok);

        let carol = report.account("carol").unwrap();
        assert!(carol.collateral.is_empty());
        assert_eq!(carol.wallet["weth"], "1");
        assert_eq!(report.events, 0);
    }

    #[test]
    fn test_parse_json_steps() {
        let json = r#"{
            "name": "json",
            "assets": [{ "label": "wbtc", "price": "30000" }],
            "wallets": [{ "account": "dave", "asset": "wbtc", "amount": "0.5" }],
            "steps": [
                { "action": "deposit", "account": "dave", "asset": "wbtc", "amount": "0.5" },
                { "action": "burn", "account": "dave", "amount": "1" },
                { "action": "inject-fault", "call": "transfer-out", "mode": "error" },
                { "action": "halt-oracle", "asset": "wbtc" }
            ]
        }"#;

        let scenario = Scenario::from_json(json).unwrap();
        assert_eq!(scenario.synthetic, "synthusd");
        assert_eq!(scenario.steps.len(), 4);
        assert_eq!(
            scenario.steps[2],
            Step::InjectFault {
                call: CallKind::TransferOut,
                nth: 1,
                mode: FaultMode::Error
            }
        );
        assert_eq!(
            scenario.steps[1].to_operation().unwrap(),
            Some(Operation::Burn {
                account: resolve("dave").unwrap(),
                amount: crate::utils::constants::PRECISION,
                payer: resolve("dave").unwrap(),
            })
        );

        let report = ScenarioRunner::run(&scenario, EngineParams::default()).unwrap();
        assert!(report.steps[0].ok);
        assert_eq!(
            report.steps[1].error_code,
            Some(
                Error::InsufficientDebt {
                    required: 0,
                    available: 0
                }
                .code()
            )
        );
        assert_eq!(report.account("dave").unwrap().health_factor, "?");
    }

    #[test]
    fn test_invalid_scenario_rejected() {
        let mut scenario = Scenario::example();
        scenario.steps.push(Step::SetPrice {
            asset: "weth".into(),
            price: "lots".into(),
        });
        assert!(ScenarioRunner::new(&scenario, EngineParams::default()).is_err());

        let mut scenario = Scenario::example();
        scenario.assets.clear();
        assert!(matches!(
            scenario.validate(),
            Err(Error::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.json");
        Scenario::example().save(&path).unwrap();
        assert_eq!(Scenario::load(&path).unwrap(), Scenario::example());
    }

    #[test]
    fn test_resolve_hex_and_label() {
        let alice = Address::from_label("alice");
        assert_eq!(resolve(&alice.to_hex()).unwrap(), alice);
        assert_eq!(resolve(" alice ").unwrap(), alice);
        assert!(resolve("").is_err());
    }
}
