//! Registry of supported collateral assets.
//!
//! Built once from parallel lists of assets and oracles; read-only afterwards.
//! Insertion order is preserved so valuation iterates deterministically.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::oracle::PriceOracle;
use crate::utils::address::AssetId;

/// One registered collateral asset
#[derive(Clone)]
pub struct RegisteredAsset {
    /// Asset identifier
    pub asset: AssetId,
    /// Oracle used to price it
    pub oracle: Arc<dyn PriceOracle>,
}

impl fmt::Debug for RegisteredAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredAsset")
            .field("asset", &self.asset)
            .finish_non_exhaustive()
    }
}

/// Immutable mapping from collateral asset to its oracle
#[derive(Debug, Clone)]
pub struct AssetRegistry {
    entries: Vec<RegisteredAsset>,
    index: HashMap<AssetId, usize>,
}

impl AssetRegistry {
    /// Build from parallel lists; lengths must match
    pub fn new(assets: Vec<AssetId>, oracles: Vec<Arc<dyn PriceOracle>>) -> Result<Self> {
        if assets.len() != oracles.len() {
            return Err(Error::ConfigurationError(format!(
                "{} assets but {} oracles",
                assets.len(),
                oracles.len()
            )));
        }
        Self::from_pairs(assets.into_iter().zip(oracles).collect())
    }

    /// Build from `(asset, oracle)` pairs
    pub fn from_pairs(pairs: Vec<(AssetId, Arc<dyn PriceOracle>)>) -> Result<Self> {
        if pairs.is_empty() {
            return Err(Error::ConfigurationError(
                "at least one collateral asset is required".into(),
            ));
        }

        let mut entries = Vec::with_capacity(pairs.len());
        let mut index = HashMap::with_capacity(pairs.len());
        for (asset, oracle) in pairs {
            if index.insert(asset, entries.len()).is_some() {
                return Err(Error::ConfigurationError(format!(
                    "asset {} registered twice",
                    asset
                )));
            }
            entries.push(RegisteredAsset { asset, oracle });
        }

        Ok(Self { entries, index })
    }

    /// Oracle for `asset`, or `AssetNotAllowed`
    pub fn price_oracle_for(&self, asset: &AssetId) -> Result<&dyn PriceOracle> {
        self.index
            .get(asset)
            .map(|&i| self.entries[i].oracle.as_ref())
            .ok_or(Error::AssetNotAllowed(*asset))
    }

    /// Fail with `AssetNotAllowed` unless `asset` is registered
    pub fn ensure_allowed(&self, asset: &AssetId) -> Result<()> {
        if self.is_allowed(asset) {
            Ok(())
        } else {
            Err(Error::AssetNotAllowed(*asset))
        }
    }

    /// Check whether `asset` is registered
    pub fn is_allowed(&self, asset: &AssetId) -> bool {
        self.index.contains_key(asset)
    }

    /// Registered assets in insertion order
    pub fn assets(&self) -> impl Iterator<Item = &AssetId> + '_ {
        self.entries.iter().map(|e| &e.asset)
    }

    /// Number of registered assets
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a constructed registry
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
