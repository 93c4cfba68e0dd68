//! Price feed implementation.
//!
//! This module provides the oracle adapter seam and an in-memory feed:
//! - `PriceOracle`, the pull-based interface the risk engine reads
//! - `PriceData`, one reported round (8-decimal answer)
//! - `PriceFeed`, a settable feed with optional staleness bound

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::error::{Error, Result};
use crate::utils::address::AssetId;
use crate::utils::constants::FEED_DECIMALS;

// ═══════════════════════════════════════════════════════════════════════════════
// PRICE DATA
// ═══════════════════════════════════════════════════════════════════════════════

/// A single price round as reported by a feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceData {
    /// Raw answer (e.g. 200000000000 = $2000.00000000)
    pub answer: i128,
    /// Decimal precision of `answer`
    pub decimals: u8,
    /// Unix timestamp of the round
    pub updated_at: i64,
}

impl PriceData {
    /// Create a round in the reference 8-decimal format, stamped now
    pub fn new(answer: i128) -> Self {
        Self {
            answer,
            decimals: FEED_DECIMALS,
            updated_at: Utc::now().timestamp(),
        }
    }

    /// Create a round with an explicit timestamp
    pub fn at(answer: i128, updated_at: i64) -> Self {
        Self {
            answer,
            decimals: FEED_DECIMALS,
            updated_at,
        }
    }

    /// Age of the round in seconds relative to `now`
    pub fn age(&self, now: i64) -> u64 {
        now.saturating_sub(self.updated_at).max(0) as u64
    }

    /// Check the round is usable and return the answer as an unsigned integer.
    ///
    /// Non-positive answers and unexpected precision are reported as an
    /// unavailable oracle; no default price is ever substituted.
    pub fn validated_answer(&self, asset: &AssetId) -> Result<u128> {
        if self.decimals != FEED_DECIMALS {
            return Err(Error::OracleUnavailable {
                asset: *asset,
                reason: format!(
                    "feed reports {} decimals, expected {}",
                    self.decimals, FEED_DECIMALS
                ),
            });
        }
        if self.answer <= 0 {
            return Err(Error::OracleUnavailable {
                asset: *asset,
                reason: format!("non-positive answer {}", self.answer),
            });
        }
        Ok(self.answer as u128)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ORACLE INTERFACE
// ═══════════════════════════════════════════════════════════════════════════════

/// Read-only price source queried fresh on every valuation
pub trait PriceOracle: Send + Sync {
    /// Latest round for `asset`
    fn latest_price(&self, asset: &AssetId) -> Result<PriceData>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRICE FEED
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
struct FeedState {
    rounds: HashMap<AssetId, PriceData>,
    history: HashMap<AssetId, Vec<PriceData>>,
    halted: HashSet<AssetId>,
}

/// In-memory feed that can serve several assets
#[derive(Debug)]
pub struct PriceFeed {
    state: RwLock<FeedState>,
    /// Maximum round age in seconds (`None` disables the check)
    max_staleness: Option<u64>,
    /// Maximum rounds kept per asset
    max_history: usize,
}

impl Default for PriceFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceFeed {
    /// Create a feed without a staleness bound
    pub fn new() -> Self {
        Self {
            state: RwLock::new(FeedState::default()),
            max_staleness: None,
            max_history: 100,
        }
    }

    /// Create a feed rejecting rounds older than `max_staleness` seconds
    pub fn with_max_staleness(max_staleness: u64) -> Self {
        Self {
            max_staleness: Some(max_staleness),
            ..Self::new()
        }
    }

    /// Publish a new 8-decimal answer for `asset`, stamped now
    pub fn set_price(&self, asset: AssetId, answer: i128) -> Result<()> {
        self.push_round(asset, PriceData::new(answer))
    }

    /// Publish an explicit round
    pub fn push_round(&self, asset: AssetId, round: PriceData) -> Result<()> {
        let mut state = self.state.write()?;
        state.rounds.insert(asset, round);

        let history = state.history.entry(asset).or_default();
        history.push(round);
        if history.len() > self.max_history {
            history.remove(0);
        }
        Ok(())
    }

    /// Make the feed refuse to answer for `asset`
    pub fn halt(&self, asset: AssetId) -> Result<()> {
        self.state.write()?.halted.insert(asset);
        Ok(())
    }

    /// Resume answering for `asset`
    pub fn resume(&self, asset: &AssetId) -> Result<()> {
        self.state.write()?.halted.remove(asset);
        Ok(())
    }

    /// Rounds published for `asset`, oldest first
    pub fn history(&self, asset: &AssetId) -> Result<Vec<PriceData>> {
        Ok(self
            .state
            .read()?
            .history
            .get(asset)
            .cloned()
            .unwrap_or_default())
    }
}

impl PriceOracle for PriceFeed {
    fn latest_price(&self, asset: &AssetId) -> Result<PriceData> {
        let state = self.state.read()?;

        if state.halted.contains(asset) {
            return Err(Error::OracleUnavailable {
                asset: *asset,
                reason: "feed halted".into(),
            });
        }

        let round = state.rounds.get(asset).copied().ok_or_else(|| Error::OracleUnavailable {
            asset: *asset,
            reason: "no round published".into(),
        })?;

        if let Some(max_age) = self.max_staleness {
            let age = round.age(Utc::now().timestamp());
            if age > max_age {
                return Err(Error::OracleUnavailable {
                    asset: *asset,
                    reason: format!("round is {}s old, max allowed {}s", age, max_age),
                });
            }
        }

        Ok(round)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weth() -> AssetId {
        AssetId::from_label("weth")
    }

    #[test]
    fn test_set_and_read_price() {
        let feed = PriceFeed::new();
        feed.set_price(weth(), 2_000_00000000).unwrap();

        let round = feed.latest_price(&weth()).unwrap();
        assert_eq!(round.answer, 2_000_00000000);
        assert_eq!(round.decimals, FEED_DECIMALS);
        assert_eq!(round.validated_answer(&weth()).unwrap(), 200_000_000_000);
    }

    #[test]
    fn test_missing_round_is_unavailable() {
        let feed = PriceFeed::new();
        assert!(matches!(
            feed.latest_price(&weth()),
            Err(Error::OracleUnavailable { .. })
        ));
    }

    #[test]
    fn test_halt_and_resume() {
        let feed = PriceFeed::new();
        feed.set_price(weth(), 1_000_00000000).unwrap();
        feed.halt(weth()).unwrap();
        assert!(feed.latest_price(&weth()).is_err());

        feed.resume(&weth()).unwrap();
        assert!(feed.latest_price(&weth()).is_ok());
    }

    #[test]
    fn test_stale_round_rejected() {
        let feed = PriceFeed::with_max_staleness(3600);
        let old = Utc::now().timestamp() - 7200;
        feed.push_round(weth(), PriceData::at(1_000_00000000, old)).unwrap();

        let err = feed.latest_price(&weth()).unwrap_err();
        assert!(err.to_string().contains("old"));
    }

    #[test]
    fn test_invalid_answers_rejected() {
        let asset = weth();
        assert!(PriceData::at(0, 0).validated_answer(&asset).is_err());
        assert!(PriceData::at(-5, 0).validated_answer(&asset).is_err());

        let mut round = PriceData::at(100, 0);
        round.decimals = 6;
        assert!(round.validated_answer(&asset).is_err());
    }

    #[test]
    fn test_history_tracks_rounds() {
        let feed = PriceFeed::new();
        feed.set_price(weth(), 2_000_00000000).unwrap();
        feed.set_price(weth(), 1_000_00000000).unwrap();

        let history = feed.history(&weth()).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].answer, 1_000_00000000);
    }
}
