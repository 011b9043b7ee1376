//! # Drift Market Discovery
//!
//! Drift validates every deposit and withdrawal against the spot market and
//! its oracle, so a bridge instruction must carry them as remaining
//! accounts. This module resolves those accounts for a market index.
//!
//! ```text
//! remaining accounts = [ oracle(s) (read-only) ..., spot market(s) (writable) ... ]
//! ```
//!
//! A directory can be loaded from JSON (see `DRIFT_MARKETS` in config) or the
//! oracle can be read straight out of fetched `SpotMarket` account data with
//! [`parse_spot_market_oracle`].

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use solana_sdk::instruction::AccountMeta;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::accounts::account_discriminator;
use crate::pda::DriftAddresses;

/// `SpotMarket.oracle` sits right after the discriminator and `pubkey`.
const SPOT_MARKET_ORACLE_OFFSET: usize = 8 + 32;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("No oracle known for spot market {0}")]
    UnknownMarket(u16),

    #[error("Invalid oracle address for market {0}: {1}")]
    InvalidOracle(u16, String),

    #[error("Spot market data is malformed")]
    MalformedSpotMarket,

    #[error("Invalid market directory: {0}")]
    InvalidDirectory(String),
}

/// Resolved accounts for one spot market.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpotMarketInfo {
    pub market_index: u16,
    pub spot_market: Pubkey,
    pub oracle: Pubkey,
}

/// Source of the oracle for a spot market.
pub trait MarketDirectory {
    fn oracle(&self, market_index: u16) -> Result<Pubkey, DiscoveryError>;
}

#[derive(Debug, Deserialize, Serialize)]
struct MarketEntry {
    market_index: u16,
    oracle: String,
}

/// Fixed market → oracle table.
///
/// ```json
/// [{ "market_index": 0, "oracle": "5SSkXsEKQepHHAewytPVwdej4epN1nxgLVM84L4KXgy7" }]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticMarketDirectory {
    oracles: HashMap<u16, Pubkey>,
}

impl StaticMarketDirectory {
    pub fn from_json(json: &str) -> Result<Self, DiscoveryError> {
        let entries: Vec<MarketEntry> = serde_json::from_str(json)
            .map_err(|e| DiscoveryError::InvalidDirectory(e.to_string()))?;

        let mut directory = Self::default();
        for entry in entries {
            let oracle = Pubkey::from_str(&entry.oracle)
                .map_err(|_| DiscoveryError::InvalidOracle(entry.market_index, entry.oracle))?;
            directory.insert(entry.market_index, oracle);
        }
        Ok(directory)
    }

    pub fn insert(&mut self, market_index: u16, oracle: Pubkey) {
        self.oracles.insert(market_index, oracle);
    }

    pub fn len(&self) -> usize {
        self.oracles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.oracles.is_empty()
    }
}

impl MarketDirectory for StaticMarketDirectory {
    fn oracle(&self, market_index: u16) -> Result<Pubkey, DiscoveryError> {
        self.oracles
            .get(&market_index)
            .copied()
            .ok_or(DiscoveryError::UnknownMarket(market_index))
    }
}

/// Reads the oracle out of raw Drift `SpotMarket` account data.
pub fn parse_spot_market_oracle(data: &[u8]) -> Result<Pubkey, DiscoveryError> {
    let end = SPOT_MARKET_ORACLE_OFFSET + 32;
    if data.len() < end || data[..8] != account_discriminator("SpotMarket") {
        return Err(DiscoveryError::MalformedSpotMarket);
    }
    let mut oracle = [0u8; 32];
    oracle.copy_from_slice(&data[SPOT_MARKET_ORACLE_OFFSET..end]);
    Ok(Pubkey::new_from_array(oracle))
}

pub fn resolve_markets<D: MarketDirectory>(
    drift: &DriftAddresses,
    directory: &D,
    market_indexes: &[u16],
) -> Result<Vec<SpotMarketInfo>, DiscoveryError> {
    market_indexes
        .iter()
        .map(|&market_index| {
            Ok(SpotMarketInfo {
                market_index,
                spot_market: drift.spot_market(market_index),
                oracle: directory.oracle(market_index)?,
            })
        })
        .collect()
}

/// Orders resolved markets the way Drift reads them: every distinct oracle
/// read-only, then every spot market writable.
pub fn remaining_accounts(markets: &[SpotMarketInfo]) -> Vec<AccountMeta> {
    let mut oracles: Vec<Pubkey> = Vec::with_capacity(markets.len());
    for market in markets {
        if !oracles.contains(&market.oracle) {
            oracles.push(market.oracle);
        }
    }

    let mut spot_markets: Vec<Pubkey> = Vec::with_capacity(markets.len());
    for market in markets {
        if !spot_markets.contains(&market.spot_market) {
            spot_markets.push(market.spot_market);
        }
    }

    oracles
        .into_iter()
        .map(|key| AccountMeta::new_readonly(key, false))
        .chain(spot_markets.into_iter().map(|key| AccountMeta::new(key, false)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drift() -> DriftAddresses {
        DriftAddresses::new(Pubkey::new_unique())
    }

    #[test]
    fn test_directory_from_json() {
        let oracle = Pubkey::new_unique();
        let json = format!(r#"[{{"market_index": 0, "oracle": "{}"}}]"#, oracle);
        let directory = StaticMarketDirectory::from_json(&json).unwrap();

        assert_eq!(directory.len(), 1);
        assert_eq!(directory.oracle(0).unwrap(), oracle);
        assert_eq!(directory.oracle(1), Err(DiscoveryError::UnknownMarket(1)));
    }

    #[test]
    fn test_directory_rejects_bad_oracle() {
        let json = r#"[{"market_index": 4, "oracle": "nope"}]"#;
        assert_eq!(
            StaticMarketDirectory::from_json(json),
            Err(DiscoveryError::InvalidOracle(4, "nope".to_string()))
        );
    }

    #[test]
    fn test_parse_spot_market_oracle() {
        let oracle = Pubkey::new_unique();
        let mut data = vec![0u8; 128];
        data[..8].copy_from_slice(&account_discriminator("SpotMarket"));
        data[40..72].copy_from_slice(oracle.as_ref());

        assert_eq!(parse_spot_market_oracle(&data).unwrap(), oracle);
        assert_eq!(
            parse_spot_market_oracle(&data[..60]),
            Err(DiscoveryError::MalformedSpotMarket)
        );

        data[..8].copy_from_slice(&account_discriminator("User"));
        assert_eq!(
            parse_spot_market_oracle(&data),
            Err(DiscoveryError::MalformedSpotMarket)
        );
    }

    #[test]
    fn test_oracles_first_then_markets() {
        let drift = drift();
        let shared = Pubkey::new_unique();
        let mut directory = StaticMarketDirectory::default();
        directory.insert(0, shared);
        directory.insert(1, shared);

        let markets = resolve_markets(&drift, &directory, &[0, 1]).unwrap();
        let metas = remaining_accounts(&markets);

        assert_eq!(metas.len(), 3);
        assert_eq!(metas[0].pubkey, shared);
        assert!(!metas[0].is_writable);
        assert_eq!(metas[1].pubkey, drift.spot_market(0));
        assert_eq!(metas[2].pubkey, drift.spot_market(1));
        assert!(metas[1].is_writable && metas[2].is_writable);
        assert!(metas.iter().all(|m| !m.is_signer));
    }

    #[test]
    fn test_unknown_market_fails_resolution() {
        let directory = StaticMarketDirectory::default();
        assert_eq!(
            resolve_markets(&drift(), &directory, &[7]),
            Err(DiscoveryError::UnknownMarket(7))
        );
    }
}
