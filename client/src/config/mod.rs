//! # Configuration Module
//!
//! Loads program ids and the Drift market directory from environment
//! variables. A `.env` file in the working directory is read first if present.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `ARRAY_PROGRAM_ID` | Deployed Array Protocol program | `5jNZph2C...` |
//! | `DRIFT_PROGRAM_ID` | Drift program | `dRiftyHA...` |
//! | `DRIFT_MARKETS` | JSON market directory (see `drift`) | empty |

use std::env;
use std::str::FromStr;

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;
use tracing::debug;

use crate::drift::StaticMarketDirectory;

pub const DEFAULT_PROGRAM_ID: &str = "5jNZph2CQjoQcaru3fjkDvXDmMGpnrNAG8CmTyaTdnm9";
pub const DEFAULT_DRIFT_PROGRAM_ID: &str = "dRiftyHA39MWEi3m9aunc5MzRF1JYuBsbn6VPcn33UH";

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An environment variable has an invalid value
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    /// Failed to parse a value
    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub program_id: Pubkey,
    pub drift_program_id: Pubkey,
    /// Oracle lookup for Drift spot markets.
    pub markets: StaticMarketDirectory,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let program_id = parse_pubkey(
            "ARRAY_PROGRAM_ID",
            &get_env_or_default("ARRAY_PROGRAM_ID", DEFAULT_PROGRAM_ID),
        )?;
        let drift_program_id = parse_pubkey(
            "DRIFT_PROGRAM_ID",
            &get_env_or_default("DRIFT_PROGRAM_ID", DEFAULT_DRIFT_PROGRAM_ID),
        )?;

        let markets = match env::var("DRIFT_MARKETS") {
            Ok(json) => StaticMarketDirectory::from_json(&json)
                .map_err(|e| ConfigError::ParseError("DRIFT_MARKETS".to_string(), e.to_string()))?,
            Err(_) => StaticMarketDirectory::default(),
        };

        debug!(
            "Loaded config: program {}, drift {}, {} markets",
            program_id,
            drift_program_id,
            markets.len()
        );

        Ok(Self {
            program_id,
            drift_program_id,
            markets,
        })
    }

    /// Configuration for the default deployment with no market directory.
    pub fn with_defaults() -> Result<Self, ConfigError> {
        Ok(Self {
            program_id: parse_pubkey("ARRAY_PROGRAM_ID", DEFAULT_PROGRAM_ID)?,
            drift_program_id: parse_pubkey("DRIFT_PROGRAM_ID", DEFAULT_DRIFT_PROGRAM_ID)?,
            markets: StaticMarketDirectory::default(),
        })
    }
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_pubkey(key: &str, value: &str) -> Result<Pubkey, ConfigError> {
    Pubkey::from_str(value).map_err(|_| ConfigError::InvalidValue(key.to_string(), value.to_string()))
}
