//! # Array Protocol Client
//!
//! Off-chain companion to the `array-protocol` program. It builds unsigned
//! instructions and transactions for a wallet to sign, derives every program
//! and Drift address, decodes program accounts, and discovers the oracle and
//! spot market accounts Drift needs for a bridge call.
//!
//! ## Modules
//!
//! | Module | Responsibility |
//! |--------|---------------|
//! | `config` | Program ids and market directory from the environment |
//! | `pda` | Address derivation for Array Protocol and Drift |
//! | `accounts` | Decoding of the program's account data |
//! | `drift` | Remaining-account discovery for bridge instructions |
//! | `services` | Instruction and transaction builders |
//!
//! ## Usage
//!
//! ```rust,ignore
//! let config = ClientConfig::from_env()?;
//! let builder = InstructionBuilder::new(&config);
//!
//! let ix = builder.deposit(&wallet, &mint, 0, 2_000_000);
//! let tx = builder.to_unsigned_transaction_base64(&[ix], &wallet, recent_blockhash)?;
//! // hand `tx` to the wallet for signing
//! ```

pub mod accounts;
pub mod config;
pub mod drift;
pub mod pda;
pub mod services;

pub use config::{ClientConfig, ConfigError};
pub use pda::{DriftAddresses, ProgramAddresses};
pub use services::transaction_builder::{BuilderError, InstructionBuilder};
