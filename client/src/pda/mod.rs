//! # Address Derivation
//!
//! Every address the program and the Drift bridge use, derived off chain.
//! Integer seeds are `u16` little-endian, matching the program.
//!
//! | Record | Seeds | Program |
//! |--------|-------|---------|
//! | Registry | `"program_state"` | Array |
//! | Delegated signer | `"program_signer"` | Array |
//! | Vault | `"token_vault", idx` | Array |
//! | Vault custody | `"token_vault_account", idx` | Array |
//! | Mint registration | `"vault_mint", mint` | Array |
//! | User | `"user", wallet` | Array |
//! | Position | `"user_vault", user, idx` | Array |
//! | Position custody | `"user_vault_account", user, idx` | Array |
//! | Sub-account | `"user", user, sub_id` | Drift |
//! | Stats | `"user_stats", user` | Drift |
//! | State | `"drift_state"` | Drift |
//! | Signer | `"drift_signer"` | Drift |
//! | Spot market | `"spot_market", idx` | Drift |
//! | Spot market vault | `"spot_market_vault", idx` | Drift |

use solana_sdk::pubkey::Pubkey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramAddresses {
    pub program_id: Pubkey,
}

impl ProgramAddresses {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    fn find(&self, seeds: &[&[u8]]) -> (Pubkey, u8) {
        Pubkey::find_program_address(seeds, &self.program_id)
    }

    pub fn program_registry(&self) -> (Pubkey, u8) {
        self.find(&[b"program_state"])
    }

    pub fn program_signer(&self) -> (Pubkey, u8) {
        self.find(&[b"program_signer"])
    }

    pub fn vault(&self, vault_index: u16) -> (Pubkey, u8) {
        self.find(&[b"token_vault", &vault_index.to_le_bytes()])
    }

    pub fn vault_custody(&self, vault_index: u16) -> (Pubkey, u8) {
        self.find(&[b"token_vault_account", &vault_index.to_le_bytes()])
    }

    pub fn mint_registration(&self, mint: &Pubkey) -> (Pubkey, u8) {
        self.find(&[b"vault_mint", mint.as_ref()])
    }

    pub fn user(&self, wallet: &Pubkey) -> (Pubkey, u8) {
        self.find(&[b"user", wallet.as_ref()])
    }

    /// `user` is the `User` record address, not the wallet.
    pub fn position(&self, user: &Pubkey, vault_index: u16) -> (Pubkey, u8) {
        self.find(&[b"user_vault", user.as_ref(), &vault_index.to_le_bytes()])
    }

    pub fn position_custody(&self, user: &Pubkey, vault_index: u16) -> (Pubkey, u8) {
        self.find(&[
            b"user_vault_account",
            user.as_ref(),
            &vault_index.to_le_bytes(),
        ])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriftAddresses {
    pub program_id: Pubkey,
}

impl DriftAddresses {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    fn find(&self, seeds: &[&[u8]]) -> Pubkey {
        Pubkey::find_program_address(seeds, &self.program_id).0
    }

    pub fn state(&self) -> Pubkey {
        self.find(&[b"drift_state"])
    }

    pub fn signer(&self) -> Pubkey {
        self.find(&[b"drift_signer"])
    }

    /// `authority` is the user's Array Protocol `User` record address.
    pub fn user_stats(&self, authority: &Pubkey) -> Pubkey {
        self.find(&[b"user_stats", authority.as_ref()])
    }

    pub fn user(&self, authority: &Pubkey, sub_account_id: u16) -> Pubkey {
        self.find(&[b"user", authority.as_ref(), &sub_account_id.to_le_bytes()])
    }

    pub fn spot_market(&self, market_index: u16) -> Pubkey {
        self.find(&[b"spot_market", &market_index.to_le_bytes()])
    }

    pub fn spot_market_vault(&self, market_index: u16) -> Pubkey {
        self.find(&[b"spot_market_vault", &market_index.to_le_bytes()])
    }
}
