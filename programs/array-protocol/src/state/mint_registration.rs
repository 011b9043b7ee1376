//! # Mint Registration Account
//!
//! Marker created next to each vault, keyed by mint. Its existence is what
//! keeps a mint from being registered as a second vault.

use anchor_lang::prelude::*;

#[account]
#[derive(Default)]
pub struct MintRegistration {
    /// Size: 32 bytes
    pub mint: Pubkey,

    /// Vault that owns this mint.
    ///
    /// Size: 2 bytes
    pub vault_index: u16,

    /// Size: 1 byte
    pub bump: u8,
}

impl MintRegistration {
    /// Total: 8 + 32 + 2 + 1 = 43 bytes
    pub const LEN: usize = 8 + 32 + 2 + 1;

    pub const SEED_PREFIX: &'static [u8] = b"vault_mint";

    pub fn is_initialized(&self) -> bool {
        self.mint != Pubkey::default()
    }
}
