//! # Program Registry Account
//!
//! Global singleton created right after deployment. It records who may
//! register new vaults and which keyless identity owns the pooled custody
//! accounts.

use anchor_lang::prelude::*;

/// # ProgramRegistry
///
/// | Field | Type | Description |
/// |-------|------|-------------|
/// | admin | Pubkey | May register vaults and operate bridges |
/// | signer | Pubkey | Delegated signer PDA (`["program_signer"]`) |
/// | signer_bump | u8 | Bump for `signer` |
/// | vault_count | u16 | Number of registered vaults, also the next index |
/// | bump | u8 | Bump for this record |
#[account]
#[derive(Default)]
pub struct ProgramRegistry {
    /// Set once by `init_program_registry`. A default key means the
    /// record was allocated but never populated.
    ///
    /// Size: 32 bytes
    pub admin: Pubkey,

    /// The delegated signer. Every vault custody token account names this
    /// address as its token authority, so only the program can move pooled
    /// funds.
    ///
    /// Size: 32 bytes
    pub signer: Pubkey,

    /// Size: 1 byte
    pub signer_bump: u8,

    /// Count of supported vaults. Indices run `0..vault_count`.
    ///
    /// Size: 2 bytes
    pub vault_count: u16,

    /// Size: 1 byte
    pub bump: u8,
}

impl ProgramRegistry {
    /// ## Calculation:
    /// - 8 bytes: Anchor discriminator
    /// - 32 bytes: admin
    /// - 32 bytes: signer
    /// - 1 byte: signer_bump
    /// - 2 bytes: vault_count
    /// - 1 byte: bump
    ///
    /// Total: 8 + 32 + 32 + 1 + 2 + 1 = 76 bytes
    pub const LEN: usize = 8 + 32 + 32 + 1 + 2 + 1;

    pub const SEED_PREFIX: &'static [u8] = b"program_state";

    /// Seed for the delegated signer PDA.
    pub const SIGNER_SEED: &'static [u8] = b"program_signer";

    pub fn is_initialized(&self) -> bool {
        self.admin != Pubkey::default()
    }

    pub fn is_admin(&self, key: &Pubkey) -> bool {
        self.is_initialized() && self.admin == *key
    }

    /// Returns `true` if a vault was registered at `vault_index`.
    pub fn has_vault(&self, vault_index: u16) -> bool {
        vault_index < self.vault_count
    }
}
