//! # Supported Token Vault Account
//!
//! One pooled vault per supported token type. All users' deposits of that
//! mint sit in a single custody token account owned by the delegated signer.
//!
//! ```text
//! SupportedTokenVault (["token_vault", idx])
//! ├── balance           tokens held in `custody` right now
//! ├── deployed_balance  principal bridged out to Drift
//! └── custody           ["token_vault_account", idx], authority = program_signer
//! ```

use anchor_lang::prelude::*;

#[account]
#[derive(Default, Debug)]
pub struct SupportedTokenVault {
    /// The SPL mint this vault accepts.
    ///
    /// Size: 32 bytes
    pub mint: Pubkey,

    /// Index assigned at registration. Also the integer seed of this record.
    ///
    /// Size: 2 bytes
    pub vault_index: u16,

    /// Tokens custodied locally. Always equals the custody account's token
    /// amount once an instruction completes.
    ///
    /// Size: 8 bytes
    pub balance: u64,

    /// Principal currently deployed to the external margin program on
    /// behalf of this vault's positions.
    ///
    /// Size: 8 bytes
    pub deployed_balance: u64,

    /// The custody token account address.
    ///
    /// Size: 32 bytes
    pub custody: Pubkey,

    /// Size: 1 byte
    pub bump: u8,

    /// Size: 1 byte
    pub custody_bump: u8,
}

impl SupportedTokenVault {
    /// Total: 8 + 32 + 2 + 8 + 8 + 32 + 1 + 1 = 92 bytes
    pub const LEN: usize = 8 + 32 + 2 + 8 + 8 + 32 + 1 + 1;

    pub const SEED_PREFIX: &'static [u8] = b"token_vault";

    /// Seed for the vault's custody token account.
    pub const CUSTODY_SEED_PREFIX: &'static [u8] = b"token_vault_account";
}
