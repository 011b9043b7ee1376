//! # User Position Account
//!
//! The ledger record of one user's share of one vault.
//!
//! ## Balance split:
//!
//! ```text
//! deposited_amount = local share + deployed_amount
//!
//! deposited 1_000, deployed 700  →  300 withdrawable locally,
//!                                   700 sitting in Drift
//! ```
//!
//! `deposited_amount` is the logical balance regardless of where the
//! tokens physically sit. Bridging moves funds between the two halves
//! without changing it; only realized Drift yield increases it.

use anchor_lang::prelude::*;

#[account]
#[derive(Default, Debug)]
pub struct UserPosition {
    /// The owning `User` record (not the wallet).
    ///
    /// Size: 32 bytes
    pub user: Pubkey,

    /// Size: 2 bytes
    pub vault_index: u16,

    /// Logical balance owed to the user.
    ///
    /// Size: 8 bytes
    pub deposited_amount: u64,

    /// Portion of `deposited_amount` currently deployed to Drift.
    ///
    /// Size: 8 bytes
    pub deployed_amount: u64,

    /// Custody sub-account (`["user_vault_account", user, idx]`). Owned by
    /// the `User` record so the program can stage Drift transfers through it.
    ///
    /// Size: 32 bytes
    pub custody: Pubkey,

    /// Size: 1 byte
    pub bump: u8,

    /// Drift spot market this position was first bridged into. Later bridge
    /// calls must name the same market.
    ///
    /// Size: 3 bytes (Option<u16>)
    pub external_market: Option<u16>,
}

impl UserPosition {
    /// Total: 8 + 32 + 2 + 8 + 8 + 32 + 1 + 3 = 94 bytes
    pub const LEN: usize = 8 + 32 + 2 + 8 + 8 + 32 + 1 + 3;

    pub const SEED_PREFIX: &'static [u8] = b"user_vault";

    pub const CUSTODY_SEED_PREFIX: &'static [u8] = b"user_vault_account";

    pub fn is_initialized(&self) -> bool {
        self.user != Pubkey::default()
    }

    /// Amount that can leave through `withdraw` or `bridge_deposit`.
    pub fn local_amount(&self) -> u64 {
        self.deposited_amount.saturating_sub(self.deployed_amount)
    }
}
