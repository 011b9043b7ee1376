//! # User Account
//!
//! One record per end user, keyed by wallet. Besides identifying the user,
//! the record's own address is the authority the program presents to Drift:
//! Drift sub-accounts are derived from it, and the program signs for it with
//! `["user", authority, bump]`.

use anchor_lang::prelude::*;

#[account]
#[derive(Default)]
pub struct User {
    /// The wallet controlling this record. Never changes.
    ///
    /// Size: 32 bytes
    pub authority: Pubkey,

    /// Number of Drift sub-accounts created through the program. Drift
    /// requires sub-account ids to be created in order, so this is also
    /// the next id to create.
    ///
    /// Size: 2 bytes
    pub external_sub_accounts: u16,

    /// Size: 1 byte
    pub bump: u8,
}

impl User {
    /// Total: 8 + 32 + 2 + 1 = 43 bytes
    pub const LEN: usize = 8 + 32 + 2 + 1;

    pub const SEED_PREFIX: &'static [u8] = b"user";

    /// Sub-account used for every bridge transfer.
    pub const PRIMARY_SUB_ACCOUNT: u16 = 0;

    pub fn is_initialized(&self) -> bool {
        self.authority != Pubkey::default()
    }

    pub fn has_primary_sub_account(&self) -> bool {
        self.external_sub_accounts > Self::PRIMARY_SUB_ACCOUNT
    }
}
