//! # Events Module
//!
//! Structured logs emitted by every state-changing instruction. Indexers
//! replay these to rebuild per-user balances without reading accounts.
//!
//! ```text
//! deposit / withdraw          → DepositEvent / WithdrawEvent
//! bridge_deposit              → BridgeDepositEvent
//! bridge_withdraw             → BridgeWithdrawEvent (carries realized yield)
//! ```

use anchor_lang::prelude::*;

/// Emitted once, when the administrator creates the program registry.
#[event]
pub struct ProgramRegistryInitialized {
    pub admin: Pubkey,
    /// The delegated signer PDA that owns every vault custody account
    pub signer: Pubkey,
    pub timestamp: i64,
}

/// Emitted when a new token type becomes depositable.
#[event]
pub struct VaultRegistered {
    pub vault: Pubkey,
    pub mint: Pubkey,
    pub vault_index: u16,
    /// Token account holding the pooled funds
    pub custody: Pubkey,
    pub timestamp: i64,
}

#[event]
pub struct UserInitialized {
    pub authority: Pubkey,
    pub user: Pubkey,
    pub timestamp: i64,
}

#[event]
pub struct PositionInitialized {
    pub user: Pubkey,
    pub position: Pubkey,
    pub vault_index: u16,
    pub custody: Pubkey,
    pub timestamp: i64,
}

/// # DepositEvent
///
/// ## Fields:
/// - `position_balance`: the position's `deposited_amount` after the deposit
/// - `vault_balance`: the vault's locally custodied balance after the deposit
#[event]
pub struct DepositEvent {
    pub authority: Pubkey,
    pub vault_index: u16,
    pub amount: u64,
    pub position_balance: u64,
    pub vault_balance: u64,
    pub timestamp: i64,
}

#[event]
pub struct WithdrawEvent {
    pub authority: Pubkey,
    pub vault_index: u16,
    pub amount: u64,
    pub position_balance: u64,
    pub vault_balance: u64,
    pub timestamp: i64,
}

/// Emitted when a user's Drift stats record or a sub-account is created
/// through the program. `sub_account_id` is `None` for the stats record.
#[event]
pub struct ExternalAccountInitialized {
    pub user: Pubkey,
    pub external_account: Pubkey,
    pub sub_account_id: Option<u16>,
    pub timestamp: i64,
}

/// # BridgeDepositEvent
///
/// Funds moved from the pooled vault into the user's Drift sub-account.
#[event]
pub struct BridgeDepositEvent {
    pub user: Pubkey,
    pub vault_index: u16,
    pub market_index: u16,
    pub amount: u64,
    /// Position principal currently deployed after this call
    pub deployed_amount: u64,
    pub timestamp: i64,
}

/// # BridgeWithdrawEvent
///
/// Funds returned from Drift into the pooled vault.
///
/// `realized_yield` is the part of `amount` that exceeded the deployed
/// principal and was credited to the position.
#[event]
pub struct BridgeWithdrawEvent {
    pub user: Pubkey,
    pub vault_index: u16,
    pub market_index: u16,
    pub amount: u64,
    pub principal: u64,
    pub realized_yield: u64,
    pub deployed_amount: u64,
    pub timestamp: i64,
}
