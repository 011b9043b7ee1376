// Suppress warnings from Anchor/Solana version mismatches
#![allow(unexpected_cfgs)]
#![allow(ambiguous_glob_reexports)]

//! # Array Protocol
//!
//! A multi-tenant custody ledger. Users deposit supported tokens into pooled,
//! program-owned vaults; the program tracks each user's share with exact
//! integer bookkeeping and can deploy a user's share into Drift on their
//! behalf.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      ARRAY PROTOCOL PROGRAM                      │
//! │                                                                  │
//! │  ProgramRegistry ── admin, program_signer, vault_count           │
//! │                                                                  │
//! │  ┌────────────────┐  ┌────────────────┐                          │
//! │  │ Vault 0 (USDC) │  │ Vault 1 (SOL)  │  ...  custody owned by    │
//! │  │  balance       │  │  balance       │       program_signer      │
//! │  └────────────────┘  └────────────────┘                          │
//! │                                                                  │
//! │  User (per wallet) ──► UserPosition (per user × vault)           │
//! │      │                    deposited_amount / deployed_amount     │
//! │      │ acts on behalf of                                          │
//! └──────┼──────────────────────────────────────────────────────────┘
//!        │ CPI (User PDA signs)
//!        ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │          DRIFT   UserStats ["user_stats", User PDA]              │
//! │                  User      ["user", User PDA, 0]                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Model
//!
//! 1. **Keyless custody**: vault custody belongs to `["program_signer"]`,
//!    position custody to the user's `User` PDA. Only the program signs.
//! 2. **Staged ledger updates**: balances are computed and checked before any
//!    transfer and written only after every transfer and Drift call succeeded.
//! 3. **Derived addresses only**: every Drift account is checked against its
//!    derivation before the program signs for a call.
//!
//! ## Example Usage
//!
//! ```typescript
//! await program.methods.initUser().rpc();
//! await program.methods.initPosition(0).rpc();
//! await program.methods.deposit(0, new BN(2_000_000)).rpc();
//! await program.methods.withdraw(0, new BN(500_000)).rpc();
//! ```

use anchor_lang::prelude::*;

pub mod bridge;
pub mod controller;
pub mod custody;
pub mod errors;
pub mod events;
pub mod ids;
pub mod instructions;
pub mod state;

pub use errors::*;
pub use events::*;
pub use instructions::*;
pub use state::*;

declare_id!("5jNZph2CQjoQcaru3fjkDvXDmMGpnrNAG8CmTyaTdnm9");

// Typed Drift bindings generated from `idls/drift.json`.
declare_program!(drift);

#[program]
pub mod array_protocol {
    use super::*;

    // ========================================
    // REGISTRY
    // ========================================

    /// Create the global registry. Only the pinned admin wallet
    /// (`ids::admin`) may call it; it becomes the registry administrator.
    ///
    /// ## Accounts Required:
    /// - `admin`: signer, payer, must be `ids::admin::ID`
    /// - `program_registry`: `["program_state"]`
    /// - `program_signer`: `["program_signer"]`
    pub fn init_program_registry(ctx: Context<InitProgramRegistry>) -> Result<()> {
        instructions::init_program_registry(ctx)
    }

    /// Register a supported mint as the next vault index. Admin only.
    ///
    /// ## Accounts Required:
    /// - `admin`: signer, payer, must match the registry admin
    /// - `mint_registration`: `["vault_mint", mint]`, rejects a mint that
    ///   already has a vault
    /// - `vault`: `["token_vault", vault_count]`
    /// - `custody`: `["token_vault_account", vault_count]`
    pub fn register_vault(ctx: Context<RegisterVault>) -> Result<()> {
        instructions::register_vault(ctx)
    }

    // ========================================
    // USERS & POSITIONS
    // ========================================

    pub fn init_user(ctx: Context<InitUser>) -> Result<()> {
        instructions::init_user(ctx)
    }

    /// Open the caller's position on `vault_index`.
    ///
    /// ## Arguments:
    /// - `vault_index`: a registered vault
    pub fn init_position(ctx: Context<InitPosition>, vault_index: u16) -> Result<()> {
        instructions::init_position(ctx, vault_index)
    }

    /// Deposit `amount` of the vault's mint from the caller's wallet.
    pub fn deposit(ctx: Context<Deposit>, vault_index: u16, amount: u64) -> Result<()> {
        instructions::deposit(ctx, vault_index, amount)
    }

    /// Withdraw `amount` of the position's local balance to the caller.
    pub fn withdraw(ctx: Context<Withdraw>, vault_index: u16, amount: u64) -> Result<()> {
        instructions::withdraw(ctx, vault_index, amount)
    }

    // ========================================
    // DRIFT BRIDGE
    // ========================================

    /// Create the Drift stats record for the user's `User` PDA.
    pub fn init_external_account(ctx: Context<InitExternalAccount>) -> Result<()> {
        instructions::init_external_account(ctx)
    }

    /// Create Drift sub-account `sub_account_id` (must be the next id).
    pub fn init_external_sub_account(
        ctx: Context<InitExternalSubAccount>,
        sub_account_id: u16,
    ) -> Result<()> {
        instructions::init_external_sub_account(ctx, sub_account_id)
    }

    /// Deploy `amount` from the position's local balance into Drift spot
    /// market `market_index`.
    ///
    /// ## Remaining Accounts:
    /// Oracles (read-only) then spot markets (writable) for the market, as
    /// Drift expects them.
    pub fn bridge_deposit<'info>(
        ctx: Context<'_, '_, '_, 'info, BridgeDeposit<'info>>,
        vault_index: u16,
        market_index: u16,
        amount: u64,
    ) -> Result<()> {
        instructions::bridge_deposit(ctx, vault_index, market_index, amount)
    }

    /// Return `amount` from Drift spot market `market_index` into the vault.
    ///
    /// ## Remaining Accounts:
    /// Same list as `bridge_deposit`. The spot market for `market_index`
    /// must be among them; its interest index prices the sub-account.
    pub fn bridge_withdraw<'info>(
        ctx: Context<'_, '_, '_, 'info, BridgeWithdraw<'info>>,
        vault_index: u16,
        market_index: u16,
        amount: u64,
    ) -> Result<()> {
        instructions::bridge_withdraw(ctx, vault_index, market_index, amount)
    }
}
