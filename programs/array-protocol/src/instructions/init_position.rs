//! # Initialize Position Instruction
//!
//! Opens the caller's ledger entry for one vault, together with the custody
//! sub-account that stages the position's tokens for Drift.
//!
//! ```text
//! UserPosition  ["user_vault", user, idx]
//! custody       ["user_vault_account", user, idx]   authority = User PDA
//! ```
//!
//! The vault and user are taken as unchecked accounts so an unregistered
//! index is reported as `VaultNotFound`, and a wallet without a `User`
//! record as `PositionNotFound`, rather than as deserialization failures.

use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, Token, TokenAccount};

use crate::controller;
use crate::errors::ArrayError;
use crate::events::PositionInitialized;
use crate::state::{self, ProgramRegistry, SupportedTokenVault, User, UserPosition};

/// # init_position
///
/// ## Arguments
///
/// * `vault_index` - Index of a registered vault
///
/// ## Errors
///
/// * `ArrayError::VaultNotFound` - No vault is registered at `vault_index`
/// * `ArrayError::PositionNotFound` - The caller has no `User` record
/// * `ArrayError::Unauthorized` - The `User` record belongs to another wallet
/// * `ArrayError::AddressMismatch` - `mint` is not the vault's mint
/// * `ArrayError::AlreadyInitialized` - The position already exists
pub fn init_position(ctx: Context<InitPosition>, vault_index: u16) -> Result<()> {
    controller::ensure_vault_registered(&ctx.accounts.program_registry, vault_index)?;

    let vault: SupportedTokenVault = state::load(&ctx.accounts.vault, ArrayError::VaultNotFound)?;
    let user: User = state::load(&ctx.accounts.user, ArrayError::PositionNotFound)?;
    controller::ensure_owner(&user, &ctx.accounts.authority.key())?;
    require_keys_eq!(
        ctx.accounts.mint.key(),
        vault.mint,
        ArrayError::AddressMismatch
    );

    let position = &mut ctx.accounts.position;
    controller::ensure_uninitialized(position.is_initialized())?;

    position.user = ctx.accounts.user.key();
    position.vault_index = vault_index;
    position.deposited_amount = 0;
    position.deployed_amount = 0;
    position.external_market = None;
    position.custody = ctx.accounts.custody.key();
    position.bump = ctx.bumps.position;

    emit!(PositionInitialized {
        user: position.user,
        position: position.key(),
        vault_index,
        custody: position.custody,
        timestamp: Clock::get()?.unix_timestamp,
    });

    msg!(
        "Position opened on vault {} for user {}",
        vault_index,
        position.user
    );

    Ok(())
}

#[derive(Accounts)]
#[instruction(vault_index: u16)]
pub struct InitPosition<'info> {
    #[account(mut)]
    pub authority: Signer<'info>,

    #[account(
        seeds = [ProgramRegistry::SEED_PREFIX],
        bump = program_registry.bump
    )]
    pub program_registry: Account<'info, ProgramRegistry>,

    /// CHECK: `User` record, loaded in the handler. Also the custody
    /// token authority.
    #[account(seeds = [User::SEED_PREFIX, authority.key().as_ref()], bump)]
    pub user: UncheckedAccount<'info>,

    /// CHECK: Deserialized in the handler after the index is validated.
    #[account(
        seeds = [SupportedTokenVault::SEED_PREFIX, &vault_index.to_le_bytes()],
        bump
    )]
    pub vault: UncheckedAccount<'info>,

    pub mint: Account<'info, Mint>,

    #[account(
        init_if_needed,
        seeds = [
            UserPosition::SEED_PREFIX,
            user.key().as_ref(),
            &vault_index.to_le_bytes()
        ],
        bump,
        payer = authority,
        space = UserPosition::LEN
    )]
    pub position: Account<'info, UserPosition>,

    #[account(
        init_if_needed,
        seeds = [
            UserPosition::CUSTODY_SEED_PREFIX,
            user.key().as_ref(),
            &vault_index.to_le_bytes()
        ],
        bump,
        payer = authority,
        token::mint = mint,
        token::authority = user
    )]
    pub custody: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}
