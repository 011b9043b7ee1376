//! # Deposit Instruction
//!
//! Moves tokens from the caller's wallet into the vault's pooled custody
//! account and credits the caller's position.
//!
//! ## What Happens During a Deposit:
//!
//! ```text
//! BEFORE:                              AFTER:
//!
//! User Wallet                          User Wallet
//! └── tokens: 2_000_000                └── tokens: 0
//!
//! SupportedTokenVault                  SupportedTokenVault
//! └── balance: 300                     └── balance: 2_000_300
//!
//! UserPosition                         UserPosition
//! └── deposited_amount: 0              └── deposited_amount: 2_000_000
//! ```
//!
//! Both new balances are computed before the transfer, so an overflow
//! aborts without moving tokens.
//!
//! The vault, user and position are loaded by the handler so a missing
//! record is reported as `VaultNotFound` or `PositionNotFound`.

use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount};

use crate::bridge::expect_address;
use crate::controller;
use crate::custody::transfer_tokens;
use crate::errors::ArrayError;
use crate::events::DepositEvent;
use crate::state::{self, SupportedTokenVault, User, UserPosition};

/// # deposit
///
/// ## Arguments
///
/// * `vault_index` - Vault to deposit into
/// * `amount` - Token amount in the mint's smallest unit
///
/// ## Errors
///
/// * `ArrayError::InvalidAmount` - Amount is zero
/// * `ArrayError::VaultNotFound` - No vault at `vault_index`
/// * `ArrayError::PositionNotFound` - Caller has no user record or no
///   position on the vault
/// * `ArrayError::Unauthorized` - `source` belongs to another wallet
/// * `ArrayError::AddressMismatch` - `source` holds another mint, or
///   `vault_custody` is not the vault's custody account
/// * `ArrayError::ArithmeticOverflow` - A balance would overflow
/// * `ArrayError::ExternalCallFailed` - The token transfer failed (e.g. the
///   wallet holds less than `amount`)
pub fn deposit(ctx: Context<Deposit>, vault_index: u16, amount: u64) -> Result<()> {
    let accounts = &ctx.accounts;
    let authority = accounts.authority.key();

    // ===================================
    // STEP 1: Load records and stage balances
    // ===================================

    let mut vault: SupportedTokenVault = state::load(&accounts.vault, ArrayError::VaultNotFound)?;
    let user: User = state::load(&accounts.user, ArrayError::PositionNotFound)?;
    controller::ensure_owner(&user, &authority)?;
    let mut position: UserPosition =
        state::load(&accounts.position, ArrayError::PositionNotFound)?;
    controller::ensure_position_of(&position, &accounts.user.key(), vault_index)?;

    controller::check_wallet_account(
        &accounts.source.mint,
        &accounts.source.owner,
        &vault.mint,
        &authority,
    )?;
    expect_address("vault_custody", &accounts.vault_custody.key(), &vault.custody)?;

    let update = controller::stage_deposit(&vault, &position, amount)?;

    // ===================================
    // STEP 2: Wallet → vault custody (user signs)
    // ===================================

    transfer_tokens(
        accounts.token_program.to_account_info(),
        accounts.source.to_account_info(),
        accounts.vault_custody.to_account_info(),
        accounts.authority.to_account_info(),
        &[],
        amount,
    )?;

    // ===================================
    // STEP 3: Commit
    // ===================================

    update.commit(&mut vault, &mut position);
    state::store(&accounts.vault, &vault)?;
    state::store(&accounts.position, &position)?;

    emit!(DepositEvent {
        authority,
        vault_index,
        amount,
        position_balance: position.deposited_amount,
        vault_balance: vault.balance,
        timestamp: Clock::get()?.unix_timestamp,
    });

    msg!(
        "Deposited {} into vault {}. Position balance: {}",
        amount,
        vault_index,
        position.deposited_amount
    );

    Ok(())
}

#[derive(Accounts)]
#[instruction(vault_index: u16)]
pub struct Deposit<'info> {
    pub authority: Signer<'info>,

    /// CHECK: `User` record, loaded in the handler.
    #[account(seeds = [User::SEED_PREFIX, authority.key().as_ref()], bump)]
    pub user: UncheckedAccount<'info>,

    /// CHECK: `SupportedTokenVault` record, loaded in the handler.
    #[account(
        mut,
        seeds = [SupportedTokenVault::SEED_PREFIX, &vault_index.to_le_bytes()],
        bump
    )]
    pub vault: UncheckedAccount<'info>,

    /// CHECK: `UserPosition` record, loaded in the handler.
    #[account(
        mut,
        seeds = [
            UserPosition::SEED_PREFIX,
            user.key().as_ref(),
            &vault_index.to_le_bytes()
        ],
        bump
    )]
    pub position: UncheckedAccount<'info>,

    /// Caller's token account for the vault mint. Mint and owner are
    /// checked in the handler.
    #[account(mut)]
    pub source: Account<'info, TokenAccount>,

    /// Checked against `vault.custody` in the handler.
    #[account(mut)]
    pub vault_custody: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
}
