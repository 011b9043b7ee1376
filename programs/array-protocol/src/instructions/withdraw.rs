//! # Withdraw Instruction
//!
//! Pays tokens out of the vault's pooled custody back to the caller. Only the
//! position's local balance is withdrawable; funds deployed to Drift have to
//! be bridged back first.
//!
//! ## PDA Signing:
//!
//! The custody account's token authority is the delegated signer
//! `["program_signer"]`, so the program signs the transfer with its seeds.

use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount};

use crate::bridge::expect_address;
use crate::controller;
use crate::custody::transfer_tokens;
use crate::errors::ArrayError;
use crate::events::WithdrawEvent;
use crate::state::{self, ProgramRegistry, SupportedTokenVault, User, UserPosition};

/// # withdraw
///
/// ## Errors
///
/// * `ArrayError::InvalidAmount` - Amount is zero
/// * `ArrayError::VaultNotFound` - No vault at `vault_index`
/// * `ArrayError::PositionNotFound` - Caller has no position on the vault
/// * `ArrayError::Unauthorized` - `destination` belongs to another wallet
/// * `ArrayError::AddressMismatch` - `destination` holds another mint
/// * `ArrayError::InsufficientBalance` - Amount exceeds the position's
///   local balance
/// * `ArrayError::ExternalCallFailed` - The token transfer failed
pub fn withdraw(ctx: Context<Withdraw>, vault_index: u16, amount: u64) -> Result<()> {
    let accounts = &ctx.accounts;
    let authority = accounts.authority.key();

    let mut vault: SupportedTokenVault = state::load(&accounts.vault, ArrayError::VaultNotFound)?;
    let user: User = state::load(&accounts.user, ArrayError::PositionNotFound)?;
    controller::ensure_owner(&user, &authority)?;
    let mut position: UserPosition =
        state::load(&accounts.position, ArrayError::PositionNotFound)?;
    controller::ensure_position_of(&position, &accounts.user.key(), vault_index)?;

    controller::check_wallet_account(
        &accounts.destination.mint,
        &accounts.destination.owner,
        &vault.mint,
        &authority,
    )?;
    expect_address("vault_custody", &accounts.vault_custody.key(), &vault.custody)?;

    let update = controller::stage_withdraw(&vault, &position, amount)?;

    let signer_bump = accounts.program_registry.signer_bump;
    let seeds = &[ProgramRegistry::SIGNER_SEED, &[signer_bump]];
    let signer_seeds = &[&seeds[..]];

    transfer_tokens(
        accounts.token_program.to_account_info(),
        accounts.vault_custody.to_account_info(),
        accounts.destination.to_account_info(),
        accounts.program_signer.to_account_info(),
        signer_seeds,
        amount,
    )?;

    update.commit(&mut vault, &mut position);
    state::store(&accounts.vault, &vault)?;
    state::store(&accounts.position, &position)?;

    emit!(WithdrawEvent {
        authority,
        vault_index,
        amount,
        position_balance: position.deposited_amount,
        vault_balance: vault.balance,
        timestamp: Clock::get()?.unix_timestamp,
    });

    msg!(
        "Withdrew {} from vault {}. Position balance: {}",
        amount,
        vault_index,
        position.deposited_amount
    );

    Ok(())
}

#[derive(Accounts)]
#[instruction(vault_index: u16)]
pub struct Withdraw<'info> {
    pub authority: Signer<'info>,

    #[account(
        seeds = [ProgramRegistry::SEED_PREFIX],
        bump = program_registry.bump
    )]
    pub program_registry: Account<'info, ProgramRegistry>,

    /// CHECK: Delegated signer PDA; signs for the vault custody account.
    #[account(
        seeds = [ProgramRegistry::SIGNER_SEED],
        bump = program_registry.signer_bump
    )]
    pub program_signer: UncheckedAccount<'info>,

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

    /// Caller's token account receiving the withdrawal. Mint and owner are
    /// checked in the handler.
    #[account(mut)]
    pub destination: Account<'info, TokenAccount>,

    /// Checked against `vault.custody` in the handler.
    #[account(mut)]
    pub vault_custody: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
}
