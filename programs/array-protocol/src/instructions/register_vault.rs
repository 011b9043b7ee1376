//! # Register Vault Instruction
//!
//! Adds a supported token type. The new vault takes the next index and gets
//! a custody token account owned by the delegated signer.
//!
//! ```text
//! ProgramRegistry { vault_count: 2 }
//!        │ register_vault(mint)
//!        ▼
//! SupportedTokenVault ["token_vault", 2]
//! custody token acct  ["token_vault_account", 2]  authority = program_signer
//! MintRegistration    ["vault_mint", mint]        vault_index = 2
//! ProgramRegistry { vault_count: 3 }
//! ```
//!
//! The mint marker makes a second registration of the same mint fail with
//! `AlreadyInitialized`.

use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, Token, TokenAccount};

use crate::controller;
use crate::errors::ArrayError;
use crate::events::VaultRegistered;
use crate::state::{MintRegistration, ProgramRegistry, SupportedTokenVault};

/// # register_vault
///
/// ## Errors
///
/// * `ArrayError::Unauthorized` - Signer is not the registry admin
/// * `ArrayError::AlreadyInitialized` - The mint already backs a vault
/// * `ArrayError::ArithmeticOverflow` - The vault count is exhausted
pub fn register_vault(ctx: Context<RegisterVault>) -> Result<()> {
    controller::ensure_uninitialized(ctx.accounts.mint_registration.is_initialized())?;
    let vault_index = controller::assign_vault_index(&mut ctx.accounts.program_registry)?;

    let registration = &mut ctx.accounts.mint_registration;
    registration.mint = ctx.accounts.mint.key();
    registration.vault_index = vault_index;
    registration.bump = ctx.bumps.mint_registration;

    let vault = &mut ctx.accounts.vault;
    vault.mint = ctx.accounts.mint.key();
    vault.vault_index = vault_index;
    vault.balance = 0;
    vault.deployed_balance = 0;
    vault.custody = ctx.accounts.custody.key();
    vault.bump = ctx.bumps.vault;
    vault.custody_bump = ctx.bumps.custody;

    emit!(VaultRegistered {
        vault: vault.key(),
        mint: vault.mint,
        vault_index,
        custody: vault.custody,
        timestamp: Clock::get()?.unix_timestamp,
    });

    msg!("Registered vault {} for mint {}", vault_index, vault.mint);

    Ok(())
}

#[derive(Accounts)]
pub struct RegisterVault<'info> {
    #[account(mut)]
    pub admin: Signer<'info>,

    #[account(
        mut,
        seeds = [ProgramRegistry::SEED_PREFIX],
        bump = program_registry.bump,
        constraint = program_registry.is_admin(&admin.key()) @ ArrayError::Unauthorized
    )]
    pub program_registry: Account<'info, ProgramRegistry>,

    /// CHECK: Delegated signer PDA, becomes the custody token authority.
    #[account(
        seeds = [ProgramRegistry::SIGNER_SEED],
        bump = program_registry.signer_bump
    )]
    pub program_signer: UncheckedAccount<'info>,

    pub mint: Account<'info, Mint>,

    /// `init_if_needed` so a repeated mint reaches the handler and fails
    /// with `AlreadyInitialized`.
    #[account(
        init_if_needed,
        seeds = [MintRegistration::SEED_PREFIX, mint.key().as_ref()],
        bump,
        payer = admin,
        space = MintRegistration::LEN
    )]
    pub mint_registration: Account<'info, MintRegistration>,

    #[account(
        init,
        seeds = [
            SupportedTokenVault::SEED_PREFIX,
            &program_registry.vault_count.to_le_bytes()
        ],
        bump,
        payer = admin,
        space = SupportedTokenVault::LEN
    )]
    pub vault: Account<'info, SupportedTokenVault>,

    #[account(
        init,
        seeds = [
            SupportedTokenVault::CUSTODY_SEED_PREFIX,
            &program_registry.vault_count.to_le_bytes()
        ],
        bump,
        payer = admin,
        token::mint = mint,
        token::authority = program_signer
    )]
    pub custody: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}
