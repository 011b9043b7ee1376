//! # Initialize Program Registry Instruction
//!
//! Creates the global registry right after deployment. Only the wallet
//! pinned in `ids::admin` may sign it; that wallet becomes the administrator
//! and the delegated signer PDA is derived and recorded.
//!
//! ## Deployment Sequence:
//!
//! 1. Deploy the program
//! 2. Call `init_program_registry`
//! 3. Call `register_vault` once per supported mint
//! 4. Users can now `init_user`, `init_position` and `deposit`

use anchor_lang::prelude::*;

use crate::controller;
use crate::events::ProgramRegistryInitialized;
use crate::state::ProgramRegistry;

/// # init_program_registry
///
/// ## Errors
///
/// * `ArrayError::Unauthorized` - Signer is not the pinned admin wallet
/// * `ArrayError::AlreadyInitialized` - The registry already has an admin
pub fn init_program_registry(ctx: Context<InitProgramRegistry>) -> Result<()> {
    controller::ensure_initial_admin(&ctx.accounts.admin.key())?;

    let registry = &mut ctx.accounts.program_registry;
    controller::ensure_uninitialized(registry.is_initialized())?;

    registry.admin = ctx.accounts.admin.key();
    registry.signer = ctx.accounts.program_signer.key();
    registry.signer_bump = ctx.bumps.program_signer;
    registry.vault_count = 0;
    registry.bump = ctx.bumps.program_registry;

    emit!(ProgramRegistryInitialized {
        admin: registry.admin,
        signer: registry.signer,
        timestamp: Clock::get()?.unix_timestamp,
    });

    msg!(
        "Program registry initialized. Admin: {}, signer: {}",
        registry.admin,
        registry.signer
    );

    Ok(())
}

#[derive(Accounts)]
pub struct InitProgramRegistry<'info> {
    #[account(mut)]
    pub admin: Signer<'info>,

    /// `init_if_needed` so a second call reaches the handler and fails with
    /// `AlreadyInitialized` instead of a system program error.
    #[account(
        init_if_needed,
        seeds = [ProgramRegistry::SEED_PREFIX],
        bump,
        payer = admin,
        space = ProgramRegistry::LEN
    )]
    pub program_registry: Account<'info, ProgramRegistry>,

    /// CHECK: Keyless PDA, only its address and bump are recorded.
    #[account(seeds = [ProgramRegistry::SIGNER_SEED], bump)]
    pub program_signer: UncheckedAccount<'info>,

    pub system_program: Program<'info, System>,
}
