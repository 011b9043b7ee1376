//! # Initialize User Instruction
//!
//! Self-service: creates the caller's `User` record. One per wallet.

use anchor_lang::prelude::*;

use crate::controller;
use crate::events::UserInitialized;
use crate::state::User;

pub fn init_user(ctx: Context<InitUser>) -> Result<()> {
    let user = &mut ctx.accounts.user;
    controller::ensure_uninitialized(user.is_initialized())?;

    user.authority = ctx.accounts.authority.key();
    user.external_sub_accounts = 0;
    user.bump = ctx.bumps.user;

    emit!(UserInitialized {
        authority: user.authority,
        user: user.key(),
        timestamp: Clock::get()?.unix_timestamp,
    });

    msg!("User initialized for {}", user.authority);

    Ok(())
}

#[derive(Accounts)]
pub struct InitUser<'info> {
    #[account(mut)]
    pub authority: Signer<'info>,

    #[account(
        init_if_needed,
        seeds = [User::SEED_PREFIX, authority.key().as_ref()],
        bump,
        payer = authority,
        space = User::LEN
    )]
    pub user: Account<'info, User>,

    pub system_program: Program<'info, System>,
}
