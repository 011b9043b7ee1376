//! # Initialize External Account Instructions
//!
//! One-time Drift setup for a user. Drift keys every record by an
//! "authority"; the program uses the user's `User` record address for it and
//! signs with `["user", wallet, bump]`:
//!
//! ```text
//! User PDA ──authority──► Drift UserStats  ["user_stats", User PDA]
//!          └─authority──► Drift User       ["user", User PDA, sub_account_id]
//! ```
//!
//! Either the user or the registry admin (operating on the user's behalf)
//! may call these; the caller pays rent for the Drift records.

use anchor_lang::prelude::*;

use crate::bridge::{self, Drift, MarginProtocol};
use crate::controller;
use crate::events::ExternalAccountInitialized;
use crate::ids;
use crate::state::{ProgramRegistry, User};

/// # init_external_account
///
/// Creates the Drift `UserStats` record for the user.
///
/// ## Errors
///
/// * `ArrayError::Unauthorized` - Caller is neither the user nor the admin
/// * `ArrayError::AddressMismatch` - A Drift account is not the derived one
/// * `ArrayError::ExternalCallFailed` - Drift rejected the call
pub fn init_external_account(ctx: Context<InitExternalAccount>) -> Result<()> {
    let accounts = &ctx.accounts;
    controller::ensure_operator(&accounts.program_registry, &accounts.user, &accounts.operator.key())?;

    let authority = accounts.user.key();
    bridge::expect_address("drift_state", &accounts.drift_state.key(), &Drift.state_address())?;
    bridge::expect_address(
        "drift_user_stats",
        &accounts.drift_user_stats.key(),
        &Drift.user_stats_address(&authority),
    )?;

    let ix = Drift.init_user_stats_ix(&authority, &accounts.operator.key());

    let wallet = accounts.user.authority;
    let seeds = &[User::SEED_PREFIX, wallet.as_ref(), &[accounts.user.bump]];
    bridge::invoke_external(
        &ix,
        &[
            accounts.drift_user_stats.to_account_info(),
            accounts.drift_state.to_account_info(),
            accounts.user.to_account_info(),
            accounts.operator.to_account_info(),
            accounts.rent.to_account_info(),
            accounts.system_program.to_account_info(),
            accounts.drift_program.to_account_info(),
        ],
        &[&seeds[..]],
    )?;

    emit!(ExternalAccountInitialized {
        user: authority,
        external_account: accounts.drift_user_stats.key(),
        sub_account_id: None,
        timestamp: Clock::get()?.unix_timestamp,
    });

    msg!("Drift user stats created for {}", authority);

    Ok(())
}

/// # init_external_sub_account
///
/// Creates a Drift sub-account. Ids must be created in order starting at 0;
/// bridging always goes through sub-account 0.
///
/// ## Errors
///
/// * `ArrayError::AddressMismatch` - `sub_account_id` is not the next id, or
///   a Drift account is not the derived one
/// * `ArrayError::ExternalCallFailed` - Drift rejected the call
pub fn init_external_sub_account(
    ctx: Context<InitExternalSubAccount>,
    sub_account_id: u16,
) -> Result<()> {
    let accounts = &ctx.accounts;
    controller::ensure_operator(&accounts.program_registry, &accounts.user, &accounts.operator.key())?;
    let next_count = controller::next_sub_account(&accounts.user, sub_account_id)?;

    let authority = accounts.user.key();
    bridge::expect_address("drift_state", &accounts.drift_state.key(), &Drift.state_address())?;
    bridge::expect_address(
        "drift_user_stats",
        &accounts.drift_user_stats.key(),
        &Drift.user_stats_address(&authority),
    )?;
    bridge::expect_address(
        "drift_user",
        &accounts.drift_user.key(),
        &Drift.sub_account_address(&authority, sub_account_id),
    )?;

    let ix = Drift.init_sub_account_ix(&authority, &accounts.operator.key(), sub_account_id);

    let wallet = accounts.user.authority;
    let seeds = &[User::SEED_PREFIX, wallet.as_ref(), &[accounts.user.bump]];
    bridge::invoke_external(
        &ix,
        &[
            accounts.drift_user.to_account_info(),
            accounts.drift_user_stats.to_account_info(),
            accounts.drift_state.to_account_info(),
            accounts.user.to_account_info(),
            accounts.operator.to_account_info(),
            accounts.rent.to_account_info(),
            accounts.system_program.to_account_info(),
            accounts.drift_program.to_account_info(),
        ],
        &[&seeds[..]],
    )?;

    let drift_user = accounts.drift_user.key();
    ctx.accounts.user.external_sub_accounts = next_count;

    emit!(ExternalAccountInitialized {
        user: authority,
        external_account: drift_user,
        sub_account_id: Some(sub_account_id),
        timestamp: Clock::get()?.unix_timestamp,
    });

    msg!(
        "Drift sub-account {} created for {}",
        sub_account_id,
        authority
    );

    Ok(())
}

#[derive(Accounts)]
pub struct InitExternalAccount<'info> {
    /// The user's wallet or the registry admin. Pays Drift rent.
    #[account(mut)]
    pub operator: Signer<'info>,

    #[account(
        seeds = [ProgramRegistry::SEED_PREFIX],
        bump = program_registry.bump
    )]
    pub program_registry: Account<'info, ProgramRegistry>,

    #[account(
        seeds = [User::SEED_PREFIX, user.authority.as_ref()],
        bump = user.bump
    )]
    pub user: Account<'info, User>,

    /// CHECK: Created by Drift; address checked in the handler.
    #[account(mut)]
    pub drift_user_stats: UncheckedAccount<'info>,

    /// CHECK: Drift global state; address checked in the handler.
    #[account(mut)]
    pub drift_state: UncheckedAccount<'info>,

    /// CHECK: Program id pinned by address.
    #[account(address = ids::drift::ID)]
    pub drift_program: UncheckedAccount<'info>,

    pub rent: Sysvar<'info, Rent>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct InitExternalSubAccount<'info> {
    #[account(mut)]
    pub operator: Signer<'info>,

    #[account(
        seeds = [ProgramRegistry::SEED_PREFIX],
        bump = program_registry.bump
    )]
    pub program_registry: Account<'info, ProgramRegistry>,

    #[account(
        mut,
        seeds = [User::SEED_PREFIX, user.authority.as_ref()],
        bump = user.bump
    )]
    pub user: Account<'info, User>,

    /// CHECK: Created by Drift; address checked in the handler.
    #[account(mut)]
    pub drift_user: UncheckedAccount<'info>,

    /// CHECK: Drift stats record; address checked in the handler.
    #[account(mut)]
    pub drift_user_stats: UncheckedAccount<'info>,

    /// CHECK: Drift global state; address checked in the handler.
    #[account(mut)]
    pub drift_state: UncheckedAccount<'info>,

    /// CHECK: Program id pinned by address.
    #[account(address = ids::drift::ID)]
    pub drift_program: UncheckedAccount<'info>,

    pub rent: Sysvar<'info, Rent>,
    pub system_program: Program<'info, System>,
}
