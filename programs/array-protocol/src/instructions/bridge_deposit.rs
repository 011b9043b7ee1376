//! # Bridge Deposit Instruction
//!
//! Deploys part of a position's local balance into the user's Drift
//! sub-account.
//!
//! ## Flow:
//!
//! ```text
//! vault custody ──(program_signer)──► position custody ──(User PDA)──► Drift spot market vault
//!
//! vault.balance            -= amount
//! vault.deployed_balance   += amount
//! position.deployed_amount += amount      (deposited_amount unchanged)
//! ```
//!
//! The oracle and spot market accounts Drift needs for `market_index` are
//! passed as remaining accounts. The client discovers them; the program
//! forwards them as given.
//!
//! The first bridge deposit binds the position to `market_index`; later
//! bridge calls on the position must use the same market.

use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount};

use crate::bridge::{self, Drift, ExternalKeys, MarginProtocol, TransferAccounts};
use crate::controller;
use crate::custody::transfer_tokens;
use crate::errors::ArrayError;
use crate::events::BridgeDepositEvent;
use crate::ids;
use crate::state::{self, ProgramRegistry, SupportedTokenVault, User, UserPosition};

/// # bridge_deposit
///
/// ## Arguments
///
/// * `vault_index` - Vault the position belongs to
/// * `market_index` - Drift spot market for the vault's mint
/// * `amount` - Tokens to deploy
///
/// ## Errors
///
/// * `ArrayError::InvalidAmount` - Amount is zero
/// * `ArrayError::InsufficientBalance` - Position's local balance is too low
/// * `ArrayError::VaultNotFound` - No vault at `vault_index`
/// * `ArrayError::PositionNotFound` - No user record, no position, or no
///   Drift sub-account yet
/// * `ArrayError::AddressMismatch` - A Drift account is not the derived
///   one, or the position is bound to another market
/// * `ArrayError::ExternalCallFailed` - A transfer or the Drift call failed
pub fn bridge_deposit<'info>(
    ctx: Context<'_, '_, '_, 'info, BridgeDeposit<'info>>,
    vault_index: u16,
    market_index: u16,
    amount: u64,
) -> Result<()> {
    // ===================================
    // STEP 1: Validate caller and stage balances
    // ===================================

    let accounts = &ctx.accounts;
    let authority = accounts.user.key();

    let mut vault: SupportedTokenVault = state::load(&accounts.vault, ArrayError::VaultNotFound)?;
    let user: User = state::load(&accounts.user, ArrayError::PositionNotFound)?;
    controller::ensure_user_address(&authority, &user)?;
    controller::ensure_operator(&accounts.program_registry, &user, &accounts.operator.key())?;
    require!(user.has_primary_sub_account(), ArrayError::PositionNotFound);
    let mut position: UserPosition =
        state::load(&accounts.position, ArrayError::PositionNotFound)?;
    controller::ensure_position_of(&position, &authority, vault_index)?;

    bridge::expect_address("vault_custody", &accounts.vault_custody.key(), &vault.custody)?;
    bridge::expect_address(
        "position_custody",
        &accounts.position_custody.key(),
        &position.custody,
    )?;

    let update = controller::stage_bridge_deposit(&vault, &position, market_index, amount)?;

    bridge::check_external_accounts(
        &Drift,
        &authority,
        User::PRIMARY_SUB_ACCOUNT,
        market_index,
        ExternalKeys {
            state: &accounts.drift_state.key(),
            user_stats: &accounts.drift_user_stats.key(),
            sub_account: &accounts.drift_user.key(),
            market_vault: &accounts.drift_spot_market_vault.key(),
        },
    )?;

    // ===================================
    // STEP 2: Vault custody → position custody
    // ===================================

    let staged_before = accounts.position_custody.amount;
    let signer_bump = accounts.program_registry.signer_bump;
    let program_seeds = &[ProgramRegistry::SIGNER_SEED, &[signer_bump]];
    transfer_tokens(
        accounts.token_program.to_account_info(),
        accounts.vault_custody.to_account_info(),
        accounts.position_custody.to_account_info(),
        accounts.program_signer.to_account_info(),
        &[&program_seeds[..]],
        amount,
    )?;

    // ===================================
    // STEP 3: Position custody → Drift (User PDA signs)
    // ===================================

    let transfer = TransferAccounts {
        state: accounts.drift_state.key(),
        sub_account: accounts.drift_user.key(),
        user_stats: accounts.drift_user_stats.key(),
        authority,
        market_vault: accounts.drift_spot_market_vault.key(),
        token_account: accounts.position_custody.key(),
        token_program: accounts.token_program.key(),
    };
    let ix = Drift.deposit_ix(
        &transfer,
        &bridge::forward_metas(ctx.remaining_accounts),
        market_index,
        amount,
    );

    let mut infos = vec![
        accounts.drift_state.to_account_info(),
        accounts.drift_user.to_account_info(),
        accounts.drift_user_stats.to_account_info(),
        accounts.user.to_account_info(),
        accounts.drift_spot_market_vault.to_account_info(),
        accounts.position_custody.to_account_info(),
        accounts.token_program.to_account_info(),
    ];
    infos.extend(ctx.remaining_accounts.iter().cloned());
    infos.push(accounts.drift_program.to_account_info());

    let user_seeds = &[User::SEED_PREFIX, user.authority.as_ref(), &[user.bump]];
    bridge::invoke_external(&ix, &infos, &[&user_seeds[..]])?;

    // ===================================
    // STEP 4: Verify and commit
    // ===================================

    // Drift must have pulled exactly what was staged.
    ctx.accounts.position_custody.reload()?;
    bridge::verify_delta(
        staged_before,
        ctx.accounts.position_custody.amount,
        0,
        true,
    )?;

    update.commit(&mut vault, &mut position);
    state::store(&ctx.accounts.vault, &vault)?;
    state::store(&ctx.accounts.position, &position)?;

    emit!(BridgeDepositEvent {
        user: authority,
        vault_index,
        market_index,
        amount,
        deployed_amount: position.deployed_amount,
        timestamp: Clock::get()?.unix_timestamp,
    });

    msg!(
        "Bridged {} from vault {} into Drift market {}",
        amount,
        vault_index,
        market_index
    );

    Ok(())
}

#[derive(Accounts)]
#[instruction(vault_index: u16, market_index: u16)]
pub struct BridgeDeposit<'info> {
    /// The position's owner or the registry admin.
    pub operator: Signer<'info>,

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

    /// CHECK: `User` record. Loaded in the handler and checked against
    /// its own derivation; it signs Drift calls.
    pub user: UncheckedAccount<'info>,

    /// CHECK: `SupportedTokenVault` record, loaded in the handler.
    #[account(
        mut,
        seeds = [SupportedTokenVault::SEED_PREFIX, &vault_index.to_le_bytes()],
        bump
    )]
    pub vault: UncheckedAccount<'info>,

    /// Checked against `vault.custody` in the handler.
    #[account(mut)]
    pub vault_custody: Account<'info, TokenAccount>,

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

    /// Checked against `position.custody` in the handler.
    #[account(mut)]
    pub position_custody: Account<'info, TokenAccount>,

    /// CHECK: Address checked against Drift's derivation in the handler.
    pub drift_state: UncheckedAccount<'info>,

    /// CHECK: Address checked against Drift's derivation in the handler.
    #[account(mut)]
    pub drift_user: UncheckedAccount<'info>,

    /// CHECK: Address checked against Drift's derivation in the handler.
    #[account(mut)]
    pub drift_user_stats: UncheckedAccount<'info>,

    /// CHECK: Address checked against Drift's derivation in the handler.
    #[account(mut)]
    pub drift_spot_market_vault: UncheckedAccount<'info>,

    /// CHECK: Program id pinned by address.
    #[account(address = ids::drift::ID @ ArrayError::AddressMismatch)]
    pub drift_program: UncheckedAccount<'info>,

    pub token_program: Program<'info, Token>,
}
