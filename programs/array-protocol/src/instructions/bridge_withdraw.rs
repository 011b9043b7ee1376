//! # Bridge Withdraw Instruction
//!
//! Pulls funds back from the user's Drift sub-account into the pooled vault.
//!
//! ```text
//! Drift spot market vault ──(drift_signer)──► position custody ──(User PDA)──► vault custody
//! ```
//!
//! Before calling Drift the handler prices the sub-account's scaled balance
//! with the spot market's deposit interest index and requires it to cover
//! `amount`. The spot market is taken from the forwarded accounts. The
//! withdrawal is reduce-only, so it can never open a borrow. Only the market
//! the position was bridged into can be withdrawn from.
//!
//! ## Reconciliation:
//!
//! ```text
//! principal = min(amount, position.deployed_amount)
//! yield     = amount - principal
//!
//! position.deployed_amount -= principal      vault.deployed_balance -= principal
//! position.deposited_amount += yield         vault.balance          += amount
//! ```

use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount};

use crate::bridge::{self, Drift, ExternalKeys, MarginProtocol, TransferAccounts};
use crate::controller;
use crate::custody::transfer_tokens;
use crate::errors::ArrayError;
use crate::events::BridgeWithdrawEvent;
use crate::ids;
use crate::state::{self, ProgramRegistry, SupportedTokenVault, User, UserPosition};

/// # bridge_withdraw
///
/// ## Errors
///
/// * `ArrayError::InvalidAmount` - Amount is zero
/// * `ArrayError::InsufficientBalance` - Drift reports less than `amount`
/// * `ArrayError::VaultNotFound` - No vault at `vault_index`
/// * `ArrayError::PositionNotFound` - No user record, no position, no Drift
///   sub-account, or the position was never bridged
/// * `ArrayError::AddressMismatch` - A Drift account is not the derived
///   one, the spot market was not forwarded, or the position is bound to
///   another market
/// * `ArrayError::ExternalCallFailed` - A transfer or the Drift call failed
pub fn bridge_withdraw<'info>(
    ctx: Context<'_, '_, '_, 'info, BridgeWithdraw<'info>>,
    vault_index: u16,
    market_index: u16,
    amount: u64,
) -> Result<()> {
    // ===================================
    // STEP 1: Validate caller, accounts and Drift balance
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

    let (update, settlement) =
        controller::stage_bridge_withdraw(&vault, &position, market_index, amount)?;

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
    bridge::expect_address(
        "drift_signer",
        &accounts.drift_signer.key(),
        &Drift.signer_address(),
    )?;
    require_keys_eq!(
        *accounts.drift_user.owner,
        Drift.program_id(),
        ArrayError::AddressMismatch
    );

    let spot_market = bridge::forwarded_account(
        ctx.remaining_accounts,
        &Drift.market_address(market_index),
        &Drift.program_id(),
    )?;
    let reported = {
        let data = accounts.drift_user.try_borrow_data()?;
        let market_data = spot_market.try_borrow_data()?;
        Drift.reported_deposit(&data, &market_data, market_index)?
    };
    msg!("Drift reports {} for market {}", reported, market_index);
    controller::ensure_external_balance(reported, amount)?;

    // ===================================
    // STEP 2: Drift → position custody (User PDA signs)
    // ===================================

    let staged_before = accounts.position_custody.amount;
    let transfer = TransferAccounts {
        state: accounts.drift_state.key(),
        sub_account: accounts.drift_user.key(),
        user_stats: accounts.drift_user_stats.key(),
        authority,
        market_vault: accounts.drift_spot_market_vault.key(),
        token_account: accounts.position_custody.key(),
        token_program: accounts.token_program.key(),
    };
    let ix = Drift.withdraw_ix(
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
        accounts.drift_signer.to_account_info(),
        accounts.position_custody.to_account_info(),
        accounts.token_program.to_account_info(),
    ];
    infos.extend(ctx.remaining_accounts.iter().cloned());
    infos.push(accounts.drift_program.to_account_info());

    let user_seeds = &[User::SEED_PREFIX, user.authority.as_ref(), &[user.bump]];
    bridge::invoke_external(&ix, &infos, &[&user_seeds[..]])?;

    ctx.accounts.position_custody.reload()?;
    bridge::verify_delta(
        staged_before,
        ctx.accounts.position_custody.amount,
        amount,
        true,
    )?;

    // ===================================
    // STEP 3: Position custody → vault custody (User PDA signs)
    // ===================================

    transfer_tokens(
        ctx.accounts.token_program.to_account_info(),
        ctx.accounts.position_custody.to_account_info(),
        ctx.accounts.vault_custody.to_account_info(),
        ctx.accounts.user.to_account_info(),
        &[&user_seeds[..]],
        amount,
    )?;

    // ===================================
    // STEP 4: Commit
    // ===================================

    update.commit(&mut vault, &mut position);
    state::store(&ctx.accounts.vault, &vault)?;
    state::store(&ctx.accounts.position, &position)?;

    emit!(BridgeWithdrawEvent {
        user: authority,
        vault_index,
        market_index,
        amount,
        principal: settlement.principal,
        realized_yield: settlement.realized_yield,
        deployed_amount: position.deployed_amount,
        timestamp: Clock::get()?.unix_timestamp,
    });

    msg!(
        "Returned {} from Drift market {} to vault {} (yield {})",
        amount,
        market_index,
        vault_index,
        settlement.realized_yield
    );

    Ok(())
}

#[derive(Accounts)]
#[instruction(vault_index: u16, market_index: u16)]
pub struct BridgeWithdraw<'info> {
    /// The position's owner or the registry admin.
    pub operator: Signer<'info>,

    #[account(
        seeds = [ProgramRegistry::SEED_PREFIX],
        bump = program_registry.bump
    )]
    pub program_registry: Account<'info, ProgramRegistry>,

    /// CHECK: `User` record. Loaded in the handler and checked against
    /// its own derivation; it signs Drift calls and the return transfer.
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

    /// CHECK: Address and owner checked in the handler before it is read.
    #[account(mut)]
    pub drift_user: UncheckedAccount<'info>,

    /// CHECK: Address checked against Drift's derivation in the handler.
    #[account(mut)]
    pub drift_user_stats: UncheckedAccount<'info>,

    /// CHECK: Address checked against Drift's derivation in the handler.
    #[account(mut)]
    pub drift_spot_market_vault: UncheckedAccount<'info>,

    /// CHECK: Address checked against Drift's derivation in the handler.
    pub drift_signer: UncheckedAccount<'info>,

    /// CHECK: Program id pinned by address.
    #[account(address = ids::drift::ID @ ArrayError::AddressMismatch)]
    pub drift_program: UncheckedAccount<'info>,

    pub token_program: Program<'info, Token>,
}
