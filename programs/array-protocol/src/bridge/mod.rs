//! # External Bridge Adapter
//!
//! The program moves pooled funds into an external margin program through
//! the [`MarginProtocol`] trait. Handlers never hand-build the external
//! instruction layout; they hand the adapter the fixed accounts plus the
//! market/oracle list the client discovered, and the adapter returns a
//! ready-to-invoke [`Instruction`].
//!
//! ```text
//!   bridge_deposit handler
//!          │  TransferAccounts + remaining accounts (opaque, forwarded as-is)
//!          ▼
//!   MarginProtocol::deposit_ix ──► invoke_signed(["user", wallet, bump])
//!                                         │
//!                                         ▼
//!                                   Drift program
//! ```
//!
//! The external authority is always the user's `User` record address, not
//! the wallet. The program signs for it, so the user can only reach the
//! external sub-account through this program.

use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::{AccountMeta, Instruction};
use anchor_lang::solana_program::program::invoke_signed;

use crate::errors::ArrayError;

pub mod drift;

pub use drift::Drift;

/// Fixed accounts of an external deposit or withdrawal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferAccounts {
    pub state: Pubkey,
    pub sub_account: Pubkey,
    pub user_stats: Pubkey,
    /// The `User` record PDA; signs through the program.
    pub authority: Pubkey,
    pub market_vault: Pubkey,
    /// Position custody account the tokens are staged in.
    pub token_account: Pubkey,
    pub token_program: Pubkey,
}

/// Operations the program needs from a margin-trading venue.
pub trait MarginProtocol {
    fn program_id(&self) -> Pubkey;

    fn state_address(&self) -> Pubkey;

    fn signer_address(&self) -> Pubkey;

    fn user_stats_address(&self, authority: &Pubkey) -> Pubkey;

    fn sub_account_address(&self, authority: &Pubkey, sub_account_id: u16) -> Pubkey;

    /// Market record whose interest state prices a deposit.
    fn market_address(&self, market_index: u16) -> Pubkey;

    fn market_vault_address(&self, market_index: u16) -> Pubkey;

    /// Creates the per-authority statistics record.
    fn init_user_stats_ix(&self, authority: &Pubkey, payer: &Pubkey) -> Instruction;

    fn init_sub_account_ix(
        &self,
        authority: &Pubkey,
        payer: &Pubkey,
        sub_account_id: u16,
    ) -> Instruction;

    /// `remaining` is appended after the fixed accounts in the given order.
    fn deposit_ix(
        &self,
        accounts: &TransferAccounts,
        remaining: &[AccountMeta],
        market_index: u16,
        amount: u64,
    ) -> Instruction;

    fn withdraw_ix(
        &self,
        accounts: &TransferAccounts,
        remaining: &[AccountMeta],
        market_index: u16,
        amount: u64,
    ) -> Instruction;

    /// Tokens the venue owes the sub-account in `market_index`, accrued
    /// interest included. Read from the raw sub-account and market data.
    fn reported_deposit(
        &self,
        sub_account_data: &[u8],
        market_data: &[u8],
        market_index: u16,
    ) -> Result<u64>;
}

/// External accounts a bridge call was handed, checked against what the
/// adapter derives.
#[derive(Clone, Copy, Debug)]
pub struct ExternalKeys<'a> {
    pub state: &'a Pubkey,
    pub user_stats: &'a Pubkey,
    pub sub_account: &'a Pubkey,
    pub market_vault: &'a Pubkey,
}

pub fn expect_address(label: &str, actual: &Pubkey, expected: &Pubkey) -> Result<()> {
    if actual != expected {
        msg!("{} mismatch: got {}, expected {}", label, actual, expected);
        return err!(ArrayError::AddressMismatch);
    }
    Ok(())
}

pub fn check_external_accounts<P: MarginProtocol>(
    protocol: &P,
    authority: &Pubkey,
    sub_account_id: u16,
    market_index: u16,
    keys: ExternalKeys,
) -> Result<()> {
    expect_address("state", keys.state, &protocol.state_address())?;
    expect_address(
        "user_stats",
        keys.user_stats,
        &protocol.user_stats_address(authority),
    )?;
    expect_address(
        "sub_account",
        keys.sub_account,
        &protocol.sub_account_address(authority, sub_account_id),
    )?;
    expect_address(
        "market_vault",
        keys.market_vault,
        &protocol.market_vault_address(market_index),
    )?;
    Ok(())
}

/// Picks the forwarded account at `expected`, which must belong to `owner`.
pub fn forwarded_account<'a, 'info>(
    accounts: &'a [AccountInfo<'info>],
    expected: &Pubkey,
    owner: &Pubkey,
) -> Result<&'a AccountInfo<'info>> {
    let info = accounts
        .iter()
        .find(|info| info.key == expected)
        .ok_or_else(|| {
            msg!("Account {} was not forwarded", expected);
            error!(ArrayError::AddressMismatch)
        })?;
    require_keys_eq!(*info.owner, *owner, ArrayError::AddressMismatch);
    Ok(info)
}

/// Forwards remaining accounts with exactly the flags the caller set.
pub fn forward_metas(accounts: &[AccountInfo]) -> Vec<AccountMeta> {
    accounts
        .iter()
        .map(|info| {
            if info.is_writable {
                AccountMeta::new(info.key(), info.is_signer)
            } else {
                AccountMeta::new_readonly(info.key(), info.is_signer)
            }
        })
        .collect()
}

/// Runs an external instruction. Any failure is logged with its cause and
/// reported as `ExternalCallFailed`.
pub fn invoke_external(
    ix: &Instruction,
    account_infos: &[AccountInfo],
    signer_seeds: &[&[&[u8]]],
) -> Result<()> {
    invoke_signed(ix, account_infos, signer_seeds).map_err(|e| {
        msg!("Call into {} failed: {:?}", ix.program_id, e);
        error!(ArrayError::ExternalCallFailed)
    })
}

/// Checks a token account moved by exactly `expected` across a call.
pub fn verify_delta(before: u64, after: u64, expected: u64, credited: bool) -> Result<()> {
    let moved = if credited {
        after.checked_sub(before)
    } else {
        before.checked_sub(after)
    };
    if moved != Some(expected) {
        msg!(
            "Custody moved {:?} (before {}, after {}), expected {}",
            moved,
            before,
            after,
            expected
        );
        return err!(ArrayError::ExternalCallFailed);
    }
    Ok(())
}
