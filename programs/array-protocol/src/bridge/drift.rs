//! # Drift Adapter
//!
//! [`MarginProtocol`] for the Drift v2 program.
//!
//! Instruction accounts and arguments come from the bindings
//! `declare_program!(drift)` generates out of `idls/drift.json`, so account
//! order, signer/writable flags and discriminators follow Drift's IDL:
//!
//! | Instruction | Fixed accounts |
//! |-------------|----------------|
//! | `initialize_user_stats` | user_stats, state, authority, payer, rent, system_program |
//! | `initialize_user` | user, user_stats, state, authority, payer, rent, system_program |
//! | `deposit` | state, user, user_stats, authority, spot_market_vault, user_token_account, token_program |
//! | `withdraw` | state, user, user_stats, authority, spot_market_vault, drift_signer, user_token_account, token_program |
//!
//! Deposits and withdrawals are followed by the oracle and spot market
//! accounts the client discovered for the market, forwarded untouched.
//!
//! Drift's `User` and `SpotMarket` are zero-copy accounts, so balances are
//! read straight from their byte layout.

use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::{AccountMeta, Instruction};
use anchor_lang::solana_program::{system_program, sysvar};
use anchor_lang::InstructionData;

use super::{MarginProtocol, TransferAccounts};
use crate::drift::client::{accounts as drift_accounts, args as drift_args};
use crate::errors::ArrayError;
use crate::ids;

/// `sha256("account:User")[..8]`
pub const USER_DISCRIMINATOR: [u8; 8] = [159, 117, 95, 227, 239, 151, 58, 236];

/// `sha256("account:SpotMarket")[..8]`
pub const SPOT_MARKET_DISCRIMINATOR: [u8; 8] = [100, 177, 8, 107, 168, 65, 65, 39];

mod layout {
    /// Drift `User`.
    pub mod user {
        /// discriminator (8) + authority (32) + delegate (32) + name (32)
        pub const SPOT_POSITIONS_OFFSET: usize = 8 + 32 + 32 + 32;
        pub const SPOT_POSITION_LEN: usize = 40;
        pub const SPOT_POSITION_COUNT: usize = 8;

        pub const SCALED_BALANCE: usize = 0;
        pub const MARKET_INDEX: usize = 32;
        pub const BALANCE_TYPE: usize = 34;
        pub const OPEN_ORDERS: usize = 35;

        pub const BALANCE_TYPE_DEPOSIT: u8 = 0;

        pub const MIN_LEN: usize = SPOT_POSITIONS_OFFSET + SPOT_POSITION_LEN * SPOT_POSITION_COUNT;
    }

    /// Drift `SpotMarket`.
    pub mod spot_market {
        pub const CUMULATIVE_DEPOSIT_INTEREST: usize = 464;
        pub const DECIMALS: usize = 680;
        pub const MARKET_INDEX: usize = 684;

        pub const MIN_LEN: usize = MARKET_INDEX + 2;
    }

    /// `cumulative_deposit_interest` is scaled by 1e10 and scaled balances
    /// by 1e9, so tokens = scaled * interest / 10^(19 - decimals).
    pub const INTEREST_PRECISION_EXP: u32 = 19;
}

/// Name written into sub-accounts the program creates, space padded the
/// way Drift's own clients encode names.
pub const SUB_ACCOUNT_NAME: &[u8] = b"Array Protocol";

#[derive(Clone, Copy, Debug, Default)]
pub struct Drift;

impl Drift {
    pub const STATE_SEED: &'static [u8] = b"drift_state";
    pub const SIGNER_SEED: &'static [u8] = b"drift_signer";
    pub const USER_SEED: &'static [u8] = b"user";
    pub const USER_STATS_SEED: &'static [u8] = b"user_stats";
    pub const SPOT_MARKET_SEED: &'static [u8] = b"spot_market";
    pub const SPOT_MARKET_VAULT_SEED: &'static [u8] = b"spot_market_vault";

    fn pda(seeds: &[&[u8]]) -> Pubkey {
        Pubkey::find_program_address(seeds, &ids::drift::ID).0
    }

    pub fn spot_market_address(market_index: u16) -> Pubkey {
        Self::pda(&[Self::SPOT_MARKET_SEED, &market_index.to_le_bytes()])
    }

    pub fn sub_account_name() -> [u8; 32] {
        let mut name = [b' '; 32];
        name[..SUB_ACCOUNT_NAME.len()].copy_from_slice(SUB_ACCOUNT_NAME);
        name
    }

    fn transfer_metas(
        accounts: &TransferAccounts,
        drift_signer: Option<Pubkey>,
        remaining: &[AccountMeta],
    ) -> Vec<AccountMeta> {
        let mut metas = match drift_signer {
            Some(drift_signer) => drift_accounts::Withdraw {
                state: accounts.state,
                user: accounts.sub_account,
                user_stats: accounts.user_stats,
                authority: accounts.authority,
                spot_market_vault: accounts.market_vault,
                drift_signer,
                user_token_account: accounts.token_account,
                token_program: accounts.token_program,
            }
            .to_account_metas(None),
            None => drift_accounts::Deposit {
                state: accounts.state,
                user: accounts.sub_account,
                user_stats: accounts.user_stats,
                authority: accounts.authority,
                spot_market_vault: accounts.market_vault,
                user_token_account: accounts.token_account,
                token_program: accounts.token_program,
            }
            .to_account_metas(None),
        };
        metas.extend_from_slice(remaining);
        metas
    }
}

/// Interest state of a Drift spot market.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpotMarketInterest {
    pub market_index: u16,
    pub decimals: u32,
    pub cumulative_deposit_interest: u128,
}

impl SpotMarketInterest {
    /// Tokens a scaled deposit balance is worth, rounded down as Drift
    /// rounds deposits.
    pub fn deposit_tokens(&self, scaled_balance: u64) -> Option<u64> {
        let exp = layout::INTEREST_PRECISION_EXP.checked_sub(self.decimals)?;
        let precision = 10u128.checked_pow(exp)?;
        let tokens = u128::from(scaled_balance)
            .checked_mul(self.cumulative_deposit_interest)?
            .checked_div(precision)?;
        u64::try_from(tokens).ok()
    }
}

/// Reads the interest state out of a Drift `SpotMarket` account.
pub fn parse_spot_market(data: &[u8]) -> Option<SpotMarketInterest> {
    use layout::spot_market::*;

    if data.len() < MIN_LEN || data[..8] != SPOT_MARKET_DISCRIMINATOR {
        return None;
    }
    Some(SpotMarketInterest {
        market_index: u16::from_le_bytes(data.get(MARKET_INDEX..MARKET_INDEX + 2)?.try_into().ok()?),
        decimals: u32::from_le_bytes(data.get(DECIMALS..DECIMALS + 4)?.try_into().ok()?),
        cumulative_deposit_interest: u128::from_le_bytes(
            data.get(CUMULATIVE_DEPOSIT_INTEREST..CUMULATIVE_DEPOSIT_INTEREST + 16)?
                .try_into()
                .ok()?,
        ),
    })
}

/// Scaled deposit balance of `market_index` in a Drift `User` account.
///
/// Borrow positions and markets without a position report zero.
pub fn parse_scaled_deposit(data: &[u8], market_index: u16) -> Option<u64> {
    use layout::user::*;

    if data.len() < MIN_LEN {
        return None;
    }

    for slot in 0..SPOT_POSITION_COUNT {
        let start = SPOT_POSITIONS_OFFSET + slot * SPOT_POSITION_LEN;
        let position = &data[start..start + SPOT_POSITION_LEN];

        let scaled_balance = read_u64(position, SCALED_BALANCE)?;
        let index = u16::from_le_bytes([position[MARKET_INDEX], position[MARKET_INDEX + 1]]);

        // Drift treats a slot with no balance and no open orders as free.
        let free = scaled_balance == 0 && position[OPEN_ORDERS] == 0;
        if free || index != market_index {
            continue;
        }
        if position[BALANCE_TYPE] != BALANCE_TYPE_DEPOSIT {
            return Some(0);
        }
        return Some(scaled_balance);
    }
    Some(0)
}

fn read_u64(bytes: &[u8], offset: usize) -> Option<u64> {
    bytes
        .get(offset..offset + 8)
        .and_then(|b| b.try_into().ok())
        .map(u64::from_le_bytes)
}

impl MarginProtocol for Drift {
    fn program_id(&self) -> Pubkey {
        ids::drift::ID
    }

    fn state_address(&self) -> Pubkey {
        Self::pda(&[Self::STATE_SEED])
    }

    fn signer_address(&self) -> Pubkey {
        Self::pda(&[Self::SIGNER_SEED])
    }

    fn user_stats_address(&self, authority: &Pubkey) -> Pubkey {
        Self::pda(&[Self::USER_STATS_SEED, authority.as_ref()])
    }

    fn sub_account_address(&self, authority: &Pubkey, sub_account_id: u16) -> Pubkey {
        Self::pda(&[
            Self::USER_SEED,
            authority.as_ref(),
            &sub_account_id.to_le_bytes(),
        ])
    }

    fn market_address(&self, market_index: u16) -> Pubkey {
        Self::spot_market_address(market_index)
    }

    fn market_vault_address(&self, market_index: u16) -> Pubkey {
        Self::pda(&[Self::SPOT_MARKET_VAULT_SEED, &market_index.to_le_bytes()])
    }

    fn init_user_stats_ix(&self, authority: &Pubkey, payer: &Pubkey) -> Instruction {
        let accounts = drift_accounts::InitializeUserStats {
            user_stats: self.user_stats_address(authority),
            state: self.state_address(),
            authority: *authority,
            payer: *payer,
            rent: sysvar::rent::ID,
            system_program: system_program::ID,
        };

        Instruction {
            program_id: self.program_id(),
            accounts: accounts.to_account_metas(None),
            data: drift_args::InitializeUserStats.data(),
        }
    }

    fn init_sub_account_ix(
        &self,
        authority: &Pubkey,
        payer: &Pubkey,
        sub_account_id: u16,
    ) -> Instruction {
        let accounts = drift_accounts::InitializeUser {
            user: self.sub_account_address(authority, sub_account_id),
            user_stats: self.user_stats_address(authority),
            state: self.state_address(),
            authority: *authority,
            payer: *payer,
            rent: sysvar::rent::ID,
            system_program: system_program::ID,
        };
        let args = drift_args::InitializeUser {
            sub_account_id,
            name: Self::sub_account_name(),
        };

        Instruction {
            program_id: self.program_id(),
            accounts: accounts.to_account_metas(None),
            data: args.data(),
        }
    }

    fn deposit_ix(
        &self,
        accounts: &TransferAccounts,
        remaining: &[AccountMeta],
        market_index: u16,
        amount: u64,
    ) -> Instruction {
        let args = drift_args::Deposit {
            market_index,
            amount,
            reduce_only: false,
        };

        Instruction {
            program_id: self.program_id(),
            accounts: Self::transfer_metas(accounts, None, remaining),
            data: args.data(),
        }
    }

    fn withdraw_ix(
        &self,
        accounts: &TransferAccounts,
        remaining: &[AccountMeta],
        market_index: u16,
        amount: u64,
    ) -> Instruction {
        // Only ever unwind what is there; never open a borrow.
        let args = drift_args::Withdraw {
            market_index,
            amount,
            reduce_only: true,
        };

        Instruction {
            program_id: self.program_id(),
            accounts: Self::transfer_metas(accounts, Some(self.signer_address()), remaining),
            data: args.data(),
        }
    }

    fn reported_deposit(
        &self,
        sub_account_data: &[u8],
        market_data: &[u8],
        market_index: u16,
    ) -> Result<u64> {
        if sub_account_data.get(..8) != Some(&USER_DISCRIMINATOR[..]) {
            msg!("Sub-account data is not a Drift User account");
            return err!(ArrayError::AddressMismatch);
        }
        let market = parse_spot_market(market_data)
            .filter(|market| market.market_index == market_index)
            .ok_or_else(|| {
                msg!("Market data is not Drift spot market {}", market_index);
                error!(ArrayError::AddressMismatch)
            })?;
        let scaled_balance = parse_scaled_deposit(sub_account_data, market_index)
            .ok_or_else(|| error!(ArrayError::PositionNotFound))?;

        market
            .deposit_tokens(scaled_balance)
            .ok_or_else(|| error!(ArrayError::ArithmeticOverflow))
    }
}
