//! # State Module
//!
//! Account structures persisted by the Array Protocol program.
//!
//! ## Account Types:
//!
//! | Account | Seeds | Description |
//! |---------|-------|-------------|
//! | `ProgramRegistry` | `["program_state"]` | Global singleton: admin, delegated signer, vault count |
//! | `SupportedTokenVault` | `["token_vault", idx]` | One pooled vault per supported mint |
//! | `MintRegistration` | `["vault_mint", mint]` | Marks a mint as taken by a vault |
//! | `User` | `["user", wallet]` | One record per end user |
//! | `UserPosition` | `["user_vault", user, idx]` | One user's share of one vault |
//!
//! Integer seeds are always `u16` little-endian.
//!
//! Handlers that must report a missing record with a specific error take the
//! record as an unchecked account and go through [`load`] and [`store`].

use anchor_lang::prelude::*;

use crate::errors::ArrayError;

pub mod mint_registration;
pub mod program_registry;
pub mod supported_vault;
pub mod user;
pub mod user_position;

pub use mint_registration::*;
pub use program_registry::*;
pub use supported_vault::*;
pub use user::*;
pub use user_position::*;

/// Reads a record of type `T` from `info`.
///
/// An account that was never created, belongs to another program or holds
/// another record type is reported as `missing`.
pub fn load<T: AccountDeserialize + Owner>(info: &AccountInfo, missing: ArrayError) -> Result<T> {
    if info.data_is_empty() || *info.owner != T::owner() {
        msg!("No record at {}", info.key);
        return Err(missing.into());
    }
    let data = info.try_borrow_data()?;
    T::try_deserialize(&mut &data[..]).map_err(|_| {
        msg!("Account {} holds a different record", info.key);
        missing.into()
    })
}

/// Writes `record` back into `info`, discriminator included.
pub fn store<T: AccountSerialize>(info: &AccountInfo, record: &T) -> Result<()> {
    let mut data = info.try_borrow_mut_data()?;
    let mut writer: &mut [u8] = &mut data[..];
    record.try_serialize(&mut writer)
}
