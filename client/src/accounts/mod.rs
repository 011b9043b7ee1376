//! # Account Decoding
//!
//! Reads the program's account data without an IDL. Layouts follow the
//! Anchor serialization of each record:
//!
//! ```text
//! Offset | Size | Field (ProgramRegistry)
//! -------|------|---------------------
//! 0      | 8    | Anchor discriminator
//! 8      | 32   | admin
//! 40     | 32   | signer
//! 72     | 1    | signer_bump
//! 73     | 2    | vault_count
//! 75     | 1    | bump
//! ```

use solana_sdk::hash::hash;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Account data too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },

    #[error("Discriminator does not match {0}")]
    WrongDiscriminator(&'static str),
}

/// Anchor account discriminator: `sha256("account:<Name>")[..8]`.
pub fn account_discriminator(name: &str) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash(format!("account:{}", name).as_bytes()).to_bytes()[..8]);
    out
}

/// Sequential little-endian reader over account data.
struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    /// The discriminator is checked before the full length, so data of
    /// another record type is reported as such even when it is shorter.
    fn new(data: &'a [u8], name: &'static str, len: usize) -> Result<Self, DecodeError> {
        let too_short = |actual| DecodeError::TooShort {
            needed: len,
            actual,
        };
        let discriminator = data.get(..8).ok_or_else(|| too_short(data.len()))?;
        if discriminator[..] != account_discriminator(name)[..] {
            return Err(DecodeError::WrongDiscriminator(name));
        }
        if data.len() < len {
            return Err(too_short(data.len()));
        }
        Ok(Self { data, offset: 8 })
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.offset..self.offset + N]);
        self.offset += N;
        out
    }

    fn pubkey(&mut self) -> Pubkey {
        Pubkey::new_from_array(self.take::<32>())
    }

    fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take::<8>())
    }

    fn u16(&mut self) -> u16 {
        u16::from_le_bytes(self.take::<2>())
    }

    fn u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    /// Borsh `Option<u16>`: a tag byte, then the value when present.
    fn option_u16(&mut self) -> Option<u16> {
        match self.u8() {
            0 => None,
            _ => Some(self.u16()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramRegistryAccount {
    pub admin: Pubkey,
    pub signer: Pubkey,
    pub signer_bump: u8,
    pub vault_count: u16,
    pub bump: u8,
}

impl ProgramRegistryAccount {
    pub const LEN: usize = 8 + 32 + 32 + 1 + 2 + 1;

    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(data, "ProgramRegistry", Self::LEN)?;
        Ok(Self {
            admin: r.pubkey(),
            signer: r.pubkey(),
            signer_bump: r.u8(),
            vault_count: r.u16(),
            bump: r.u8(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedTokenVaultAccount {
    pub mint: Pubkey,
    pub vault_index: u16,
    pub balance: u64,
    pub deployed_balance: u64,
    pub custody: Pubkey,
    pub bump: u8,
    pub custody_bump: u8,
}

impl SupportedTokenVaultAccount {
    pub const LEN: usize = 8 + 32 + 2 + 8 + 8 + 32 + 1 + 1;

    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(data, "SupportedTokenVault", Self::LEN)?;
        Ok(Self {
            mint: r.pubkey(),
            vault_index: r.u16(),
            balance: r.u64(),
            deployed_balance: r.u64(),
            custody: r.pubkey(),
            bump: r.u8(),
            custody_bump: r.u8(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintRegistrationAccount {
    pub mint: Pubkey,
    pub vault_index: u16,
    pub bump: u8,
}

impl MintRegistrationAccount {
    pub const LEN: usize = 8 + 32 + 2 + 1;

    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(data, "MintRegistration", Self::LEN)?;
        Ok(Self {
            mint: r.pubkey(),
            vault_index: r.u16(),
            bump: r.u8(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub authority: Pubkey,
    pub external_sub_accounts: u16,
    pub bump: u8,
}

impl UserAccount {
    pub const LEN: usize = 8 + 32 + 2 + 1;

    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(data, "User", Self::LEN)?;
        Ok(Self {
            authority: r.pubkey(),
            external_sub_accounts: r.u16(),
            bump: r.u8(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPositionAccount {
    pub user: Pubkey,
    pub vault_index: u16,
    pub deposited_amount: u64,
    pub deployed_amount: u64,
    pub custody: Pubkey,
    pub bump: u8,
    /// Drift spot market the position is bound to after its first bridge.
    pub external_market: Option<u16>,
}

impl UserPositionAccount {
    pub const LEN: usize = 8 + 32 + 2 + 8 + 8 + 32 + 1 + 3;

    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(data, "UserPosition", Self::LEN)?;
        Ok(Self {
            user: r.pubkey(),
            vault_index: r.u16(),
            deposited_amount: r.u64(),
            deployed_amount: r.u64(),
            custody: r.pubkey(),
            bump: r.u8(),
            external_market: r.option_u16(),
        })
    }

    /// Withdrawable without bridging back first.
    pub fn local_amount(&self) -> u64 {
        self.deposited_amount.saturating_sub(self.deployed_amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position_bytes(user: &Pubkey, custody: &Pubkey) -> Vec<u8> {
        let mut data = account_discriminator("UserPosition").to_vec();
        data.extend_from_slice(user.as_ref());
        data.extend_from_slice(&2u16.to_le_bytes());
        data.extend_from_slice(&1_500_000u64.to_le_bytes());
        data.extend_from_slice(&400_000u64.to_le_bytes());
        data.extend_from_slice(custody.as_ref());
        data.push(254);
        data.extend_from_slice(&[1, 5, 0]);
        data
    }

    #[test]
    fn test_decode_position() {
        let user = Pubkey::new_unique();
        let custody = Pubkey::new_unique();
        let position = UserPositionAccount::decode(&position_bytes(&user, &custody)).unwrap();

        assert_eq!(position.user, user);
        assert_eq!(position.vault_index, 2);
        assert_eq!(position.deposited_amount, 1_500_000);
        assert_eq!(position.deployed_amount, 400_000);
        assert_eq!(position.local_amount(), 1_100_000);
        assert_eq!(position.custody, custody);
        assert_eq!(position.bump, 254);
        assert_eq!(position.external_market, Some(5));
    }

    #[test]
    fn test_unbridged_position_has_no_market() {
        let mut data = position_bytes(&Pubkey::new_unique(), &Pubkey::new_unique());
        let tag = data.len() - 3;
        data[tag..].copy_from_slice(&[0, 0, 0]);

        let position = UserPositionAccount::decode(&data).unwrap();
        assert_eq!(position.external_market, None);
    }

    #[test]
    fn test_decode_mint_registration() {
        let mint = Pubkey::new_unique();
        let mut data = account_discriminator("MintRegistration").to_vec();
        data.extend_from_slice(mint.as_ref());
        data.extend_from_slice(&4u16.to_le_bytes());
        data.push(251);

        let registration = MintRegistrationAccount::decode(&data).unwrap();
        assert_eq!(registration.mint, mint);
        assert_eq!(registration.vault_index, 4);
        assert_eq!(registration.bump, 251);
    }

    #[test]
    fn test_decode_registry() {
        let admin = Pubkey::new_unique();
        let signer = Pubkey::new_unique();
        let mut data = account_discriminator("ProgramRegistry").to_vec();
        data.extend_from_slice(admin.as_ref());
        data.extend_from_slice(signer.as_ref());
        data.push(253);
        data.extend_from_slice(&3u16.to_le_bytes());
        data.push(255);

        let registry = ProgramRegistryAccount::decode(&data).unwrap();
        assert_eq!(registry.admin, admin);
        assert_eq!(registry.signer_bump, 253);
        assert_eq!(registry.vault_count, 3);
        assert_eq!(registry.bump, 255);
    }

    #[test]
    fn test_wrong_account_type_is_rejected() {
        let data = position_bytes(&Pubkey::new_unique(), &Pubkey::new_unique());
        let err = SupportedTokenVaultAccount::decode(&data).unwrap_err();
        assert_eq!(err, DecodeError::WrongDiscriminator("SupportedTokenVault"));
    }

    #[test]
    fn test_short_data_is_rejected() {
        let mut data = account_discriminator("User").to_vec();
        data.extend_from_slice(&[0u8; 2]);

        let err = UserAccount::decode(&data).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TooShort {
                needed: UserAccount::LEN,
                actual: 10
            }
        );
        assert_eq!(
            UserAccount::decode(&[0u8; 4]).unwrap_err(),
            DecodeError::TooShort {
                needed: UserAccount::LEN,
                actual: 4
            }
        );
    }

    #[test]
    fn test_short_record_of_another_type_reports_the_type() {
        let data = account_discriminator("User").to_vec();
        let err = SupportedTokenVaultAccount::decode(&data).unwrap_err();
        assert_eq!(err, DecodeError::WrongDiscriminator("SupportedTokenVault"));
    }
}
