//! # Transaction Builder Service
//!
//! Builds Array Protocol instructions with the account order and
//! writability each program instruction declares, and wraps them into
//! unsigned transactions for a wallet to sign.
//!
//! ## Instruction Data
//!
//! ```text
//! sha256("global:<instruction_name>")[..8] ++ args (little-endian)
//! ```
//!
//! ## Unsigned Transactions
//!
//! ```text
//! 1. Client builds unsigned transaction
//!              ↓
//! 2. Hand to the wallet (base64 encoded)
//!              ↓
//! 3. Wallet signs and submits
//! ```

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use solana_sdk::{
    hash::{hash, Hash},
    instruction::{AccountMeta, Instruction},
    message::Message,
    pubkey::Pubkey,
    system_program, sysvar,
    transaction::Transaction,
};
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::drift::{self, DiscoveryError, StaticMarketDirectory};
use crate::pda::{DriftAddresses, ProgramAddresses};

/// Sub-account every bridge call goes through.
const PRIMARY_SUB_ACCOUNT: u16 = 0;

#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Market discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),
}

/// Builds instructions for one deployment of the program.
///
/// ## Usage
///
/// ```rust,ignore
/// let builder = InstructionBuilder::new(&config);
/// let remaining = builder.bridge_remaining_accounts(&[0])?;
/// let ix = builder.bridge_deposit(&wallet, &wallet, 0, 0, 1_000_000, &remaining);
/// ```
#[derive(Debug, Clone)]
pub struct InstructionBuilder {
    pda: ProgramAddresses,
    drift: DriftAddresses,
    markets: StaticMarketDirectory,
}

impl InstructionBuilder {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            pda: ProgramAddresses::new(config.program_id),
            drift: DriftAddresses::new(config.drift_program_id),
            markets: config.markets.clone(),
        }
    }

    pub fn addresses(&self) -> &ProgramAddresses {
        &self.pda
    }

    pub fn drift_addresses(&self) -> &DriftAddresses {
        &self.drift
    }

    /// Anchor instruction discriminator.
    pub fn discriminator(name: &str) -> [u8; 8] {
        let mut out = [0u8; 8];
        out.copy_from_slice(&hash(format!("global:{}", name).as_bytes()).to_bytes()[..8]);
        out
    }

    fn data(name: &str, args: &[&[u8]]) -> Vec<u8> {
        let mut data = Self::discriminator(name).to_vec();
        for arg in args {
            data.extend_from_slice(arg);
        }
        data
    }

    fn instruction(&self, accounts: Vec<AccountMeta>, data: Vec<u8>) -> Instruction {
        Instruction {
            program_id: self.pda.program_id,
            accounts,
            data,
        }
    }

    // ========================================
    // REGISTRY
    // ========================================

    pub fn init_program_registry(&self, admin: &Pubkey) -> Instruction {
        self.instruction(
            vec![
                AccountMeta::new(*admin, true),
                AccountMeta::new(self.pda.program_registry().0, false),
                AccountMeta::new_readonly(self.pda.program_signer().0, false),
                AccountMeta::new_readonly(system_program::id(), false),
            ],
            Self::data("init_program_registry", &[]),
        )
    }

    /// `vault_index` must be the registry's current `vault_count`.
    pub fn register_vault(&self, admin: &Pubkey, mint: &Pubkey, vault_index: u16) -> Instruction {
        info!("Building register_vault for mint {} at index {}", mint, vault_index);

        self.instruction(
            vec![
                AccountMeta::new(*admin, true),
                AccountMeta::new(self.pda.program_registry().0, false),
                AccountMeta::new_readonly(self.pda.program_signer().0, false),
                AccountMeta::new_readonly(*mint, false),
                AccountMeta::new(self.pda.mint_registration(mint).0, false),
                AccountMeta::new(self.pda.vault(vault_index).0, false),
                AccountMeta::new(self.pda.vault_custody(vault_index).0, false),
                AccountMeta::new_readonly(spl_token::id(), false),
                AccountMeta::new_readonly(system_program::id(), false),
            ],
            Self::data("register_vault", &[]),
        )
    }

    // ========================================
    // USERS & POSITIONS
    // ========================================

    pub fn init_user(&self, wallet: &Pubkey) -> Instruction {
        self.instruction(
            vec![
                AccountMeta::new(*wallet, true),
                AccountMeta::new(self.pda.user(wallet).0, false),
                AccountMeta::new_readonly(system_program::id(), false),
            ],
            Self::data("init_user", &[]),
        )
    }

    pub fn init_position(&self, wallet: &Pubkey, mint: &Pubkey, vault_index: u16) -> Instruction {
        let (user, _) = self.pda.user(wallet);

        self.instruction(
            vec![
                AccountMeta::new(*wallet, true),
                AccountMeta::new_readonly(self.pda.program_registry().0, false),
                AccountMeta::new_readonly(user, false),
                AccountMeta::new_readonly(self.pda.vault(vault_index).0, false),
                AccountMeta::new_readonly(*mint, false),
                AccountMeta::new(self.pda.position(&user, vault_index).0, false),
                AccountMeta::new(self.pda.position_custody(&user, vault_index).0, false),
                AccountMeta::new_readonly(spl_token::id(), false),
                AccountMeta::new_readonly(system_program::id(), false),
            ],
            Self::data("init_position", &[&vault_index.to_le_bytes()]),
        )
    }

    /// Deposits from the wallet's associated token account for `mint`.
    pub fn deposit(&self, wallet: &Pubkey, mint: &Pubkey, vault_index: u16, amount: u64) -> Instruction {
        let source = spl_associated_token_account::get_associated_token_address(wallet, mint);
        self.deposit_from(wallet, &source, vault_index, amount)
    }

    pub fn deposit_from(
        &self,
        wallet: &Pubkey,
        source: &Pubkey,
        vault_index: u16,
        amount: u64,
    ) -> Instruction {
        info!("Building deposit: {} into vault {} for {}", amount, vault_index, wallet);

        let (user, _) = self.pda.user(wallet);
        self.instruction(
            vec![
                AccountMeta::new_readonly(*wallet, true),
                AccountMeta::new_readonly(user, false),
                AccountMeta::new(self.pda.vault(vault_index).0, false),
                AccountMeta::new(self.pda.position(&user, vault_index).0, false),
                AccountMeta::new(*source, false),
                AccountMeta::new(self.pda.vault_custody(vault_index).0, false),
                AccountMeta::new_readonly(spl_token::id(), false),
            ],
            Self::data("deposit", &[&vault_index.to_le_bytes(), &amount.to_le_bytes()]),
        )
    }

    /// Withdraws to the wallet's associated token account for `mint`.
    pub fn withdraw(&self, wallet: &Pubkey, mint: &Pubkey, vault_index: u16, amount: u64) -> Instruction {
        let destination = spl_associated_token_account::get_associated_token_address(wallet, mint);
        self.withdraw_to(wallet, &destination, vault_index, amount)
    }

    pub fn withdraw_to(
        &self,
        wallet: &Pubkey,
        destination: &Pubkey,
        vault_index: u16,
        amount: u64,
    ) -> Instruction {
        info!("Building withdraw: {} from vault {} for {}", amount, vault_index, wallet);

        let (user, _) = self.pda.user(wallet);
        self.instruction(
            vec![
                AccountMeta::new_readonly(*wallet, true),
                AccountMeta::new_readonly(self.pda.program_registry().0, false),
                AccountMeta::new_readonly(self.pda.program_signer().0, false),
                AccountMeta::new_readonly(user, false),
                AccountMeta::new(self.pda.vault(vault_index).0, false),
                AccountMeta::new(self.pda.position(&user, vault_index).0, false),
                AccountMeta::new(*destination, false),
                AccountMeta::new(self.pda.vault_custody(vault_index).0, false),
                AccountMeta::new_readonly(spl_token::id(), false),
            ],
            Self::data("withdraw", &[&vault_index.to_le_bytes(), &amount.to_le_bytes()]),
        )
    }

    // ========================================
    // DRIFT BRIDGE
    // ========================================

    /// `operator` is the user's wallet or the registry admin; it pays rent.
    pub fn init_external_account(&self, operator: &Pubkey, wallet: &Pubkey) -> Instruction {
        let (user, _) = self.pda.user(wallet);

        self.instruction(
            vec![
                AccountMeta::new(*operator, true),
                AccountMeta::new_readonly(self.pda.program_registry().0, false),
                AccountMeta::new_readonly(user, false),
                AccountMeta::new(self.drift.user_stats(&user), false),
                AccountMeta::new(self.drift.state(), false),
                AccountMeta::new_readonly(self.drift.program_id, false),
                AccountMeta::new_readonly(sysvar::rent::id(), false),
                AccountMeta::new_readonly(system_program::id(), false),
            ],
            Self::data("init_external_account", &[]),
        )
    }

    pub fn init_external_sub_account(
        &self,
        operator: &Pubkey,
        wallet: &Pubkey,
        sub_account_id: u16,
    ) -> Instruction {
        let (user, _) = self.pda.user(wallet);

        self.instruction(
            vec![
                AccountMeta::new(*operator, true),
                AccountMeta::new_readonly(self.pda.program_registry().0, false),
                AccountMeta::new(user, false),
                AccountMeta::new(self.drift.user(&user, sub_account_id), false),
                AccountMeta::new(self.drift.user_stats(&user), false),
                AccountMeta::new(self.drift.state(), false),
                AccountMeta::new_readonly(self.drift.program_id, false),
                AccountMeta::new_readonly(sysvar::rent::id(), false),
                AccountMeta::new_readonly(system_program::id(), false),
            ],
            Self::data("init_external_sub_account", &[&sub_account_id.to_le_bytes()]),
        )
    }

    /// Oracle and spot market accounts for the configured market directory.
    pub fn bridge_remaining_accounts(
        &self,
        market_indexes: &[u16],
    ) -> Result<Vec<AccountMeta>, BuilderError> {
        let markets = drift::resolve_markets(&self.drift, &self.markets, market_indexes)?;
        let metas = drift::remaining_accounts(&markets);
        debug!("Resolved {} remaining accounts for markets {:?}", metas.len(), market_indexes);
        Ok(metas)
    }

    pub fn bridge_deposit(
        &self,
        operator: &Pubkey,
        wallet: &Pubkey,
        vault_index: u16,
        market_index: u16,
        amount: u64,
        remaining: &[AccountMeta],
    ) -> Instruction {
        info!(
            "Building bridge_deposit: {} from vault {} to Drift market {} for {}",
            amount, vault_index, market_index, wallet
        );

        let (user, _) = self.pda.user(wallet);
        let mut accounts = vec![
            AccountMeta::new_readonly(*operator, true),
            AccountMeta::new_readonly(self.pda.program_registry().0, false),
            AccountMeta::new_readonly(self.pda.program_signer().0, false),
            AccountMeta::new_readonly(user, false),
            AccountMeta::new(self.pda.vault(vault_index).0, false),
            AccountMeta::new(self.pda.vault_custody(vault_index).0, false),
            AccountMeta::new(self.pda.position(&user, vault_index).0, false),
            AccountMeta::new(self.pda.position_custody(&user, vault_index).0, false),
            AccountMeta::new_readonly(self.drift.state(), false),
            AccountMeta::new(self.drift.user(&user, PRIMARY_SUB_ACCOUNT), false),
            AccountMeta::new(self.drift.user_stats(&user), false),
            AccountMeta::new(self.drift.spot_market_vault(market_index), false),
            AccountMeta::new_readonly(self.drift.program_id, false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ];
        accounts.extend_from_slice(remaining);

        self.instruction(
            accounts,
            Self::data(
                "bridge_deposit",
                &[
                    &vault_index.to_le_bytes(),
                    &market_index.to_le_bytes(),
                    &amount.to_le_bytes(),
                ],
            ),
        )
    }

    pub fn bridge_withdraw(
        &self,
        operator: &Pubkey,
        wallet: &Pubkey,
        vault_index: u16,
        market_index: u16,
        amount: u64,
        remaining: &[AccountMeta],
    ) -> Instruction {
        info!(
            "Building bridge_withdraw: {} from Drift market {} to vault {} for {}",
            amount, market_index, vault_index, wallet
        );

        let (user, _) = self.pda.user(wallet);
        let mut accounts = vec![
            AccountMeta::new_readonly(*operator, true),
            AccountMeta::new_readonly(self.pda.program_registry().0, false),
            AccountMeta::new_readonly(user, false),
            AccountMeta::new(self.pda.vault(vault_index).0, false),
            AccountMeta::new(self.pda.vault_custody(vault_index).0, false),
            AccountMeta::new(self.pda.position(&user, vault_index).0, false),
            AccountMeta::new(self.pda.position_custody(&user, vault_index).0, false),
            AccountMeta::new_readonly(self.drift.state(), false),
            AccountMeta::new(self.drift.user(&user, PRIMARY_SUB_ACCOUNT), false),
            AccountMeta::new(self.drift.user_stats(&user), false),
            AccountMeta::new(self.drift.spot_market_vault(market_index), false),
            AccountMeta::new_readonly(self.drift.signer(), false),
            AccountMeta::new_readonly(self.drift.program_id, false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ];
        accounts.extend_from_slice(remaining);

        self.instruction(
            accounts,
            Self::data(
                "bridge_withdraw",
                &[
                    &vault_index.to_le_bytes(),
                    &market_index.to_le_bytes(),
                    &amount.to_le_bytes(),
                ],
            ),
        )
    }

    // ========================================
    // TRANSACTIONS
    // ========================================

    /// Serializes an unsigned transaction paid by `payer` to base64.
    pub fn to_unsigned_transaction_base64(
        &self,
        instructions: &[Instruction],
        payer: &Pubkey,
        recent_blockhash: Hash,
    ) -> Result<String, BuilderError> {
        let message = Message::new_with_blockhash(instructions, Some(payer), &recent_blockhash);
        let transaction = Transaction::new_unsigned(message);

        let tx_bytes = bincode::serialize(&transaction)
            .map_err(|e| BuilderError::SerializationError(e.to_string()))?;

        debug!(
            "Built unsigned tx with {} instructions ({} bytes)",
            instructions.len(),
            tx_bytes.len()
        );

        Ok(BASE64.encode(&tx_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;

    fn config() -> ClientConfig {
        let mut config = ClientConfig::with_defaults().unwrap();
        config.markets.insert(0, Pubkey::new_unique());
        config
    }

    fn keys(ix: &Instruction) -> Vec<Pubkey> {
        ix.accounts.iter().map(|m| m.pubkey).collect()
    }

    #[test]
    fn test_discriminator_matches_anchor() {
        assert_eq!(
            InstructionBuilder::discriminator("deposit"),
            [242, 35, 198, 137, 82, 225, 242, 182]
        );
        assert_eq!(
            InstructionBuilder::discriminator("withdraw"),
            [183, 18, 70, 156, 148, 109, 161, 34]
        );
    }

    #[test]
    fn test_deposit_layout() {
        let config = config();
        let builder = InstructionBuilder::new(&config);
        let wallet = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let pda = builder.addresses();
        let (user, _) = pda.user(&wallet);

        let ix = builder.deposit(&wallet, &mint, 1, 2_000_000);

        assert_eq!(ix.program_id, config.program_id);
        assert_eq!(
            keys(&ix),
            vec![
                wallet,
                user,
                pda.vault(1).0,
                pda.position(&user, 1).0,
                spl_associated_token_account::get_associated_token_address(&wallet, &mint),
                pda.vault_custody(1).0,
                spl_token::id(),
            ]
        );
        assert!(ix.accounts[0].is_signer);
        assert!(!ix.accounts[0].is_writable);
        assert!(ix.accounts[4].is_writable);

        assert_eq!(&ix.data[..8], &InstructionBuilder::discriminator("deposit"));
        assert_eq!(&ix.data[8..10], &1u16.to_le_bytes());
        assert_eq!(&ix.data[10..18], &2_000_000u64.to_le_bytes());
    }

    #[test]
    fn test_register_vault_claims_the_mint() {
        let builder = InstructionBuilder::new(&config());
        let admin = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let pda = builder.addresses();

        let ix = builder.register_vault(&admin, &mint, 2);

        assert_eq!(ix.accounts.len(), 9);
        assert_eq!(ix.accounts[4].pubkey, pda.mint_registration(&mint).0);
        assert!(ix.accounts[4].is_writable);
        assert_eq!(ix.accounts[5].pubkey, pda.vault(2).0);
    }

    #[test]
    fn test_withdraw_includes_program_signer() {
        let builder = InstructionBuilder::new(&config());
        let wallet = Pubkey::new_unique();

        let ix = builder.withdraw(&wallet, &Pubkey::new_unique(), 0, 500_000);

        assert_eq!(ix.accounts.len(), 9);
        assert_eq!(ix.accounts[2].pubkey, builder.addresses().program_signer().0);
        assert!(!ix.accounts[2].is_writable);
    }

    #[test]
    fn test_bridge_deposit_appends_remaining_accounts() {
        let builder = InstructionBuilder::new(&config());
        let wallet = Pubkey::new_unique();
        let remaining = builder.bridge_remaining_accounts(&[0]).unwrap();
        let (user, _) = builder.addresses().user(&wallet);
        let drift = builder.drift_addresses();

        let ix = builder.bridge_deposit(&wallet, &wallet, 0, 0, 1_000, &remaining);

        assert_eq!(ix.accounts.len(), 14 + remaining.len());
        assert_eq!(ix.accounts[9].pubkey, drift.user(&user, 0));
        assert_eq!(ix.accounts[10].pubkey, drift.user_stats(&user));
        assert_eq!(ix.accounts[11].pubkey, drift.spot_market_vault(0));
        assert_eq!(ix.accounts[12].pubkey, drift.program_id);
        assert_eq!(&ix.accounts[14..], &remaining[..]);
        assert_eq!(ix.data.len(), 8 + 2 + 2 + 8);
    }

    #[test]
    fn test_bridge_withdraw_includes_drift_signer() {
        let builder = InstructionBuilder::new(&config());
        let admin = Pubkey::new_unique();
        let wallet = Pubkey::new_unique();

        let ix = builder.bridge_withdraw(&admin, &wallet, 0, 0, 1_000, &[]);

        assert_eq!(ix.accounts.len(), 14);
        assert_eq!(ix.accounts[0].pubkey, admin);
        assert!(ix.accounts[0].is_signer);
        assert_eq!(ix.accounts[11].pubkey, builder.drift_addresses().signer());
    }

    #[test]
    fn test_unknown_market_is_reported() {
        let builder = InstructionBuilder::new(&config());
        assert!(matches!(
            builder.bridge_remaining_accounts(&[9]),
            Err(BuilderError::Discovery(DiscoveryError::UnknownMarket(9)))
        ));
    }

    #[test]
    fn test_unsigned_transaction_roundtrips() {
        let builder = InstructionBuilder::new(&config());
        let wallet = Pubkey::new_unique();
        let ix = builder.init_user(&wallet);

        let encoded = builder
            .to_unsigned_transaction_base64(&[ix], &wallet, Hash::default())
            .unwrap();
        let bytes = BASE64.decode(encoded).unwrap();
        let tx: Transaction = bincode::deserialize(&bytes).unwrap();

        assert_eq!(tx.message.account_keys[0], wallet);
        assert_eq!(tx.signatures.len(), 1);
        assert_eq!(tx.message.instructions.len(), 1);
    }
}
