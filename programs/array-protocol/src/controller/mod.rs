//! # Ledger Controller
//!
//! Pure balance transitions shared by every instruction handler. Handlers
//! stage an update first, perform the token or Drift call, and only then
//! commit:
//!
//! ```text
//! stage_*(&vault, &position, amount)  → BalanceUpdate   (all checks, no writes)
//!            ↓
//! token::transfer / Drift CPI         → may fail, nothing written yet
//!            ↓
//! update.commit(&mut vault, &mut position)
//! ```
//!
//! ## Split policy
//!
//! `deposited_amount` is the position's logical balance. `deployed_amount`
//! is the principal currently sitting in Drift. Bridging moves value between
//! the local and deployed halves. When a bridge withdrawal returns more than
//! the deployed principal, the surplus is realized yield and is credited to
//! `deposited_amount` and to the vault's local balance together, so
//!
//! ```text
//! Σ position.deposited_amount == vault.balance + vault.deployed_balance
//! ```
//!
//! holds after every instruction.
//!
//! The account guards the handlers run before staging live here as well,
//! so each error kind they report is covered without a runtime.

use anchor_lang::prelude::*;

use crate::errors::ArrayError;
use crate::ids;
use crate::state::{ProgramRegistry, SupportedTokenVault, User, UserPosition};

/// Balances of one vault and one of its positions, computed but not yet
/// written back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BalanceUpdate {
    pub vault_balance: u64,
    pub vault_deployed: u64,
    pub position_deposited: u64,
    pub position_deployed: u64,
    pub position_market: Option<u16>,
}

impl BalanceUpdate {
    fn snapshot(vault: &SupportedTokenVault, position: &UserPosition) -> Self {
        Self {
            vault_balance: vault.balance,
            vault_deployed: vault.deployed_balance,
            position_deposited: position.deposited_amount,
            position_deployed: position.deployed_amount,
            position_market: position.external_market,
        }
    }

    pub fn commit(self, vault: &mut SupportedTokenVault, position: &mut UserPosition) {
        vault.balance = self.vault_balance;
        vault.deployed_balance = self.vault_deployed;
        position.deposited_amount = self.position_deposited;
        position.deployed_amount = self.position_deployed;
        position.external_market = self.position_market;
    }
}

/// How a bridge withdrawal was split between returned principal and yield.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Settlement {
    pub principal: u64,
    pub realized_yield: u64,
}

fn add(a: u64, b: u64) -> Result<u64> {
    a.checked_add(b).ok_or_else(|| error!(ArrayError::ArithmeticOverflow))
}

fn sub(a: u64, b: u64) -> Result<u64> {
    a.checked_sub(b).ok_or_else(|| error!(ArrayError::ArithmeticOverflow))
}

// ========================================
// REGISTRY TRANSITIONS
// ========================================

/// The registry can only be created by the pinned admin wallet.
pub fn ensure_initial_admin(signer: &Pubkey) -> Result<()> {
    require_keys_eq!(*signer, ids::admin::ID, ArrayError::Unauthorized);
    Ok(())
}

pub fn ensure_uninitialized(initialized: bool) -> Result<()> {
    require!(!initialized, ArrayError::AlreadyInitialized);
    Ok(())
}

pub fn ensure_vault_registered(registry: &ProgramRegistry, vault_index: u16) -> Result<()> {
    require!(registry.has_vault(vault_index), ArrayError::VaultNotFound);
    Ok(())
}

/// Hands out the next vault index and bumps the registry count.
///
/// The count is a `u16`; registering past `u16::MAX` fails with
/// `ArithmeticOverflow` and leaves the registry unchanged.
pub fn assign_vault_index(registry: &mut ProgramRegistry) -> Result<u16> {
    let vault_index = registry.vault_count;
    registry.vault_count = vault_index
        .checked_add(1)
        .ok_or_else(|| error!(ArrayError::ArithmeticOverflow))?;
    Ok(vault_index)
}

/// Bridge instructions may be driven by the position owner or by the
/// registry admin acting as operator.
pub fn ensure_operator(registry: &ProgramRegistry, user: &User, signer: &Pubkey) -> Result<()> {
    require!(
        user.authority == *signer || registry.is_admin(signer),
        ArrayError::Unauthorized
    );
    Ok(())
}

// ========================================
// ACCOUNT GUARDS
// ========================================

pub fn ensure_owner(user: &User, signer: &Pubkey) -> Result<()> {
    require_keys_eq!(user.authority, *signer, ArrayError::Unauthorized);
    Ok(())
}

/// `address` must be the `User` PDA of the record's own wallet.
pub fn ensure_user_address(address: &Pubkey, user: &User) -> Result<()> {
    let expected = Pubkey::create_program_address(
        &[User::SEED_PREFIX, user.authority.as_ref(), &[user.bump]],
        &crate::ID,
    )
    .map_err(|_| error!(ArrayError::AddressMismatch))?;
    require_keys_eq!(*address, expected, ArrayError::AddressMismatch);
    Ok(())
}

/// A position belongs to exactly one user and one vault.
pub fn ensure_position_of(position: &UserPosition, user: &Pubkey, vault_index: u16) -> Result<()> {
    require!(
        position.user == *user && position.vault_index == vault_index,
        ArrayError::PositionNotFound
    );
    Ok(())
}

/// A wallet token account used for deposit or withdraw must hold the
/// vault's mint and belong to the signer.
pub fn check_wallet_account(
    token_mint: &Pubkey,
    token_owner: &Pubkey,
    vault_mint: &Pubkey,
    authority: &Pubkey,
) -> Result<()> {
    require_keys_eq!(*token_mint, *vault_mint, ArrayError::AddressMismatch);
    require_keys_eq!(*token_owner, *authority, ArrayError::Unauthorized);
    Ok(())
}

/// The venue must report at least what is about to be withdrawn.
pub fn ensure_external_balance(reported: u64, amount: u64) -> Result<()> {
    if reported < amount {
        msg!("External balance {} is below requested {}", reported, amount);
        return err!(ArrayError::InsufficientBalance);
    }
    Ok(())
}

/// The first bridge deposit binds a position to its Drift market. Every
/// later bridge call must name the same market.
pub fn bind_market(position: &UserPosition, market_index: u16) -> Result<u16> {
    match position.external_market {
        Some(bound) if bound != market_index => {
            msg!("Position is bound to market {}, got {}", bound, market_index);
            err!(ArrayError::AddressMismatch)
        }
        _ => Ok(market_index),
    }
}

/// Drift creates sub-accounts strictly in order. Returns the counter value
/// to store once the sub-account exists.
pub fn next_sub_account(user: &User, sub_account_id: u16) -> Result<u16> {
    require!(
        sub_account_id == user.external_sub_accounts,
        ArrayError::AddressMismatch
    );
    user.external_sub_accounts
        .checked_add(1)
        .ok_or_else(|| error!(ArrayError::ArithmeticOverflow))
}

// ========================================
// BALANCE TRANSITIONS
// ========================================

pub fn stage_deposit(
    vault: &SupportedTokenVault,
    position: &UserPosition,
    amount: u64,
) -> Result<BalanceUpdate> {
    require!(amount > 0, ArrayError::InvalidAmount);

    let mut update = BalanceUpdate::snapshot(vault, position);
    update.vault_balance = add(vault.balance, amount)?;
    update.position_deposited = add(position.deposited_amount, amount)?;
    Ok(update)
}

/// Only the local half of a position can be withdrawn; deployed funds must
/// be bridged back first.
pub fn stage_withdraw(
    vault: &SupportedTokenVault,
    position: &UserPosition,
    amount: u64,
) -> Result<BalanceUpdate> {
    require!(amount > 0, ArrayError::InvalidAmount);
    require!(
        position.local_amount() >= amount,
        ArrayError::InsufficientBalance
    );
    require!(vault.balance >= amount, ArrayError::InsufficientBalance);

    let mut update = BalanceUpdate::snapshot(vault, position);
    update.vault_balance = sub(vault.balance, amount)?;
    update.position_deposited = sub(position.deposited_amount, amount)?;
    Ok(update)
}

pub fn stage_bridge_deposit(
    vault: &SupportedTokenVault,
    position: &UserPosition,
    market_index: u16,
    amount: u64,
) -> Result<BalanceUpdate> {
    require!(amount > 0, ArrayError::InvalidAmount);
    let market = bind_market(position, market_index)?;
    require!(
        position.local_amount() >= amount,
        ArrayError::InsufficientBalance
    );
    require!(vault.balance >= amount, ArrayError::InsufficientBalance);

    let mut update = BalanceUpdate::snapshot(vault, position);
    update.vault_balance = sub(vault.balance, amount)?;
    update.vault_deployed = add(vault.deployed_balance, amount)?;
    update.position_deployed = add(position.deployed_amount, amount)?;
    update.position_market = Some(market);
    Ok(update)
}

/// `amount` is what Drift actually paid back into custody. Anything above
/// the deployed principal is yield. A position that was never bridged has
/// nothing to withdraw.
pub fn stage_bridge_withdraw(
    vault: &SupportedTokenVault,
    position: &UserPosition,
    market_index: u16,
    amount: u64,
) -> Result<(BalanceUpdate, Settlement)> {
    require!(amount > 0, ArrayError::InvalidAmount);
    require!(
        position.external_market.is_some(),
        ArrayError::PositionNotFound
    );
    bind_market(position, market_index)?;

    let principal = amount.min(position.deployed_amount);
    let settlement = Settlement {
        principal,
        realized_yield: amount - principal,
    };

    let mut update = BalanceUpdate::snapshot(vault, position);
    update.vault_balance = add(vault.balance, amount)?;
    update.vault_deployed = sub(vault.deployed_balance, principal)?;
    update.position_deployed = sub(position.deployed_amount, principal)?;
    update.position_deposited = add(position.deposited_amount, settlement.realized_yield)?;
    Ok((update, settlement))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MintRegistration;
    use anchor_lang::error::Error;
    use std::collections::HashMap;

    fn code(err: Error) -> u32 {
        match err {
            Error::AnchorError(e) => e.error_code_number,
            Error::ProgramError(e) => panic!("unexpected program error: {e:?}"),
        }
    }

    fn assert_err<T: std::fmt::Debug>(result: Result<T>, expected: ArrayError) {
        assert_eq!(code(result.unwrap_err()), u32::from(expected));
    }

    /// In-memory stand-in for the accounts a sequence of instructions
    /// touches. Token balances are tracked next to the ledger so every
    /// scenario can also check custody.
    struct Ledger {
        registry: ProgramRegistry,
        vaults: Vec<SupportedTokenVault>,
        custody: Vec<u64>,
        mints: HashMap<Pubkey, MintRegistration>,
        users: HashMap<Pubkey, User>,
        positions: HashMap<(Pubkey, u16), UserPosition>,
        wallets: HashMap<Pubkey, u64>,
        /// Tokens each user holds inside Drift, per vault.
        venue: HashMap<(Pubkey, u16), u64>,
    }

    impl Ledger {
        fn new(admin: Pubkey) -> Self {
            let registry = ProgramRegistry {
                admin,
                signer: Pubkey::new_unique(),
                ..Default::default()
            };
            Self {
                registry,
                vaults: Vec::new(),
                custody: Vec::new(),
                mints: HashMap::new(),
                users: HashMap::new(),
                positions: HashMap::new(),
                wallets: HashMap::new(),
                venue: HashMap::new(),
            }
        }

        fn register_vault(&mut self, caller: Pubkey) -> Result<u16> {
            self.register_mint(caller, Pubkey::new_unique())
        }

        fn register_mint(&mut self, caller: Pubkey, mint: Pubkey) -> Result<u16> {
            require!(self.registry.is_admin(&caller), ArrayError::Unauthorized);
            let taken = self.mints.get(&mint).map(MintRegistration::is_initialized);
            ensure_uninitialized(taken.unwrap_or(false))?;
            let vault_index = assign_vault_index(&mut self.registry)?;
            self.mints.insert(
                mint,
                MintRegistration {
                    mint,
                    vault_index,
                    bump: 0,
                },
            );
            self.vaults.push(SupportedTokenVault {
                mint,
                vault_index,
                custody: Pubkey::new_unique(),
                ..Default::default()
            });
            self.custody.push(0);
            Ok(vault_index)
        }

        fn init_user(&mut self, wallet: Pubkey) -> Result<()> {
            let existing = self.users.get(&wallet).map(User::is_initialized);
            ensure_uninitialized(existing.unwrap_or(false))?;
            self.users.insert(
                wallet,
                User {
                    authority: wallet,
                    ..Default::default()
                },
            );
            Ok(())
        }

        fn init_position(&mut self, wallet: Pubkey, vault_index: u16) -> Result<()> {
            ensure_vault_registered(&self.registry, vault_index)?;
            require!(self.users.contains_key(&wallet), ArrayError::Unauthorized);
            let existing = self.positions.get(&(wallet, vault_index));
            ensure_uninitialized(existing.map(UserPosition::is_initialized).unwrap_or(false))?;
            self.positions.insert(
                (wallet, vault_index),
                UserPosition {
                    user: wallet,
                    vault_index,
                    custody: Pubkey::new_unique(),
                    ..Default::default()
                },
            );
            Ok(())
        }

        fn position(&self, wallet: Pubkey, vault_index: u16) -> &UserPosition {
            &self.positions[&(wallet, vault_index)]
        }

        fn deposit(&mut self, wallet: Pubkey, vault_index: u16, amount: u64) -> Result<()> {
            ensure_vault_registered(&self.registry, vault_index)?;
            let position = self
                .positions
                .get_mut(&(wallet, vault_index))
                .ok_or(ArrayError::PositionNotFound)?;
            let vault = &mut self.vaults[vault_index as usize];
            let update = stage_deposit(vault, position, amount)?;

            let held = self.wallets.entry(wallet).or_default();
            require!(*held >= amount, ArrayError::ExternalCallFailed);
            *held -= amount;
            self.custody[vault_index as usize] += amount;

            update.commit(vault, position);
            Ok(())
        }

        fn withdraw(&mut self, wallet: Pubkey, vault_index: u16, amount: u64) -> Result<()> {
            let position = self
                .positions
                .get_mut(&(wallet, vault_index))
                .ok_or(ArrayError::PositionNotFound)?;
            let vault = &mut self.vaults[vault_index as usize];
            let update = stage_withdraw(vault, position, amount)?;

            self.custody[vault_index as usize] -= amount;
            *self.wallets.entry(wallet).or_default() += amount;

            update.commit(vault, position);
            Ok(())
        }

        fn bridge_deposit(&mut self, wallet: Pubkey, vault_index: u16, amount: u64) -> Result<()> {
            let position = self
                .positions
                .get_mut(&(wallet, vault_index))
                .ok_or(ArrayError::PositionNotFound)?;
            let vault = &mut self.vaults[vault_index as usize];
            let update = stage_bridge_deposit(vault, position, vault_index, amount)?;

            self.custody[vault_index as usize] -= amount;
            *self.venue.entry((wallet, vault_index)).or_default() += amount;

            update.commit(vault, position);
            Ok(())
        }

        fn bridge_withdraw(
            &mut self,
            wallet: Pubkey,
            vault_index: u16,
            amount: u64,
        ) -> Result<Settlement> {
            let reported = self.venue.get(&(wallet, vault_index)).copied().unwrap_or(0);
            ensure_external_balance(reported, amount)?;

            let position = self
                .positions
                .get_mut(&(wallet, vault_index))
                .ok_or(ArrayError::PositionNotFound)?;
            let vault = &mut self.vaults[vault_index as usize];
            let (update, settlement) = stage_bridge_withdraw(vault, position, vault_index, amount)?;

            *self.venue.entry((wallet, vault_index)).or_default() -= amount;
            self.custody[vault_index as usize] += amount;

            update.commit(vault, position);
            Ok(settlement)
        }

        /// Drift paying interest into a user's sub-account.
        fn accrue(&mut self, wallet: Pubkey, vault_index: u16, amount: u64) {
            *self.venue.entry((wallet, vault_index)).or_default() += amount;
        }

        fn assert_conserved(&self, vault_index: u16) {
            let vault = &self.vaults[vault_index as usize];
            let deposited: u64 = self
                .positions
                .values()
                .filter(|p| p.vault_index == vault_index)
                .map(|p| p.deposited_amount)
                .sum();
            assert_eq!(deposited, vault.balance + vault.deployed_balance);
            assert_eq!(vault.balance, self.custody[vault_index as usize]);
        }
    }

    fn funded_ledger(users: &[(Pubkey, u64)]) -> (Ledger, u16) {
        let admin = Pubkey::new_unique();
        let mut ledger = Ledger::new(admin);
        let vault_index = ledger.register_vault(admin).unwrap();
        for (wallet, funds) in users {
            ledger.wallets.insert(*wallet, *funds);
            ledger.init_user(*wallet).unwrap();
            ledger.init_position(*wallet, vault_index).unwrap();
        }
        (ledger, vault_index)
    }

    #[test]
    fn register_vault_assigns_sequential_indices() {
        let admin = Pubkey::new_unique();
        let mut ledger = Ledger::new(admin);
        assert_eq!(ledger.register_vault(admin).unwrap(), 0);
        assert_eq!(ledger.register_vault(admin).unwrap(), 1);
        assert_eq!(ledger.registry.vault_count, 2);
        assert_eq!(ledger.vaults[1].vault_index, 1);
    }

    #[test]
    fn register_vault_rejects_non_admin() {
        let mut ledger = Ledger::new(Pubkey::new_unique());
        assert_err(ledger.register_vault(Pubkey::new_unique()), ArrayError::Unauthorized);
        assert_eq!(ledger.registry.vault_count, 0);
    }

    #[test]
    fn vault_count_overflow_is_reported() {
        let mut registry = ProgramRegistry {
            vault_count: u16::MAX,
            ..Default::default()
        };
        assert_err(assign_vault_index(&mut registry), ArrayError::ArithmeticOverflow);
        assert_eq!(registry.vault_count, u16::MAX);
    }

    #[test]
    fn init_user_twice_keeps_first_record() {
        let wallet = Pubkey::new_unique();
        let (mut ledger, _) = funded_ledger(&[(wallet, 0)]);
        ledger.users.get_mut(&wallet).unwrap().external_sub_accounts = 1;

        assert_err(ledger.init_user(wallet), ArrayError::AlreadyInitialized);
        assert_eq!(ledger.users[&wallet].authority, wallet);
        assert_eq!(ledger.users[&wallet].external_sub_accounts, 1);
    }

    #[test]
    fn init_position_requires_registered_vault() {
        let wallet = Pubkey::new_unique();
        let (mut ledger, _) = funded_ledger(&[(wallet, 0)]);
        assert_err(ledger.init_position(wallet, 7), ArrayError::VaultNotFound);
    }

    #[test]
    fn init_position_twice_fails() {
        let wallet = Pubkey::new_unique();
        let (mut ledger, vault_index) = funded_ledger(&[(wallet, 0)]);
        assert_err(
            ledger.init_position(wallet, vault_index),
            ArrayError::AlreadyInitialized,
        );
    }

    #[test]
    fn deposit_then_withdraw_everything_returns_to_zero() {
        let wallet = Pubkey::new_unique();
        let (mut ledger, v) = funded_ledger(&[(wallet, 2_000_000)]);

        ledger.deposit(wallet, v, 2_000_000).unwrap();
        ledger.withdraw(wallet, v, 2_000_000).unwrap();

        assert_eq!(ledger.vaults[v as usize].balance, 0);
        assert_eq!(ledger.position(wallet, v).deposited_amount, 0);
        assert_eq!(ledger.wallets[&wallet], 2_000_000);
        ledger.assert_conserved(v);
    }

    #[test]
    fn partial_withdraw_scenario() {
        let wallet = Pubkey::new_unique();
        let (mut ledger, v) = funded_ledger(&[(wallet, 2_000_000)]);

        ledger.deposit(wallet, v, 2_000_000).unwrap();
        assert_eq!(ledger.vaults[v as usize].balance, 2_000_000);
        assert_eq!(ledger.position(wallet, v).deposited_amount, 2_000_000);
        assert_eq!(ledger.custody[v as usize], 2_000_000);

        ledger.withdraw(wallet, v, 500_000).unwrap();
        assert_eq!(ledger.vaults[v as usize].balance, 1_500_000);
        assert_eq!(ledger.position(wallet, v).deposited_amount, 1_500_000);
        ledger.assert_conserved(v);
    }

    #[test]
    fn two_users_share_one_vault() {
        let alice = Pubkey::new_unique();
        let bob = Pubkey::new_unique();
        let (mut ledger, v) = funded_ledger(&[(alice, 1_000), (bob, 1_000)]);

        ledger.deposit(alice, v, 300).unwrap();
        ledger.deposit(bob, v, 100).unwrap();

        assert_eq!(ledger.vaults[v as usize].balance, 400);
        assert_eq!(ledger.position(alice, v).deposited_amount, 300);
        assert_eq!(ledger.position(bob, v).deposited_amount, 100);
        ledger.assert_conserved(v);
    }

    #[test]
    fn over_withdraw_leaves_state_unchanged() {
        let wallet = Pubkey::new_unique();
        let (mut ledger, v) = funded_ledger(&[(wallet, 1_000)]);
        ledger.deposit(wallet, v, 1_000).unwrap();

        assert_err(ledger.withdraw(wallet, v, 1_001), ArrayError::InsufficientBalance);
        assert_eq!(ledger.vaults[v as usize].balance, 1_000);
        assert_eq!(ledger.position(wallet, v).deposited_amount, 1_000);
    }

    #[test]
    fn zero_amounts_are_rejected() {
        let wallet = Pubkey::new_unique();
        let (mut ledger, v) = funded_ledger(&[(wallet, 1_000)]);

        assert_err(ledger.deposit(wallet, v, 0), ArrayError::InvalidAmount);
        assert_err(ledger.withdraw(wallet, v, 0), ArrayError::InvalidAmount);
        assert_err(ledger.bridge_deposit(wallet, v, 0), ArrayError::InvalidAmount);
        assert_eq!(ledger.vaults[v as usize].balance, 0);
        assert_eq!(ledger.wallets[&wallet], 1_000);
    }

    #[test]
    fn failed_transfer_commits_nothing() {
        let wallet = Pubkey::new_unique();
        let (mut ledger, v) = funded_ledger(&[(wallet, 50)]);

        assert_err(ledger.deposit(wallet, v, 51), ArrayError::ExternalCallFailed);
        assert_eq!(ledger.vaults[v as usize].balance, 0);
        assert_eq!(ledger.position(wallet, v).deposited_amount, 0);
    }

    #[test]
    fn deposit_overflow_is_reported_before_transfer() {
        let vault = SupportedTokenVault {
            balance: u64::MAX,
            ..Default::default()
        };
        let position = UserPosition::default();
        assert_err(stage_deposit(&vault, &position, 1), ArrayError::ArithmeticOverflow);
    }

    #[test]
    fn bridged_funds_cannot_be_withdrawn_locally() {
        let wallet = Pubkey::new_unique();
        let (mut ledger, v) = funded_ledger(&[(wallet, 1_000)]);
        ledger.deposit(wallet, v, 1_000).unwrap();
        ledger.bridge_deposit(wallet, v, 700).unwrap();

        let position = ledger.position(wallet, v);
        assert_eq!(position.deposited_amount, 1_000);
        assert_eq!(position.deployed_amount, 700);
        assert_eq!(ledger.vaults[v as usize].balance, 300);
        assert_eq!(ledger.vaults[v as usize].deployed_balance, 700);

        assert_err(ledger.withdraw(wallet, v, 301), ArrayError::InsufficientBalance);
        assert_err(ledger.bridge_deposit(wallet, v, 301), ArrayError::InsufficientBalance);
        ledger.withdraw(wallet, v, 300).unwrap();
        ledger.assert_conserved(v);
    }

    #[test]
    fn bridge_round_trip_without_yield() {
        let wallet = Pubkey::new_unique();
        let (mut ledger, v) = funded_ledger(&[(wallet, 2_000_000)]);
        ledger.deposit(wallet, v, 2_000_000).unwrap();

        ledger.bridge_deposit(wallet, v, 1_500_000).unwrap();
        ledger.assert_conserved(v);
        let settlement = ledger.bridge_withdraw(wallet, v, 1_500_000).unwrap();

        assert_eq!(
            settlement,
            Settlement {
                principal: 1_500_000,
                realized_yield: 0
            }
        );
        let position = ledger.position(wallet, v);
        assert_eq!(position.deposited_amount, 2_000_000);
        assert_eq!(position.deployed_amount, 0);
        assert_eq!(ledger.vaults[v as usize].balance, 2_000_000);
        assert_eq!(ledger.vaults[v as usize].deployed_balance, 0);
        ledger.assert_conserved(v);
    }

    #[test]
    fn bridge_withdraw_credits_yield_to_the_position() {
        let alice = Pubkey::new_unique();
        let bob = Pubkey::new_unique();
        let (mut ledger, v) = funded_ledger(&[(alice, 1_000), (bob, 500)]);
        ledger.deposit(alice, v, 1_000).unwrap();
        ledger.deposit(bob, v, 500).unwrap();

        ledger.bridge_deposit(alice, v, 800).unwrap();
        ledger.accrue(alice, v, 40);
        let settlement = ledger.bridge_withdraw(alice, v, 840).unwrap();

        assert_eq!(settlement.principal, 800);
        assert_eq!(settlement.realized_yield, 40);
        assert_eq!(ledger.position(alice, v).deposited_amount, 1_040);
        assert_eq!(ledger.position(alice, v).deployed_amount, 0);
        assert_eq!(ledger.position(bob, v).deposited_amount, 500);
        assert_eq!(ledger.vaults[v as usize].balance, 1_540);
        ledger.assert_conserved(v);

        ledger.withdraw(alice, v, 1_040).unwrap();
        assert_eq!(ledger.wallets[&alice], 1_040);
        ledger.assert_conserved(v);
    }

    #[test]
    fn partial_bridge_withdraw_keeps_remaining_principal_deployed() {
        let wallet = Pubkey::new_unique();
        let (mut ledger, v) = funded_ledger(&[(wallet, 1_000)]);
        ledger.deposit(wallet, v, 1_000).unwrap();
        ledger.bridge_deposit(wallet, v, 1_000).unwrap();

        ledger.bridge_withdraw(wallet, v, 400).unwrap();

        assert_eq!(ledger.position(wallet, v).deployed_amount, 600);
        assert_eq!(ledger.position(wallet, v).local_amount(), 400);
        assert_eq!(ledger.vaults[v as usize].deployed_balance, 600);
        ledger.assert_conserved(v);
    }

    #[test]
    fn bridge_withdraw_beyond_reported_balance_fails() {
        let wallet = Pubkey::new_unique();
        let (mut ledger, v) = funded_ledger(&[(wallet, 1_000)]);
        ledger.deposit(wallet, v, 1_000).unwrap();
        ledger.bridge_deposit(wallet, v, 500).unwrap();

        assert_err(ledger.bridge_withdraw(wallet, v, 501), ArrayError::InsufficientBalance);
        assert_eq!(ledger.position(wallet, v).deployed_amount, 500);
    }

    #[test]
    fn operator_is_owner_or_admin() {
        let admin = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let registry = ProgramRegistry {
            admin,
            ..Default::default()
        };
        let user = User {
            authority: owner,
            ..Default::default()
        };

        assert!(ensure_operator(&registry, &user, &owner).is_ok());
        assert!(ensure_operator(&registry, &user, &admin).is_ok());
        assert_err(
            ensure_operator(&registry, &user, &Pubkey::new_unique()),
            ArrayError::Unauthorized,
        );
    }

    #[test]
    fn sub_accounts_are_created_in_order() {
        let mut user = User::default();
        assert_err(next_sub_account(&user, 1), ArrayError::AddressMismatch);

        user.external_sub_accounts = next_sub_account(&user, 0).unwrap();
        assert!(user.has_primary_sub_account());
        assert_eq!(next_sub_account(&user, 1).unwrap(), 2);
    }

    #[test]
    fn a_mint_backs_at_most_one_vault() {
        let admin = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let mut ledger = Ledger::new(admin);
        assert_eq!(ledger.register_mint(admin, mint).unwrap(), 0);

        assert_err(ledger.register_mint(admin, mint), ArrayError::AlreadyInitialized);
        assert_eq!(ledger.registry.vault_count, 1);
        assert_eq!(ledger.mints[&mint].vault_index, 0);
        assert_eq!(ledger.register_vault(admin).unwrap(), 1);
    }

    #[test]
    fn only_the_pinned_admin_creates_the_registry() {
        ensure_initial_admin(&ids::admin::ID).unwrap();
        assert_err(
            ensure_initial_admin(&Pubkey::new_unique()),
            ArrayError::Unauthorized,
        );
    }

    #[test]
    fn wallet_account_of_another_owner_is_unauthorized() {
        let mint = Pubkey::new_unique();
        let authority = Pubkey::new_unique();

        check_wallet_account(&mint, &authority, &mint, &authority).unwrap();
        assert_err(
            check_wallet_account(&mint, &Pubkey::new_unique(), &mint, &authority),
            ArrayError::Unauthorized,
        );
    }

    #[test]
    fn wallet_account_of_another_mint_is_a_mismatch() {
        let authority = Pubkey::new_unique();
        assert_err(
            check_wallet_account(
                &Pubkey::new_unique(),
                &authority,
                &Pubkey::new_unique(),
                &authority,
            ),
            ArrayError::AddressMismatch,
        );
    }

    #[test]
    fn user_record_must_belong_to_signer() {
        let wallet = Pubkey::new_unique();
        let user = User {
            authority: wallet,
            ..Default::default()
        };
        ensure_owner(&user, &wallet).unwrap();
        assert_err(ensure_owner(&user, &Pubkey::new_unique()), ArrayError::Unauthorized);
    }

    #[test]
    fn user_record_must_sit_at_its_derived_address() {
        let wallet = Pubkey::new_unique();
        let (address, bump) =
            Pubkey::find_program_address(&[User::SEED_PREFIX, wallet.as_ref()], &crate::ID);
        let user = User {
            authority: wallet,
            external_sub_accounts: 1,
            bump,
        };

        ensure_user_address(&address, &user).unwrap();
        assert_err(
            ensure_user_address(&Pubkey::new_unique(), &user),
            ArrayError::AddressMismatch,
        );
    }

    #[test]
    fn position_of_another_vault_is_not_found() {
        let user = Pubkey::new_unique();
        let position = UserPosition {
            user,
            vault_index: 2,
            ..Default::default()
        };
        ensure_position_of(&position, &user, 2).unwrap();
        assert_err(ensure_position_of(&position, &user, 3), ArrayError::PositionNotFound);
        assert_err(
            ensure_position_of(&position, &Pubkey::new_unique(), 2),
            ArrayError::PositionNotFound,
        );
    }

    #[test]
    fn first_bridge_deposit_binds_the_market() {
        let vault = SupportedTokenVault {
            balance: 1_000,
            ..Default::default()
        };
        let mut position = UserPosition {
            deposited_amount: 1_000,
            ..Default::default()
        };

        let update = stage_bridge_deposit(&vault, &position, 4, 600).unwrap();
        let mut vault = vault;
        update.commit(&mut vault, &mut position);
        assert_eq!(position.external_market, Some(4));

        assert_err(
            stage_bridge_deposit(&vault, &position, 5, 100),
            ArrayError::AddressMismatch,
        );
        assert_err(
            stage_bridge_withdraw(&vault, &position, 5, 100).map(|(u, _)| u),
            ArrayError::AddressMismatch,
        );
        stage_bridge_deposit(&vault, &position, 4, 100).unwrap();
    }

    #[test]
    fn principal_cannot_be_returned_through_another_vault() {
        // One user, two vaults. Principal bridged out of A must not come
        // back as yield on B.
        let vault_a = SupportedTokenVault {
            balance: 1_000,
            ..Default::default()
        };
        let mut position_a = UserPosition {
            deposited_amount: 1_000,
            ..Default::default()
        };
        let mut vault_a_after = vault_a.clone();
        stage_bridge_deposit(&vault_a, &position_a, 0, 1_000)
            .unwrap()
            .commit(&mut vault_a_after, &mut position_a);

        let vault_b = SupportedTokenVault::default();
        let position_b = UserPosition::default();
        assert_err(
            stage_bridge_withdraw(&vault_b, &position_b, 0, 1_000).map(|(u, _)| u),
            ArrayError::PositionNotFound,
        );
    }

    #[test]
    fn external_balance_below_request_is_insufficient() {
        ensure_external_balance(1_040, 1_040).unwrap();
        assert_err(ensure_external_balance(1_000, 1_040), ArrayError::InsufficientBalance);
    }
}
