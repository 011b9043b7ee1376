//! # Instructions Module
//!
//! | Instruction | Who Can Call | Description |
//! |-------------|--------------|-------------|
//! | `init_program_registry` | Deployer (once) | Create the registry, become admin |
//! | `register_vault` | Admin | Add a supported mint |
//! | `init_user` | Any wallet (once) | Create the caller's `User` record |
//! | `init_position` | User | Open a position on a vault |
//! | `deposit` | User | Wallet → pooled vault |
//! | `withdraw` | User | Pooled vault → wallet |
//! | `init_external_account` | User or admin | Create the Drift stats record |
//! | `init_external_sub_account` | User or admin | Create a Drift sub-account |
//! | `bridge_deposit` | User or admin | Pooled vault → Drift |
//! | `bridge_withdraw` | User or admin | Drift → pooled vault |
//!
//! ## Instruction Flow:
//!
//! ```text
//! init_program_registry → register_vault
//!                               ↓
//! init_user → init_position → deposit ⇄ withdraw
//!     ↓
//! init_external_account → init_external_sub_account(0)
//!                               ↓
//!                 bridge_deposit ⇄ bridge_withdraw
//! ```

pub mod bridge_deposit;
pub mod bridge_withdraw;
pub mod deposit;
pub mod init_external_account;
pub mod init_position;
pub mod init_program_registry;
pub mod init_user;
pub mod register_vault;
pub mod withdraw;

pub use bridge_deposit::*;
pub use bridge_withdraw::*;
pub use deposit::*;
pub use init_external_account::*;
pub use init_position::*;
pub use init_program_registry::*;
pub use init_user::*;
pub use register_vault::*;
pub use withdraw::*;
