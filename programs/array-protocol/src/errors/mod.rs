//! # Error Handling Module
//!
//! Every failure the Array Protocol program can report. Anchor assigns
//! codes starting at 6000 in declaration order, so new variants go at the
//! end of the enum.
//!
//! Errors raised by the token program or by Drift are never surfaced
//! verbatim. The handler logs the underlying cause with `msg!` and then
//! returns [`ArrayError::ExternalCallFailed`].

use anchor_lang::prelude::*;

/// # ArrayError
///
/// | Code | Variant |
/// |------|---------|
/// | 6000 | `InvalidAmount` |
/// | 6001 | `AddressMismatch` |
/// | 6002 | `InsufficientBalance` |
/// | 6003 | `Unauthorized` |
/// | 6004 | `AlreadyInitialized` |
/// | 6005 | `VaultNotFound` |
/// | 6006 | `PositionNotFound` |
/// | 6007 | `ArithmeticOverflow` |
/// | 6008 | `ExternalCallFailed` |
#[error_code]
pub enum ArrayError {
    // ============================================
    // INPUT VALIDATION ERRORS
    // ============================================

    /// Deposits, withdrawals and bridge transfers all reject zero.
    #[msg("Amount must be greater than zero")]
    InvalidAmount,

    /// A supplied account is not the one derived for this user, vault or
    /// market. Also raised when a token account's mint differs from the
    /// vault mint.
    #[msg("Account does not match its expected derived address")]
    AddressMismatch,

    // ============================================
    // BALANCE ERRORS
    // ============================================

    /// The position (or the pooled vault) holds less than requested.
    ///
    /// ## Example:
    /// ```text
    /// deposited_amount: 1000
    /// deployed_amount:   700   (sitting in Drift)
    /// local balance:     300
    ///
    /// withdraw(500) → ERROR
    /// ```
    #[msg("Insufficient balance for this operation")]
    InsufficientBalance,

    // ============================================
    // AUTHORIZATION ERRORS
    // ============================================

    /// Caller is neither the record owner nor the program administrator.
    #[msg("You are not authorized to perform this action")]
    Unauthorized,

    // ============================================
    // STATE ERRORS
    // ============================================

    /// The registry, user record or position was already created.
    #[msg("Record is already initialized")]
    AlreadyInitialized,

    /// No supported vault is registered at the requested index.
    #[msg("Vault not found")]
    VaultNotFound,

    /// The user has no position for this vault, or no Drift sub-account
    /// to bridge through.
    #[msg("Position not found")]
    PositionNotFound,

    // ============================================
    // OVERFLOW/MATH ERRORS
    // ============================================

    #[msg("Arithmetic overflow")]
    ArithmeticOverflow,

    // ============================================
    // EXTERNAL CALL ERRORS
    // ============================================

    /// A token transfer or Drift instruction failed, or moved a different
    /// amount than requested. The cause is in the program logs.
    #[msg("External program call failed")]
    ExternalCallFailed,
}
