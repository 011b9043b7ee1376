//! Token movements into and out of custody accounts.
//!
//! Every SPL transfer the program issues goes through [`transfer_tokens`], so
//! a failing transfer is always logged and reported the same way.

use anchor_lang::prelude::*;
use anchor_spl::token::{self, Transfer};

use crate::errors::ArrayError;

/// Moves `amount` from `from` to `to`.
///
/// `signer_seeds` is empty when `authority` is a transaction signer, and holds
/// the PDA seeds when the program signs for a custody account.
pub fn transfer_tokens<'info>(
    token_program: AccountInfo<'info>,
    from: AccountInfo<'info>,
    to: AccountInfo<'info>,
    authority: AccountInfo<'info>,
    signer_seeds: &[&[&[u8]]],
    amount: u64,
) -> Result<()> {
    let cpi_context = CpiContext::new_with_signer(
        token_program,
        Transfer {
            from,
            to,
            authority,
        },
        signer_seeds,
    );

    token::transfer(cpi_context, amount).map_err(|e| {
        msg!("Token transfer of {} failed: {}", amount, e);
        error!(ArrayError::ExternalCallFailed)
    })
}
