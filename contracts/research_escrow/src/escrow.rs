//! Per-proposal token custody.
//!
//! Tokens are held by the contract address; each proposal's share of that
//! holding is tracked in its [`EscrowAccount`]. Every movement in or out of
//! custody goes through this module so the recorded balance and the token
//! transfer always change together.

use soroban_sdk::{Address, Env};

use crate::errors::EscrowError;
use crate::storage;
use crate::token;
use crate::types::EscrowAccount;

/// Creates the escrow for a new proposal, funded with `initial` from `from`.
pub fn open(
    env: &Env,
    proposal_id: u64,
    token_address: &Address,
    from: &Address,
    initial: i128,
) -> Result<EscrowAccount, EscrowError> {
    let mut escrow = EscrowAccount {
        proposal_id,
        token: token_address.clone(),
        balance: 0,
    };
    deposit(env, &mut escrow, from, initial)?;
    Ok(escrow)
}

/// Pulls `amount` from `from` into custody.
pub fn deposit(
    env: &Env,
    escrow: &mut EscrowAccount,
    from: &Address,
    amount: i128,
) -> Result<(), EscrowError> {
    if amount <= 0 {
        return Err(EscrowError::InvalidAmount);
    }
    escrow.balance = escrow
        .balance
        .checked_add(amount)
        .ok_or(EscrowError::MathOverflow)?;

    let contract_address = env.current_contract_address();
    token::transfer(env, &escrow.token, from, &contract_address, &amount);
    storage::save_escrow(env, escrow);
    Ok(())
}

/// Pays `amount` out of custody to `to`.
pub fn pay_out(
    env: &Env,
    escrow: &mut EscrowAccount,
    to: &Address,
    amount: i128,
) -> Result<(), EscrowError> {
    if amount <= 0 {
        return Err(EscrowError::InvalidAmount);
    }
    if amount > escrow.balance {
        return Err(EscrowError::InsufficientEscrow);
    }
    escrow.balance = escrow
        .balance
        .checked_sub(amount)
        .ok_or(EscrowError::MathOverflow)?;

    let contract_address = env.current_contract_address();
    token::transfer(env, &escrow.token, &contract_address, to, &amount);
    storage::save_escrow(env, escrow);
    Ok(())
}

pub fn ensure_empty(escrow: &EscrowAccount) -> Result<(), EscrowError> {
    if escrow.balance != 0 {
        return Err(EscrowError::EscrowNotEmpty);
    }
    Ok(())
}
