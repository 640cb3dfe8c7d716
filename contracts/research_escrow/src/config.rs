use soroban_sdk::{Address, Env, Vec};

use crate::errors::EscrowError;
use crate::events::{AdminChangedEvent, ConfigUpdatedEvent, InitializedEvent};
use crate::storage;
use crate::types::{ProtocolConfig, ProtocolParams, BPS_DENOMINATOR};

pub fn validate_params(params: &ProtocolParams) -> Result<(), EscrowError> {
    let max_bps = BPS_DENOMINATOR as u32;
    if params.min_deposit_bps > max_bps
        || params.review_window == 0
        || params.penalty_base_bps == 0
        || params.penalty_base_bps > max_bps
        || params.max_penalties == 0
    {
        return Err(EscrowError::InvalidConfig);
    }
    Ok(())
}

pub fn validate_validators(validators: &Vec<Address>) -> Result<(), EscrowError> {
    if validators.is_empty() {
        return Err(EscrowError::InvalidConfig);
    }
    // A member listed twice would count twice toward the threshold.
    for (i, validator) in validators.iter().enumerate() {
        if validators.first_index_of(&validator) != Some(i as u32) {
            return Err(EscrowError::InvalidConfig);
        }
    }
    Ok(())
}

/// Loads the config after checking `caller` is the stored admin and has
/// signed the invocation.
pub fn require_admin(env: &Env, caller: &Address) -> Result<ProtocolConfig, EscrowError> {
    let config = storage::read_config(env)?;
    if *caller != config.admin {
        return Err(EscrowError::Unauthorized);
    }
    caller.require_auth();
    Ok(config)
}

pub fn is_validator(config: &ProtocolConfig, candidate: &Address) -> bool {
    config.validators.contains(candidate)
}

/// Smallest deposit accepted for a proposal asking `amount_asked`.
pub fn required_deposit(params: &ProtocolParams, amount_asked: i128) -> Result<i128, EscrowError> {
    amount_asked
        .checked_mul(params.min_deposit_bps as i128)
        .and_then(|v| v.checked_div(BPS_DENOMINATOR))
        .ok_or(EscrowError::MathOverflow)
}

pub fn initialize(
    env: &Env,
    admin: Address,
    treasury: Address,
    validators: Vec<Address>,
    params: ProtocolParams,
) -> Result<(), EscrowError> {
    if storage::has_config(env) {
        return Err(EscrowError::AlreadyInitialized);
    }
    admin.require_auth();
    validate_validators(&validators)?;
    validate_params(&params)?;

    let validator_count = validators.len();
    storage::write_config(
        env,
        &ProtocolConfig {
            admin: admin.clone(),
            treasury: treasury.clone(),
            validators,
            params,
        },
    );

    InitializedEvent {
        admin,
        treasury,
        validator_count,
    }
    .publish(env);

    Ok(())
}

/// Replaces the validator committee. Milestones already submitted keep the
/// committee size they were created with.
pub fn set_validators(
    env: &Env,
    admin: Address,
    validators: Vec<Address>,
) -> Result<(), EscrowError> {
    let mut config = require_admin(env, &admin)?;
    validate_validators(&validators)?;
    config.validators = validators;
    storage::write_config(env, &config);
    publish_update(env, &config);
    Ok(())
}

pub fn set_params(env: &Env, admin: Address, params: ProtocolParams) -> Result<(), EscrowError> {
    let mut config = require_admin(env, &admin)?;
    validate_params(&params)?;
    config.params = params;
    storage::write_config(env, &config);
    publish_update(env, &config);
    Ok(())
}

pub fn set_treasury(env: &Env, admin: Address, treasury: Address) -> Result<(), EscrowError> {
    let mut config = require_admin(env, &admin)?;
    config.treasury = treasury;
    storage::write_config(env, &config);
    publish_update(env, &config);
    Ok(())
}

pub fn set_admin(env: &Env, current_admin: Address, new_admin: Address) -> Result<(), EscrowError> {
    let mut config = require_admin(env, &current_admin)?;
    config.admin = new_admin.clone();
    storage::write_config(env, &config);
    AdminChangedEvent {
        old_admin: current_admin,
        new_admin,
    }
    .publish(env);
    Ok(())
}

fn publish_update(env: &Env, config: &ProtocolConfig) {
    ConfigUpdatedEvent {
        admin: config.admin.clone(),
        validator_count: config.validators.len(),
    }
    .publish(env);
}
