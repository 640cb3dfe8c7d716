//! Proposal lifecycle: creation, funding, administrative failure and closure.

use soroban_sdk::{Address, Env, String};

use crate::config;
use crate::errors::EscrowError;
use crate::escrow;
use crate::events::{
    ProposalClosedEvent, ProposalCompletedEvent, ProposalCreatedEvent, ProposalFailedEvent,
    ProposalFundedEvent,
};
use crate::storage;
use crate::types::{Contributor, Proposal, ProposalStatus};

pub const MAX_TITLE_LEN: u32 = 50;
pub const MAX_ABSTRACT_LEN: u32 = 250;
pub const MAX_HASH_LEN: u32 = 128;

pub struct NewProposal {
    pub title: String,
    pub abstract_text: String,
    pub content_hash: String,
    pub amount_asked: i128,
    pub total_milestones: u32,
    pub security_deposit: i128,
}

pub fn ensure_active(proposal: &Proposal) -> Result<(), EscrowError> {
    if proposal.status != ProposalStatus::Active {
        return Err(EscrowError::ProposalNotActive);
    }
    Ok(())
}

/// Loads a proposal on behalf of its researcher, who must sign.
pub fn load_as_researcher(
    env: &Env,
    researcher: &Address,
    proposal_id: u64,
) -> Result<Proposal, EscrowError> {
    let proposal = storage::load_proposal(env, proposal_id)?;
    if proposal.researcher != *researcher {
        return Err(EscrowError::Unauthorized);
    }
    researcher.require_auth();
    Ok(proposal)
}

fn validate_metadata(new: &NewProposal) -> Result<(), EscrowError> {
    if new.title.is_empty()
        || new.title.len() > MAX_TITLE_LEN
        || new.abstract_text.len() > MAX_ABSTRACT_LEN
        || new.content_hash.len() > MAX_HASH_LEN
    {
        return Err(EscrowError::InvalidMetadata);
    }
    Ok(())
}

pub fn create(
    env: &Env,
    researcher: Address,
    token: Address,
    new: NewProposal,
) -> Result<u64, EscrowError> {
    let config = storage::read_config(env)?;
    researcher.require_auth();

    if new.amount_asked <= 0 {
        return Err(EscrowError::InvalidAmount);
    }
    if new.total_milestones == 0 {
        return Err(EscrowError::InvalidMilestoneCount);
    }
    validate_metadata(&new)?;

    let required = config::required_deposit(&config.params, new.amount_asked)?;
    if new.security_deposit <= 0 || new.security_deposit < required {
        return Err(EscrowError::MoreSecurityDeposit);
    }

    if storage::proposal_id_for(env, &researcher, &new.title).is_some() {
        return Err(EscrowError::DuplicateProposal);
    }

    let proposal_id = storage::next_proposal_id(env)?;
    escrow::open(env, proposal_id, &token, &researcher, new.security_deposit)?;

    let now = env.ledger().timestamp();
    let proposal = Proposal {
        id: proposal_id,
        researcher: researcher.clone(),
        title: new.title,
        abstract_text: new.abstract_text,
        content_hash: new.content_hash,
        amount_asked: new.amount_asked,
        amount_raised: 0,
        total_milestones: new.total_milestones,
        current_milestone: 0,
        initial_security_deposit: new.security_deposit,
        current_security_deposit: new.security_deposit,
        penalty_counter: 0,
        token,
        status: ProposalStatus::Active,
        contributors_count: 0,
        shares_redeemed: 0,
        created_at: now,
        updated_at: now,
    };
    storage::save_proposal(env, &proposal);
    storage::save_proposal_index(env, &proposal);

    ProposalCreatedEvent {
        researcher,
        proposal_id,
        title: proposal.title.clone(),
        amount_asked: proposal.amount_asked,
        total_milestones: proposal.total_milestones,
        security_deposit: proposal.initial_security_deposit,
    }
    .publish(env);

    Ok(proposal_id)
}

/// Deposits a contribution and returns the proposal's new amount raised.
pub fn fund(
    env: &Env,
    contributor: Address,
    proposal_id: u64,
    token: Address,
    amount: i128,
) -> Result<i128, EscrowError> {
    storage::read_config(env)?;
    contributor.require_auth();

    if amount <= 0 {
        return Err(EscrowError::InvalidContribution);
    }

    let mut proposal = storage::load_proposal(env, proposal_id)?;
    ensure_active(&proposal)?;
    if token != proposal.token {
        return Err(EscrowError::MintMismatch);
    }

    let amount_raised = proposal
        .amount_raised
        .checked_add(amount)
        .ok_or(EscrowError::MathOverflow)?;
    if amount_raised > proposal.amount_asked {
        return Err(EscrowError::FundingCapExceeded);
    }

    let mut escrow = storage::load_escrow(env, proposal_id)?;
    escrow::deposit(env, &mut escrow, &contributor, amount)?;

    let now = env.ledger().timestamp();
    let mut record = match storage::load_contributor(env, proposal_id, &contributor) {
        Some(record) => record,
        None => {
            proposal.contributors_count = proposal
                .contributors_count
                .checked_add(1)
                .ok_or(EscrowError::MathOverflow)?;
            Contributor {
                wallet: contributor.clone(),
                proposal_id,
                amount: 0,
                shares: 0,
                first_contributed_at: now,
                refunded: 0,
            }
        }
    };
    record.amount = record
        .amount
        .checked_add(amount)
        .ok_or(EscrowError::MathOverflow)?;
    record.shares = record
        .shares
        .checked_add(amount)
        .ok_or(EscrowError::MathOverflow)?;
    storage::save_contributor(env, &record);

    proposal.amount_raised = amount_raised;
    proposal.updated_at = now;
    storage::save_proposal(env, &proposal);

    ProposalFundedEvent {
        contributor,
        proposal_id,
        amount,
        amount_raised,
    }
    .publish(env);

    Ok(amount_raised)
}

/// Moves an active proposal to `Failed`. Callers persist the proposal.
pub fn mark_failed(env: &Env, proposal: &mut Proposal) {
    proposal.status = ProposalStatus::Failed;
    proposal.updated_at = env.ledger().timestamp();
    ProposalFailedEvent {
        proposal_id: proposal.id,
        penalty_counter: proposal.penalty_counter,
    }
    .publish(env);
}

/// Moves an active proposal to `Completed`. Callers persist the proposal.
pub fn mark_completed(env: &Env, proposal: &mut Proposal) {
    proposal.status = ProposalStatus::Completed;
    proposal.updated_at = env.ledger().timestamp();
    ProposalCompletedEvent {
        proposal_id: proposal.id,
    }
    .publish(env);
}

pub fn fail(env: &Env, admin: Address, proposal_id: u64) -> Result<(), EscrowError> {
    config::require_admin(env, &admin)?;

    let mut proposal = storage::load_proposal(env, proposal_id)?;
    ensure_active(&proposal)?;
    mark_failed(env, &mut proposal);
    storage::save_proposal(env, &proposal);
    Ok(())
}

pub fn close(env: &Env, researcher: Address, proposal_id: u64) -> Result<(), EscrowError> {
    storage::read_config(env)?;
    let proposal = load_as_researcher(env, &researcher, proposal_id)?;

    if !proposal.is_terminal() {
        return Err(EscrowError::ProposalNotClosable);
    }
    let escrow = storage::load_escrow(env, proposal_id)?;
    escrow::ensure_empty(&escrow)?;

    storage::remove_proposal(env, &proposal);

    ProposalClosedEvent {
        researcher,
        proposal_id,
    }
    .publish(env);

    Ok(())
}
