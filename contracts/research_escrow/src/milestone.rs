//! Milestone submission, committee voting and milestone payouts.

use soroban_sdk::{log, Address, Env, String};

use crate::config;
use crate::errors::EscrowError;
use crate::escrow;
use crate::events::{
    FundsReleasedEvent, MilestoneActivatedEvent, MilestoneFailedEvent, MilestoneSubmittedEvent,
    MilestoneValidatedEvent, VoteCastEvent,
};
use crate::proposal::{self, MAX_HASH_LEN};
use crate::storage;
use crate::types::{EscrowAccount, Milestone, MilestoneStatus, Proposal, Vote};

/// Strict majority of the committee snapshotted on the milestone.
pub fn threshold_reached(milestone: &Milestone) -> bool {
    milestone.validation_votes > milestone.total_validators / 2
}

/// Payout for milestone `number`: an equal share of the amount asked, with
/// the final milestone taking whatever the integer division left over.
pub fn payment_for(proposal: &Proposal, number: u32) -> Result<i128, EscrowError> {
    let total = proposal.total_milestones as i128;
    let share = proposal
        .amount_asked
        .checked_div(total)
        .ok_or(EscrowError::MathOverflow)?;
    if number < proposal.total_milestones {
        return Ok(share);
    }
    share
        .checked_mul(total - 1)
        .and_then(|paid| proposal.amount_asked.checked_sub(paid))
        .ok_or(EscrowError::MathOverflow)
}

/// Escrowed funds that can go to milestone payouts. The security deposit is
/// collateral and never pays the researcher's milestones.
pub fn releasable(proposal: &Proposal, escrow: &EscrowAccount) -> Result<i128, EscrowError> {
    let available = escrow
        .balance
        .checked_sub(proposal.current_security_deposit)
        .ok_or(EscrowError::MathOverflow)?;
    Ok(available.max(0))
}

fn is_open(milestone: &Milestone) -> bool {
    matches!(
        milestone.status,
        MilestoneStatus::Pending | MilestoneStatus::Active
    )
}

pub fn submit(
    env: &Env,
    researcher: Address,
    proposal_id: u64,
    number: u32,
    evidence_hash: String,
) -> Result<u64, EscrowError> {
    let config = storage::read_config(env)?;
    let mut proposal = proposal::load_as_researcher(env, &researcher, proposal_id)?;
    proposal::ensure_active(&proposal)?;

    let expected = proposal
        .current_milestone
        .checked_add(1)
        .ok_or(EscrowError::MathOverflow)?;
    if number != expected || number > proposal.total_milestones {
        return Err(EscrowError::OutOfSequenceMilestone);
    }
    if evidence_hash.len() > MAX_HASH_LEN {
        return Err(EscrowError::InvalidMetadata);
    }
    if number > 1 {
        let previous = storage::load_milestone(env, proposal_id, number - 1)?;
        if !previous.funds_released {
            return Err(EscrowError::PreviousMilestoneIncomplete);
        }
    }
    // A slot is only free again once its failure has been penalised.
    let attempt = match storage::load_milestone(env, proposal_id, number) {
        Ok(earlier) => earlier
            .attempt
            .checked_add(1)
            .ok_or(EscrowError::MathOverflow)?,
        Err(_) => 1,
    };

    let now = env.ledger().timestamp();
    let deadline = now
        .checked_add(config.params.review_window)
        .ok_or(EscrowError::MathOverflow)?;

    let milestone = Milestone {
        proposal_id,
        number,
        evidence_hash,
        validation_votes: 0,
        total_validators: config.validators.len(),
        funds_released: false,
        status: MilestoneStatus::Pending,
        created_at: now,
        updated_at: now,
        deadline,
        penalty_applied: false,
        amount_released: 0,
        attempt,
    };
    storage::save_milestone(env, &milestone);

    proposal.current_milestone = number;
    proposal.updated_at = now;
    storage::save_proposal(env, &proposal);

    MilestoneSubmittedEvent {
        proposal_id,
        number,
        deadline,
    }
    .publish(env);

    Ok(deadline)
}

pub fn activate(env: &Env, admin: Address, proposal_id: u64, number: u32) -> Result<(), EscrowError> {
    config::require_admin(env, &admin)?;

    let proposal = storage::load_proposal(env, proposal_id)?;
    proposal::ensure_active(&proposal)?;

    let mut milestone = storage::load_milestone(env, proposal_id, number)?;
    if milestone.status != MilestoneStatus::Pending {
        return Err(EscrowError::MilestoneNotPending);
    }
    milestone.status = MilestoneStatus::Active;
    milestone.updated_at = env.ledger().timestamp();
    storage::save_milestone(env, &milestone);

    MilestoneActivatedEvent {
        proposal_id,
        number,
    }
    .publish(env);

    Ok(())
}

/// Records `validator`'s vote and resolves the threshold. Returns the
/// milestone status after the vote.
pub fn validate(
    env: &Env,
    validator: Address,
    proposal_id: u64,
    number: u32,
    approve: bool,
) -> Result<MilestoneStatus, EscrowError> {
    let config = storage::read_config(env)?;
    if !config::is_validator(&config, &validator) {
        return Err(EscrowError::NotValidator);
    }
    validator.require_auth();

    let mut proposal = storage::load_proposal(env, proposal_id)?;
    let mut milestone = storage::load_milestone(env, proposal_id, number)?;
    if milestone.status != MilestoneStatus::Active {
        return Err(EscrowError::MilestoneNotActive);
    }
    proposal::ensure_active(&proposal)?;

    let now = env.ledger().timestamp();
    if now >= milestone.deadline {
        return Err(EscrowError::ValidationDeadlinePassed);
    }

    // Only a change of side moves the tally. Votes from an earlier attempt
    // at this milestone no longer count.
    let was_approved = storage::load_vote(env, proposal_id, number, &validator)
        .filter(|vote| vote.attempt == milestone.attempt)
        .map(|vote| vote.approved)
        .unwrap_or(false);
    if approve && !was_approved {
        milestone.validation_votes = milestone
            .validation_votes
            .checked_add(1)
            .ok_or(EscrowError::MathOverflow)?;
    } else if !approve && was_approved {
        milestone.validation_votes = milestone
            .validation_votes
            .checked_sub(1)
            .ok_or(EscrowError::MathOverflow)?;
    }

    storage::save_vote(
        env,
        &Vote {
            validator: validator.clone(),
            proposal_id,
            milestone_number: number,
            attempt: milestone.attempt,
            approved: approve,
            voted_at: now,
        },
    );
    milestone.updated_at = now;

    VoteCastEvent {
        validator,
        proposal_id,
        number,
        approved: approve,
        validation_votes: milestone.validation_votes,
    }
    .publish(env);

    if threshold_reached(&milestone) {
        milestone.status = MilestoneStatus::Validated;
        MilestoneValidatedEvent {
            proposal_id,
            number,
            validation_votes: milestone.validation_votes,
        }
        .publish(env);

        let mut escrow = storage::load_escrow(env, proposal_id)?;
        let payment = payment_for(&proposal, number)?;
        if releasable(&proposal, &escrow)? >= payment {
            pay_milestone(env, &mut proposal, &mut milestone, &mut escrow, payment)?;
        } else {
            log!(
                env,
                "milestone validated, release deferred: underfunded escrow",
                proposal_id,
                number
            );
        }
    }

    storage::save_milestone(env, &milestone);
    Ok(milestone.status)
}

/// Pays out a validated milestone that was not released when it crossed the
/// threshold. Returns the amount paid.
pub fn release(
    env: &Env,
    researcher: Address,
    proposal_id: u64,
    number: u32,
) -> Result<i128, EscrowError> {
    storage::read_config(env)?;
    let mut proposal = proposal::load_as_researcher(env, &researcher, proposal_id)?;
    let mut milestone = storage::load_milestone(env, proposal_id, number)?;

    if milestone.status != MilestoneStatus::Validated {
        return Err(EscrowError::MilestoneNotValidated);
    }
    if milestone.funds_released {
        return Err(EscrowError::AlreadyReleased);
    }
    proposal::ensure_active(&proposal)?;

    let mut escrow = storage::load_escrow(env, proposal_id)?;
    let payment = payment_for(&proposal, number)?;
    if releasable(&proposal, &escrow)? < payment {
        return Err(EscrowError::InsufficientEscrow);
    }

    pay_milestone(env, &mut proposal, &mut milestone, &mut escrow, payment)?;
    storage::save_milestone(env, &milestone);
    Ok(payment)
}

/// Transfers the payout to the researcher and flips `funds_released`.
/// Completes the proposal when the final milestone is paid. The caller
/// persists `milestone`.
fn pay_milestone(
    env: &Env,
    proposal: &mut Proposal,
    milestone: &mut Milestone,
    escrow: &mut EscrowAccount,
    payment: i128,
) -> Result<(), EscrowError> {
    if payment > 0 {
        escrow::pay_out(env, escrow, &proposal.researcher, payment)?;
    }

    let now = env.ledger().timestamp();
    milestone.funds_released = true;
    milestone.amount_released = payment;
    milestone.updated_at = now;

    FundsReleasedEvent {
        researcher: proposal.researcher.clone(),
        proposal_id: proposal.id,
        number: milestone.number,
        amount: payment,
    }
    .publish(env);

    proposal.updated_at = now;
    if milestone.number == proposal.total_milestones {
        proposal::mark_completed(env, proposal);
    }
    storage::save_proposal(env, proposal);
    Ok(())
}

/// Fails an open milestone of an active proposal whose review window has
/// closed. Anyone may call.
pub fn expire(env: &Env, proposal_id: u64, number: u32) -> Result<(), EscrowError> {
    storage::read_config(env)?;
    let proposal = storage::load_proposal(env, proposal_id)?;
    proposal::ensure_active(&proposal)?;
    let mut milestone = storage::load_milestone(env, proposal_id, number)?;
    if !is_open(&milestone) {
        return Err(EscrowError::MilestoneNotOpen);
    }
    if env.ledger().timestamp() < milestone.deadline {
        return Err(EscrowError::DeadlineNotReached);
    }
    mark_failed(env, &mut milestone, true);
    Ok(())
}

/// Explicit failure determination by the admin, at any point before the
/// milestone resolves.
pub fn fail(env: &Env, admin: Address, proposal_id: u64, number: u32) -> Result<(), EscrowError> {
    config::require_admin(env, &admin)?;
    let proposal = storage::load_proposal(env, proposal_id)?;
    proposal::ensure_active(&proposal)?;
    let mut milestone = storage::load_milestone(env, proposal_id, number)?;
    if !is_open(&milestone) {
        return Err(EscrowError::MilestoneNotOpen);
    }
    mark_failed(env, &mut milestone, false);
    Ok(())
}

fn mark_failed(env: &Env, milestone: &mut Milestone, expired: bool) {
    milestone.status = MilestoneStatus::Failed;
    milestone.updated_at = env.ledger().timestamp();
    storage::save_milestone(env, milestone);

    MilestoneFailedEvent {
        proposal_id: milestone.proposal_id,
        number: milestone.number,
        expired,
    }
    .publish(env);
}
