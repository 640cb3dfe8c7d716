//! Penalties against the security deposit, contributor refunds on failure,
//! and the researcher's reclaim of whatever a terminal escrow still holds.

use soroban_sdk::{Address, Env};

use crate::config;
use crate::errors::EscrowError;
use crate::escrow;
use crate::events::{DepositReclaimedEvent, PenaltyAppliedEvent, RefundWithdrawnEvent};
use crate::proposal;
use crate::storage;
use crate::types::{
    EscrowAccount, MilestoneStatus, Proposal, ProposalStatus, ProtocolParams, BPS_DENOMINATOR,
};

/// Rate charged by the penalty following `penalty_counter` earlier ones.
pub fn penalty_rate_bps(params: &ProtocolParams, penalty_counter: u32) -> u32 {
    params
        .penalty_step_bps
        .saturating_mul(penalty_counter)
        .saturating_add(params.penalty_base_bps)
        .min(BPS_DENOMINATOR as u32)
}

/// Amount taken by the next penalty. The penalty that reaches
/// `max_penalties` forfeits the whole remaining deposit.
pub fn penalty_amount(params: &ProtocolParams, proposal: &Proposal) -> Result<i128, EscrowError> {
    let deposit = proposal.current_security_deposit;
    if proposal.penalty_counter.saturating_add(1) >= params.max_penalties {
        return Ok(deposit);
    }
    let rate = penalty_rate_bps(params, proposal.penalty_counter) as i128;
    deposit
        .checked_mul(rate)
        .and_then(|v| v.checked_div(BPS_DENOMINATOR))
        .ok_or(EscrowError::MathOverflow)
}

/// Contributor shares not yet paid out.
pub fn outstanding_shares(proposal: &Proposal) -> Result<i128, EscrowError> {
    proposal
        .amount_raised
        .checked_sub(proposal.shares_redeemed)
        .ok_or(EscrowError::MathOverflow)
}

/// Pro-rata refund for `shares` against the current escrow balance.
pub fn refund_for(
    proposal: &Proposal,
    escrow: &EscrowAccount,
    shares: i128,
) -> Result<i128, EscrowError> {
    let outstanding = outstanding_shares(proposal)?;
    if outstanding <= 0 || shares <= 0 {
        return Ok(0);
    }
    shares
        .checked_mul(escrow.balance)
        .and_then(|v| v.checked_div(outstanding))
        .ok_or(EscrowError::MathOverflow)
}

pub fn apply_penalty(
    env: &Env,
    admin: Address,
    proposal_id: u64,
    number: u32,
) -> Result<i128, EscrowError> {
    let config = config::require_admin(env, &admin)?;

    let mut proposal = storage::load_proposal(env, proposal_id)?;
    // Once refunds are open the deposit belongs to the contributors.
    proposal::ensure_active(&proposal)?;
    let mut milestone = storage::load_milestone(env, proposal_id, number)?;
    if milestone.status != MilestoneStatus::Failed {
        return Err(EscrowError::MilestoneNotFailed);
    }
    if milestone.penalty_applied {
        return Err(EscrowError::PenaltyAlreadyApplied);
    }
    if proposal.penalty_counter >= config.params.max_penalties {
        return Err(EscrowError::MaxPenaltiesReached);
    }

    let penalty = penalty_amount(&config.params, &proposal)?;
    if penalty > 0 {
        let mut escrow = storage::load_escrow(env, proposal_id)?;
        escrow::pay_out(env, &mut escrow, &config.treasury, penalty)?;
    }

    let now = env.ledger().timestamp();
    proposal.current_security_deposit = proposal
        .current_security_deposit
        .checked_sub(penalty)
        .ok_or(EscrowError::MathOverflow)?;
    proposal.penalty_counter += 1;
    // Settling the failure reopens the milestone for resubmission.
    proposal.current_milestone = number - 1;
    proposal.updated_at = now;

    milestone.penalty_applied = true;
    milestone.updated_at = now;
    storage::save_milestone(env, &milestone);

    PenaltyAppliedEvent {
        proposal_id,
        number,
        amount: penalty,
        remaining_deposit: proposal.current_security_deposit,
        penalty_counter: proposal.penalty_counter,
    }
    .publish(env);

    if proposal.penalty_counter >= config.params.max_penalties
        && proposal.status == ProposalStatus::Active
    {
        proposal::mark_failed(env, &mut proposal);
    }
    storage::save_proposal(env, &proposal);

    Ok(penalty)
}

/// Refunds a contributor's pro-rata share of a failed proposal's escrow.
pub fn withdraw(
    env: &Env,
    contributor: Address,
    proposal_id: u64,
    token: Address,
) -> Result<i128, EscrowError> {
    storage::read_config(env)?;
    contributor.require_auth();

    let mut proposal = storage::load_proposal(env, proposal_id)?;
    if proposal.status != ProposalStatus::Failed {
        return Err(EscrowError::ProposalNotFailed);
    }
    if token != proposal.token {
        return Err(EscrowError::MintMismatch);
    }

    let mut record = storage::load_contributor(env, proposal_id, &contributor)
        .ok_or(EscrowError::ContributorNotFound)?;
    if record.shares <= 0 {
        return Err(EscrowError::NothingToWithdraw);
    }

    let mut escrow = storage::load_escrow(env, proposal_id)?;
    let refund = refund_for(&proposal, &escrow, record.shares)?;
    if refund <= 0 {
        return Err(EscrowError::ZeroRefund);
    }
    escrow::pay_out(env, &mut escrow, &contributor, refund)?;

    proposal.shares_redeemed = proposal
        .shares_redeemed
        .checked_add(record.shares)
        .ok_or(EscrowError::MathOverflow)?;
    proposal.updated_at = env.ledger().timestamp();
    storage::save_proposal(env, &proposal);

    record.shares = 0;
    record.refunded = refund;
    storage::save_contributor(env, &record);

    RefundWithdrawnEvent {
        contributor,
        proposal_id,
        amount: refund,
    }
    .publish(env);

    Ok(refund)
}

/// Returns what is left in a terminal proposal's escrow to its researcher:
/// the unused deposit of a completed proposal, or the deposit of a failed
/// one that nobody funded or whose contributors have all been refunded.
pub fn reclaim_deposit(
    env: &Env,
    researcher: Address,
    proposal_id: u64,
) -> Result<i128, EscrowError> {
    storage::read_config(env)?;
    let mut proposal = proposal::load_as_researcher(env, &researcher, proposal_id)?;

    match proposal.status {
        ProposalStatus::Active => return Err(EscrowError::ProposalNotClosable),
        ProposalStatus::Failed if outstanding_shares(&proposal)? > 0 => {
            return Err(EscrowError::OutstandingContributions)
        }
        _ => {}
    }

    let mut escrow = storage::load_escrow(env, proposal_id)?;
    let amount = escrow.balance;
    if amount <= 0 {
        return Err(EscrowError::NothingToReclaim);
    }
    escrow::pay_out(env, &mut escrow, &researcher, amount)?;

    proposal.current_security_deposit = 0;
    proposal.updated_at = env.ledger().timestamp();
    storage::save_proposal(env, &proposal);

    DepositReclaimedEvent {
        researcher,
        proposal_id,
        amount,
    }
    .publish(env);

    Ok(amount)
}
