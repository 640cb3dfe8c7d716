//! Milestone-gated research funding escrow.
//!
//! Researchers open proposals backed by a security deposit, contributors
//! fund them, and a validator committee approves milestones one at a time.
//! Each approved milestone releases its share of the escrow; failed
//! milestones cost the researcher part of the deposit, and a failed proposal
//! refunds contributors pro rata from whatever the escrow still holds.
//!
//! This file only holds the contract entry points. The state machine lives
//! in [`proposal`], [`milestone`] and [`settlement`]; token custody in
//! [`escrow`].

#![no_std]

mod config;
mod errors;
mod escrow;
mod events;
mod milestone;
mod proposal;
mod settlement;
mod storage;
mod token;
mod types;

#[cfg(any(test, feature = "testutils"))]
pub mod testutils;

pub use errors::EscrowError;
pub use types::{
    Contributor, EscrowAccount, Milestone, MilestoneStatus, Proposal, ProposalStatus,
    ProtocolConfig, ProtocolParams, Vote,
};

use proposal::NewProposal;
use soroban_sdk::{contract, contractimpl, Address, Env, String, Vec};

#[contract]
pub struct ResearchEscrowContract;

#[contractimpl]
impl ResearchEscrowContract {
    /// Initialize the contract with its admin, penalty treasury, validator
    /// committee and protocol parameters
    pub fn initialize(
        env: Env,
        admin: Address,
        treasury: Address,
        validators: Vec<Address>,
        params: ProtocolParams,
    ) -> Result<(), EscrowError> {
        config::initialize(&env, admin, treasury, validators, params)
    }

    /// Replace the validator committee (admin only)
    pub fn set_validators(
        env: Env,
        admin: Address,
        validators: Vec<Address>,
    ) -> Result<(), EscrowError> {
        config::set_validators(&env, admin, validators)
    }

    /// Replace the protocol parameters (admin only)
    pub fn set_params(env: Env, admin: Address, params: ProtocolParams) -> Result<(), EscrowError> {
        config::set_params(&env, admin, params)
    }

    /// Change where penalties are paid (admin only)
    pub fn set_treasury(env: Env, admin: Address, treasury: Address) -> Result<(), EscrowError> {
        config::set_treasury(&env, admin, treasury)
    }

    /// Transfer the admin role to `new_admin`.
    ///
    /// Requires authorization from the current admin. Emits `AdminChangedEvent`.
    pub fn set_admin(env: Env, current_admin: Address, new_admin: Address) -> Result<(), EscrowError> {
        config::set_admin(&env, current_admin, new_admin)
    }

    /// Create a proposal and lock the researcher's security deposit in its
    /// escrow. Returns the proposal id.
    #[allow(clippy::too_many_arguments)]
    pub fn create_proposal(
        env: Env,
        researcher: Address,
        token: Address,
        title: String,
        abstract_text: String,
        content_hash: String,
        amount_asked: i128,
        total_milestones: u32,
        security_deposit: i128,
    ) -> Result<u64, EscrowError> {
        proposal::create(
            &env,
            researcher,
            token,
            NewProposal {
                title,
                abstract_text,
                content_hash,
                amount_asked,
                total_milestones,
                security_deposit,
            },
        )
    }

    /// Contribute `amount` of `token` to an active proposal. Returns the new
    /// amount raised.
    pub fn fund_proposal(
        env: Env,
        contributor: Address,
        proposal_id: u64,
        token: Address,
        amount: i128,
    ) -> Result<i128, EscrowError> {
        proposal::fund(&env, contributor, proposal_id, token, amount)
    }

    /// Submit evidence for the next milestone (researcher only). Returns the
    /// review deadline.
    pub fn submit_milestone(
        env: Env,
        researcher: Address,
        proposal_id: u64,
        number: u32,
        evidence_hash: String,
    ) -> Result<u64, EscrowError> {
        milestone::submit(&env, researcher, proposal_id, number, evidence_hash)
    }

    /// Open a pending milestone for voting (admin only)
    pub fn activate_milestone(
        env: Env,
        admin: Address,
        proposal_id: u64,
        number: u32,
    ) -> Result<(), EscrowError> {
        milestone::activate(&env, admin, proposal_id, number)
    }

    /// Cast or change a validator's vote on an active milestone. A strict
    /// majority validates the milestone and releases its payment.
    pub fn validate_milestone(
        env: Env,
        validator: Address,
        proposal_id: u64,
        number: u32,
        approve: bool,
    ) -> Result<MilestoneStatus, EscrowError> {
        milestone::validate(&env, validator, proposal_id, number, approve)
    }

    /// Pay out a validated milestone whose release was deferred (researcher only)
    pub fn release_funds(
        env: Env,
        researcher: Address,
        proposal_id: u64,
        number: u32,
    ) -> Result<i128, EscrowError> {
        milestone::release(&env, researcher, proposal_id, number)
    }

    /// Fail a milestone whose review deadline has passed (anyone)
    pub fn expire_milestone(env: Env, proposal_id: u64, number: u32) -> Result<(), EscrowError> {
        milestone::expire(&env, proposal_id, number)
    }

    /// Fail an open milestone (admin only)
    pub fn fail_milestone(
        env: Env,
        admin: Address,
        proposal_id: u64,
        number: u32,
    ) -> Result<(), EscrowError> {
        milestone::fail(&env, admin, proposal_id, number)
    }

    /// Fail an active proposal so contributors can be refunded (admin only)
    pub fn fail_proposal(env: Env, admin: Address, proposal_id: u64) -> Result<(), EscrowError> {
        proposal::fail(&env, admin, proposal_id)
    }

    /// Charge the security deposit for a failed milestone (admin only).
    /// Returns the penalty paid to the treasury.
    pub fn apply_penalty(
        env: Env,
        admin: Address,
        proposal_id: u64,
        number: u32,
    ) -> Result<i128, EscrowError> {
        settlement::apply_penalty(&env, admin, proposal_id, number)
    }

    /// Refund a contributor's pro-rata share of a failed proposal
    pub fn withdraw_funds(
        env: Env,
        contributor: Address,
        proposal_id: u64,
        token: Address,
    ) -> Result<i128, EscrowError> {
        settlement::withdraw(&env, contributor, proposal_id, token)
    }

    /// Return the remaining escrow of a finished proposal to its researcher
    pub fn reclaim_deposit(env: Env, researcher: Address, proposal_id: u64) -> Result<i128, EscrowError> {
        settlement::reclaim_deposit(&env, researcher, proposal_id)
    }

    /// Remove a completed or failed proposal with an empty escrow (researcher only)
    pub fn close_proposal(env: Env, researcher: Address, proposal_id: u64) -> Result<(), EscrowError> {
        proposal::close(&env, researcher, proposal_id)
    }

    /// Get protocol configuration
    pub fn get_config(env: Env) -> Result<ProtocolConfig, EscrowError> {
        storage::read_config(&env)
    }

    /// Get admin address
    pub fn get_admin(env: Env) -> Result<Address, EscrowError> {
        Ok(storage::read_config(&env)?.admin)
    }

    /// Get proposal data
    pub fn get_proposal(env: Env, proposal_id: u64) -> Result<Proposal, EscrowError> {
        storage::load_proposal(&env, proposal_id)
    }

    /// Look up a proposal id by researcher and title
    pub fn get_proposal_id(env: Env, researcher: Address, title: String) -> Result<u64, EscrowError> {
        storage::proposal_id_for(&env, &researcher, &title).ok_or(EscrowError::ProposalNotFound)
    }

    /// Get a proposal's escrow record
    pub fn get_escrow(env: Env, proposal_id: u64) -> Result<EscrowAccount, EscrowError> {
        storage::load_escrow(&env, proposal_id)
    }

    /// Get milestone data
    pub fn get_milestone(env: Env, proposal_id: u64, number: u32) -> Result<Milestone, EscrowError> {
        storage::load_milestone(&env, proposal_id, number)
    }

    /// Get a validator's vote on a milestone, if any
    pub fn get_vote(env: Env, proposal_id: u64, number: u32, validator: Address) -> Option<Vote> {
        storage::load_vote(&env, proposal_id, number, &validator)
    }

    /// Get a contributor's record for a proposal
    pub fn get_contributor(
        env: Env,
        proposal_id: u64,
        wallet: Address,
    ) -> Result<Contributor, EscrowError> {
        storage::load_contributor(&env, proposal_id, &wallet).ok_or(EscrowError::ContributorNotFound)
    }

    /// Refund `wallet` would receive if it withdrew now
    pub fn get_refund_quote(env: Env, proposal_id: u64, wallet: Address) -> Result<i128, EscrowError> {
        let proposal = storage::load_proposal(&env, proposal_id)?;
        let escrow = storage::load_escrow(&env, proposal_id)?;
        let shares = storage::load_contributor(&env, proposal_id, &wallet)
            .map(|record| record.shares)
            .unwrap_or(0);
        settlement::refund_for(&proposal, &escrow, shares)
    }
}

#[cfg(test)]
mod test_settlement;
