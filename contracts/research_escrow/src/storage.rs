use soroban_sdk::{contracttype, Address, Env, String};

use crate::errors::EscrowError;
use crate::types::{Contributor, EscrowAccount, Milestone, Proposal, ProtocolConfig, Vote};

const DAY_IN_LEDGERS: u32 = 17_280;
const INSTANCE_TTL_THRESHOLD: u32 = 7 * DAY_IN_LEDGERS;
const INSTANCE_TTL_EXTEND: u32 = 30 * DAY_IN_LEDGERS;
const PERSISTENT_TTL_THRESHOLD: u32 = 30 * DAY_IN_LEDGERS;
pub(crate) const PERSISTENT_TTL_EXTEND: u32 = 120 * DAY_IN_LEDGERS;

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Config,                           // -> ProtocolConfig
    NextProposalId,                   // -> u64
    Proposal(u64),                    // proposal_id -> Proposal
    ProposalIndex(Address, String),   // (researcher, title) -> proposal_id
    Escrow(u64),                      // proposal_id -> EscrowAccount
    Milestone(u64, u32),              // (proposal_id, number) -> Milestone
    Vote(u64, u32, Address),          // (proposal_id, number, validator) -> Vote
    Contributor(u64, Address),        // (proposal_id, wallet) -> Contributor
}

fn bump_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_TTL_THRESHOLD, INSTANCE_TTL_EXTEND);
}

fn bump_persistent(env: &Env, key: &DataKey) {
    env.storage()
        .persistent()
        .extend_ttl(key, PERSISTENT_TTL_THRESHOLD, PERSISTENT_TTL_EXTEND);
}

// Config

pub fn has_config(env: &Env) -> bool {
    env.storage().instance().has(&DataKey::Config)
}

pub fn read_config(env: &Env) -> Result<ProtocolConfig, EscrowError> {
    let config = env
        .storage()
        .instance()
        .get(&DataKey::Config)
        .ok_or(EscrowError::NotInitialized)?;
    bump_instance(env);
    Ok(config)
}

pub fn write_config(env: &Env, config: &ProtocolConfig) {
    env.storage().instance().set(&DataKey::Config, config);
    bump_instance(env);
}

/// Hands out the next proposal id and advances the counter.
pub fn next_proposal_id(env: &Env) -> Result<u64, EscrowError> {
    let id: u64 = env
        .storage()
        .instance()
        .get(&DataKey::NextProposalId)
        .unwrap_or(0);
    let next = id.checked_add(1).ok_or(EscrowError::MathOverflow)?;
    env.storage().instance().set(&DataKey::NextProposalId, &next);
    Ok(id)
}

// Proposals

pub fn load_proposal(env: &Env, proposal_id: u64) -> Result<Proposal, EscrowError> {
    let key = DataKey::Proposal(proposal_id);
    let proposal = env
        .storage()
        .persistent()
        .get(&key)
        .ok_or(EscrowError::ProposalNotFound)?;
    bump_persistent(env, &key);
    Ok(proposal)
}

pub fn save_proposal(env: &Env, proposal: &Proposal) {
    let key = DataKey::Proposal(proposal.id);
    env.storage().persistent().set(&key, proposal);
    bump_persistent(env, &key);
}

pub fn proposal_id_for(env: &Env, researcher: &Address, title: &String) -> Option<u64> {
    env.storage()
        .persistent()
        .get(&DataKey::ProposalIndex(researcher.clone(), title.clone()))
}

pub fn save_proposal_index(env: &Env, proposal: &Proposal) {
    let key = DataKey::ProposalIndex(proposal.researcher.clone(), proposal.title.clone());
    env.storage().persistent().set(&key, &proposal.id);
    bump_persistent(env, &key);
}

/// Drops the proposal, its title index and its escrow record. Milestones,
/// votes and contributor records are kept as history.
pub fn remove_proposal(env: &Env, proposal: &Proposal) {
    let storage = env.storage().persistent();
    storage.remove(&DataKey::Proposal(proposal.id));
    storage.remove(&DataKey::ProposalIndex(
        proposal.researcher.clone(),
        proposal.title.clone(),
    ));
    storage.remove(&DataKey::Escrow(proposal.id));
}

// Escrow

pub fn load_escrow(env: &Env, proposal_id: u64) -> Result<EscrowAccount, EscrowError> {
    let key = DataKey::Escrow(proposal_id);
    let escrow = env
        .storage()
        .persistent()
        .get(&key)
        .ok_or(EscrowError::ProposalNotFound)?;
    bump_persistent(env, &key);
    Ok(escrow)
}

pub fn save_escrow(env: &Env, escrow: &EscrowAccount) {
    let key = DataKey::Escrow(escrow.proposal_id);
    env.storage().persistent().set(&key, escrow);
    bump_persistent(env, &key);
}

// Milestones

pub fn load_milestone(env: &Env, proposal_id: u64, number: u32) -> Result<Milestone, EscrowError> {
    let key = DataKey::Milestone(proposal_id, number);
    let milestone = env
        .storage()
        .persistent()
        .get(&key)
        .ok_or(EscrowError::MilestoneNotFound)?;
    bump_persistent(env, &key);
    Ok(milestone)
}

pub fn save_milestone(env: &Env, milestone: &Milestone) {
    let key = DataKey::Milestone(milestone.proposal_id, milestone.number);
    env.storage().persistent().set(&key, milestone);
    bump_persistent(env, &key);
}

// Votes

pub fn load_vote(env: &Env, proposal_id: u64, number: u32, validator: &Address) -> Option<Vote> {
    let key = DataKey::Vote(proposal_id, number, validator.clone());
    let vote = env.storage().persistent().get(&key)?;
    bump_persistent(env, &key);
    Some(vote)
}

pub fn save_vote(env: &Env, vote: &Vote) {
    let key = DataKey::Vote(
        vote.proposal_id,
        vote.milestone_number,
        vote.validator.clone(),
    );
    env.storage().persistent().set(&key, vote);
    bump_persistent(env, &key);
}

// Contributors

pub fn load_contributor(env: &Env, proposal_id: u64, wallet: &Address) -> Option<Contributor> {
    let key = DataKey::Contributor(proposal_id, wallet.clone());
    let contributor = env.storage().persistent().get(&key)?;
    bump_persistent(env, &key);
    Some(contributor)
}

pub fn save_contributor(env: &Env, contributor: &Contributor) {
    let key = DataKey::Contributor(contributor.proposal_id, contributor.wallet.clone());
    env.storage().persistent().set(&key, contributor);
    bump_persistent(env, &key);
}
