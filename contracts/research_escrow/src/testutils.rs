//! Test-only state overrides.
//!
//! Production code moves proposals and milestones between states only
//! through the contract's instructions. Tests that need a state the
//! instructions cannot reach cheaply use these helpers, which write the
//! stored records directly from inside the contract's storage context.
//! Compiled only for tests and the `testutils` feature.

use soroban_sdk::{Address, Env};

use crate::errors::EscrowError;
use crate::storage;
use crate::types::{MilestoneStatus, ProposalStatus};

pub fn force_proposal_status(
    env: &Env,
    contract_id: &Address,
    proposal_id: u64,
    status: ProposalStatus,
) -> Result<(), EscrowError> {
    env.as_contract(contract_id, || {
        let mut proposal = storage::load_proposal(env, proposal_id)?;
        proposal.status = status;
        storage::save_proposal(env, &proposal);
        Ok(())
    })
}

pub fn force_milestone_status(
    env: &Env,
    contract_id: &Address,
    proposal_id: u64,
    number: u32,
    status: MilestoneStatus,
) -> Result<(), EscrowError> {
    env.as_contract(contract_id, || {
        let mut milestone = storage::load_milestone(env, proposal_id, number)?;
        milestone.status = status;
        storage::save_milestone(env, &milestone);
        Ok(())
    })
}
