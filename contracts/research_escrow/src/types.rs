use soroban_sdk::{contracttype, Address, String, Vec};

/// Basis-point denominator used by every rate in [`ProtocolParams`].
pub const BPS_DENOMINATOR: i128 = 10_000;

/// Lifecycle of a funding proposal. `Completed` and `Failed` are terminal.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProposalStatus {
    Active,
    Completed,
    Failed,
}

/// Lifecycle of a single milestone.
///
/// Pending -> Active -> Validated, or Pending/Active -> Failed.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MilestoneStatus {
    Pending,
    Active,
    Validated,
    Failed,
}

/// Tunable protocol parameters. Rates are in basis points.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProtocolParams {
    /// Minimum security deposit as a fraction of the amount asked.
    pub min_deposit_bps: u32,
    /// Seconds a submitted milestone stays open for review.
    pub review_window: u64,
    /// Rate of the first penalty on a proposal.
    pub penalty_base_bps: u32,
    /// Added to the rate for every penalty already applied.
    pub penalty_step_bps: u32,
    /// Penalty count at which the remaining deposit is forfeited.
    pub max_penalties: u32,
}

impl ProtocolParams {
    pub fn default_params() -> Self {
        Self {
            min_deposit_bps: 1_000,
            review_window: 14 * 24 * 60 * 60,
            penalty_base_bps: 500,
            penalty_step_bps: 500,
            max_penalties: 4,
        }
    }
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProtocolConfig {
    pub admin: Address,
    /// Receives penalty debits.
    pub treasury: Address,
    /// Eligible milestone validators. Milestones snapshot its length.
    pub validators: Vec<Address>,
    pub params: ProtocolParams,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Proposal {
    pub id: u64,
    pub researcher: Address,
    pub title: String,
    pub abstract_text: String,
    pub content_hash: String,
    pub amount_asked: i128,
    pub amount_raised: i128,
    pub total_milestones: u32,
    pub current_milestone: u32,
    pub initial_security_deposit: i128,
    pub current_security_deposit: i128,
    pub penalty_counter: u32,
    /// Token the proposal is denominated in. Its escrow lives under the same id.
    pub token: Address,
    pub status: ProposalStatus,
    pub contributors_count: u32,
    /// Contributor shares already paid out by refunds.
    pub shares_redeemed: i128,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Proposal {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            ProposalStatus::Completed | ProposalStatus::Failed
        )
    }
}

/// Per-proposal custody ledger. The tokens themselves sit on the contract
/// address; `balance` is the part attributed to this proposal.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EscrowAccount {
    pub proposal_id: u64,
    pub token: Address,
    pub balance: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Milestone {
    pub proposal_id: u64,
    pub number: u32,
    pub evidence_hash: String,
    pub validation_votes: u32,
    pub total_validators: u32,
    pub funds_released: bool,
    pub status: MilestoneStatus,
    pub created_at: u64,
    pub updated_at: u64,
    pub deadline: u64,
    pub penalty_applied: bool,
    pub amount_released: i128,
    /// Submission attempt, starting at 1. A penalised failure can be
    /// resubmitted under the same number.
    pub attempt: u32,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Vote {
    pub validator: Address,
    pub proposal_id: u64,
    pub milestone_number: u32,
    /// Milestone attempt the vote was cast on.
    pub attempt: u32,
    pub approved: bool,
    pub voted_at: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Contributor {
    pub wallet: Address,
    pub proposal_id: u64,
    /// Cumulative amount contributed.
    pub amount: i128,
    /// Outstanding pro-rata claim; zeroed once refunded.
    pub shares: i128,
    pub first_contributed_at: u64,
    pub refunded: i128,
}
