use soroban_sdk::{contractevent, Address, String};

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InitializedEvent {
    pub admin: Address,
    pub treasury: Address,
    pub validator_count: u32,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigUpdatedEvent {
    #[topic]
    pub admin: Address,
    pub validator_count: u32,
}

/// Emitted when the admin role is transferred to a new address.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AdminChangedEvent {
    #[topic]
    pub old_admin: Address,
    pub new_admin: Address,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProposalCreatedEvent {
    #[topic]
    pub researcher: Address,
    #[topic]
    pub proposal_id: u64,
    pub title: String,
    pub amount_asked: i128,
    pub total_milestones: u32,
    pub security_deposit: i128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProposalFundedEvent {
    #[topic]
    pub contributor: Address,
    #[topic]
    pub proposal_id: u64,
    pub amount: i128,
    pub amount_raised: i128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MilestoneSubmittedEvent {
    #[topic]
    pub proposal_id: u64,
    pub number: u32,
    pub deadline: u64,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MilestoneActivatedEvent {
    #[topic]
    pub proposal_id: u64,
    pub number: u32,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VoteCastEvent {
    #[topic]
    pub validator: Address,
    #[topic]
    pub proposal_id: u64,
    pub number: u32,
    pub approved: bool,
    pub validation_votes: u32,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MilestoneValidatedEvent {
    #[topic]
    pub proposal_id: u64,
    pub number: u32,
    pub validation_votes: u32,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FundsReleasedEvent {
    #[topic]
    pub researcher: Address,
    #[topic]
    pub proposal_id: u64,
    pub number: u32,
    pub amount: i128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MilestoneFailedEvent {
    #[topic]
    pub proposal_id: u64,
    pub number: u32,
    pub expired: bool,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PenaltyAppliedEvent {
    #[topic]
    pub proposal_id: u64,
    pub number: u32,
    pub amount: i128,
    pub remaining_deposit: i128,
    pub penalty_counter: u32,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProposalCompletedEvent {
    #[topic]
    pub proposal_id: u64,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProposalFailedEvent {
    #[topic]
    pub proposal_id: u64,
    pub penalty_counter: u32,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RefundWithdrawnEvent {
    #[topic]
    pub contributor: Address,
    #[topic]
    pub proposal_id: u64,
    pub amount: i128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DepositReclaimedEvent {
    #[topic]
    pub researcher: Address,
    #[topic]
    pub proposal_id: u64,
    pub amount: i128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProposalClosedEvent {
    #[topic]
    pub researcher: Address,
    pub proposal_id: u64,
}
