use soroban_sdk::contracterror;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum EscrowError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    Unauthorized = 3,
    InvalidConfig = 4,

    // Proposal lifecycle
    InvalidAmount = 10,
    MoreSecurityDeposit = 11,
    InvalidMilestoneCount = 12,
    InvalidMetadata = 13,
    DuplicateProposal = 14,
    ProposalNotFound = 15,
    ProposalNotActive = 16,
    InvalidContribution = 17,
    MintMismatch = 18,
    FundingCapExceeded = 19,
    ProposalNotClosable = 20,
    EscrowNotEmpty = 21,

    // Milestones and voting
    OutOfSequenceMilestone = 30,
    PreviousMilestoneIncomplete = 31,
    MilestoneNotFound = 32,
    MilestoneNotPending = 33,
    MilestoneNotActive = 34,
    MilestoneNotOpen = 35,
    NotValidator = 36,
    ValidationDeadlinePassed = 37,
    DeadlineNotReached = 38,
    MilestoneNotValidated = 39,
    AlreadyReleased = 40,
    InsufficientEscrow = 41,

    // Penalties and settlement
    MilestoneNotFailed = 50,
    PenaltyAlreadyApplied = 51,
    MaxPenaltiesReached = 52,
    ProposalNotFailed = 53,
    ContributorNotFound = 54,
    NothingToWithdraw = 55,
    ZeroRefund = 56,
    OutstandingContributions = 57,
    NothingToReclaim = 58,

    MathOverflow = 90,
}
