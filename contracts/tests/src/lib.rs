#![cfg(test)]
extern crate std;

use soroban_sdk::{
    testutils::{Address as _, Ledger},
    token::{StellarAssetClient, TokenClient},
    vec, Address, Env, String,
};

use research_escrow::{
    MilestoneStatus, ProposalStatus, ProtocolParams, ResearchEscrowContract,
    ResearchEscrowContractClient as EscrowClient,
};

#[test]
fn test_research_escrow_e2e() {
    let env = Env::default();
    env.mock_all_auths();
    env.ledger().set_timestamp(1_000);

    // 1. SETUP IDENTITIES
    let admin = Address::generate(&env);
    let treasury = Address::generate(&env);
    let researcher = Address::generate(&env);
    let alice = Address::generate(&env);
    let bob = Address::generate(&env);
    let validators = vec![
        &env,
        Address::generate(&env),
        Address::generate(&env),
        Address::generate(&env),
    ];

    // 2. TOKEN AND CONTRACT REGISTRATION
    let asset = env.register_stellar_asset_contract_v2(admin.clone());
    let token = TokenClient::new(&env, &asset.address());
    let token_admin = StellarAssetClient::new(&env, &asset.address());
    token_admin.mint(&researcher, &1_000_000_000);
    token_admin.mint(&alice, &600_000_000);
    token_admin.mint(&bob, &400_000_000);

    let escrow_id = env.register(ResearchEscrowContract, ());
    let escrow = EscrowClient::new(&env, &escrow_id);
    escrow.initialize(
        &admin,
        &treasury,
        &validators,
        &ProtocolParams::default_params(),
    );

    // 3. PROPOSAL AND FUNDING
    let proposal_id = escrow.create_proposal(
        &researcher,
        &token.address,
        &String::from_str(&env, "Soil microbiome survey"),
        &String::from_str(&env, "Sequencing soil samples across three climates"),
        &String::from_str(&env, "bafybeihkoviema7g3gxyt6la7vd5ho32ictqbilu3wnlo3rs7ewhnp7lly"),
        &1_000_000_000,
        &3,
        &100_000_000,
    );
    escrow.fund_proposal(&alice, &proposal_id, &token.address, &600_000_000);
    escrow.fund_proposal(&bob, &proposal_id, &token.address, &400_000_000);
    assert_eq!(escrow.get_escrow(&proposal_id).balance, 1_100_000_000);

    let evidence = String::from_str(&env, "ipfs://milestone-report");
    let approve = |number: u32| {
        escrow.activate_milestone(&admin, &proposal_id, &number);
        escrow.validate_milestone(&validators.get(0).unwrap(), &proposal_id, &number, &true);
        escrow.validate_milestone(&validators.get(2).unwrap(), &proposal_id, &number, &true)
    };

    // 4. FIRST MILESTONE PASSES
    escrow.submit_milestone(&researcher, &proposal_id, &1, &evidence);
    assert_eq!(approve(1), MilestoneStatus::Validated);
    assert_eq!(token.balance(&researcher), 900_000_000 + 333_333_333);

    // 5. SECOND MILESTONE EXPIRES AND IS PENALISED
    let deadline = escrow.submit_milestone(&researcher, &proposal_id, &2, &evidence);
    env.ledger().set_timestamp(deadline);
    escrow.expire_milestone(&proposal_id, &2);
    assert_eq!(escrow.apply_penalty(&admin, &proposal_id, &2), 5_000_000);
    assert_eq!(token.balance(&treasury), 5_000_000);

    // 6. RESUBMISSION AND COMPLETION
    escrow.submit_milestone(&researcher, &proposal_id, &2, &evidence);
    assert_eq!(escrow.get_milestone(&proposal_id, &2).attempt, 2);
    approve(2);
    escrow.submit_milestone(&researcher, &proposal_id, &3, &evidence);
    approve(3);

    let proposal = escrow.get_proposal(&proposal_id);
    assert_eq!(proposal.status, ProposalStatus::Completed);
    assert_eq!(proposal.current_security_deposit, 95_000_000);
    assert_eq!(escrow.get_escrow(&proposal_id).balance, 95_000_000);

    // 7. DEPOSIT RETURN AND CLOSURE
    assert_eq!(escrow.reclaim_deposit(&researcher, &proposal_id), 95_000_000);
    escrow.close_proposal(&researcher, &proposal_id);
    assert_eq!(token.balance(&researcher), 1_995_000_000);
    assert_eq!(token.balance(&escrow_id), 0);

    // 8. A SECOND PROPOSAL FAILS AND REFUNDS ITS BACKER
    let failing_id = escrow.create_proposal(
        &researcher,
        &token.address,
        &String::from_str(&env, "Cold fusion replication"),
        &String::from_str(&env, ""),
        &String::from_str(&env, ""),
        &500_000_000,
        &2,
        &50_000_000,
    );
    token_admin.mint(&alice, &300_000_000);
    escrow.fund_proposal(&alice, &failing_id, &token.address, &300_000_000);

    escrow.submit_milestone(&researcher, &failing_id, &1, &evidence);
    escrow.activate_milestone(&admin, &failing_id, &1);
    escrow.validate_milestone(&validators.get(0).unwrap(), &failing_id, &1, &true);
    escrow.validate_milestone(&validators.get(1).unwrap(), &failing_id, &1, &true);
    assert_eq!(escrow.get_escrow(&failing_id).balance, 100_000_000);

    escrow.fail_proposal(&admin, &failing_id);
    assert_eq!(
        escrow.withdraw_funds(&alice, &failing_id, &token.address),
        100_000_000
    );
    escrow.close_proposal(&researcher, &failing_id);
    assert_eq!(token.balance(&escrow_id), 0);

    std::println!("Research escrow lifecycle completed");
}
