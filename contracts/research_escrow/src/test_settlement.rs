#![cfg(test)]

use crate::errors::EscrowError;
use crate::storage::{self, DataKey, PERSISTENT_TTL_EXTEND};
use crate::test::{setup_test, setup_with_params, TestContext, AMOUNT_ASKED, SECURITY_DEPOSIT};
use crate::testutils;
use crate::types::{Contributor, MilestoneStatus, ProposalStatus, ProtocolParams, Vote};
use soroban_sdk::{
    testutils::{storage::Persistent as _, Address as _, Ledger},
    token::StellarAssetClient,
    Address, Env, String,
};

/// Submits, activates and fails milestone `number`, then penalises it.
fn fail_and_penalise(ctx: &TestContext, env: &Env, proposal_id: u64, number: u32) -> i128 {
    ctx.submit_and_activate(env, proposal_id, number);
    ctx.client.fail_milestone(&ctx.admin, &proposal_id, &number);
    ctx.client.apply_penalty(&ctx.admin, &proposal_id, &number)
}

#[test]
fn test_apply_penalty() {
    let env = Env::default();
    env.mock_all_auths();

    let ctx = setup_test(&env);
    let proposal_id = ctx.create_proposal(&env, "Thermal", AMOUNT_ASKED, 3, 200_000_000);

    let penalty = fail_and_penalise(&ctx, &env, proposal_id, 1);
    assert_eq!(penalty, 10_000_000);

    let proposal = ctx.client.get_proposal(&proposal_id);
    assert_eq!(proposal.current_security_deposit, 190_000_000);
    assert_eq!(proposal.initial_security_deposit, 200_000_000);
    assert_eq!(proposal.penalty_counter, 1);
    assert_eq!(proposal.status, ProposalStatus::Active);

    assert!(ctx.client.get_milestone(&proposal_id, &1).penalty_applied);
    assert_eq!(ctx.token.balance(&ctx.treasury), 10_000_000);
    assert_eq!(ctx.client.get_escrow(&proposal_id).balance, 190_000_000);
}

#[test]
fn test_penalty_escalates_to_forfeit() {
    let env = Env::default();
    env.mock_all_auths();

    let ctx = setup_test(&env);
    let proposal_id = ctx.create_proposal(&env, "Thermal", AMOUNT_ASKED, 3, 200_000_000);

    // 5% of 200M, 10% of 190M, 15% of 171M, then whatever is left
    assert_eq!(fail_and_penalise(&ctx, &env, proposal_id, 1), 10_000_000);
    assert_eq!(fail_and_penalise(&ctx, &env, proposal_id, 1), 19_000_000);
    assert_eq!(fail_and_penalise(&ctx, &env, proposal_id, 1), 25_650_000);
    assert_eq!(
        ctx.client.get_milestone(&proposal_id, &1).attempt,
        3
    );
    assert_eq!(fail_and_penalise(&ctx, &env, proposal_id, 1), 145_350_000);

    let proposal = ctx.client.get_proposal(&proposal_id);
    assert_eq!(proposal.penalty_counter, 4);
    assert_eq!(proposal.current_security_deposit, 0);
    assert_eq!(proposal.status, ProposalStatus::Failed);

    assert_eq!(ctx.token.balance(&ctx.treasury), 200_000_000);
    assert_eq!(ctx.client.get_escrow(&proposal_id).balance, 0);

    // Nothing was raised and nothing is left, so the proposal can be closed
    ctx.client.close_proposal(&ctx.researcher, &proposal_id);
}

#[test]
fn test_penalty_requires_failed_milestone() {
    let env = Env::default();
    env.mock_all_auths();

    let ctx = setup_test(&env);
    let (proposal_id, _) = ctx.funded_proposal(&env);
    ctx.submit_and_activate(&env, proposal_id, 1);

    let result = ctx.client.try_apply_penalty(&ctx.admin, &proposal_id, &1);
    assert_eq!(result, Err(Ok(EscrowError::MilestoneNotFailed)));

    ctx.client.fail_milestone(&ctx.admin, &proposal_id, &1);

    let outsider = Address::generate(&env);
    let result = ctx.client.try_apply_penalty(&outsider, &proposal_id, &1);
    assert_eq!(result, Err(Ok(EscrowError::Unauthorized)));

    ctx.client.apply_penalty(&ctx.admin, &proposal_id, &1);
    let result = ctx.client.try_apply_penalty(&ctx.admin, &proposal_id, &1);
    assert_eq!(result, Err(Ok(EscrowError::PenaltyAlreadyApplied)));
}

#[test]
fn test_penalty_limit() {
    let env = Env::default();
    env.mock_all_auths();

    let ctx = setup_test(&env);
    let proposal_id = ctx.create_proposal(&env, "Thermal", AMOUNT_ASKED, 3, SECURITY_DEPOSIT);
    fail_and_penalise(&ctx, &env, proposal_id, 1);

    // Lowering the limit below the count already charged blocks new penalties
    let mut params = ProtocolParams::default_params();
    params.max_penalties = 1;
    ctx.client.set_params(&ctx.admin, &params);

    ctx.submit_and_activate(&env, proposal_id, 1);
    ctx.client.fail_milestone(&ctx.admin, &proposal_id, &1);
    let result = ctx.client.try_apply_penalty(&ctx.admin, &proposal_id, &1);
    assert_eq!(result, Err(Ok(EscrowError::MaxPenaltiesReached)));
}

#[test]
fn test_proportional_refunds() {
    let env = Env::default();
    env.mock_all_auths();

    let mut params = ProtocolParams::default_params();
    params.max_penalties = 1;
    let ctx = setup_with_params(&env, &params);

    let proposal_id = ctx.create_proposal(&env, "Thermal", AMOUNT_ASKED, 5, SECURITY_DEPOSIT);
    let alice = ctx.funded_wallet(&env, 500_000_000);
    let bob = ctx.funded_wallet(&env, 500_000_000);
    ctx.client
        .fund_proposal(&alice, &proposal_id, &ctx.token.address, &500_000_000);
    ctx.client
        .fund_proposal(&bob, &proposal_id, &ctx.token.address, &500_000_000);
    assert_eq!(ctx.client.get_proposal(&proposal_id).contributors_count, 2);

    for number in 1..=3u32 {
        ctx.submit_and_activate(&env, proposal_id, number);
        ctx.approve_milestone(proposal_id, number);
    }
    assert_eq!(
        ctx.client.get_escrow(&proposal_id).balance,
        SECURITY_DEPOSIT + 400_000_000
    );

    // Refunds are only open once the proposal has failed
    let result = ctx
        .client
        .try_withdraw_funds(&alice, &proposal_id, &ctx.token.address);
    assert_eq!(result, Err(Ok(EscrowError::ProposalNotFailed)));

    // The single allowed penalty forfeits the deposit and fails the proposal
    let penalty = fail_and_penalise(&ctx, &env, proposal_id, 4);
    assert_eq!(penalty, SECURITY_DEPOSIT);
    assert_eq!(
        ctx.client.get_proposal(&proposal_id).status,
        ProposalStatus::Failed
    );
    assert_eq!(ctx.client.get_escrow(&proposal_id).balance, 400_000_000);

    assert_eq!(
        ctx.client.get_refund_quote(&proposal_id, &alice),
        200_000_000
    );
    let refund = ctx
        .client
        .withdraw_funds(&alice, &proposal_id, &ctx.token.address);
    assert_eq!(refund, 200_000_000);
    assert_eq!(ctx.token.balance(&alice), 200_000_000);
    assert_eq!(ctx.client.get_escrow(&proposal_id).balance, 200_000_000);

    let record = ctx.client.get_contributor(&proposal_id, &alice);
    assert_eq!(record.shares, 0);
    assert_eq!(record.amount, 500_000_000);
    assert_eq!(record.refunded, 200_000_000);

    let result = ctx
        .client
        .try_withdraw_funds(&alice, &proposal_id, &ctx.token.address);
    assert_eq!(result, Err(Ok(EscrowError::NothingToWithdraw)));

    // Bob's share is priced against what is left, not the original raise
    let refund = ctx
        .client
        .withdraw_funds(&bob, &proposal_id, &ctx.token.address);
    assert_eq!(refund, 200_000_000);
    assert_eq!(ctx.client.get_escrow(&proposal_id).balance, 0);
    assert_eq!(ctx.token.balance(&ctx.contract_id), 0);

    ctx.client.close_proposal(&ctx.researcher, &proposal_id);
}

#[test]
fn test_withdraw_rejects_bad_requests() {
    let env = Env::default();
    env.mock_all_auths();

    let ctx = setup_test(&env);
    let (proposal_id, _) = ctx.funded_proposal(&env);
    ctx.client.fail_proposal(&ctx.admin, &proposal_id);

    let stranger = Address::generate(&env);
    let result = ctx
        .client
        .try_withdraw_funds(&stranger, &proposal_id, &ctx.token.address);
    assert_eq!(result, Err(Ok(EscrowError::ContributorNotFound)));

    let other_token = env.register_stellar_asset_contract_v2(ctx.admin.clone());
    StellarAssetClient::new(&env, &other_token.address()).mint(&stranger, &1_000);
    let result = ctx
        .client
        .try_withdraw_funds(&stranger, &proposal_id, &other_token.address());
    assert_eq!(result, Err(Ok(EscrowError::MintMismatch)));
}

#[test]
fn test_withdraw_from_empty_escrow() {
    let env = Env::default();
    env.mock_all_auths();

    let ctx = setup_test(&env);
    let proposal_id = ctx.create_proposal(&env, "Single", AMOUNT_ASKED, 1, SECURITY_DEPOSIT);
    let contributor = ctx.funded_wallet(&env, AMOUNT_ASKED);
    ctx.client
        .fund_proposal(&contributor, &proposal_id, &ctx.token.address, &AMOUNT_ASKED);
    ctx.submit_and_activate(&env, proposal_id, 1);
    ctx.approve_milestone(proposal_id, 1);
    ctx.client.reclaim_deposit(&ctx.researcher, &proposal_id);

    testutils::force_proposal_status(&env, &ctx.contract_id, proposal_id, ProposalStatus::Failed)
        .unwrap();

    let result = ctx
        .client
        .try_withdraw_funds(&contributor, &proposal_id, &ctx.token.address);
    assert_eq!(result, Err(Ok(EscrowError::ZeroRefund)));
}

#[test]
fn test_failed_proposal_refunds_deposit_to_contributors() {
    let env = Env::default();
    env.mock_all_auths();

    let ctx = setup_test(&env);
    let (proposal_id, contributor) = ctx.funded_proposal(&env);
    ctx.client.fail_proposal(&ctx.admin, &proposal_id);

    let result = ctx.client.try_reclaim_deposit(&ctx.researcher, &proposal_id);
    assert_eq!(result, Err(Ok(EscrowError::OutstandingContributions)));

    let refund = ctx
        .client
        .withdraw_funds(&contributor, &proposal_id, &ctx.token.address);
    assert_eq!(refund, AMOUNT_ASKED + SECURITY_DEPOSIT);

    let result = ctx.client.try_reclaim_deposit(&ctx.researcher, &proposal_id);
    assert_eq!(result, Err(Ok(EscrowError::NothingToReclaim)));

    ctx.client.close_proposal(&ctx.researcher, &proposal_id);
}

#[test]
fn test_reclaim_unfunded_failed_proposal() {
    let env = Env::default();
    env.mock_all_auths();

    let ctx = setup_test(&env);
    let proposal_id = ctx.create_proposal(&env, "Thermal", AMOUNT_ASKED, 3, SECURITY_DEPOSIT);
    let balance_before = ctx.token.balance(&ctx.researcher);
    ctx.client.fail_proposal(&ctx.admin, &proposal_id);

    let reclaimed = ctx.client.reclaim_deposit(&ctx.researcher, &proposal_id);
    assert_eq!(reclaimed, SECURITY_DEPOSIT);
    assert_eq!(
        ctx.token.balance(&ctx.researcher),
        balance_before + SECURITY_DEPOSIT
    );
    assert_eq!(
        ctx.client.get_proposal(&proposal_id).current_security_deposit,
        0
    );
}

#[test]
fn test_forced_milestone_state_blocks_resubmission() {
    let env = Env::default();
    env.mock_all_auths();

    let ctx = setup_test(&env);
    let (proposal_id, _) = ctx.funded_proposal(&env);
    ctx.client.submit_milestone(
        &ctx.researcher,
        &proposal_id,
        &1,
        &String::from_str(&env, "ipfs://evidence"),
    );

    testutils::force_milestone_status(
        &env,
        &ctx.contract_id,
        proposal_id,
        1,
        MilestoneStatus::Failed,
    )
    .unwrap();

    let result = ctx.client.try_expire_milestone(&proposal_id, &1);
    assert_eq!(result, Err(Ok(EscrowError::MilestoneNotOpen)));

    assert_eq!(
        ctx.client.apply_penalty(&ctx.admin, &proposal_id, &1),
        SECURITY_DEPOSIT / 20
    );
}

#[test]
fn test_no_penalty_once_refunds_open() {
    let env = Env::default();
    env.mock_all_auths();

    let ctx = setup_test(&env);
    let proposal_id = ctx.create_proposal(&env, "Thermal", AMOUNT_ASKED, 3, SECURITY_DEPOSIT);
    let alice = ctx.funded_wallet(&env, 500_000_000);
    let bob = ctx.funded_wallet(&env, 500_000_000);
    ctx.client
        .fund_proposal(&alice, &proposal_id, &ctx.token.address, &500_000_000);
    ctx.client
        .fund_proposal(&bob, &proposal_id, &ctx.token.address, &500_000_000);

    ctx.submit_and_activate(&env, proposal_id, 1);
    ctx.client.fail_milestone(&ctx.admin, &proposal_id, &1);
    ctx.client.fail_proposal(&ctx.admin, &proposal_id);

    let alice_refund = ctx
        .client
        .withdraw_funds(&alice, &proposal_id, &ctx.token.address);
    assert_eq!(alice_refund, 550_000_000);

    // The deposit now backs refunds and can no longer be charged
    let result = ctx.client.try_apply_penalty(&ctx.admin, &proposal_id, &1);
    assert_eq!(result, Err(Ok(EscrowError::ProposalNotActive)));
    assert_eq!(ctx.token.balance(&ctx.treasury), 0);

    let bob_refund = ctx
        .client
        .withdraw_funds(&bob, &proposal_id, &ctx.token.address);
    assert_eq!(bob_refund, alice_refund);
    assert_eq!(ctx.client.get_escrow(&proposal_id).balance, 0);
}

#[test]
fn test_milestones_frozen_after_proposal_ends() {
    let env = Env::default();
    env.mock_all_auths();

    let ctx = setup_test(&env);
    let (proposal_id, contributor) = ctx.funded_proposal(&env);
    let deadline = ctx.client.submit_milestone(
        &ctx.researcher,
        &proposal_id,
        &1,
        &String::from_str(&env, "ipfs://evidence"),
    );
    ctx.client.fail_proposal(&ctx.admin, &proposal_id);
    env.ledger().set_timestamp(deadline);

    let result = ctx.client.try_expire_milestone(&proposal_id, &1);
    assert_eq!(result, Err(Ok(EscrowError::ProposalNotActive)));
    let result = ctx.client.try_fail_milestone(&ctx.admin, &proposal_id, &1);
    assert_eq!(result, Err(Ok(EscrowError::ProposalNotActive)));
    assert_eq!(
        ctx.client.get_milestone(&proposal_id, &1).status,
        MilestoneStatus::Pending
    );

    ctx.client
        .withdraw_funds(&contributor, &proposal_id, &ctx.token.address);
    ctx.client.close_proposal(&ctx.researcher, &proposal_id);

    let result = ctx.client.try_expire_milestone(&proposal_id, &1);
    assert_eq!(result, Err(Ok(EscrowError::ProposalNotFound)));
}

#[test]
fn test_vote_and_contributor_reads_extend_ttl() {
    let env = Env::default();
    env.mock_all_auths();

    let ctx = setup_test(&env);
    let wallet = Address::generate(&env);
    let validator = ctx.validator(0);

    env.as_contract(&ctx.contract_id, || {
        let contributor_key = DataKey::Contributor(7, wallet.clone());
        let vote_key = DataKey::Vote(7, 1, validator.clone());

        // Written without a bump, so both entries start at the minimum TTL
        env.storage().persistent().set(
            &contributor_key,
            &Contributor {
                wallet: wallet.clone(),
                proposal_id: 7,
                amount: 1_000,
                shares: 1_000,
                first_contributed_at: 0,
                refunded: 0,
            },
        );
        env.storage().persistent().set(
            &vote_key,
            &Vote {
                validator: validator.clone(),
                proposal_id: 7,
                milestone_number: 1,
                attempt: 1,
                approved: true,
                voted_at: 0,
            },
        );
        assert!(env.storage().persistent().get_ttl(&contributor_key) < PERSISTENT_TTL_EXTEND);
        assert!(env.storage().persistent().get_ttl(&vote_key) < PERSISTENT_TTL_EXTEND);

        assert!(storage::load_contributor(&env, 7, &wallet).is_some());
        assert!(storage::load_vote(&env, 7, 1, &validator).is_some());

        assert_eq!(
            env.storage().persistent().get_ttl(&contributor_key),
            PERSISTENT_TTL_EXTEND
        );
        assert_eq!(
            env.storage().persistent().get_ttl(&vote_key),
            PERSISTENT_TTL_EXTEND
        );
    });
}
