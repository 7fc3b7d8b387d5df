//! Reward accrual and payout scenarios with worked reference values.
//!
//! Every scenario uses one pool of weight 1 and a base reward of one token
//! per block unless stated otherwise, so the first stage emits 256 tokens
//! per block and the auxiliary funds add 20% on top.

use sluice_core::constants::ONE_TOKEN;
use sluice_core::error::{InvariantError, LedgerError};
use sluice_core::traits::TokenView;
use sluice_core::types::AccountId;
use sluice_ledger::Fund;
use sluice_tests::helpers::*;

// ======================================================================
// Single staker, default 75 bps deposit fee
// ======================================================================

#[test]
fn first_block_claim_splits_locked_and_spendable() {
    let ledger = ledger_at(&config(100, 1_000), 90);
    let bob = acct(0xb0);

    let receipt = ledger.deposit(POOL, bob, tokens("100"), None).unwrap();
    assert_eq!(receipt.net_staked, tokens("99.25"));
    assert_eq!(receipt.fee_redistributed, tokens("0.75"));
    assert_eq!(ledger.position(POOL, &dev_fund()).unwrap().staked_amount, tokens("0.75"));

    advance(&ledger, 101);
    assert_eq!(ledger.pending_reward(POOL, &bob).unwrap(), tokens("254.08"));
    let payout = ledger.claim_reward(POOL, bob).unwrap();
    assert_eq!(payout.pending, tokens("254.08"));
    assert_eq!(payout.paid, tokens("254.08"));
    assert_eq!(payout.locked, tokens("241.376"));
    assert_eq!(payout.unlocked(), tokens("12.704"));

    assert_eq!(ledger.balance_of(&bob), tokens("12.704"));
    assert_eq!(ledger.lock_of(&bob), tokens("241.376"));
    assert_eq!(ledger.total_supply(), tokens("307.2"));
    assert!(ledger.audit().is_empty());
}

#[test]
fn fund_mints_are_split_per_fund() {
    let ledger = ledger_at(&config(100, 1_000), 90);
    ledger.deposit(POOL, acct(0xb0), tokens("100"), None).unwrap();
    advance(&ledger, 101);
    ledger.accrue(POOL).unwrap();

    let split = ledger.payout_split();
    let expected = [
        (Fund::Development, "15.36", "11.52"),
        (Fund::Liquidity, "10.24", "4.608"),
        (Fund::Community, "15.36", "13.056"),
        (Fund::Founder, "10.24", "9.728"),
    ];
    for (fund, minted, locked) in expected {
        let account = split.fund(fund).account;
        assert_eq!(ledger.total_balance_of(&account), tokens(minted), "{fund}");
        assert_eq!(ledger.lock_of(&account), tokens(locked), "{fund}");
    }
    assert_eq!(ledger.snapshot().reward_reserve, 256 * ONE_TOKEN);
}

// ======================================================================
// Claim, then vest through the lock window
// ======================================================================

#[test]
fn claimed_reward_vests_linearly_through_window() {
    let config = sluice_ledger::LedgerConfig {
        lock_from_height: 250,
        lock_to_height: 500,
        ..config(150, 1_000)
    };
    let ledger = ledger_at(&config, 140);
    let bob = acct(0xb0);
    ledger.deposit(POOL, bob, tokens("100"), None).unwrap();

    advance(&ledger, 152);
    let payout = ledger.claim_reward(POOL, bob).unwrap();
    assert_eq!(payout.paid, tokens("508.16"));
    assert_eq!(payout.locked, tokens("482.752"));
    assert_eq!(ledger.total_supply(), tokens("614.4"));
    assert_eq!(ledger.balance_of(&bob), tokens("25.408"));
    assert_eq!(ledger.last_unlock_height(&bob), 250);

    advance(&ledger, 250);
    assert_eq!(ledger.can_unlock_amount(&bob).unwrap(), 0);

    advance(&ledger, 451);
    assert_eq!(ledger.unlock(bob).unwrap(), tokens("388.132608"));
    assert_eq!(ledger.balance_of(&bob), tokens("413.540608"));
    assert_eq!(ledger.lock_of(&bob), tokens("94.619392"));
    assert_eq!(ledger.last_unlock_height(&bob), 451);

    advance(&ledger, 520);
    assert_eq!(ledger.unlock(bob).unwrap(), tokens("94.619392"));
    assert_eq!(ledger.lock_of(&bob), 0);
    // only the auxiliary funds' locks remain
    assert_eq!(ledger.total_lock(), tokens("77.824"));
    assert!(ledger.audit().is_empty());
}

// ======================================================================
// Withdrawal settles first
// ======================================================================

#[test]
fn withdrawal_pays_reward_before_returning_stake() {
    let ledger = ledger_at(&config(600, 1_000), 610);
    let bob = acct(0xb0);
    ledger.deposit(POOL, bob, tokens("10"), None).unwrap();

    advance(&ledger, 620);
    let receipt = ledger.withdraw(POOL, bob, tokens("9.925"), None).unwrap();
    assert_eq!(receipt.elapsed, 10);
    assert_eq!(receipt.reward.paid, tokens("2540.8"));
    assert_eq!(receipt.fee_redistributed, tokens("0.794"));
    assert_eq!(receipt.returned, tokens("9.131"));
    assert_eq!(receipt.fee_destination, dev_fund());

    assert_eq!(ledger.balance_of(&bob), tokens("127.04"));
    assert_eq!(ledger.lock_of(&bob), tokens("2413.76"));
    assert_eq!(ledger.total_balance_of(&bob), tokens("2540.8"));
    assert_eq!(ledger.total_supply(), tokens("3072"));
    assert_eq!(ledger.position(POOL, &bob).unwrap().staked_amount, 0);
}

#[test]
fn withdrawing_gross_deposit_exceeds_stake() {
    let ledger = ledger_at(&config(600, 1_000), 610);
    let bob = acct(0xb0);
    ledger.deposit(POOL, bob, tokens("10"), None).unwrap();
    advance(&ledger, 620);
    let before = ledger.snapshot();

    let err = ledger.withdraw(POOL, bob, tokens("10"), None).unwrap_err();
    assert_eq!(
        err,
        LedgerError::Invariant(InvariantError::InsufficientStake {
            requested: tokens("10"),
            available: tokens("9.925"),
        })
    );
    assert_eq!(ledger.snapshot(), before);
}

// ======================================================================
// Proportional split between stakers
// ======================================================================

#[test]
fn two_stakers_share_by_stake() {
    let config = sluice_ledger::LedgerConfig {
        multipliers: vec![1, 1],
        base_reward_per_block: 1_000 * ONE_TOKEN,
        ..config_without_deposit_fee(300, 1_000)
    };
    let ledger = ledger_at(&config, 310);
    let (a, b) = (acct(0xa0), acct(0xb0));

    ledger.deposit(POOL, a, 10 * ONE_TOKEN, None).unwrap();
    advance(&ledger, 314);
    ledger.deposit(POOL, b, 20 * ONE_TOKEN, None).unwrap();
    advance(&ledger, 320);

    let payout = ledger.claim_reward(POOL, a).unwrap();
    assert_eq!(payout.paid, 6_000 * ONE_TOKEN);
    assert_eq!(payout.locked, 5_700 * ONE_TOKEN);
    assert_eq!(payout.unlocked(), 300 * ONE_TOKEN);
    assert_eq!(ledger.total_supply(), 12_000 * ONE_TOKEN);
    assert_eq!(ledger.snapshot().reward_reserve, 4_000 * ONE_TOKEN);
    assert_eq!(ledger.pending_reward(POOL, &b).unwrap(), 4_000 * ONE_TOKEN);
}

#[test]
fn second_claim_at_same_height_pays_nothing() {
    let ledger = ledger_at(&config(100, 1_000), 100);
    let bob = acct(0xb0);
    ledger.deposit(POOL, bob, tokens("3"), None).unwrap();
    advance(&ledger, 130);
    assert!(ledger.claim_reward(POOL, bob).unwrap().paid > 0);
    let supply = ledger.total_supply();
    let second = ledger.claim_reward(POOL, bob).unwrap();
    assert_eq!(second.paid, 0);
    assert_eq!(ledger.total_supply(), supply);
}

#[test]
fn claim_rewards_covers_every_pool() {
    let ledger = ledger_at(&config_without_deposit_fee(100, 1_000), 100);
    let cap = admin(&ledger);
    let second = ledger.add_pool(&cap, sluice_core::types::AssetId::from_seed(0x22), 3).unwrap();
    let bob = acct(0xb0);
    ledger.deposit(POOL, bob, ONE_TOKEN, None).unwrap();
    ledger.deposit(second, bob, ONE_TOKEN, None).unwrap();

    advance(&ledger, 101);
    let payouts = ledger.claim_rewards(&[POOL, second], bob).unwrap();
    assert_eq!(payouts.len(), 2);
    // weights 1 and 3 of a 256-token block
    assert_eq!(payouts[0].1.paid, 64 * ONE_TOKEN);
    assert_eq!(payouts[1].1.paid, 192 * ONE_TOKEN);
}

// ======================================================================
// End of emission
// ======================================================================

#[test]
fn payouts_after_emission_are_spendable() {
    let config = sluice_ledger::LedgerConfig {
        multipliers: vec![1],
        ..config_without_deposit_fee(0, 10)
    };
    let ledger = ledger_at(&config, 0);
    assert_eq!(ledger.final_reward_height(), 10);
    let bob = acct(0xb0);
    ledger.deposit(POOL, bob, ONE_TOKEN, None).unwrap();

    advance(&ledger, 20);
    let payout = ledger.claim_reward(POOL, bob).unwrap();
    assert_eq!(payout.paid, 11 * ONE_TOKEN);
    assert_eq!(payout.locked, 0);
    assert_eq!(ledger.lock_of(&bob), 0);

    advance(&ledger, 40);
    assert_eq!(ledger.claim_reward(POOL, bob).unwrap().pending, 0);
}

#[test]
fn cap_exhaustion_reverts_settlement_but_not_escape_hatch() {
    let ledger = ledger_at(&config(100, 1_000), 90);
    let bob = acct(0xb0);
    ledger.deposit(POOL, bob, tokens("100"), None).unwrap();
    ledger.set_cap(&admin(&ledger), tokens("300")).unwrap();

    advance(&ledger, 101);
    let before = ledger.snapshot();
    for err in [
        ledger.claim_reward(POOL, bob).unwrap_err(),
        ledger.deposit(POOL, bob, ONE_TOKEN, None).unwrap_err(),
        ledger.withdraw(POOL, bob, ONE_TOKEN, None).unwrap_err(),
    ] {
        assert!(matches!(err, LedgerError::Invariant(InvariantError::CapExceeded { .. })), "{err}");
    }
    assert_eq!(ledger.snapshot(), before);

    let receipt = ledger.emergency_withdraw(POOL, bob).unwrap();
    assert_eq!(receipt.reward.paid, 0);
    assert_eq!(ledger.total_supply(), 0);
    assert_eq!(ledger.balance_of(&AccountId::REWARD_RESERVE), 0);
}
