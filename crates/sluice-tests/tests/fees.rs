//! Deposit and withdrawal fee scenarios.

use sluice_core::constants::ONE_TOKEN;
use sluice_core::error::{LedgerError, ValidationError};
use sluice_core::fees::{DepositFee, FeeTier};
use sluice_core::traits::TokenView;
use sluice_tests::helpers::*;

#[test]
fn same_block_emergency_withdraw_pays_top_tier() {
    let ledger = ledger_at(&config(100, 1_000), 120);
    let bob = acct(0xb0);
    ledger.deposit(POOL, bob, tokens("100"), None).unwrap();

    let receipt = ledger.emergency_withdraw(POOL, bob).unwrap();
    assert_eq!(receipt.elapsed, 0);
    assert_eq!(receipt.returned, tokens("74.4375"));
    assert_eq!(receipt.fee_redistributed, tokens("24.8125"));
    assert_eq!(receipt.fee_retained, 0);
    assert_eq!(receipt.fee_destination, dev_fund());
    assert_eq!(receipt.reward.pending, 0);
}

#[test]
fn emergency_withdraw_forfeits_reward() {
    let ledger = ledger_at(&config_without_deposit_fee(100, 1_000), 100);
    let bob = acct(0xb0);
    ledger.deposit(POOL, bob, ONE_TOKEN, None).unwrap();
    advance(&ledger, 150);
    assert!(ledger.pending_reward(POOL, &bob).unwrap() > 0);

    ledger.emergency_withdraw(POOL, bob).unwrap();
    let position = ledger.position(POOL, &bob).unwrap();
    assert_eq!(position.staked_amount, 0);
    assert_eq!(position.reward_debt, 0);
    assert_eq!(ledger.pending_reward(POOL, &bob).unwrap(), 0);
    assert_eq!(ledger.total_supply(), 0);
}

#[test]
fn elapsed_counts_from_latest_deposit() {
    let ledger = ledger_at(&config_without_deposit_fee(100, 1_000), 100);
    let bob = acct(0xb0);
    ledger.deposit(POOL, bob, tokens("100"), None).unwrap();
    advance(&ledger, 400);
    ledger.deposit(POOL, bob, tokens("100"), None).unwrap();
    advance(&ledger, 450);

    let receipt = ledger.withdraw(POOL, bob, tokens("200"), None).unwrap();
    assert_eq!(receipt.elapsed, 50);
    assert_eq!(receipt.fee_redistributed, tokens("16"));
    assert_eq!(receipt.returned, tokens("184"));

    let position = ledger.position(POOL, &bob).unwrap();
    assert_eq!(position.first_deposit_height, 100);
    assert_eq!(position.last_deposit_height, 400);
    assert_eq!(position.last_withdraw_height, Some(450));
}

#[test]
fn long_hold_pays_bottom_tier() {
    let ledger = ledger_at(&config_without_deposit_fee(0, 1_000), 0);
    let bob = acct(0xb0);
    ledger.deposit(POOL, bob, tokens("100"), None).unwrap();
    advance(&ledger, 181_441);

    let receipt = ledger.withdraw(POOL, bob, tokens("100"), None).unwrap();
    assert_eq!(receipt.fee_redistributed, tokens("0.01"));
    assert_eq!(receipt.returned, tokens("99.99"));
}

#[test]
fn tier_lookup_matches_table_edges() {
    let ledger = ledger_at(&config(0, 1_000), 0);
    let cases = [
        (0, 2_500),
        (1, 800),
        (274, 800),
        (275, 400),
        (6_600, 400),
        (6_601, 200),
        (33_001, 50),
        (181_440, 25),
        (181_441, 1),
        (u64::MAX, 1),
    ];
    for (elapsed, bps) in cases {
        assert_eq!(ledger.fee_for(elapsed).unwrap().account_fee_bps, bps, "elapsed {elapsed}");
    }
}

#[test]
fn retained_fee_stays_with_the_pool() {
    let ledger = ledger_at(&config(0, 1_000), 0);
    let cap = admin(&ledger);
    ledger.set_deposit_fee(&cap, DepositFee::new(100, 50).unwrap()).unwrap();
    ledger
        .replace_fee_tiers(
            &cap,
            vec![FeeTier { min_elapsed: 0, max_elapsed: None, account_fee_bps: 1_000, redistribution_fee_bps: 400 }],
        )
        .unwrap();

    let bob = acct(0xb0);
    let deposit = ledger.deposit(POOL, bob, tokens("100"), None).unwrap();
    assert_eq!(deposit.net_staked, tokens("99"));
    assert_eq!(deposit.fee_redistributed, tokens("0.5"));
    assert_eq!(deposit.fee_retained, tokens("0.5"));
    assert_eq!(ledger.position(POOL, &dev_fund()).unwrap().staked_amount, tokens("0.5"));

    let withdraw = ledger.withdraw(POOL, bob, tokens("99"), None).unwrap();
    assert_eq!(withdraw.returned, tokens("89.1"));
    assert_eq!(withdraw.fee_redistributed, tokens("3.96"));
    assert_eq!(withdraw.fee_retained, tokens("5.94"));

    let pool = ledger.pool(POOL).unwrap();
    assert_eq!(pool.fees_retained, tokens("6.44"));
    assert_eq!(pool.staked_total, tokens("0.5"));
}

#[test]
fn malformed_tier_replacement_keeps_old_table() {
    let ledger = ledger_at(&config(0, 1_000), 0);
    let cap = admin(&ledger);
    let gap = vec![
        FeeTier { min_elapsed: 0, max_elapsed: Some(10), account_fee_bps: 500, redistribution_fee_bps: 500 },
        FeeTier { min_elapsed: 12, max_elapsed: None, account_fee_bps: 100, redistribution_fee_bps: 100 },
    ];
    let err = ledger.replace_fee_tiers(&cap, gap).unwrap_err();
    assert!(matches!(err, LedgerError::Validation(ValidationError::MalformedFeeTable(_))));
    assert_eq!(ledger.fee_for(0).unwrap().account_fee_bps, 2_500);
    assert_eq!(ledger.snapshot().fee_table_version, 0);
}

#[test]
fn zero_amounts_are_rejected() {
    let ledger = ledger_at(&config(0, 1_000), 0);
    let bob = acct(0xb0);
    let zero = LedgerError::from(ValidationError::ZeroAmount);
    assert_eq!(ledger.deposit(POOL, bob, 0, None).unwrap_err(), zero);
    ledger.deposit(POOL, bob, ONE_TOKEN, None).unwrap();
    assert_eq!(ledger.withdraw(POOL, bob, 0, None).unwrap_err(), zero);
    assert_eq!(ledger.emergency_withdraw(POOL, acct(0xc0)).unwrap_err(), zero);
}
