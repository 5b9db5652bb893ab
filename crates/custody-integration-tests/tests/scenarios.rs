//! End-to-end deposit and withdrawal flows on a single pool.
//!
//! Walks the canonical scenarios: deposit, redeem, zero deposit, a tampered
//! receipt against an underfunded pool, a non-owner withdrawal, and
//! sequence numbering across deposits. Every flow also checks the audit
//! trail and the conservation invariant.

use custody_core::AccountId;
use custody_ledger::{
    create_pool, AuditEvent, AuditLog, LedgerError, LedgerPool, NullSink, Receipt,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn alice() -> AccountId {
    AccountId::new("alice").unwrap()
}

fn bob() -> AccountId {
    AccountId::new("bob").unwrap()
}

fn pool_with_deposit(amount: u64, depositor: &AccountId) -> (LedgerPool, Receipt, AuditLog) {
    let mut pool = create_pool();
    let mut log = AuditLog::default();
    let receipt = pool.deposit(amount, depositor, &mut log).unwrap();
    (pool, receipt, log)
}

// ---------------------------------------------------------------------------
// Deposit and withdraw
// ---------------------------------------------------------------------------

#[test]
fn deposit_mints_receipt_for_depositor() {
    let (pool, r1, log) = pool_with_deposit(100, &alice());

    assert_eq!(r1.amount(), 100);
    assert_eq!(r1.owner(), &alice());
    assert_eq!(r1.pool_id(), pool.id());
    assert_eq!(pool.deposit_count(), 1);
    assert_eq!(pool.active_receipt_count(), 1);
    assert_eq!(pool.balance(), 100);

    assert_eq!(log.len(), 1);
    assert!(matches!(
        &log.records()[0].event,
        AuditEvent::DepositRecorded { amount: 100, sequence_number: 1, .. }
    ));
    pool.verify_conservation([&r1]).unwrap();
}

#[test]
fn owner_withdraws_full_amount() {
    let (mut pool, r1, mut log) = pool_with_deposit(100, &alice());
    let receipt_id = r1.id();

    let payout = pool.withdraw(r1, &alice(), &mut log).unwrap();

    assert_eq!(payout.amount, 100);
    assert_eq!(payout.recipient, alice());
    assert_eq!(payout.receipt_id, receipt_id);
    assert_eq!(pool.active_receipt_count(), 0);
    assert_eq!(pool.deposit_count(), 1);
    assert_eq!(pool.balance(), 0);

    assert_eq!(log.len(), 2);
    assert_eq!(log.records()[1].event.kind(), "withdrawal_recorded");
    assert_eq!(log.records()[1].event.receipt_id(), receipt_id);
    log.verify_chain().unwrap();
    pool.verify_conservation(std::iter::empty()).unwrap();
}

#[test]
fn zero_deposit_is_rejected_without_side_effects() {
    let mut pool = create_pool();
    let mut log = AuditLog::default();

    let err = pool.deposit(0, &alice(), &mut log).unwrap_err();

    assert_eq!(err, LedgerError::InsufficientAmount);
    assert_eq!(pool.deposit_count(), 0);
    assert_eq!(pool.active_receipt_count(), 0);
    assert_eq!(pool.balance(), 0);
    assert!(log.is_empty());
}

#[test]
fn tampered_receipt_against_underfunded_pool_is_rejected() {
    let (mut pool, r1, mut log) = pool_with_deposit(50, &alice());
    let inflated = Receipt::forge(pool.id(), r1.sequence_number(), alice(), 100);

    let err = pool.withdraw(inflated, &alice(), &mut log).unwrap_err();

    assert!(matches!(
        err.error(),
        LedgerError::InsufficientPoolBalance { requested: 100, available: 50, .. }
    ));
    assert_eq!(pool.balance(), 50);
    assert_eq!(pool.active_receipt_count(), 1);
    assert_eq!(log.len(), 1);

    // The genuine receipt still redeems.
    let payout = pool.withdraw(r1, &alice(), &mut log).unwrap();
    assert_eq!(payout.amount, 50);
}

#[test]
fn non_owner_cannot_withdraw() {
    let (mut pool, r1, mut log) = pool_with_deposit(100, &alice());

    let err = pool.withdraw(r1, &bob(), &mut log).unwrap_err();

    assert_eq!(err.kind(), "unauthorized_caller");
    assert_eq!(pool.balance(), 100);
    assert_eq!(pool.active_receipt_count(), 1);
    assert_eq!(log.len(), 1);

    let r1 = err.into_receipt();
    pool.verify_conservation([&r1]).unwrap();
    pool.withdraw(r1, &alice(), &mut log).unwrap();
    assert_eq!(pool.balance(), 0);
}

#[test]
fn sequence_numbers_strictly_increase() {
    let mut pool = create_pool();
    let r1 = pool.deposit(100, &alice(), &mut NullSink).unwrap();
    let r2 = pool.deposit(200, &alice(), &mut NullSink).unwrap();

    assert!(r2.sequence_number() > r1.sequence_number());
    assert_ne!(r1.id(), r2.id());
    assert_eq!(pool.deposit_count(), 2);
    assert_eq!(pool.balance(), 300);
    pool.verify_conservation([&r1, &r2]).unwrap();
}

// ---------------------------------------------------------------------------
// Cross-pool and audit trail
// ---------------------------------------------------------------------------

#[test]
fn receipt_from_another_pool_is_rejected() {
    let (_, foreign, _) = pool_with_deposit(10, &alice());
    let (mut pool, local, mut log) = pool_with_deposit(10, &alice());

    let err = pool.withdraw(foreign, &alice(), &mut log).unwrap_err();
    assert_eq!(err.kind(), "foreign_receipt");
    assert_eq!(pool.balance(), 10);

    pool.withdraw(local, &alice(), &mut log).unwrap();
    pool.verify_conservation(std::iter::empty()).unwrap();
}

#[test]
fn audit_trail_filters_by_depositor() {
    let mut pool = create_pool();
    let mut log = AuditLog::default();
    let ra = pool.deposit(5, &alice(), &mut log).unwrap();
    let rb = pool.deposit(7, &bob(), &mut log).unwrap();
    pool.withdraw(ra, &alice(), &mut log).unwrap();

    let alice_records = log.records_for_depositor(&alice());
    assert_eq!(alice_records.len(), 2);
    assert!(alice_records.iter().all(|r| r.event.depositor() == &alice()));
    assert_eq!(log.records_for_depositor(&bob()).len(), 1);

    log.verify_chain().unwrap();
    pool.verify_conservation([&rb]).unwrap();
}

#[test]
fn closure_sink_observes_events_in_order() {
    let mut pool = create_pool();
    let mut seen = Vec::new();
    {
        let mut sink = |event: AuditEvent| seen.push(event);
        let r = pool.deposit(9, &alice(), &mut sink).unwrap();
        pool.withdraw(r, &alice(), &mut sink).unwrap();
    }
    let kinds: Vec<_> = seen.iter().map(AuditEvent::kind).collect();
    assert_eq!(kinds, ["deposit_recorded", "withdrawal_recorded"]);
    assert_eq!(seen[0].sequence_number(), seen[1].sequence_number());
}

#[test]
fn padded_identity_cannot_stand_in_for_owner() {
    let (mut pool, r1, mut log) = pool_with_deposit(100, &alice());

    for padded in [" alice", "alice ", " alice\t"] {
        assert!(AccountId::new(padded).is_err(), "{padded:?} must not parse");
    }

    let lookalike = AccountId::new("alice_").unwrap();
    let err = pool.withdraw(r1, &lookalike, &mut log).unwrap_err();
    assert_eq!(err.kind(), "unauthorized_caller");
    assert_eq!(pool.balance(), 100);
    assert_eq!(log.len(), 1);
}
