//! Property tests over arbitrary interleavings of deposits and withdrawals.
//!
//! A model keeps the outstanding receipts; after every operation the pool
//! must agree with it on balance, counters, and the sum of receipt amounts.

use custody_core::AccountId;
use custody_ledger::{create_pool, AuditLog, LedgerError, NullSink, Receipt};
use proptest::prelude::*;

const ACCOUNTS: [&str; 3] = ["alice", "bob", "carol"];

#[derive(Debug, Clone)]
enum Op {
    Deposit { account: usize, amount: u64 },
    Withdraw { slot: usize, caller: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..ACCOUNTS.len(), 0u64..1_000_000).prop_map(|(account, amount)| Op::Deposit {
            account,
            amount
        }),
        (any::<usize>(), 0..ACCOUNTS.len()).prop_map(|(slot, caller)| Op::Withdraw {
            slot,
            caller
        }),
    ]
}

fn account(index: usize) -> AccountId {
    AccountId::new(ACCOUNTS[index]).unwrap()
}

proptest! {
    #[test]
    fn conservation_holds_after_every_operation(ops in prop::collection::vec(op_strategy(), 1..64)) {
        let mut pool = create_pool();
        let mut log = AuditLog::default();
        let mut outstanding: Vec<Receipt> = Vec::new();
        let mut accepted = 0usize;

        for op in ops {
            match op {
                Op::Deposit { account: a, amount } => {
                    match pool.deposit(amount, &account(a), &mut log) {
                        Ok(receipt) => {
                            outstanding.push(receipt);
                            accepted += 1;
                        }
                        Err(e) => {
                            prop_assert_eq!(amount, 0);
                            prop_assert_eq!(e, LedgerError::InsufficientAmount);
                        }
                    }
                }
                Op::Withdraw { slot, caller } => {
                    if outstanding.is_empty() {
                        continue;
                    }
                    let receipt = outstanding.swap_remove(slot % outstanding.len());
                    let owner = receipt.owner().clone();
                    let amount = receipt.amount();
                    match pool.withdraw(receipt, &account(caller), &mut log) {
                        Ok(payout) => {
                            prop_assert_eq!(&payout.recipient, &owner);
                            prop_assert_eq!(payout.amount, amount);
                            accepted += 1;
                        }
                        Err(e) => {
                            prop_assert_ne!(account(caller), owner);
                            prop_assert_eq!(e.kind(), "unauthorized_caller");
                            outstanding.push(e.into_receipt());
                        }
                    }
                }
            }

            let sum: u64 = outstanding.iter().map(Receipt::amount).sum();
            prop_assert_eq!(pool.balance(), sum);
            prop_assert_eq!(pool.active_receipt_count(), outstanding.len() as u64);
            prop_assert!(pool.active_receipt_count() <= pool.deposit_count());
            prop_assert!(pool.verify_conservation(outstanding.iter()).is_ok());
        }

        prop_assert_eq!(log.len(), accepted);
        prop_assert!(log.verify_chain().is_ok());
    }

    #[test]
    fn sequence_numbers_are_strictly_increasing(amounts in prop::collection::vec(1u64..10_000, 1..48)) {
        let mut pool = create_pool();
        let mut previous = 0u64;
        let mut held = Vec::new();
        for (i, amount) in amounts.iter().enumerate() {
            let receipt = pool.deposit(*amount, &account(i % ACCOUNTS.len()), &mut NullSink).unwrap();
            prop_assert!(receipt.sequence_number() > previous);
            previous = receipt.sequence_number();
            // Redeeming every other receipt must not disturb numbering.
            if i % 2 == 0 {
                let owner = receipt.owner().clone();
                pool.withdraw(receipt, &owner, &mut NullSink).unwrap();
            } else {
                held.push(receipt);
            }
        }
        prop_assert_eq!(pool.deposit_count(), amounts.len() as u64);
        prop_assert_eq!(pool.active_receipt_count(), held.len() as u64);
    }

    #[test]
    fn only_the_owner_can_redeem(amount in 1u64..1_000_000, owner in 0..ACCOUNTS.len(), caller in 0..ACCOUNTS.len()) {
        let mut pool = create_pool();
        let receipt = pool.deposit(amount, &account(owner), &mut NullSink).unwrap();
        let result = pool.withdraw(receipt, &account(caller), &mut NullSink);
        if owner == caller {
            prop_assert!(result.is_ok());
            prop_assert_eq!(pool.balance(), 0);
        } else {
            prop_assert!(result.is_err());
            prop_assert_eq!(pool.balance(), amount);
            prop_assert_eq!(pool.active_receipt_count(), 1);
        }
    }
}
