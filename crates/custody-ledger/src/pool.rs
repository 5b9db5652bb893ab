//! # Ledger Pool
//!
//! The pool owns the aggregate balance of one asset and two counters: the
//! number of deposits ever accepted and the number of receipts still
//! outstanding.
//!
//! ## Invariants
//!
//! - `balance` equals the sum of `amount` over all outstanding receipts.
//! - `active_receipts <= total_deposits`.
//! - `total_deposits` only increases. `balance` and `active_receipts`
//!   decrease only on a successful withdrawal, by exactly the redeemed
//!   amount and by one.
//! - Every check runs before any mutation: a rejected operation leaves the
//!   pool, the receipt, and the audit sink untouched.
//! - A sink that panics cannot break conservation. `deposit` commits only
//!   after the sink returns; `withdraw` commits before calling it.
//!
//! ## Numbering
//!
//! Receipts are numbered from the post-increment deposit counter: the n-th
//! accepted deposit mints receipt n, so the first receipt is 1 and
//! `deposit_count()` always equals the newest sequence number.
//!
//! ## Withdrawal check order
//!
//! 1. Balance sufficiency (`InsufficientPoolBalance`).
//! 2. Ownership (`UnauthorizedCaller`).
//! 3. Pool origin (`ForeignReceipt`).

use serde::{Deserialize, Serialize};

use custody_core::{AccountId, PoolId, ReceiptId, Timestamp};

use crate::audit::{AuditEvent, AuditSink};
use crate::error::{LedgerError, WithdrawError};
use crate::receipt::Receipt;
use crate::Amount;

/// Create a new, empty pool.
pub fn create_pool() -> LedgerPool {
    LedgerPool::new()
}

/// Proceeds of a successful withdrawal, released to the receipt owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    /// The retired receipt.
    pub receipt_id: ReceiptId,
    /// Sequence number of the retired receipt.
    pub sequence_number: u64,
    /// The original depositor. Always the receipt owner.
    pub recipient: AccountId,
    /// Exactly the amount recorded on the receipt.
    pub amount: Amount,
}

/// Point-in-time view of a pool's bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// The pool.
    pub pool_id: PoolId,
    /// Units currently held.
    pub balance: Amount,
    /// Deposits ever accepted.
    pub total_deposits: u64,
    /// Receipts not yet redeemed.
    pub active_receipts: u64,
    /// When the pool was created.
    pub created_at: Timestamp,
}

/// A custodial pool for a single asset.
///
/// Operations take `&mut self`; hosts that share a pool between callers
/// wrap it in [`SharedPool`](crate::SharedPool), which serializes them.
#[derive(Debug)]
pub struct LedgerPool {
    id: PoolId,
    total_deposits: u64,
    active_receipts: u64,
    balance: Amount,
    created_at: Timestamp,
}

impl LedgerPool {
    /// Create a new pool with zero balance and zero counters.
    pub fn new() -> Self {
        let pool = Self {
            id: PoolId::new(),
            total_deposits: 0,
            active_receipts: 0,
            balance: 0,
            created_at: Timestamp::now(),
        };
        tracing::debug!(pool_id = %pool.id, "pool created");
        pool
    }

    /// Identity of this pool.
    pub fn id(&self) -> PoolId {
        self.id
    }

    /// Units currently held.
    pub fn balance(&self) -> Amount {
        self.balance
    }

    /// Number of deposits ever accepted.
    pub fn deposit_count(&self) -> u64 {
        self.total_deposits
    }

    /// Number of receipts not yet redeemed.
    pub fn active_receipt_count(&self) -> u64 {
        self.active_receipts
    }

    /// When the pool was created.
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Current bookkeeping as a serializable value.
    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            pool_id: self.id,
            balance: self.balance,
            total_deposits: self.total_deposits,
            active_receipts: self.active_receipts,
            created_at: self.created_at,
        }
    }

    /// Accept `amount` units from `depositor` and mint a receipt for them.
    ///
    /// On success the balance grows by `amount`, both counters grow by one,
    /// and a [`AuditEvent::DepositRecorded`] is sent to `sink`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InsufficientAmount`] if `amount` is zero.
    /// - [`LedgerError::BalanceOverflow`] if the balance cannot hold `amount`.
    /// - [`LedgerError::SequenceExhausted`] if the deposit counter is at `u64::MAX`.
    pub fn deposit<S>(
        &mut self,
        amount: Amount,
        depositor: &AccountId,
        sink: &mut S,
    ) -> Result<Receipt, LedgerError>
    where
        S: AuditSink + ?Sized,
    {
        if amount == 0 {
            tracing::warn!(pool_id = %self.id, depositor = %depositor, "rejected zero deposit");
            return Err(LedgerError::InsufficientAmount);
        }
        let balance = self.balance.checked_add(amount).ok_or_else(|| {
            tracing::warn!(pool_id = %self.id, amount, balance = self.balance, "rejected deposit: balance overflow");
            LedgerError::BalanceOverflow {
                pool_id: self.id,
                balance: self.balance,
                amount,
            }
        })?;
        let sequence_number = self.total_deposits.checked_add(1).ok_or_else(|| {
            tracing::warn!(pool_id = %self.id, "rejected deposit: receipt sequence exhausted");
            LedgerError::SequenceExhausted { pool_id: self.id }
        })?;

        let receipt = Receipt::mint(self.id, sequence_number, depositor.clone(), amount);
        // The sink runs before the commit: if it unwinds, the receipt is
        // dropped and the pool has not moved.
        sink.record(AuditEvent::DepositRecorded {
            pool_id: self.id,
            receipt_id: receipt.id(),
            depositor: depositor.clone(),
            amount,
            sequence_number,
            recorded_at: Timestamp::now(),
        });

        // active_receipts <= total_deposits < sequence_number, so this cannot overflow.
        self.balance = balance;
        self.total_deposits = sequence_number;
        self.active_receipts += 1;

        tracing::debug!(
            pool_id = %self.id,
            receipt_id = %receipt.id(),
            depositor = %depositor,
            amount,
            sequence_number,
            "deposit accepted"
        );
        Ok(receipt)
    }

    /// Redeem `receipt` on behalf of `caller`, releasing its full amount to
    /// the receipt owner.
    ///
    /// On success the balance shrinks by the receipt amount, the active
    /// receipt count shrinks by one, the receipt is destroyed, and a
    /// [`AuditEvent::WithdrawalRecorded`] is sent to `sink`.
    ///
    /// # Errors
    ///
    /// On rejection the receipt is handed back inside [`WithdrawError`]:
    ///
    /// - [`LedgerError::InsufficientPoolBalance`] if the pool holds less than
    ///   the receipt amount.
    /// - [`LedgerError::UnauthorizedCaller`] if `caller` is not the owner.
    /// - [`LedgerError::ForeignReceipt`] if another pool minted the receipt.
    /// - [`LedgerError::ConservationViolation`] if the pool has no
    ///   outstanding receipts to retire.
    pub fn withdraw<S>(
        &mut self,
        receipt: Receipt,
        caller: &AccountId,
        sink: &mut S,
    ) -> Result<Payout, WithdrawError>
    where
        S: AuditSink + ?Sized,
    {
        if let Err(error) = self.check_withdrawal(&receipt, caller) {
            tracing::warn!(
                pool_id = %self.id,
                receipt_id = %receipt.id(),
                caller = %caller,
                reason = error.kind(),
                "rejected withdrawal"
            );
            return Err(WithdrawError::new(error, receipt));
        }

        // Commit before the sink runs: an unwinding sink still destroys the
        // owned receipt, so the balance must already have released it.
        let redeemed = receipt.redeem();
        self.balance -= redeemed.amount;
        self.active_receipts -= 1;

        tracing::debug!(
            pool_id = %self.id,
            receipt_id = %redeemed.id,
            depositor = %redeemed.owner,
            amount = redeemed.amount,
            "withdrawal accepted"
        );
        sink.record(AuditEvent::WithdrawalRecorded {
            pool_id: self.id,
            receipt_id: redeemed.id,
            depositor: redeemed.owner.clone(),
            amount: redeemed.amount,
            sequence_number: redeemed.sequence_number,
            recorded_at: Timestamp::now(),
        });
        Ok(Payout {
            receipt_id: redeemed.id,
            sequence_number: redeemed.sequence_number,
            recipient: redeemed.owner,
            amount: redeemed.amount,
        })
    }

    fn check_withdrawal(&self, receipt: &Receipt, caller: &AccountId) -> Result<(), LedgerError> {
        if self.balance < receipt.amount() {
            return Err(LedgerError::InsufficientPoolBalance {
                pool_id: self.id,
                requested: receipt.amount(),
                available: self.balance,
            });
        }
        if caller != receipt.owner() {
            return Err(LedgerError::UnauthorizedCaller {
                receipt_id: receipt.id(),
                caller: caller.clone(),
            });
        }
        if receipt.pool_id() != self.id {
            return Err(LedgerError::ForeignReceipt {
                receipt_id: receipt.id(),
                receipt_pool: receipt.pool_id(),
                pool_id: self.id,
            });
        }
        if self.active_receipts == 0 {
            return Err(LedgerError::ConservationViolation {
                pool_id: self.id,
                balance: self.balance,
                outstanding_amount: u128::from(receipt.amount()),
                outstanding_receipts: 1,
                active_receipts: 0,
            });
        }
        Ok(())
    }

    /// Check the pool's bookkeeping against the full set of receipts it has
    /// outstanding.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ForeignReceipt`] if any receipt was minted elsewhere.
    /// - [`LedgerError::ConservationViolation`] if the receipt count differs
    ///   from `active_receipt_count()` or the amounts do not sum to `balance()`.
    pub fn verify_conservation<'a, I>(&self, outstanding: I) -> Result<(), LedgerError>
    where
        I: IntoIterator<Item = &'a Receipt>,
    {
        let mut outstanding_amount: u128 = 0;
        let mut outstanding_receipts: u64 = 0;
        for receipt in outstanding {
            if receipt.pool_id() != self.id {
                return Err(LedgerError::ForeignReceipt {
                    receipt_id: receipt.id(),
                    receipt_pool: receipt.pool_id(),
                    pool_id: self.id,
                });
            }
            outstanding_amount += u128::from(receipt.amount());
            outstanding_receipts += 1;
        }
        if outstanding_amount != u128::from(self.balance)
            || outstanding_receipts != self.active_receipts
        {
            return Err(LedgerError::ConservationViolation {
                pool_id: self.id,
                balance: self.balance,
                outstanding_amount,
                outstanding_receipts,
                active_receipts: self.active_receipts,
            });
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn set_balance_for_test(&mut self, balance: Amount) {
        self.balance = balance;
    }

    #[cfg(test)]
    pub(crate) fn set_total_deposits_for_test(&mut self, total_deposits: u64) {
        self.total_deposits = total_deposits;
    }
}

impl Default for LedgerPool {
    fn default() -> Self {
        Self::new()
    }
}
