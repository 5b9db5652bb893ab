//! # Ledger Error Types
//!
//! Every rejection carries enough context to diagnose it without logs: the
//! pool, the receipt, and the amounts involved. All rejections are terminal
//! for the attempted operation and leave the pool untouched.

use thiserror::Error;

use custody_core::{AccountId, CanonicalizationError, PoolId, ReceiptId};

use crate::receipt::Receipt;
use crate::Amount;

/// Errors arising from pool operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Deposit attempted with a zero amount.
    #[error("deposit amount must be greater than zero")]
    InsufficientAmount,

    /// Withdrawal requests more than the pool currently holds.
    #[error("pool {pool_id} holds {available}, cannot release {requested}")]
    InsufficientPoolBalance {
        /// The pool asked to release funds.
        pool_id: PoolId,
        /// Amount recorded on the presented receipt.
        requested: Amount,
        /// Balance held by the pool.
        available: Amount,
    },

    /// Withdrawal attempted by someone other than the receipt's owner.
    #[error("caller {caller} is not the owner of {receipt_id}")]
    UnauthorizedCaller {
        /// The receipt presented.
        receipt_id: ReceiptId,
        /// The identity that presented it.
        caller: AccountId,
    },

    /// The receipt was minted by a different pool.
    #[error("{receipt_id} was minted by {receipt_pool}, not {pool_id}")]
    ForeignReceipt {
        /// The receipt presented.
        receipt_id: ReceiptId,
        /// The pool that minted the receipt.
        receipt_pool: PoolId,
        /// The pool it was presented to.
        pool_id: PoolId,
    },

    /// Accepting the deposit would overflow the pool balance.
    #[error("depositing {amount} into {pool_id} would overflow its balance of {balance}")]
    BalanceOverflow {
        /// The pool receiving the deposit.
        pool_id: PoolId,
        /// Balance before the deposit.
        balance: Amount,
        /// The rejected deposit amount.
        amount: Amount,
    },

    /// The pool has minted `u64::MAX` receipts and cannot number another.
    #[error("pool {pool_id} has exhausted its receipt sequence")]
    SequenceExhausted {
        /// The exhausted pool.
        pool_id: PoolId,
    },

    /// Pool bookkeeping disagrees with the receipts it has outstanding.
    #[error(
        "conservation violated in {pool_id}: balance {balance} against {outstanding_amount} \
         across {outstanding_receipts} receipts (pool counts {active_receipts} active)"
    )]
    ConservationViolation {
        /// The inconsistent pool.
        pool_id: PoolId,
        /// Balance recorded by the pool.
        balance: Amount,
        /// Sum of the outstanding receipt amounts.
        outstanding_amount: u128,
        /// Number of outstanding receipts presented.
        outstanding_receipts: u64,
        /// Active receipt counter recorded by the pool.
        active_receipts: u64,
    },
}

impl LedgerError {
    /// Stable snake_case code for reports and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InsufficientAmount => "insufficient_amount",
            Self::InsufficientPoolBalance { .. } => "insufficient_pool_balance",
            Self::UnauthorizedCaller { .. } => "unauthorized_caller",
            Self::ForeignReceipt { .. } => "foreign_receipt",
            Self::BalanceOverflow { .. } => "balance_overflow",
            Self::SequenceExhausted { .. } => "sequence_exhausted",
            Self::ConservationViolation { .. } => "conservation_violation",
        }
    }
}

/// A rejected withdrawal.
///
/// Hands the presented receipt back to the caller: a rejected operation has
/// no side effects, and that includes not destroying the claim.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct WithdrawError {
    error: LedgerError,
    receipt: Receipt,
}

impl WithdrawError {
    pub(crate) fn new(error: LedgerError, receipt: Receipt) -> Self {
        Self { error, receipt }
    }

    /// The reason the withdrawal was rejected.
    pub fn error(&self) -> &LedgerError {
        &self.error
    }

    /// Shorthand for `self.error().kind()`.
    pub fn kind(&self) -> &'static str {
        self.error.kind()
    }

    /// The receipt that was presented, still outstanding.
    pub fn receipt(&self) -> &Receipt {
        &self.receipt
    }

    /// Recover the receipt.
    pub fn into_receipt(self) -> Receipt {
        self.receipt
    }

    /// Split into the rejection reason and the receipt.
    pub fn into_parts(self) -> (LedgerError, Receipt) {
        (self.error, self.receipt)
    }
}

/// Errors from the hash-chained audit log.
#[derive(Error, Debug)]
pub enum AuditLogError {
    /// A record's `previous_digest` does not match its predecessor.
    #[error("audit record {index} does not link to its predecessor")]
    BrokenLink {
        /// Index of the offending record.
        index: u64,
    },

    /// A record's stored digest does not match its recomputed digest.
    #[error("audit record {index} digest mismatch")]
    DigestMismatch {
        /// Index of the offending record.
        index: u64,
    },

    /// Record indices are not contiguous.
    #[error("audit record index gap: expected {expected}, found {found}")]
    IndexGap {
        /// The index that should have followed.
        expected: u64,
        /// The index actually found.
        found: u64,
    },

    /// Canonicalization of an audit payload failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_pool_balance_display() {
        let pool_id = PoolId::new();
        let err = LedgerError::InsufficientPoolBalance {
            pool_id,
            requested: 100,
            available: 50,
        };
        let msg = err.to_string();
        assert!(msg.contains("100"));
        assert!(msg.contains("50"));
        assert!(msg.contains(&pool_id.to_string()));
    }

    #[test]
    fn unauthorized_caller_display() {
        let err = LedgerError::UnauthorizedCaller {
            receipt_id: ReceiptId::new(),
            caller: AccountId::new("mallory").unwrap(),
        };
        assert!(err.to_string().contains("mallory"));
    }

    #[test]
    fn kinds_are_distinct() {
        let pool_id = PoolId::new();
        let kinds = [
            LedgerError::InsufficientAmount.kind(),
            LedgerError::InsufficientPoolBalance {
                pool_id,
                requested: 1,
                available: 0,
            }
            .kind(),
            LedgerError::UnauthorizedCaller {
                receipt_id: ReceiptId::new(),
                caller: AccountId::new("bob").unwrap(),
            }
            .kind(),
            LedgerError::ForeignReceipt {
                receipt_id: ReceiptId::new(),
                receipt_pool: PoolId::new(),
                pool_id,
            }
            .kind(),
            LedgerError::BalanceOverflow {
                pool_id,
                balance: u64::MAX,
                amount: 1,
            }
            .kind(),
            LedgerError::SequenceExhausted { pool_id }.kind(),
            LedgerError::ConservationViolation {
                pool_id,
                balance: 0,
                outstanding_amount: 1,
                outstanding_receipts: 1,
                active_receipts: 0,
            }
            .kind(),
        ];
        let unique: std::collections::BTreeSet<_> = kinds.iter().collect();
        assert_eq!(unique.len(), kinds.len());
    }

    #[test]
    fn audit_log_error_display() {
        let err = AuditLogError::IndexGap {
            expected: 3,
            found: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains('3'));
        assert!(msg.contains('5'));
    }
}
